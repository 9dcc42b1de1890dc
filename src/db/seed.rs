// src/db/seed.rs

use uuid::Uuid;

use crate::{
    common::{clock::SharedClock, error::AppResult},
    config::AppConfig,
    db::{Repository, SharedStore},
    models::{
        auth::{Credential, Squad, User, UserRole},
        crm::PipelineStage,
        habits::HabitTemplate,
        settings::MessageTemplate,
    },
    services::auth::hash_password,
};

const SQUADS: [&str; 2] = ["Squad 1 - Alpha", "Squad 2 - Beta"];

const MESSAGE_TEMPLATES: [(PipelineStage, &str); 6] = [
    (
        PipelineStage::Qualified,
        "Olá, {{nome_lead}}!\nAqui é {{nome_vendedor}} do Portal Concursos.\nRecebi seu contato e vou te explicar como podemos te ajudar 😊",
    ),
    (
        PipelineStage::Negotiation,
        "Oi {{nome_lead}}, tudo bem?\nEstou passando para dar continuidade ao nosso atendimento sobre os concursos que você tem interesse.",
    ),
    (
        PipelineStage::ProposalSent,
        "{{nome_lead}}, já te enviei a proposta com todos os detalhes.\nFicou alguma dúvida que eu possa te ajudar agora?",
    ),
    (
        PipelineStage::FollowUp1,
        "Oi {{nome_lead}}!\nPassando para retomar nossa conversa sobre sua preparação para concursos.\nConseguiu analisar as informações que te enviei?",
    ),
    (
        PipelineStage::Won,
        "Parabéns, {{nome_lead}}! 🎉\nSeu acesso ao Portal Concursos já está garantido.\nQualquer dúvida, estou por aqui!",
    ),
    (
        PipelineStage::Lost,
        "{{nome_lead}}, agradeço o contato.\nSe futuramente precisar de apoio na sua preparação para concursos, pode contar com a gente.",
    ),
];

/// Popula cada coleção vazia com os dados padrão. Coleções com dados ficam intactas.
pub async fn seed_defaults(store: &SharedStore, config: &AppConfig, clock: &SharedClock) -> AppResult<()> {
    let squads: Repository<Squad> = Repository::new(store.clone());
    let users: Repository<User> = Repository::new(store.clone());
    let credentials: Repository<Credential> = Repository::new(store.clone());
    let habit_templates: Repository<HabitTemplate> = Repository::new(store.clone());
    let message_templates: Repository<MessageTemplate> = Repository::new(store.clone());

    let mut squad_ids = Vec::new();
    if squads.list().await?.is_empty() {
        for name in SQUADS {
            let squad = squads
                .create(Squad {
                    id: Uuid::new_v4(),
                    name: name.to_string(),
                    supervisor_id: None,
                })
                .await?;
            squad_ids.push(squad.id);
        }
        tracing::info!(count = squad_ids.len(), "squads padrão criados");
    }

    if users.list().await?.is_empty() {
        let admin = users
            .create(User {
                id: Uuid::new_v4(),
                name: "Administrador".to_string(),
                email: config.admin_email.trim().to_lowercase(),
                role: UserRole::Admin,
                squad_id: None,
                is_active: true,
                created_at: clock.now_utc(),
            })
            .await?;
        credentials
            .create(Credential {
                id: admin.id,
                password_hash: hash_password(&config.admin_password, bcrypt::DEFAULT_COST).await?,
            })
            .await?;
        tracing::info!(email = %admin.email, "administrador inicial criado");
    }

    if habit_templates.list().await?.is_empty() {
        // O hábito de follow-up é do primeiro squad, quando ele acabou de ser criado.
        let alpha = squad_ids.first().copied();
        let defaults = [
            ("Login no Sistema", UserRole::ALL.to_vec(), None),
            ("Zeramento de Caixa de Entrada (MegaZap)", vec![UserRole::Salesperson], None),
            ("10 Tentativas de Contato (Novos)", vec![UserRole::Salesperson], None),
            ("Follow-up de Propostas (> 2 dias)", vec![UserRole::Salesperson], alpha),
            ("Validação de Métricas do Squad", vec![UserRole::Supervisor], None),
        ];
        for (title, role_target, squad_id) in defaults {
            habit_templates
                .create(HabitTemplate {
                    id: Uuid::new_v4(),
                    title: title.to_string(),
                    active: true,
                    role_target,
                    squad_id,
                })
                .await?;
        }
        tracing::info!("templates de hábito padrão criados");
    }

    if message_templates.list().await?.is_empty() {
        for (stage, content) in MESSAGE_TEMPLATES {
            message_templates
                .create(MessageTemplate {
                    id: Uuid::new_v4(),
                    stage,
                    content: content.to_string(),
                })
                .await?;
        }
        tracing::info!("templates de mensagem padrão criados");
    }

    Ok(())
}
