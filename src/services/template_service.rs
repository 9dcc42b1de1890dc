// src/services/template_service.rs

use std::sync::Arc;

use async_trait::async_trait;
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::error::AppResult,
    db::{Repository, SharedStore},
    models::{
        auth::User,
        crm::{Lead, Note, PipelineStage},
        settings::{MessageTemplate, RenderedMessage, UpdateMessageTemplatePayload},
    },
    services::policy::{authorize, Action, Target},
};

/// Gerador de rascunhos (ex.: um modelo de linguagem). Opcional: o CRM nunca
/// depende dele para funcionar, só o usa para sugerir texto.
#[async_trait]
pub trait DraftGenerator: Send + Sync {
    /// `notes` chegam em ordem cronológica.
    async fn draft(&self, stage: PipelineStage, lead: &Lead, notes: &[&Note]) -> anyhow::Result<String>;
}

pub type SharedDraftGenerator = Arc<dyn DraftGenerator>;

/// Substitui os placeholders conhecidos. Ausentes viram os textos padrão.
pub fn render_template(content: &str, lead: &Lead, seller_name: Option<&str>) -> String {
    let follow_up = lead.next_follow_up.format("%d/%m/%Y").to_string();
    content
        .replace("{{nome_lead}}", &lead.name)
        .replace("{{nome_vendedor}}", seller_name.unwrap_or("Vendedor"))
        .replace(
            "{{produto}}",
            lead.product_of_interest.as_deref().unwrap_or("material de estudos"),
        )
        .replace("{{company}}", lead.company.as_deref().unwrap_or("sua preparação"))
        .replace("{{data_followup}}", &follow_up)
}

#[derive(Clone)]
pub struct TemplateService {
    templates: Repository<MessageTemplate>,
    generator: Option<SharedDraftGenerator>,
}

impl TemplateService {
    pub fn new(store: SharedStore) -> Self {
        Self {
            templates: Repository::new(store),
            generator: None,
        }
    }

    pub fn with_generator(mut self, generator: SharedDraftGenerator) -> Self {
        self.generator = Some(generator);
        self
    }

    pub async fn list_templates(&self) -> AppResult<Vec<MessageTemplate>> {
        self.templates.list().await
    }

    async fn for_stage(&self, stage: PipelineStage) -> AppResult<Option<MessageTemplate>> {
        Ok(self.templates.list_where(|t| t.stage == stage).await?.into_iter().next())
    }

    /// Um template por estágio; a última escrita vence.
    pub async fn upsert_template(
        &self,
        actor: &User,
        stage: PipelineStage,
        payload: UpdateMessageTemplatePayload,
    ) -> AppResult<MessageTemplate> {
        payload.validate()?;
        authorize(actor, Action::ManageMessageTemplates, Target::default())?;

        let template = match self.for_stage(stage).await? {
            Some(mut existing) => {
                existing.content = payload.content;
                self.templates.update(existing).await?
            }
            None => {
                self.templates
                    .create(MessageTemplate {
                        id: Uuid::new_v4(),
                        stage,
                        content: payload.content,
                    })
                    .await?
            }
        };
        tracing::info!(%stage, by = %actor.id, "template de mensagem salvo");
        Ok(template)
    }

    /// Mensagem pronta para envio. Sem template para o estágio = texto vazio.
    pub async fn render(&self, stage: PipelineStage, lead: &Lead, seller: Option<&User>) -> AppResult<RenderedMessage> {
        let content = match self.for_stage(stage).await? {
            Some(template) => render_template(&template.content, lead, seller.map(|s| s.name.as_str())),
            None => String::new(),
        };
        Ok(RenderedMessage {
            lead_id: lead.id,
            stage,
            content,
        })
    }

    /// Pede um rascunho ao gerador; erro ou texto vazio caem no template renderizado.
    pub async fn suggest_message(&self, stage: PipelineStage, lead: &Lead, seller: Option<&User>) -> AppResult<RenderedMessage> {
        let fallback = self.render(stage, lead, seller).await?;
        let Some(generator) = &self.generator else {
            return Ok(fallback);
        };

        let notes = lead.chronological_notes();
        match generator.draft(stage, lead, &notes).await {
            Ok(text) if !text.trim().is_empty() => Ok(RenderedMessage {
                content: text,
                ..fallback
            }),
            Ok(_) => Ok(fallback),
            Err(e) => {
                tracing::warn!(lead = %lead.id, "gerador de rascunho falhou: {e:#}");
                Ok(fallback)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::{
        common::error::AppError,
        db::MemoryStore,
        models::auth::UserRole,
        test_support::{lead_for, user},
    };

    struct Echo(&'static str);

    #[async_trait]
    impl DraftGenerator for Echo {
        async fn draft(&self, _stage: PipelineStage, _lead: &Lead, notes: &[&Note]) -> anyhow::Result<String> {
            if self.0 == "falha" {
                anyhow::bail!("indisponível");
            }
            Ok(format!("{} ({} notas)", self.0, notes.len()))
        }
    }

    fn service() -> TemplateService {
        TemplateService::new(Arc::new(MemoryStore::new()))
    }

    fn content(text: &str) -> UpdateMessageTemplatePayload {
        UpdateMessageTemplatePayload { content: text.into() }
    }

    #[test]
    fn render_fills_placeholders_and_defaults() {
        let seller = user(UserRole::Salesperson, None);
        let mut lead = lead_for(&seller);
        lead.name = "Ana".into();
        lead.company = None;
        lead.product_of_interest = None;
        lead.next_follow_up = NaiveDate::from_ymd_opt(2024, 5, 7).unwrap();

        let text = "{{nome_lead}}|{{nome_vendedor}}|{{produto}}|{{company}}|{{data_followup}}|{{nome_lead}}";
        assert_eq!(
            render_template(text, &lead, None),
            "Ana|Vendedor|material de estudos|sua preparação|07/05/2024|Ana"
        );

        lead.company = Some("Olinda".into());
        lead.product_of_interest = Some("Curso PF".into());
        assert_eq!(
            render_template("{{produto}} {{company}} {{nome_vendedor}}", &lead, Some("Carlos")),
            "Curso PF Olinda Carlos"
        );
    }

    #[tokio::test]
    async fn upsert_keeps_one_template_per_stage() {
        let svc = service();
        let sup = user(UserRole::Supervisor, None);
        let first = svc.upsert_template(&sup, PipelineStage::Won, content("v1")).await.unwrap();
        let second = svc.upsert_template(&sup, PipelineStage::Won, content("v2")).await.unwrap();

        assert_eq!(first.id, second.id);
        let all = svc.list_templates().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].content, "v2");

        let seller = user(UserRole::Salesperson, None);
        let err = svc.upsert_template(&seller, PipelineStage::Won, content("x")).await.unwrap_err();
        assert!(matches!(err, AppError::Authorization(_)));
    }

    #[tokio::test]
    async fn missing_template_renders_empty() {
        let svc = service();
        let seller = user(UserRole::Salesperson, None);
        let msg = svc.render(PipelineStage::Negotiation, &lead_for(&seller), Some(&seller)).await.unwrap();
        assert_eq!(msg.content, "");
    }

    #[tokio::test]
    async fn suggestion_falls_back_to_template() {
        let admin = user(UserRole::Admin, None);
        let seller = user(UserRole::Salesperson, None);
        let lead = lead_for(&seller);

        let plain = service();
        plain.upsert_template(&admin, PipelineStage::Qualified, content("Oi {{nome_lead}}")).await.unwrap();
        let expected = format!("Oi {}", lead.name);
        assert_eq!(plain.suggest_message(PipelineStage::Qualified, &lead, None).await.unwrap().content, expected);

        let store = Arc::new(MemoryStore::new());
        let failing = TemplateService::new(store.clone()).with_generator(Arc::new(Echo("falha")));
        failing.upsert_template(&admin, PipelineStage::Qualified, content("Oi {{nome_lead}}")).await.unwrap();
        assert_eq!(failing.suggest_message(PipelineStage::Qualified, &lead, None).await.unwrap().content, expected);

        let working = TemplateService::new(store).with_generator(Arc::new(Echo("rascunho")));
        let draft = working.suggest_message(PipelineStage::Qualified, &lead, None).await.unwrap();
        assert_eq!(draft.content, format!("rascunho ({} notas)", lead.notes.len()));
    }
}
