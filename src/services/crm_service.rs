// src/services/crm_service.rs

use std::collections::HashSet;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::{
        clock::SharedClock,
        error::{AppError, AppResult},
    },
    config::RulesConfig,
    db::{Repository, SharedStore},
    models::{
        auth::User,
        crm::{
            CreateLeadPayload, CreateTaskPayload, InterestLevel, Lead, LeadFilter, LeadView, Note, NoteKind,
            PipelineStage, Task, TaskKind, UpdateLeadPayload,
        },
        dashboard::{PipelineBoard, StageColumn},
    },
    services::{
        dashboard_service::percent,
        visibility::{ensure_visible, visible_leads, visible_tasks},
    },
};

// =========================================================================
//  CLASSIFICAÇÃO (derivada, recalculada a cada leitura)
// =========================================================================

/// Follow-up vencido: data anterior a hoje e lead ainda aberto.
pub fn is_overdue(lead: &Lead, today: NaiveDate) -> bool {
    lead.is_open() && lead.next_follow_up < today
}

pub fn is_due_today(lead: &Lead, today: NaiveDate) -> bool {
    lead.is_open() && lead.next_follow_up == today
}

/// Parado: aberto e sem alteração há mais de `stale_after_days` dias.
pub fn is_stale(lead: &Lead, now: DateTime<Utc>, stale_after_days: i64) -> bool {
    lead.is_open() && now - lead.updated_at > Duration::days(stale_after_days)
}

/// Soma dos valores dos leads abertos. WON e LOST nunca entram.
pub fn pipeline_value(leads: &[Lead]) -> f64 {
    leads.iter().filter(|l| l.is_open()).map(|l| l.value).sum()
}

/// Uma coluna por estágio, na ordem do funil. O percentual é sobre o total aberto.
pub fn pipeline_board(leads: &[Lead]) -> PipelineBoard {
    let total = pipeline_value(leads);
    let columns = PipelineStage::ALL
        .into_iter()
        .map(|stage| {
            let in_stage: Vec<&Lead> = leads.iter().filter(|l| l.stage == stage).collect();
            let total_value: f64 = in_stage.iter().map(|l| l.value).sum();
            StageColumn {
                stage,
                label: stage.label(),
                count: in_stage.len(),
                total_value,
                percentage_of_total: percent(total_value, total),
            }
        })
        .collect();

    PipelineBoard {
        total_pipeline_value: total,
        columns,
    }
}

/// Recorte aplicado depois da visibilidade. Squad e dono só valem para gestores.
pub fn filter_leads(leads: Vec<Lead>, filter: &LeadFilter, viewer: &User) -> Vec<Lead> {
    let manager = viewer.role.is_manager();
    let text = filter
        .q
        .as_deref()
        .map(str::trim)
        .filter(|q| !q.is_empty())
        .map(str::to_lowercase);

    leads
        .into_iter()
        .filter(|l| !manager || filter.squad_id.is_none_or(|squad| l.squad_id == Some(squad)))
        .filter(|l| !manager || filter.owner_id.is_none_or(|owner| l.owner_id == owner))
        .filter(|l| match &text {
            Some(q) => {
                l.name.to_lowercase().contains(q)
                    || l.company.as_deref().is_some_and(|c| c.to_lowercase().contains(q))
            }
            None => true,
        })
        .collect()
}

// Ausente ou só espaços vira erro de validação.
fn required_text(raw: Option<String>, message: &str) -> AppResult<String> {
    raw.map(|text| text.trim().to_string())
        .filter(|text| !text.is_empty())
        .ok_or_else(|| AppError::validation(message))
}

/// Fila de ligações: vencidos, depois os de hoje, depois os quentes restantes.
pub fn follow_up_queue(leads: &[Lead], today: NaiveDate) -> Vec<Lead> {
    let overdue = leads.iter().filter(|l| is_overdue(l, today));
    let due_today = leads.iter().filter(|l| is_due_today(l, today));
    let mut queued: HashSet<Uuid> = HashSet::new();
    let mut queue = Vec::new();

    for lead in overdue.chain(due_today) {
        if queued.insert(lead.id) {
            queue.push(lead.clone());
        }
    }
    for lead in leads
        .iter()
        .filter(|l| l.is_open() && l.interest_level == Some(InterestLevel::Hot))
    {
        if queued.insert(lead.id) {
            queue.push(lead.clone());
        }
    }
    queue
}

#[derive(Clone)]
pub struct CrmService {
    leads: Repository<Lead>,
    tasks: Repository<Task>,
    users: Repository<User>,
    clock: SharedClock,
    rules: RulesConfig,
}

impl CrmService {
    pub fn new(store: SharedStore, clock: SharedClock, rules: RulesConfig) -> Self {
        Self {
            leads: Repository::new(store.clone()),
            tasks: Repository::new(store.clone()),
            users: Repository::new(store),
            clock,
            rules,
        }
    }

    pub fn classify(&self, lead: Lead) -> LeadView {
        let now = self.clock.now_utc();
        let today = self.clock.today();
        LeadView {
            is_overdue: is_overdue(&lead, today),
            is_stale: is_stale(&lead, now, self.rules.stale_after_days),
            lead,
        }
    }

    // =========================================================================
    //  1. LEITURA
    // =========================================================================

    /// Leads visíveis para o usuário, mais recentes primeiro.
    pub async fn list_leads(&self, actor: &User) -> AppResult<Vec<Lead>> {
        let all = self.leads.list().await?;
        let mut leads = visible_leads(&all, actor);
        leads.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(leads)
    }

    pub async fn filtered_leads(&self, actor: &User, filter: &LeadFilter) -> AppResult<Vec<Lead>> {
        Ok(filter_leads(self.list_leads(actor).await?, filter, actor))
    }

    pub async fn list_lead_views(&self, actor: &User, filter: &LeadFilter) -> AppResult<Vec<LeadView>> {
        let leads = self.filtered_leads(actor, filter).await?;
        Ok(leads.into_iter().map(|l| self.classify(l)).collect())
    }

    pub async fn get_lead(&self, actor: &User, lead_id: Uuid) -> AppResult<Lead> {
        let lead = self.leads.find(lead_id).await?;
        ensure_visible(actor, &lead)?;
        Ok(lead)
    }

    /// Percentuais sobre o total do conjunto filtrado.
    pub async fn board(&self, actor: &User, filter: &LeadFilter) -> AppResult<PipelineBoard> {
        Ok(pipeline_board(&self.filtered_leads(actor, filter).await?))
    }

    pub async fn queue(&self, actor: &User) -> AppResult<Vec<Lead>> {
        let leads = self.list_leads(actor).await?;
        Ok(follow_up_queue(&leads, self.clock.today()))
    }

    // =========================================================================
    //  2. CICLO DE VIDA
    // =========================================================================

    pub async fn create_lead(&self, actor: &User, payload: CreateLeadPayload) -> AppResult<Lead> {
        payload.validate()?;
        let name = required_text(payload.name, "O nome é obrigatório.")?;
        let phone = required_text(payload.phone, "O telefone é obrigatório.")?;
        if payload.notes.iter().any(|n| n.content.trim().is_empty()) {
            return Err(AppError::validation("A nota inicial não pode ficar vazia."));
        }
        let value = payload
            .value
            .ok_or_else(|| AppError::validation("O valor é obrigatório."))?;

        let now = self.clock.now_utc();
        let notes = payload
            .notes
            .into_iter()
            .map(|n| Note {
                id: Uuid::new_v4(),
                content: n.content,
                created_at: now,
                kind: n.kind,
                created_by: Some(actor.id),
            })
            .collect();

        let lead = Lead {
            id: Uuid::new_v4(),
            name,
            company: payload.company,
            email: payload.email,
            phone,
            value,
            stage: payload.stage.unwrap_or(PipelineStage::Qualified),
            next_follow_up: payload.next_follow_up.unwrap_or_else(|| self.clock.today()),
            notes,
            tags: payload.tags,
            owner_id: actor.id,
            squad_id: actor.squad_id,
            created_at: now,
            updated_at: now,
            source: payload.source,
            interest_level: payload.interest_level,
            product_of_interest: payload.product_of_interest,
        };

        let lead = self.leads.create(lead).await?;
        tracing::info!(lead = %lead.id, owner = %actor.id, "lead criado");
        Ok(lead)
    }

    pub async fn update_lead(&self, actor: &User, lead_id: Uuid, patch: UpdateLeadPayload) -> AppResult<Lead> {
        patch.validate()?;
        let mut lead = self.get_lead(actor, lead_id).await?;

        if let Some(name) = patch.name {
            lead.name = required_text(Some(name), "O nome não pode ficar vazio.")?;
        }
        if let Some(company) = patch.company {
            lead.company = Some(company);
        }
        if let Some(email) = patch.email {
            lead.email = Some(email);
        }
        if let Some(phone) = patch.phone {
            lead.phone = required_text(Some(phone), "O telefone não pode ficar vazio.")?;
        }
        if let Some(value) = patch.value {
            lead.value = value;
        }
        if let Some(date) = patch.next_follow_up {
            lead.next_follow_up = date;
        }
        if let Some(tags) = patch.tags {
            lead.tags = tags;
        }
        if let Some(source) = patch.source {
            lead.source = Some(source);
        }
        if let Some(level) = patch.interest_level {
            lead.interest_level = Some(level);
        }
        if let Some(product) = patch.product_of_interest {
            lead.product_of_interest = Some(product);
        }
        lead.updated_at = self.clock.now_utc();

        self.leads.update(lead).await
    }

    /// Só a mutação. Efeitos derivados (ex.: rascunho de mensagem) são do chamador.
    pub async fn change_stage(&self, actor: &User, lead_id: Uuid, new_stage: PipelineStage) -> AppResult<Lead> {
        let mut lead = self.get_lead(actor, lead_id).await?;

        if lead.stage == new_stage {
            return Ok(lead);
        }
        // Reabrir lead ganho/perdido não é uma transição definida.
        if lead.stage.is_terminal() {
            return Err(AppError::validation(format!(
                "O lead está em {} e não pode mudar de estágio.",
                lead.stage
            )));
        }

        let from = lead.stage;
        lead.stage = new_stage;
        lead.updated_at = self.clock.now_utc();
        let lead = self.leads.update(lead).await?;
        tracing::info!(lead = %lead.id, %from, to = %new_stage, "estágio alterado");
        Ok(lead)
    }

    pub async fn change_stage_str(&self, actor: &User, lead_id: Uuid, raw_stage: &str) -> AppResult<Lead> {
        let stage: PipelineStage = raw_stage.parse()?;
        self.change_stage(actor, lead_id, stage).await
    }

    pub async fn append_note(&self, actor: &User, lead_id: Uuid, content: &str, kind: NoteKind) -> AppResult<Lead> {
        if content.trim().is_empty() {
            return Err(AppError::validation("A nota não pode ficar vazia."));
        }
        let mut lead = self.get_lead(actor, lead_id).await?;
        let now = self.clock.now_utc();

        lead.notes.insert(
            0,
            Note {
                id: Uuid::new_v4(),
                content: content.to_string(),
                created_at: now,
                kind,
                created_by: Some(actor.id),
            },
        );
        lead.updated_at = now;

        self.leads.update(lead).await
    }

    /// Remoção definitiva. Tarefas que apontam para o lead ficam órfãs.
    pub async fn delete_lead(&self, actor: &User, lead_id: Uuid) -> AppResult<()> {
        self.get_lead(actor, lead_id).await?;
        self.leads.delete(lead_id).await?;
        tracing::info!(lead = %lead_id, by = %actor.id, "lead removido");
        Ok(())
    }

    // =========================================================================
    //  3. TAREFAS
    // =========================================================================

    pub async fn list_tasks(&self, actor: &User) -> AppResult<Vec<Task>> {
        let tasks = self.tasks.list().await?;
        let users = self.users.list().await?;
        Ok(visible_tasks(&tasks, &users, actor))
    }

    pub async fn create_task(&self, actor: &User, payload: CreateTaskPayload) -> AppResult<Task> {
        payload.validate()?;

        // O lead vinculado passa pela mesma regra de visibilidade da leitura.
        let linked = match payload.lead_id {
            Some(lead_id) => match self.get_lead(actor, lead_id).await {
                Ok(lead) => Some(lead),
                Err(AppError::NotFound(_)) => None,
                Err(err) => return Err(err),
            },
            None => None,
        };
        let lead_name = payload
            .lead_name
            .or_else(|| linked.map(|l| l.name))
            .unwrap_or_else(|| "Geral".to_string());

        let task = Task {
            id: Uuid::new_v4(),
            kind: if payload.lead_id.is_some() { TaskKind::FollowUp } else { TaskKind::Habit },
            lead_id: payload.lead_id,
            lead_name: Some(lead_name),
            title: payload.title,
            due_date: payload.due_date,
            completed: false,
            priority: payload.priority,
            assigned_to: actor.id,
        };
        self.tasks.create(task).await
    }

    pub async fn toggle_task(&self, actor: &User, task_id: Uuid) -> AppResult<Task> {
        let mut task = self.own_task(actor, task_id).await?;
        task.completed = !task.completed;
        self.tasks.update(task).await
    }

    pub async fn delete_task(&self, actor: &User, task_id: Uuid) -> AppResult<()> {
        self.own_task(actor, task_id).await?;
        self.tasks.delete(task_id).await
    }

    async fn own_task(&self, actor: &User, task_id: Uuid) -> AppResult<Task> {
        let task = self.tasks.find(task_id).await?;
        if task.assigned_to != actor.id {
            return Err(AppError::forbidden("Só o responsável pode alterar esta tarefa."));
        }
        Ok(task)
    }
}
