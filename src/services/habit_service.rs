// src/services/habit_service.rs

use chrono::NaiveDate;
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::{
        clock::SharedClock,
        error::{AppError, AppResult},
    },
    db::{Repository, SharedStore},
    models::{
        auth::{User, UserRole},
        habits::{CreateHabitTemplatePayload, DailyHabit, HabitTemplate, UpdateHabitTemplatePayload},
    },
    services::{
        dashboard_service::percent,
        policy::{authorize, Action, Target},
    },
};

/// Papéis alvo quando o template não informa nenhum.
pub const DEFAULT_ROLE_TARGET: [UserRole; 2] = [UserRole::Salesperson, UserRole::Supervisor];

/// % concluído de um conjunto de hábitos. Conjunto vazio = 0.
pub fn completion_percent(habits: &[DailyHabit]) -> u32 {
    let done = habits.iter().filter(|h| h.completed).count();
    percent(done as f64, habits.len() as f64)
}

#[derive(Clone)]
pub struct HabitService {
    templates: Repository<HabitTemplate>,
    habits: Repository<DailyHabit>,
    clock: SharedClock,
}

impl HabitService {
    pub fn new(store: SharedStore, clock: SharedClock) -> Self {
        Self {
            templates: Repository::new(store.clone()),
            habits: Repository::new(store),
            clock,
        }
    }

    // =========================================================================
    //  1. MATERIALIZAÇÃO DIÁRIA
    // =========================================================================

    /// Idempotente: se já existe algum hábito do usuário no dia, devolve o que existe.
    pub async fn ensure_daily_habits(&self, user: &User, day: NaiveDate) -> AppResult<Vec<DailyHabit>> {
        if day < self.clock.today() {
            return Err(AppError::validation("Não é possível gerar hábitos para um dia passado."));
        }

        let existing = self.habits.list_where(|h| h.user_id == user.id && h.date == day).await?;
        if !existing.is_empty() {
            return Ok(existing);
        }

        let templates = self.templates.list_where(|t| t.applies_to(user)).await?;
        let fresh = templates
            .into_iter()
            .map(|template| DailyHabit {
                id: Uuid::new_v4(),
                template_id: template.id,
                user_id: user.id,
                date: day,
                title: template.title,
                completed: false,
            })
            .collect();
        // Um dia nunca fica com parte dos hábitos: ou todos, ou nenhum.
        let created = self.habits.create_all(fresh).await?;

        tracing::debug!(user = %user.id, %day, count = created.len(), "hábitos do dia gerados");
        Ok(created)
    }

    /// Hábitos já materializados, sem criar nada.
    pub async fn habits_for(&self, user_id: Uuid, day: NaiveDate) -> AppResult<Vec<DailyHabit>> {
        self.habits.list_where(|h| h.user_id == user_id && h.date == day).await
    }

    pub async fn toggle_habit(&self, actor: &User, habit_id: Uuid) -> AppResult<DailyHabit> {
        let mut habit = self.habits.find(habit_id).await?;
        if habit.user_id != actor.id {
            return Err(AppError::forbidden("Só o dono pode marcar este hábito."));
        }
        habit.completed = !habit.completed;
        self.habits.update(habit).await
    }

    pub async fn daily_progress(&self, user_id: Uuid, day: NaiveDate) -> AppResult<u32> {
        Ok(completion_percent(&self.habits_for(user_id, day).await?))
    }

    // =========================================================================
    //  2. TEMPLATES (gestão)
    // =========================================================================

    /// Gestores veem os globais e os do próprio squad; ADMIN/COORDINATOR veem todos.
    pub async fn list_templates(&self, actor: &User) -> AppResult<Vec<HabitTemplate>> {
        let all = self.templates.list().await?;
        if actor.role.is_full_admin() {
            return Ok(all);
        }
        Ok(all
            .into_iter()
            .filter(|t| t.squad_id.is_none() || t.squad_id == actor.squad_id)
            .collect())
    }

    pub async fn add_template(&self, actor: &User, payload: CreateHabitTemplatePayload) -> AppResult<HabitTemplate> {
        payload.validate()?;
        authorize(actor, Action::ManageHabitTemplates, Target::squad(payload.squad_id))?;

        let template = HabitTemplate {
            id: Uuid::new_v4(),
            title: payload.title,
            active: true,
            role_target: payload
                .role_target
                .filter(|roles| !roles.is_empty())
                .unwrap_or_else(|| DEFAULT_ROLE_TARGET.to_vec()),
            squad_id: payload.squad_id,
        };
        let template = self.templates.create(template).await?;
        tracing::info!(template = %template.id, by = %actor.id, "template de hábito criado");
        Ok(template)
    }

    /// Não reescreve hábitos já materializados.
    pub async fn update_template(
        &self,
        actor: &User,
        template_id: Uuid,
        payload: UpdateHabitTemplatePayload,
    ) -> AppResult<HabitTemplate> {
        payload.validate()?;
        let mut template = self.templates.find(template_id).await?;
        authorize(actor, Action::ManageHabitTemplates, Target::squad(template.squad_id))?;

        if let Some(title) = payload.title {
            template.title = title;
        }
        if let Some(active) = payload.active {
            template.active = active;
        }
        if let Some(roles) = payload.role_target {
            template.role_target = roles;
        }
        self.templates.update(template).await
    }

    pub async fn delete_template(&self, actor: &User, template_id: Uuid) -> AppResult<()> {
        let template = self.templates.find(template_id).await?;
        authorize(actor, Action::ManageHabitTemplates, Target::squad(template.squad_id))?;
        self.templates.delete(template_id).await?;
        tracing::info!(template = %template_id, by = %actor.id, "template de hábito removido");
        Ok(())
    }
}
