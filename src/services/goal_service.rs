// src/services/goal_service.rs

use chrono::FixedOffset;
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::{
        clock::{Month, SharedClock},
        error::{AppError, AppResult},
    },
    db::{Repository, SharedStore},
    models::{
        auth::User,
        crm::{Lead, PipelineStage},
        goals::{Goal, GoalProgress, GoalTargetType, SetGoalPayload},
    },
    services::{
        dashboard_service::percent,
        policy::{authorize, Action, Target},
    },
};

/// Leads ganhos no mês (pelo `updated_at` no fuso de negócio) que pertencem ao alvo.
pub fn won_in_month<'a>(
    leads: &'a [Lead],
    month: Month,
    offset: &FixedOffset,
    belongs: impl Fn(&Lead) -> bool + 'a,
) -> impl Iterator<Item = &'a Lead> + 'a {
    let offset = *offset;
    leads.iter().filter(move |l| {
        l.stage == PipelineStage::Won && month.contains_instant(l.updated_at, &offset) && belongs(l)
    })
}

/// Progresso recalculado: função pura da coleção de leads e do mês.
pub fn compute_progress(goal: &Goal, leads: &[Lead], month: Month, offset: &FixedOffset) -> GoalProgress {
    let target_id = goal.target_id;
    let won: Vec<&Lead> = match goal.target_type {
        GoalTargetType::User => won_in_month(leads, month, offset, move |l| l.owner_id == target_id).collect(),
        GoalTargetType::Squad => won_in_month(leads, month, offset, move |l| l.squad_id == Some(target_id)).collect(),
    };
    let current_value: f64 = won.iter().map(|l| l.value).sum();

    GoalProgress {
        goal: goal.clone(),
        current_value,
        current_count: won.len() as u32,
        attainment: percent(current_value, goal.value_target),
    }
}

#[derive(Clone)]
pub struct GoalService {
    goals: Repository<Goal>,
    leads: Repository<Lead>,
    users: Repository<User>,
    clock: SharedClock,
}

impl GoalService {
    pub fn new(store: SharedStore, clock: SharedClock) -> Self {
        Self {
            goals: Repository::new(store.clone()),
            leads: Repository::new(store.clone()),
            users: Repository::new(store),
            clock,
        }
    }

    /// Upsert pela chave (alvo, tipo, mês).
    pub async fn set_goal(&self, actor: &User, payload: SetGoalPayload) -> AppResult<Goal> {
        payload.validate()?;
        let month = Month::parse(&payload.month)
            .ok_or_else(|| AppError::validation("O mês deve estar no formato YYYY-MM."))?;

        let target_squad = match payload.target_type {
            GoalTargetType::Squad => Some(payload.target_id),
            GoalTargetType::User => self.users.find(payload.target_id).await?.squad_id,
        };
        authorize(actor, Action::SetGoals, Target::squad(target_squad))?;

        let month_key = month.to_string();
        let existing = self
            .goals
            .list_where(|g| {
                g.target_id == payload.target_id && g.target_type == payload.target_type && g.month == month_key
            })
            .await?
            .into_iter()
            .next();

        let goal = match existing {
            Some(mut goal) => {
                goal.value_target = payload.value_target;
                goal.count_target = payload.count_target;
                self.goals.update(goal).await?
            }
            None => {
                self.goals
                    .create(Goal {
                        id: Uuid::new_v4(),
                        target_id: payload.target_id,
                        target_type: payload.target_type,
                        month: month_key,
                        value_target: payload.value_target,
                        count_target: payload.count_target,
                    })
                    .await?
            }
        };

        tracing::info!(goal = %goal.id, month = %goal.month, by = %actor.id, "meta definida");
        Ok(goal)
    }

    /// Metas do mês corrente do usuário e do squad dele. Sem meta = lista vazia.
    pub async fn current_goal_progress(&self, user: &User) -> AppResult<Vec<GoalProgress>> {
        let month = self.clock.current_month();
        let month_key = month.to_string();

        let goals = self
            .goals
            .list_where(|g| {
                g.month == month_key
                    && match g.target_type {
                        GoalTargetType::User => g.target_id == user.id,
                        GoalTargetType::Squad => Some(g.target_id) == user.squad_id,
                    }
            })
            .await?;
        if goals.is_empty() {
            return Ok(Vec::new());
        }

        let leads = self.leads.list().await?;
        let offset = *self.clock.now().offset();
        Ok(goals
            .iter()
            .map(|g| compute_progress(g, &leads, month, &offset))
            .collect())
    }
}
