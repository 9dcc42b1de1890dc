// src/services/workspace.rs

use crate::{
    common::{clock::SharedClock, error::AppResult},
    models::{auth::User, dashboard::Workspace},
    services::{
        crm_service::CrmService,
        dashboard_service::{pipeline_stats, DashboardService},
        goal_service::GoalService,
        habit_service::HabitService,
        notification_service::NotificationService,
        policy::{grant_for, Action, Grant},
        template_service::TemplateService,
    },
};

/// Um ciclo de carga: lê tudo, materializa os hábitos do dia e só então
/// roda as regras de notificação sobre esse snapshot.
#[derive(Clone)]
pub struct WorkspaceService {
    crm: CrmService,
    habits: HabitService,
    goals: GoalService,
    dashboard: DashboardService,
    templates: TemplateService,
    notifications: NotificationService,
    clock: SharedClock,
}

impl WorkspaceService {
    pub fn new(
        crm: CrmService,
        habits: HabitService,
        goals: GoalService,
        dashboard: DashboardService,
        templates: TemplateService,
        notifications: NotificationService,
        clock: SharedClock,
    ) -> Self {
        Self {
            crm,
            habits,
            goals,
            dashboard,
            templates,
            notifications,
            clock,
        }
    }

    pub async fn load_workspace(&self, user: &User) -> AppResult<Workspace> {
        let today = self.clock.today();

        let leads = self.crm.list_leads(user).await?;
        let tasks = self.crm.list_tasks(user).await?;
        let habits = self.habits.ensure_daily_habits(user, today).await?;
        let message_templates = self.templates.list_templates().await?;
        let goals = self.goals.current_goal_progress(user).await?;

        let squad_performance = match (user.squad_id, grant_for(user.role, Action::ViewSquadPerformance)) {
            (Some(squad_id), Grant::Anyone | Grant::OwnSquad) => {
                Some(self.dashboard.squad_performance(user, squad_id).await?)
            }
            _ => None,
        };

        let own_tasks: Vec<_> = tasks.iter().filter(|t| t.assigned_to == user.id).cloned().collect();
        let stats = pipeline_stats(&leads, &own_tasks, &habits);

        self.notifications.evaluate(user, &leads, &habits).await?;
        let notifications = self.notifications.feed(user.id).await;

        tracing::debug!(user = %user.id, leads = leads.len(), "workspace carregado");
        Ok(Workspace {
            user: user.clone(),
            leads: leads.into_iter().map(|l| self.crm.classify(l)).collect(),
            tasks,
            habits,
            message_templates,
            goals,
            squad_performance,
            stats,
            notifications,
        })
    }
}
