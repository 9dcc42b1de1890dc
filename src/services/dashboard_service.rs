// src/services/dashboard_service.rs

use chrono::{DateTime, FixedOffset, Utc};
use uuid::Uuid;

use crate::{
    common::{
        clock::{Month, SharedClock},
        error::AppResult,
    },
    config::RulesConfig,
    db::{Repository, SharedStore},
    models::{
        auth::{User, UserRole},
        crm::{Lead, NoteKind, PipelineStage, Task},
        dashboard::{ActivityVolumeEntry, FunnelStageEntry, PipelineStats, SellerRankingEntry, SquadPerformance},
        habits::DailyHabit,
    },
    services::{
        crm_service::{is_stale, pipeline_value},
        goal_service::won_in_month,
        habit_service::{completion_percent, HabitService},
        policy::{authorize, Action, Target},
        visibility::visible_leads,
    },
};

/// Percentual arredondado, com total zero (ou negativo) valendo 0.
pub fn percent(part: f64, whole: f64) -> u32 {
    if whole <= 0.0 || part <= 0.0 {
        return 0;
    }
    (part / whole * 100.0).round() as u32
}

pub fn pipeline_stats(leads: &[Lead], own_tasks: &[Task], today_habits: &[DailyHabit]) -> PipelineStats {
    PipelineStats {
        total_pipeline: pipeline_value(leads),
        deals_count: leads.len(),
        pending_tasks: own_tasks.iter().filter(|t| !t.completed).count(),
        daily_progress: completion_percent(today_habits),
    }
}

/// Conversão por sobrevivência: quantos chegaram a cada estágio (ou além).
/// WON conta como tendo passado por todos; LOST fica de fora.
pub fn funnel_conversion(leads: &[Lead]) -> Vec<FunnelStageEntry> {
    let mut entries: Vec<FunnelStageEntry> = Vec::new();
    for stage in PipelineStage::ALL.into_iter().filter(|s| *s != PipelineStage::Lost) {
        let count = leads.iter().filter(|l| l.stage == stage).count();
        let reached = leads
            .iter()
            .filter(|l| l.stage != PipelineStage::Lost && l.stage.position() >= stage.position())
            .count();
        let conversion_rate = match entries.last() {
            None if reached > 0 => 100,
            None => 0,
            Some(previous) => percent(reached as f64, previous.reached as f64),
        };
        entries.push(FunnelStageEntry {
            stage,
            count,
            reached,
            conversion_rate,
        });
    }
    entries
}

/// Ranking por valor ganho no mês, decrescente. Empates mantêm a ordem de entrada.
pub fn seller_ranking(sellers: &[User], leads: &[Lead], month: Month, offset: &FixedOffset) -> Vec<SellerRankingEntry> {
    let mut ranking: Vec<SellerRankingEntry> = sellers
        .iter()
        .map(|seller| {
            let won: Vec<&Lead> = won_in_month(leads, month, offset, |l| l.owner_id == seller.id).collect();
            SellerRankingEntry {
                user_id: seller.id,
                user_name: seller.name.clone(),
                deals_won: won.len(),
                value_won: won.iter().map(|l| l.value).sum(),
            }
        })
        .collect();
    ranking.sort_by(|a, b| b.value_won.total_cmp(&a.value_won));
    ranking
}

/// Contagem de notas do mês nos leads do vendedor, por tipo.
pub fn activity_volume(seller: &User, leads: &[Lead], month: Month, offset: &FixedOffset) -> ActivityVolumeEntry {
    let mut entry = ActivityVolumeEntry {
        user_id: seller.id,
        user_name: seller.name.clone(),
        ..Default::default()
    };
    let notes = leads
        .iter()
        .filter(|l| l.owner_id == seller.id)
        .flat_map(|l| l.notes.iter())
        .filter(|n| month.contains_instant(n.created_at, offset));
    for note in notes {
        match note.kind {
            NoteKind::Call => entry.calls += 1,
            NoteKind::Email => entry.emails += 1,
            NoteKind::Meeting => entry.meetings += 1,
            NoteKind::Note => entry.notes += 1,
        }
    }
    entry
}

/// Carteira aberta do vendedor: valor e quantos leads estão parados.
pub fn seller_pipeline(seller: &User, leads: &[Lead], now: DateTime<Utc>, stale_after_days: i64) -> (f64, usize) {
    let open: Vec<&Lead> = leads.iter().filter(|l| l.owner_id == seller.id && l.is_open()).collect();
    let value = open.iter().map(|l| l.value).sum();
    let stale = open.iter().filter(|l| is_stale(l, now, stale_after_days)).count();
    (value, stale)
}

#[derive(Clone)]
pub struct DashboardService {
    users: Repository<User>,
    leads: Repository<Lead>,
    tasks: Repository<Task>,
    habits: HabitService,
    clock: SharedClock,
    rules: RulesConfig,
}

impl DashboardService {
    pub fn new(store: SharedStore, habits: HabitService, clock: SharedClock, rules: RulesConfig) -> Self {
        Self {
            users: Repository::new(store.clone()),
            leads: Repository::new(store.clone()),
            tasks: Repository::new(store),
            habits,
            clock,
            rules,
        }
    }

    /// Cards do topo: leads visíveis, tarefas próprias e hábitos de hoje.
    pub async fn stats(&self, actor: &User) -> AppResult<PipelineStats> {
        let leads = visible_leads(&self.leads.list().await?, actor);
        let tasks = self.tasks.list_where(|t| t.assigned_to == actor.id).await?;
        let habits = self.habits.habits_for(actor.id, self.clock.today()).await?;
        Ok(pipeline_stats(&leads, &tasks, &habits))
    }

    /// Leitura pura sobre um snapshot das coleções.
    pub async fn squad_performance(&self, actor: &User, squad_id: Uuid) -> AppResult<SquadPerformance> {
        authorize(actor, Action::ViewSquadPerformance, Target::squad(Some(squad_id)))?;

        let sellers = self
            .users
            .list_where(|u| u.squad_id == Some(squad_id) && u.role == UserRole::Salesperson)
            .await?;
        let squad_leads = self.leads.list_where(|l| l.squad_id == Some(squad_id)).await?;

        let month = self.clock.current_month();
        let offset = *self.clock.now().offset();
        let today = self.clock.today();
        let now = self.clock.now_utc();

        let mut volume = Vec::with_capacity(sellers.len());
        for seller in &sellers {
            let mut entry = activity_volume(seller, &squad_leads, month, &offset);
            entry.daily_progress = self.habits.daily_progress(seller.id, today).await?;
            (entry.pipeline_value, entry.stale_leads) =
                seller_pipeline(seller, &squad_leads, now, self.rules.stale_after_days);
            volume.push(entry);
        }

        let won: Vec<&Lead> = won_in_month(&squad_leads, month, &offset, |_| true).collect();

        Ok(SquadPerformance {
            squad_id,
            total_pipeline_value: pipeline_value(&squad_leads),
            deals_won_this_month: won.len(),
            deals_won_value_this_month: won.iter().map(|l| l.value).sum(),
            seller_ranking: seller_ranking(&sellers, &squad_leads, month, &offset),
            activity_volume: volume,
            funnel_conversion: funnel_conversion(&squad_leads),
        })
    }
}
