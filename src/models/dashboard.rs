// src/models/dashboard.rs

use serde::Serialize;
use uuid::Uuid;

use crate::models::{
    auth::User,
    crm::{LeadView, PipelineStage, Task},
    goals::GoalProgress,
    habits::DailyHabit,
    notifications::NotificationFeed,
    settings::MessageTemplate,
};

// 1. Os cards do topo
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineStats {
    pub total_pipeline: f64,  // Soma dos leads abertos
    pub deals_count: usize,   // Todos os leads visíveis
    pub pending_tasks: usize,
    pub daily_progress: u32,  // % dos hábitos de hoje concluídos
}

// 2. Uma coluna do quadro (largura do funil)
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StageColumn {
    pub stage: PipelineStage,
    pub label: &'static str,
    pub count: usize,
    pub total_value: f64,
    pub percentage_of_total: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineBoard {
    pub total_pipeline_value: f64,
    pub columns: Vec<StageColumn>,
}

// 3. Desempenho do squad
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SellerRankingEntry {
    pub user_id: Uuid,
    pub user_name: String,
    pub deals_won: usize,
    pub value_won: f64,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityVolumeEntry {
    pub user_id: Uuid,
    pub user_name: String,
    pub calls: usize,
    pub emails: usize,
    pub meetings: usize,
    pub notes: usize,
    pub daily_progress: u32,
    // Leads abertos do vendedor
    pub pipeline_value: f64,
    pub stale_leads: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FunnelStageEntry {
    pub stage: PipelineStage,
    // Leads parados neste estágio agora
    pub count: usize,
    // Leads que chegaram a este estágio ou além
    pub reached: usize,
    pub conversion_rate: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SquadPerformance {
    pub squad_id: Uuid,
    pub total_pipeline_value: f64,
    pub deals_won_this_month: usize,
    pub deals_won_value_this_month: f64,
    pub seller_ranking: Vec<SellerRankingEntry>,
    pub activity_volume: Vec<ActivityVolumeEntry>,
    pub funnel_conversion: Vec<FunnelStageEntry>,
}

// 4. Tudo o que a tela principal carrega de uma vez
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Workspace {
    pub user: User,
    pub leads: Vec<LeadView>,
    pub tasks: Vec<Task>,
    pub habits: Vec<DailyHabit>,
    pub message_templates: Vec<MessageTemplate>,
    pub goals: Vec<GoalProgress>,
    pub squad_performance: Option<SquadPerformance>,
    pub stats: PipelineStats,
    pub notifications: NotificationFeed,
}
