// src/models/goals.rs

use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::db::{Collection, Record};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GoalTargetType {
    User,
    Squad,
}

// Só a configuração é gravada. O progresso é sempre recalculado (ver GoalProgress).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Goal {
    pub id: Uuid,
    pub target_id: Uuid,
    pub target_type: GoalTargetType,
    // YYYY-MM
    pub month: String,
    pub value_target: f64,
    pub count_target: u32,
}

impl Record for Goal {
    const COLLECTION: Collection = Collection::Goals;
    const LABEL: &'static str = "Meta";

    fn id(&self) -> Uuid {
        self.id
    }
}

/// Projeção calculada a partir dos leads ganhos no mês.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GoalProgress {
    #[serde(flatten)]
    pub goal: Goal,
    pub current_value: f64,
    pub current_count: u32,
    // % da meta de valor, arredondado
    pub attainment: u32,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SetGoalPayload {
    pub target_id: Uuid,
    pub target_type: GoalTargetType,
    #[validate(length(equal = 7, message = "O mês deve estar no formato YYYY-MM."))]
    pub month: String,
    #[validate(range(min = 0.0, message = "A meta de valor não pode ser negativa."))]
    pub value_target: f64,
    #[serde(default)]
    pub count_target: u32,
}
