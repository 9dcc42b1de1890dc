// src/models/habits.rs

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::{
    db::{Collection, Record},
    models::auth::{User, UserRole},
};

// Definição de um hábito diário. Sem squad = global.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HabitTemplate {
    pub id: Uuid,
    pub title: String,
    pub active: bool,
    pub role_target: Vec<UserRole>,
    pub squad_id: Option<Uuid>,
}

impl HabitTemplate {
    /// O template vale para este usuário hoje?
    pub fn applies_to(&self, user: &User) -> bool {
        self.active
            && self.role_target.contains(&user.role)
            && self.squad_id.is_none_or(|squad| user.squad_id == Some(squad))
    }
}

impl Record for HabitTemplate {
    const COLLECTION: Collection = Collection::HabitTemplates;
    const LABEL: &'static str = "Template de hábito";

    fn id(&self) -> Uuid {
        self.id
    }
}

// Instância diária. O título é uma cópia: editar o template não reescreve o histórico.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyHabit {
    pub id: Uuid,
    pub template_id: Uuid,
    pub user_id: Uuid,
    pub date: NaiveDate,
    pub title: String,
    pub completed: bool,
}

impl Record for DailyHabit {
    const COLLECTION: Collection = Collection::DailyHabits;
    const LABEL: &'static str = "Hábito";

    fn id(&self) -> Uuid {
        self.id
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateHabitTemplatePayload {
    #[validate(length(min = 1, message = "O título é obrigatório."))]
    pub title: String,
    pub squad_id: Option<Uuid>,
    // Ausente = vendedores e supervisores
    pub role_target: Option<Vec<UserRole>>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateHabitTemplatePayload {
    #[validate(length(min = 1, message = "O título não pode ficar vazio."))]
    pub title: Option<String>,
    pub active: Option<bool>,
    pub role_target: Option<Vec<UserRole>>,
}
