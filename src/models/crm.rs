// src/models/crm.rs

use std::{fmt, str::FromStr};

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::error::AppError,
    db::{Collection, Record},
};

// --- ENUMS ---

// Estágios do funil, na ordem de progressão. WON e LOST são terminais.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PipelineStage {
    Qualified,
    Negotiation,
    ProposalSent,
    PaymentScheduled,
    PaymentSent,
    AwaitingPayment,
    #[serde(rename = "FOLLOW_UP_1")]
    FollowUp1,
    #[serde(rename = "FOLLOW_UP_2")]
    FollowUp2,
    #[serde(rename = "FOLLOW_UP_3_PLUS")]
    FollowUp3Plus,
    Won,
    Lost,
}

impl PipelineStage {
    pub const ALL: [PipelineStage; 11] = [
        PipelineStage::Qualified,
        PipelineStage::Negotiation,
        PipelineStage::ProposalSent,
        PipelineStage::PaymentScheduled,
        PipelineStage::PaymentSent,
        PipelineStage::AwaitingPayment,
        PipelineStage::FollowUp1,
        PipelineStage::FollowUp2,
        PipelineStage::FollowUp3Plus,
        PipelineStage::Won,
        PipelineStage::Lost,
    ];

    pub fn is_terminal(self) -> bool {
        matches!(self, PipelineStage::Won | PipelineStage::Lost)
    }

    pub fn position(self) -> usize {
        self as usize
    }

    pub fn code(self) -> &'static str {
        match self {
            PipelineStage::Qualified => "QUALIFIED",
            PipelineStage::Negotiation => "NEGOTIATION",
            PipelineStage::ProposalSent => "PROPOSAL_SENT",
            PipelineStage::PaymentScheduled => "PAYMENT_SCHEDULED",
            PipelineStage::PaymentSent => "PAYMENT_SENT",
            PipelineStage::AwaitingPayment => "AWAITING_PAYMENT",
            PipelineStage::FollowUp1 => "FOLLOW_UP_1",
            PipelineStage::FollowUp2 => "FOLLOW_UP_2",
            PipelineStage::FollowUp3Plus => "FOLLOW_UP_3_PLUS",
            PipelineStage::Won => "WON",
            PipelineStage::Lost => "LOST",
        }
    }

    /// Rótulo exibido no quadro.
    pub fn label(self) -> &'static str {
        match self {
            PipelineStage::Qualified => "Qualificado",
            PipelineStage::Negotiation => "Negociação",
            PipelineStage::ProposalSent => "Proposta Enviada",
            PipelineStage::PaymentScheduled => "Agendou pagamento",
            PipelineStage::PaymentSent => "Pagamento Enviado",
            PipelineStage::AwaitingPayment => "Aguardando Pagamento",
            PipelineStage::FollowUp1 => "FOLLOW UP 1",
            PipelineStage::FollowUp2 => "FOLLOW-UP 2",
            PipelineStage::FollowUp3Plus => "FOLLOW-UP 3+",
            PipelineStage::Won => "Ganho",
            PipelineStage::Lost => "Perdido",
        }
    }
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

// Aceita o código ou o rótulo. Qualquer outro texto é rejeitado.
impl FromStr for PipelineStage {
    type Err = AppError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let trimmed = raw.trim();
        PipelineStage::ALL
            .into_iter()
            .find(|s| s.code().eq_ignore_ascii_case(trimmed) || s.label() == trimmed)
            .ok_or_else(|| AppError::validation(format!("Estágio '{}' não existe no funil.", raw)))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoteKind {
    Call,
    Email,
    Meeting,
    Note,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LeadSource {
    Inbound,
    Referral,
    Sdr,
    Migration,
    Renewal,
    LeadBase,
    Automation,
    Ebook,
    Cart,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InterestLevel {
    Cold,
    Warm,
    Hot,
}

// --- NOTAS (linha do tempo) ---

// Imutável depois de criada.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    pub id: Uuid,
    pub content: String,
    pub created_at: DateTime<Utc>,
    #[serde(rename = "type")]
    pub kind: NoteKind,
    pub created_by: Option<Uuid>,
}

// --- LEAD ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Lead {
    pub id: Uuid,
    pub name: String,
    // "Local/Cidade" ou organização
    pub company: Option<String>,
    pub email: Option<String>,
    pub phone: String,
    pub value: f64,
    pub stage: PipelineStage,
    pub next_follow_up: NaiveDate,
    // Mais recente primeiro
    pub notes: Vec<Note>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub owner_id: Uuid,
    // Copiado do dono na criação
    pub squad_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub source: Option<LeadSource>,
    pub interest_level: Option<InterestLevel>,
    pub product_of_interest: Option<String>,
}

impl Lead {
    pub fn is_open(&self) -> bool {
        !self.stage.is_terminal()
    }

    /// Notas em ordem cronológica (mais antiga primeiro), para resumos.
    pub fn chronological_notes(&self) -> Vec<&Note> {
        let mut notes: Vec<&Note> = self.notes.iter().collect();
        notes.sort_by_key(|n| n.created_at);
        notes
    }
}

impl Record for Lead {
    const COLLECTION: Collection = Collection::Leads;
    const LABEL: &'static str = "Lead";

    fn id(&self) -> Uuid {
        self.id
    }
}

/// Lead com a classificação derivada (nunca gravada).
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeadView {
    #[serde(flatten)]
    pub lead: Lead,
    pub is_overdue: bool,
    pub is_stale: bool,
}

// --- TAREFAS ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskKind {
    Habit,
    FollowUp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: Uuid,
    // Pode apontar para um lead já apagado
    pub lead_id: Option<Uuid>,
    pub lead_name: Option<String>,
    pub title: String,
    pub due_date: NaiveDate,
    pub completed: bool,
    pub priority: Priority,
    pub assigned_to: Uuid,
    #[serde(rename = "type")]
    pub kind: TaskKind,
}

impl Record for Task {
    const COLLECTION: Collection = Collection::Tasks;
    const LABEL: &'static str = "Tarefa";

    fn id(&self) -> Uuid {
        self.id
    }
}

// --- PAYLOADS ---

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NotePayload {
    #[validate(length(min = 1, message = "A nota não pode ficar vazia."))]
    pub content: String,
    #[serde(rename = "type", default = "default_note_kind")]
    pub kind: NoteKind,
}

fn default_note_kind() -> NoteKind {
    NoteKind::Note
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateLeadPayload {
    #[validate(
        required(message = "O nome é obrigatório."),
        length(min = 1, message = "O nome é obrigatório.")
    )]
    pub name: Option<String>,
    pub company: Option<String>,
    #[validate(email(message = "O e-mail fornecido é inválido."))]
    pub email: Option<String>,
    #[validate(
        required(message = "O telefone é obrigatório."),
        length(min = 1, message = "O telefone é obrigatório.")
    )]
    pub phone: Option<String>,
    #[validate(
        required(message = "O valor é obrigatório."),
        range(min = 0.0, message = "O valor não pode ser negativo.")
    )]
    pub value: Option<f64>,
    pub stage: Option<PipelineStage>,
    // Ausente = hoje
    pub next_follow_up: Option<NaiveDate>,
    #[validate(length(min = 1, message = "O lead precisa de ao menos uma nota inicial."))]
    pub notes: Vec<NotePayload>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub source: Option<LeadSource>,
    pub interest_level: Option<InterestLevel>,
    pub product_of_interest: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateLeadPayload {
    #[validate(length(min = 1, message = "O nome não pode ficar vazio."))]
    pub name: Option<String>,
    pub company: Option<String>,
    #[validate(email(message = "O e-mail fornecido é inválido."))]
    pub email: Option<String>,
    #[validate(length(min = 1, message = "O telefone não pode ficar vazio."))]
    pub phone: Option<String>,
    #[validate(range(min = 0.0, message = "O valor não pode ser negativo."))]
    pub value: Option<f64>,
    pub next_follow_up: Option<NaiveDate>,
    pub tags: Option<Vec<String>>,
    pub source: Option<LeadSource>,
    pub interest_level: Option<InterestLevel>,
    pub product_of_interest: Option<String>,
}

/// Recorte da lista e do quadro (`?squadId=&ownerId=&q=`).
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeadFilter {
    pub squad_id: Option<Uuid>,
    pub owner_id: Option<Uuid>,
    // Busca por nome ou empresa, sem diferenciar maiúsculas
    pub q: Option<String>,
}

// O estágio chega como texto para que valores fora do enum virem ValidationError.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeStagePayload {
    pub stage: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateTaskPayload {
    #[validate(length(min = 1, message = "O título é obrigatório."))]
    pub title: String,
    pub lead_id: Option<Uuid>,
    pub lead_name: Option<String>,
    pub due_date: NaiveDate,
    #[serde(default)]
    pub priority: Priority,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_order_matches_the_funnel() {
        let positions: Vec<usize> = PipelineStage::ALL.iter().map(|s| s.position()).collect();
        assert_eq!(positions, (0..11).collect::<Vec<_>>());
        assert!(PipelineStage::Qualified < PipelineStage::ProposalSent);
        assert!(PipelineStage::FollowUp3Plus < PipelineStage::Won);
    }

    #[test]
    fn only_won_and_lost_are_terminal() {
        let terminal: Vec<_> = PipelineStage::ALL.into_iter().filter(|s| s.is_terminal()).collect();
        assert_eq!(terminal, vec![PipelineStage::Won, PipelineStage::Lost]);
    }

    #[test]
    fn stage_parsing_accepts_codes_and_labels_only() {
        assert_eq!("PROPOSAL_SENT".parse::<PipelineStage>().unwrap(), PipelineStage::ProposalSent);
        assert_eq!("follow_up_2".parse::<PipelineStage>().unwrap(), PipelineStage::FollowUp2);
        assert_eq!("Ganho".parse::<PipelineStage>().unwrap(), PipelineStage::Won);
        assert!(matches!("ARCHIVED".parse::<PipelineStage>(), Err(AppError::Validation(_))));
        assert!("".parse::<PipelineStage>().is_err());
    }

    #[test]
    fn stage_serializes_as_code() {
        let json = serde_json::to_string(&PipelineStage::FollowUp3Plus).unwrap();
        assert_eq!(json, "\"FOLLOW_UP_3_PLUS\"");
        let back: PipelineStage = serde_json::from_str("\"AWAITING_PAYMENT\"").unwrap();
        assert_eq!(back, PipelineStage::AwaitingPayment);
        assert!(serde_json::from_str::<PipelineStage>("\"ARCHIVED\"").is_err());
    }

    #[test]
    fn create_payload_requires_name_phone_value_and_note() {
        let payload: CreateLeadPayload = serde_json::from_value(serde_json::json!({
            "name": "",
            "phone": "",
            "notes": []
        }))
        .unwrap();
        let errors = payload.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("name"));
        assert!(fields.contains_key("phone"));
        assert!(fields.contains_key("value"));
        assert!(fields.contains_key("notes"));
    }

    #[test]
    fn absent_name_and_phone_still_deserialize_and_fail_validation() {
        let payload: CreateLeadPayload = serde_json::from_value(serde_json::json!({
            "value": 10.0,
            "notes": [{ "content": "Oi" }]
        }))
        .unwrap();
        let errors = payload.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("name"));
        assert!(fields.contains_key("phone"));
        assert!(!fields.contains_key("value"));
    }
}
