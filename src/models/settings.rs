// src/models/settings.rs

use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::{
    db::{Collection, Record},
    models::crm::PipelineStage,
};

// Um template de mensagem por estágio.
// Placeholders: {{nome_lead}}, {{nome_vendedor}}, {{produto}}, {{company}}, {{data_followup}}
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageTemplate {
    pub id: Uuid,
    pub stage: PipelineStage,
    pub content: String,
}

impl Record for MessageTemplate {
    const COLLECTION: Collection = Collection::MessageTemplates;
    const LABEL: &'static str = "Template de mensagem";

    fn id(&self) -> Uuid {
        self.id
    }
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateMessageTemplatePayload {
    #[validate(length(min = 1, message = "O conteúdo é obrigatório."))]
    pub content: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderedMessage {
    pub lead_id: Uuid,
    pub stage: PipelineStage,
    pub content: String,
}
