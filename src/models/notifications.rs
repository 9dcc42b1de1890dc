// src/models/notifications.rs

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::{Collection, Record};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    Alert,
    Warning,
    Success,
    Info,
}

// Vive só na memória da sessão.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppNotification {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub severity: Severity,
    pub title: String,
    pub message: String,
    pub is_read: bool,
    pub timestamp: DateTime<Utc>,
    pub action_link: Option<String>,
}

// Entrada do ledger de deduplicação: chave -> último dia em que disparou.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerEntry {
    pub id: Uuid,
    pub key: String,
    pub last_fired_on: NaiveDate,
}

impl Record for LedgerEntry {
    const COLLECTION: Collection = Collection::NotificationLedger;
    const LABEL: &'static str = "Registro de notificação";

    fn id(&self) -> Uuid {
        self.id
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationFeed {
    pub notifications: Vec<AppNotification>,
    pub unread_count: usize,
}
