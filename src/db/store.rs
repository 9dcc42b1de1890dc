// src/db/store.rs

use std::sync::Arc;

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::common::error::AppResult;

// Coleções duráveis do CRM.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Users,
    Credentials,
    Squads,
    Leads,
    Tasks,
    HabitTemplates,
    DailyHabits,
    MessageTemplates,
    Goals,
    NotificationLedger,
}

impl Collection {
    pub fn as_str(self) -> &'static str {
        match self {
            Collection::Users => "users",
            Collection::Credentials => "credentials",
            Collection::Squads => "squads",
            Collection::Leads => "leads",
            Collection::Tasks => "tasks",
            Collection::HabitTemplates => "habit_templates",
            Collection::DailyHabits => "daily_habits",
            Collection::MessageTemplates => "message_templates",
            Collection::Goals => "goals",
            Collection::NotificationLedger => "notification_ledger",
        }
    }
}

/// Contrato do armazenamento: documentos JSON por coleção, chaveados por id.
///
/// `list` devolve na ordem de inserção. `update` e `delete` retornam `false`
/// quando o id não existe; `create` falha com `Conflict` para id repetido.
/// `create_many` grava tudo ou nada, mesmo entre coleções diferentes.
/// O meio físico (memória, Postgres) é escolha de quem implementa.
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn list(&self, collection: Collection) -> AppResult<Vec<Value>>;

    async fn get(&self, collection: Collection, id: Uuid) -> AppResult<Option<Value>>;

    async fn create(&self, collection: Collection, id: Uuid, data: Value) -> AppResult<()>;

    async fn create_many(&self, rows: Vec<NewRow>) -> AppResult<()>;

    async fn update(&self, collection: Collection, id: Uuid, data: Value) -> AppResult<bool>;

    async fn delete(&self, collection: Collection, id: Uuid) -> AppResult<bool>;
}

pub type SharedStore = Arc<dyn RecordStore>;

/// Documento pronto para inserção.
#[derive(Debug, Clone)]
pub struct NewRow {
    pub collection: Collection,
    pub id: Uuid,
    pub data: Value,
}

impl NewRow {
    pub fn of<R: Record>(record: &R) -> AppResult<Self> {
        Ok(Self {
            collection: R::COLLECTION,
            id: record.id(),
            data: serde_json::to_value(record)?,
        })
    }
}

/// Um tipo que mora numa coleção do store.
pub trait Record: Serialize + DeserializeOwned + Send + Sync + 'static {
    const COLLECTION: Collection;
    // Nome usado nas mensagens de NotFound
    const LABEL: &'static str;

    fn id(&self) -> Uuid;
}
