// src/db/ledger.rs

use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use uuid::Uuid;

use crate::{
    common::error::AppResult,
    db::{repository::Repository, store::SharedStore},
    models::notifications::LedgerEntry,
};

/// Ledger de deduplicação das regras de notificação: chave -> último dia disparado.
///
/// Leitura e escrita são feitas por regra, sem transação (último a escrever vence).
/// Com várias sessões concorrentes seria preciso um único escritor.
#[async_trait]
pub trait NotificationLedger: Send + Sync {
    async fn last_fired(&self, key: &str) -> AppResult<Option<NaiveDate>>;

    async fn mark_fired(&self, key: &str, day: NaiveDate) -> AppResult<()>;
}

pub type SharedLedger = Arc<dyn NotificationLedger>;

// Ledger persistido como uma coleção comum do store.
#[derive(Clone)]
pub struct StoreLedger {
    entries: Repository<LedgerEntry>,
}

impl StoreLedger {
    pub fn new(store: SharedStore) -> Self {
        Self {
            entries: Repository::new(store),
        }
    }

    async fn entry(&self, key: &str) -> AppResult<Option<LedgerEntry>> {
        Ok(self
            .entries
            .list_where(|e| e.key == key)
            .await?
            .into_iter()
            .next())
    }
}

#[async_trait]
impl NotificationLedger for StoreLedger {
    async fn last_fired(&self, key: &str) -> AppResult<Option<NaiveDate>> {
        Ok(self.entry(key).await?.map(|e| e.last_fired_on))
    }

    async fn mark_fired(&self, key: &str, day: NaiveDate) -> AppResult<()> {
        match self.entry(key).await? {
            Some(mut entry) => {
                entry.last_fired_on = day;
                self.entries.update(entry).await?;
            }
            None => {
                self.entries
                    .create(LedgerEntry {
                        id: Uuid::new_v4(),
                        key: key.to_string(),
                        last_fired_on: day,
                    })
                    .await?;
            }
        }
        Ok(())
    }
}
