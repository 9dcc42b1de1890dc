// src/db/memory_store.rs

use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::{
    common::error::{AppError, AppResult},
    db::store::{Collection, NewRow, RecordStore},
};

fn duplicate(collection: Collection, id: Uuid) -> AppError {
    AppError::Conflict(format!("Registro {} já existe em '{}'.", id, collection.as_str()))
}

// Store em memória: usado nos testes e quando não há DATABASE_URL.
// Cada chamada segura o lock só durante a própria operação.
#[derive(Default)]
pub struct MemoryStore {
    collections: RwLock<HashMap<Collection, Vec<(Uuid, Value)>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn list(&self, collection: Collection) -> AppResult<Vec<Value>> {
        let guard = self.collections.read().await;
        Ok(guard
            .get(&collection)
            .map(|rows| rows.iter().map(|(_, data)| data.clone()).collect())
            .unwrap_or_default())
    }

    async fn get(&self, collection: Collection, id: Uuid) -> AppResult<Option<Value>> {
        let guard = self.collections.read().await;
        Ok(guard
            .get(&collection)
            .and_then(|rows| rows.iter().find(|(row_id, _)| *row_id == id))
            .map(|(_, data)| data.clone()))
    }

    async fn create(&self, collection: Collection, id: Uuid, data: Value) -> AppResult<()> {
        let mut guard = self.collections.write().await;
        let rows = guard.entry(collection).or_default();
        if rows.iter().any(|(row_id, _)| *row_id == id) {
            return Err(duplicate(collection, id));
        }
        rows.push((id, data));
        Ok(())
    }

    async fn create_many(&self, rows: Vec<NewRow>) -> AppResult<()> {
        let mut guard = self.collections.write().await;

        // Valida o lote inteiro antes de tocar em qualquer coleção.
        let mut seen = std::collections::HashSet::new();
        for row in &rows {
            let taken = guard
                .get(&row.collection)
                .is_some_and(|existing| existing.iter().any(|(id, _)| *id == row.id));
            if taken || !seen.insert((row.collection, row.id)) {
                return Err(duplicate(row.collection, row.id));
            }
        }

        for row in rows {
            guard.entry(row.collection).or_default().push((row.id, row.data));
        }
        Ok(())
    }

    async fn update(&self, collection: Collection, id: Uuid, data: Value) -> AppResult<bool> {
        let mut guard = self.collections.write().await;
        let slot = guard
            .get_mut(&collection)
            .and_then(|rows| rows.iter_mut().find(|(row_id, _)| *row_id == id));
        match slot {
            Some((_, current)) => {
                *current = data;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete(&self, collection: Collection, id: Uuid) -> AppResult<bool> {
        let mut guard = self.collections.write().await;
        let Some(rows) = guard.get_mut(&collection) else {
            return Ok(false);
        };
        let before = rows.len();
        rows.retain(|(row_id, _)| *row_id != id);
        Ok(rows.len() != before)
    }
}
