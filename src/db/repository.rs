// src/db/repository.rs

use std::marker::PhantomData;

use crate::{
    common::error::{AppError, AppResult},
    db::store::{NewRow, Record, SharedStore},
};
use uuid::Uuid;

// Fachada tipada sobre o RecordStore: os serviços só falam com ela.
pub struct Repository<R> {
    store: SharedStore,
    _record: PhantomData<fn() -> R>,
}

impl<R> Clone for Repository<R> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            _record: PhantomData,
        }
    }
}

impl<R: Record> Repository<R> {
    pub fn new(store: SharedStore) -> Self {
        Self {
            store,
            _record: PhantomData,
        }
    }

    /// Snapshot da coleção no momento da chamada.
    pub async fn list(&self) -> AppResult<Vec<R>> {
        self.store
            .list(R::COLLECTION)
            .await?
            .into_iter()
            .map(|doc| serde_json::from_value(doc).map_err(AppError::from))
            .collect()
    }

    pub async fn list_where<F>(&self, predicate: F) -> AppResult<Vec<R>>
    where
        F: Fn(&R) -> bool,
    {
        let mut records = self.list().await?;
        records.retain(|r| predicate(r));
        Ok(records)
    }

    pub async fn get(&self, id: Uuid) -> AppResult<Option<R>> {
        match self.store.get(R::COLLECTION, id).await? {
            Some(doc) => Ok(Some(serde_json::from_value(doc)?)),
            None => Ok(None),
        }
    }

    /// Como `get`, mas id ausente vira NotFound.
    pub async fn find(&self, id: Uuid) -> AppResult<R> {
        self.get(id).await?.ok_or(AppError::NotFound(R::LABEL))
    }

    pub async fn create(&self, record: R) -> AppResult<R> {
        let doc = serde_json::to_value(&record)?;
        self.store.create(R::COLLECTION, record.id(), doc).await?;
        Ok(record)
    }

    /// Todos ou nenhum.
    pub async fn create_all(&self, records: Vec<R>) -> AppResult<Vec<R>> {
        let rows = records.iter().map(NewRow::of).collect::<AppResult<Vec<_>>>()?;
        self.store.create_many(rows).await?;
        Ok(records)
    }

    pub async fn update(&self, record: R) -> AppResult<R> {
        let doc = serde_json::to_value(&record)?;
        if !self.store.update(R::COLLECTION, record.id(), doc).await? {
            return Err(AppError::NotFound(R::LABEL));
        }
        Ok(record)
    }

    pub async fn delete(&self, id: Uuid) -> AppResult<()> {
        if !self.store.delete(R::COLLECTION, id).await? {
            return Err(AppError::NotFound(R::LABEL));
        }
        Ok(())
    }
}
