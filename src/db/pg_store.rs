// src/db/pg_store.rs

use async_trait::async_trait;
use serde_json::Value;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::error::{AppError, AppResult},
    db::store::{Collection, NewRow, RecordStore},
};

// Tratamento de erro de chave duplicada
fn insert_error(e: sqlx::Error, collection: Collection, id: Uuid) -> AppError {
    if let sqlx::Error::Database(db_err) = &e {
        if db_err.is_unique_violation() {
            return AppError::Conflict(format!("Registro {} já existe em '{}'.", id, collection.as_str()));
        }
    }
    e.into()
}

// Store em Postgres: uma tabela `records` com os documentos em JSONB.
// `seq` (BIGSERIAL) preserva a ordem de inserção.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RecordStore for PgStore {
    async fn list(&self, collection: Collection) -> AppResult<Vec<Value>> {
        let rows = sqlx::query_scalar::<_, Value>(
            r#"
            SELECT data
            FROM records
            WHERE collection = $1
            ORDER BY seq ASC
            "#,
        )
        .bind(collection.as_str())
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    async fn get(&self, collection: Collection, id: Uuid) -> AppResult<Option<Value>> {
        let row = sqlx::query_scalar::<_, Value>(
            "SELECT data FROM records WHERE collection = $1 AND id = $2",
        )
        .bind(collection.as_str())
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    async fn create(&self, collection: Collection, id: Uuid, data: Value) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO records (collection, id, data)
            VALUES ($1, $2, $3)
            "#,
        )
        .bind(collection.as_str())
        .bind(id)
        .bind(&data)
        .execute(&self.pool)
        .await
        .map_err(|e| insert_error(e, collection, id))?;

        Ok(())
    }

    async fn create_many(&self, rows: Vec<NewRow>) -> AppResult<()> {
        let mut tx = self.pool.begin().await?;

        for row in rows {
            sqlx::query(
                r#"
                INSERT INTO records (collection, id, data)
                VALUES ($1, $2, $3)
                "#,
            )
            .bind(row.collection.as_str())
            .bind(row.id)
            .bind(&row.data)
            .execute(&mut *tx)
            .await
            .map_err(|e| insert_error(e, row.collection, row.id))?;
        }

        // Sem commit (erro acima) o drop da transação desfaz tudo.
        tx.commit().await?;
        Ok(())
    }

    async fn update(&self, collection: Collection, id: Uuid, data: Value) -> AppResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE records
            SET data = $3, updated_at = NOW()
            WHERE collection = $1 AND id = $2
            "#,
        )
        .bind(collection.as_str())
        .bind(id)
        .bind(&data)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete(&self, collection: Collection, id: Uuid) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM records WHERE collection = $1 AND id = $2")
            .bind(collection.as_str())
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
