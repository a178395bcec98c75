use async_trait::async_trait;
use serde_json::{Map, Value};
use sqlx::types::Json;
use time::OffsetDateTime;

use crate::application::store::{CacheStore, StoreError};
use crate::domain::entities::{CacheRecord, Fingerprint};
use crate::domain::types::ResourceKind;

use super::{PostgresStore, map_sqlx_error};

#[derive(sqlx::FromRow)]
struct CacheRecordRow {
    fingerprint: String,
    payload: Json<Map<String, Value>>,
    created_at: OffsetDateTime,
    modified_at: OffsetDateTime,
}

impl From<CacheRecordRow> for CacheRecord {
    fn from(row: CacheRecordRow) -> Self {
        Self {
            fingerprint: Fingerprint::new(row.fingerprint),
            payload: row.payload.0,
            created_at: row.created_at,
            modified_at: row.modified_at,
        }
    }
}

#[async_trait]
impl CacheStore for PostgresStore {
    async fn lookup(
        &self,
        kind: ResourceKind,
        fingerprint: &Fingerprint,
    ) -> Result<Option<CacheRecord>, StoreError> {
        let row: Option<CacheRecordRow> = sqlx::query_as::<_, CacheRecordRow>(
            r#"
            SELECT fingerprint, payload, created_at, modified_at
            FROM cache_records
            WHERE collection = $1 AND fingerprint = $2
            "#,
        )
        .bind(kind.as_str())
        .bind(fingerprint.as_str())
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(CacheRecord::from))
    }

    async fn insert(&self, kind: ResourceKind, record: &CacheRecord) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO cache_records (collection, fingerprint, payload, created_at, modified_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(kind.as_str())
        .bind(record.fingerprint.as_str())
        .bind(Json(&record.payload))
        .bind(record.created_at)
        .bind(record.modified_at)
        .execute(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(())
    }

    // The guard and the write happen in one statement so racing refreshes
    // settle on the newest modified_at without a transaction.
    async fn update(
        &self,
        kind: ResourceKind,
        fingerprint: &Fingerprint,
        payload: &Map<String, Value>,
        modified_at: OffsetDateTime,
    ) -> Result<(), StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE cache_records
            SET payload = CASE WHEN modified_at <= $4 THEN $3 ELSE payload END,
                modified_at = GREATEST(modified_at, $4)
            WHERE collection = $1 AND fingerprint = $2
            "#,
        )
        .bind(kind.as_str())
        .bind(fingerprint.as_str())
        .bind(Json(payload))
        .bind(modified_at)
        .execute(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }

        Ok(())
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1")
            .execute(self.pool())
            .await
            .map(|_| ())
            .map_err(map_sqlx_error)
    }
}
