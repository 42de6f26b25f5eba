use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use crate::features::shared::pagination::{CursorPage, CursorParams};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ListSyncRunsQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cursor: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<i64>,
    /// Filter by run status (running, completed, cancelled, failed)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

/// One reconciliation cycle as recorded in sync_runs
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct SyncRunItem {
    pub id: i64,
    pub status: String,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub fetched: i64,
    pub skipped: i64,
    pub inserted: i64,
    pub updated: i64,
    pub unchanged: i64,
    pub failed_batches: i32,
    pub error: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum ListSyncRunsError {
    #[error("{0}")]
    InvalidParams(&'static str),
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl ListSyncRunsQuery {
    pub fn params(&self) -> CursorParams {
        CursorParams::new(self.cursor, self.limit)
    }

    pub fn validate(&self) -> Result<(), ListSyncRunsError> {
        self.params()
            .validate()
            .map_err(ListSyncRunsError::InvalidParams)
    }
}

#[tracing::instrument(skip(pool))]
pub async fn handle(
    pool: PgPool,
    query: ListSyncRunsQuery,
) -> Result<CursorPage<SyncRunItem>, ListSyncRunsError> {
    query.validate()?;

    let params = query.params();
    let limit = params.limit();

    let total = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM sync_runs WHERE ($1::text IS NULL OR status = $1::text)",
    )
    .bind(query.status.as_deref())
    .fetch_one(&pool)
    .await?;

    let items = sqlx::query_as::<_, SyncRunItem>(
        r#"
        SELECT id, status, started_at, completed_at,
               fetched, skipped, inserted, updated, unchanged,
               failed_batches, error
        FROM sync_runs
        WHERE ($1::bigint IS NULL OR id > $1::bigint)
          AND ($2::text IS NULL OR status = $2::text)
        ORDER BY id
        LIMIT $3
        "#,
    )
    .bind(params.cursor)
    .bind(query.status.as_deref())
    .bind(limit)
    .fetch_all(&pool)
    .await?;

    Ok(CursorPage::from_rows(items, total, limit, |r| r.id))
}
