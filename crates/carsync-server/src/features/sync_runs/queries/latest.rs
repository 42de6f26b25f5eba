use sqlx::PgPool;

use super::list::SyncRunItem;

#[derive(Debug, thiserror::Error)]
pub enum LatestSyncRunError {
    #[error("No reconciliation cycle has run yet")]
    NotFound,
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

#[tracing::instrument(skip(pool))]
pub async fn handle(pool: PgPool) -> Result<SyncRunItem, LatestSyncRunError> {
    sqlx::query_as::<_, SyncRunItem>(
        r#"
        SELECT id, status, started_at, completed_at,
               fetched, skipped, inserted, updated, unchanged,
               failed_batches, error
        FROM sync_runs
        ORDER BY id DESC
        LIMIT 1
        "#,
    )
    .fetch_optional(&pool)
    .await?
    .ok_or(LatestSyncRunError::NotFound)
}
