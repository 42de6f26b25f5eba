//! Reconciliation engine
//!
//! Orchestrates one sync cycle: fetch the external snapshot, normalize it,
//! partition into batches, and commit one transaction per batch with retry.
//! A fetch failure aborts the cycle before any catalog writes; a failed batch
//! never blocks the batches after it, and progress already committed stays
//! committed.

use std::collections::HashMap;

use serde::Serialize;
use sqlx::{PgPool, Postgres, Transaction};
use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use super::client::{CatalogClient, FetchError};
use super::config::{SyncConfig, YearRange};
use super::normalize::{normalize, NormalizedVehicle};
use super::resolver;
use super::retry::RetryPolicy;

/// Tallies emitted at the end of a reconciliation cycle
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CycleSummary {
    pub fetched: u64,
    pub skipped: u64,
    pub inserted: u64,
    pub updated: u64,
    pub unchanged: u64,
    pub failed_batches: u32,
}

/// Errors that abort a whole cycle.
///
/// Batch-level failures are retried and then absorbed into the summary; only
/// the fetch boundary and the run bookkeeping itself can fail a cycle.
#[derive(Debug, Error)]
pub enum CycleError {
    #[error("snapshot fetch failed: {0}")]
    Fetch(#[from] FetchError),

    #[error("sync run bookkeeping failed: {0}")]
    Database(#[from] sqlx::Error),
}

/// Vehicle columns the sync path is allowed to update.
///
/// An enumerated struct rather than a dynamic field map: adding an updatable
/// column means adding a field here and a clause in [`Reconciler::apply_update`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VehicleChanges {
    pub model_id: Option<i64>,
    pub year: Option<i32>,
    pub category: Option<String>,
}

impl VehicleChanges {
    /// Diff a stored row against an incoming record.
    ///
    /// `model_id` is the already-resolved model for the incoming record, so a
    /// make or model rename shows up as a model_id change; case-only name
    /// variants resolve to the same row and produce no change.
    pub fn diff(
        existing: &StoredVehicle,
        model_id: i64,
        incoming: &NormalizedVehicle,
    ) -> Option<Self> {
        let changes = Self {
            model_id: (existing.model_id != model_id).then_some(model_id),
            year: (existing.year != incoming.year).then_some(incoming.year),
            category: (existing.category != incoming.category)
                .then(|| incoming.category.clone()),
        };

        if changes == Self::default() {
            None
        } else {
            Some(changes)
        }
    }
}

/// Stored vehicle fields relevant to the diff
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct StoredVehicle {
    pub id: i64,
    pub model_id: i64,
    pub year: i32,
    pub category: String,
}

#[derive(Debug, Clone, Copy, Default)]
struct BatchCounts {
    inserted: u64,
    updated: u64,
    unchanged: u64,
}

/// The sync orchestrator
pub struct Reconciler {
    db: PgPool,
    client: CatalogClient,
    batch_size: usize,
    years: YearRange,
    retry: RetryPolicy,
}

impl Reconciler {
    /// Create a new reconciler
    pub fn new(db: PgPool, client: CatalogClient, config: &SyncConfig) -> Self {
        Self {
            db,
            client,
            batch_size: config.batch_size,
            years: config.years,
            retry: RetryPolicy::from(config),
        }
    }

    /// Run one reconciliation cycle.
    ///
    /// Cancellation is cooperative: the shutdown signal is honored at batch
    /// boundaries, never mid-transaction.
    #[tracing::instrument(skip_all)]
    pub async fn run_cycle(
        &self,
        shutdown: &watch::Receiver<bool>,
    ) -> Result<CycleSummary, CycleError> {
        let run_id = self.start_run().await?;
        info!(run_id, "reconciliation cycle started");

        let raw = match self.client.fetch_snapshot(&self.years).await {
            Ok(raw) => raw,
            Err(fetch_error) => {
                // nothing has been written to the catalog yet
                if let Err(db_error) = self.fail_run(run_id, &fetch_error.to_string()).await {
                    error!(run_id, error = %db_error, "failed to record failed run");
                }
                error!(run_id, error = %fetch_error, "cycle aborted at fetch boundary");
                return Err(fetch_error.into());
            }
        };

        let now = chrono::Utc::now();
        let mut summary = CycleSummary {
            fetched: raw.len() as u64,
            ..Default::default()
        };

        let mut normalized = Vec::with_capacity(raw.len());
        for record in &raw {
            match normalize(record, now, &self.years) {
                Some(vehicle) => normalized.push(vehicle),
                None => summary.skipped += 1,
            }
        }

        let normalized = dedupe(normalized);
        let total_batches = normalized.len().div_ceil(self.batch_size.max(1));

        let mut cancelled = false;
        for (batch_no, batch) in normalized.chunks(self.batch_size).enumerate() {
            if *shutdown.borrow() {
                warn!(
                    run_id,
                    completed = batch_no,
                    total = total_batches,
                    "shutdown requested, stopping at batch boundary"
                );
                cancelled = true;
                break;
            }

            match self.commit_batch_with_retry(run_id, batch_no, batch).await {
                Some(counts) => {
                    summary.inserted += counts.inserted;
                    summary.updated += counts.updated;
                    summary.unchanged += counts.unchanged;
                }
                None => summary.failed_batches += 1,
            }
        }

        self.finish_run(run_id, &summary, cancelled).await?;

        info!(
            run_id,
            fetched = summary.fetched,
            skipped = summary.skipped,
            inserted = summary.inserted,
            updated = summary.updated,
            unchanged = summary.unchanged,
            failed_batches = summary.failed_batches,
            "reconciliation cycle finished"
        );

        Ok(summary)
    }

    /// Commit one batch, retrying under the configured policy.
    ///
    /// Returns `None` when the retry budget is exhausted; the batch's tallies
    /// are discarded with its rollback and the cycle moves on.
    async fn commit_batch_with_retry(
        &self,
        run_id: i64,
        batch_no: usize,
        batch: &[NormalizedVehicle],
    ) -> Option<BatchCounts> {
        let mut attempt = 0u32;
        loop {
            match self.commit_batch(batch).await {
                Ok(counts) => {
                    debug!(run_id, batch = batch_no, records = batch.len(), "batch committed");
                    return Some(counts);
                }
                Err(commit_error) => {
                    let delay = self.retry.delay_for(attempt);
                    attempt += 1;

                    if attempt >= self.retry.max_attempts {
                        error!(
                            run_id,
                            batch = batch_no,
                            attempts = attempt,
                            error = %commit_error,
                            "batch failed, retry budget exhausted"
                        );
                        return None;
                    }

                    warn!(
                        run_id,
                        batch = batch_no,
                        attempt,
                        error = %commit_error,
                        "batch commit failed, retrying in {:?}",
                        delay
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }

    /// Apply one batch inside a single transaction.
    ///
    /// The make/model caches live per attempt: ids minted inside a
    /// transaction that later rolls back must never leak into a retry.
    async fn commit_batch(&self, batch: &[NormalizedVehicle]) -> Result<BatchCounts, sqlx::Error> {
        let mut tx = self.db.begin().await?;
        let mut counts = BatchCounts::default();
        let mut make_ids: HashMap<String, i64> = HashMap::new();
        let mut model_ids: HashMap<(i64, String), i64> = HashMap::new();

        for record in batch {
            let make_id = match make_ids.get(&record.make_key()) {
                Some(id) => *id,
                None => {
                    let id = resolver::resolve_make(&mut tx, &record.make).await?;
                    make_ids.insert(record.make_key(), id);
                    id
                }
            };

            let model_key = (make_id, record.model_key());
            let model_id = match model_ids.get(&model_key) {
                Some(id) => *id,
                None => {
                    let id = resolver::resolve_model(&mut tx, &record.model, make_id).await?;
                    model_ids.insert(model_key, id);
                    id
                }
            };

            let existing = sqlx::query_as::<_, StoredVehicle>(
                "SELECT id, model_id, year, category FROM vehicles WHERE external_id = $1",
            )
            .bind(&record.external_id)
            .fetch_optional(&mut *tx)
            .await?;

            match existing {
                None => {
                    self.insert_vehicle(&mut tx, record, model_id).await?;
                    counts.inserted += 1;
                }
                Some(stored) => match VehicleChanges::diff(&stored, model_id, record) {
                    Some(changes) => {
                        self.apply_update(&mut tx, stored.id, &changes).await?;
                        counts.updated += 1;
                    }
                    None => counts.unchanged += 1,
                },
            }
        }

        tx.commit().await?;
        Ok(counts)
    }

    async fn insert_vehicle(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        record: &NormalizedVehicle,
        model_id: i64,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO vehicles (external_id, model_id, year, category, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, now())
            "#,
        )
        .bind(&record.external_id)
        .bind(model_id)
        .bind(record.year)
        .bind(&record.category)
        .bind(record.source_created_at)
        .execute(&mut **tx)
        .await?;
        Ok(())
    }

    async fn apply_update(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        vehicle_id: i64,
        changes: &VehicleChanges,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            UPDATE vehicles
            SET model_id = COALESCE($2, model_id),
                year = COALESCE($3, year),
                category = COALESCE($4, category),
                updated_at = now()
            WHERE id = $1
            "#,
        )
        .bind(vehicle_id)
        .bind(changes.model_id)
        .bind(changes.year)
        .bind(changes.category.as_deref())
        .execute(&mut **tx)
        .await?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Run bookkeeping (sync_runs)
    // ------------------------------------------------------------------

    async fn start_run(&self) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>(
            "INSERT INTO sync_runs (status) VALUES ('running') RETURNING id",
        )
        .fetch_one(&self.db)
        .await
    }

    async fn finish_run(
        &self,
        run_id: i64,
        summary: &CycleSummary,
        cancelled: bool,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            UPDATE sync_runs
            SET status = $2,
                completed_at = now(),
                fetched = $3,
                skipped = $4,
                inserted = $5,
                updated = $6,
                unchanged = $7,
                failed_batches = $8
            WHERE id = $1
            "#,
        )
        .bind(run_id)
        .bind(if cancelled { "cancelled" } else { "completed" })
        .bind(summary.fetched as i64)
        .bind(summary.skipped as i64)
        .bind(summary.inserted as i64)
        .bind(summary.updated as i64)
        .bind(summary.unchanged as i64)
        .bind(summary.failed_batches as i32)
        .execute(&self.db)
        .await?;
        Ok(())
    }

    async fn fail_run(&self, run_id: i64, error: &str) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE sync_runs SET status = 'failed', completed_at = now(), error = $2 WHERE id = $1",
        )
        .bind(run_id)
        .bind(error)
        .execute(&self.db)
        .await?;
        Ok(())
    }
}

/// Collapse duplicate external ids within one snapshot.
///
/// Last write wins: a later record for the same external id replaces the
/// earlier one in place, keeping first-seen order so batching stays
/// deterministic.
fn dedupe(records: Vec<NormalizedVehicle>) -> Vec<NormalizedVehicle> {
    let mut position: HashMap<String, usize> = HashMap::with_capacity(records.len());
    let mut deduped: Vec<NormalizedVehicle> = Vec::with_capacity(records.len());

    for record in records {
        match position.get(&record.external_id) {
            Some(&index) => deduped[index] = record,
            None => {
                position.insert(record.external_id.clone(), deduped.len());
                deduped.push(record);
            }
        }
    }

    deduped
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn vehicle(external_id: &str, make: &str, model: &str, year: i32, category: &str) -> NormalizedVehicle {
        NormalizedVehicle {
            external_id: external_id.to_string(),
            make: make.to_string(),
            model: model.to_string(),
            year,
            category: category.to_string(),
            source_created_at: Utc::now(),
            source_updated_at: Utc::now(),
        }
    }

    fn stored(id: i64, model_id: i64, year: i32, category: &str) -> StoredVehicle {
        StoredVehicle {
            id,
            model_id,
            year,
            category: category.to_string(),
        }
    }

    #[test]
    fn test_diff_unchanged_record_yields_no_changes() {
        let incoming = vehicle("abc", "Toyota", "Corolla", 2015, "Sedan");
        let existing = stored(1, 7, 2015, "Sedan");

        assert_eq!(VehicleChanges::diff(&existing, 7, &incoming), None);
    }

    #[test]
    fn test_diff_detects_category_change() {
        let incoming = vehicle("abc", "Toyota", "Corolla", 2015, "SUV");
        let existing = stored(1, 7, 2015, "Sedan");

        let changes = VehicleChanges::diff(&existing, 7, &incoming).unwrap();
        assert_eq!(changes.category.as_deref(), Some("SUV"));
        assert_eq!(changes.model_id, None);
        assert_eq!(changes.year, None);
    }

    #[test]
    fn test_diff_detects_model_and_year_change() {
        let incoming = vehicle("abc", "Toyota", "Camry", 2016, "Sedan");
        let existing = stored(1, 7, 2015, "Sedan");

        let changes = VehicleChanges::diff(&existing, 9, &incoming).unwrap();
        assert_eq!(changes.model_id, Some(9));
        assert_eq!(changes.year, Some(2016));
        assert_eq!(changes.category, None);
    }

    #[test]
    fn test_dedupe_last_write_wins_keeps_first_seen_order() {
        let records = vec![
            vehicle("a", "Toyota", "Corolla", 2015, "Sedan"),
            vehicle("b", "Honda", "Civic", 2016, "Sedan"),
            vehicle("a", "Toyota", "Corolla", 2015, "Hatchback"),
        ];

        let deduped = dedupe(records);
        assert_eq!(deduped.len(), 2);
        // position preserved, payload replaced by the later record
        assert_eq!(deduped[0].external_id, "a");
        assert_eq!(deduped[0].category, "Hatchback");
        assert_eq!(deduped[1].external_id, "b");
    }

    #[test]
    fn test_dedupe_without_duplicates_is_identity() {
        let records = vec![
            vehicle("a", "Toyota", "Corolla", 2015, "Sedan"),
            vehicle("b", "Honda", "Civic", 2016, "Sedan"),
        ];

        let deduped = dedupe(records.clone());
        assert_eq!(deduped, records);
    }
}
