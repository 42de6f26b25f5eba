//! Entity resolution
//!
//! Get-or-create for make and model rows, scoped to the caller's batch
//! transaction. Concurrency safety comes from the unique indexes on
//! `LOWER(name)` / `(make_id, LOWER(name))` plus the conflict fallback: if a
//! concurrent writer inserts the same key first, our `ON CONFLICT DO NOTHING`
//! insert returns no row and we re-read the now-existing one. Exactly one row
//! exists per key no matter how many callers race.

use sqlx::{Postgres, Transaction};
use tracing::debug;

/// Resolve a make row by display name, creating it on first sighting.
///
/// Lookup is case-insensitive; the stored row keeps the display casing of
/// whichever sync observed the name first.
pub async fn resolve_make(
    tx: &mut Transaction<'_, Postgres>,
    name: &str,
) -> Result<i64, sqlx::Error> {
    if let Some(id) =
        sqlx::query_scalar::<_, i64>("SELECT id FROM makes WHERE LOWER(name) = LOWER($1)")
            .bind(name)
            .fetch_optional(&mut **tx)
            .await?
    {
        return Ok(id);
    }

    let inserted = sqlx::query_scalar::<_, i64>(
        "INSERT INTO makes (name) VALUES ($1) ON CONFLICT DO NOTHING RETURNING id",
    )
    .bind(name)
    .fetch_optional(&mut **tx)
    .await?;

    match inserted {
        Some(id) => {
            debug!(make = name, id, "created make");
            Ok(id)
        }
        // lost the creation race; the winner's row is committed and visible now
        None => {
            sqlx::query_scalar::<_, i64>("SELECT id FROM makes WHERE LOWER(name) = LOWER($1)")
                .bind(name)
                .fetch_one(&mut **tx)
                .await
        }
    }
}

/// Resolve a model row by display name within a make, creating it on first
/// sighting. Same conflict strategy as [`resolve_make`].
pub async fn resolve_model(
    tx: &mut Transaction<'_, Postgres>,
    name: &str,
    make_id: i64,
) -> Result<i64, sqlx::Error> {
    if let Some(id) = sqlx::query_scalar::<_, i64>(
        "SELECT id FROM car_models WHERE make_id = $2 AND LOWER(name) = LOWER($1)",
    )
    .bind(name)
    .bind(make_id)
    .fetch_optional(&mut **tx)
    .await?
    {
        return Ok(id);
    }

    let inserted = sqlx::query_scalar::<_, i64>(
        "INSERT INTO car_models (name, make_id) VALUES ($1, $2) ON CONFLICT DO NOTHING RETURNING id",
    )
    .bind(name)
    .bind(make_id)
    .fetch_optional(&mut **tx)
    .await?;

    match inserted {
        Some(id) => {
            debug!(model = name, make_id, id, "created model");
            Ok(id)
        }
        None => {
            sqlx::query_scalar::<_, i64>(
                "SELECT id FROM car_models WHERE make_id = $2 AND LOWER(name) = LOWER($1)",
            )
            .bind(name)
            .bind(make_id)
            .fetch_one(&mut **tx)
            .await
        }
    }
}
