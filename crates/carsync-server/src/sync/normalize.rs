//! Record normalization
//!
//! Pure mapping from raw source records to the canonical form the reconciler
//! stores. No I/O happens here; the clock is injected so timestamp fallback
//! stays deterministic under test.

use chrono::{DateTime, Utc};

use super::client::RawVehicle;
use super::config::YearRange;

/// Sentinel stored in place of a missing make, model, or category.
pub const UNKNOWN: &str = "Unknown";

/// A raw record reduced to the canonical tuple the reconciler works with.
///
/// `make` and `model` keep the trimmed display casing delivered by the
/// source; resolution matches on the lowercase keys so case-only variants of
/// the same name land on the same row.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedVehicle {
    pub external_id: String,
    pub make: String,
    pub model: String,
    pub year: i32,
    pub category: String,
    pub source_created_at: DateTime<Utc>,
    pub source_updated_at: DateTime<Utc>,
}

impl NormalizedVehicle {
    /// Case-insensitive key used to resolve the make row
    pub fn make_key(&self) -> String {
        self.make.to_lowercase()
    }

    /// Case-insensitive key used to resolve the model row within a make
    pub fn model_key(&self) -> String {
        self.model.to_lowercase()
    }
}

/// Normalize one raw record, or reject it.
///
/// A record is rejected (and counted as skipped by the caller) when it lacks
/// a natural key or a usable year. Everything else is salvaged: missing
/// names default to [`UNKNOWN`], unparseable source timestamps fall back to
/// the current sync time.
pub fn normalize(
    raw: &RawVehicle,
    now: DateTime<Utc>,
    years: &YearRange,
) -> Option<NormalizedVehicle> {
    let external_id = raw.object_id.as_deref().map(str::trim).filter(|s| !s.is_empty())?;
    let year = year_of(raw).filter(|y| years.contains(*y))?;

    Some(NormalizedVehicle {
        external_id: external_id.to_string(),
        make: display_or_unknown(raw.make.as_deref()),
        model: display_or_unknown(raw.model.as_deref()),
        year,
        category: display_or_unknown(raw.category.as_deref()),
        source_created_at: parse_timestamp(raw.created_at.as_deref(), now),
        source_updated_at: parse_timestamp(raw.updated_at.as_deref(), now),
    })
}

/// Extract the model year from a raw record, if it parses as an integer.
///
/// The source delivers `Year` as either a JSON number or a string.
pub(crate) fn year_of(raw: &RawVehicle) -> Option<i32> {
    match raw.year.as_ref()? {
        serde_json::Value::Number(n) => n.as_i64().and_then(|y| i32::try_from(y).ok()),
        serde_json::Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn display_or_unknown(value: Option<&str>) -> String {
    match value.map(str::trim) {
        Some(trimmed) if !trimmed.is_empty() => trimmed.to_string(),
        _ => UNKNOWN.to_string(),
    }
}

fn parse_timestamp(value: Option<&str>, fallback: DateTime<Utc>) -> DateTime<Utc> {
    value
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or(fallback)
}
