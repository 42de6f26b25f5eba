use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use crate::features::shared::pagination::{CursorPage, CursorParams};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ListVehiclesQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cursor: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub year: Option<i32>,
}

/// One vehicle with its make and model resolved through explicit joins
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct VehicleListItem {
    pub id: i64,
    pub external_id: String,
    pub make: String,
    pub model: String,
    pub year: i32,
    pub category: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, thiserror::Error)]
pub enum ListVehiclesError {
    #[error("{0}")]
    InvalidParams(&'static str),
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl ListVehiclesQuery {
    pub fn params(&self) -> CursorParams {
        CursorParams::new(self.cursor, self.limit)
    }

    pub fn validate(&self) -> Result<(), ListVehiclesError> {
        self.params()
            .validate()
            .map_err(ListVehiclesError::InvalidParams)
    }
}

#[tracing::instrument(skip(pool))]
pub async fn handle(
    pool: PgPool,
    query: ListVehiclesQuery,
) -> Result<CursorPage<VehicleListItem>, ListVehiclesError> {
    query.validate()?;

    let params = query.params();
    let limit = params.limit();

    let total = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM vehicles WHERE ($1::int IS NULL OR year = $1::int)",
    )
    .bind(query.year)
    .fetch_one(&pool)
    .await?;

    let items = sqlx::query_as::<_, VehicleListItem>(
        r#"
        SELECT v.id, v.external_id, mk.name AS make, md.name AS model,
               v.year, v.category, v.created_at, v.updated_at
        FROM vehicles v
        JOIN car_models md ON md.id = v.model_id
        JOIN makes mk ON mk.id = md.make_id
        WHERE ($1::bigint IS NULL OR v.id > $1::bigint)
          AND ($2::int IS NULL OR v.year = $2::int)
        ORDER BY v.id
        LIMIT $3
        "#,
    )
    .bind(params.cursor)
    .bind(query.year)
    .bind(limit)
    .fetch_all(&pool)
    .await?;

    Ok(CursorPage::from_rows(items, total, limit, |v| v.id))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_success() {
        let query = ListVehiclesQuery {
            cursor: Some(100),
            limit: Some(25),
            year: Some(2015),
        };
        assert!(query.validate().is_ok());
    }

    #[test]
    fn test_validation_rejects_negative_cursor() {
        let query = ListVehiclesQuery {
            cursor: Some(-5),
            ..Default::default()
        };
        assert!(matches!(
            query.validate(),
            Err(ListVehiclesError::InvalidParams(_))
        ));
    }

    #[test]
    fn test_validation_rejects_oversized_limit() {
        let query = ListVehiclesQuery {
            limit: Some(1000),
            ..Default::default()
        };
        assert!(matches!(
            query.validate(),
            Err(ListVehiclesError::InvalidParams(_))
        ));
    }
}
