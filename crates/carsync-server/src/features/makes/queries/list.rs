use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use crate::features::shared::pagination::{CursorPage, CursorParams};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ListMakesQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cursor: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct MakeListItem {
    pub id: i64,
    pub name: String,
    pub model_count: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, thiserror::Error)]
pub enum ListMakesError {
    #[error("{0}")]
    InvalidParams(&'static str),
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl ListMakesQuery {
    pub fn params(&self) -> CursorParams {
        CursorParams::new(self.cursor, self.limit)
    }

    pub fn validate(&self) -> Result<(), ListMakesError> {
        self.params()
            .validate()
            .map_err(ListMakesError::InvalidParams)
    }
}

#[tracing::instrument(skip(pool))]
pub async fn handle(
    pool: PgPool,
    query: ListMakesQuery,
) -> Result<CursorPage<MakeListItem>, ListMakesError> {
    query.validate()?;

    let params = query.params();
    let limit = params.limit();

    let total = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM makes")
        .fetch_one(&pool)
        .await?;

    let items = sqlx::query_as::<_, MakeListItem>(
        r#"
        SELECT mk.id, mk.name, COUNT(md.id) AS model_count, mk.created_at
        FROM makes mk
        LEFT JOIN car_models md ON md.make_id = mk.id
        WHERE ($1::bigint IS NULL OR mk.id > $1::bigint)
        GROUP BY mk.id, mk.name, mk.created_at
        ORDER BY mk.id
        LIMIT $2
        "#,
    )
    .bind(params.cursor)
    .bind(limit)
    .fetch_all(&pool)
    .await?;

    Ok(CursorPage::from_rows(items, total, limit, |m| m.id))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_success() {
        let query = ListMakesQuery {
            cursor: None,
            limit: Some(10),
        };
        assert!(query.validate().is_ok());
    }

    #[test]
    fn test_validation_rejects_bad_limit() {
        let query = ListMakesQuery {
            cursor: None,
            limit: Some(0),
        };
        assert!(matches!(
            query.validate(),
            Err(ListMakesError::InvalidParams(_))
        ));
    }
}
