use sqlx::PgPool;

use super::list::VehicleListItem;

#[derive(Debug, Clone)]
pub struct GetVehicleQuery {
    pub id: i64,
}

#[derive(Debug, thiserror::Error)]
pub enum GetVehicleError {
    #[error("Vehicle {0} not found")]
    NotFound(i64),
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

#[tracing::instrument(skip(pool))]
pub async fn handle(pool: PgPool, query: GetVehicleQuery) -> Result<VehicleListItem, GetVehicleError> {
    sqlx::query_as::<_, VehicleListItem>(
        r#"
        SELECT v.id, v.external_id, mk.name AS make, md.name AS model,
               v.year, v.category, v.created_at, v.updated_at
        FROM vehicles v
        JOIN car_models md ON md.id = v.model_id
        JOIN makes mk ON mk.id = md.make_id
        WHERE v.id = $1
        "#,
    )
    .bind(query.id)
    .fetch_optional(&pool)
    .await?
    .ok_or(GetVehicleError::NotFound(query.id))
}
