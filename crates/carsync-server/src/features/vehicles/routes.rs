//! Vehicle API routes
//!
//! - `GET /api/v1/vehicles` - cursor-paginated vehicle listing
//! - `GET /api/v1/vehicles/:id` - single vehicle with make and model resolved

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use sqlx::PgPool;

use crate::api::response::{ApiResponse, ErrorResponse};

use super::queries::{GetVehicleError, GetVehicleQuery, ListVehiclesError, ListVehiclesQuery};

/// Creates the vehicles router with all routes configured
pub fn vehicles_routes() -> Router<PgPool> {
    Router::new()
        .route("/", get(list_vehicles))
        .route("/:id", get(get_vehicle))
}

/// List vehicles with cursor pagination
///
/// `GET /api/v1/vehicles?cursor=<id>&limit=20&year=2015`
#[tracing::instrument(skip(pool, query), fields(cursor = ?query.cursor, limit = ?query.limit))]
async fn list_vehicles(
    State(pool): State<PgPool>,
    Query(query): Query<ListVehiclesQuery>,
) -> Result<Response, ListVehiclesError> {
    let page = super::queries::list::handle(pool, query).await?;

    tracing::debug!(
        count = page.items.len(),
        total = page.total,
        "vehicles listed via API"
    );

    Ok((StatusCode::OK, Json(ApiResponse::success(page))).into_response())
}

/// Get a single vehicle by id
///
/// `GET /api/v1/vehicles/:id`
#[tracing::instrument(skip(pool))]
async fn get_vehicle(
    State(pool): State<PgPool>,
    Path(id): Path<i64>,
) -> Result<Response, GetVehicleError> {
    let vehicle = super::queries::get::handle(pool, GetVehicleQuery { id }).await?;
    Ok((StatusCode::OK, Json(ApiResponse::success(vehicle))).into_response())
}

impl IntoResponse for ListVehiclesError {
    fn into_response(self) -> Response {
        match self {
            ListVehiclesError::InvalidParams(_) => {
                let error = ErrorResponse::new("VALIDATION_ERROR", self.to_string());
                (StatusCode::BAD_REQUEST, Json(error)).into_response()
            }
            ListVehiclesError::Database(_) => {
                tracing::error!("Database error during vehicle listing: {}", self);
                let error = ErrorResponse::new("INTERNAL_ERROR", "A database error occurred");
                (StatusCode::INTERNAL_SERVER_ERROR, Json(error)).into_response()
            }
        }
    }
}

impl IntoResponse for GetVehicleError {
    fn into_response(self) -> Response {
        match self {
            GetVehicleError::NotFound(_) => {
                let error = ErrorResponse::new("NOT_FOUND", self.to_string());
                (StatusCode::NOT_FOUND, Json(error)).into_response()
            }
            GetVehicleError::Database(_) => {
                tracing::error!("Database error during vehicle retrieval: {}", self);
                let error = ErrorResponse::new("INTERNAL_ERROR", "A database error occurred");
                (StatusCode::INTERNAL_SERVER_ERROR, Json(error)).into_response()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_routes_structure() {
        let router = vehicles_routes();
        assert!(format!("{:?}", router).contains("Router"));
    }

    #[test]
    fn test_not_found_maps_to_404() {
        let response = GetVehicleError::NotFound(42).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_invalid_params_map_to_400() {
        let response = ListVehiclesError::InvalidParams("Limit must be between 1 and 100")
            .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
