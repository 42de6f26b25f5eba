//! Sync run API routes
//!
//! - `GET /api/v1/sync/runs` - cursor-paginated cycle history
//! - `GET /api/v1/sync/runs/latest` - most recent cycle summary

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use sqlx::PgPool;

use crate::api::response::{ApiResponse, ErrorResponse};

use super::queries::{LatestSyncRunError, ListSyncRunsError, ListSyncRunsQuery};

/// Creates the sync runs router
pub fn sync_runs_routes() -> Router<PgPool> {
    Router::new()
        .route("/", get(list_sync_runs))
        .route("/latest", get(latest_sync_run))
}

/// List reconciliation cycles with cursor pagination
///
/// `GET /api/v1/sync/runs?cursor=<id>&limit=20&status=completed`
#[tracing::instrument(skip(pool, query), fields(status = ?query.status))]
async fn list_sync_runs(
    State(pool): State<PgPool>,
    Query(query): Query<ListSyncRunsQuery>,
) -> Result<Response, ListSyncRunsError> {
    let page = super::queries::list::handle(pool, query).await?;

    Ok((StatusCode::OK, Json(ApiResponse::success(page))).into_response())
}

/// Get the most recent reconciliation cycle
///
/// `GET /api/v1/sync/runs/latest`
#[tracing::instrument(skip(pool))]
async fn latest_sync_run(State(pool): State<PgPool>) -> Result<Response, LatestSyncRunError> {
    let run = super::queries::latest::handle(pool).await?;
    Ok((StatusCode::OK, Json(ApiResponse::success(run))).into_response())
}

impl IntoResponse for ListSyncRunsError {
    fn into_response(self) -> Response {
        match self {
            ListSyncRunsError::InvalidParams(_) => {
                let error = ErrorResponse::new("VALIDATION_ERROR", self.to_string());
                (StatusCode::BAD_REQUEST, Json(error)).into_response()
            }
            ListSyncRunsError::Database(_) => {
                tracing::error!("Database error during sync run listing: {}", self);
                let error = ErrorResponse::new("INTERNAL_ERROR", "A database error occurred");
                (StatusCode::INTERNAL_SERVER_ERROR, Json(error)).into_response()
            }
        }
    }
}

impl IntoResponse for LatestSyncRunError {
    fn into_response(self) -> Response {
        match self {
            LatestSyncRunError::NotFound => {
                let error = ErrorResponse::new("NOT_FOUND", self.to_string());
                (StatusCode::NOT_FOUND, Json(error)).into_response()
            }
            LatestSyncRunError::Database(_) => {
                tracing::error!("Database error during latest sync run lookup: {}", self);
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
        let router = sync_runs_routes();
        assert!(format!("{:?}", router).contains("Router"));
    }

    #[test]
    fn test_latest_not_found_maps_to_404() {
        let response = LatestSyncRunError::NotFound.into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
