//! Make API routes
//!
//! - `GET /api/v1/makes` - cursor-paginated makes with model counts

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use sqlx::PgPool;

use crate::api::response::{ApiResponse, ErrorResponse};

use super::queries::{ListMakesError, ListMakesQuery};

/// Creates the makes router
pub fn makes_routes() -> Router<PgPool> {
    Router::new().route("/", get(list_makes))
}

/// List makes with cursor pagination
///
/// `GET /api/v1/makes?cursor=<id>&limit=20`
#[tracing::instrument(skip(pool, query), fields(cursor = ?query.cursor, limit = ?query.limit))]
async fn list_makes(
    State(pool): State<PgPool>,
    Query(query): Query<ListMakesQuery>,
) -> Result<Response, ListMakesError> {
    let page = super::queries::list::handle(pool, query).await?;

    Ok((StatusCode::OK, Json(ApiResponse::success(page))).into_response())
}

impl IntoResponse for ListMakesError {
    fn into_response(self) -> Response {
        match self {
            ListMakesError::InvalidParams(_) => {
                let error = ErrorResponse::new("VALIDATION_ERROR", self.to_string());
                (StatusCode::BAD_REQUEST, Json(error)).into_response()
            }
            ListMakesError::Database(_) => {
                tracing::error!("Database error during make listing: {}", self);
                let error = ErrorResponse::new("INTERNAL_ERROR", "A database error occurred");
                (StatusCode::INTERNAL_SERVER_ERROR, Json(error)).into_response()
            }
        }
    }
}
