use axum::{Json, Router, http::Uri, routing::get};
use serde::Serialize;
use utoipa::{OpenApi, ToSchema};

use crate::domain::error::ApiError;
use crate::presentation::http::openapi::ApiDoc;

pub fn routes() -> Router {
    Router::new()
        .route("/healthz", get(health_handler))
        .route("/api-docs/openapi.json", get(openapi_handler))
        .fallback(fallback_handler)
}

#[derive(Debug, Serialize, ToSchema)]
pub struct HealthzResponse {
    status: &'static str,
}

#[utoipa::path(
    get,
    path = "/healthz",
    tag = "service",
    responses(
        (status = 200, description = "Service is up", body = HealthzResponse)
    )
)]
pub async fn health_handler() -> Json<HealthzResponse> {
    Json(HealthzResponse { status: "ok" })
}

pub async fn openapi_handler() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

pub async fn fallback_handler(uri: Uri) -> ApiError {
    ApiError::not_found(uri.path())
}
