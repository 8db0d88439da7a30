pub mod dto;
pub mod errors;
pub mod handlers;

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use utoipa::OpenApi;
use utoipa_axum::router::OpenApiRouter;

use crate::{ingest::IngestService, query::LatestQueryService};
use handlers::ApiDoc;

/// Shared handler state. Cloned per request; everything inside is an `Arc`.
#[derive(Clone)]
pub struct AppState {
    pub ingest: IngestService,
    pub query: LatestQueryService,
    pub environment: Arc<str>,
}

pub fn router(state: AppState) -> Router {
    let (router, api) = OpenApiRouter::with_openapi(ApiDoc::openapi())
        .route("/api/telemetry/ingest", post(handlers::ingest_telemetry))
        .route("/api/telemetry/latest", get(handlers::get_latest_telemetry))
        .route("/api/health", get(handlers::health))
        .with_state(state)
        .split_for_parts();

    router.route(
        "/api-docs/openapi.json",
        get(move || async move { axum::Json(api) }),
    )
}
