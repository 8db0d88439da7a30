use axum::{
    extract::{Query, State},
    Json,
};
use chrono::Utc;
use serde::Deserialize;
use utoipa::OpenApi;

use super::{
    dto::{
        ErrorBody, HealthDto, IngestRequest, IngestResponse, IngestStatsDto, LatestDto,
        ReadingDto,
    },
    errors::AppError,
    AppState,
};
use crate::query::Latest;

// ---------------------------------------------------------------------------
// Query parameters
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LatestParams {
    pub device_id: Option<String>,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// Normalize, persist and publish one reading.
#[utoipa::path(
    post,
    path = "/api/telemetry/ingest",
    request_body = IngestRequest,
    responses(
        (status = 200, description = "Reading stored", body = IngestResponse),
        (status = 400, description = "Reading rejected", body = ErrorBody),
        (status = 500, description = "Internal server error", body = ErrorBody),
    ),
    tag = "telemetry"
)]
pub async fn ingest_telemetry(
    State(state): State<AppState>,
    Json(body): Json<IngestRequest>,
) -> Result<Json<IngestResponse>, AppError> {
    let outcome = state.ingest.ingest(body.into()).await?;

    Ok(Json(IngestResponse {
        id: outcome.id,
        message: "Telemetry data ingested successfully".to_owned(),
    }))
}

/// Latest reading for `deviceId`, or the latest reading of every device when
/// `deviceId` is omitted (a JSON array, one entry per device).
#[utoipa::path(
    get,
    path = "/api/telemetry/latest",
    params(
        ("deviceId" = Option<String>, Query, description = "Device to look up"),
    ),
    responses(
        (status = 200, description = "A reading, or an array of readings without deviceId", body = LatestDto),
        (status = 404, description = "No reading for this device", body = ErrorBody),
        (status = 500, description = "Internal server error", body = ErrorBody),
    ),
    tag = "telemetry"
)]
pub async fn get_latest_telemetry(
    State(state): State<AppState>,
    Query(params): Query<LatestParams>,
) -> Result<Json<LatestDto>, AppError> {
    let device_id = params.device_id.as_deref();
    let latest = state.query.get_latest(device_id).await?;

    match latest {
        Latest::One(reading) => Ok(Json(LatestDto::One(reading.into()))),
        Latest::All(readings) => Ok(Json(LatestDto::All(
            readings.into_iter().map(ReadingDto::from).collect(),
        ))),
        Latest::NotFound => Err(AppError::NotFound(format!(
            "No telemetry data found for device {}",
            device_id.unwrap_or_default()
        ))),
    }
}

// ---------------------------------------------------------------------------
// Health check
// ---------------------------------------------------------------------------

#[utoipa::path(
    get,
    path = "/api/health",
    responses(
        (status = 200, description = "Service is healthy", body = HealthDto),
    ),
    tag = "system"
)]
pub async fn health(State(state): State<AppState>) -> Json<HealthDto> {
    Json(HealthDto {
        status: "Healthy".to_owned(),
        version: env!("CARGO_PKG_VERSION").to_owned(),
        timestamp: Utc::now(),
        environment: state.environment.to_string(),
        ingest: IngestStatsDto::from(state.ingest.stats().as_ref()),
    })
}

// ---------------------------------------------------------------------------
// OpenAPI spec
// ---------------------------------------------------------------------------

#[derive(OpenApi)]
#[openapi(
    paths(ingest_telemetry, get_latest_telemetry, health),
    components(schemas(
        IngestRequest,
        IngestResponse,
        ReadingDto,
        LatestDto,
        ErrorBody,
        HealthDto,
        IngestStatsDto
    )),
    tags(
        (name = "telemetry", description = "Telemetry ingestion and latest-reading endpoints"),
        (name = "system",    description = "System endpoints"),
    ),
    info(
        title = "Telemetry API",
        version = "0.1.0",
        description = "Ingests device telemetry and serves the latest reading per device"
    )
)]
pub struct ApiDoc;

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
