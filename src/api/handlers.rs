use axum::{
    extract::{Path, Query, State},
    Json,
};
use utoipa::OpenApi;

use super::{
    dto::{AppState, ErrorResponse, HealthResponse, RefreshParams},
    errors::AppError,
};
use crate::db::models::Reading;

/// Current reading for one thermostat, served from the short-lived cache.
#[utoipa::path(
    get,
    path = "/thermostats/{device_id}",
    params(
        ("device_id" = String, Path, description = "Nest thermostat device ID"),
        RefreshParams,
    ),
    responses(
        (status = 200, description = "Current thermostat reading", body = Reading),
        (status = 502, description = "Vendor rejected the request or returned garbage", body = ErrorResponse),
        (status = 504, description = "Vendor unreachable", body = ErrorResponse),
    ),
    tag = "thermostats"
)]
pub async fn get_thermostat(
    State(state): State<AppState>,
    Path(device_id): Path<String>,
    Query(params): Query<RefreshParams>,
) -> Result<Json<Reading>, AppError> {
    let reading = if params.refresh {
        state.cache.refresh(&device_id).await?
    } else {
        state.cache.get_or_fetch(&device_id).await?
    };
    Ok(Json(reading))
}

/// The vendor's thermostat collection, passed through unmodified.
#[utoipa::path(
    get,
    path = "/thermostats",
    responses(
        (status = 200, description = "Vendor thermostat collection", body = Object),
        (status = 502, description = "Vendor rejected the request or returned garbage", body = ErrorResponse),
        (status = 504, description = "Vendor unreachable", body = ErrorResponse),
    ),
    tag = "thermostats"
)]
pub async fn list_thermostats(
    State(state): State<AppState>,
) -> Result<Json<serde_json::Value>, AppError> {
    Ok(Json(state.fetcher.list_thermostats().await?))
}

/// Liveness probe.
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse),
    ),
    tag = "system"
)]
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_owned(),
    })
}

// ---------------------------------------------------------------------------
// OpenAPI spec
// ---------------------------------------------------------------------------

#[derive(OpenApi)]
#[openapi(
    paths(get_thermostat, list_thermostats, health),
    components(schemas(Reading, ErrorResponse, HealthResponse)),
    tags(
        (name = "thermostats", description = "Live thermostat readings"),
        (name = "system",  description = "System endpoints"),
    ),
    info(
        title = "Thermostat Comfort Monitor API",
        version = "0.1.0",
        description = "Query endpoints for the thermostat comfort monitor"
    )
)]
pub struct ApiDoc;

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
