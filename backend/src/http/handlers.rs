//! HTTP handlers for the REST API.
//!
//! Each handler corresponds to an API endpoint and delegates to the
//! orchestrator. Cycles, sample writes and reports touch the history file or
//! scan history, so they run on the blocking pool.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::{Local, NaiveDateTime};
use std::sync::Arc;

use super::dto::{
    AnomalyQuery, AnomalyResponse, CycleReport, CycleRequest, DetectionCycleRequest,
    HealthResponse, PredictionQuery, PredictionResponse, RecordSampleRequest,
    RecordSampleResponse, ReportQuery, TrafficReport, TrendQuery, TrendResponse,
};
use super::error::AppError;
use super::state::AppState;
use crate::error::SchedulerResult;
use crate::models::{Granularity, LoadSample, SectionId, SectionObservation};
use crate::services::Orchestrator;

/// Result type for handlers.
pub type HandlerResult<T> = Result<Json<T>, AppError>;

fn now() -> NaiveDateTime {
    Local::now().naive_local()
}

fn parse_section(raw: &str) -> Result<SectionId, AppError> {
    SectionId::new(raw).map_err(AppError::from)
}

fn parse_granularity(raw: Option<&str>) -> Result<Granularity, AppError> {
    match raw {
        Some(value) => value.parse().map_err(AppError::from),
        None => Ok(Granularity::default()),
    }
}

/// Run orchestrator work on the blocking pool.
async fn blocking<T, F>(state: &AppState, f: F) -> Result<T, AppError>
where
    T: Send + 'static,
    F: FnOnce(&Orchestrator) -> SchedulerResult<T> + Send + 'static,
{
    let orchestrator = Arc::clone(&state.orchestrator);
    tokio::task::spawn_blocking(move || f(&orchestrator))
        .await
        .map_err(|e| AppError::Internal(format!("Task join error: {}", e)))?
        .map_err(AppError::from)
}

// =============================================================================
// Health Check
// =============================================================================

/// GET /health
pub async fn health_check(State(state): State<AppState>) -> HandlerResult<HealthResponse> {
    let repository = match state.orchestrator.health_check() {
        Ok(true) => "connected".to_string(),
        Ok(false) => "disconnected".to_string(),
        Err(e) => format!("error: {}", e),
    };

    Ok(Json(HealthResponse {
        status: "ok".to_string(),
        version: "v1".to_string(),
        repository,
        sections: state.orchestrator.history().sections().len(),
    }))
}

// =============================================================================
// Scheduling Cycles
// =============================================================================

/// POST /v1/cycles
pub async fn run_cycle(
    State(state): State<AppState>,
    Json(request): Json<CycleRequest>,
) -> HandlerResult<CycleReport> {
    let at = request.timestamp.unwrap_or_else(now);
    let report = blocking(&state, move |orch| {
        orch.run_raw_cycle(&request.counts, &request.weather, at, request.observations)
    })
    .await?;
    Ok(Json(report))
}

/// POST /v1/detections/cycles
pub async fn run_detection_cycle(
    State(state): State<AppState>,
    Json(request): Json<DetectionCycleRequest>,
) -> HandlerResult<CycleReport> {
    let at = request.timestamp.unwrap_or_else(now);
    let report = blocking(&state, move |orch| {
        orch.run_detection_cycle(
            &request.regions,
            &request.detections,
            request.rule,
            request.weather,
            at,
        )
    })
    .await?;
    Ok(Json(report))
}

// =============================================================================
// Section History
// =============================================================================

/// POST /v1/sections/{section_id}/samples
pub async fn record_sample(
    State(state): State<AppState>,
    Path(section_id): Path<String>,
    Json(request): Json<RecordSampleRequest>,
) -> Result<(StatusCode, Json<RecordSampleResponse>), AppError> {
    let section = parse_section(&section_id)?;
    let timestamp = request.timestamp.unwrap_or_else(now);
    let sample = LoadSample::new(section.clone(), request.weighted_load, timestamp, request.weather)
        .with_observation(SectionObservation {
            wait_time: request.wait_time,
            throughput: request.throughput,
        });

    let response = blocking(&state, move |orch| {
        orch.record_sample(sample)?;
        Ok(RecordSampleResponse {
            retained: orch.history().len(&section),
            section,
            timestamp,
        })
    })
    .await?;

    Ok((StatusCode::CREATED, Json(response)))
}

/// GET /v1/sections/{section_id}/prediction
pub async fn get_prediction(
    State(state): State<AppState>,
    Path(section_id): Path<String>,
    Query(query): Query<PredictionQuery>,
) -> HandlerResult<PredictionResponse> {
    let section = parse_section(&section_id)?;
    let at = query.at.unwrap_or_else(now);
    let prediction = state.orchestrator.predict(&section, at);
    Ok(Json(PredictionResponse {
        section,
        at,
        prediction,
    }))
}

/// GET /v1/sections/{section_id}/anomaly
pub async fn get_anomaly(
    State(state): State<AppState>,
    Path(section_id): Path<String>,
    Query(query): Query<AnomalyQuery>,
) -> HandlerResult<AnomalyResponse> {
    let section = parse_section(&section_id)?;
    if query.z.is_some_and(|z| z.is_nan() || z <= 0.0) {
        return Err(AppError::BadRequest("z must be positive".to_string()));
    }
    let z_threshold = query
        .z
        .unwrap_or(state.orchestrator.config().prediction.z_threshold);
    let anomalous = state
        .orchestrator
        .detect_anomaly(&section, query.load, Some(z_threshold));
    Ok(Json(AnomalyResponse {
        sample_count: state.orchestrator.history().len(&section),
        section,
        load: query.load,
        z_threshold,
        anomalous,
    }))
}

/// GET /v1/sections/{section_id}/trend
pub async fn get_trend(
    State(state): State<AppState>,
    Path(section_id): Path<String>,
    Query(query): Query<TrendQuery>,
) -> HandlerResult<TrendResponse> {
    let section = parse_section(&section_id)?;
    let granularity = parse_granularity(query.granularity.as_deref())?;
    let trend = state.orchestrator.trend(&section, granularity);
    Ok(Json(TrendResponse {
        section,
        granularity,
        trend,
    }))
}

/// GET /v1/sections/{section_id}/report
pub async fn get_report(
    State(state): State<AppState>,
    Path(section_id): Path<String>,
    Query(query): Query<ReportQuery>,
) -> HandlerResult<TrafficReport> {
    let section = parse_section(&section_id)?;
    let granularity = parse_granularity(query.granularity.as_deref())?;
    let at = query.at.unwrap_or_else(now);
    let report = blocking(&state, move |orch| orch.report(&section, granularity, at)).await?;
    Ok(Json(report))
}
