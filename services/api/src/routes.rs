use crate::infra::AppState;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{delete, get};
use axum::{Extension, Json, Router};
use ecotide::error::AppError;
use ecotide::stats::StatsView;
use ecotide::store::UserProgress;
use ecotide::{compute_stats, HistoryEvent, Settings, SettingsPatch};
use serde::Serialize;
use serde_json::json;
use std::sync::atomic::Ordering;

#[derive(Debug, Serialize)]
pub(crate) struct HistoryResponse {
    pub(crate) total: usize,
    /// Oldest first, as stored.
    pub(crate) events: Vec<HistoryEvent>,
}

pub(crate) fn dashboard_router() -> Router {
    Router::new()
        .route("/health", get(healthcheck))
        .route("/ready", get(readiness_endpoint))
        .route("/metrics", get(metrics_endpoint))
        .route("/api/stats", get(stats_endpoint))
        .route(
            "/api/history",
            get(history_endpoint).delete(clear_history_endpoint),
        )
        .route("/api/history/export", get(export_history_endpoint))
        .route("/api/progress", get(progress_endpoint))
        .route("/api/cache", delete(clear_cache_endpoint))
        .route(
            "/api/settings",
            get(settings_endpoint).patch(update_settings_endpoint),
        )
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

pub(crate) async fn stats_endpoint(Extension(state): Extension<AppState>) -> Json<StatsView> {
    let history = state.store.history().all();
    Json(compute_stats(&history).view())
}

pub(crate) async fn history_endpoint(Extension(state): Extension<AppState>) -> Json<HistoryResponse> {
    let events = state.store.history().all();
    Json(HistoryResponse {
        total: events.len(),
        events,
    })
}

pub(crate) async fn clear_history_endpoint(Extension(state): Extension<AppState>) -> StatusCode {
    state.store.history().clear();
    state.store.progress().clear();
    StatusCode::NO_CONTENT
}

pub(crate) async fn export_history_endpoint(
    Extension(state): Extension<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let mut buffer = Vec::new();
    state.store.history().export_csv(&mut buffer)?;

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"ecotide-history.csv\"",
            ),
        ],
        buffer,
    ))
}

pub(crate) async fn progress_endpoint(Extension(state): Extension<AppState>) -> Json<UserProgress> {
    Json(state.store.progress().get())
}

pub(crate) async fn clear_cache_endpoint(Extension(state): Extension<AppState>) -> StatusCode {
    state.store.cache().clear();
    StatusCode::NO_CONTENT
}

pub(crate) async fn settings_endpoint(Extension(state): Extension<AppState>) -> Json<Settings> {
    Json(state.store.settings().get())
}

pub(crate) async fn update_settings_endpoint(
    Extension(state): Extension<AppState>,
    Json(patch): Json<SettingsPatch>,
) -> Json<Settings> {
    Json(state.store.settings().update(patch))
}
