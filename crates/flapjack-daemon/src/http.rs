use crate::error::AppError;
use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use flapjack_maintenance::MaintenanceManager;
use flapjack_models::{Check, Id, Notification, NotificationType};
use flapjack_processor::EventReceiver;
use flapjack_store::{checks, notifications, Store};
use serde::Deserialize;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub store: Store,
    pub receiver: Arc<EventReceiver>,
    pub maintenance: MaintenanceManager,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/checks/:id/ingest", post(ingest))
        .route("/checks/:id/state", get(check_state))
        .route("/checks/:id/acknowledge", post(acknowledge))
        .route("/checks/:id/maintenance", post(schedule_maintenance))
        .route("/maintenance/:window_id/end", post(end_scheduled_maintenance))
        .route("/checks/:id/test-notification", post(test_notification))
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .with_state(state)
}

async fn healthz() -> &'static str {
    "ok"
}

async fn readyz(State(state): State<AppState>) -> Result<&'static str, AppError> {
    sqlx::query("SELECT 1")
        .execute(state.store.pool())
        .await
        .map_err(flapjack_store::StoreError::from)?;
    Ok("ok")
}

#[derive(Debug, Deserialize)]
struct IngestRequest {
    state: String,
    #[serde(default)]
    summary: String,
    #[serde(default)]
    details: Option<String>,
    #[serde(default)]
    tags: std::collections::BTreeSet<String>,
}

async fn ingest(
    State(state): State<AppState>,
    Path(id): Path<Id>,
    Json(req): Json<IngestRequest>,
) -> Result<(), AppError> {
    let check = checks::get(state.store.pool(), id).await?;
    let payload = serde_json::json!({
        "entity": check.name,
        "type": "service",
        "state": req.state,
        "summary": req.summary,
        "details": req.details,
        "tags": req.tags,
        "time": chrono::Utc::now().timestamp(),
    });
    match state.receiver.accept(payload).await {
        Ok(_) => Ok(()),
        Err(flapjack_processor::AcceptError::Malformed(err)) => {
            Err(AppError::BadRequest(err.to_string()))
        }
        Err(flapjack_processor::AcceptError::Store(err)) => Err(AppError::from(err)),
    }
}

async fn check_state(
    State(state): State<AppState>,
    Path(id): Path<Id>,
) -> Result<Json<Check>, AppError> {
    let check = checks::get(state.store.pool(), id).await?;
    Ok(Json(check))
}

#[derive(Debug, Deserialize)]
struct AcknowledgeRequest {
    duration_secs: i64,
    #[serde(default)]
    summary: Option<String>,
}

async fn acknowledge(
    State(state): State<AppState>,
    Path(id): Path<Id>,
    Json(req): Json<AcknowledgeRequest>,
) -> Result<Json<bool>, AppError> {
    let acknowledged = state
        .maintenance
        .acknowledge(id, chrono::Utc::now(), req.duration_secs, req.summary)
        .await?;
    Ok(Json(acknowledged))
}

#[derive(Debug, Deserialize)]
struct ScheduleMaintenanceRequest {
    start_time: chrono::DateTime<chrono::Utc>,
    end_time: chrono::DateTime<chrono::Utc>,
    #[serde(default)]
    summary: Option<String>,
}

async fn schedule_maintenance(
    State(state): State<AppState>,
    Path(id): Path<Id>,
    Json(req): Json<ScheduleMaintenanceRequest>,
) -> Result<(), AppError> {
    if req.end_time <= req.start_time {
        return Err(AppError::BadRequest(
            "end_time must be after start_time".to_string(),
        ));
    }
    state
        .maintenance
        .schedule(id, req.start_time, req.end_time, req.summary)
        .await?;
    Ok(())
}

async fn end_scheduled_maintenance(
    State(state): State<AppState>,
    Path(window_id): Path<Id>,
) -> Result<Json<bool>, AppError> {
    let ended = state
        .maintenance
        .end_scheduled(window_id, chrono::Utc::now())
        .await?;
    Ok(Json(ended))
}

async fn test_notification(
    State(state): State<AppState>,
    Path(id): Path<Id>,
) -> Result<(), AppError> {
    let check = checks::get(state.store.pool(), id).await?;
    let notification = Notification {
        id: Id::generate(),
        check_id: check.id,
        state_id: Id::generate(),
        notification_type: NotificationType::Test,
        condition: check.condition,
        summary: format!("Test notification for {}", check.name),
        created_at: chrono::Utc::now(),
    };
    notifications::insert(state.store.pool(), &notification).await?;
    Ok(())
}
