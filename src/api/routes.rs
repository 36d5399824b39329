use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use tokio::sync::Mutex;
use tracing::{error, info, warn};

use crate::api::health::{HealthSnapshot, HealthState};
use crate::config::Config;
use crate::types::TriggerResponse;
use crate::workflow::{run_once, RunDates};

#[derive(Clone)]
pub struct ApiState {
    pub cfg: Arc<Config>,
    pub health: Arc<HealthState>,
    /// Serializes runs; a second trigger waits for the first to finish.
    pub run_lock: Arc<Mutex<()>>,
}

impl ApiState {
    pub fn new(cfg: Config) -> Self {
        Self {
            cfg: Arc::new(cfg),
            health: Arc::new(HealthState::new()),
            run_lock: Arc::new(Mutex::new(())),
        }
    }
}

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/run", post(trigger_run))
        .route("/health", get(get_health))
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Request types
// ---------------------------------------------------------------------------

/// Optional date overrides for backfills. An empty body runs for local today.
#[derive(Debug, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RunRequest {
    pub today: Option<NaiveDate>,
    pub yesterday: Option<NaiveDate>,
}

impl RunRequest {
    /// A blank body means no overrides; anything else must parse.
    pub fn from_body(body: &[u8]) -> serde_json::Result<Self> {
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(Self::default());
        }
        serde_json::from_slice(body)
    }
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

async fn trigger_run(
    State(state): State<ApiState>,
    body: Bytes,
) -> (StatusCode, Json<TriggerResponse>) {
    let req = match RunRequest::from_body(&body) {
        Ok(req) => req,
        Err(e) => {
            warn!("Rejected run request: {e}");
            let response = TriggerResponse {
                status_code: 400,
                message: format!("Invalid run request: {e}"),
            };
            return (StatusCode::BAD_REQUEST, Json(response));
        }
    };
    let dates = RunDates::resolve(req.today, req.yesterday);

    let _guard = state.run_lock.lock().await;
    state.health.run_started();
    info!(today = %dates.today, yesterday = %dates.yesterday, "Run triggered over HTTP");

    let response = match run_once(&state.cfg, dates).await {
        Ok(report) => TriggerResponse::from_report(&report),
        Err(e) => {
            error!("Run aborted: {e}");
            TriggerResponse::failure()
        }
    };
    state
        .health
        .run_finished(response.status_code, Utc::now().timestamp());

    let status = StatusCode::from_u16(response.status_code).unwrap_or(StatusCode::BAD_REQUEST);
    (status, Json(response))
}

async fn get_health(State(state): State<ApiState>) -> Json<HealthSnapshot> {
    Json(state.health.snapshot())
}
