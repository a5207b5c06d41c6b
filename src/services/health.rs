//! Health and metrics endpoints for process supervision
//!
//! Provides liveness and readiness probes (systemd/k8s) and a Prometheus
//! metrics endpoint.

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::Ordering;
use std::sync::Arc;

use crate::services::{Metrics, RecognizerService};

/// Health status for a component
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
}

/// Component health check result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentHealth {
    pub name: String,
    pub status: HealthStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Overall system health response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: HealthStatus,
    pub timestamp: DateTime<Utc>,
    pub uptime_seconds: u64,
    pub model_loaded: bool,
    pub weights_path: String,
    pub predictions_total: u64,
    pub components: Vec<ComponentHealth>,
}

/// Shared state for health endpoints
pub struct HealthState {
    /// When the server started
    pub started_at: DateTime<Utc>,
    pub recognizer: Arc<RecognizerService>,
    pub metrics: Arc<Metrics>,
}

impl HealthState {
    pub fn new(recognizer: Arc<RecognizerService>) -> Self {
        let metrics = recognizer.metrics();
        Self {
            started_at: Utc::now(),
            recognizer,
            metrics,
        }
    }

    pub fn uptime_seconds(&self) -> u64 {
        (Utc::now() - self.started_at).num_seconds().max(0) as u64
    }

    /// Get overall health status.
    ///
    /// A missing model is degraded, not unhealthy: the process keeps serving
    /// and retries the load on the next request.
    pub fn get_health(&self) -> HealthResponse {
        let model_loaded = self.recognizer.is_loaded();
        let model_status = if model_loaded {
            HealthStatus::Healthy
        } else {
            HealthStatus::Degraded
        };

        let components = vec![ComponentHealth {
            name: "model".to_string(),
            status: model_status,
            message: if model_loaded {
                None
            } else {
                Some("Model not loaded".to_string())
            },
        }];

        HealthResponse {
            status: model_status,
            timestamp: Utc::now(),
            uptime_seconds: self.uptime_seconds(),
            model_loaded,
            weights_path: self.recognizer.weights_path().display().to_string(),
            predictions_total: self.metrics.predictions_total.load(Ordering::Relaxed),
            components,
        }
    }
}

/// Full health check endpoint (200 even when degraded)
pub async fn health_handler(State(state): State<Arc<HealthState>>) -> impl IntoResponse {
    (StatusCode::OK, Json(state.get_health()))
}

/// Liveness probe - is the process alive?
pub async fn liveness_handler() -> impl IntoResponse {
    StatusCode::OK
}

/// Readiness probe - can we serve predictions right now?
pub async fn readiness_handler(State(state): State<Arc<HealthState>>) -> impl IntoResponse {
    if state.recognizer.is_loaded() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}

/// Prometheus metrics endpoint
pub async fn metrics_handler(State(state): State<Arc<HealthState>>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(
            axum::http::header::CONTENT_TYPE,
            "text/plain; charset=utf-8",
        )],
        render_metrics(&state),
    )
}

fn render_metrics(state: &HealthState) -> String {
    let m = &state.metrics;
    let model_loaded = if state.recognizer.is_loaded() { 1 } else { 0 };

    format!(
        r#"# HELP digits_up Process is serving (always 1)
# TYPE digits_up gauge
digits_up 1

# HELP digits_uptime_seconds Uptime in seconds
# TYPE digits_uptime_seconds counter
digits_uptime_seconds {}

# HELP digits_model_loaded Model weights loaded
# TYPE digits_model_loaded gauge
digits_model_loaded {}

# HELP digits_predictions_total Successful predictions
# TYPE digits_predictions_total counter
digits_predictions_total {}

# HELP digits_prediction_failures_total Failed prediction requests by class
# TYPE digits_prediction_failures_total counter
digits_prediction_failures_total{{kind="model_unavailable"}} {}
digits_prediction_failures_total{{kind="image_decode"}} {}
digits_prediction_failures_total{{kind="input_absent"}} {}
digits_prediction_failures_total{{kind="malformed_body"}} {}
digits_prediction_failures_total{{kind="unexpected"}} {}

# HELP digits_model_load_attempts_total Weights load attempts
# TYPE digits_model_load_attempts_total counter
digits_model_load_attempts_total {}

# HELP digits_model_load_failures_total Weights load failures
# TYPE digits_model_load_failures_total counter
digits_model_load_failures_total {}
"#,
        state.uptime_seconds(),
        model_loaded,
        m.predictions_total.load(Ordering::Relaxed),
        m.model_unavailable_total.load(Ordering::Relaxed),
        m.image_decode_failures.load(Ordering::Relaxed),
        m.input_absent_total.load(Ordering::Relaxed),
        m.malformed_body_total.load(Ordering::Relaxed),
        m.unexpected_failures.load(Ordering::Relaxed),
        m.model_load_attempts.load(Ordering::Relaxed),
        m.model_load_failures.load(Ordering::Relaxed),
    )
}
