use axum::extract::FromRef;
use std::sync::Arc;

use crate::services::{HealthState, Metrics, RecognizerService};

/// Shared application state for API handlers
#[derive(Clone)]
pub struct AppState {
    /// Model owner, shared with the health endpoints
    pub recognizer: Arc<RecognizerService>,

    /// Request counters
    pub metrics: Arc<Metrics>,

    pub health: Arc<HealthState>,
}

impl AppState {
    pub fn new(recognizer: Arc<RecognizerService>) -> Self {
        let health = Arc::new(HealthState::new(Arc::clone(&recognizer)));
        Self {
            metrics: recognizer.metrics(),
            recognizer,
            health,
        }
    }
}

impl FromRef<AppState> for Arc<HealthState> {
    fn from_ref(state: &AppState) -> Self {
        Arc::clone(&state.health)
    }
}
