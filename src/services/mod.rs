pub mod health;
pub mod metrics;
pub mod recognizer;

pub use health::{ComponentHealth, HealthResponse, HealthState, HealthStatus};
pub use metrics::Metrics;
pub use recognizer::{recognize, RecognizerService};
