use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::{ErrorKind, RecognizerError};
use crate::ml::Prediction;

/// Metrics collector for observability
#[derive(Debug, Default)]
pub struct Metrics {
    /// Successful predictions
    pub predictions_total: AtomicU64,
    /// Requests rejected because no model could be loaded
    pub model_unavailable_total: AtomicU64,
    /// Requests whose image could not be decoded
    pub image_decode_failures: AtomicU64,
    /// Requests with neither base64 data nor a file
    pub input_absent_total: AtomicU64,
    /// Requests whose multipart or JSON body could not be read
    pub malformed_body_total: AtomicU64,
    /// Any other failure during preprocessing or inference
    pub unexpected_failures: AtomicU64,
    /// Weights load attempts
    pub model_load_attempts: AtomicU64,
    /// Weights load failures
    pub model_load_failures: AtomicU64,
}

impl Metrics {
    /// Create a new metrics instance
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the outcome of one prediction request
    pub fn record_outcome(&self, outcome: &Result<Prediction, RecognizerError>) {
        match outcome {
            Ok(_) => {
                self.predictions_total.fetch_add(1, Ordering::Relaxed);
            }
            Err(e) => self.record_failure(e.kind()),
        }
    }

    /// Increment the counter for a failure class
    pub fn record_failure(&self, kind: ErrorKind) {
        let counter = match kind {
            ErrorKind::ModelUnavailable => &self.model_unavailable_total,
            ErrorKind::ImageDecode => &self.image_decode_failures,
            ErrorKind::InputAbsent => &self.input_absent_total,
            ErrorKind::MalformedBody => &self.malformed_body_total,
            ErrorKind::Unexpected => &self.unexpected_failures,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_model_load_attempts(&self) {
        self.model_load_attempts.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_model_load_failures(&self) {
        self.model_load_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Failures of a given class so far
    pub fn failures(&self, kind: ErrorKind) -> u64 {
        match kind {
            ErrorKind::ModelUnavailable => self.model_unavailable_total.load(Ordering::Relaxed),
            ErrorKind::ImageDecode => self.image_decode_failures.load(Ordering::Relaxed),
            ErrorKind::InputAbsent => self.input_absent_total.load(Ordering::Relaxed),
            ErrorKind::MalformedBody => self.malformed_body_total.load(Ordering::Relaxed),
            ErrorKind::Unexpected => self.unexpected_failures.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_outcome_counts_by_class() {
        let metrics = Metrics::new();
        metrics.record_outcome(&Err(RecognizerError::InputAbsent));
        metrics.record_outcome(&Err(RecognizerError::ModelUnavailable("x".into())));
        metrics.record_outcome(&Err(RecognizerError::Internal("x".into())));
        metrics.record_outcome(&Err(RecognizerError::MalformedBody("x".into())));

        assert_eq!(metrics.failures(ErrorKind::InputAbsent), 1);
        assert_eq!(metrics.failures(ErrorKind::ModelUnavailable), 1);
        assert_eq!(metrics.failures(ErrorKind::Unexpected), 1);
        assert_eq!(metrics.failures(ErrorKind::MalformedBody), 1);
        assert_eq!(metrics.failures(ErrorKind::ImageDecode), 0);
        assert_eq!(metrics.predictions_total.load(Ordering::Relaxed), 0);
    }
}
