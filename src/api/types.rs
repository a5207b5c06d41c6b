use serde::{Deserialize, Serialize};

use crate::error::RecognizerError;
use crate::ml::Prediction;

// ============================================================================
// Prediction Types
// ============================================================================

/// Response body for every predict endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub digit: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub probabilities: Option<Vec<f64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PredictionResponse {
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            digit: None,
            confidence: None,
            probabilities: None,
            error: Some(message.into()),
        }
    }
}

impl From<&Prediction> for PredictionResponse {
    fn from(prediction: &Prediction) -> Self {
        Self {
            success: true,
            digit: Some(prediction.digit),
            confidence: Some(round4(prediction.confidence)),
            probabilities: Some(prediction.probabilities.iter().copied().map(round4).collect()),
            error: None,
        }
    }
}

impl From<&RecognizerError> for PredictionResponse {
    fn from(err: &RecognizerError) -> Self {
        match err.kind() {
            crate::error::ErrorKind::Unexpected => Self::failure(format!("internal error: {err}")),
            _ => Self::failure(err.to_string()),
        }
    }
}

/// Round to 4 decimal places for display.
///
/// Goes through the shortest decimal form of the f32 so that a stored
/// `0.9f32` renders as `0.9` rather than `0.8999999761581421`.
pub fn round4(value: f32) -> f64 {
    let exact: f64 = value.to_string().parse().unwrap_or(value as f64);
    (exact * 10_000.0).round() / 10_000.0
}

/// JSON body for `POST /api/predict`
#[derive(Debug, Clone, Deserialize)]
pub struct PredictRequest {
    pub image_data: Option<String>,
}
