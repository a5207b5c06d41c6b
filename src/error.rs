use thiserror::Error;

/// Main error type for the digit recognizer
#[derive(Error, Debug)]
pub enum RecognizerError {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    // Model errors
    #[error("Model not loaded: {0}")]
    ModelUnavailable(String),

    #[error("Inference failed: {0}")]
    Inference(String),

    // Input errors
    #[error("Image decode error: {0}")]
    ImageDecode(#[from] image::ImageError),

    #[error("Base64 decode error: {0}")]
    Base64Decode(#[from] base64::DecodeError),

    #[error("No image data: expected `image_data` or `image_file`")]
    InputAbsent,

    #[error("Malformed request body: {0}")]
    MalformedBody(String),

    // Serialization errors
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // Generic errors
    #[error("Internal error: {0}")]
    Internal(String),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

/// Result type alias for RecognizerError
pub type Result<T> = std::result::Result<T, RecognizerError>;

/// Coarse error classes surfaced at the request boundary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    ModelUnavailable,
    ImageDecode,
    InputAbsent,
    MalformedBody,
    Unexpected,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ModelUnavailable => "model_unavailable",
            Self::ImageDecode => "image_decode",
            Self::InputAbsent => "input_absent",
            Self::MalformedBody => "malformed_body",
            Self::Unexpected => "unexpected",
        }
    }
}

impl RecognizerError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::ModelUnavailable(_) => ErrorKind::ModelUnavailable,
            Self::ImageDecode(_) | Self::Base64Decode(_) => ErrorKind::ImageDecode,
            Self::InputAbsent => ErrorKind::InputAbsent,
            Self::MalformedBody(_) => ErrorKind::MalformedBody,
            _ => ErrorKind::Unexpected,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_decode_errors_together() {
        let b64 = RecognizerError::from(base64::DecodeError::InvalidLength);
        assert_eq!(b64.kind(), ErrorKind::ImageDecode);
        assert_eq!(RecognizerError::InputAbsent.kind(), ErrorKind::InputAbsent);
        assert_eq!(
            RecognizerError::ModelUnavailable("missing".into()).kind(),
            ErrorKind::ModelUnavailable
        );
        assert_eq!(
            RecognizerError::Internal("boom".into()).kind(),
            ErrorKind::Unexpected
        );
    }
}
