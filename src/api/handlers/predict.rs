use axum::{
    extract::{multipart::MultipartRejection, rejection::JsonRejection, Multipart, State},
    http::StatusCode,
    Json,
};
use tracing::{debug, warn};

use crate::api::{
    state::AppState,
    types::{PredictRequest, PredictionResponse},
};
use crate::error::{ErrorKind, RecognizerError};
use crate::preprocess::ImageInput;

const IMAGE_DATA_FIELD: &str = "image_data";
const IMAGE_FILE_FIELD: &str = "image_file";

type PredictReply = (StatusCode, Json<PredictionResponse>);

pub fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::InputAbsent | ErrorKind::ImageDecode | ErrorKind::MalformedBody => {
            StatusCode::BAD_REQUEST
        }
        ErrorKind::ModelUnavailable => StatusCode::SERVICE_UNAVAILABLE,
        ErrorKind::Unexpected => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Pick the request's image: base64 text wins over an uploaded file,
/// empty values count as missing.
pub fn resolve_input(
    image_data: Option<String>,
    image_file: Option<Vec<u8>>,
) -> Result<ImageInput, RecognizerError> {
    if let Some(text) = image_data.filter(|t| !t.trim().is_empty()) {
        return Ok(ImageInput::Base64Payload(text));
    }
    if let Some(bytes) = image_file.filter(|b| !b.is_empty()) {
        return Ok(ImageInput::RawBytesPayload(bytes));
    }
    Err(RecognizerError::InputAbsent)
}

async fn run(state: &AppState, input: Result<ImageInput, RecognizerError>) -> PredictReply {
    let outcome = match input {
        Ok(input) => state.recognizer.predict(input).await,
        Err(e) => Err(e),
    };
    state.metrics.record_outcome(&outcome);

    match outcome {
        Ok(prediction) => {
            debug!(
                digit = prediction.digit,
                confidence = prediction.confidence,
                "prediction served"
            );
            (StatusCode::OK, Json(PredictionResponse::from(&prediction)))
        }
        Err(e) => {
            let kind = e.kind();
            warn!(kind = kind.as_str(), "prediction failed: {}", e);
            (status_for(kind), Json(PredictionResponse::from(&e)))
        }
    }
}

async fn bad_request(state: &AppState, message: String) -> PredictReply {
    run(state, Err(RecognizerError::MalformedBody(message))).await
}

/// POST /predict/ -- multipart form with `image_data` or `image_file`
pub async fn predict_form(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> PredictReply {
    let mut multipart = match multipart {
        Ok(m) => m,
        Err(_) => return run(&state, Err(RecognizerError::InputAbsent)).await,
    };

    let mut image_data = None;
    let mut image_file = None;
    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => {
                return bad_request(&state, format!("invalid multipart body: {e}")).await
            }
        };
        let name = field.name().map(str::to_owned);
        match name.as_deref() {
            Some(IMAGE_DATA_FIELD) => match field.text().await {
                Ok(text) => image_data = Some(text),
                Err(e) => {
                    return bad_request(&state, format!("invalid `image_data` field: {e}")).await
                }
            },
            Some(IMAGE_FILE_FIELD) => match field.bytes().await {
                Ok(bytes) => image_file = Some(bytes.to_vec()),
                Err(e) => {
                    return bad_request(&state, format!("invalid `image_file` field: {e}")).await
                }
            },
            _ => {}
        }
    }

    run(&state, resolve_input(image_data, image_file)).await
}

/// POST /api/predict -- JSON `{ "image_data": "..." }`
pub async fn predict_json(
    State(state): State<AppState>,
    body: Result<Json<PredictRequest>, JsonRejection>,
) -> PredictReply {
    match body {
        Ok(Json(req)) => run(&state, resolve_input(req.image_data, None)).await,
        Err(rejection) => bad_request(&state, rejection.body_text()).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_image_data_wins_over_file() {
        let input = resolve_input(Some("abc".into()), Some(vec![1, 2, 3])).unwrap();
        assert_eq!(input, ImageInput::Base64Payload("abc".into()));
    }

    #[test]
    fn test_empty_values_are_absent() {
        let input = resolve_input(Some("  ".into()), Some(vec![7])).unwrap();
        assert_eq!(input, ImageInput::RawBytesPayload(vec![7]));

        let err = resolve_input(Some(String::new()), Some(Vec::new())).unwrap_err();
        assert!(matches!(err, RecognizerError::InputAbsent));
        assert!(matches!(resolve_input(None, None), Err(RecognizerError::InputAbsent)));
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(status_for(ErrorKind::InputAbsent), StatusCode::BAD_REQUEST);
        assert_eq!(status_for(ErrorKind::ImageDecode), StatusCode::BAD_REQUEST);
        assert_eq!(status_for(ErrorKind::MalformedBody), StatusCode::BAD_REQUEST);
        assert_eq!(status_for(ErrorKind::ModelUnavailable), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(status_for(ErrorKind::Unexpected), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
