//! Recognizer service: owns the loaded model for the lifetime of the process.
//!
//! Constructed once at startup and shared by `Arc`. The engine is loaded
//! through a single guarded initialization; a failed load leaves the slot
//! empty so the next request tries again.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use burn::prelude::Backend;
use tokio::sync::OnceCell;
use tracing::{info, warn};

use crate::error::{RecognizerError, Result};
use crate::ml::{
    load_model, resolve_weights_path, InferenceBackend, InferenceDevice, InferenceEngine,
    Prediction,
};
use crate::preprocess::{normalize_image, ImageInput};
use crate::services::Metrics;

/// Decode, normalize and classify one image.
pub fn recognize<B: Backend>(
    engine: &InferenceEngine<B>,
    input: &ImageInput,
) -> Result<Prediction> {
    let image = input.decode()?;
    let tensor = normalize_image::<B>(&image, engine.device());
    engine.predict(tensor)
}

pub struct RecognizerService {
    weights_path: PathBuf,
    device: InferenceDevice,
    engine: OnceCell<Arc<InferenceEngine<InferenceBackend>>>,
    metrics: Arc<Metrics>,
}

impl RecognizerService {
    pub fn new<P: AsRef<Path>>(
        weights_path: P,
        device: InferenceDevice,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            weights_path: resolve_weights_path(weights_path),
            device,
            engine: OnceCell::new(),
            metrics,
        }
    }

    pub fn weights_path(&self) -> &Path {
        &self.weights_path
    }

    pub fn metrics(&self) -> Arc<Metrics> {
        Arc::clone(&self.metrics)
    }

    /// Whether a model is loaded and serving
    pub fn is_loaded(&self) -> bool {
        self.engine.initialized()
    }

    /// Try to load the model at startup; failure is logged and retried per request.
    pub async fn warm_up(&self) -> bool {
        match self.engine().await {
            Ok(_) => true,
            Err(e) => {
                warn!("Model not loaded at startup, will retry on demand: {}", e);
                false
            }
        }
    }

    /// Get the engine, loading it on first successful access
    pub async fn engine(&self) -> Result<Arc<InferenceEngine<InferenceBackend>>> {
        let engine = self
            .engine
            .get_or_try_init(|| self.load_engine())
            .await?;
        Ok(Arc::clone(engine))
    }

    async fn load_engine(&self) -> Result<Arc<InferenceEngine<InferenceBackend>>> {
        self.metrics.inc_model_load_attempts();

        let path = self.weights_path.clone();
        let device = self.device.clone();
        let loaded = tokio::task::spawn_blocking(move || {
            let model = load_model::<InferenceBackend>(&path, &device)?;
            Ok::<_, RecognizerError>(InferenceEngine::new(model, device))
        })
        .await
        .map_err(|e| RecognizerError::ModelUnavailable(format!("model loading task failed: {e}")));

        match loaded.and_then(|r| r) {
            Ok(engine) => {
                info!("Model ready ({})", self.weights_path.display());
                Ok(Arc::new(engine))
            }
            Err(e) => {
                self.metrics.inc_model_load_failures();
                Err(e)
            }
        }
    }

    /// Run the full pipeline for one image
    pub async fn predict(&self, input: ImageInput) -> Result<Prediction> {
        let engine = self.engine().await?;
        tokio::task::spawn_blocking(move || recognize(&engine, &input))
            .await
            .map_err(|e| RecognizerError::Internal(format!("inference task failed: {e}")))?
    }
}
