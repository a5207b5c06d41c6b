//! Model weights loading and saving.
//!
//! Weights are stored with burn's named MessagePack recorder. With the
//! `pytorch` feature, `.pt`/`.pth` state dicts are read directly.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};

use burn::prelude::*;
use burn::record::{FullPrecisionSettings, NamedMpkFileRecorder};
use tracing::{debug, info};

use super::network::{DigitNet, DigitNetConfig};
use crate::error::{RecognizerError, Result};

/// Extension used by the named MessagePack recorder
pub const WEIGHTS_EXTENSION: &str = "mpk";

/// Resolve the on-disk weights path.
///
/// PyTorch files keep their name; anything else gets the `.mpk` extension
/// the recorder reads and writes.
pub fn resolve_weights_path<P: AsRef<Path>>(path: P) -> PathBuf {
    let path = path.as_ref();
    if is_pytorch_file(path) {
        path.to_path_buf()
    } else {
        path.with_extension(WEIGHTS_EXTENSION)
    }
}

fn is_pytorch_file(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("pt") | Some("pth")
    )
}

/// Load a ready-to-serve network from a weights file.
///
/// The returned network has gradient tracking disabled and its topology
/// verified. A missing file or incompatible payload yields
/// [`RecognizerError::ModelUnavailable`].
pub fn load_model<B: Backend>(path: &Path, device: &B::Device) -> Result<DigitNet<B>> {
    let path = resolve_weights_path(path);
    if !path.exists() {
        return Err(RecognizerError::ModelUnavailable(format!(
            "weights file not found: {}",
            path.display()
        )));
    }

    debug!("Loading weights from {}", path.display());

    // The tensor library panics on some malformed records (e.g. rank mismatch),
    // which must surface as an unavailable model rather than a crash.
    let loaded = panic::catch_unwind(AssertUnwindSafe(|| read_weights::<B>(&path, device)))
        .map_err(|payload| {
            RecognizerError::ModelUnavailable(format!(
                "incompatible weights in {}: {}",
                path.display(),
                panic_message(payload.as_ref())
            ))
        })??;

    loaded.validate_topology().map_err(|e| {
        RecognizerError::ModelUnavailable(format!(
            "incompatible weights in {}: {e}",
            path.display()
        ))
    })?;

    info!("Loaded model weights from {}", path.display());
    Ok(loaded.no_grad())
}

fn read_weights<B: Backend>(path: &Path, device: &B::Device) -> Result<DigitNet<B>> {
    let model = DigitNetConfig::new().init::<B>(device);

    if is_pytorch_file(path) {
        return read_pytorch_weights(model, path, device);
    }

    let recorder = NamedMpkFileRecorder::<FullPrecisionSettings>::new();
    model
        .load_file(path.to_path_buf(), &recorder, device)
        .map_err(|e| {
            RecognizerError::ModelUnavailable(format!(
                "failed to read weights from {}: {e}",
                path.display()
            ))
        })
}

#[cfg(feature = "pytorch")]
fn read_pytorch_weights<B: Backend>(
    model: DigitNet<B>,
    path: &Path,
    device: &B::Device,
) -> Result<DigitNet<B>> {
    use burn::record::Recorder;
    use burn_import::pytorch::{LoadArgs, PyTorchFileRecorder};

    let record = PyTorchFileRecorder::<FullPrecisionSettings>::default()
        .load(LoadArgs::new(path.to_path_buf()), device)
        .map_err(|e| {
            RecognizerError::ModelUnavailable(format!(
                "failed to read PyTorch weights from {}: {e}",
                path.display()
            ))
        })?;
    Ok(model.load_record(record))
}

#[cfg(not(feature = "pytorch"))]
fn read_pytorch_weights<B: Backend>(
    _model: DigitNet<B>,
    path: &Path,
    _device: &B::Device,
) -> Result<DigitNet<B>> {
    Err(RecognizerError::ModelUnavailable(format!(
        "{} is a PyTorch file; rebuild with the `pytorch` feature to read it",
        path.display()
    )))
}

/// Persist network parameters, creating parent directories as needed.
///
/// Returns the path actually written.
pub fn save_model<B: Backend>(model: &DigitNet<B>, path: &Path) -> Result<PathBuf> {
    let path = path.with_extension(WEIGHTS_EXTENSION);
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let recorder = NamedMpkFileRecorder::<FullPrecisionSettings>::new();
    model
        .clone()
        .save_file(path.clone(), &recorder)
        .map_err(|e| RecognizerError::Internal(format!("failed to save weights: {e}")))?;

    info!("Saved model weights to {}", path.display());
    Ok(path)
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "record decoding panicked".to_string()
    }
}
