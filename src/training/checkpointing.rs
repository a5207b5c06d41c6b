//! Per-epoch checkpoints of the digit network.

use std::fs;
use std::path::{Path, PathBuf};

use burn::prelude::*;
use tracing::{info, warn};

use crate::error::Result;
use crate::ml::loader::WEIGHTS_EXTENSION;
use crate::ml::{load_model, save_model, DigitNet};

/// Checkpointer for saving and loading models
pub struct Checkpointer {
    /// Directory for checkpoints
    checkpoint_dir: PathBuf,
    /// Maximum checkpoints to keep
    max_checkpoints: usize,
}

impl Checkpointer {
    /// Create a new checkpointer
    pub fn new<P: AsRef<Path>>(checkpoint_dir: P, max_checkpoints: usize) -> Self {
        let checkpoint_dir = checkpoint_dir.as_ref().to_path_buf();

        if !checkpoint_dir.exists() {
            if let Err(e) = fs::create_dir_all(&checkpoint_dir) {
                warn!("Failed to create checkpoint directory: {}", e);
            }
        }

        Self {
            checkpoint_dir,
            max_checkpoints,
        }
    }

    /// Get checkpoint path for a given name
    pub fn checkpoint_path(&self, name: &str) -> PathBuf {
        self.checkpoint_dir
            .join(format!("{}.{}", name, WEIGHTS_EXTENSION))
    }

    /// Save a model, then drop the oldest checkpoints beyond the limit
    pub fn save<B: Backend>(&self, model: &DigitNet<B>, name: &str) -> Result<PathBuf> {
        let path = save_model(model, &self.checkpoint_path(name))?;
        info!("Saved checkpoint to {:?}", path);

        self.cleanup_old_checkpoints();

        Ok(path)
    }

    /// Load a checkpoint for inference
    pub fn load<B: Backend>(&self, name: &str, device: &B::Device) -> Result<DigitNet<B>> {
        load_model(&self.checkpoint_path(name), device)
    }

    /// List available checkpoints, oldest first
    pub fn list_checkpoints(&self) -> Vec<String> {
        let suffix = format!(".{}", WEIGHTS_EXTENSION);
        let mut checkpoints = Vec::new();

        if let Ok(entries) = fs::read_dir(&self.checkpoint_dir) {
            for entry in entries.flatten() {
                if let Some(name) = entry.file_name().to_str() {
                    if let Some(stem) = name.strip_suffix(&suffix) {
                        checkpoints.push(stem.to_string());
                    }
                }
            }
        }

        checkpoints.sort();
        checkpoints
    }

    /// Get latest checkpoint name
    pub fn latest_checkpoint(&self) -> Option<String> {
        self.list_checkpoints().into_iter().last()
    }

    fn cleanup_old_checkpoints(&self) {
        let checkpoints = self.list_checkpoints();

        if checkpoints.len() <= self.max_checkpoints {
            return;
        }

        let to_remove = checkpoints.len() - self.max_checkpoints;
        for name in checkpoints.into_iter().take(to_remove) {
            let path = self.checkpoint_path(&name);
            if let Err(e) = fs::remove_file(&path) {
                warn!("Failed to remove old checkpoint {:?}: {}", path, e);
            } else {
                info!("Removed old checkpoint: {}", name);
            }
        }
    }
}

/// Generate a checkpoint name with epoch number
pub fn epoch_name(prefix: &str, epoch: usize) -> String {
    format!("{}_ep{:04}", prefix, epoch)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::DigitNetConfig;
    use burn_ndarray::NdArray;

    type TestBackend = NdArray<f32>;

    #[test]
    fn test_checkpoint_path() {
        let dir = tempfile::tempdir().unwrap();
        let checkpointer = Checkpointer::new(dir.path(), 5);
        let path = checkpointer.checkpoint_path("digitnet_ep0001");

        assert!(path.to_string_lossy().ends_with("digitnet_ep0001.mpk"));
    }

    #[test]
    fn test_epoch_name() {
        assert_eq!(epoch_name("digitnet", 7), "digitnet_ep0007");
    }

    #[test]
    fn test_keeps_newest_checkpoints() {
        let dir = tempfile::tempdir().unwrap();
        let checkpointer = Checkpointer::new(dir.path().join("ckpt"), 2);
        let device = Default::default();
        let model = DigitNetConfig::new().init::<TestBackend>(&device);

        for epoch in 1..=4 {
            checkpointer.save(&model, &epoch_name("digitnet", epoch)).unwrap();
        }

        assert_eq!(
            checkpointer.list_checkpoints(),
            vec!["digitnet_ep0003".to_string(), "digitnet_ep0004".to_string()]
        );
        let latest = checkpointer.latest_checkpoint().unwrap();
        assert!(checkpointer.load::<TestBackend>(&latest, &device).is_ok());
    }
}
