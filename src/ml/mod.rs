//! Digit classifier: network definition, weights loading and inference.

pub mod backend;
pub mod inference;
pub mod loader;
pub mod network;

pub use backend::{DeviceChoice, InferenceBackend, InferenceDevice, TrainingBackend};
pub use inference::{probabilities_from_logits, InferenceEngine, Prediction};
pub use loader::{load_model, resolve_weights_path, save_model};
pub use network::{DigitNet, DigitNetConfig, IMAGE_SIZE, NUM_CLASSES};
