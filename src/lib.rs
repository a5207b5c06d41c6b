pub mod api;
pub mod cli;
pub mod config;
pub mod error;
pub mod ml;
pub mod preprocess;
pub mod services;
pub mod training;

pub use config::AppConfig;
pub use error::{ErrorKind, RecognizerError, Result};
pub use ml::{DigitNet, DigitNetConfig, InferenceEngine, Prediction};
pub use preprocess::ImageInput;
pub use services::{Metrics, RecognizerService};
pub use training::TrainingSummary;
