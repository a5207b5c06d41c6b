//! Digit recognizer CLI
//!
//! Commands:
//! - `digit-recognizer serve` - HTTP server (default)
//! - `digit-recognizer train` - Fit the network on MNIST and save weights
//! - `digit-recognizer predict` - Classify one image file

pub mod output;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use crate::api::types::PredictionResponse;
use crate::config::AppConfig;
use crate::ml::{load_model, DeviceChoice, InferenceBackend, InferenceEngine};
use crate::preprocess::ImageInput;
use crate::services::recognize;
use output::{print_prediction, OutputMode};

/// Handwritten digit recognizer
#[derive(Parser, Debug)]
#[command(name = "digit-recognizer")]
#[command(author, version, about = "Handwritten digit recognition service")]
pub struct Cli {
    /// Extra config file, layered over config/default.toml
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Run the HTTP server
    Serve {
        /// Bind address
        #[arg(long)]
        host: Option<String>,
        #[arg(short, long)]
        port: Option<u16>,
        /// Weights file
        #[arg(short, long)]
        weights: Option<PathBuf>,
        #[arg(long, value_enum)]
        device: Option<DeviceChoice>,
    },

    /// Train the network on MNIST and write the weights file
    Train {
        #[arg(long)]
        epochs: Option<usize>,
        #[arg(long)]
        batch_size: Option<usize>,
        /// Adam learning rate
        #[arg(long)]
        lr: Option<f64>,
        #[arg(long)]
        seed: Option<u64>,
        /// Dataloader worker threads
        #[arg(long)]
        workers: Option<usize>,
        /// Where to write the trained weights
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Classify a single image file
    Predict {
        /// Image file (PNG, JPEG, BMP, ...)
        image: PathBuf,
        #[arg(short, long)]
        weights: Option<PathBuf>,
        /// Print the HTTP response JSON instead of a table
        #[arg(long)]
        json: bool,
    },
}

impl Commands {
    /// Apply command-line overrides on top of the loaded configuration
    pub fn apply_overrides(&self, config: &mut AppConfig) {
        match self {
            Commands::Serve {
                host,
                port,
                weights,
                device,
            } => {
                if let Some(host) = host {
                    config.server.host = host.clone();
                }
                if let Some(port) = port {
                    config.server.port = *port;
                }
                if let Some(weights) = weights {
                    config.model.weights_path = weights.clone();
                }
                if let Some(device) = device {
                    config.model.device = *device;
                }
            }
            Commands::Train {
                epochs,
                batch_size,
                lr,
                seed,
                workers,
                output,
            } => {
                let training = &mut config.training;
                if let Some(v) = epochs {
                    training.epochs = *v;
                }
                if let Some(v) = batch_size {
                    training.batch_size = *v;
                }
                if let Some(v) = lr {
                    training.learning_rate = *v;
                }
                if let Some(v) = seed {
                    training.seed = *v;
                }
                if let Some(v) = workers {
                    training.num_workers = *v;
                }
                if let Some(path) = output {
                    config.model.weights_path = path.clone();
                }
            }
            Commands::Predict { weights, .. } => {
                if let Some(weights) = weights {
                    config.model.weights_path = weights.clone();
                }
            }
        }
    }
}

/// Run the full pipeline once on an image file and print the result
pub fn predict_file(config: &AppConfig, image: &Path, json: bool) -> Result<()> {
    let bytes = std::fs::read(image)
        .with_context(|| format!("failed to read image {}", image.display()))?;

    let device = config.model.device.device();
    let model = load_model::<InferenceBackend>(&config.model.weights_path, &device)?;
    let engine = InferenceEngine::new(model, device);

    let prediction = recognize(&engine, &ImageInput::RawBytesPayload(bytes))?;
    match OutputMode::from_json_flag(json) {
        OutputMode::Json => {
            let body = PredictionResponse::from(&prediction);
            println!("{}", serde_json::to_string_pretty(&body)?);
        }
        OutputMode::Table => print_prediction(&prediction),
    }
    Ok(())
}
