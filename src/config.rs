use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::ml::DeviceChoice;

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub model: ModelConfig,
    #[serde(default)]
    pub training: TrainingConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Bind address
    #[serde(default = "default_host")]
    pub host: String,
    /// HTTP port (default: 8000)
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ModelConfig {
    /// Weights file produced by `train` (".mpk" is appended when no extension is given)
    #[serde(default = "default_weights_path")]
    pub weights_path: PathBuf,
    /// Compute device: "cpu" or "gpu"
    #[serde(default)]
    pub device: DeviceChoice,
}

fn default_weights_path() -> PathBuf {
    PathBuf::from("models/mnist_cnn.mpk")
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            weights_path: default_weights_path(),
            device: DeviceChoice::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TrainingConfig {
    /// Passes over the training set
    #[serde(default = "default_epochs")]
    pub epochs: usize,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    /// Adam learning rate
    #[serde(default = "default_learning_rate")]
    pub learning_rate: f64,
    #[serde(default = "default_seed")]
    pub seed: u64,
    /// Dataloader worker threads
    #[serde(default = "default_num_workers")]
    pub num_workers: usize,
    /// Directory for per-epoch checkpoints
    #[serde(default = "default_checkpoint_dir")]
    pub checkpoint_dir: PathBuf,
    /// Checkpoints kept on disk (oldest are removed first)
    #[serde(default = "default_max_checkpoints")]
    pub max_checkpoints: usize,
}

fn default_epochs() -> usize {
    10
}

fn default_batch_size() -> usize {
    64
}

fn default_learning_rate() -> f64 {
    1e-3
}

fn default_seed() -> u64 {
    42
}

fn default_num_workers() -> usize {
    2
}

fn default_checkpoint_dir() -> PathBuf {
    PathBuf::from("models/checkpoints")
}

fn default_max_checkpoints() -> usize {
    3
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            epochs: default_epochs(),
            batch_size: default_batch_size(),
            learning_rate: default_learning_rate(),
            seed: default_seed(),
            num_workers: default_num_workers(),
            checkpoint_dir: default_checkpoint_dir(),
            max_checkpoints: default_max_checkpoints(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Enable JSON formatted logs
    #[serde(default)]
    pub json: bool,
    /// Directory for a daily rotating log file (console only when unset)
    #[serde(default)]
    pub dir: Option<PathBuf>,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
            dir: None,
        }
    }
}

impl AppConfig {
    /// Load configuration from files and environment
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from("config", None)
    }

    /// Load configuration from a specific directory, optionally layering an explicit file
    pub fn load_from<P: AsRef<Path>>(
        config_dir: P,
        extra_file: Option<&Path>,
    ) -> Result<Self, ConfigError> {
        let config_dir = config_dir.as_ref();

        let mut builder = Config::builder()
            // Start with default values
            .set_default("server.host", default_host())?
            .set_default("server.port", default_port() as i64)?
            .set_default("logging.level", "info")?
            .set_default("logging.json", false)?
            // Load default config file
            .add_source(File::from(config_dir.join("default.toml")).required(false))
            // Load environment-specific config (e.g., config/production.toml)
            .add_source(
                File::from(config_dir.join(
                    std::env::var("DIGITS_ENV").unwrap_or_else(|_| "development".to_string()),
                ))
                .required(false),
            );

        if let Some(path) = extra_file {
            builder = builder.add_source(File::from(path).required(true));
        }

        // Override with environment variables (DIGITS_MODEL__WEIGHTS_PATH, etc.)
        builder = builder.add_source(
            Environment::with_prefix("DIGITS")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        builder.build()?.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    // Tests that read the process environment must not interleave.
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    #[test]
    fn defaults_match_training_script() {
        let config = AppConfig::default();
        assert_eq!(config.training.epochs, 10);
        assert_eq!(config.training.batch_size, 64);
        assert!((config.training.learning_rate - 0.001).abs() < f64::EPSILON);
        assert_eq!(config.server.port, 8000);
        assert_eq!(config.model.device, DeviceChoice::Cpu);
    }

    #[test]
    fn loads_explicit_file_over_defaults() {
        let _env = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custom.toml");
        std::fs::write(
            &path,
            r#"
[server]
port = 9100

[model]
weights_path = "weights/custom.mpk"
device = "gpu"

[training]
epochs = 2
"#,
        )
        .unwrap();

        let config = AppConfig::load_from(dir.path(), Some(&path)).unwrap();
        assert_eq!(config.server.port, 9100);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.model.weights_path, PathBuf::from("weights/custom.mpk"));
        assert_eq!(config.model.device, DeviceChoice::Gpu);
        assert_eq!(config.training.epochs, 2);
        assert_eq!(config.training.batch_size, 64);
    }

    #[test]
    fn environment_overrides_files() {
        let _env = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("default.toml"),
            "[model]\nweights_path = \"models/from_file.mpk\"\n",
        )
        .unwrap();

        std::env::set_var("DIGITS_MODEL__WEIGHTS_PATH", "/srv/weights/env.mpk");
        std::env::set_var("DIGITS_SERVER__PORT", "9300");
        let loaded = AppConfig::load_from(dir.path(), None);
        std::env::remove_var("DIGITS_MODEL__WEIGHTS_PATH");
        std::env::remove_var("DIGITS_SERVER__PORT");

        let config = loaded.unwrap();
        assert_eq!(config.model.weights_path, PathBuf::from("/srv/weights/env.mpk"));
        assert_eq!(config.server.port, 9300);
    }
}
