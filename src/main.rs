use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use digit_recognizer::api::start_api_server;
use digit_recognizer::cli::{self, Cli, Commands};
use digit_recognizer::config::AppConfig;
use digit_recognizer::ml::TrainingBackend;
use digit_recognizer::services::{Metrics, RecognizerService};
use digit_recognizer::training;
use tokio::signal;
use tracing::{error, info};

mod main_runtime;

use main_runtime::{init_logging, init_logging_simple};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = AppConfig::load_from("config", cli.config.as_deref())
        .context("failed to load configuration")?;
    let command = cli.command.clone().unwrap_or(Commands::Serve {
        host: None,
        port: None,
        weights: None,
        device: None,
    });
    command.apply_overrides(&mut config);

    match command {
        Commands::Serve { .. } => {
            let _guard = init_logging(&config.logging);
            run_serve(&config).await?;
        }
        Commands::Train { .. } => {
            let _guard = init_logging(&config.logging);
            run_train(config).await?;
        }
        Commands::Predict { image, json, .. } => {
            init_logging_simple();
            cli::predict_file(&config, &image, json)?;
        }
    }

    Ok(())
}

async fn run_serve(config: &AppConfig) -> Result<()> {
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .with_context(|| {
            format!(
                "invalid bind address {}:{}",
                config.server.host, config.server.port
            )
        })?;

    info!(
        weights = %config.model.weights_path.display(),
        device = %config.model.device,
        "Starting digit recognizer"
    );

    let recognizer = Arc::new(RecognizerService::new(
        &config.model.weights_path,
        config.model.device.device(),
        Arc::new(Metrics::new()),
    ));

    start_api_server(recognizer, addr, shutdown_signal()).await?;
    info!("Shutdown complete");
    Ok(())
}

async fn run_train(config: AppConfig) -> Result<()> {
    let summary = tokio::task::spawn_blocking(move || {
        training::train::<TrainingBackend>(
            &config.training,
            &config.model.weights_path,
            config.model.device.device(),
        )
    })
    .await
    .context("training task failed")??;

    info!(
        epochs = summary.epochs,
        accuracy = summary.final_test_accuracy,
        loss = summary.final_test_loss,
        "Training complete, weights saved to {}",
        summary.weights_path.display()
    );
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => error!("Failed to install SIGTERM handler: {}", e),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
