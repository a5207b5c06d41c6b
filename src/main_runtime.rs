use digit_recognizer::config::LoggingConfig;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

const LOG_FILE_NAME: &str = "digit-recognizer.log";

/// Full logging for the server and training: console plus an optional
/// daily rotating file. The returned guard must be held until exit so
/// buffered file lines are flushed.
pub fn init_logging(config: &LoggingConfig) -> Option<WorkerGuard> {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("{},digit_recognizer={}", config.level, config.level)));

    // `tracing_appender::rolling::daily` panics if it can't create the
    // initial log file, so preflight writability.
    let mut guard = None;
    let file_layer = match &config.dir {
        Some(log_dir) => match std::fs::create_dir_all(log_dir) {
            Ok(()) => {
                let test_path = log_dir.join(".digits_write_test");
                match std::fs::OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(&test_path)
                {
                    Ok(_) => {
                        let _ = std::fs::remove_file(&test_path);

                        // Daily rotating file appender
                        let file_appender = tracing_appender::rolling::daily(log_dir, LOG_FILE_NAME);
                        let (non_blocking, worker_guard) = tracing_appender::non_blocking(file_appender);
                        guard = Some(worker_guard);

                        Some(
                            tracing_subscriber::fmt::layer()
                                .with_writer(non_blocking)
                                .with_ansi(false) // No color codes in file
                                .with_target(true),
                        )
                    }
                    Err(e) => {
                        eprintln!(
                            "Warning: Could not write to log directory {} ({}), file logging disabled",
                            log_dir.display(),
                            e
                        );
                        None
                    }
                }
            }
            Err(e) => {
                eprintln!(
                    "Warning: Could not create log directory {} ({}), file logging disabled",
                    log_dir.display(),
                    e
                );
                None
            }
        },
        None => None,
    };

    // Console layer, JSON or human readable
    let (json_layer, text_layer) = if config.json {
        (Some(tracing_subscriber::fmt::layer().json().with_target(true)), None)
    } else {
        (
            None,
            Some(
                tracing_subscriber::fmt::layer()
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_file(false)
                    .with_line_number(false),
            ),
        )
    };

    let file_logging_enabled = file_layer.is_some();
    tracing_subscriber::registry()
        .with(filter)
        .with(json_layer)
        .with(text_layer)
        .with(file_layer)
        .init();

    if let (true, Some(dir)) = (file_logging_enabled, &config.dir) {
        eprintln!("Logging to: {}/{}", dir.display(), LOG_FILE_NAME);
    }

    guard
}

pub fn init_logging_simple() {
    // Minimal logging for one-shot CLI commands
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::WARN)
        .try_init();
}
