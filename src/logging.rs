use std::fs;
use tracing_subscriber::{filter::LevelFilter, fmt, prelude::*, EnvFilter};

/// Initializes the logging system with console and file output. All events
/// go to a daily-rolled JSON file; ERROR events additionally land in a
/// dedicated error log so the scheduler host can tail failures alone.
pub fn init_logging() {
    // Ensure logs directory exists
    let _ = fs::create_dir_all("logs");

    let file_appender = tracing_appender::rolling::daily("logs", "pipeline.log");
    let (file_writer, file_guard) = tracing_appender::non_blocking(file_appender);
    let file_layer = fmt::layer().json().with_writer(file_writer);

    let error_appender = tracing_appender::rolling::daily("logs", "error.log");
    let (error_writer, error_guard) = tracing_appender::non_blocking(error_appender);
    let error_layer = fmt::layer()
        .json()
        .with_writer(error_writer)
        .with_filter(LevelFilter::ERROR);

    let console_layer = fmt::layer().with_writer(std::io::stdout);

    tracing_subscriber::registry()
        .with(
            EnvFilter::from_default_env()
                .add_directive("weather_pipeline=info".parse().unwrap()),
        )
        .with(file_layer)
        .with(error_layer)
        .with(console_layer)
        .init();

    // Keep the guards alive so logs are flushed on exit
    std::mem::forget(file_guard);
    std::mem::forget(error_guard);
}
