// Logger initialization

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use crate::config::LoggingConfig;

pub const DEFAULT_FILTER: &str = "wedding_uploader=debug,tower_http=debug,axum=debug";

/// Install the global subscriber.
///
/// With `LOG_DIR` set, a daily rolling file is written next to stdout; keep
/// the returned guard alive until shutdown so buffered lines get flushed.
pub fn init_logger(config: &LoggingConfig) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_FILTER.into());

    let stdout_layer = if config.json {
        fmt::layer().json().boxed()
    } else {
        fmt::layer().boxed()
    };

    let (file_layer, guard) = match &config.dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "wedding-uploader.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer().with_ansi(false).with_writer(writer).boxed();
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stdout_layer)
        .with(file_layer)
        .init();

    guard
}

/// Quieter default for the terminal client, where logs share the screen
/// with the status view.
pub fn init_client_logger() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| "wedding_uploader=warn".into());
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();
}
