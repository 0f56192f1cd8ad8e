//! Tracing subscriber setup
//!
//! `RUST_LOG` takes precedence over the configured level. Console output is
//! pretty or JSON; a daily-rolling log file is added when a directory is
//! configured.

use anyhow::Result;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    fmt, layer::Layered, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer,
    Registry,
};

use crate::config::LoggingConfig;

type Filtered = Layered<EnvFilter, Registry>;

/// Default filter directive for a configured level
pub fn default_directive(level: &str) -> String {
    format!("libris_server={},tower_http=debug", level)
}

/// Install the global subscriber.
///
/// The returned guard flushes the log file on drop and must be held for the
/// lifetime of the process.
pub fn init_logging(config: &LoggingConfig) -> Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(&config.level)));

    let mut layers: Vec<Box<dyn Layer<Filtered> + Send + Sync>> = Vec::new();

    let console: Box<dyn Layer<Filtered> + Send + Sync> = match config.format.as_str() {
        "json" => fmt::layer().json().boxed(),
        _ => fmt::layer().boxed(),
    };
    layers.push(console);

    let guard = match config.directory {
        Some(ref dir) => {
            let appender = tracing_appender::rolling::daily(dir, "libris-server.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            layers.push(fmt::layer().with_writer(writer).with_ansi(false).boxed());
            Some(guard)
        }
        None => None,
    };

    tracing_subscriber::registry().with(filter).with(layers).try_init()?;

    Ok(guard)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_directive() {
        assert_eq!(default_directive("warn"), "libris_server=warn,tower_http=debug");
    }
}
