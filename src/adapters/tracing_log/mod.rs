// Tracing log adapter - Installs the global tracing subscriber

use tracing_subscriber::EnvFilter;

use crate::domain::config::LoggingSettings;

/// Build the filter: `RUST_LOG` wins over the configured level
pub fn env_filter(settings: &LoggingSettings) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("phrasecut={}", settings.level.to_lowercase())))
}

/// Install a stderr subscriber, plain or JSON.
///
/// Stdout stays reserved for command output. Returns false if a subscriber
/// was already installed.
pub fn init_logging(settings: &LoggingSettings) -> bool {
    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter(settings))
        .with_writer(std::io::stderr)
        .with_target(false);

    let installed = if settings.json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    installed.is_ok()
}
