use tracing_subscriber::{
    EnvFilter,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

use crate::config::{LogFormat, LoggingConfig};
use crate::domain::DomainError;

/// Installs the global subscriber; `RUST_LOG` overrides the configured level
pub fn init_logging(config: &LoggingConfig) -> Result<(), DomainError> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .map_err(|e| {
            DomainError::configuration(format!("Invalid log level '{}': {}", config.level, e))
        })?;

    let installed = match config.format {
        LogFormat::Json => tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_span_events(FmtSpan::CLOSE))
            .try_init(),
        LogFormat::Pretty => tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .pretty()
                    .with_target(true)
                    .with_span_events(FmtSpan::CLOSE),
            )
            .try_init(),
    };

    installed.map_err(|e| {
        DomainError::configuration(format!("Failed to install log subscriber: {}", e))
    })?;

    tracing::info!("Logging initialized with level: {}", config.level);
    Ok(())
}

