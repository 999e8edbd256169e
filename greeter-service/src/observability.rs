//! Tracing subscriber setup

use tracing::Subscriber;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use crate::config::{Config, LogFormat};
use crate::error::{Error, Result};

/// Initialize the global tracing subscriber
///
/// `RUST_LOG` takes precedence over `service.log_level` when set.
pub fn init_tracing(config: &Config) -> Result<()> {
    build_subscriber(config)
        .try_init()
        .map_err(|e| Error::Internal(format!("Failed to install tracing subscriber: {}", e)))?;

    tracing::info!(
        environment = %config.service.environment,
        "Tracing initialized for service: {}",
        config.service.name
    );

    Ok(())
}

/// Build the subscriber `init_tracing` installs, without installing it
pub fn build_subscriber(config: &Config) -> Box<dyn Subscriber + Send + Sync> {
    let directives = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    let filter = log_filter(directives.as_deref(), &config.service.log_level);

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);

    match config.service.log_format {
        LogFormat::Json => Box::new(builder.json().finish()),
        LogFormat::Pretty => Box::new(builder.pretty().finish()),
    }
}

/// Env directives win over the configured level; bad input falls back to `info`
fn log_filter(env_directives: Option<&str>, log_level: &str) -> EnvFilter {
    env_directives
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .or_else(|| EnvFilter::try_new(log_level).ok())
        .unwrap_or_else(|| EnvFilter::new("info"))
}
