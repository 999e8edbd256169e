use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;

use greeter_service::prelude::*;

/// greeter-server - authenticated gRPC greeting-record service
#[derive(Parser)]
#[command(name = "greeter-server")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Configuration file (defaults to the standard search paths)
    #[arg(short, long, env = "GREETER_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::load_from(path)
            .with_context(|| format!("loading configuration from {}", path.display()))?,
        None => Config::load().context("loading configuration")?,
    };

    init_tracing(&config).context("initializing tracing")?;

    let validator = JwtValidator::new(&config.jwt).context("building token validator")?;
    let pipeline = Pipeline::standard(validator, &config.auth);
    let server = GreeterServer::new(&config);

    #[cfg(feature = "database")]
    if let Some(database) = &config.database {
        let store = PgGreetingStore::connect(database)
            .await
            .context("connecting to PostgreSQL")?;
        tracing::info!("Using PostgreSQL greeting store");
        server
            .serve(GreeterService::new(Arc::new(store), pipeline))
            .await?;
        return Ok(());
    }

    #[cfg(not(feature = "database"))]
    if config.database.is_some() {
        tracing::warn!("[database] is configured but the `database` feature is disabled");
    }

    tracing::info!("Using in-memory greeting store");
    server
        .serve(GreeterService::new(
            Arc::new(MemoryGreetingStore::new()),
            pipeline,
        ))
        .await?;

    Ok(())
}
