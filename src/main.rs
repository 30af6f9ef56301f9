use anyhow::{Context, Result};
use sentio::integration::{OrchestratorBuilder, SessionConfig};
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn main() -> Result<ExitCode> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "sentio=debug,info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Sentio");

    let config = SessionConfig::discover().context("Failed to load configuration")?;
    let orchestrator = OrchestratorBuilder::with_config(config)
        .build()
        .context("Failed to set up the session")?;

    let report = orchestrator.run();
    info!("Session report: {}", serde_json::to_string(&report)?);

    if report.is_success() {
        Ok(ExitCode::SUCCESS)
    } else {
        if let Some(e) = &report.error {
            error!("Session ended with an error: {}", e);
        }
        Ok(ExitCode::FAILURE)
    }
}
