use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{info, warn};

use super::CommandFlags;
use crate::core::audit::AuditStore;
use crate::core::config::AppConfig;
use crate::core::deploy::Deployer;
use crate::core::github::GitHubReviewer;
use crate::core::pipeline::Pipeline;
use crate::interfaces::web::{AppState, WebhookServer};

/// Load config, wire the components, and serve until stopped.
pub async fn run(flags: &CommandFlags) -> Result<()> {
    let config_path = AppConfig::resolve_path(flags.config.as_deref());
    let mut config = AppConfig::load(&config_path).await?;
    if let Some(host) = &flags.host {
        config.server.host = host.clone();
    }
    if let Some(port) = flags.port {
        config.server.port = port;
    }

    let log_guard = crate::logging::init(&config.prolific.logs_dir, flags.verbose, true)?;
    info!(
        "Prolific {} starting (access log {})",
        env!("CARGO_PKG_VERSION"),
        log_guard.path.display()
    );
    info!(
        "Loaded config from {}: root={}, template={:?}, server={} ({}:{})",
        config_path.display(),
        config.prolific.root_path.display(),
        config.prolific.template,
        config.server.name,
        config.server.host,
        config.server.port
    );
    for warning in config.validate() {
        warn!("Config: {}", warning);
    }

    let config = Arc::new(config);
    let reviewer = GitHubReviewer::new(&config).context("failed to build GitHub client")?;
    let deployer = Deployer::from_config(&config.prolific);
    info!(
        "Deploying from {} with {} step(s): {}",
        deployer.root_path().display(),
        deployer.steps().len(),
        deployer.required_programs().join(", ")
    );
    let audit = AuditStore::new(&config.prolific.logs_dir);
    let pipeline = Arc::new(Pipeline::new(
        Arc::new(reviewer),
        Arc::new(deployer),
        audit.clone(),
        config.github.hide_error_reason,
    ));

    WebhookServer::new(AppState::new(config, pipeline, audit))
        .run()
        .await
}
