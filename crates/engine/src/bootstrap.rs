use std::sync::Arc;

use thiserror::Error;
use tracing::info;

use stockflow_core::audit::AuditSink;
use stockflow_core::config::{AppConfig, ConfigError, LoadOptions, LoggingConfig};
use stockflow_core::events::EventBus;
use stockflow_core::notify::Notifier;
use stockflow_core::sla::SystemClock;

use stockflow_db::documents::DocumentStoreRegistry;
use stockflow_db::repositories::{
    SqlActorRepository, SqlApprovalStepRepository, SqlDelegationRepository,
    SqlWorkflowRuleRepository,
};
use stockflow_db::{connect_with_settings, migrations, DbPool};

use crate::orchestrator::ApprovalOrchestrator;

/// External collaborators the engine emits through. The hosting application
/// supplies real channels; tests pass the in-memory implementations.
#[derive(Clone)]
pub struct Collaborators {
    pub audit: Arc<dyn AuditSink>,
    pub notifier: Arc<dyn Notifier>,
    pub events: Arc<dyn EventBus>,
}

pub struct Engine {
    pub config: AppConfig,
    pub db_pool: DbPool,
    pub orchestrator: ApprovalOrchestrator,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("database connection failed: {0}")]
    DatabaseConnect(#[source] sqlx::Error),
    #[error("database migration failed: {0}")]
    Migration(#[source] sqlx::migrate::MigrateError),
}

pub async fn bootstrap(
    options: LoadOptions,
    collaborators: Collaborators,
) -> Result<Engine, BootstrapError> {
    let config = AppConfig::load(options)?;
    bootstrap_with_config(config, collaborators).await
}

pub async fn bootstrap_with_config(
    config: AppConfig,
    collaborators: Collaborators,
) -> Result<Engine, BootstrapError> {
    info!(event_name = "system.bootstrap.start", "starting approval engine bootstrap");

    let db_pool = connect_with_settings(
        &config.database.url,
        config.database.max_connections,
        config.database.timeout_secs,
    )
    .await
    .map_err(BootstrapError::DatabaseConnect)?;
    info!(event_name = "system.bootstrap.database_connected", "database connection established");

    migrations::run_pending(&db_pool).await.map_err(BootstrapError::Migration)?;
    info!(event_name = "system.bootstrap.migrations_applied", "database migrations applied");

    let orchestrator = ApprovalOrchestrator::new(
        Arc::new(SqlWorkflowRuleRepository::new(db_pool.clone())),
        Arc::new(SqlApprovalStepRepository::new(db_pool.clone())),
        Arc::new(SqlDelegationRepository::new(db_pool.clone())),
        Arc::new(SqlActorRepository::new(db_pool.clone())),
        DocumentStoreRegistry::sql(db_pool.clone()),
        collaborators.audit,
        collaborators.notifier,
        collaborators.events,
        Arc::new(SystemClock),
    );

    Ok(Engine { config, db_pool, orchestrator })
}

/// Install the global tracing subscriber in the configured format. Callers
/// own process startup; invoke once.
pub fn init_logging(config: &LoggingConfig) {
    use stockflow_core::config::LogFormat::*;
    use tracing::Level;

    let log_level = config.level.parse::<Level>().unwrap_or(Level::INFO);

    match config.format {
        Compact => {
            let _ = tracing_subscriber::fmt()
                .with_target(false)
                .with_max_level(log_level)
                .compact()
                .try_init();
        }
        Pretty => {
            let _ = tracing_subscriber::fmt()
                .with_target(false)
                .with_max_level(log_level)
                .pretty()
                .try_init();
        }
        Json => {
            let _ = tracing_subscriber::fmt()
                .with_target(false)
                .with_max_level(log_level)
                .json()
                .try_init();
        }
    }
}
