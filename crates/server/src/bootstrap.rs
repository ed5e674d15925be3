use std::sync::Arc;

use secrecy::ExposeSecret;
use thiserror::Error;
use tracing::info;

use coverdesk_core::config::{AppConfig, ConfigError, LoadOptions};
use coverdesk_core::links::PaymentLinkSigner;
use coverdesk_db::repositories::{
    AuditLogRepository, CachedQuoteRepository, QuoteRepository, RenewalPolicyRepository,
    SqlAuditLogRepository, SqlQuoteRepository, SqlRenewalPolicyRepository,
};
use coverdesk_db::{connect_with_settings, migrations, DbPool};
use coverdesk_notify::{
    HttpMessageTransport, MessageTemplates, MessageTransport, MockTransport, Notifier,
};
use coverdesk_workflow::{AssignmentService, QuoteService, RenewalService};

#[derive(Clone)]
pub struct Services {
    pub quotes: Arc<QuoteService>,
    pub assignments: Arc<AssignmentService>,
    pub renewals: Arc<RenewalService>,
    pub signer: PaymentLinkSigner,
}

pub struct Application {
    pub config: AppConfig,
    pub db_pool: DbPool,
    pub services: Services,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("database connection failed: {0}")]
    DatabaseConnect(#[source] sqlx::Error),
    #[error("database migration failed: {0}")]
    Migration(#[source] sqlx::migrate::MigrateError),
    #[error("message templates failed to compile: {0}")]
    Templates(String),
}

pub async fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
    let config = AppConfig::load(options)?;
    bootstrap_with_config(config).await
}

pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        "starting application bootstrap"
    );

    let db_pool = connect_with_settings(
        &config.database.url,
        config.database.max_connections,
        config.database.timeout_secs,
    )
    .await
    .map_err(BootstrapError::DatabaseConnect)?;
    info!(
        event_name = "system.bootstrap.database_connected",
        correlation_id = "bootstrap",
        "database connection established"
    );

    migrations::run_pending(&db_pool).await.map_err(BootstrapError::Migration)?;
    info!(
        event_name = "system.bootstrap.migrations_applied",
        correlation_id = "bootstrap",
        "database migrations applied"
    );

    let quotes: Arc<dyn QuoteRepository> =
        Arc::new(CachedQuoteRepository::new(SqlQuoteRepository::new(db_pool.clone())));
    let audit: Arc<dyn AuditLogRepository> =
        Arc::new(SqlAuditLogRepository::new(db_pool.clone()));
    let policies: Arc<dyn RenewalPolicyRepository> =
        Arc::new(SqlRenewalPolicyRepository::new(db_pool.clone()));

    let transport: Arc<dyn MessageTransport> = if config.messaging.enabled {
        let base_url = config.messaging.api_base_url.clone().unwrap_or_default();
        Arc::new(HttpMessageTransport::new(base_url, config.messaging.api_token.clone()))
    } else {
        Arc::new(MockTransport::default())
    };
    info!(
        event_name = "system.bootstrap.messaging_transport",
        correlation_id = "bootstrap",
        transport_mode = if config.messaging.enabled { "http" } else { "mock" },
        "messaging transport initialized"
    );

    let templates = MessageTemplates::new()
        .map_err(|error| BootstrapError::Templates(error.to_string()))?;
    let notifier = Arc::new(Notifier::new(
        transport,
        templates,
        config.messaging.default_country_code.clone(),
    ));

    let signer = PaymentLinkSigner::new(config.links.signing_key.expose_secret());

    let services = Services {
        quotes: Arc::new(QuoteService::new(
            quotes.clone(),
            audit.clone(),
            notifier.clone(),
            signer.clone(),
            config.links.portal_base_url.clone(),
        )),
        assignments: Arc::new(AssignmentService::new(quotes, audit)),
        renewals: Arc::new(RenewalService::new(policies, notifier)),
        signer,
    };

    Ok(Application { config, db_pool, services })
}
