use std::sync::Arc;

use chrono::Utc;

use crate::commands::{build_runtime, CommandResult};
use coverdesk_core::config::{AppConfig, LoadOptions};
use coverdesk_db::repositories::SqlRenewalPolicyRepository;
use coverdesk_db::{connect_with_settings, migrations};
use coverdesk_notify::{
    HttpMessageTransport, MessageTemplates, MessageTransport, MockTransport, Notifier,
};
use coverdesk_workflow::RenewalService;

pub fn run() -> CommandResult {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                "renewals",
                "config_validation",
                format!("configuration issue: {error}"),
                2,
            );
        }
    };

    let templates = match MessageTemplates::new() {
        Ok(templates) => templates,
        Err(error) => {
            return CommandResult::failure(
                "renewals",
                "templates",
                format!("message templates failed to compile: {error}"),
                3,
            );
        }
    };

    let runtime = match build_runtime("renewals") {
        Ok(runtime) => runtime,
        Err(failure) => return failure,
    };

    let result = runtime.block_on(async {
        let pool = connect_with_settings(
            &config.database.url,
            config.database.max_connections,
            config.database.timeout_secs,
        )
        .await
        .map_err(|error| ("db_connectivity", error.to_string(), 4u8))?;
        migrations::run_pending(&pool)
            .await
            .map_err(|error| ("migration", error.to_string(), 5u8))?;

        let transport: Arc<dyn MessageTransport> = if config.messaging.enabled {
            Arc::new(HttpMessageTransport::new(
                config.messaging.api_base_url.clone().unwrap_or_default(),
                config.messaging.api_token.clone(),
            ))
        } else {
            Arc::new(MockTransport::default())
        };
        let notifier = Arc::new(Notifier::new(
            transport,
            templates,
            config.messaging.default_country_code.clone(),
        ));

        let service = RenewalService::new(
            Arc::new(SqlRenewalPolicyRepository::new(pool.clone())),
            notifier,
        );
        let report = service
            .scan(Utc::now().date_naive())
            .await
            .map_err(|error| ("scan", error.to_string(), 6u8))?;
        pool.close().await;
        Ok::<_, (&'static str, String, u8)>(report)
    });

    match result {
        Ok(report) => CommandResult::success(
            "renewals",
            format!(
                "scanned {} policies: {} reminders sent, {} assigned to pool, {} failures",
                report.scanned,
                report.reminders_sent.len(),
                report.pooled.len(),
                report.failures.len()
            ),
        ),
        Err((error_class, message, exit_code)) => {
            CommandResult::failure("renewals", error_class, message, exit_code)
        }
    }
}
