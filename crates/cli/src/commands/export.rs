use std::fs;
use std::path::Path;

use crate::commands::{build_runtime, CommandResult};
use coverdesk_core::config::{AppConfig, LoadOptions};
use coverdesk_db::repositories::{QuoteRepository, SqlQuoteRepository};
use coverdesk_db::{connect_with_settings, migrations};
use coverdesk_workflow::quotes_to_csv;

pub fn run(output: &Path) -> CommandResult {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                "export",
                "config_validation",
                format!("configuration issue: {error}"),
                2,
            );
        }
    };

    let runtime = match build_runtime("export") {
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
        let quotes = SqlQuoteRepository::new(pool.clone())
            .list_all()
            .await
            .map_err(|error| ("query", error.to_string(), 6u8))?;
        pool.close().await;
        Ok::<_, (&'static str, String, u8)>(quotes)
    });

    let quotes = match result {
        Ok(quotes) => quotes,
        Err((error_class, message, exit_code)) => {
            return CommandResult::failure("export", error_class, message, exit_code);
        }
    };

    let csv_text = match quotes_to_csv(&quotes) {
        Ok(csv_text) => csv_text,
        Err(error) => {
            return CommandResult::failure("export", "serialization", error.to_string(), 7);
        }
    };

    if let Err(error) = fs::write(output, &csv_text) {
        return CommandResult::failure(
            "export",
            "io",
            format!("could not write `{}`: {error}", output.display()),
            8,
        );
    }

    CommandResult::success(
        "export",
        format!("wrote {} quotes to `{}`", quotes.len(), output.display()),
    )
}
