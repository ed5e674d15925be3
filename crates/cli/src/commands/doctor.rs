use serde::Serialize;

use crate::commands::{build_runtime, CommandResult};
use coverdesk_core::config::{AppConfig, LoadOptions};
use coverdesk_db::connect_with_settings;

#[derive(Debug, Serialize)]
struct DoctorCheck {
    name: &'static str,
    status: &'static str,
    detail: String,
}

#[derive(Debug, Serialize)]
struct DoctorReport {
    command: &'static str,
    status: &'static str,
    checks: Vec<DoctorCheck>,
}

pub fn run() -> CommandResult {
    let mut checks = Vec::new();

    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => {
            checks.push(DoctorCheck {
                name: "config",
                status: "ok",
                detail: "configuration loaded and validated".to_string(),
            });
            Some(config)
        }
        Err(error) => {
            checks.push(DoctorCheck {
                name: "config",
                status: "error",
                detail: error.to_string(),
            });
            None
        }
    };

    if let Some(config) = &config {
        checks.push(DoctorCheck {
            name: "messaging",
            status: "ok",
            detail: if config.messaging.enabled {
                "http transport configured".to_string()
            } else {
                "mock transport (messaging disabled)".to_string()
            },
        });

        let runtime = match build_runtime("doctor") {
            Ok(runtime) => runtime,
            Err(failure) => return failure,
        };

        let database_check = runtime.block_on(async {
            match connect_with_settings(
                &config.database.url,
                config.database.max_connections,
                config.database.timeout_secs,
            )
            .await
            {
                Ok(pool) => {
                    let probe =
                        sqlx::query_scalar::<_, i64>("SELECT 1").fetch_one(&pool).await;
                    pool.close().await;
                    match probe {
                        Ok(_) => DoctorCheck {
                            name: "database",
                            status: "ok",
                            detail: "connection and probe query succeeded".to_string(),
                        },
                        Err(error) => DoctorCheck {
                            name: "database",
                            status: "error",
                            detail: format!("probe query failed: {error}"),
                        },
                    }
                }
                Err(error) => DoctorCheck {
                    name: "database",
                    status: "error",
                    detail: format!("connection failed: {error}"),
                },
            }
        });
        checks.push(database_check);
    }

    let healthy = checks.iter().all(|check| check.status == "ok");
    let report = DoctorReport {
        command: "doctor",
        status: if healthy { "ok" } else { "error" },
        checks,
    };

    let output = serde_json::to_string(&report)
        .unwrap_or_else(|error| format!("{{\"command\":\"doctor\",\"status\":\"error\",\"message\":\"{error}\"}}"));

    CommandResult { exit_code: if healthy { 0 } else { 1 }, output }
}
