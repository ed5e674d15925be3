use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub messaging: MessagingConfig,
    pub links: LinksConfig,
    pub server: ServerConfig,
    pub renewals: RenewalsConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct MessagingConfig {
    /// When disabled, the mock transport is used and no token is required.
    pub enabled: bool,
    pub api_base_url: Option<String>,
    pub api_token: SecretString,
    pub default_country_code: String,
}

#[derive(Clone, Debug)]
pub struct LinksConfig {
    pub signing_key: SecretString,
    pub portal_base_url: String,
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
    pub graceful_shutdown_secs: u64,
}

#[derive(Clone, Debug)]
pub struct RenewalsConfig {
    pub scan_interval_secs: u64,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub database_url: Option<String>,
    pub log_level: Option<String>,
    pub messaging_enabled: Option<bool>,
    pub messaging_api_token: Option<String>,
    pub links_signing_key: Option<String>,
    pub portal_base_url: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig {
                url: "sqlite://coverdesk.db".to_string(),
                max_connections: 5,
                timeout_secs: 30,
            },
            messaging: MessagingConfig {
                enabled: false,
                api_base_url: None,
                api_token: String::new().into(),
                default_country_code: "973".to_string(),
            },
            links: LinksConfig {
                signing_key: String::new().into(),
                portal_base_url: "http://localhost:8080/portal".to_string(),
            },
            server: ServerConfig {
                bind_address: "127.0.0.1".to_string(),
                port: 8080,
                graceful_shutdown_secs: 15,
            },
            renewals: RenewalsConfig { scan_interval_secs: 3600 },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

fn secret_value(value: String) -> SecretString {
    value.into()
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("coverdesk.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(database) = patch.database {
            if let Some(url) = database.url {
                self.database.url = url;
            }
            if let Some(max_connections) = database.max_connections {
                self.database.max_connections = max_connections;
            }
            if let Some(timeout_secs) = database.timeout_secs {
                self.database.timeout_secs = timeout_secs;
            }
        }

        if let Some(messaging) = patch.messaging {
            if let Some(enabled) = messaging.enabled {
                self.messaging.enabled = enabled;
            }
            if let Some(api_base_url) = messaging.api_base_url {
                self.messaging.api_base_url = Some(api_base_url);
            }
            if let Some(api_token_value) = messaging.api_token {
                self.messaging.api_token = secret_value(api_token_value);
            }
            if let Some(default_country_code) = messaging.default_country_code {
                self.messaging.default_country_code = default_country_code;
            }
        }

        if let Some(links) = patch.links {
            if let Some(signing_key_value) = links.signing_key {
                self.links.signing_key = secret_value(signing_key_value);
            }
            if let Some(portal_base_url) = links.portal_base_url {
                self.links.portal_base_url = portal_base_url;
            }
        }

        if let Some(server) = patch.server {
            if let Some(bind_address) = server.bind_address {
                self.server.bind_address = bind_address;
            }
            if let Some(port) = server.port {
                self.server.port = port;
            }
            if let Some(graceful_shutdown_secs) = server.graceful_shutdown_secs {
                self.server.graceful_shutdown_secs = graceful_shutdown_secs;
            }
        }

        if let Some(renewals) = patch.renewals {
            if let Some(scan_interval_secs) = renewals.scan_interval_secs {
                self.renewals.scan_interval_secs = scan_interval_secs;
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("COVERDESK_DATABASE_URL") {
            self.database.url = value;
        }
        if let Some(value) = read_env("COVERDESK_DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections =
                parse_u32("COVERDESK_DATABASE_MAX_CONNECTIONS", &value)?;
        }
        if let Some(value) = read_env("COVERDESK_DATABASE_TIMEOUT_SECS") {
            self.database.timeout_secs = parse_u64("COVERDESK_DATABASE_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("COVERDESK_MESSAGING_ENABLED") {
            self.messaging.enabled = parse_bool("COVERDESK_MESSAGING_ENABLED", &value)?;
        }
        if let Some(value) = read_env("COVERDESK_MESSAGING_API_BASE_URL") {
            self.messaging.api_base_url = Some(value);
        }
        if let Some(value) = read_env("COVERDESK_MESSAGING_API_TOKEN") {
            self.messaging.api_token = secret_value(value);
        }
        if let Some(value) = read_env("COVERDESK_MESSAGING_DEFAULT_COUNTRY_CODE") {
            self.messaging.default_country_code = value;
        }

        if let Some(value) = read_env("COVERDESK_LINKS_SIGNING_KEY") {
            self.links.signing_key = secret_value(value);
        }
        if let Some(value) = read_env("COVERDESK_LINKS_PORTAL_BASE_URL") {
            self.links.portal_base_url = value;
        }

        if let Some(value) = read_env("COVERDESK_SERVER_BIND_ADDRESS") {
            self.server.bind_address = value;
        }
        if let Some(value) = read_env("COVERDESK_SERVER_PORT") {
            self.server.port = parse_u16("COVERDESK_SERVER_PORT", &value)?;
        }
        if let Some(value) = read_env("COVERDESK_SERVER_GRACEFUL_SHUTDOWN_SECS") {
            self.server.graceful_shutdown_secs =
                parse_u64("COVERDESK_SERVER_GRACEFUL_SHUTDOWN_SECS", &value)?;
        }

        if let Some(value) = read_env("COVERDESK_RENEWALS_SCAN_INTERVAL_SECS") {
            self.renewals.scan_interval_secs =
                parse_u64("COVERDESK_RENEWALS_SCAN_INTERVAL_SECS", &value)?;
        }

        let log_level =
            read_env("COVERDESK_LOGGING_LEVEL").or_else(|| read_env("COVERDESK_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("COVERDESK_LOGGING_FORMAT").or_else(|| read_env("COVERDESK_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(database_url) = overrides.database_url {
            self.database.url = database_url;
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
        if let Some(enabled) = overrides.messaging_enabled {
            self.messaging.enabled = enabled;
        }
        if let Some(api_token) = overrides.messaging_api_token {
            self.messaging.api_token = secret_value(api_token);
        }
        if let Some(signing_key) = overrides.links_signing_key {
            self.links.signing_key = secret_value(signing_key);
        }
        if let Some(portal_base_url) = overrides.portal_base_url {
            self.links.portal_base_url = portal_base_url;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_database(&self.database)?;
        validate_messaging(&self.messaging)?;
        validate_links(&self.links)?;
        validate_server(&self.server)?;
        validate_renewals(&self.renewals)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("coverdesk.toml"), PathBuf::from("config/coverdesk.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn validate_database(database: &DatabaseConfig) -> Result<(), ConfigError> {
    let url = database.url.trim();
    let sqlite_url =
        url.starts_with("sqlite://") || url.starts_with("sqlite::") || url == ":memory:";
    if !sqlite_url {
        return Err(ConfigError::Validation(
            "database.url must be a sqlite URL (`sqlite://...`, `sqlite::...`, or `:memory:`)"
                .to_string(),
        ));
    }

    if database.max_connections == 0 {
        return Err(ConfigError::Validation(
            "database.max_connections must be greater than zero".to_string(),
        ));
    }

    if database.timeout_secs == 0 || database.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "database.timeout_secs must be in range 1..=300".to_string(),
        ));
    }

    Ok(())
}

fn validate_messaging(messaging: &MessagingConfig) -> Result<(), ConfigError> {
    if messaging.enabled {
        let base_url = messaging
            .api_base_url
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .ok_or_else(|| {
                ConfigError::Validation(
                    "messaging.api_base_url is required when messaging.enabled is true"
                        .to_string(),
                )
            })?;
        if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
            return Err(ConfigError::Validation(
                "messaging.api_base_url must start with http:// or https://".to_string(),
            ));
        }

        if messaging.api_token.expose_secret().trim().is_empty() {
            return Err(ConfigError::Validation(
                "messaging.api_token is required when messaging.enabled is true".to_string(),
            ));
        }
    }

    let country_code = messaging.default_country_code.trim();
    if country_code.is_empty() || !country_code.chars().all(|ch| ch.is_ascii_digit()) {
        return Err(ConfigError::Validation(
            "messaging.default_country_code must be a numeric dialing prefix".to_string(),
        ));
    }

    Ok(())
}

fn validate_links(links: &LinksConfig) -> Result<(), ConfigError> {
    if links.signing_key.expose_secret().trim().is_empty() {
        return Err(ConfigError::Validation(
            "links.signing_key is required; set it in coverdesk.toml or COVERDESK_LINKS_SIGNING_KEY"
                .to_string(),
        ));
    }

    let portal = links.portal_base_url.trim();
    if !portal.starts_with("http://") && !portal.starts_with("https://") {
        return Err(ConfigError::Validation(
            "links.portal_base_url must start with http:// or https://".to_string(),
        ));
    }

    Ok(())
}

fn validate_server(server: &ServerConfig) -> Result<(), ConfigError> {
    if server.port == 0 {
        return Err(ConfigError::Validation(
            "server.port must be greater than zero".to_string(),
        ));
    }

    if server.graceful_shutdown_secs == 0 {
        return Err(ConfigError::Validation(
            "server.graceful_shutdown_secs must be greater than zero".to_string(),
        ));
    }

    Ok(())
}

fn validate_renewals(renewals: &RenewalsConfig) -> Result<(), ConfigError> {
    if renewals.scan_interval_secs == 0 || renewals.scan_interval_secs > 86_400 {
        return Err(ConfigError::Validation(
            "renewals.scan_interval_secs must be in range 1..=86400".to_string(),
        ));
    }

    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_u16(key: &str, value: &str) -> Result<u16, ConfigError> {
    value.parse::<u16>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_u32(key: &str, value: &str) -> Result<u32, ConfigError> {
    value.parse::<u32>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value.parse::<u64>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    value.parse::<bool>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    database: Option<DatabasePatch>,
    messaging: Option<MessagingPatch>,
    links: Option<LinksPatch>,
    server: Option<ServerPatch>,
    renewals: Option<RenewalsPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct DatabasePatch {
    url: Option<String>,
    max_connections: Option<u32>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct MessagingPatch {
    enabled: Option<bool>,
    api_base_url: Option<String>,
    api_token: Option<String>,
    default_country_code: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct LinksPatch {
    signing_key: Option<String>,
    portal_base_url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ServerPatch {
    bind_address: Option<String>,
    port: Option<u16>,
    graceful_shutdown_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct RenewalsPatch {
    scan_interval_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}

#[cfg(test)]
mod tests {
    use std::env;
    use std::fs;
    use std::io;
    use std::sync::{Mutex, OnceLock};

    use secrecy::ExposeSecret;
    use tempfile::TempDir;

    use super::{AppConfig, ConfigError, ConfigOverrides, LoadOptions, LogFormat};

    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

    fn env_lock() -> &'static Mutex<()> {
        ENV_LOCK.get_or_init(|| Mutex::new(()))
    }

    fn clear_vars(vars: &[&str]) {
        for var in vars {
            env::remove_var(var);
        }
    }

    fn ensure(condition: bool, message: &'static str) -> Result<(), String> {
        if condition {
            Ok(())
        } else {
            Err(message.to_string())
        }
    }

    #[test]
    fn file_load_supports_env_interpolation() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("TEST_LINK_SIGNING_KEY", "key-from-env");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = dir.path().join("coverdesk.toml");
            fs::write(
                &path,
                r#"
[links]
signing_key = "${TEST_LINK_SIGNING_KEY}"
"#,
            )
            .map_err(|err| err.to_string())?;

            let config =
                AppConfig::load(LoadOptions { config_path: Some(path), ..LoadOptions::default() })
                    .map_err(|err| format!("config load failed: {err}"))?;

            ensure(
                config.links.signing_key.expose_secret() == "key-from-env",
                "signing key should be loaded from environment",
            )?;
            Ok(())
        })();

        clear_vars(&["TEST_LINK_SIGNING_KEY"]);
        result
    }

    #[test]
    fn logging_env_aliases_are_supported() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("COVERDESK_LINKS_SIGNING_KEY", "test-key");
        env::set_var("COVERDESK_LOG_LEVEL", "warn");
        env::set_var("COVERDESK_LOG_FORMAT", "pretty");

        let result = (|| -> Result<(), String> {
            let config = AppConfig::load(LoadOptions::default())
                .map_err(|err| format!("config load failed: {err}"))?;

            ensure(config.logging.level == "warn", "warn log level should be set from env var")?;
            ensure(
                matches!(config.logging.format, LogFormat::Pretty),
                "pretty logging format should be set from env var",
            )?;
            Ok(())
        })();

        clear_vars(&[
            "COVERDESK_LINKS_SIGNING_KEY",
            "COVERDESK_LOG_LEVEL",
            "COVERDESK_LOG_FORMAT",
        ]);
        result
    }

    #[test]
    fn precedence_defaults_file_env_overrides() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("COVERDESK_DATABASE_URL", "sqlite://from-env.db");
        env::set_var("COVERDESK_LINKS_SIGNING_KEY", "key-from-env");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = dir.path().join("coverdesk.toml");
            fs::write(
                &path,
                r#"
[database]
url = "sqlite://from-file.db"

[links]
signing_key = "key-from-file"

[logging]
level = "warn"
"#,
            )
            .map_err(|err| err.to_string())?;

            let config = AppConfig::load(LoadOptions {
                config_path: Some(path),
                overrides: ConfigOverrides {
                    database_url: Some("sqlite://from-override.db".to_string()),
                    log_level: Some("debug".to_string()),
                    ..ConfigOverrides::default()
                },
                ..LoadOptions::default()
            })
            .map_err(|err| format!("config load failed: {err}"))?;

            ensure(
                config.database.url == "sqlite://from-override.db",
                "override database url should win",
            )?;
            ensure(config.logging.level == "debug", "overridden log level should be debug")?;
            ensure(
                config.links.signing_key.expose_secret() == "key-from-env",
                "env signing key should win over file and defaults",
            )?;
            Ok(())
        })();

        clear_vars(&["COVERDESK_DATABASE_URL", "COVERDESK_LINKS_SIGNING_KEY"]);
        result
    }

    #[test]
    fn enabled_messaging_requires_base_url_and_token() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("COVERDESK_LINKS_SIGNING_KEY", "test-key");
        env::set_var("COVERDESK_MESSAGING_ENABLED", "true");

        let result = (|| -> Result<(), String> {
            let error = match AppConfig::load(LoadOptions::default()) {
                Ok(_) => {
                    return Err("expected validation failure but config load succeeded".to_string())
                }
                Err(error) => error,
            };
            let has_message = matches!(
                error,
                ConfigError::Validation(ref message) if message.contains("messaging.api_base_url")
            );
            ensure(has_message, "validation failure should mention messaging.api_base_url")
        })();

        clear_vars(&["COVERDESK_LINKS_SIGNING_KEY", "COVERDESK_MESSAGING_ENABLED"]);
        result
    }

    #[test]
    fn secret_values_are_not_leaked_by_debug() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("COVERDESK_LINKS_SIGNING_KEY", "very-secret-key-value");
        env::set_var("COVERDESK_MESSAGING_API_TOKEN", "very-secret-token-value");

        let result = (|| -> Result<(), String> {
            let config = AppConfig::load(LoadOptions::default())
                .map_err(|err| format!("config load failed: {err}"))?;
            let debug = format!("{config:?}");

            ensure(
                !debug.contains("very-secret-key-value"),
                "debug output should not contain the signing key",
            )?;
            ensure(
                !debug.contains("very-secret-token-value"),
                "debug output should not contain the messaging token",
            )?;
            ensure(
                matches!(config.logging.format, LogFormat::Compact),
                "default logging format should be compact",
            )?;
            Ok(())
        })();

        clear_vars(&["COVERDESK_LINKS_SIGNING_KEY", "COVERDESK_MESSAGING_API_TOKEN"]);
        result
    }
}
