use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub generative: GenerativeConfig,
    pub market: MarketConfig,
    pub server: ServerConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct GenerativeConfig {
    pub api_key: Option<SecretString>,
    pub base_url: String,
    pub model: String,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct MarketConfig {
    pub api_key: Option<SecretString>,
    pub base_url: String,
    pub resource_id: String,
    pub record_limit: usize,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
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
    pub generative_api_key: Option<String>,
    pub generative_base_url: Option<String>,
    pub generative_model: Option<String>,
    pub market_api_key: Option<String>,
    pub market_base_url: Option<String>,
    pub server_port: Option<u16>,
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

pub const DEFAULT_MARKET_RESOURCE_ID: &str = "9ef84268-d588-465a-a308-a864a43d0070";

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig {
                url: "sqlite://krishimitr.db?mode=rwc".to_string(),
                max_connections: 5,
                timeout_secs: 30,
            },
            generative: GenerativeConfig {
                api_key: None,
                base_url: "https://generativelanguage.googleapis.com".to_string(),
                model: "gemini-2.5-flash".to_string(),
                timeout_secs: 20,
            },
            market: MarketConfig {
                api_key: None,
                base_url: "https://api.data.gov.in".to_string(),
                resource_id: DEFAULT_MARKET_RESOURCE_ID.to_string(),
                record_limit: 5,
                timeout_secs: 10,
            },
            server: ServerConfig { bind_address: "0.0.0.0".to_string(), port: 8080 },
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
            let expected =
                options.config_path.unwrap_or_else(|| PathBuf::from("krishimitr.toml"));
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

        if let Some(generative) = patch.generative {
            if let Some(api_key_value) = generative.api_key {
                self.generative.api_key = Some(secret_value(api_key_value));
            }
            if let Some(base_url) = generative.base_url {
                self.generative.base_url = base_url;
            }
            if let Some(model) = generative.model {
                self.generative.model = model;
            }
            if let Some(timeout_secs) = generative.timeout_secs {
                self.generative.timeout_secs = timeout_secs;
            }
        }

        if let Some(market) = patch.market {
            if let Some(api_key_value) = market.api_key {
                self.market.api_key = Some(secret_value(api_key_value));
            }
            if let Some(base_url) = market.base_url {
                self.market.base_url = base_url;
            }
            if let Some(resource_id) = market.resource_id {
                self.market.resource_id = resource_id;
            }
            if let Some(record_limit) = market.record_limit {
                self.market.record_limit = record_limit;
            }
            if let Some(timeout_secs) = market.timeout_secs {
                self.market.timeout_secs = timeout_secs;
            }
        }

        if let Some(server) = patch.server {
            if let Some(bind_address) = server.bind_address {
                self.server.bind_address = bind_address;
            }
            if let Some(port) = server.port {
                self.server.port = port;
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
        if let Some(value) = read_env("KRISHIMITR_DATABASE_URL") {
            self.database.url = value;
        }
        if let Some(value) = read_env("KRISHIMITR_DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections =
                parse_u32("KRISHIMITR_DATABASE_MAX_CONNECTIONS", &value)?;
        }
        if let Some(value) = read_env("KRISHIMITR_DATABASE_TIMEOUT_SECS") {
            self.database.timeout_secs = parse_u64("KRISHIMITR_DATABASE_TIMEOUT_SECS", &value)?;
        }

        // Provider-conventional names first, namespaced names win.
        let generative_key = read_env("KRISHIMITR_GENERATIVE_API_KEY")
            .or_else(|| read_env("GEMINI_API_KEY"))
            .or_else(|| read_env("GOOGLE_API_KEY"));
        if let Some(value) = generative_key {
            self.generative.api_key = Some(secret_value(value));
        }
        if let Some(value) = read_env("KRISHIMITR_GENERATIVE_BASE_URL") {
            self.generative.base_url = value;
        }
        if let Some(value) = read_env("KRISHIMITR_GENERATIVE_MODEL") {
            self.generative.model = value;
        }
        if let Some(value) = read_env("KRISHIMITR_GENERATIVE_TIMEOUT_SECS") {
            self.generative.timeout_secs =
                parse_u64("KRISHIMITR_GENERATIVE_TIMEOUT_SECS", &value)?;
        }

        let market_key =
            read_env("KRISHIMITR_MARKET_API_KEY").or_else(|| read_env("DATA_GOV_API_KEY"));
        if let Some(value) = market_key {
            self.market.api_key = Some(secret_value(value));
        }
        if let Some(value) = read_env("KRISHIMITR_MARKET_BASE_URL") {
            self.market.base_url = value;
        }
        if let Some(value) = read_env("KRISHIMITR_MARKET_RESOURCE_ID") {
            self.market.resource_id = value;
        }
        if let Some(value) = read_env("KRISHIMITR_MARKET_RECORD_LIMIT") {
            self.market.record_limit = parse_usize("KRISHIMITR_MARKET_RECORD_LIMIT", &value)?;
        }
        if let Some(value) = read_env("KRISHIMITR_MARKET_TIMEOUT_SECS") {
            self.market.timeout_secs = parse_u64("KRISHIMITR_MARKET_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("KRISHIMITR_SERVER_BIND_ADDRESS") {
            self.server.bind_address = value;
        }
        if let Some(value) = read_env("KRISHIMITR_SERVER_PORT") {
            self.server.port = parse_u16("KRISHIMITR_SERVER_PORT", &value)?;
        } else if let Some(value) = read_env("PORT") {
            self.server.port = parse_u16("PORT", &value)?;
        }

        let log_level =
            read_env("KRISHIMITR_LOGGING_LEVEL").or_else(|| read_env("KRISHIMITR_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("KRISHIMITR_LOGGING_FORMAT").or_else(|| read_env("KRISHIMITR_LOG_FORMAT"));
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
        if let Some(api_key) = overrides.generative_api_key {
            self.generative.api_key = Some(secret_value(api_key));
        }
        if let Some(base_url) = overrides.generative_base_url {
            self.generative.base_url = base_url;
        }
        if let Some(model) = overrides.generative_model {
            self.generative.model = model;
        }
        if let Some(api_key) = overrides.market_api_key {
            self.market.api_key = Some(secret_value(api_key));
        }
        if let Some(base_url) = overrides.market_base_url {
            self.market.base_url = base_url;
        }
        if let Some(port) = overrides.server_port {
            self.server.port = port;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_database(&self.database)?;
        validate_generative(&self.generative)?;
        validate_market(&self.market)?;
        validate_server(&self.server)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

impl GenerativeConfig {
    /// Key with surrounding whitespace removed, `None` when blank.
    pub fn api_key(&self) -> Option<&str> {
        non_blank_secret(self.api_key.as_ref())
    }
}

impl MarketConfig {
    pub fn api_key(&self) -> Option<&str> {
        non_blank_secret(self.api_key.as_ref())
    }
}

fn non_blank_secret(secret: Option<&SecretString>) -> Option<&str> {
    secret.map(|value| value.expose_secret().trim()).filter(|value| !value.is_empty())
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("krishimitr.toml"), PathBuf::from("config/krishimitr.toml")]
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

fn validate_generative(generative: &GenerativeConfig) -> Result<(), ConfigError> {
    if generative.timeout_secs == 0 || generative.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "generative.timeout_secs must be in range 1..=300".to_string(),
        ));
    }
    if generative.model.trim().is_empty() {
        return Err(ConfigError::Validation("generative.model must not be empty".to_string()));
    }
    validate_http_url("generative.base_url", &generative.base_url)
}

fn validate_market(market: &MarketConfig) -> Result<(), ConfigError> {
    if market.timeout_secs == 0 || market.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "market.timeout_secs must be in range 1..=300".to_string(),
        ));
    }
    if market.record_limit == 0 || market.record_limit > 100 {
        return Err(ConfigError::Validation(
            "market.record_limit must be in range 1..=100".to_string(),
        ));
    }
    if market.resource_id.trim().is_empty() {
        return Err(ConfigError::Validation(
            "market.resource_id must not be empty".to_string(),
        ));
    }
    validate_http_url("market.base_url", &market.base_url)
}

fn validate_http_url(key: &str, value: &str) -> Result<(), ConfigError> {
    if !value.starts_with("http://") && !value.starts_with("https://") {
        return Err(ConfigError::Validation(format!(
            "{key} must start with http:// or https://"
        )));
    }
    Ok(())
}

fn validate_server(server: &ServerConfig) -> Result<(), ConfigError> {
    if server.port == 0 {
        return Err(ConfigError::Validation("server.port must be greater than zero".to_string()));
    }
    if server.bind_address.trim().is_empty() {
        return Err(ConfigError::Validation(
            "server.bind_address must not be empty".to_string(),
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

fn parse_usize(key: &str, value: &str) -> Result<usize, ConfigError> {
    value.parse::<usize>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    database: Option<DatabasePatch>,
    generative: Option<GenerativePatch>,
    market: Option<MarketPatch>,
    server: Option<ServerPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct DatabasePatch {
    url: Option<String>,
    max_connections: Option<u32>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct GenerativePatch {
    api_key: Option<String>,
    base_url: Option<String>,
    model: Option<String>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct MarketPatch {
    api_key: Option<String>,
    base_url: Option<String>,
    resource_id: Option<String>,
    record_limit: Option<usize>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct ServerPatch {
    bind_address: Option<String>,
    port: Option<u16>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}
