use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use krishimitr_core::config::{AppConfig, LoadOptions};
use toml::Value;

struct Field {
    key_path: &'static str,
    value: String,
    /// Checked in order; the first one set is reported.
    env_keys: &'static [&'static str],
}

pub fn run() -> String {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => return format!("config validation failed: {error}"),
    };

    let config_file_path = detect_config_path();
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];
    for field in fields(&config) {
        let source = field_source(
            field.key_path,
            field.env_keys,
            config_file_doc.as_ref(),
            config_file_path.as_deref(),
        );
        lines.push(render_line(field.key_path, &field.value, source));
    }

    lines.join("\n")
}

fn fields(config: &AppConfig) -> Vec<Field> {
    vec![
        Field {
            key_path: "database.url",
            value: config.database.url.clone(),
            env_keys: &["KRISHIMITR_DATABASE_URL"],
        },
        Field {
            key_path: "database.max_connections",
            value: config.database.max_connections.to_string(),
            env_keys: &["KRISHIMITR_DATABASE_MAX_CONNECTIONS"],
        },
        Field {
            key_path: "database.timeout_secs",
            value: config.database.timeout_secs.to_string(),
            env_keys: &["KRISHIMITR_DATABASE_TIMEOUT_SECS"],
        },
        Field {
            key_path: "generative.api_key",
            value: redact_key(config.generative.api_key()),
            env_keys: &["KRISHIMITR_GENERATIVE_API_KEY", "GEMINI_API_KEY", "GOOGLE_API_KEY"],
        },
        Field {
            key_path: "generative.base_url",
            value: config.generative.base_url.clone(),
            env_keys: &["KRISHIMITR_GENERATIVE_BASE_URL"],
        },
        Field {
            key_path: "generative.model",
            value: config.generative.model.clone(),
            env_keys: &["KRISHIMITR_GENERATIVE_MODEL"],
        },
        Field {
            key_path: "generative.timeout_secs",
            value: config.generative.timeout_secs.to_string(),
            env_keys: &["KRISHIMITR_GENERATIVE_TIMEOUT_SECS"],
        },
        Field {
            key_path: "market.api_key",
            value: redact_key(config.market.api_key()),
            env_keys: &["KRISHIMITR_MARKET_API_KEY", "DATA_GOV_API_KEY"],
        },
        Field {
            key_path: "market.base_url",
            value: config.market.base_url.clone(),
            env_keys: &["KRISHIMITR_MARKET_BASE_URL"],
        },
        Field {
            key_path: "market.resource_id",
            value: config.market.resource_id.clone(),
            env_keys: &["KRISHIMITR_MARKET_RESOURCE_ID"],
        },
        Field {
            key_path: "market.record_limit",
            value: config.market.record_limit.to_string(),
            env_keys: &["KRISHIMITR_MARKET_RECORD_LIMIT"],
        },
        Field {
            key_path: "market.timeout_secs",
            value: config.market.timeout_secs.to_string(),
            env_keys: &["KRISHIMITR_MARKET_TIMEOUT_SECS"],
        },
        Field {
            key_path: "server.bind_address",
            value: config.server.bind_address.clone(),
            env_keys: &["KRISHIMITR_SERVER_BIND_ADDRESS"],
        },
        Field {
            key_path: "server.port",
            value: config.server.port.to_string(),
            env_keys: &["KRISHIMITR_SERVER_PORT", "PORT"],
        },
        Field {
            key_path: "logging.level",
            value: config.logging.level.clone(),
            env_keys: &["KRISHIMITR_LOGGING_LEVEL", "KRISHIMITR_LOG_LEVEL"],
        },
        Field {
            key_path: "logging.format",
            value: format!("{:?}", config.logging.format),
            env_keys: &["KRISHIMITR_LOGGING_FORMAT", "KRISHIMITR_LOG_FORMAT"],
        },
    ]
}

fn detect_config_path() -> Option<PathBuf> {
    [PathBuf::from("krishimitr.toml"), PathBuf::from("config/krishimitr.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_keys: &[&str],
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if let Some(env_key) = env_keys.iter().find(|key| env::var_os(key).is_some()) {
        return format!("env ({env_key})");
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, key_path) {
            let file_path = config_file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

fn render_line(key: &str, value: &str, source: String) -> String {
    format!("- {key} = {value} (source: {source})")
}

/// Shows at most the last four characters of a key.
fn redact_key(key: Option<&str>) -> String {
    match key {
        None => "<unset>".to_string(),
        Some(key) if key.chars().count() <= 8 => "<redacted>".to_string(),
        Some(key) => {
            let chars: Vec<char> = key.chars().collect();
            let tail: String = chars[chars.len() - 4..].iter().collect();
            format!("***{tail}")
        }
    }
}
