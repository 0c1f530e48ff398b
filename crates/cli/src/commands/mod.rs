pub mod ask;
pub mod config;
pub mod doctor;
pub mod migrate;
pub mod recall;

use std::sync::Arc;

use krishimitr_agent::{QueryDispatcher, RecorderWorker};
use krishimitr_core::config::{AppConfig, LoadOptions};
use krishimitr_db::{connect_with_config, migrations, DbPool, SqlConversationRepository};
use serde::Serialize;
use tokio::runtime::Runtime;

#[derive(Debug, Clone)]
pub struct CommandResult {
    pub exit_code: u8,
    pub output: String,
}

#[derive(Debug, Serialize)]
struct CommandOutcome {
    command: String,
    status: String,
    error_class: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    reply_kind: Option<String>,
    message: String,
}

impl CommandResult {
    pub fn success(command: &str, message: impl Into<String>) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "ok".to_string(),
            error_class: None,
            reply_kind: None,
            message: message.into(),
        };
        Self { exit_code: 0, output: serialize_payload(payload) }
    }

    /// A dispatched query always produces a reply, apologies included.
    pub fn reply(command: &str, reply_kind: &str, text: impl Into<String>) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "ok".to_string(),
            error_class: None,
            reply_kind: Some(reply_kind.to_string()),
            message: text.into(),
        };
        Self { exit_code: 0, output: serialize_payload(payload) }
    }

    pub fn failure(
        command: &str,
        error_class: &str,
        message: impl Into<String>,
        exit_code: u8,
    ) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "error".to_string(),
            error_class: Some(error_class.to_string()),
            reply_kind: None,
            message: message.into(),
        };
        Self { exit_code, output: serialize_payload(payload) }
    }
}

fn serialize_payload(payload: CommandOutcome) -> String {
    serde_json::to_string(&payload).unwrap_or_else(|error| {
        format!(
            "{{\"command\":\"unknown\",\"status\":\"error\",\"error_class\":\"serialization\",\"message\":\"{}\"}}",
            error.to_string().replace('\\', "\\\\").replace('"', "\\\"")
        )
    })
}

pub(crate) fn load_config(command: &str) -> Result<AppConfig, CommandResult> {
    AppConfig::load(LoadOptions::default()).map_err(|error| {
        CommandResult::failure(
            command,
            "config_validation",
            format!("configuration issue: {error}"),
            2,
        )
    })
}

pub(crate) fn build_runtime(command: &str) -> Result<Runtime, CommandResult> {
    tokio::runtime::Builder::new_current_thread().enable_all().build().map_err(|error| {
        CommandResult::failure(
            command,
            "runtime_init",
            format!("failed to initialize async runtime: {error}"),
            3,
        )
    })
}

pub(crate) async fn open_store(command: &str, config: &AppConfig) -> Result<DbPool, CommandResult> {
    let pool = connect_with_config(&config.database)
        .await
        .map_err(|error| CommandResult::failure(command, "db_connectivity", error.to_string(), 4))?;
    migrations::run_pending(&pool)
        .await
        .map_err(|error| CommandResult::failure(command, "migration", error.to_string(), 5))?;
    Ok(pool)
}

pub(crate) struct Session {
    pub dispatcher: QueryDispatcher,
    worker: RecorderWorker,
    pool: DbPool,
}

impl Session {
    pub(crate) async fn open(command: &str, config: &AppConfig) -> Result<Self, CommandResult> {
        let pool = open_store(command, config).await?;
        let repository = Arc::new(SqlConversationRepository::new(pool.clone()));
        let (dispatcher, worker) = QueryDispatcher::from_config(config, repository)
            .map_err(|error| CommandResult::failure(command, "provider_setup", error.to_string(), 6))?;
        Ok(Self { dispatcher, worker, pool })
    }

    /// Waits for queued cache writes before closing the store.
    pub(crate) async fn close(self) {
        self.dispatcher.cache().flush().await;
        drop(self.dispatcher);
        self.worker.join().await;
        self.pool.close().await;
    }
}
