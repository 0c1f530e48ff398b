use std::sync::Arc;

use krishimitr_agent::{QueryDispatcher, RecorderWorker};
use krishimitr_core::config::{AppConfig, ConfigError};
use krishimitr_core::ProviderError;
use krishimitr_db::{connect_with_config, migrations, DbPool, SqlConversationRepository};
use thiserror::Error;
use tracing::{info, warn};

pub struct Application {
    pub config: AppConfig,
    pub db_pool: DbPool,
    pub dispatcher: QueryDispatcher,
    pub recorder: RecorderWorker,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("database connection failed: {0}")]
    DatabaseConnect(#[source] sqlx::Error),
    #[error("database migration failed: {0}")]
    Migration(#[source] sqlx::migrate::MigrateError),
    #[error("provider client setup failed: {0}")]
    Provider(#[from] ProviderError),
}

pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        "starting application bootstrap"
    );

    let db_pool = connect_with_config(&config.database)
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

    warn_on_missing_credentials(&config);

    let repository = Arc::new(SqlConversationRepository::new(db_pool.clone()));
    let (dispatcher, recorder) = QueryDispatcher::from_config(&config, repository)?;

    Ok(Application { config, db_pool, dispatcher, recorder })
}

fn warn_on_missing_credentials(config: &AppConfig) {
    if config.market.api_key().is_none() {
        warn!(
            event_name = "system.bootstrap.credentials_missing",
            correlation_id = "bootstrap",
            provider = "market_data",
            "DATA_GOV_API_KEY is not set; price questions will get the unavailable reply"
        );
    }
    if config.generative.api_key().is_none() {
        warn!(
            event_name = "system.bootstrap.credentials_missing",
            correlation_id = "bootstrap",
            provider = "generative",
            "GEMINI_API_KEY is not set; general questions will get the failure reply"
        );
    }
}

#[cfg(test)]
mod tests {
    use krishimitr_core::config::{AppConfig, ConfigOverrides, LoadOptions};

    use crate::bootstrap::{bootstrap_with_config, Application, BootstrapError};

    async fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
        let config = AppConfig::load(options)?;
        bootstrap_with_config(config).await
    }

    fn in_memory(database_url: &str) -> LoadOptions {
        LoadOptions {
            overrides: ConfigOverrides {
                database_url: Some(database_url.to_string()),
                ..ConfigOverrides::default()
            },
            ..LoadOptions::default()
        }
    }

    #[tokio::test]
    async fn bootstrap_applies_migrations_without_provider_keys() {
        let app = bootstrap(in_memory("sqlite::memory:?cache=shared"))
            .await
            .expect("bootstrap should succeed without credentials");

        let (table_count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = 'conversation'",
        )
        .fetch_one(&app.db_pool)
        .await
        .expect("conversation table should exist");
        assert_eq!(table_count, 1);

        app.db_pool.close().await;
    }

    #[tokio::test]
    async fn bootstrap_rejects_invalid_provider_url() {
        let result = bootstrap(LoadOptions {
            overrides: ConfigOverrides {
                database_url: Some("sqlite::memory:".to_string()),
                market_base_url: Some("ftp://api.data.gov.in".to_string()),
                ..ConfigOverrides::default()
            },
            ..LoadOptions::default()
        })
        .await;

        let message = result.err().expect("invalid url should fail").to_string();
        assert!(message.contains("market.base_url"), "{message}");
    }
}
