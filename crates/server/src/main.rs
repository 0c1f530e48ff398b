mod bootstrap;
mod chat;
mod health;

use anyhow::Result;
use axum::http::{header, Method};
use axum::{routing::get, Router};
use krishimitr_agent::QueryDispatcher;
use krishimitr_core::config::{AppConfig, LoadOptions};
use krishimitr_db::DbPool;
use tower_http::cors::{Any, CorsLayer};

fn init_logging(config: &AppConfig) {
    use krishimitr_core::config::LogFormat::*;
    use tracing::Level;

    let log_level = config.logging.level.parse::<Level>().unwrap_or(Level::INFO);

    match config.logging.format {
        Compact => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).compact().init();
        }
        Pretty => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).pretty().init();
        }
        Json => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).json().init();
        }
    }
}

fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE])
}

fn app(dispatcher: QueryDispatcher, db_pool: DbPool) -> Router {
    chat::router(dispatcher)
        .merge(health::router(db_pool))
        .route("/ping", get(health::ping))
        .layer(cors_layer())
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    run().await
}

pub async fn run() -> Result<()> {
    let config = AppConfig::load(LoadOptions::default())?;
    init_logging(&config);

    let application = bootstrap::bootstrap_with_config(config).await?;
    let address =
        format!("{}:{}", application.config.server.bind_address, application.config.server.port);
    let listener = tokio::net::TcpListener::bind(&address).await?;

    tracing::info!(
        event_name = "system.server.started",
        correlation_id = "bootstrap",
        bind_address = %address,
        "krishimitr-server listening"
    );

    let dispatcher = application.dispatcher.clone();
    axum::serve(listener, app(application.dispatcher, application.db_pool.clone()))
        .with_graceful_shutdown(wait_for_shutdown())
        .await?;

    tracing::info!(
        event_name = "system.server.stopping",
        correlation_id = "shutdown",
        "draining cache writes before exit"
    );
    dispatcher.cache().flush().await;
    drop(dispatcher);
    application.recorder.join().await;
    application.db_pool.close().await;

    Ok(())
}

async fn wait_for_shutdown() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        tracing::error!(
            event_name = "system.server.signal_failed",
            correlation_id = "shutdown",
            error = %error,
            "could not listen for shutdown signal"
        );
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use krishimitr_agent::fakes::{ScriptedGenerative, StaticMarketData};
    use krishimitr_agent::{
        GenerativeFallback, PriceLookup, ProviderTimeouts, QueryDispatcher, ResponseCache,
    };
    use krishimitr_db::{connect_with_settings, InMemoryConversationRepository};
    use tower::ServiceExt;

    use crate::app;

    #[tokio::test]
    async fn ping_route_is_mounted() {
        let (cache, _worker) =
            ResponseCache::spawn(Arc::new(InMemoryConversationRepository::default()));
        let dispatcher = QueryDispatcher::new(
            PriceLookup::new(Arc::new(StaticMarketData::empty()), 5),
            GenerativeFallback::new(Arc::new(ScriptedGenerative::no_candidates())),
            cache,
            ProviderTimeouts::default(),
        );
        let pool = connect_with_settings("sqlite::memory:", 1, 5).await.expect("pool");

        let response = app(dispatcher, pool)
            .oneshot(Request::builder().uri("/ping").body(Body::empty()).expect("request"))
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), usize::MAX).await.expect("body");
        assert_eq!(&body[..], b"pong");
    }
}
