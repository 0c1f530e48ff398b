use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use chrono::Utc;
use krishimitr_db::DbPool;
use serde::Serialize;

#[derive(Clone)]
pub struct HealthState {
    db_pool: DbPool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthCheck {
    pub status: &'static str,
    pub detail: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: HealthCheck,
    pub cache_store: HealthCheck,
    pub checked_at: String,
}

pub fn router(db_pool: DbPool) -> Router {
    Router::new().route("/health", get(health)).with_state(HealthState { db_pool })
}

/// Liveness for hosting platforms that poll a plain-text endpoint.
pub async fn ping() -> &'static str {
    "pong"
}

pub async fn health(State(state): State<HealthState>) -> (StatusCode, Json<HealthResponse>) {
    let cache_store = store_check(&state.db_pool).await;
    let ready = cache_store.status == "ready";

    let payload = HealthResponse {
        status: if ready { "ready" } else { "degraded" },
        service: HealthCheck {
            status: "ready",
            detail: "krishimitr-server accepting chat requests".to_string(),
        },
        cache_store,
        checked_at: Utc::now().to_rfc3339(),
    };

    let status_code = if ready { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE };
    (status_code, Json(payload))
}

async fn store_check(pool: &DbPool) -> HealthCheck {
    match sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM conversation").fetch_one(pool).await {
        Ok(entries) => {
            HealthCheck { status: "ready", detail: format!("{entries} cached conversations") }
        }
        Err(error) => {
            HealthCheck { status: "degraded", detail: format!("cache store query failed: {error}") }
        }
    }
}
