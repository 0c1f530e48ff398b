use axum::{extract::State, routing::post, Json, Router};
use krishimitr_agent::QueryDispatcher;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Default, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub message: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatResponse {
    pub reply: String,
}

pub fn router(dispatcher: QueryDispatcher) -> Router {
    Router::new()
        .route("/api/chat", post(chat))
        .route("/api/chat-offline", post(chat_offline))
        .with_state(dispatcher)
}

pub async fn chat(
    State(dispatcher): State<QueryDispatcher>,
    Json(request): Json<ChatRequest>,
) -> Json<ChatResponse> {
    let reply = dispatcher.online_query(&request.message).await;
    Json(ChatResponse { reply: reply.text })
}

pub async fn chat_offline(
    State(dispatcher): State<QueryDispatcher>,
    Json(request): Json<ChatRequest>,
) -> Json<ChatResponse> {
    let reply = dispatcher.offline_query(&request.message).await;
    Json(ChatResponse { reply: reply.text })
}
