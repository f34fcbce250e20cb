// Chat endpoint

use axum::{extract::State, response::Json};
use serde::Deserialize;

use crate::{
    chat::{self, ChatReply},
    error::{AppError, AppResult},
    AppState,
};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    message: String,
    #[serde(default)]
    show_all: bool,
}

pub async fn chat(
    State(app_state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> AppResult<Json<ChatReply>> {
    tracing::info!("[HANDLER] POST /api/chat - {:?}", request.message);
    if request.message.trim().is_empty() {
        return Err(AppError::BadRequest("Message is required".to_string()));
    }

    let working_set = app_state.gateway.working_set().await?;
    let reply = chat::answer(
        &request.message,
        &working_set,
        app_state.settings.chat_preview_limit,
        request.show_all,
    );
    tracing::info!(total = reply.total, shown = reply.listings.len(), "Chat reply ready");
    Ok(Json(reply))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::MemoryStore;
    use axum::http::StatusCode;
    use std::sync::Arc;

    fn request(message: &str, show_all: bool) -> Json<ChatRequest> {
        Json(ChatRequest { message: message.to_string(), show_all })
    }

    #[tokio::test]
    async fn replies_with_newest_matches_first() {
        let state = AppState::for_tests(Arc::new(MemoryStore::sample()));
        let Json(reply) = chat(State(state), request("ford f-150 with a sunroof", false))
            .await
            .unwrap();

        let ids: Vec<&str> = reply.listings.iter().map(|l| l.listing.id.as_str()).collect();
        assert_eq!(ids, vec!["3", "4"]);
        assert_eq!(reply.total, 2);
        assert!(reply.reply.starts_with("I found 2 cars matching: Ford F-150"));
    }

    #[tokio::test]
    async fn preview_limit_comes_from_settings() {
        let state = AppState::for_tests(Arc::new(MemoryStore::sample()));
        let Json(preview) = chat(State(state.clone()), request("show me everything", false))
            .await
            .unwrap();
        assert_eq!(preview.listings.len(), state.settings.chat_preview_limit);
        assert!(preview.show_more);

        let Json(all) = chat(State(state), request("show me everything", true)).await.unwrap();
        assert_eq!(all.listings.len(), all.total);
        assert!(!all.show_more);
    }

    #[tokio::test]
    async fn blank_message_is_rejected() {
        let state = AppState::for_tests(Arc::new(MemoryStore::sample()));
        let err = chat(State(state), request("   ", false)).await.unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn store_outage_is_reported() {
        let store = Arc::new(MemoryStore::sample());
        store.set_failing(true);
        let err = chat(State(AppState::for_tests(store)), request("trucks", false))
            .await
            .unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_GATEWAY);
    }
}
