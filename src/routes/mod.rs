// Route definitions

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

use crate::AppState;

mod api;
mod chat;

pub fn create_router(app_state: AppState) -> Router {
    let api_router = Router::new()
        .route("/listings", get(api::list_listings).post(api::create_listing))
        .route(
            "/listings/:id",
            get(api::get_listing)
                .put(api::update_listing)
                .delete(api::delete_listing),
        )
        .route("/chat", post(chat::chat))
        .with_state(app_state.clone());

    Router::new()
        .route("/health", get(|| async { "ok" }))
        .nest("/api", api_router)
        .layer(TraceLayer::new_for_http())
        .with_state(app_state)
}
