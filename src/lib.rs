// Listing search service: free-text and structured filtering over a
// PostgREST-backed listing store, exposed over HTTP.

use std::sync::Arc;

use axum::extract::FromRef;

pub mod chat;
pub mod config;
pub mod error;
pub mod filter;
pub mod gateway;
pub mod models;
pub mod query_parser;
pub mod quick_filter;
pub mod routes;
pub mod store;

use crate::config::Settings;
use crate::gateway::ListingQueryGateway;

// Shared state handed to every handler
#[derive(Clone, FromRef)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub gateway: Arc<ListingQueryGateway>,
}

impl AppState {
    pub fn new(settings: Settings, store: Arc<dyn store::ListingStore>) -> Self {
        AppState {
            settings: Arc::new(settings),
            gateway: Arc::new(ListingQueryGateway::new(store)),
        }
    }
}

#[cfg(test)]
impl AppState {
    pub fn for_tests(store: Arc<dyn store::ListingStore>) -> Self {
        AppState::new(Settings::for_tests(), store)
    }
}
