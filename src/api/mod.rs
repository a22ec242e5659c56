pub mod entry;
pub mod library;
pub mod middleware;

pub use entry::entry_routes;
pub use library::library_routes;

use crate::services::{PlexClient, SessionStore};
use axum::Router;
use std::sync::Arc;
use tower_http::{compression::CompressionLayer, trace::TraceLayer};

pub struct AppState {
    pub sessions: SessionStore,
    pub plex: Arc<PlexClient>,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .merge(entry_routes())
        .merge(library_routes())
        .with_state(state)
        // Middleware
        .layer(axum::middleware::from_fn(middleware::set_cookie_if_unset))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
}
