use crate::api::middleware::RequireLibrary;
use crate::api::AppState;
use crate::error::Result;
use crate::models::Item;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Redirect,
    routing::get,
    Json, Router,
};
use std::sync::Arc;

pub fn library_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/list", get(list_items))
        .route("/session", get(check_session))
        .route("/plex_asset/*path", get(plex_asset))
}

async fn list_items(
    State(state): State<Arc<AppState>>,
    RequireLibrary(access): RequireLibrary,
) -> Result<Json<Vec<Item>>> {
    let items = state.plex.section_items(&access).await?;
    tracing::info!(
        "Listed {} items from '{}' on {}",
        items.len(),
        access.section.title,
        access.server.name
    );
    Ok(Json(items))
}

/// 204 when the session can list the library; the extractor answers 401
/// otherwise.
async fn check_session(RequireLibrary(_): RequireLibrary) -> StatusCode {
    StatusCode::NO_CONTENT
}

async fn plex_asset(
    State(state): State<Arc<AppState>>,
    RequireLibrary(access): RequireLibrary,
    Path(path): Path<String>,
) -> Redirect {
    Redirect::temporary(&state.plex.asset_url(&access.server, &access.token, &path))
}
