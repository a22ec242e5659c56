//! The entry route and the pages leading up to a usable library: plex.tv
//! pairing, then server and section selection. Every step ends by refreshing
//! back to `/`, which works out what is still missing.

use crate::api::middleware::MaybeSession;
use crate::api::AppState;
use crate::error::{AppError, Result};
use crate::models::SessionData;
use axum::{
    extract::{Path, State},
    response::{Html, IntoResponse, Response},
    routing::get,
    Router,
};
use std::sync::Arc;

pub fn entry_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(entry_page))
        .route("/select_server/:name", get(select_server))
        .route("/select_section/:key", get(select_section))
}

/// A page that immediately reloads, optionally somewhere else.
pub fn refresh(url: Option<&str>) -> Response {
    let target = url.map(|u| format!(";url={}", escape_html(u))).unwrap_or_default();
    Html(format!(r#"<meta http-equiv="refresh" content="0{}" />"#, target)).into_response()
}

async fn entry_page(
    State(state): State<Arc<AppState>>,
    MaybeSession(session): MaybeSession,
) -> Result<Response> {
    // The cookie is set on this response; the reload will carry it.
    let Some((token, mut session)) = session else {
        return Ok(refresh(None));
    };

    let Some(auth_token) = session.auth_token.clone() else {
        return pair(&state, &token, session).await;
    };

    if session.servers.is_none() {
        session.servers = Some(state.plex.list_servers(&auth_token).await?);
        state.sessions.save(&token, session.clone()).await;
    }

    let Some(server) = session.current_server.clone() else {
        let links: Vec<String> = session
            .servers
            .iter()
            .flatten()
            .map(|s| link(&format!("/select_server/{}", urlencoding::encode(&s.name)), &s.name))
            .collect();
        return Ok(page("Choose a server", &links));
    };

    let Some(section) = session.current_section.clone() else {
        let sections = state.plex.list_sections(&server, &auth_token).await?;
        let links: Vec<String> = sections
            .iter()
            .map(|s| link(&format!("/select_section/{}", urlencoding::encode(&s.key)), &s.title))
            .collect();
        return Ok(page(&format!("Choose a library on {}", server.name), &links));
    };

    Ok(page(
        &format!("Ready: {} on {}", section.title, server.name),
        &[link("/list", "Library listing")],
    ))
}

async fn pair(state: &AppState, token: &str, mut session: SessionData) -> Result<Response> {
    let pairing = match session.pairing.clone() {
        Some(pairing) => pairing,
        None => {
            let pairing = state.plex.start_pairing().await?;
            session.pairing = Some(pairing.clone());
            state.sessions.save(token, session.clone()).await;
            pairing
        }
    };

    match state.plex.finish_pairing(&pairing).await? {
        Some(auth_token) => {
            tracing::info!("Pairing {} claimed", pairing.id);
            session.auth_token = Some(auth_token);
            session.pairing = None;
            state.sessions.save(token, session).await;
            Ok(refresh(None))
        }
        None => Ok(Html(format!(
            r#"<p>
    Please visit <a href="https://www.plex.tv/link/">plex.tv/link</a> to pair.
    Use the following code: <code>{}</code>
</p>
<p>
    Refresh this page when you're done.
</p>"#,
            escape_html(&pairing.pin)
        ))
        .into_response()),
    }
}

async fn select_server(
    State(state): State<Arc<AppState>>,
    MaybeSession(session): MaybeSession,
    Path(name): Path<String>,
) -> Result<Response> {
    let Some((token, mut session)) = session else {
        return Ok(refresh(Some("/")));
    };
    let Some(auth_token) = session.auth_token.clone() else {
        return Ok(refresh(Some("/")));
    };

    if session.servers.is_none() {
        session.servers = Some(state.plex.list_servers(&auth_token).await?);
    }

    let server = session
        .servers
        .iter()
        .flatten()
        .find(|s| s.name == name)
        .cloned()
        .ok_or_else(|| AppError::NotFound(format!("No server named '{}'", name)))?;

    tracing::info!("Selected server {} ({})", server.name, server.url());
    session.current_server = Some(server);
    session.current_section = None;
    state.sessions.save(&token, session).await;

    Ok(refresh(Some("/")))
}

async fn select_section(
    State(state): State<Arc<AppState>>,
    MaybeSession(session): MaybeSession,
    Path(key): Path<String>,
) -> Result<Response> {
    let Some((token, mut session)) = session else {
        return Ok(refresh(Some("/")));
    };
    let (Some(auth_token), Some(server)) = (session.auth_token.clone(), session.current_server.clone()) else {
        return Ok(refresh(Some("/")));
    };

    let section = state
        .plex
        .list_sections(&server, &auth_token)
        .await?
        .into_iter()
        .find(|s| s.key == key)
        .ok_or_else(|| AppError::NotFound(format!("No library section '{}'", key)))?;

    tracing::info!("Selected section {} on {}", section.title, server.name);
    session.current_section = Some(section);
    state.sessions.save(&token, session).await;

    Ok(refresh(Some("/")))
}

fn page(title: &str, lines: &[String]) -> Response {
    let items: String = lines.iter().map(|l| format!("<li>{}</li>", l)).collect();
    Html(format!(
        "<h1>{}</h1>\n<ul>{}</ul>",
        escape_html(title),
        items
    ))
    .into_response()
}

fn link(href: &str, text: &str) -> String {
    format!(r#"<a href="{}">{}</a>"#, escape_html(href), escape_html(text))
}

fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
