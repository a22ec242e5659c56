use crate::api::AppState;
use crate::error::{AppError, Result};
use crate::models::{LibraryAccess, SessionData};
use crate::services::SessionStore;
use axum::{
    async_trait,
    extract::{FromRequestParts, Request},
    http::{header, request::Parts, HeaderMap, HeaderValue},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;

pub const SESSION_COOKIE: &str = "session";

/// Value of the `session` cookie, if the request carries one.
pub fn session_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, value)| value.to_string())
        .filter(|value| !value.is_empty())
}

/// Hand out a session cookie to any client that arrived without one.
pub async fn set_cookie_if_unset(request: Request, next: Next) -> Response {
    let had_cookie = session_token(request.headers()).is_some();
    let mut response = next.run(request).await;

    if !had_cookie {
        let cookie = format!(
            "{}={}; Path=/; HttpOnly; SameSite=Lax",
            SESSION_COOKIE,
            SessionStore::new_token()
        );
        match HeaderValue::from_str(&cookie) {
            Ok(value) => {
                response.headers_mut().append(header::SET_COOKIE, value);
            }
            Err(e) => tracing::error!("Failed to build session cookie: {}", e),
        }
    }

    response
}

/// The caller's session, or `None` when no cookie was sent yet.
pub struct MaybeSession(pub Option<(String, SessionData)>);

#[async_trait]
impl FromRequestParts<Arc<AppState>> for MaybeSession {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &Arc<AppState>) -> Result<Self> {
        let Some(token) = session_token(&parts.headers) else {
            return Ok(MaybeSession(None));
        };
        let session = state.sessions.get(&token).await;
        Ok(MaybeSession(Some((token, session))))
    }
}

/// A session that has finished pairing and picked a server and section.
pub struct RequireLibrary(pub LibraryAccess);

#[async_trait]
impl FromRequestParts<Arc<AppState>> for RequireLibrary {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &Arc<AppState>) -> Result<Self> {
        let MaybeSession(session) = MaybeSession::from_request_parts(parts, state).await?;

        session
            .and_then(|(_, session)| session.library_access())
            .map(RequireLibrary)
            .ok_or(AppError::Unauthorized)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_token_parsing() {
        let mut headers = HeaderMap::new();
        assert_eq!(session_token(&headers), None);

        headers.insert(header::COOKIE, HeaderValue::from_static("theme=dark; session=abc123"));
        assert_eq!(session_token(&headers).as_deref(), Some("abc123"));

        headers.insert(header::COOKIE, HeaderValue::from_static("sessionx=1; session="));
        assert_eq!(session_token(&headers), None);
    }
}
