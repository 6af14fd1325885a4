use axum::{
    extract::FromRequestParts,
    http::{request::Parts, StatusCode},
};
use axum_extra::extract::CookieJar;
use uuid::Uuid;

use crate::state::{AppState, SessionId};

const SESSION_COOKIE_NAME: &str = "countersign_session";

/// Extractor that provides the session ID from cookies
///
/// Creates a session profile if one doesn't exist. The session id is also
/// the owner account id for contracts created through it.
pub struct SessionToken(pub SessionId);

impl FromRequestParts<AppState> for SessionToken {
    type Rejection = (StatusCode, &'static str);

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let jar = CookieJar::from_request_parts(parts, state)
            .await
            .map_err(|_| (StatusCode::INTERNAL_SERVER_ERROR, "Failed to read cookies"))?;

        let session_id = if let Some(cookie) = jar.get(SESSION_COOKIE_NAME) {
            cookie
                .value()
                .parse::<Uuid>()
                .unwrap_or_else(|_| Uuid::new_v4())
        } else {
            Uuid::new_v4()
        };

        {
            let mut sessions = state.sessions.write().await;
            sessions.get_or_create(session_id);
        }

        Ok(SessionToken(session_id))
    }
}

/// Cookie to set on response for new sessions
pub fn session_cookie(session_id: SessionId) -> axum_extra::extract::cookie::Cookie<'static> {
    axum_extra::extract::cookie::Cookie::build((SESSION_COOKIE_NAME, session_id.to_string()))
        .path("/")
        .http_only(true)
        .same_site(axum_extra::extract::cookie::SameSite::Strict)
        .build()
}
