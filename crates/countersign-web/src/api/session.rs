use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use axum_extra::extract::CookieJar;
use countersign_core::SignerIdentity;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::session::{session_cookie, SessionToken};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/", get(get_session).put(set_identity).delete(end_session))
}

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub session_id: Uuid,
    pub identity: SignerIdentity,
}

async fn get_session(
    State(state): State<AppState>,
    session: SessionToken,
    jar: CookieJar,
) -> impl IntoResponse {
    let identity = state.sessions.read().await.identity(session.0);

    let response = SessionResponse {
        session_id: session.0,
        identity,
    };

    // Ensure session cookie is set
    let jar = jar.add(session_cookie(session.0));

    (jar, Json(response))
}

#[derive(Debug, Deserialize)]
pub struct SetIdentityRequest {
    pub display_name: Option<String>,
    pub email: Option<String>,
}

async fn set_identity(
    State(state): State<AppState>,
    session: SessionToken,
    jar: CookieJar,
    Json(req): Json<SetIdentityRequest>,
) -> impl IntoResponse {
    let identity = SignerIdentity::new(req.display_name, req.email);
    state
        .sessions
        .write()
        .await
        .set_identity(session.0, identity.clone());

    let jar = jar.add(session_cookie(session.0));

    (
        jar,
        Json(SessionResponse {
            session_id: session.0,
            identity,
        }),
    )
}

/// Logout: tear down the session's identity profile.
async fn end_session(State(state): State<AppState>, session: SessionToken) -> StatusCode {
    state.sessions.write().await.remove(session.0);
    StatusCode::NO_CONTENT
}
