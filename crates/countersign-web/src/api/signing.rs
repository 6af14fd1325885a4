use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use countersign_core::{sign_by_access_code, sign_contract, SigningRequest};
use serde::Deserialize;
use uuid::Uuid;

use super::{contracts::ContractDetailResponse, error_response};
use crate::session::SessionToken;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/{code}", get(fetch_by_code).post(submit_by_code))
}

#[derive(Debug, Deserialize)]
pub struct SubmitSignatureRequest {
    pub signer_name: String,
    pub signer_email: Option<String>,
    pub image_payload: String,
    /// Contract body with placeholder fills applied, computed by the
    /// signing page before submission.
    pub filled_body: Option<String>,
}

impl From<SubmitSignatureRequest> for SigningRequest {
    fn from(req: SubmitSignatureRequest) -> Self {
        Self {
            signer_name: req.signer_name,
            signer_email: req.signer_email,
            image_payload: req.image_payload,
            filled_body: req.filled_body,
        }
    }
}

/// Public fetch: resolve a contract by its 8-character access code. Same
/// response shape as the authenticated fetch.
async fn fetch_by_code(
    State(state): State<AppState>,
    session: SessionToken,
    Path(code): Path<String>,
) -> Result<Json<ContractDetailResponse>, (StatusCode, String)> {
    let view = state
        .storage
        .fetch_view_by_access_code(&code)
        .await
        .map_err(error_response)?;

    let identity = state.sessions.read().await.identity(session.0);
    Ok(Json(ContractDetailResponse::build(view, &identity)))
}

/// Public signature submission through an access code.
async fn submit_by_code(
    State(state): State<AppState>,
    session: SessionToken,
    Path(code): Path<String>,
    Json(req): Json<SubmitSignatureRequest>,
) -> Result<Json<ContractDetailResponse>, (StatusCode, String)> {
    if !state.config.public_signing_enabled {
        return Err((
            StatusCode::FORBIDDEN,
            "Public signing is disabled on this server".to_string(),
        ));
    }

    let view = sign_by_access_code(&state.storage, &code, req.into())
        .await
        .map_err(error_response)?;

    let identity = state.sessions.read().await.identity(session.0);
    Ok(Json(ContractDetailResponse::build(view, &identity)))
}

/// Authenticated submission against an owned contract; wired under
/// `/contracts/{id}/sign`.
pub async fn sign_owned(
    State(state): State<AppState>,
    session: SessionToken,
    Path(id): Path<Uuid>,
    Json(req): Json<SubmitSignatureRequest>,
) -> Result<Json<ContractDetailResponse>, (StatusCode, String)> {
    state
        .storage
        .get_owned_contract(session.0, id)
        .await
        .map_err(error_response)?;

    let view = sign_contract(&state.storage, id, req.into())
        .await
        .map_err(error_response)?;

    let identity = state.sessions.read().await.identity(session.0);
    Ok(Json(ContractDetailResponse::build(view, &identity)))
}
