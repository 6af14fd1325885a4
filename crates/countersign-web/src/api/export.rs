use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::IntoResponse,
};
use countersign_core::Exporter;
use uuid::Uuid;

use super::error_response;
use crate::session::SessionToken;
use crate::state::AppState;

/// Download the assembled document for an owned contract. Wired under
/// `/contracts/{id}/export`.
pub async fn download(
    State(state): State<AppState>,
    session: SessionToken,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let view = state
        .storage
        .fetch_owned_view(session.0, id)
        .await
        .map_err(error_response)?;

    let doc = Exporter::default().export(&view);
    let disposition = format!("attachment; filename=\"{}\"", doc.filename);

    Ok((
        [
            (header::CONTENT_TYPE, "text/plain; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        doc.into_bytes(),
    ))
}
