use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use countersign_core::{
    scan, Contract, ContractStatus, ContractView, Paginator, Placeholder, Signature,
    SignerIdentity,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{error_response, export, signing};
use crate::session::SessionToken;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_contracts).post(create_contract))
        .route(
            "/{id}",
            get(get_contract).put(update_contract).delete(delete_contract),
        )
        .route("/{id}/status", put(update_status))
        .route("/{id}/pages/{page}", get(get_page))
        .route("/{id}/sign", post(signing::sign_owned))
        .route("/{id}/export", get(export::download))
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    status: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ContractResponse {
    pub id: Uuid,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    pub body: String,
    pub status: ContractStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_url: Option<String>,
    pub access_code: String,
    pub created_at: String,
    pub updated_at: String,
}

impl From<Contract> for ContractResponse {
    fn from(c: Contract) -> Self {
        Self {
            id: c.id,
            title: c.title,
            category: c.category,
            body: c.body,
            status: c.status,
            file_url: c.file_url,
            access_code: c.access_code,
            created_at: c.created_at.to_rfc3339(),
            updated_at: c.updated_at.to_rfc3339(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SignatureResponse {
    pub id: Uuid,
    pub signer_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signer_email: Option<String>,
    pub image_payload: String,
    pub status: String,
    pub signed_at: String,
}

impl From<Signature> for SignatureResponse {
    fn from(s: Signature) -> Self {
        Self {
            id: s.id,
            signer_name: s.signer_name,
            signer_email: s.signer_email,
            image_payload: s.image_payload,
            status: s.status.to_string(),
            signed_at: s.signed_at.to_rfc3339(),
        }
    }
}

/// Full detail for the signing page: contract, authoritative signature
/// list, freshly scanned placeholders, and the page count.
#[derive(Debug, Serialize)]
pub struct ContractDetailResponse {
    #[serde(flatten)]
    pub contract: ContractResponse,
    pub signatures: Vec<SignatureResponse>,
    pub placeholders: Vec<Placeholder>,
    pub page_count: usize,
}

impl ContractDetailResponse {
    pub fn build(view: ContractView, identity: &SignerIdentity) -> Self {
        let paginator = Paginator::default();
        let placeholders = scan(&view.contract.body, identity);
        let page_count =
            paginator.total_page_count(&view.contract.body, view.signatures.len());
        Self {
            contract: view.contract.into(),
            signatures: view.signatures.into_iter().map(Into::into).collect(),
            placeholders,
            page_count,
        }
    }
}

async fn list_contracts(
    State(state): State<AppState>,
    session: SessionToken,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<ContractResponse>>, (StatusCode, String)> {
    let status = query
        .status
        .map(|s| s.parse::<ContractStatus>())
        .transpose()
        .map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))?;

    let contracts = state
        .storage
        .list_contracts(session.0, status)
        .await
        .map_err(error_response)?;

    Ok(Json(contracts.into_iter().map(Into::into).collect()))
}

#[derive(Debug, Deserialize)]
pub struct CreateContractRequest {
    pub title: String,
    pub category: Option<String>,
    pub body: String,
    pub file_url: Option<String>,
}

async fn create_contract(
    State(state): State<AppState>,
    session: SessionToken,
    Json(req): Json<CreateContractRequest>,
) -> Result<(StatusCode, Json<ContractResponse>), (StatusCode, String)> {
    if req.title.trim().is_empty() {
        return Err((
            StatusCode::UNPROCESSABLE_ENTITY,
            "Contract title must not be empty".to_string(),
        ));
    }

    let mut contract = Contract::new(session.0, req.title, req.body);
    if let Some(category) = req.category {
        contract = contract.with_category(category);
    }
    if let Some(file_url) = req.file_url {
        contract = contract.with_file_url(file_url);
    }

    state
        .storage
        .insert_contract(&contract)
        .await
        .map_err(error_response)?;

    Ok((StatusCode::CREATED, Json(contract.into())))
}

async fn get_contract(
    State(state): State<AppState>,
    session: SessionToken,
    Path(id): Path<Uuid>,
) -> Result<Json<ContractDetailResponse>, (StatusCode, String)> {
    let view = state
        .storage
        .fetch_owned_view(session.0, id)
        .await
        .map_err(error_response)?;

    let identity = state.sessions.read().await.identity(session.0);
    Ok(Json(ContractDetailResponse::build(view, &identity)))
}

#[derive(Debug, Deserialize)]
pub struct UpdateContractRequest {
    pub title: Option<String>,
    pub category: Option<String>,
    pub body: Option<String>,
    pub file_url: Option<String>,
}

async fn update_contract(
    State(state): State<AppState>,
    session: SessionToken,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateContractRequest>,
) -> Result<Json<ContractDetailResponse>, (StatusCode, String)> {
    let mut contract = state
        .storage
        .get_owned_contract(session.0, id)
        .await
        .map_err(error_response)?;

    if let Some(title) = req.title {
        contract.title = title;
    }
    if let Some(category) = req.category {
        contract.category = Some(category);
    }
    if let Some(body) = req.body {
        contract.body = body;
    }
    if let Some(file_url) = req.file_url {
        contract.file_url = Some(file_url);
    }

    state
        .storage
        .update_contract(&contract)
        .await
        .map_err(error_response)?;

    // Placeholders are rescanned from the updated body on the re-read;
    // nothing stale survives the edit.
    let view = state
        .storage
        .fetch_owned_view(session.0, id)
        .await
        .map_err(error_response)?;
    let identity = state.sessions.read().await.identity(session.0);
    Ok(Json(ContractDetailResponse::build(view, &identity)))
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: String,
}

async fn update_status(
    State(state): State<AppState>,
    session: SessionToken,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateStatusRequest>,
) -> Result<Json<ContractResponse>, (StatusCode, String)> {
    let status = req
        .status
        .parse::<ContractStatus>()
        .map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))?;

    // Ownership gate before the transition.
    state
        .storage
        .get_owned_contract(session.0, id)
        .await
        .map_err(error_response)?;

    let contract = state
        .storage
        .update_status(id, status)
        .await
        .map_err(error_response)?;

    Ok(Json(contract.into()))
}

async fn delete_contract(
    State(state): State<AppState>,
    session: SessionToken,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, (StatusCode, String)> {
    state
        .storage
        .get_owned_contract(session.0, id)
        .await
        .map_err(error_response)?;

    state
        .storage
        .delete_contract(id)
        .await
        .map_err(error_response)?;

    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Serialize)]
pub struct PageResponse {
    pub page: usize,
    pub total_pages: usize,
    pub text: String,
    /// True for the synthesized trailing signature page.
    pub signature_page: bool,
}

async fn get_page(
    State(state): State<AppState>,
    session: SessionToken,
    Path((id, page)): Path<(Uuid, usize)>,
) -> Result<Json<PageResponse>, (StatusCode, String)> {
    let view = state
        .storage
        .fetch_owned_view(session.0, id)
        .await
        .map_err(error_response)?;

    let paginator = Paginator::default();
    let content_pages = paginator.content_page_count(&view.contract.body);
    let total_pages = paginator.total_page_count(&view.contract.body, view.signatures.len());

    let (text, signature_page) = if page >= 1 && page <= content_pages {
        (
            paginator
                .page_text(&view.contract.body, page)
                .unwrap_or_default()
                .to_string(),
            false,
        )
    } else if page == content_pages + 1 && !view.signatures.is_empty() {
        (paginator.signature_page(&view, chrono::Utc::now()), true)
    } else {
        return Err((
            StatusCode::NOT_FOUND,
            format!("Page {page} out of range (1..={total_pages})"),
        ));
    };

    Ok(Json(PageResponse {
        page,
        total_pages,
        text,
        signature_page,
    }))
}
