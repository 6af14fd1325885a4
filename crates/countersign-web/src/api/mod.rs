mod contracts;
mod export;
mod session;
mod signing;

use axum::{http::StatusCode, Router};
use countersign_core::Error;

use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .nest("/contracts", contracts::router())
        .nest("/sign", signing::router())
        .nest("/session", session::router())
}

/// Map core errors onto HTTP status codes: validation 422, missing 404,
/// unsignable state 409, everything else 500.
pub(crate) fn error_response(e: Error) -> (StatusCode, String) {
    let status = match &e {
        Error::EmptySignerName
        | Error::EmptySignaturePayload
        | Error::MalformedPayload(_)
        | Error::InvalidContractStatus(_)
        | Error::InvalidSignatureStatus(_) => StatusCode::UNPROCESSABLE_ENTITY,
        Error::ContractNotFound(_) | Error::AccessCodeNotFound => StatusCode::NOT_FOUND,
        Error::NotSignable(_) | Error::StatusTransition { .. } => StatusCode::CONFLICT,
        Error::Database(_) | Error::Serialization(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, e.to_string())
}

#[cfg(test)]
mod tests {
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request, StatusCode};
    use axum::Router;
    use countersign_core::SignaturePad;
    use serde_json::{json, Value};
    use tower::ServiceExt;
    use uuid::Uuid;

    use crate::state::AppState;

    async fn app() -> (Router, String) {
        let state = AppState::in_memory().await.unwrap();
        let cookie = format!("countersign_session={}", Uuid::new_v4());
        let router = Router::new().nest("/api", super::router()).with_state(state);
        (router, cookie)
    }

    fn request(method: &str, uri: &str, cookie: &str, body: Option<Value>) -> Request<Body> {
        let builder = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::COOKIE, cookie);
        match body {
            Some(v) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(v.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        }
    }

    async fn json_body(response: axum::response::Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn inked_payload() -> String {
        let mut pad = SignaturePad::default();
        pad.pointer_down(20.0, 30.0);
        pad.pointer_move(150.0, 90.0);
        pad.pointer_up();
        pad.payload().unwrap().to_string()
    }

    async fn create_contract(router: &Router, cookie: &str, body: &str) -> Value {
        let response = router
            .clone()
            .oneshot(request(
                "POST",
                "/api/contracts",
                cookie,
                Some(json!({ "title": "Lease Agreement", "body": body })),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        json_body(response).await
    }

    #[tokio::test]
    async fn test_create_then_fetch_detail() {
        let (router, cookie) = app().await;
        let created = create_contract(&router, &cookie, "Name: ______ on (date)").await;
        let id = created["id"].as_str().unwrap();

        let response = router
            .clone()
            .oneshot(request("GET", &format!("/api/contracts/{id}"), &cookie, None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let detail = json_body(response).await;
        assert_eq!(detail["status"], "draft");
        assert_eq!(detail["signatures"].as_array().unwrap().len(), 0);
        assert!(detail["placeholders"].as_array().unwrap().len() >= 2);
    }

    #[tokio::test]
    async fn test_ownership_hides_foreign_contracts() {
        let (router, cookie) = app().await;
        let created = create_contract(&router, &cookie, "terms").await;
        let id = created["id"].as_str().unwrap();

        let stranger = format!("countersign_session={}", Uuid::new_v4());
        let response = router
            .clone()
            .oneshot(request("GET", &format!("/api/contracts/{id}"), &stranger, None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_draft_contract_rejects_signing() {
        let (router, cookie) = app().await;
        let created = create_contract(&router, &cookie, "terms").await;
        let id = created["id"].as_str().unwrap();

        let response = router
            .clone()
            .oneshot(request(
                "POST",
                &format!("/api/contracts/{id}/sign"),
                &cookie,
                Some(json!({
                    "signer_name": "Ava",
                    "image_payload": inked_payload(),
                })),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn test_public_signing_flow() {
        let (router, cookie) = app().await;
        let created = create_contract(&router, &cookie, "Signature: ______").await;
        let id = created["id"].as_str().unwrap();
        let code = created["access_code"].as_str().unwrap().to_string();

        let response = router
            .clone()
            .oneshot(request(
                "PUT",
                &format!("/api/contracts/{id}/status"),
                &cookie,
                Some(json!({ "status": "sent" })),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        // An anonymous session resolves the contract by code and signs.
        let anon = format!("countersign_session={}", Uuid::new_v4());
        let response = router
            .clone()
            .oneshot(request("GET", &format!("/api/sign/{code}"), &anon, None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = router
            .clone()
            .oneshot(request(
                "POST",
                &format!("/api/sign/{code}"),
                &anon,
                Some(json!({
                    "signer_name": "Ava Chen",
                    "signer_email": "ava@example.com",
                    "image_payload": inked_payload(),
                })),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let reconciled = json_body(response).await;
        assert_eq!(reconciled["status"], "signed");
        assert_eq!(reconciled["signatures"].as_array().unwrap().len(), 1);
        assert_eq!(reconciled["signatures"][0]["signer_name"], "Ava Chen");
    }

    #[tokio::test]
    async fn test_empty_signer_name_rejected() {
        let (router, cookie) = app().await;
        let created = create_contract(&router, &cookie, "terms").await;
        let id = created["id"].as_str().unwrap();

        router
            .clone()
            .oneshot(request(
                "PUT",
                &format!("/api/contracts/{id}/status"),
                &cookie,
                Some(json!({ "status": "pending" })),
            ))
            .await
            .unwrap();

        let response = router
            .clone()
            .oneshot(request(
                "POST",
                &format!("/api/contracts/{id}/sign"),
                &cookie,
                Some(json!({ "signer_name": "  ", "image_payload": inked_payload() })),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

        // Nothing was written.
        let detail = json_body(
            router
                .clone()
                .oneshot(request("GET", &format!("/api/contracts/{id}"), &cookie, None))
                .await
                .unwrap(),
        )
        .await;
        assert_eq!(detail["signatures"].as_array().unwrap().len(), 0);
    }

    #[tokio::test]
    async fn test_export_download_headers() {
        let (router, cookie) = app().await;
        let created = create_contract(&router, &cookie, "terms of the lease").await;
        let id = created["id"].as_str().unwrap();

        let response = router
            .clone()
            .oneshot(request(
                "GET",
                &format!("/api/contracts/{id}/export"),
                &cookie,
                None,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let disposition = response
            .headers()
            .get(header::CONTENT_DISPOSITION)
            .unwrap()
            .to_str()
            .unwrap()
            .to_string();
        assert!(disposition.contains("leaseagreement_signed_"));
    }

    #[tokio::test]
    async fn test_session_identity_round_trip() {
        let (router, cookie) = app().await;

        let response = router
            .clone()
            .oneshot(request(
                "PUT",
                "/api/session",
                &cookie,
                Some(json!({ "display_name": "Ava", "email": "ava@example.com" })),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let session = json_body(
            router
                .clone()
                .oneshot(request("GET", "/api/session", &cookie, None))
                .await
                .unwrap(),
        )
        .await;
        assert_eq!(session["identity"]["display_name"], "Ava");
    }
}
