use uuid::Uuid;

use crate::{
    contract::{Contract, ContractStatus, ContractView, Signature},
    storage::Storage,
    Error, Result,
};

/// A signature submission: signer identity, drawn ink, and the contract
/// body with placeholder fills already applied by the caller.
#[derive(Debug, Clone)]
pub struct SigningRequest {
    pub signer_name: String,
    pub signer_email: Option<String>,
    pub image_payload: String,
    /// Placeholder-filled body text to persist alongside the signature.
    /// None leaves the stored body untouched.
    pub filled_body: Option<String>,
}

impl SigningRequest {
    /// Fail fast before anything touches storage. A rejected request
    /// leaves no trace.
    pub fn validate(&self) -> Result<()> {
        if self.signer_name.trim().is_empty() {
            return Err(Error::EmptySignerName);
        }
        if payload_data(&self.image_payload).is_empty() {
            return Err(Error::EmptySignaturePayload);
        }
        Ok(())
    }
}

/// The payload may arrive with a data-URI prefix; an envelope with no data
/// behind it counts as empty.
fn payload_data(payload: &str) -> &str {
    payload
        .split_once("base64,")
        .map_or(payload, |(_, rest)| rest)
        .trim()
}

fn check_signable(contract: &Contract) -> Result<()> {
    if !contract.status.is_signable() {
        return Err(Error::NotSignable(contract.status.to_string()));
    }
    Ok(())
}

/// Record a signature on a contract and return the reconciled view.
///
/// Preconditions (signable status, non-empty name and ink) are checked
/// before any write. The filled body, the signature row, and the status
/// advance are committed in one transaction, then the whole view is
/// re-read from storage: callers render server truth, never a local
/// patch, and a failure leaves the contract untouched.
pub async fn sign_contract(
    storage: &Storage,
    contract_id: Uuid,
    request: SigningRequest,
) -> Result<ContractView> {
    request.validate()?;

    let mut contract = storage.get_contract(contract_id).await?;
    check_signable(&contract)?;

    if let Some(body) = request.filled_body {
        contract.body = body;
    }

    let mut signature = Signature::new(
        contract_id,
        request.signer_name.trim().to_string(),
        request.image_payload,
    );
    if let Some(email) = request.signer_email.filter(|e| !e.trim().is_empty()) {
        signature = signature.with_email(email);
    }
    storage
        .record_signing(&contract, &signature, ContractStatus::Signed)
        .await?;

    tracing::info!(contract = %contract_id, signer = %signature.signer_name, "contract signed");

    storage.fetch_contract_view(contract_id).await
}

/// Public signing path: resolve the contract by access code, then converge
/// on the same flow and view shape as the authenticated path.
pub async fn sign_by_access_code(
    storage: &Storage,
    code: &str,
    request: SigningRequest,
) -> Result<ContractView> {
    request.validate()?;
    let contract = storage.get_contract_by_access_code(code).await?;
    sign_contract(storage, contract.id, request).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::SignaturePad;
    use crate::contract::Contract;

    fn inked_payload() -> String {
        let mut pad = SignaturePad::default();
        pad.pointer_down(30.0, 40.0);
        pad.pointer_move(180.0, 90.0);
        pad.pointer_up();
        pad.payload().unwrap().to_string()
    }

    fn request(name: &str, payload: &str) -> SigningRequest {
        SigningRequest {
            signer_name: name.to_string(),
            signer_email: Some("signer@example.com".to_string()),
            image_payload: payload.to_string(),
            filled_body: None,
        }
    }

    async fn pending_contract(storage: &Storage) -> Contract {
        let contract = Contract::new(Uuid::new_v4(), "Lease".to_string(), "terms".to_string())
            .with_status(ContractStatus::Pending);
        storage.insert_contract(&contract).await.unwrap();
        contract
    }

    #[test]
    fn test_empty_name_rejected_locally() {
        assert!(matches!(
            request("   ", "payload").validate(),
            Err(Error::EmptySignerName)
        ));
    }

    #[test]
    fn test_empty_payload_rejected_locally() {
        assert!(matches!(
            request("Ava", "").validate(),
            Err(Error::EmptySignaturePayload)
        ));
        // A bare data-URI envelope with nothing behind it is still empty.
        assert!(matches!(
            request("Ava", "data:image/x-portable-graymap;base64,").validate(),
            Err(Error::EmptySignaturePayload)
        ));
    }

    #[tokio::test]
    async fn test_rejected_request_writes_nothing() {
        let storage = Storage::open_memory().await.unwrap();
        let contract = pending_contract(&storage).await;

        let err = sign_contract(&storage, contract.id, request("", &inked_payload())).await;
        assert!(err.is_err());

        let view = storage.fetch_contract_view(contract.id).await.unwrap();
        assert!(view.signatures.is_empty());
        assert_eq!(view.contract.status, ContractStatus::Pending);
    }

    #[tokio::test]
    async fn test_draft_contract_is_not_signable() {
        let storage = Storage::open_memory().await.unwrap();
        let contract = Contract::new(Uuid::new_v4(), "Lease".to_string(), "terms".to_string());
        storage.insert_contract(&contract).await.unwrap();

        let err = sign_contract(&storage, contract.id, request("Ava", &inked_payload())).await;
        assert!(matches!(err, Err(Error::NotSignable(_))));

        let view = storage.fetch_contract_view(contract.id).await.unwrap();
        assert!(view.signatures.is_empty());
    }

    #[tokio::test]
    async fn test_successful_sign_reconciles_from_storage() {
        let storage = Storage::open_memory().await.unwrap();
        let contract = pending_contract(&storage).await;

        let mut req = request("Ava", &inked_payload());
        req.filled_body = Some("terms, signed by Ava".to_string());

        let view = sign_contract(&storage, contract.id, req).await.unwrap();

        assert_eq!(view.contract.status, ContractStatus::Signed);
        assert_eq!(view.contract.body, "terms, signed by Ava");
        assert_eq!(view.signatures.len(), 1);
        assert_eq!(view.signatures[0].signer_name, "Ava");
        assert_eq!(
            view.signatures[0].signer_email.as_deref(),
            Some("signer@example.com")
        );

        // The returned view is exactly what a fresh read produces.
        let refetched = storage.fetch_contract_view(contract.id).await.unwrap();
        assert_eq!(refetched.signatures.len(), view.signatures.len());
        assert_eq!(refetched.contract.body, view.contract.body);
    }

    #[tokio::test]
    async fn test_sign_by_access_code_converges() {
        let storage = Storage::open_memory().await.unwrap();
        let contract = pending_contract(&storage).await;

        let view = sign_by_access_code(
            &storage,
            &contract.access_code,
            request("Anonymous Signer", &inked_payload()),
        )
        .await
        .unwrap();

        assert_eq!(view.contract.id, contract.id);
        assert_eq!(view.contract.status, ContractStatus::Signed);
        assert_eq!(view.signatures.len(), 1);
    }

    #[tokio::test]
    async fn test_unknown_access_code() {
        let storage = Storage::open_memory().await.unwrap();
        let err = sign_by_access_code(&storage, "nope1234", request("Ava", &inked_payload())).await;
        assert!(matches!(err, Err(Error::AccessCodeNotFound)));
    }
}
