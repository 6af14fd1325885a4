use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Contract not found: {0}")]
    ContractNotFound(uuid::Uuid),

    #[error("No contract matches access code")]
    AccessCodeNotFound,

    #[error("Invalid contract status: {0}")]
    InvalidContractStatus(String),

    #[error("Invalid signature status: {0}")]
    InvalidSignatureStatus(String),

    #[error("Contract status cannot move from {from} to {to}")]
    StatusTransition { from: String, to: String },

    #[error("Contract is not signable in status {0}")]
    NotSignable(String),

    #[error("Signer name must not be empty")]
    EmptySignerName,

    #[error("Signature drawing is empty")]
    EmptySignaturePayload,

    #[error("Signature payload is not a valid image: {0}")]
    MalformedPayload(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
