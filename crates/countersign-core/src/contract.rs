use chrono::{DateTime, Utc};
use rand::{distr::Alphanumeric, Rng};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Length of the public access code printed on signing links.
pub const ACCESS_CODE_LEN: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContractStatus {
    Draft,
    Pending,
    Sent,
    Signed,
    Expired,
    Cancelled,
}

impl ContractStatus {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Pending => "pending",
            Self::Sent => "sent",
            Self::Signed => "signed",
            Self::Expired => "expired",
            Self::Cancelled => "cancelled",
        }
    }

    /// Only contracts awaiting counterparties accept signatures.
    #[must_use]
    pub fn is_signable(&self) -> bool {
        matches!(self, Self::Pending | Self::Sent)
    }

    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Signed | Self::Expired | Self::Cancelled)
    }

    /// Lifecycle only moves forward: draft -> pending -> sent -> signed,
    /// with expiry from the signable states and cancellation from any
    /// non-terminal state. Nothing ever rolls back.
    #[must_use]
    pub fn can_transition_to(&self, next: Self) -> bool {
        if *self == next {
            return false;
        }
        match (self, next) {
            (Self::Draft, Self::Pending | Self::Sent | Self::Cancelled) => true,
            (Self::Pending, Self::Sent | Self::Signed | Self::Expired | Self::Cancelled) => true,
            (Self::Sent, Self::Signed | Self::Expired | Self::Cancelled) => true,
            _ => false,
        }
    }
}

impl std::fmt::Display for ContractStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ContractStatus {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(Self::Draft),
            "pending" => Ok(Self::Pending),
            "sent" => Ok(Self::Sent),
            "signed" => Ok(Self::Signed),
            "expired" => Ok(Self::Expired),
            "cancelled" => Ok(Self::Cancelled),
            _ => Err(crate::Error::InvalidContractStatus(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignatureStatus {
    Pending,
    Signed,
}

impl SignatureStatus {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Signed => "signed",
        }
    }
}

impl std::fmt::Display for SignatureStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for SignatureStatus {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "signed" => Ok(Self::Signed),
            _ => Err(crate::Error::InvalidSignatureStatus(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Contract {
    pub id: Uuid,
    pub owner: Uuid,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    pub body: String,
    pub status: ContractStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_url: Option<String>,
    pub access_code: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Contract {
    #[must_use]
    pub fn new(owner: Uuid, title: String, body: String) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::now_v7(),
            owner,
            title,
            category: None,
            body,
            status: ContractStatus::Draft,
            file_url: None,
            access_code: generate_access_code(),
            created_at: now,
            updated_at: now,
        }
    }

    #[must_use]
    pub fn with_category(mut self, category: String) -> Self {
        self.category = Some(category);
        self
    }

    #[must_use]
    pub fn with_file_url(mut self, file_url: String) -> Self {
        self.file_url = Some(file_url);
        self
    }

    #[must_use]
    pub fn with_status(mut self, status: ContractStatus) -> Self {
        self.status = status;
        self
    }
}

/// 8-character alphanumeric code for the public signing route.
#[must_use]
pub fn generate_access_code() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(ACCESS_CODE_LEN)
        .map(char::from)
        .collect()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Signature {
    pub id: Uuid,
    pub contract_id: Uuid,
    pub signer_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signer_email: Option<String>,
    pub image_payload: String,
    pub status: SignatureStatus,
    pub signed_at: DateTime<Utc>,
}

impl Signature {
    #[must_use]
    pub fn new(contract_id: Uuid, signer_name: String, image_payload: String) -> Self {
        Self {
            id: Uuid::now_v7(),
            contract_id,
            signer_name,
            signer_email: None,
            image_payload,
            status: SignatureStatus::Signed,
            signed_at: Utc::now(),
        }
    }

    #[must_use]
    pub fn with_email(mut self, email: String) -> Self {
        self.signer_email = Some(email);
        self
    }
}

/// Contract plus its signature list, in signing order.
///
/// Both fetch routes (owner lookup and access-code lookup) return this
/// shape, and every mutation re-reads it from storage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContractView {
    pub contract: Contract,
    pub signatures: Vec<Signature>,
}
