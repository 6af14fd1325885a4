use serde::{Deserialize, Serialize};

/// Identity of the person viewing a contract, as supplied by the session
/// layer. Anonymous access-code viewers have no identity at all, which is
/// why suggestion lookups go through [`SignerIdentity::suggested_name`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SignerIdentity {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

impl SignerIdentity {
    #[must_use]
    pub fn new(display_name: Option<String>, email: Option<String>) -> Self {
        Self {
            display_name,
            email,
        }
    }

    /// Display name if set, falling back to the email address.
    #[must_use]
    pub fn suggested_name(&self) -> Option<&str> {
        self.display_name
            .as_deref()
            .filter(|n| !n.trim().is_empty())
            .or(self.email.as_deref())
    }

    #[must_use]
    pub fn is_anonymous(&self) -> bool {
        self.suggested_name().is_none()
    }
}
