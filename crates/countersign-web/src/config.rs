use serde::{Deserialize, Serialize};

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Allow anonymous signing through the access-code route.
    /// When false, only authenticated owners can submit signatures.
    #[serde(default = "default_true")]
    pub public_signing_enabled: bool,
}

fn default_true() -> bool {
    true
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            public_signing_enabled: true,
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> Self {
        Self {
            public_signing_enabled: std::env::var("COUNTERSIGN_PUBLIC_SIGNING")
                .map(|v| !(v == "0" || v.eq_ignore_ascii_case("false")))
                .unwrap_or(true),
        }
    }
}
