use std::collections::HashMap;
use std::sync::Arc;

use countersign_core::{SignerIdentity, Storage};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::config::ServerConfig;

/// Unique identifier for a session. Doubles as the account id owning
/// contracts created within it.
pub type SessionId = Uuid;

/// Tracks each session's signer identity profile.
///
/// Identity is an explicitly passed handle rather than ambient state: it
/// lives here for the session's lifetime and is injected into handlers
/// through the session extractor.
pub struct SessionManager {
    identities: HashMap<SessionId, SignerIdentity>,
}

impl SessionManager {
    pub fn new() -> Self {
        Self {
            identities: HashMap::new(),
        }
    }

    /// Get or create the identity profile for a session.
    pub fn get_or_create(&mut self, session_id: SessionId) -> &SignerIdentity {
        self.identities.entry(session_id).or_default()
    }

    pub fn identity(&self, session_id: SessionId) -> SignerIdentity {
        self.identities.get(&session_id).cloned().unwrap_or_default()
    }

    pub fn set_identity(&mut self, session_id: SessionId, identity: SignerIdentity) {
        self.identities.insert(session_id, identity);
    }

    /// Drop a session's profile at logout.
    pub fn remove(&mut self, session_id: SessionId) {
        self.identities.remove(&session_id);
    }
}

impl Default for SessionManager {
    fn default() -> Self {
        Self::new()
    }
}

/// Application state shared across all requests
#[derive(Clone)]
pub struct AppState {
    pub storage: Arc<Storage>,
    pub sessions: Arc<RwLock<SessionManager>>,
    pub config: ServerConfig,
}

impl AppState {
    pub async fn new(db_path: &str) -> anyhow::Result<Self> {
        Ok(Self {
            storage: Arc::new(Storage::open(db_path).await?),
            sessions: Arc::new(RwLock::new(SessionManager::new())),
            config: ServerConfig::from_env(),
        })
    }

    #[cfg(test)]
    pub async fn in_memory() -> anyhow::Result<Self> {
        Ok(Self {
            storage: Arc::new(Storage::open_memory().await?),
            sessions: Arc::new(RwLock::new(SessionManager::new())),
            config: ServerConfig::default(),
        })
    }
}
