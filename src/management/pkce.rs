use crate::{
    error::StorageError,
    management::storage::{ContextId, StorageArea},
    types::PkceParams,
    warning,
};

pub const VERIFIER_KEY: &str = "spotify_code_verifier";
pub const STATE_KEY: &str = "spotify_state";

/// What survived the redirect round trip. Either half may be missing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoredPkce {
    pub verifier: Option<String>,
    pub state: Option<String>,
}

/// Session-scoped storage of the PKCE verifier and state of the pending
/// login attempt.
#[derive(Clone)]
pub struct PkceStore {
    area: StorageArea,
    context: ContextId,
}

impl PkceStore {
    pub fn new(area: StorageArea) -> Self {
        Self {
            area,
            context: ContextId::next(),
        }
    }

    /// Overwrites whatever a previous attempt stored.
    pub async fn save(&self, params: &PkceParams) -> Result<(), StorageError> {
        self.area
            .set(self.context, VERIFIER_KEY, &params.verifier)
            .await?;
        self.area.set(self.context, STATE_KEY, &params.state).await
    }

    pub async fn load(&self) -> StoredPkce {
        let verifier = self.read(VERIFIER_KEY).await;
        let state = self.read(STATE_KEY).await;
        StoredPkce { verifier, state }
    }

    async fn read(&self, key: &str) -> Option<String> {
        match self.area.get(key).await {
            Ok(value) => value.filter(|v| !v.is_empty()),
            Err(e) => {
                warning!("Cannot read login parameters: {}", e);
                None
            }
        }
    }

    pub async fn clear(&self) {
        for key in [VERIFIER_KEY, STATE_KEY] {
            if let Err(e) = self.area.remove(self.context, key).await {
                warning!("Cannot remove login parameter {}: {}", key, e);
            }
        }
    }
}
