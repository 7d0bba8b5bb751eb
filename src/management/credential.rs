use tokio::{sync::broadcast::error::RecvError, task::JoinHandle};

use crate::{
    error::StorageError,
    management::storage::{ContextId, StorageArea},
    types::{AuthState, SessionCredential},
    utils, warning,
};

pub const CREDENTIAL_KEY: &str = "spotify_credential";

// written by the implicit-grant login
pub const LEGACY_TOKEN_KEY: &str = "spotify_token";
pub const LEGACY_EXPIRES_KEY: &str = "spotify_token_expires";
pub const LEGACY_REFRESH_KEY: &str = "spotify_refresh_token";

const CREDENTIAL_KEYS: [&str; 4] = [
    CREDENTIAL_KEY,
    LEGACY_TOKEN_KEY,
    LEGACY_EXPIRES_KEY,
    LEGACY_REFRESH_KEY,
];

/// The single owner of the persisted session credential.
///
/// Clones share the same context; create a new store over the same
/// [`StorageArea`] to model another open client.
#[derive(Clone)]
pub struct CredentialStore {
    area: StorageArea,
    context: ContextId,
}

impl CredentialStore {
    pub fn new(area: StorageArea) -> Self {
        Self {
            area,
            context: ContextId::next(),
        }
    }

    pub fn context(&self) -> ContextId {
        self.context
    }

    /// Returns the stored credential if it is present and not expired.
    ///
    /// Expired or unreadable data is purged. Storage failures are reported
    /// as warnings and treated as "no credential".
    pub async fn load(&self) -> Option<SessionCredential> {
        match self.try_load().await {
            Ok(credential) => credential,
            Err(e) => {
                warning!("Cannot read stored credentials: {}", e);
                None
            }
        }
    }

    async fn try_load(&self) -> Result<Option<SessionCredential>, StorageError> {
        let credential = match self.area.get(CREDENTIAL_KEY).await? {
            Some(raw) => match serde_json::from_str::<SessionCredential>(&raw) {
                Ok(credential) => credential,
                Err(e) => {
                    warning!("Discarding unreadable stored credential: {}", e);
                    self.purge().await?;
                    return Ok(None);
                }
            },
            None => match self.load_legacy().await? {
                Some(credential) => credential,
                None => return Ok(None),
            },
        };

        if credential.is_expired_at(utils::now_ms()) {
            self.purge().await?;
            return Ok(None);
        }

        Ok(Some(credential))
    }

    /// Synthesizes a credential from a token stored by the old implicit-grant
    /// login and rewrites it as a single record.
    async fn load_legacy(&self) -> Result<Option<SessionCredential>, StorageError> {
        let Some(access_token) = self.area.get(LEGACY_TOKEN_KEY).await? else {
            return Ok(None);
        };

        let expires_at_ms = self
            .area
            .get(LEGACY_EXPIRES_KEY)
            .await?
            .and_then(|raw| raw.trim().parse::<i64>().ok());
        let refresh_token = self.area.get(LEGACY_REFRESH_KEY).await?;

        let credential = SessionCredential {
            access_token,
            expires_at_ms,
            refresh_token,
        };

        if !credential.is_expired_at(utils::now_ms()) {
            self.store(&credential).await?;
            self.area
                .remove_all(
                    self.context,
                    &[LEGACY_TOKEN_KEY, LEGACY_EXPIRES_KEY, LEGACY_REFRESH_KEY],
                )
                .await?;
        }

        Ok(Some(credential))
    }

    pub async fn save(
        &self,
        access_token: &str,
        expires_in_secs: Option<u64>,
        refresh_token: Option<String>,
    ) -> Result<SessionCredential, StorageError> {
        let credential = SessionCredential {
            access_token: access_token.to_string(),
            expires_at_ms: expires_in_secs
                .map(|secs| utils::now_ms().saturating_add((secs as i64).saturating_mul(1000))),
            refresh_token,
        };

        self.store(&credential).await?;
        Ok(credential)
    }

    async fn store(&self, credential: &SessionCredential) -> Result<(), StorageError> {
        let json = serde_json::to_string(credential)?;
        self.area.set(self.context, CREDENTIAL_KEY, &json).await
    }

    /// Removes every credential key as one change, so other contexts are
    /// notified at most once. Returns whether anything was stored.
    pub async fn clear(&self) -> Result<bool, StorageError> {
        self.purge().await
    }

    async fn purge(&self) -> Result<bool, StorageError> {
        self.area.remove_all(self.context, &CREDENTIAL_KEYS).await
    }

    pub async fn auth_state(&self) -> AuthState {
        match self.load().await {
            Some(_) => AuthState::Authenticated,
            None => AuthState::Unauthenticated,
        }
    }

    /// Calls `callback` with the re-evaluated state whenever another context
    /// logs in or out. Must be called inside a tokio runtime.
    pub fn on_external_change<F>(&self, callback: F) -> Subscription
    where
        F: Fn(AuthState) + Send + Sync + 'static,
    {
        let mut events = self.area.subscribe();
        let store = self.clone();

        let handle = tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(event) => {
                        if event.origin == store.context
                            || !CREDENTIAL_KEYS.contains(&event.key.as_str())
                        {
                            continue;
                        }
                        callback(store.auth_state().await);
                    }
                    Err(RecvError::Lagged(_)) => callback(store.auth_state().await),
                    Err(RecvError::Closed) => break,
                }
            }
        });

        Subscription { handle }
    }
}

/// Ends the change subscription when unsubscribed or dropped.
pub struct Subscription {
    handle: JoinHandle<()>,
}

impl Subscription {
    pub fn unsubscribe(self) {
        self.handle.abort();
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
