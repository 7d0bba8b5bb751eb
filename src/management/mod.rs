mod credential;
mod pkce;
mod storage;

pub use credential::CREDENTIAL_KEY;
pub use credential::CredentialStore;
pub use credential::LEGACY_EXPIRES_KEY;
pub use credential::LEGACY_REFRESH_KEY;
pub use credential::LEGACY_TOKEN_KEY;
pub use credential::Subscription;
pub use pkce::PkceStore;
pub use pkce::STATE_KEY;
pub use pkce::StoredPkce;
pub use pkce::VERIFIER_KEY;
pub use storage::ContextId;
pub use storage::FileStorage;
pub use storage::MemoryStorage;
pub use storage::Storage;
pub use storage::StorageArea;
pub use storage::StorageEvent;
