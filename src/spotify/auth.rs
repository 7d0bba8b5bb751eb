use std::sync::Arc;

use reqwest::{Client, Response, Url};
use tokio::sync::Mutex;

use crate::{
    config::OAuthConfig,
    error::AuthError,
    management::{CredentialStore, PkceStore},
    types::{CallbackParams, PkceParams, SessionCredential, TokenErrorResponse, TokenResponse},
    warning,
};

/// Sends the user to the authorization page.
pub trait Navigator: Send + Sync {
    fn navigate(&self, url: &Url);
}

/// Opens the URL in the default browser, or prints it when that fails.
pub struct BrowserNavigator;

impl Navigator for BrowserNavigator {
    fn navigate(&self, url: &Url) {
        if webbrowser::open(url.as_str()).is_err() {
            warning!(
                "Failed to open browser. Please navigate to the following URL manually:\n{}",
                url
            )
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandshakeFailure {
    pub message: String,
    /// Set for state or verifier validation failures.
    pub security: bool,
}

impl From<&AuthError> for HandshakeFailure {
    fn from(error: &AuthError) -> Self {
        Self {
            message: error.user_message(),
            security: error.is_security_failure(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandshakeState {
    Idle,
    Redirecting,
    AwaitingCallback,
    ExchangingCode,
    Authenticated,
    Failed(HandshakeFailure),
}

impl HandshakeState {
    pub fn label(&self) -> &'static str {
        match self {
            HandshakeState::Idle => "idle",
            HandshakeState::Redirecting => "redirecting",
            HandshakeState::AwaitingCallback => "awaiting_callback",
            HandshakeState::ExchangingCode => "exchanging_code",
            HandshakeState::Authenticated => "authenticated",
            HandshakeState::Failed(_) => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            HandshakeState::Authenticated | HandshakeState::Failed(_)
        )
    }
}

/// The controller as shared between the CLI and the callback server.
pub type SharedHandshake = Arc<Mutex<HandshakeController>>;

/// Drives the authorization code flow with PKCE.
///
/// Every login attempt gets fresh PKCE parameters; starting a new attempt
/// overwrites the stored ones, so a stale callback fails its state check.
pub struct HandshakeController {
    config: OAuthConfig,
    credentials: CredentialStore,
    pkce: PkceStore,
    navigator: Arc<dyn Navigator>,
    client: Client,
    state: HandshakeState,
}

impl HandshakeController {
    pub fn new(
        config: OAuthConfig,
        credentials: CredentialStore,
        pkce: PkceStore,
        navigator: Arc<dyn Navigator>,
    ) -> Self {
        Self {
            config,
            credentials,
            pkce,
            navigator,
            client: Client::new(),
            state: HandshakeState::Idle,
        }
    }

    pub fn state(&self) -> &HandshakeState {
        &self.state
    }

    pub fn credentials(&self) -> &CredentialStore {
        &self.credentials
    }

    fn fail(&mut self, error: AuthError) -> AuthError {
        self.state = HandshakeState::Failed(HandshakeFailure::from(&error));
        error
    }

    /// Builds the authorization URL for one set of PKCE parameters.
    pub fn authorize_url(&self, params: &PkceParams) -> Result<Url, AuthError> {
        let mut url = Url::parse(&self.config.auth_url)
            .map_err(|e| AuthError::InvalidEndpoint(format!("{}: {}", self.config.auth_url, e)))?;

        url.query_pairs_mut()
            .append_pair("client_id", &self.config.client_id)
            .append_pair("redirect_uri", &self.config.redirect_uri)
            .append_pair("scope", &self.config.scopes.join(" "))
            .append_pair("response_type", "code")
            .append_pair("state", &params.state)
            .append_pair("code_challenge", &params.challenge)
            .append_pair("code_challenge_method", "S256")
            .append_pair("show_dialog", "true");

        // form encoding writes spaces as '+'; literal '+' is already %2B
        let query = url.query().map(|q| q.replace('+', "%20"));
        url.set_query(query.as_deref());

        Ok(url)
    }

    /// Starts a login attempt and hands the authorization URL to the
    /// navigator. The attempt completes in [`Self::handle_callback`].
    pub async fn begin_login(&mut self) -> Result<Url, AuthError> {
        let params = match PkceParams::generate() {
            Ok(params) => params,
            Err(e) => return Err(self.fail(e)),
        };

        if let Err(e) = self.pkce.save(&params).await {
            return Err(self.fail(AuthError::Storage(e)));
        }

        let url = match self.authorize_url(&params) {
            Ok(url) => url,
            Err(e) => return Err(self.fail(e)),
        };

        self.state = HandshakeState::Redirecting;
        self.navigator.navigate(&url);
        self.state = HandshakeState::AwaitingCallback;

        Ok(url)
    }

    /// Processes the query of the redirect back from the authorization page.
    ///
    /// PKCE parameters are purged afterwards whatever the outcome.
    pub async fn handle_callback(
        &mut self,
        params: &CallbackParams,
    ) -> Result<SessionCredential, AuthError> {
        let result = self.process_callback(params).await;
        self.pkce.clear().await;

        match result {
            Ok(credential) => {
                self.state = HandshakeState::Authenticated;
                Ok(credential)
            }
            Err(e) => Err(self.fail(e)),
        }
    }

    async fn process_callback(
        &mut self,
        params: &CallbackParams,
    ) -> Result<SessionCredential, AuthError> {
        if let Some(error) = params.error.as_deref() {
            if error == "access_denied" {
                return Err(AuthError::AccessDenied);
            }
            let detail = params
                .error_description
                .clone()
                .unwrap_or_else(|| error.to_string());
            return Err(AuthError::Provider(detail));
        }

        // re-entry after a completed login, e.g. browser back button
        if let Some(credential) = self.credentials.load().await {
            return Ok(credential);
        }

        let Some(code) = params.code.as_deref() else {
            return Err(AuthError::CodeMissing);
        };

        // state must be checked before the code is trusted
        let stored = self.pkce.load().await;
        let state_matches = match (params.state.as_deref(), stored.state.as_deref()) {
            (Some(returned), Some(expected)) => returned == expected,
            _ => false,
        };
        if !state_matches {
            return Err(AuthError::StateMismatch);
        }

        let Some(verifier) = stored.verifier else {
            return Err(AuthError::MissingVerifier);
        };

        self.state = HandshakeState::ExchangingCode;
        let token = self.exchange_code(code, &verifier).await?;

        let credential = self
            .credentials
            .save(&token.access_token, token.expires_in, token.refresh_token)
            .await?;
        Ok(credential)
    }

    pub async fn exchange_code(&self, code: &str, verifier: &str) -> Result<TokenResponse, AuthError> {
        let response = self
            .client
            .post(&self.config.token_url)
            .form(&[
                ("grant_type", "authorization_code"),
                ("code", code),
                ("redirect_uri", self.config.redirect_uri.as_str()),
                ("client_id", self.config.client_id.as_str()),
                ("code_verifier", verifier),
            ])
            .send()
            .await?;

        read_token_response(response).await
    }

    /// Trades the stored refresh token for a new access token.
    ///
    /// Only possible while the current credential is still valid; an expired
    /// credential has already been purged.
    pub async fn refresh_session(&self) -> Result<SessionCredential, AuthError> {
        let refresh_token = self
            .credentials
            .load()
            .await
            .and_then(|c| c.refresh_token)
            .ok_or(AuthError::NoRefreshToken)?;

        let response = self
            .client
            .post(&self.config.token_url)
            .form(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", refresh_token.as_str()),
                ("client_id", self.config.client_id.as_str()),
            ])
            .send()
            .await?;

        let token = read_token_response(response).await?;

        // Spotify does not always rotate the refresh token
        let refresh_token = token.refresh_token.or(Some(refresh_token));
        let credential = self
            .credentials
            .save(&token.access_token, token.expires_in, refresh_token)
            .await?;
        Ok(credential)
    }

    /// Drops any credential and pending attempt; available from every state.
    pub async fn retry(&mut self) {
        self.logout().await;
        self.pkce.clear().await;
    }

    pub async fn logout(&mut self) {
        if let Err(e) = self.credentials.clear().await {
            warning!("Cannot clear stored credentials: {}", e);
        }
        self.state = HandshakeState::Idle;
    }
}

async fn read_token_response(response: Response) -> Result<TokenResponse, AuthError> {
    let status = response.status();
    let body = response.text().await?;

    if !status.is_success() {
        let description = match serde_json::from_str::<TokenErrorResponse>(&body) {
            Ok(err) => err
                .error_description
                .filter(|d| !d.is_empty())
                .unwrap_or(err.error),
            Err(_) => format!("HTTP {}", status),
        };
        return Err(AuthError::Exchange(description));
    }

    let token: TokenResponse = serde_json::from_str(&body)
        .map_err(|e| AuthError::Exchange(format!("malformed token response: {}", e)))?;
    if token.access_token.is_empty() {
        return Err(AuthError::Exchange("token response without access_token".into()));
    }
    Ok(token)
}
