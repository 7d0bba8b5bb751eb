use std::time::Duration;

use reqwest::{
    Client, Method, Response, StatusCode, Url,
    header::{CONTENT_TYPE, RETRY_AFTER},
};
use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;
use tokio::time::sleep;

use crate::{error::ApiError, management::CredentialStore, warning};

const MAX_BAD_GATEWAY_RETRIES: u32 = 2;
const BAD_GATEWAY_PAUSE: Duration = Duration::from_secs(10);

/// Every Web API call goes through here.
///
/// The bearer token is read from the credential store per request. A 401
/// from any call clears the store for every context sharing it; the caller
/// gets [`ApiError::Unauthorized`] and should send the user back to login.
#[derive(Clone)]
pub struct Gateway {
    client: Client,
    api_base: String,
    credentials: CredentialStore,
    retry_pause: Duration,
}

impl Gateway {
    pub fn new(api_base: impl Into<String>, credentials: CredentialStore) -> Self {
        Self {
            client: Client::new(),
            api_base: api_base.into().trim_end_matches('/').to_string(),
            credentials,
            retry_pause: BAD_GATEWAY_PAUSE,
        }
    }

    /// Pause before retrying a 502 response.
    pub fn with_retry_pause(mut self, pause: Duration) -> Self {
        self.retry_pause = pause;
        self
    }

    pub fn credentials(&self) -> &CredentialStore {
        &self.credentials
    }

    pub fn url(&self, path: &str) -> Result<Url, ApiError> {
        let raw = format!("{}/{}", self.api_base, path.trim_start_matches('/'));
        Url::parse(&raw).map_err(|e| ApiError::Url(format!("{}: {}", raw, e)))
    }

    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let url = self.url(path)?;
        self.get_json_url(url).await
    }

    pub async fn get_json_with_query<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, ApiError> {
        let mut url = self.url(path)?;
        url.query_pairs_mut()
            .extend_pairs(query.iter().map(|(k, v)| (*k, v.as_str())));
        self.get_json_url(url).await
    }

    /// For absolute URLs handed out by the API, e.g. paging `next` links.
    pub async fn get_json_url<T: DeserializeOwned>(&self, url: Url) -> Result<T, ApiError> {
        let response = self.execute::<()>(Method::GET, url, None).await?;
        decode(response).await
    }

    pub async fn post_json<B, T>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = self.url(path)?;
        let response = self.execute(Method::POST, url, Some(body)).await?;
        decode(response).await
    }

    pub async fn execute<B: Serialize + ?Sized>(
        &self,
        method: Method,
        url: Url,
        body: Option<&B>,
    ) -> Result<Response, ApiError> {
        let mut attempt = 0;

        loop {
            let mut request = self.client.request(method.clone(), url.clone());
            if let Some(credential) = self.credentials.load().await {
                request = request
                    .bearer_auth(&credential.access_token)
                    .header(CONTENT_TYPE, "application/json");
            }
            if let Some(body) = body {
                request = request.json(body);
            }

            let response = request.send().await?;
            let status = response.status();

            if status.is_success() {
                return Ok(response);
            }

            if status == StatusCode::BAD_GATEWAY && attempt < MAX_BAD_GATEWAY_RETRIES {
                attempt += 1;
                sleep(self.retry_pause).await;
                continue; // retry
            }

            return Err(self.classify(response).await);
        }
    }

    async fn classify(&self, response: Response) -> ApiError {
        let status = response.status();

        if status == StatusCode::UNAUTHORIZED {
            self.invalidate_session().await;
            return ApiError::Unauthorized;
        }

        let retry_after = response
            .headers()
            .get(RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok())
            .map(Duration::from_secs);

        let body = response.text().await.unwrap_or_default();
        let message = error_message(&body, status);

        match status {
            StatusCode::FORBIDDEN => ApiError::Forbidden(message),
            StatusCode::NOT_FOUND => ApiError::NotFound(message),
            StatusCode::TOO_MANY_REQUESTS => ApiError::RateLimited { retry_after },
            _ => ApiError::Status { status, message },
        }
    }

    async fn invalidate_session(&self) {
        match self.credentials.clear().await {
            Ok(true) => warning!(
                "Spotify rejected the access token. Stored credentials were removed, run spotlyze auth."
            ),
            Ok(false) => {}
            Err(e) => warning!("Cannot clear stored credentials: {}", e),
        }
    }
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ApiError> {
    let body = response.text().await?;
    serde_json::from_str(&body).map_err(|e| ApiError::Decode(e.to_string()))
}

/// Web API errors look like `{"error": {"status": 403, "message": "..."}}`.
fn error_message(body: &str, status: StatusCode) -> String {
    let fallback = || {
        status
            .canonical_reason()
            .unwrap_or("unknown error")
            .to_string()
    };

    let Ok(json) = serde_json::from_str::<Value>(body) else {
        return fallback();
    };

    json["error"]["message"]
        .as_str()
        .or_else(|| json["error_description"].as_str())
        .or_else(|| json["error"].as_str())
        .map(str::to_string)
        .unwrap_or_else(fallback)
}
