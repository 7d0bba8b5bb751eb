use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::{
    error::ApiError,
    spotify::gateway::Gateway,
    types::{Artist, SearchType, Track},
};

/// Searches the catalog and returns the items of the page matching `kind`.
///
/// A blank query returns nothing without asking Spotify.
pub async fn search<T: DeserializeOwned>(
    gateway: &Gateway,
    query: &str,
    kind: SearchType,
    limit: u32,
) -> Result<Vec<T>, ApiError> {
    let query = query.trim();
    if query.is_empty() {
        return Ok(Vec::new());
    }

    let mut response: Value = gateway
        .get_json_with_query(
            "search",
            &[
                ("q", query.to_string()),
                ("type", kind.as_query().to_string()),
                ("limit", limit.clamp(1, 50).to_string()),
            ],
        )
        .await?;

    let key = kind.result_key();
    let Some(items) = response
        .get_mut(&key)
        .and_then(|page| page.get_mut("items"))
        .map(Value::take)
    else {
        return Err(ApiError::Decode(format!("search response without {}", key)));
    };
    serde_json::from_value(items).map_err(|e| ApiError::Decode(e.to_string()))
}

pub async fn search_artists(
    gateway: &Gateway,
    query: &str,
    limit: u32,
) -> Result<Vec<Artist>, ApiError> {
    search(gateway, query, SearchType::Artist, limit).await
}

pub async fn search_tracks(
    gateway: &Gateway,
    query: &str,
    limit: u32,
) -> Result<Vec<Track>, ApiError> {
    search(gateway, query, SearchType::Track, limit).await
}
