use crate::{
    error::ApiError,
    spotify::{gateway::Gateway, search},
    types::{
        AddTracksToPlaylistRequest, CreatePlaylistRequest, GenreSeeds, Paging, Playlist,
        PlaylistItem, RecommendationSeed, Recommendations, ResolvedSeeds, SeedQueries,
        SnapshotResponse,
    },
};

/// Most uris Spotify accepts when adding tracks in one request.
pub const ADD_TRACKS_BATCH_SIZE: usize = 100;

/// Spotify accepts at most five seeds per recommendation request.
pub const MAX_RECOMMENDATION_SEEDS: usize = 5;

pub async fn get_playlist(gateway: &Gateway, playlist_id: &str) -> Result<Playlist, ApiError> {
    match gateway
        .get_json(&format!("playlists/{id}", id = playlist_id))
        .await
    {
        Err(ApiError::Forbidden(_)) => Err(ApiError::Forbidden(
            "Access to the playlist denied. Check that it is public or that you may access it."
                .into(),
        )),
        Err(ApiError::NotFound(_)) => Err(ApiError::NotFound(format!(
            "Playlist {} not found.",
            playlist_id
        ))),
        other => other,
    }
}

/// All items of a playlist, following the paging links past the first page.
pub async fn get_all_playlist_items(
    gateway: &Gateway,
    playlist: &Playlist,
) -> Result<Vec<PlaylistItem>, ApiError> {
    let mut items = playlist.tracks.items.clone();
    let mut next = playlist.tracks.next.clone();

    while let Some(link) = next {
        let url = reqwest::Url::parse(&link).map_err(|e| ApiError::Url(e.to_string()))?;
        let page: Paging<PlaylistItem> = gateway.get_json_url(url).await?;
        items.extend(page.items);
        next = page.next;
    }

    Ok(items)
}

pub fn track_ids(items: &[PlaylistItem]) -> Vec<String> {
    items
        .iter()
        .filter_map(|item| item.track.as_ref().and_then(|t| t.id.clone()))
        .collect()
}

pub async fn create_playlist(
    gateway: &Gateway,
    user_id: &str,
    request: &CreatePlaylistRequest,
) -> Result<Playlist, ApiError> {
    gateway
        .post_json(&format!("users/{id}/playlists", id = user_id), request)
        .await
}

/// Adds tracks in chunks; returns the snapshot id of every chunk.
pub async fn add_tracks(
    gateway: &Gateway,
    playlist_id: &str,
    uris: &[String],
) -> Result<Vec<String>, ApiError> {
    let mut snapshots = Vec::new();
    for chunk in uris.chunks(ADD_TRACKS_BATCH_SIZE) {
        let request = AddTracksToPlaylistRequest {
            uris: chunk.to_vec(),
        };
        let response: SnapshotResponse = gateway
            .post_json(&format!("playlists/{id}/tracks", id = playlist_id), &request)
            .await?;
        snapshots.push(response.snapshot_id);
    }
    Ok(snapshots)
}

pub async fn get_recommendations(
    gateway: &Gateway,
    seed: &RecommendationSeed,
) -> Result<Recommendations, ApiError> {
    let mut query: Vec<(&str, String)> = Vec::new();
    if !seed.seed_artists.is_empty() {
        query.push(("seed_artists", seed.seed_artists.join(",")));
    }
    if !seed.seed_tracks.is_empty() {
        query.push(("seed_tracks", seed.seed_tracks.join(",")));
    }
    if !seed.seed_genres.is_empty() {
        query.push(("seed_genres", seed.seed_genres.join(",")));
    }
    if let Some(limit) = seed.limit {
        query.push(("limit", limit.clamp(1, 100).to_string()));
    }
    if let Some(v) = seed.target_energy {
        query.push(("target_energy", v.to_string()));
    }
    if let Some(v) = seed.target_valence {
        query.push(("target_valence", v.to_string()));
    }
    if let Some(v) = seed.target_danceability {
        query.push(("target_danceability", v.to_string()));
    }

    gateway.get_json_with_query("recommendations", &query).await
}

/// Genres accepted as `seed_genres`.
pub async fn get_available_genres(gateway: &Gateway) -> Result<Vec<String>, ApiError> {
    let seeds: GenreSeeds = gateway
        .get_json("recommendations/available-genre-seeds")
        .await?;
    Ok(seeds.genres)
}

/// Turns search terms into artist and track ids and checks genres against
/// the available genre seeds. Artists come first, then tracks, then genres;
/// anything past [`MAX_RECOMMENDATION_SEEDS`] is dropped.
pub async fn resolve_seeds(
    gateway: &Gateway,
    queries: &SeedQueries,
) -> Result<ResolvedSeeds, ApiError> {
    let mut resolved = ResolvedSeeds::default();

    for query in &queries.artists {
        match search::search_artists(gateway, query, 1).await?.into_iter().next() {
            Some(artist) => resolved.artists.push(artist.id),
            None => resolved.unresolved.push(query.clone()),
        }
    }

    for query in &queries.tracks {
        let hit = search::search_tracks(gateway, query, 1)
            .await?
            .into_iter()
            .find_map(|track| track.id);
        match hit {
            Some(id) => resolved.tracks.push(id),
            None => resolved.unresolved.push(query.clone()),
        }
    }

    if !queries.genres.is_empty() {
        let available = get_available_genres(gateway).await?;
        for genre in &queries.genres {
            let normalized = genre.trim().to_lowercase();
            if available.contains(&normalized) {
                resolved.genres.push(normalized);
            } else {
                resolved.unresolved.push(genre.clone());
            }
        }
    }

    let mut room = MAX_RECOMMENDATION_SEEDS;
    for seeds in [
        &mut resolved.artists,
        &mut resolved.tracks,
        &mut resolved.genres,
    ] {
        let keep = seeds.len().min(room);
        resolved.dropped += seeds.len() - keep;
        seeds.truncate(keep);
        room -= keep;
    }

    Ok(resolved)
}
