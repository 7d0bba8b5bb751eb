use crate::{
    error::ApiError,
    spotify::gateway::Gateway,
    types::{Artist, Paging, Playlist, RecentlyPlayedItem, TimeRange, Track, UserProfile},
};

pub async fn get_user_profile(gateway: &Gateway) -> Result<UserProfile, ApiError> {
    gateway.get_json("me").await
}

pub async fn get_top_artists(
    gateway: &Gateway,
    time_range: TimeRange,
    limit: u32,
) -> Result<Vec<Artist>, ApiError> {
    let page: Paging<Artist> = gateway
        .get_json_with_query("me/top/artists", &top_query(time_range, limit))
        .await?;
    Ok(page.items)
}

pub async fn get_top_tracks(
    gateway: &Gateway,
    time_range: TimeRange,
    limit: u32,
) -> Result<Vec<Track>, ApiError> {
    let page: Paging<Track> = gateway
        .get_json_with_query("me/top/tracks", &top_query(time_range, limit))
        .await?;
    Ok(page.items)
}

pub async fn get_user_playlists(gateway: &Gateway, limit: u32) -> Result<Vec<Playlist>, ApiError> {
    let page: Paging<Playlist> = gateway
        .get_json_with_query("me/playlists", &[("limit", clamp_limit(limit).to_string())])
        .await?;
    Ok(page.items)
}

/// The most recent plays, newest first.
pub async fn get_recently_played(
    gateway: &Gateway,
    limit: u32,
) -> Result<Vec<RecentlyPlayedItem>, ApiError> {
    let page: Paging<RecentlyPlayedItem> = gateway
        .get_json_with_query(
            "me/player/recently-played",
            &[("limit", clamp_limit(limit).to_string())],
        )
        .await?;
    Ok(page.items)
}

fn top_query(time_range: TimeRange, limit: u32) -> [(&'static str, String); 2] {
    [
        ("time_range", time_range.as_query().to_string()),
        ("limit", clamp_limit(limit).to_string()),
    ]
}

/// Spotify accepts page sizes from 1 to 50.
fn clamp_limit(limit: u32) -> u32 {
    limit.clamp(1, 50)
}
