use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use chrono::{DateTime, Days, Local, TimeZone, Utc};
use rand::{TryRngCore, rngs::OsRng};
use sha2::{Digest, Sha256};

use crate::{
    error::AuthError,
    types::{
        Artist, ArtistTableRow, AudioFeatures, FeatureSummary, FeatureTableRow, PkceParams, Playlist,
        PlaylistTableRow, RecentPeriod, RecentTableRow, RecentlyPlayedItem, Track, TrackTableRow,
    },
};

const VERIFIER_BYTES: usize = 32;
const STATE_BYTES: usize = 16;

/// Fills `len` bytes from the operating system's secure random source and
/// encodes them as URL-safe base64 without padding.
fn random_token(len: usize) -> Result<String, AuthError> {
    let mut bytes = vec![0u8; len];
    OsRng
        .try_fill_bytes(&mut bytes)
        .map_err(|e| AuthError::Entropy(e.to_string()))?;
    Ok(URL_SAFE_NO_PAD.encode(bytes))
}

pub fn generate_code_verifier() -> Result<String, AuthError> {
    random_token(VERIFIER_BYTES)
}

pub fn generate_code_challenge(verifier: &str) -> String {
    let hash = Sha256::digest(verifier.as_bytes());
    URL_SAFE_NO_PAD.encode(hash)
}

pub fn generate_state() -> Result<String, AuthError> {
    random_token(STATE_BYTES)
}

impl PkceParams {
    /// Fresh parameters for exactly one login attempt.
    pub fn generate() -> Result<Self, AuthError> {
        let verifier = generate_code_verifier()?;
        let challenge = generate_code_challenge(&verifier);
        let state = generate_state()?;
        Ok(Self {
            verifier,
            challenge,
            state,
        })
    }
}

pub fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

/// Keeps trimmed, non-empty base62 ids; everything else cannot be a track id.
pub fn valid_track_ids<S: AsRef<str>>(ids: &[S]) -> Vec<String> {
    ids.iter()
        .map(|id| id.as_ref().trim())
        .filter(|id| !id.is_empty() && id.chars().all(|c| c.is_ascii_alphanumeric()))
        .map(str::to_string)
        .collect()
}

pub fn summarize_features(features: &[AudioFeatures]) -> FeatureSummary {
    if features.is_empty() {
        return FeatureSummary::default();
    }

    let n = features.len() as f64;
    let mean = |f: fn(&AudioFeatures) -> f64| features.iter().map(f).sum::<f64>() / n;

    FeatureSummary {
        count: features.len(),
        danceability: mean(|f| f.danceability),
        energy: mean(|f| f.energy),
        valence: mean(|f| f.valence),
        acousticness: mean(|f| f.acousticness),
        instrumentalness: mean(|f| f.instrumentalness),
        speechiness: mean(|f| f.speechiness),
        liveness: mean(|f| f.liveness),
        tempo: mean(|f| f.tempo),
    }
}

pub fn feature_summary_rows(summary: &FeatureSummary) -> Vec<FeatureTableRow> {
    let percent = |v: f64| format!("{:.1}%", v * 100.0);
    vec![
        FeatureTableRow {
            metric: "Danceability".into(),
            value: percent(summary.danceability),
        },
        FeatureTableRow {
            metric: "Energy".into(),
            value: percent(summary.energy),
        },
        FeatureTableRow {
            metric: "Valence".into(),
            value: percent(summary.valence),
        },
        FeatureTableRow {
            metric: "Acousticness".into(),
            value: percent(summary.acousticness),
        },
        FeatureTableRow {
            metric: "Instrumentalness".into(),
            value: percent(summary.instrumentalness),
        },
        FeatureTableRow {
            metric: "Speechiness".into(),
            value: percent(summary.speechiness),
        },
        FeatureTableRow {
            metric: "Liveness".into(),
            value: percent(summary.liveness),
        },
        FeatureTableRow {
            metric: "Tempo".into(),
            value: format!("{:.0} BPM", summary.tempo),
        },
    ]
}

pub fn artist_rows(artists: &[Artist]) -> Vec<ArtistTableRow> {
    artists
        .iter()
        .enumerate()
        .map(|(i, a)| ArtistTableRow {
            rank: i + 1,
            name: a.name.clone(),
            genres: a.genres.join(", "),
            popularity: a.popularity,
        })
        .collect()
}

pub fn track_rows(tracks: &[Track]) -> Vec<TrackTableRow> {
    tracks
        .iter()
        .enumerate()
        .map(|(i, t)| TrackTableRow {
            rank: i + 1,
            name: t.name.clone(),
            artists: artist_names(t),
        })
        .collect()
}

fn artist_names(track: &Track) -> String {
    track
        .artists
        .iter()
        .map(|a| a.name.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Keeps the plays that fall into `period`, judged by the calendar of `now`'s
/// time zone. Entries with an unreadable timestamp only pass [`RecentPeriod::All`].
pub fn filter_recent<Tz: TimeZone>(
    items: &[RecentlyPlayedItem],
    period: RecentPeriod,
    now: &DateTime<Tz>,
) -> Vec<RecentlyPlayedItem> {
    if period == RecentPeriod::All {
        return items.to_vec();
    }

    let today = now.date_naive();
    let week_ago = now.clone() - chrono::Duration::days(7);

    items
        .iter()
        .filter(|item| {
            let Ok(played) = DateTime::parse_from_rfc3339(&item.played_at) else {
                return false;
            };
            let played = played.with_timezone(&now.timezone());
            match period {
                RecentPeriod::All => true,
                RecentPeriod::Today => played.date_naive() == today,
                RecentPeriod::Yesterday => {
                    today.checked_sub_days(Days::new(1)) == Some(played.date_naive())
                }
                RecentPeriod::Week => played >= week_ago,
            }
        })
        .cloned()
        .collect()
}

pub fn recent_rows(items: &[RecentlyPlayedItem]) -> Vec<RecentTableRow> {
    items
        .iter()
        .map(|item| RecentTableRow {
            played_at: DateTime::parse_from_rfc3339(&item.played_at)
                .map(|t| t.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string())
                .unwrap_or_else(|_| item.played_at.clone()),
            name: item.track.name.clone(),
            artists: artist_names(&item.track),
        })
        .collect()
}

pub fn playlist_rows(playlists: &[Playlist]) -> Vec<PlaylistTableRow> {
    playlists
        .iter()
        .map(|p| PlaylistTableRow {
            name: p.name.clone(),
            id: p.id.clone(),
            tracks: p.tracks.total,
            owner: p
                .owner
                .display_name
                .clone()
                .unwrap_or_else(|| p.owner.id.clone()),
        })
        .collect()
}
