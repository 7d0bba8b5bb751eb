use chrono::{TimeZone, Utc};
use spotlyze::config::DEFAULT_SCOPES;
use spotlyze::types::{
    Artist, AudioFeatures, PkceParams, Playlist, PlaylistOwner, PlaylistTracks, RecentPeriod,
    RecentlyPlayedItem, SearchType, SimpleArtist, Track,
};
use spotlyze::utils::*;

// Helper function to create audio features with the fields the summary reads
fn create_test_features(id: &str, energy: f64, valence: f64, tempo: f64) -> AudioFeatures {
    AudioFeatures {
        id: id.to_string(),
        danceability: 0.5,
        energy,
        key: 0,
        loudness: -6.0,
        mode: 1,
        speechiness: 0.05,
        acousticness: 0.1,
        instrumentalness: 0.0,
        liveness: 0.2,
        valence,
        tempo,
        duration_ms: 200_000,
        time_signature: 4,
    }
}

// Helper function to create a play of a single-artist track
fn create_test_play(name: &str, played_at: &str) -> RecentlyPlayedItem {
    RecentlyPlayedItem {
        track: Track {
            id: Some(name.to_lowercase()),
            name: name.to_string(),
            uri: format!("spotify:track:{}", name.to_lowercase()),
            artists: vec![SimpleArtist {
                id: None,
                name: "Daft Punk".to_string(),
            }],
            album: None,
            duration_ms: 1000,
            popularity: None,
        },
        played_at: played_at.to_string(),
    }
}

fn is_url_safe(value: &str) -> bool {
    value
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

#[test]
fn test_generate_code_verifier() {
    let verifier = generate_code_verifier().unwrap();

    // 32 random bytes encode to 43 characters without padding
    assert_eq!(verifier.len(), 43);
    assert!(is_url_safe(&verifier));
    assert!(!verifier.contains('='));

    let verifier2 = generate_code_verifier().unwrap();
    assert_ne!(verifier, verifier2);
}

#[test]
fn test_generate_code_challenge() {
    let verifier = "test_verifier_123";
    let challenge = generate_code_challenge(verifier);

    // SHA-256 digest encodes to 43 characters
    assert_eq!(challenge.len(), 43);
    assert!(is_url_safe(&challenge));

    // Should be deterministic - same input produces same output
    assert_eq!(challenge, generate_code_challenge(verifier));

    // Different input should produce different output
    assert_ne!(challenge, generate_code_challenge("different_verifier"));
}

#[test]
fn test_generate_code_challenge_known_vector() {
    // Example from RFC 7636, appendix B
    let challenge = generate_code_challenge("dBjftJeZ4CVP-mB92K27uhbUJU1p1r_wW1gFWFOEjXk");
    assert_eq!(challenge, "E9Melhoa2OwvFrEMTJguCHaoeK1t8URWbuGJSstw-cM");
}

#[test]
fn test_generate_state() {
    let state = generate_state().unwrap();

    // 16 random bytes encode to 22 characters
    assert_eq!(state.len(), 22);
    assert!(is_url_safe(&state));
    assert_ne!(state, generate_state().unwrap());
}

#[test]
fn test_pkce_params_generate() {
    let params = PkceParams::generate().unwrap();

    assert_eq!(params.challenge, generate_code_challenge(&params.verifier));
    assert_ne!(params.verifier, params.state);

    for value in [&params.verifier, &params.challenge, &params.state] {
        assert!(!value.contains('+'));
        assert!(!value.contains('/'));
        assert!(!value.contains('='));
    }
}

#[test]
fn test_valid_track_ids() {
    let ids = vec![
        "4iV5W9uYEdYUVa79Axb7Rh",
        "  1301WleyT98MSxVHPZCA6M ",
        "",
        "   ",
        "spotify:track:4iV5W9uYEdYUVa79Axb7Rh",
        "bad id",
    ];

    let valid = valid_track_ids(&ids);

    assert_eq!(valid, vec!["4iV5W9uYEdYUVa79Axb7Rh", "1301WleyT98MSxVHPZCA6M"]);
}

#[test]
fn test_valid_track_ids_empty() {
    let ids: Vec<String> = Vec::new();
    assert!(valid_track_ids(&ids).is_empty());
}

#[test]
fn test_summarize_features() {
    let features = vec![
        create_test_features("a", 0.8, 0.2, 120.0),
        create_test_features("b", 0.4, 0.6, 100.0),
    ];

    let summary = summarize_features(&features);

    assert_eq!(summary.count, 2);
    assert!((summary.energy - 0.6).abs() < 1e-9);
    assert!((summary.valence - 0.4).abs() < 1e-9);
    assert!((summary.tempo - 110.0).abs() < 1e-9);
    assert!((summary.danceability - 0.5).abs() < 1e-9);
}

#[test]
fn test_summarize_features_empty() {
    let summary = summarize_features(&[]);
    assert_eq!(summary.count, 0);
    assert_eq!(summary.energy, 0.0);
}

#[test]
fn test_feature_summary_rows() {
    let summary = summarize_features(&[create_test_features("a", 0.75, 0.5, 128.4)]);
    let rows = feature_summary_rows(&summary);

    assert_eq!(rows.len(), 8);
    assert_eq!(rows[1].metric, "Energy");
    assert_eq!(rows[1].value, "75.0%");
    assert_eq!(rows[7].value, "128 BPM");
}

#[test]
fn test_artist_and_track_rows() {
    let artists = vec![Artist {
        id: "a1".to_string(),
        name: "Daft Punk".to_string(),
        genres: vec!["french house".to_string(), "electro".to_string()],
        popularity: 80,
    }];
    let rows = artist_rows(&artists);
    assert_eq!(rows[0].rank, 1);
    assert_eq!(rows[0].genres, "french house, electro");

    let tracks = vec![Track {
        id: Some("t1".to_string()),
        name: "Get Lucky".to_string(),
        uri: "spotify:track:t1".to_string(),
        artists: vec![
            SimpleArtist {
                id: None,
                name: "Daft Punk".to_string(),
            },
            SimpleArtist {
                id: None,
                name: "Pharrell Williams".to_string(),
            },
        ],
        album: None,
        duration_ms: 248_000,
        popularity: None,
    }];
    let rows = track_rows(&tracks);
    assert_eq!(rows[0].artists, "Daft Punk, Pharrell Williams");
}

#[test]
fn test_playlist_rows_fall_back_to_owner_id() {
    let playlists = vec![Playlist {
        id: "p1".to_string(),
        name: "Mix".to_string(),
        description: None,
        public: Some(false),
        collaborative: false,
        snapshot_id: None,
        owner: PlaylistOwner {
            id: "user-1".to_string(),
            display_name: None,
        },
        tracks: PlaylistTracks {
            total: 42,
            ..Default::default()
        },
    }];

    let rows = playlist_rows(&playlists);
    assert_eq!(rows[0].owner, "user-1");
    assert_eq!(rows[0].tracks, 42);
}

#[test]
fn test_now_ms_is_current() {
    let now = now_ms();
    let chrono_now = chrono::Utc::now().timestamp_millis();
    assert!((chrono_now - now).abs() < 1_000);
}

#[test]
fn test_filter_recent() {
    let now = Utc.with_ymd_and_hms(2024, 5, 10, 12, 0, 0).unwrap();
    let plays = vec![
        create_test_play("Today", "2024-05-10T08:30:00Z"),
        create_test_play("Yesterday", "2024-05-09T23:59:00Z"),
        create_test_play("ThisWeek", "2024-05-05T10:00:00Z"),
        create_test_play("LastMonth", "2024-04-01T10:00:00Z"),
        create_test_play("Broken", "not a date"),
    ];

    let names = |period| -> Vec<String> {
        filter_recent(&plays, period, &now)
            .into_iter()
            .map(|p| p.track.name)
            .collect()
    };

    assert_eq!(names(RecentPeriod::All).len(), 5);
    assert_eq!(names(RecentPeriod::Today), vec!["Today"]);
    assert_eq!(names(RecentPeriod::Yesterday), vec!["Yesterday"]);
    assert_eq!(names(RecentPeriod::Week), vec!["Today", "Yesterday", "ThisWeek"]);
}

#[test]
fn test_recent_rows() {
    let rows = recent_rows(&[create_test_play("One More Time", "not a date")]);

    assert_eq!(rows[0].name, "One More Time");
    assert_eq!(rows[0].artists, "Daft Punk");
    // unreadable timestamps are shown as sent
    assert_eq!(rows[0].played_at, "not a date");
}

#[test]
fn test_search_type_result_key() {
    assert_eq!(SearchType::Artist.result_key(), "artists");
    assert_eq!(SearchType::Track.as_query(), "track");
}

#[test]
fn test_default_scopes() {
    assert!(DEFAULT_SCOPES.contains(&"user-read-recently-played"));
    assert!(DEFAULT_SCOPES.contains(&"user-top-read"));
    assert!(!DEFAULT_SCOPES.contains(&"user-follow-read"));
}
