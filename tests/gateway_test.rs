mod common;

use std::{
    collections::{HashMap, VecDeque},
    sync::{Arc, Mutex},
    time::Duration,
};

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::{
        HeaderMap, HeaderValue, StatusCode,
        header::{AUTHORIZATION, CONTENT_TYPE, HOST, RETRY_AFTER},
    },
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde_json::{Value, json};
use spotlyze::{
    error::ApiError,
    management::{CredentialStore, StorageArea},
    spotify::{playlist, search, user},
    types::{AuthState, SearchType, SeedQueries, TimeRange},
};
use tokio::{sync::mpsc, time::timeout};

use common::{Recorder, gateway, logged_in_store, start_mock_server};

#[derive(Clone)]
struct ApiMock {
    recorder: Recorder,
    // popped per call, the last one repeats
    responses: Arc<Mutex<VecDeque<(StatusCode, Value)>>>,
    retry_after: Option<&'static str>,
}

impl ApiMock {
    fn new(responses: Vec<(StatusCode, Value)>) -> Self {
        Self {
            recorder: Recorder::default(),
            responses: Arc::new(Mutex::new(responses.into())),
            retry_after: None,
        }
    }

    fn next_response(&self) -> (StatusCode, Value) {
        let mut responses = self.responses.lock().unwrap();
        if responses.len() > 1 {
            responses.pop_front().unwrap()
        } else {
            responses.front().cloned().unwrap()
        }
    }
}

async fn endpoint(
    State(mock): State<ApiMock>,
    headers: HeaderMap,
    Query(mut call): Query<HashMap<String, String>>,
) -> Response {
    for name in [AUTHORIZATION, CONTENT_TYPE] {
        if let Some(value) = headers.get(&name) {
            call.insert(name.to_string(), value.to_str().unwrap().to_string());
        }
    }
    mock.recorder.record(call);

    let (status, body) = mock.next_response();
    let mut response = (status, Json(body)).into_response();
    if let Some(retry_after) = mock.retry_after {
        response
            .headers_mut()
            .insert(RETRY_AFTER, HeaderValue::from_static(retry_after));
    }
    response
}

async fn serve(mock: ApiMock) -> String {
    let app = Router::new()
        .route("/v1/me", get(endpoint))
        .route("/v1/me/top/tracks", get(endpoint))
        .route("/v1/playlists/{id}", get(endpoint))
        .with_state(mock);
    let (base, _handle) = start_mock_server(app).await;
    base
}

fn profile() -> Value {
    json!({
        "id": "user-1",
        "display_name": "Test User",
        "followers": { "total": 3 },
        "images": []
    })
}

fn api_error(status: u16, message: &str) -> Value {
    json!({ "error": { "status": status, "message": message } })
}

#[tokio::test]
async fn test_bearer_token_is_injected() {
    let mock = ApiMock::new(vec![(StatusCode::OK, profile())]);
    let base = serve(mock.clone()).await;
    let store = logged_in_store(&StorageArea::memory()).await;

    let me = user::get_user_profile(&gateway(&base, store)).await.unwrap();

    assert_eq!(me.id, "user-1");
    assert_eq!(me.followers.total, 3);
    let calls = mock.recorder.calls();
    assert_eq!(calls[0]["authorization"], "Bearer valid-token");
    assert_eq!(calls[0]["content-type"], "application/json");
}

#[tokio::test]
async fn test_request_without_credential_has_no_token() {
    let mock = ApiMock::new(vec![(StatusCode::OK, profile())]);
    let base = serve(mock.clone()).await;
    let store = CredentialStore::new(StorageArea::memory());

    user::get_user_profile(&gateway(&base, store)).await.unwrap();

    assert!(!mock.recorder.calls()[0].contains_key("authorization"));
}

#[tokio::test]
async fn test_unauthorized_clears_session_once() {
    let mock = ApiMock::new(vec![(
        StatusCode::UNAUTHORIZED,
        api_error(401, "The access token expired"),
    )]);
    let base = serve(mock.clone()).await;

    let area = StorageArea::memory();
    let store = logged_in_store(&area).await;
    let other_context = CredentialStore::new(area.clone());

    let (tx, mut rx) = mpsc::unbounded_channel();
    let _subscription = other_context.on_external_change(move |state| {
        let _ = tx.send(state);
    });

    let gateway = gateway(&base, store.clone());
    let result = user::get_user_profile(&gateway).await;

    assert!(matches!(result, Err(ApiError::Unauthorized)));
    assert!(store.load().await.is_none());

    let state = timeout(Duration::from_secs(2), rx.recv()).await.unwrap();
    assert_eq!(state, Some(AuthState::Unauthenticated));

    // nothing left to clear, nothing to announce
    let result = user::get_user_profile(&gateway).await;
    assert!(matches!(result, Err(ApiError::Unauthorized)));
    assert!(timeout(Duration::from_millis(300), rx.recv()).await.is_err());
}

#[tokio::test]
async fn test_forbidden_passes_through() {
    let mock = ApiMock::new(vec![(
        StatusCode::FORBIDDEN,
        api_error(403, "Insufficient client scope"),
    )]);
    let base = serve(mock).await;
    let store = logged_in_store(&StorageArea::memory()).await;

    let result = user::get_user_profile(&gateway(&base, store.clone())).await;

    match result {
        Err(ApiError::Forbidden(message)) => assert_eq!(message, "Insufficient client scope"),
        other => panic!("unexpected result {:?}", other),
    }
    assert!(store.load().await.is_some());
}

#[tokio::test]
async fn test_playlist_not_found() {
    let mock = ApiMock::new(vec![(
        StatusCode::NOT_FOUND,
        api_error(404, "Resource not found"),
    )]);
    let base = serve(mock).await;
    let store = logged_in_store(&StorageArea::memory()).await;

    let result = playlist::get_playlist(&gateway(&base, store.clone()), "missing").await;

    match result {
        Err(ApiError::NotFound(message)) => assert_eq!(message, "Playlist missing not found."),
        other => panic!("unexpected result {:?}", other),
    }
    assert!(store.load().await.is_some());
}

#[tokio::test]
async fn test_rate_limited_carries_retry_after() {
    let mut mock = ApiMock::new(vec![(
        StatusCode::TOO_MANY_REQUESTS,
        api_error(429, "API rate limit exceeded"),
    )]);
    mock.retry_after = Some("7");
    let base = serve(mock.clone()).await;
    let store = logged_in_store(&StorageArea::memory()).await;

    let result = user::get_user_profile(&gateway(&base, store.clone())).await;

    match result {
        Err(error @ ApiError::RateLimited { .. }) => {
            assert!(error.is_retryable());
            assert!(matches!(
                error,
                ApiError::RateLimited {
                    retry_after: Some(wait)
                } if wait == Duration::from_secs(7)
            ));
            assert_eq!(
                error.user_message(),
                "Too many requests. Wait 7 seconds and try again."
            );
        }
        other => panic!("unexpected result {:?}", other),
    }
    assert_eq!(mock.recorder.count(), 1);
    assert!(store.load().await.is_some());
}

#[tokio::test]
async fn test_bad_gateway_is_retried() {
    let mock = ApiMock::new(vec![
        (StatusCode::BAD_GATEWAY, json!({})),
        (StatusCode::BAD_GATEWAY, json!({})),
        (StatusCode::OK, profile()),
    ]);
    let base = serve(mock.clone()).await;
    let store = logged_in_store(&StorageArea::memory()).await;
    let gateway = gateway(&base, store).with_retry_pause(Duration::from_millis(10));

    let me = user::get_user_profile(&gateway).await.unwrap();

    assert_eq!(me.id, "user-1");
    assert_eq!(mock.recorder.count(), 3);
}

#[tokio::test]
async fn test_bad_gateway_gives_up() {
    let mock = ApiMock::new(vec![(StatusCode::BAD_GATEWAY, json!({}))]);
    let base = serve(mock.clone()).await;
    let store = logged_in_store(&StorageArea::memory()).await;
    let gateway = gateway(&base, store).with_retry_pause(Duration::from_millis(10));

    let result = user::get_user_profile(&gateway).await;

    match result {
        Err(error @ ApiError::Status { status, .. }) => {
            assert_eq!(status, StatusCode::BAD_GATEWAY);
            assert!(error.is_retryable());
        }
        other => panic!("unexpected result {:?}", other),
    }
    assert_eq!(mock.recorder.count(), 3);
}

#[tokio::test]
async fn test_malformed_body_is_decode_error() {
    let mock = ApiMock::new(vec![(StatusCode::OK, json!({ "unexpected": true }))]);
    let base = serve(mock).await;
    let store = logged_in_store(&StorageArea::memory()).await;

    let result = user::get_user_profile(&gateway(&base, store)).await;
    assert!(matches!(result, Err(ApiError::Decode(_))));
}

#[tokio::test]
async fn test_top_tracks_query() {
    let mock = ApiMock::new(vec![(
        StatusCode::OK,
        json!({
            "items": [{
                "id": "t1",
                "name": "Get Lucky",
                "uri": "spotify:track:t1",
                "artists": [{ "id": "a1", "name": "Daft Punk" }],
                "album": { "id": "al1", "name": "Random Access Memories", "release_date": "2013-05-17" },
                "duration_ms": 248000,
                "popularity": 80
            }],
            "total": 1,
            "next": null
        }),
    )]);
    let base = serve(mock.clone()).await;
    let store = logged_in_store(&StorageArea::memory()).await;

    let tracks = user::get_top_tracks(&gateway(&base, store), TimeRange::ShortTerm, 80)
        .await
        .unwrap();

    assert_eq!(tracks.len(), 1);
    assert_eq!(tracks[0].artists[0].name, "Daft Punk");
    let calls = mock.recorder.calls();
    assert_eq!(calls[0]["time_range"], "short_term");
    assert_eq!(calls[0]["limit"], "50");
}

fn track_item(id: Option<&str>) -> Value {
    json!({
        "added_at": "2024-01-01T00:00:00Z",
        "track": {
            "id": id,
            "name": "Track",
            "uri": id.map(|id| format!("spotify:track:{id}")).unwrap_or_else(|| "spotify:local:x".into()),
            "artists": [],
            "album": null,
            "duration_ms": 1000,
            "popularity": null
        }
    })
}

async fn paged_playlist(headers: HeaderMap) -> Json<Value> {
    let host = headers.get(HOST).unwrap().to_str().unwrap().to_string();
    Json(json!({
        "id": "p1",
        "name": "Mix",
        "description": null,
        "public": false,
        "collaborative": false,
        "snapshot_id": "s0",
        "owner": { "id": "user-1", "display_name": "Test User" },
        "tracks": {
            "total": 3,
            "items": [track_item(Some("t1")), track_item(None)],
            "next": format!("http://{host}/v1/playlists/p1/tracks?offset=2&limit=2")
        }
    }))
}

async fn playlist_page() -> Json<Value> {
    Json(json!({ "items": [track_item(Some("t3"))], "total": 3, "next": null }))
}

#[tokio::test]
async fn test_playlist_items_follow_paging() {
    let app = Router::new()
        .route("/v1/playlists/{id}", get(paged_playlist))
        .route("/v1/playlists/{id}/tracks", get(playlist_page));
    let (base, _handle) = start_mock_server(app).await;
    let store = logged_in_store(&StorageArea::memory()).await;
    let gateway = gateway(&base, store);

    let list = playlist::get_playlist(&gateway, "p1").await.unwrap();
    let items = playlist::get_all_playlist_items(&gateway, &list).await.unwrap();

    assert_eq!(items.len(), 3);
    // local files have no id
    assert_eq!(playlist::track_ids(&items), vec!["t1", "t3"]);
}

async fn add_tracks(
    State(recorder): State<Recorder>,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> Json<Value> {
    let count = body["uris"].as_array().map(Vec::len).unwrap_or_default();
    recorder.record(HashMap::from([
        ("playlist".to_string(), id),
        ("count".to_string(), count.to_string()),
    ]));
    Json(json!({ "snapshot_id": format!("snap-{}", recorder.count()) }))
}

#[tokio::test]
async fn test_add_tracks_in_chunks() {
    let recorder = Recorder::default();
    let app = Router::new()
        .route("/v1/playlists/{id}/tracks", post(add_tracks))
        .with_state(recorder.clone());
    let (base, _handle) = start_mock_server(app).await;
    let store = logged_in_store(&StorageArea::memory()).await;

    let uris: Vec<String> = (0..250).map(|i| format!("spotify:track:t{i}")).collect();
    let snapshots = playlist::add_tracks(&gateway(&base, store), "p1", &uris)
        .await
        .unwrap();

    assert_eq!(snapshots, vec!["snap-1", "snap-2", "snap-3"]);
    let counts: Vec<String> = recorder
        .calls()
        .into_iter()
        .map(|call| call["count"].clone())
        .collect();
    assert_eq!(counts, vec!["100", "100", "50"]);
    assert!(recorder.calls().iter().all(|call| call["playlist"] == "p1"));
}

async fn catalog_search(
    State(recorder): State<Recorder>,
    Query(query): Query<HashMap<String, String>>,
) -> Json<Value> {
    recorder.record(query.clone());
    let q = query.get("q").cloned().unwrap_or_default();
    let kind = query.get("type").cloned().unwrap_or_default();

    match kind.as_str() {
        "artist" if q == "nobody" => Json(json!({ "artists": { "items": [], "total": 0 } })),
        "artist" => Json(json!({
            "artists": {
                "items": [{ "id": format!("artist-{q}"), "name": q, "genres": ["house"], "popularity": 70 }],
                "total": 1
            }
        })),
        "track" => Json(json!({
            "tracks": {
                "items": [{
                    "id": format!("track-{q}"),
                    "name": q,
                    "uri": format!("spotify:track:{q}"),
                    "artists": [],
                    "album": null,
                    "duration_ms": 1000,
                    "popularity": 10
                }],
                "total": 1
            }
        })),
        _ => Json(json!({ "albums": { "items": [] } })),
    }
}

async fn genre_seeds(State(recorder): State<Recorder>) -> Json<Value> {
    recorder.record(HashMap::new());
    Json(json!({ "genres": ["house", "techno", "jazz"] }))
}

async fn recently_played(Query(query): Query<HashMap<String, String>>) -> Json<Value> {
    assert_eq!(query.get("limit").map(String::as_str), Some("50"));
    Json(json!({
        "items": [{
            "played_at": "2024-05-01T20:15:00.000Z",
            "track": {
                "id": "t1",
                "name": "Around the World",
                "uri": "spotify:track:t1",
                "artists": [{ "id": "a1", "name": "Daft Punk" }],
                "album": null,
                "duration_ms": 1000,
                "popularity": 60
            },
            "context": null
        }],
        "next": null,
        "cursors": { "after": "1", "before": "0" }
    }))
}

struct Catalog {
    base: String,
    searches: Recorder,
    genre_calls: Recorder,
}

async fn serve_catalog() -> Catalog {
    let searches = Recorder::default();
    let genre_calls = Recorder::default();
    let app = Router::new()
        .route("/v1/search", get(catalog_search).with_state(searches.clone()))
        .route(
            "/v1/recommendations/available-genre-seeds",
            get(genre_seeds).with_state(genre_calls.clone()),
        )
        .route("/v1/me/player/recently-played", get(recently_played));
    let (base, _handle) = start_mock_server(app).await;
    Catalog {
        base,
        searches,
        genre_calls,
    }
}

#[tokio::test]
async fn test_search_returns_items_of_requested_type() {
    let catalog = serve_catalog().await;
    let store = logged_in_store(&StorageArea::memory()).await;

    let artists = search::search_artists(&gateway(&catalog.base, store), "Daft Punk", 80)
        .await
        .unwrap();

    assert_eq!(artists.len(), 1);
    assert_eq!(artists[0].id, "artist-Daft Punk");
    let calls = catalog.searches.calls();
    assert_eq!(calls[0]["q"], "Daft Punk");
    assert_eq!(calls[0]["type"], "artist");
    assert_eq!(calls[0]["limit"], "50");
}

#[tokio::test]
async fn test_blank_search_makes_no_request() {
    let catalog = serve_catalog().await;
    let store = logged_in_store(&StorageArea::memory()).await;

    let tracks = search::search_tracks(&gateway(&catalog.base, store), "   ", 10)
        .await
        .unwrap();

    assert!(tracks.is_empty());
    assert_eq!(catalog.searches.count(), 0);
}

#[tokio::test]
async fn test_search_without_result_page_is_decode_error() {
    let catalog = serve_catalog().await;
    let store = logged_in_store(&StorageArea::memory()).await;

    // the mock answers playlist searches with an albums page
    let result = search::search::<Value>(
        &gateway(&catalog.base, store),
        "anything",
        SearchType::Playlist,
        10,
    )
    .await;

    assert!(matches!(result, Err(ApiError::Decode(_))));
}

#[tokio::test]
async fn test_available_genres() {
    let catalog = serve_catalog().await;
    let store = logged_in_store(&StorageArea::memory()).await;

    let genres = playlist::get_available_genres(&gateway(&catalog.base, store))
        .await
        .unwrap();

    assert_eq!(genres, vec!["house", "techno", "jazz"]);
}

#[tokio::test]
async fn test_recently_played() {
    let catalog = serve_catalog().await;
    let store = logged_in_store(&StorageArea::memory()).await;

    let items = user::get_recently_played(&gateway(&catalog.base, store), 200)
        .await
        .unwrap();

    assert_eq!(items.len(), 1);
    assert_eq!(items[0].played_at, "2024-05-01T20:15:00.000Z");
    assert_eq!(items[0].track.artists[0].name, "Daft Punk");
}

#[tokio::test]
async fn test_resolve_seeds() {
    let catalog = serve_catalog().await;
    let store = logged_in_store(&StorageArea::memory()).await;
    let queries = SeedQueries {
        artists: vec!["Daft Punk".to_string(), "nobody".to_string()],
        tracks: vec!["One More Time".to_string()],
        genres: vec![" House ".to_string(), "polka".to_string()],
    };

    let resolved = playlist::resolve_seeds(&gateway(&catalog.base, store), &queries)
        .await
        .unwrap();

    assert_eq!(resolved.artists, vec!["artist-Daft Punk"]);
    assert_eq!(resolved.tracks, vec!["track-One More Time"]);
    assert_eq!(resolved.genres, vec!["house"]);
    assert_eq!(resolved.unresolved, vec!["nobody", "polka"]);
    assert_eq!(resolved.dropped, 0);
    assert_eq!(catalog.genre_calls.count(), 1);
}

#[tokio::test]
async fn test_resolve_seeds_caps_at_maximum() {
    let catalog = serve_catalog().await;
    let store = logged_in_store(&StorageArea::memory()).await;
    let queries = SeedQueries {
        artists: (0..4).map(|i| format!("artist{i}")).collect(),
        tracks: vec!["a".to_string(), "b".to_string()],
        genres: vec!["jazz".to_string()],
    };

    let resolved = playlist::resolve_seeds(&gateway(&catalog.base, store), &queries)
        .await
        .unwrap();

    assert_eq!(resolved.len(), playlist::MAX_RECOMMENDATION_SEEDS);
    assert_eq!(resolved.artists.len(), 4);
    assert_eq!(resolved.tracks, vec!["track-a"]);
    assert!(resolved.genres.is_empty());
    assert_eq!(resolved.dropped, 2);
}

#[tokio::test]
async fn test_resolve_seeds_without_genres_skips_genre_lookup() {
    let catalog = serve_catalog().await;
    let store = logged_in_store(&StorageArea::memory()).await;
    let queries = SeedQueries {
        tracks: vec!["a".to_string()],
        ..Default::default()
    };

    playlist::resolve_seeds(&gateway(&catalog.base, store), &queries)
        .await
        .unwrap();

    assert_eq!(catalog.genre_calls.count(), 0);
}

#[tokio::test]
async fn test_unreachable_api_is_transport_error() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let store = logged_in_store(&StorageArea::memory()).await;
    let base = format!("http://127.0.0.1:{port}");
    let result = user::get_user_profile(&gateway(&base, store.clone())).await;

    match result {
        Err(error @ ApiError::Transport(_)) => assert!(error.is_retryable()),
        other => panic!("unexpected result {:?}", other),
    }
    // only a 401 ends the session
    assert!(store.load().await.is_some());
}
