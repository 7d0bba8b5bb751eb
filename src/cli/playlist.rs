use chrono::Local;
use tabled::Table;

use crate::{
    cli, error, info,
    spotify::{features::FeatureFetcher, playlist, user},
    success,
    types::{CreatePlaylistRequest, RecommendationSeed, SeedQueries, TimeRange},
    utils, warning,
};

/// Creates a playlist of recommendations tuned to the user's average energy,
/// valence and danceability. Seeds come from `seeds` when given, otherwise
/// from the user's top tracks.
pub async fn generate(
    name: Option<String>,
    time_range: TimeRange,
    limit: u32,
    seeds: SeedQueries,
) {
    let gateway = cli::gateway();

    let profile = match user::get_user_profile(&gateway).await {
        Ok(profile) => profile,
        Err(e) => cli::api_failure(e),
    };

    let top_tracks = match user::get_top_tracks(&gateway, time_range, 20).await {
        Ok(tracks) => tracks,
        Err(e) => cli::api_failure(e),
    };
    let top_ids: Vec<String> = top_tracks.into_iter().filter_map(|t| t.id).collect();

    let mut seed = RecommendationSeed {
        limit: Some(limit),
        ..Default::default()
    };

    if seeds.is_empty() {
        if top_ids.is_empty() {
            error!(
                "No top tracks to seed recommendations with. Pass --seed-artist, --seed-track or --seed-genre."
            );
        }
        seed.seed_tracks = top_ids
            .iter()
            .take(playlist::MAX_RECOMMENDATION_SEEDS)
            .cloned()
            .collect();
    } else {
        let pb = cli::spinner("Resolving seeds...");
        let resolved = playlist::resolve_seeds(&gateway, &seeds).await;
        pb.finish_and_clear();

        let resolved = match resolved {
            Ok(resolved) => resolved,
            Err(e) => cli::api_failure(e),
        };
        for query in &resolved.unresolved {
            warning!("No seed found for '{}', skipping.", query);
        }
        if resolved.dropped > 0 {
            warning!(
                "Only {} seeds are allowed, {} ignored.",
                playlist::MAX_RECOMMENDATION_SEEDS,
                resolved.dropped
            );
        }
        if resolved.is_empty() {
            error!("None of the given seeds could be resolved.");
        }

        seed.seed_artists = resolved.artists;
        seed.seed_tracks = resolved.tracks;
        seed.seed_genres = resolved.genres;
    }

    if top_ids.is_empty() {
        warning!("No top tracks to tune the recommendations to, using seeds only.");
    } else {
        match FeatureFetcher::new(gateway.clone())
            .fetch_features(&top_ids)
            .await
        {
            Ok(outcome) if !outcome.succeeded.is_empty() => {
                let summary = utils::summarize_features(&outcome.succeeded);
                seed.target_energy = Some(summary.energy);
                seed.target_valence = Some(summary.valence);
                seed.target_danceability = Some(summary.danceability);
            }
            Ok(_) => warning!("No audio features for your top tracks, using seeds only."),
            Err(e) => cli::api_failure(e),
        }
    }

    let pb = cli::spinner("Fetching recommendations...");
    let recommendations = playlist::get_recommendations(&gateway, &seed).await;
    pb.finish_and_clear();

    let uris: Vec<String> = match recommendations {
        Ok(r) => r.tracks.into_iter().map(|t| t.uri).collect(),
        Err(e) => cli::api_failure(e),
    };
    if uris.is_empty() {
        error!("Spotify returned no recommendations.");
    }

    let name =
        name.unwrap_or_else(|| format!("Spotlyze Mix {}", Local::now().format("%Y-%m-%d")));
    let request = CreatePlaylistRequest {
        name: name.clone(),
        description: "Generated by spotlyze from your top tracks.".to_string(),
        public: false,
        collaborative: false,
    };

    info!("Create playlist {}", name);
    let created = match playlist::create_playlist(&gateway, &profile.id, &request).await {
        Ok(created) => created,
        Err(e) => cli::api_failure(e),
    };

    match playlist::add_tracks(&gateway, &created.id, &uris).await {
        Ok(_) => success!("Playlist {} created with {} tracks.", name, uris.len()),
        Err(e) => {
            warning!("Playlist {} created, but adding tracks failed.", name);
            cli::api_failure(e)
        }
    }
}

/// Lists the playlists of the current user.
pub async fn list(limit: u32) {
    let gateway = cli::gateway();
    let pb = cli::spinner("Fetching playlists...");
    let result = user::get_user_playlists(&gateway, limit).await;
    pb.finish_and_clear();

    match result {
        Ok(playlists) if playlists.is_empty() => info!("No playlists found."),
        Ok(playlists) => println!("{}", Table::new(utils::playlist_rows(&playlists))),
        Err(e) => cli::api_failure(e),
    }
}
