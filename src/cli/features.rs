use tabled::Table;

use crate::{
    cli, error, info,
    spotify::{features::FeatureFetcher, playlist, user},
    success,
    types::TimeRange,
    utils, warning,
};

/// Where the analyzed track ids come from.
pub enum FeatureSource {
    Tracks(Vec<String>),
    Playlist(String),
    Top(TimeRange, u32),
}

/// Fetches audio features and prints their averages.
pub async fn features(source: FeatureSource) {
    let gateway = cli::gateway();

    let track_ids = match source {
        FeatureSource::Tracks(ids) => ids,
        FeatureSource::Playlist(id) => {
            let pb = cli::spinner("Loading playlist...");
            let items = match playlist::get_playlist(&gateway, &id).await {
                Ok(list) => {
                    info!("Playlist: {} ({} tracks)", list.name, list.tracks.total);
                    playlist::get_all_playlist_items(&gateway, &list).await
                }
                Err(e) => Err(e),
            };
            pb.finish_and_clear();
            match items {
                Ok(items) => playlist::track_ids(&items),
                Err(e) => cli::api_failure(e),
            }
        }
        FeatureSource::Top(time_range, limit) => {
            match user::get_top_tracks(&gateway, time_range, limit).await {
                Ok(tracks) => tracks.into_iter().filter_map(|t| t.id).collect(),
                Err(e) => cli::api_failure(e),
            }
        }
    };

    if track_ids.is_empty() {
        warning!("No tracks to analyze.");
        return;
    }

    let pb = cli::spinner(&format!("Analyzing {} tracks...", track_ids.len()));
    let result = FeatureFetcher::new(gateway)
        .fetch_features(&track_ids)
        .await;
    pb.finish_and_clear();

    let outcome = match result {
        Ok(outcome) => outcome,
        Err(e) => cli::api_failure(e),
    };

    if outcome.succeeded.is_empty() {
        error!(
            "No audio features available for {} tracks.",
            outcome.requested_count
        );
    }

    let summary = utils::summarize_features(&outcome.succeeded);
    println!("{}", Table::new(utils::feature_summary_rows(&summary)));

    if outcome.is_partial() {
        warning!(
            "Analyzed {}/{} tracks ({:.1}%) in {} ms",
            outcome.succeeded_count,
            outcome.requested_count,
            outcome.success_ratio() * 100.0,
            outcome.elapsed.as_millis()
        );
    } else {
        success!(
            "Analyzed {} tracks in {} ms",
            outcome.succeeded_count,
            outcome.elapsed.as_millis()
        );
    }
}
