use chrono::Local;
use tabled::Table;

use crate::{
    cli, info,
    spotify::user,
    types::{RecentPeriod, TimeRange},
    utils,
};

pub async fn profile() {
    let gateway = cli::gateway();
    let profile = match user::get_user_profile(&gateway).await {
        Ok(profile) => profile,
        Err(e) => cli::api_failure(e),
    };

    info!(
        "{} ({})",
        profile.display_name.as_deref().unwrap_or(&profile.id),
        profile.id
    );
    if let Some(email) = &profile.email {
        info!("Email: {}", email);
    }
    if let Some(country) = &profile.country {
        info!("Country: {}", country);
    }
    info!("Followers: {}", profile.followers.total);
}

pub async fn top_artists(time_range: TimeRange, limit: u32) {
    let gateway = cli::gateway();
    let pb = cli::spinner("Fetching top artists...");
    let result = user::get_top_artists(&gateway, time_range, limit).await;
    pb.finish_and_clear();

    match result {
        Ok(artists) if artists.is_empty() => info!("No top artists for this time range."),
        Ok(artists) => println!("{}", Table::new(utils::artist_rows(&artists))),
        Err(e) => cli::api_failure(e),
    }
}

pub async fn top_tracks(time_range: TimeRange, limit: u32) {
    let gateway = cli::gateway();
    let pb = cli::spinner("Fetching top tracks...");
    let result = user::get_top_tracks(&gateway, time_range, limit).await;
    pb.finish_and_clear();

    match result {
        Ok(tracks) if tracks.is_empty() => info!("No top tracks for this time range."),
        Ok(tracks) => println!("{}", Table::new(utils::track_rows(&tracks))),
        Err(e) => cli::api_failure(e),
    }
}

/// Shows the listening history, newest first.
pub async fn recent(period: RecentPeriod, limit: u32) {
    let gateway = cli::gateway();
    let pb = cli::spinner("Fetching recently played tracks...");
    let result = user::get_recently_played(&gateway, limit).await;
    pb.finish_and_clear();

    let items = match result {
        Ok(items) => utils::filter_recent(&items, period, &Local::now()),
        Err(e) => cli::api_failure(e),
    };

    if items.is_empty() {
        info!("No plays in this period.");
        return;
    }

    println!("{}", Table::new(utils::recent_rows(&items)));
    info!("{} plays", items.len());
}
