use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use async_trait::async_trait;
use tokio::time::sleep;

use crate::{
    error::ApiError,
    spotify::gateway::Gateway,
    types::{AudioFeatures, AudioFeaturesResponse},
    utils, warning,
};

/// Most ids Spotify accepts in one audio-features request.
pub const AUDIO_FEATURES_BATCH_SIZE: usize = 100;

/// Pause between two batch requests.
pub const BATCH_DELAY: Duration = Duration::from_millis(200);

/// Spaces out consecutive batch requests.
#[async_trait]
pub trait Throttle: Send + Sync {
    async fn pause(&self);
}

pub struct FixedDelay(pub Duration);

#[async_trait]
impl Throttle for FixedDelay {
    async fn pause(&self) {
        sleep(self.0).await;
    }
}

/// Outcome of one batch request.
#[derive(Debug)]
pub enum BatchResult {
    Fetched(Vec<AudioFeatures>),
    Skipped { batch: usize, error: ApiError },
}

#[derive(Debug, Clone, Default)]
pub struct FeatureFetchOutcome {
    pub succeeded: Vec<AudioFeatures>,
    pub requested_count: usize,
    pub succeeded_count: usize,
    pub skipped_batches: usize,
    pub elapsed: Duration,
}

impl FeatureFetchOutcome {
    /// Share of requested tracks that came back with features.
    pub fn success_ratio(&self) -> f64 {
        if self.requested_count == 0 {
            return 0.0;
        }
        self.succeeded_count as f64 / self.requested_count as f64
    }

    pub fn is_partial(&self) -> bool {
        self.succeeded_count < self.requested_count
    }
}

/// Fetches audio features for any number of tracks in provider-sized
/// batches, one after another.
pub struct FeatureFetcher {
    gateway: Gateway,
    throttle: Arc<dyn Throttle>,
    batch_size: usize,
}

impl FeatureFetcher {
    pub fn new(gateway: Gateway) -> Self {
        Self {
            gateway,
            throttle: Arc::new(FixedDelay(BATCH_DELAY)),
            batch_size: AUDIO_FEATURES_BATCH_SIZE,
        }
    }

    pub fn with_throttle(mut self, throttle: Arc<dyn Throttle>) -> Self {
        self.throttle = throttle;
        self
    }

    /// A failing batch contributes no features and does not stop the
    /// others. Only [`ApiError::Unauthorized`] aborts the remaining batches
    /// and is returned.
    pub async fn fetch_features<S: AsRef<str>>(
        &self,
        track_ids: &[S],
    ) -> Result<FeatureFetchOutcome, ApiError> {
        let started = Instant::now();
        let ids = utils::valid_track_ids(track_ids);

        if ids.is_empty() {
            return Ok(FeatureFetchOutcome::default());
        }

        let batches: Vec<&[String]> = ids.chunks(self.batch_size).collect();
        let total = batches.len();
        let mut succeeded = Vec::with_capacity(ids.len());
        let mut skipped_batches = 0;

        for (index, batch) in batches.into_iter().enumerate() {
            if index > 0 {
                self.throttle.pause().await;
            }

            match self.fetch_batch(index, batch).await {
                BatchResult::Fetched(features) => succeeded.extend(features),
                BatchResult::Skipped { error, .. } if error.is_unauthorized() => {
                    return Err(error);
                }
                BatchResult::Skipped { batch: skipped, error } => {
                    warning!(
                        "Batch {}/{} ({} tracks) skipped: {}",
                        skipped + 1,
                        total,
                        batch.len(),
                        error
                    );
                    skipped_batches += 1;
                }
            }
        }

        Ok(FeatureFetchOutcome {
            requested_count: ids.len(),
            succeeded_count: succeeded.len(),
            succeeded,
            skipped_batches,
            elapsed: started.elapsed(),
        })
    }

    async fn fetch_batch(&self, index: usize, ids: &[String]) -> BatchResult {
        match self.request_batch(ids).await {
            // unresolvable ids come back as null
            Ok(response) => {
                BatchResult::Fetched(response.audio_features.into_iter().flatten().collect())
            }
            Err(error) => BatchResult::Skipped {
                batch: index,
                error,
            },
        }
    }

    /// Ids are base62, so the comma-joined list goes into the query as is.
    async fn request_batch(&self, ids: &[String]) -> Result<AudioFeaturesResponse, ApiError> {
        let mut url = self.gateway.url("audio-features")?;
        url.set_query(Some(&format!("ids={}", ids.join(","))));
        self.gateway.get_json_url(url).await
    }
}
