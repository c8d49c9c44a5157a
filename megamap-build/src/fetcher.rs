//! Region-sharded fetch of recent notable observations
//!
//! Shards are queried strictly one after another with a fixed courtesy delay
//! between requests. A shard that keeps answering 429 is retried a bounded
//! number of times with exponential backoff; any shard failure is logged and
//! skipped so that one bad region never sinks the whole build.

use crate::ebird::{EbirdObservation, FetchError, QueryParams};
use async_trait::async_trait;
use megamap_common::config::BuildConfig;
use megamap_common::{DedupKey, Observation};
use std::collections::HashSet;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

/// Backoff never grows past this
const MAX_BACKOFF: Duration = Duration::from_secs(8);

/// Cumulative progress is logged every this many shards
const PROGRESS_EVERY: usize = 10;

/// Transport for notable observations of one region
#[async_trait]
pub trait ObservationSource: Send + Sync {
    async fn recent_notable(
        &self,
        region: &str,
        params: &QueryParams,
    ) -> Result<Vec<EbirdObservation>, FetchError>;
}

/// Enforces a minimum interval between consecutive requests
pub struct ShardPacer {
    last_request: Mutex<Option<Instant>>,
    min_interval: Duration,
}

impl ShardPacer {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            last_request: Mutex::new(None),
            min_interval,
        }
    }

    /// Wait if necessary to keep the minimum interval
    pub async fn wait(&self) {
        let mut last = self.last_request.lock().await;

        if let Some(last_time) = *last {
            let elapsed = last_time.elapsed();
            if elapsed < self.min_interval {
                let wait_time = self.min_interval - elapsed;
                debug!("Shard pacing: waiting {:?}", wait_time);
                tokio::time::sleep(wait_time).await;
            }
        }

        *last = Some(Instant::now());
    }
}

/// Bounded retry on 429
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts per shard, first one included
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
            max_delay: MAX_BACKOFF,
        }
    }

    /// Delay after failed attempt `attempt` (1-based): base, 2x base, 4x base...
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.base_delay
            .checked_mul(factor)
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }
}

/// Outcome of a full sharded fetch
#[derive(Debug, Clone, Default)]
pub struct FetchReport {
    /// De-duplicated records, first-seen order
    pub records: Vec<Observation>,
    /// Shards skipped after an error
    pub failed_regions: Vec<String>,
    pub dropped_no_coords: usize,
    pub duplicates: usize,
    pub shards_queried: usize,
}

/// Queries every shard and merges the results
pub struct RegionShardedFetcher<'a, S: ObservationSource + ?Sized> {
    source: &'a S,
    regions: Vec<String>,
    params: QueryParams,
    retry: RetryPolicy,
    pacer: ShardPacer,
}

impl<'a, S: ObservationSource + ?Sized> RegionShardedFetcher<'a, S> {
    pub fn new(source: &'a S, regions: Vec<String>, config: &BuildConfig) -> Self {
        Self {
            source,
            regions,
            params: QueryParams::new(config.back_days),
            retry: RetryPolicy::new(config.max_attempts, config.retry_base_delay),
            pacer: ShardPacer::new(config.inter_shard_delay),
        }
    }

    /// Fetch one shard, retrying on 429 up to the attempt limit
    pub async fn fetch_region(&self, region: &str) -> Result<Vec<EbirdObservation>, FetchError> {
        let mut attempt = 0;

        loop {
            attempt += 1;
            self.pacer.wait().await;

            match self.source.recent_notable(region, &self.params).await {
                Ok(records) => {
                    if attempt > 1 {
                        debug!(region = %region, attempt, "Shard succeeded after retry");
                    }
                    return Ok(records);
                }
                Err(FetchError::RateLimited) if attempt < self.retry.max_attempts => {
                    let delay = self.retry.backoff(attempt);
                    warn!(
                        region = %region,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        "Rate limited, backing off"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(FetchError::RateLimited) => {
                    return Err(FetchError::RateLimitExhausted {
                        region: region.to_string(),
                        attempts: attempt,
                    });
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Fetch all shards in order; failures are recorded, never propagated
    pub async fn fetch_all(&self) -> FetchReport {
        let mut report = FetchReport::default();
        let mut seen: HashSet<DedupKey> = HashSet::new();

        for (idx, region) in self.regions.iter().enumerate() {
            report.shards_queried += 1;

            match self.fetch_region(region).await {
                Ok(batch) => {
                    let received = batch.len();
                    for record in batch {
                        let Some(obs) = record.into_observation() else {
                            report.dropped_no_coords += 1;
                            continue;
                        };
                        if seen.insert(obs.dedup_key()) {
                            report.records.push(obs);
                        } else {
                            report.duplicates += 1;
                        }
                    }
                    debug!(region = %region, received, "Shard fetched");
                }
                Err(e) => {
                    error!(region = %region, error = %e, "Shard failed, skipping");
                    report.failed_regions.push(region.clone());
                }
            }

            if (idx + 1) % PROGRESS_EVERY == 0 {
                info!(
                    "Fetched {}/{} shards, {} records so far",
                    idx + 1,
                    self.regions.len(),
                    report.records.len()
                );
            }
        }

        info!(
            records = report.records.len(),
            duplicates = report.duplicates,
            dropped_no_coords = report.dropped_no_coords,
            failed = report.failed_regions.len(),
            "Fetch complete"
        );
        if !report.failed_regions.is_empty() {
            warn!(regions = ?report.failed_regions, "Some shards failed");
        }
        report
    }
}
