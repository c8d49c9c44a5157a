//! megamap-build library interface
//!
//! Fetches recent notable observations shard by shard, keeps the classified
//! rarities, caps and aggregates them into map markers, and writes the marker
//! document and build summary.

pub mod cli;
pub mod ebird;
pub mod fetcher;
pub mod pipeline;
pub mod regions;
pub mod render;
pub mod summary;

pub use ebird::{EbirdClient, EbirdObservation, FetchError, QueryParams};
pub use fetcher::{FetchReport, ObservationSource, RegionShardedFetcher};
pub use summary::BuildSummary;

use megamap_common::config::BuildConfig;
use megamap_common::output::{to_pretty_json, write_atomic};
use megamap_common::{ResolvedRarity, Result};
use std::path::PathBuf;
use tracing::info;

/// Paths and summary of a finished build
#[derive(Debug, Clone)]
pub struct BuildOutcome {
    pub summary: BuildSummary,
    pub markers_path: PathBuf,
    pub summary_path: PathBuf,
}

/// Build the map from every region shard
pub async fn run<S: ObservationSource + ?Sized>(
    config: &BuildConfig,
    source: &S,
) -> Result<BuildOutcome> {
    run_regions(config, source, regions::all_regions()).await
}

/// Build the map from the given shards.
///
/// Tier files are loaded before the first request; nothing is written until
/// the ceiling check and the output guard have passed.
pub async fn run_regions<S: ObservationSource + ?Sized>(
    config: &BuildConfig,
    source: &S,
    regions: Vec<String>,
) -> Result<BuildOutcome> {
    let rarity = ResolvedRarity::load(&config.tiers_dir, &config.tiers)?;
    for (tier, count) in rarity.counts() {
        info!(tier = %tier, species = count, "Loaded tier");
    }

    let report = RegionShardedFetcher::new(source, regions, config)
        .fetch_all()
        .await;

    let shards_queried = report.shards_queried;
    let count_duplicates = report.duplicates;
    let dropped_no_coords = report.dropped_no_coords;
    let output = pipeline::process(report.records, &rarity, config)?;
    let markers_text = render::render_markers(&output.markers)?;

    let mut summary = BuildSummary::for_config(config, chrono::Utc::now());
    summary.per_code_counts = rarity.counts();
    summary.shards_queried = shards_queried;
    summary.count_duplicates = count_duplicates;
    summary.dropped_no_coords = dropped_no_coords;
    summary.count_raw = output.count_raw;
    summary.count_candidates = output.count_candidates;
    summary.count_megas = output.count_megas;
    summary.count_markers = output.markers.len();
    summary.dropped_empty_code = output.dropped_empty_code;
    summary.dropped_unclassified = output.dropped_unclassified;
    summary.failed_regions = report.failed_regions;
    summary.markers_bytes = markers_text.len();
    let summary_text = to_pretty_json(&summary)?;

    let markers_path = config.out_dir.join(render::MARKERS_FILE);
    let summary_path = config.out_dir.join(summary::SUMMARY_FILE);
    write_atomic(&markers_path, markers_text.as_bytes())?;
    write_atomic(&summary_path, summary_text.as_bytes())?;

    info!(
        "Wrote {} markers ({} bytes) to {}",
        summary.count_markers,
        summary.markers_bytes,
        markers_path.display()
    );

    Ok(BuildOutcome {
        summary,
        markers_path,
        summary_path,
    })
}
