//! Record processing: filter, cap, check the ceiling, aggregate
//!
//! Pure and synchronous; everything here runs after the fetch has finished.

pub mod aggregator;
pub mod capper;
pub mod filter;

pub use aggregator::{AggregatedMarker, Aggregation, GeoAggregator, MarkerSighting};
pub use capper::{CapOutcome, RecordCapper};
pub use filter::ObservationFilter;

use megamap_common::config::BuildConfig;
use megamap_common::{Error, Observation, ResolvedRarity, Result};
use tracing::info;

/// Counts and markers produced by [`process`]
#[derive(Debug, Clone, Default)]
pub struct PipelineOutput {
    pub count_raw: usize,
    pub count_candidates: usize,
    pub count_megas: usize,
    pub dropped_empty_code: usize,
    pub dropped_unclassified: usize,
    pub markers: Vec<AggregatedMarker>,
}

/// Run the fetched records through every stage.
///
/// Fails with [`Error::HardCeilingExceeded`] when the capped set is still
/// larger than the configured ceiling.
pub fn process(
    records: Vec<Observation>,
    rarity: &ResolvedRarity,
    config: &BuildConfig,
) -> Result<PipelineOutput> {
    let count_raw = records.len();

    let allowed = rarity.union();
    let candidates = ObservationFilter::new(config.mode, &allowed).apply(records);
    let count_candidates = candidates.len();

    let capped = RecordCapper::new(config.per_species_max, config.national_max).apply(candidates);
    let count_megas = capped.records.len();
    info!(
        "Records: {} raw, {} candidates, {} after per-species cap, {} after national cap",
        count_raw, count_candidates, capped.after_species_cap, count_megas
    );

    if count_megas > config.hard_ceiling {
        return Err(Error::HardCeilingExceeded {
            count: count_megas,
            ceiling: config.hard_ceiling,
        });
    }

    let aggregation = GeoAggregator::new(rarity).aggregate(capped.records);
    info!(markers = aggregation.markers.len(), "Aggregated markers");

    Ok(PipelineOutput {
        count_raw,
        count_candidates,
        count_megas,
        dropped_empty_code: capped.dropped_empty_code,
        dropped_unclassified: aggregation.dropped_unclassified,
        markers: aggregation.markers,
    })
}
