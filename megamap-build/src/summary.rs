//! Build summary artifact

use megamap_common::config::{BuildConfig, FilterMode};
use megamap_common::RarityTier;
use serde::Serialize;
use std::collections::BTreeMap;

/// Summary file name
pub const SUMMARY_FILE: &str = "summary.json";

/// Parameters and counts of one map build
#[derive(Debug, Clone, Serialize)]
pub struct BuildSummary {
    pub built_at_utc: String,
    pub recent_days: u32,
    pub national_max: usize,
    pub per_species_max: usize,
    pub hard_ceiling: usize,
    pub mode: FilterMode,
    pub requested_codes: Vec<RarityTier>,
    /// Species per loaded tier
    pub per_code_counts: BTreeMap<RarityTier, usize>,
    pub shards_queried: usize,
    /// Records received again from a later shard
    pub count_duplicates: usize,
    pub dropped_no_coords: usize,
    pub count_raw: usize,
    pub count_candidates: usize,
    pub count_megas: usize,
    pub count_markers: usize,
    pub dropped_empty_code: usize,
    pub dropped_unclassified: usize,
    pub failed_regions: Vec<String>,
    pub markers_bytes: usize,
}

impl BuildSummary {
    /// Summary with the configuration fields filled and every count zero
    pub fn for_config(config: &BuildConfig, built_at: chrono::DateTime<chrono::Utc>) -> Self {
        Self {
            built_at_utc: built_at.format("%Y-%m-%dT%H:%M:%SZ").to_string(),
            recent_days: config.back_days,
            national_max: config.national_max,
            per_species_max: config.per_species_max,
            hard_ceiling: config.hard_ceiling,
            mode: config.mode,
            requested_codes: config.tiers.iter().copied().collect(),
            per_code_counts: BTreeMap::new(),
            shards_queried: 0,
            count_duplicates: 0,
            dropped_no_coords: 0,
            count_raw: 0,
            count_candidates: 0,
            count_megas: 0,
            count_markers: 0,
            dropped_empty_code: 0,
            dropped_unclassified: 0,
            failed_regions: Vec::new(),
            markers_bytes: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_summary_json_fields() {
        let config = BuildConfig::default();
        let built_at = chrono::Utc.with_ymd_and_hms(2025, 1, 15, 12, 0, 0).unwrap();
        let mut summary = BuildSummary::for_config(&config, built_at);
        summary.per_code_counts.insert(RarityTier::new(5).unwrap(), 42);
        summary.failed_regions.push("US-AK".to_string());

        let value = serde_json::to_value(&summary).unwrap();
        assert_eq!(value["built_at_utc"], "2025-01-15T12:00:00Z");
        assert_eq!(value["mode"], "aba5_only");
        assert_eq!(value["recent_days"], 1);
        assert_eq!(value["national_max"], 60);
        assert_eq!(value["requested_codes"], serde_json::json!([5]));
        assert_eq!(value["per_code_counts"]["5"], 42);
        assert_eq!(value["failed_regions"][0], "US-AK");
    }
}
