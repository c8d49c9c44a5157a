//! Geographic aggregation of capped records into map markers
//!
//! Records sharing a location (rounded to six decimal places) and a species
//! become one marker listing every distinct checklist, newest first.

use super::capper::newest_first;
use chrono::NaiveDateTime;
use megamap_common::{Observation, RarityTier, ResolvedRarity};
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};
use tracing::{debug, warn};

const MICRO_DEGREES: f64 = 1_000_000.0;

/// Coordinate in integer micro-degrees
fn micro(value: f64) -> i64 {
    (value * MICRO_DEGREES).round() as i64
}

/// One checklist listed on a marker
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarkerSighting {
    pub submission_id: String,
    pub observed_at: Option<String>,
    pub count: Option<u32>,
    /// Absent when the record has no submission id
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checklist_url: Option<String>,
}

/// One map marker: a species at a location
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregatedMarker {
    pub lat: f64,
    pub lon: f64,
    pub species_code: String,
    pub common_name: Option<String>,
    pub rarity_tier: RarityTier,
    pub location_name: String,
    pub sightings: Vec<MarkerSighting>,
    #[serde(skip)]
    newest: Option<NaiveDateTime>,
}

/// Markers plus the groups that had no tier
#[derive(Debug, Clone, Default)]
pub struct Aggregation {
    pub markers: Vec<AggregatedMarker>,
    pub dropped_unclassified: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
struct GroupKey {
    lat: i64,
    lon: i64,
    species_code: String,
}

pub struct GeoAggregator<'a> {
    rarity: &'a ResolvedRarity,
}

impl<'a> GeoAggregator<'a> {
    pub fn new(rarity: &'a ResolvedRarity) -> Self {
        Self { rarity }
    }

    pub fn aggregate(&self, records: Vec<Observation>) -> Aggregation {
        let mut groups: BTreeMap<GroupKey, Vec<Observation>> = BTreeMap::new();
        for obs in records {
            let key = GroupKey {
                lat: micro(obs.lat),
                lon: micro(obs.lon),
                species_code: obs.species_code.clone(),
            };
            groups.entry(key).or_default().push(obs);
        }

        let mut aggregation = Aggregation::default();
        for (key, mut group) in groups {
            let Some(tier) = self.rarity.tier_of(&key.species_code) else {
                debug!(species = %key.species_code, "No tier for species, dropping marker");
                aggregation.dropped_unclassified += 1;
                continue;
            };
            group.sort_by(|a, b| newest_first(a.timestamp(), b.timestamp()));
            aggregation.markers.push(marker(key, tier, group));
        }

        aggregation
            .markers
            .sort_by(|a, b| b.rarity_tier.cmp(&a.rarity_tier).then(newest_first(a.newest, b.newest)));

        if aggregation.dropped_unclassified > 0 {
            warn!(
                dropped = aggregation.dropped_unclassified,
                "Marker groups without a requested tier dropped"
            );
        }
        aggregation
    }
}

/// Build a marker from a newest-first group
fn marker(key: GroupKey, tier: RarityTier, group: Vec<Observation>) -> AggregatedMarker {
    let newest = group.first().and_then(Observation::timestamp);
    let common_name = group.iter().find_map(|o| o.common_name.clone());
    let location_name = group
        .first()
        .map(|o| o.location_name.clone())
        .unwrap_or_default();

    let mut seen = HashSet::new();
    let sightings = group
        .into_iter()
        .filter(|o| seen.insert(o.submission_id.clone()))
        .map(|o| MarkerSighting {
            checklist_url: (!o.submission_id.is_empty()).then(|| o.checklist_url()),
            submission_id: o.submission_id,
            observed_at: o.observed_at,
            count: o.count,
        })
        .collect();

    AggregatedMarker {
        lat: key.lat as f64 / MICRO_DEGREES,
        lon: key.lon as f64 / MICRO_DEGREES,
        species_code: key.species_code,
        common_name,
        rarity_tier: tier,
        location_name,
        sightings,
        newest,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tier(v: u8) -> RarityTier {
        RarityTier::new(v).unwrap()
    }

    fn rarity() -> ResolvedRarity {
        let mut rarity = ResolvedRarity::with_tiers(&[tier(4), tier(5)]);
        rarity.insert(tier(4), "ivygul".to_string());
        rarity.insert(tier(5), "stseag1".to_string());
        rarity.insert(tier(4), "stseag1".to_string());
        rarity
    }

    fn obs(code: &str, sub: &str, lat: f64, lon: f64, at: &str) -> Observation {
        Observation {
            species_code: code.to_string(),
            common_name: Some(code.to_uppercase()),
            scientific_name: None,
            lat,
            lon,
            location_name: format!("{} spot", sub),
            observed_at: Some(at.to_string()),
            submission_id: sub.to_string(),
            count: Some(1),
            country_code: None,
            subdivision_code: None,
        }
    }

    #[test]
    fn test_groups_by_rounded_location_and_species() {
        let records = vec![
            obs("stseag1", "S1", 41.1234561, -71.0000004, "2025-01-01 08:00"),
            obs("stseag1", "S2", 41.1234559, -71.0000001, "2025-01-03 08:00"),
            obs("stseag1", "S2", 41.123456, -71.0, "2025-01-03 08:00"),
            obs("ivygul", "S3", 41.123456, -71.0, "2025-01-02 08:00"),
        ];
        let aggregation = GeoAggregator::new(&rarity()).aggregate(records);

        assert_eq!(aggregation.markers.len(), 2);
        let eagle = &aggregation.markers[0];
        assert_eq!(eagle.species_code, "stseag1");
        assert_eq!(eagle.lat, 41.123456);
        assert_eq!(eagle.lon, -71.0);
        let subs: Vec<&str> = eagle.sightings.iter().map(|s| s.submission_id.as_str()).collect();
        assert_eq!(subs, vec!["S2", "S1"]);
        assert_eq!(
            eagle.sightings[0].checklist_url.as_deref(),
            Some("https://ebird.org/checklist/S2")
        );
        assert_eq!(eagle.location_name, "S2 spot");
    }

    #[test]
    fn test_highest_tier_wins_and_markers_ordered() {
        let records = vec![
            obs("ivygul", "S3", 45.0, -70.0, "2025-01-09 08:00"),
            obs("stseag1", "S1", 41.0, -71.0, "2025-01-01 08:00"),
            obs("stseag1", "S2", 42.0, -71.0, "2025-01-05 08:00"),
        ];
        let aggregation = GeoAggregator::new(&rarity()).aggregate(records);

        let order: Vec<(&str, u8)> = aggregation
            .markers
            .iter()
            .map(|m| (m.sightings[0].submission_id.as_str(), m.rarity_tier.value()))
            .collect();
        assert_eq!(order, vec![("S2", 5), ("S1", 5), ("S3", 4)]);
    }

    #[test]
    fn test_unclassified_groups_dropped() {
        let records = vec![
            obs("amerob", "S1", 40.0, -74.0, "2025-01-01 08:00"),
            obs("ivygul", "S2", 40.0, -74.0, "2025-01-01 08:00"),
        ];
        let aggregation = GeoAggregator::new(&rarity()).aggregate(records);
        assert_eq!(aggregation.markers.len(), 1);
        assert_eq!(aggregation.dropped_unclassified, 1);
        assert!(aggregation
            .markers
            .iter()
            .all(|m| [4, 5].contains(&m.rarity_tier.value())));
    }

    #[test]
    fn test_serialized_marker_shape() {
        let records = vec![obs("ivygul", "S2", 40.5, -74.25, "2025-01-01 08:00")];
        let aggregation = GeoAggregator::new(&rarity()).aggregate(records);
        let value = serde_json::to_value(&aggregation.markers[0]).unwrap();

        assert_eq!(value["rarity_tier"], 4);
        assert_eq!(value["lat"], 40.5);
        assert_eq!(value["sightings"][0]["count"], 1);
        assert!(value.get("newest").is_none());
    }

    #[test]
    fn test_checklist_url_omitted_without_submission_id() {
        let records = vec![
            obs("ivygul", "S2", 40.5, -74.25, "2025-01-02 08:00"),
            obs("ivygul", "", 40.5, -74.25, "2025-01-01 08:00"),
        ];
        let aggregation = GeoAggregator::new(&rarity()).aggregate(records);
        let sightings = &aggregation.markers[0].sightings;
        assert_eq!(sightings.len(), 2);
        assert_eq!(
            sightings[0].checklist_url.as_deref(),
            Some("https://ebird.org/checklist/S2")
        );
        assert_eq!(sightings[1].checklist_url, None);

        let value = serde_json::to_value(&aggregation.markers[0]).unwrap();
        assert_eq!(value["sightings"][0]["checklist_url"], "https://ebird.org/checklist/S2");
        assert!(value["sightings"][1].get("checklist_url").is_none());
    }
}
