//! Two-phase record capping
//!
//! Phase 1 keeps the newest `per_species_max` records of each species
//! (0 keeps all). Phase 2 keeps the newest `national_max` records overall.
//! Phase 2 can drop a species entirely; that is accepted.

use chrono::NaiveDateTime;
use megamap_common::Observation;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use tracing::debug;

/// Newest first; records without a usable timestamp sort last
pub fn newest_first(a: Option<NaiveDateTime>, b: Option<NaiveDateTime>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => b.cmp(&a),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Stable sort, newest first
pub fn sort_newest_first(records: &mut [Observation]) {
    records.sort_by(|a, b| newest_first(a.timestamp(), b.timestamp()));
}

/// Record counts after each phase
#[derive(Debug, Clone, Default)]
pub struct CapOutcome {
    pub records: Vec<Observation>,
    pub after_species_cap: usize,
    pub dropped_empty_code: usize,
}

#[derive(Debug, Clone, Copy)]
pub struct RecordCapper {
    /// 0 = unlimited
    pub per_species_max: usize,
    pub national_max: usize,
}

impl RecordCapper {
    pub fn new(per_species_max: usize, national_max: usize) -> Self {
        Self {
            per_species_max,
            national_max,
        }
    }

    pub fn apply(&self, records: Vec<Observation>) -> CapOutcome {
        let mut outcome = CapOutcome::default();

        let mut by_species: BTreeMap<String, Vec<Observation>> = BTreeMap::new();
        for obs in records {
            if obs.species_code.is_empty() {
                outcome.dropped_empty_code += 1;
                continue;
            }
            by_species.entry(obs.species_code.clone()).or_default().push(obs);
        }

        let mut capped = Vec::new();
        for (_, mut group) in by_species {
            sort_newest_first(&mut group);
            if self.per_species_max > 0 {
                group.truncate(self.per_species_max);
            }
            capped.extend(group);
        }
        outcome.after_species_cap = capped.len();

        if capped.len() > self.national_max {
            sort_newest_first(&mut capped);
            capped.truncate(self.national_max);
        }

        debug!(
            after_species_cap = outcome.after_species_cap,
            after_national_cap = capped.len(),
            "Capped records"
        );
        outcome.records = capped;
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn obs(code: &str, sub: &str, observed_at: Option<&str>) -> Observation {
        Observation {
            species_code: code.to_string(),
            common_name: None,
            scientific_name: None,
            lat: 0.0,
            lon: 0.0,
            location_name: String::new(),
            observed_at: observed_at.map(str::to_string),
            submission_id: sub.to_string(),
            count: None,
            country_code: None,
            subdivision_code: None,
        }
    }

    fn subs(records: &[Observation]) -> Vec<&str> {
        records.iter().map(|o| o.submission_id.as_str()).collect()
    }

    #[test]
    fn test_species_cap_then_national_cap() {
        let records = vec![
            obs("a", "A10", Some("2025-01-10 08:00")),
            obs("a", "A20", Some("2025-01-20 08:00")),
            obs("b", "B15", Some("2025-01-15 08:00")),
        ];

        let phase1 = RecordCapper::new(1, 10).apply(records.clone());
        assert_eq!(phase1.after_species_cap, 2);
        let mut kept = subs(&phase1.records);
        kept.sort();
        assert_eq!(kept, vec!["A20", "B15"]);

        let phase2 = RecordCapper::new(1, 1).apply(records);
        assert_eq!(phase2.after_species_cap, 2);
        assert_eq!(subs(&phase2.records), vec!["A20"]);
    }

    #[test]
    fn test_unlimited_per_species() {
        let records = vec![
            obs("a", "A1", Some("2025-01-01")),
            obs("a", "A2", Some("2025-01-02")),
            obs("a", "A3", Some("2025-01-03")),
        ];
        let outcome = RecordCapper::new(0, 60).apply(records);
        assert_eq!(subs(&outcome.records), vec!["A3", "A2", "A1"]);
    }

    #[test]
    fn test_unparsable_dates_sort_last_and_empty_codes_dropped() {
        let records = vec![
            obs("a", "bad", Some("sometime")),
            obs("a", "none", None),
            obs("a", "good", Some("2025-02-01 06:15:00")),
            obs("", "blank", Some("2025-03-01")),
        ];
        let outcome = RecordCapper::new(0, 60).apply(records);
        assert_eq!(subs(&outcome.records), vec!["good", "bad", "none"]);
        assert_eq!(outcome.dropped_empty_code, 1);
    }

    #[test]
    fn test_caps_bound_counts() {
        let records: Vec<Observation> = (0..20)
            .map(|i| {
                obs(
                    &format!("sp{}", i % 4),
                    &format!("S{}", i),
                    Some(&format!("2025-01-{:02}", i + 1)),
                )
            })
            .collect();
        let outcome = RecordCapper::new(2, 5).apply(records);
        assert_eq!(outcome.after_species_cap, 8);
        assert_eq!(outcome.records.len(), 5);

        let mut per_species: BTreeMap<&str, usize> = BTreeMap::new();
        for o in &outcome.records {
            *per_species.entry(o.species_code.as_str()).or_default() += 1;
        }
        assert!(per_species.values().all(|n| *n <= 2));
    }
}
