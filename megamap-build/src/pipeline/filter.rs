//! Species filter applied to fetched records

use megamap_common::config::FilterMode;
use megamap_common::Observation;
use std::collections::BTreeSet;
use tracing::debug;

/// Keeps records whose species is in the allowed set, or everything in
/// [`FilterMode::Union`] mode
pub struct ObservationFilter<'a> {
    mode: FilterMode,
    allowed: &'a BTreeSet<String>,
}

impl<'a> ObservationFilter<'a> {
    pub fn new(mode: FilterMode, allowed: &'a BTreeSet<String>) -> Self {
        Self { mode, allowed }
    }

    pub fn accepts(&self, obs: &Observation) -> bool {
        match self.mode {
            FilterMode::Restricted => self.allowed.contains(&obs.species_code),
            FilterMode::Union => true,
        }
    }

    pub fn apply(&self, records: Vec<Observation>) -> Vec<Observation> {
        let before = records.len();
        let kept: Vec<Observation> = records.into_iter().filter(|o| self.accepts(o)).collect();
        debug!(mode = %self.mode, before, after = kept.len(), "Filtered observations");
        kept
    }
}
