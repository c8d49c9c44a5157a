//! Per-tier species-code sets
//!
//! Written by the classifier (`aba{tier}.json` plus the `aba_allowed.json`
//! union) and read back by every map build.

use crate::output::write_json;
use crate::{Error, RarityTier, Result};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// File holding the union of every classified tier
pub const UNION_FILE: &str = "aba_allowed.json";

/// File holding one tier's species codes
pub fn tier_file_name(tier: RarityTier) -> String {
    format!("aba{}.json", tier)
}

/// Species codes per rarity tier
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedRarity {
    tiers: BTreeMap<RarityTier, BTreeSet<String>>,
}

impl ResolvedRarity {
    /// Empty sets for each requested tier
    pub fn with_tiers<'a>(tiers: impl IntoIterator<Item = &'a RarityTier>) -> Self {
        Self {
            tiers: tiers.into_iter().map(|t| (*t, BTreeSet::new())).collect(),
        }
    }

    pub fn insert(&mut self, tier: RarityTier, species_code: String) {
        self.tiers.entry(tier).or_default().insert(species_code);
    }

    pub fn tier(&self, tier: RarityTier) -> Option<&BTreeSet<String>> {
        self.tiers.get(&tier)
    }

    pub fn tiers(&self) -> impl Iterator<Item = (RarityTier, &BTreeSet<String>)> {
        self.tiers.iter().map(|(t, codes)| (*t, codes))
    }

    /// Union over all held tiers
    pub fn union(&self) -> BTreeSet<String> {
        self.tiers.values().flatten().cloned().collect()
    }

    /// Highest (rarest) tier containing `species_code`
    pub fn tier_of(&self, species_code: &str) -> Option<RarityTier> {
        self.tiers
            .iter()
            .rev()
            .find(|(_, codes)| codes.contains(species_code))
            .map(|(tier, _)| *tier)
    }

    /// Species codes classified under more than one tier
    pub fn cross_tier_codes(&self) -> Vec<String> {
        let mut seen: BTreeMap<&str, usize> = BTreeMap::new();
        for code in self.tiers.values().flatten() {
            *seen.entry(code.as_str()).or_default() += 1;
        }
        seen.into_iter()
            .filter(|(_, n)| *n > 1)
            .map(|(code, _)| code.to_string())
            .collect()
    }

    /// Species count per tier
    pub fn counts(&self) -> BTreeMap<RarityTier, usize> {
        self.tiers.iter().map(|(t, codes)| (*t, codes.len())).collect()
    }

    /// Write one sorted JSON array per tier plus the union file
    pub fn save(&self, dir: &Path) -> Result<()> {
        for (tier, codes) in &self.tiers {
            write_json(&dir.join(tier_file_name(*tier)), codes)?;
        }
        write_json(&dir.join(UNION_FILE), &self.union())?;

        info!(dir = %dir.display(), tiers = self.tiers.len(), "Wrote tier files");
        Ok(())
    }

    /// Read the files of the requested tiers. A missing tier file is fatal.
    ///
    /// The union is recomputed from the loaded tiers rather than read from
    /// [`UNION_FILE`], which may cover a different set of tiers.
    pub fn load(dir: &Path, tiers: &BTreeSet<RarityTier>) -> Result<Self> {
        let mut resolved = Self::default();

        for tier in tiers {
            let path: PathBuf = dir.join(tier_file_name(*tier));
            if !path.exists() {
                return Err(Error::MissingInput(path));
            }
            let text = std::fs::read_to_string(&path)?;
            let codes: Vec<String> = serde_json::from_str(&text)?;
            if codes.is_empty() {
                warn!(tier = %tier, path = %path.display(), "Tier file is empty");
            }
            resolved.tiers.insert(
                *tier,
                codes.iter().map(|c| crate::models::canonical_species_code(c)).collect(),
            );
        }

        Ok(resolved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tier(v: u8) -> RarityTier {
        RarityTier::new(v).unwrap()
    }

    #[test]
    fn test_union_and_tier_of() {
        let mut rarity = ResolvedRarity::with_tiers(&[tier(4), tier(5)]);
        rarity.insert(tier(4), "bkhgul".to_string());
        rarity.insert(tier(5), "stseag1".to_string());
        rarity.insert(tier(5), "bkhgul".to_string());

        assert_eq!(rarity.union().len(), 2);
        assert_eq!(rarity.tier_of("stseag1"), Some(tier(5)));
        // Highest tier wins when rows disagree
        assert_eq!(rarity.tier_of("bkhgul"), Some(tier(5)));
        assert_eq!(rarity.tier_of("amerob"), None);
        assert_eq!(rarity.cross_tier_codes(), vec!["bkhgul".to_string()]);
    }

    #[test]
    fn test_save_then_load_requested_subset() {
        let dir = tempfile::tempdir().unwrap();
        let mut rarity = ResolvedRarity::with_tiers(&[tier(4), tier(5)]);
        rarity.insert(tier(4), "ivygul".to_string());
        rarity.insert(tier(5), "stseag1".to_string());
        rarity.save(dir.path()).unwrap();

        assert!(dir.path().join("aba4.json").exists());
        assert!(dir.path().join("aba5.json").exists());
        assert!(dir.path().join(UNION_FILE).exists());

        let only_five: BTreeSet<RarityTier> = [tier(5)].into_iter().collect();
        let loaded = ResolvedRarity::load(dir.path(), &only_five).unwrap();
        assert_eq!(loaded.union().into_iter().collect::<Vec<_>>(), vec!["stseag1"]);
    }

    #[test]
    fn test_load_missing_tier_is_missing_input() {
        let dir = tempfile::tempdir().unwrap();
        let tiers: BTreeSet<RarityTier> = [tier(3)].into_iter().collect();
        let err = ResolvedRarity::load(dir.path(), &tiers).unwrap_err();
        assert!(matches!(err, Error::MissingInput(_)));
    }
}
