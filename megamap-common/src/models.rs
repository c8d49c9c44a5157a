//! Domain models shared by the classifier and the map builder

use crate::{Error, Result};
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Checklist URL prefix for a submission id
const CHECKLIST_URL_PREFIX: &str = "https://ebird.org/checklist/";

/// Highest digit accepted as a rarity tier
const MAX_TIER: u8 = 9;

/// Rarity classification tier (ABA code). Higher is scarcer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RarityTier(u8);

impl RarityTier {
    /// Build a tier from its numeric value (1..=9)
    pub fn new(value: u8) -> Result<Self> {
        if (1..=MAX_TIER).contains(&value) {
            Ok(Self(value))
        } else {
            Err(Error::InvalidInput(format!(
                "rarity code {} outside 1..={}",
                value, MAX_TIER
            )))
        }
    }

    pub fn value(self) -> u8 {
        self.0
    }

    /// Parse a raw checklist code cell.
    ///
    /// Only the leading digit is significant; trailing qualifiers such as
    /// `*`, `?` or `.0` are tolerated, but a digit followed by another word
    /// character (`55`, `5a`) is not a code.
    ///
    /// ```
    /// use megamap_common::RarityTier;
    ///
    /// assert_eq!(RarityTier::parse_code(" 5*").map(|t| t.value()), Some(5));
    /// assert_eq!(RarityTier::parse_code("4.0").map(|t| t.value()), Some(4));
    /// assert!(RarityTier::parse_code("12").is_none());
    /// ```
    pub fn parse_code(raw: &str) -> Option<Self> {
        let mut chars = raw.trim_start().chars();
        let digit = chars.next()?.to_digit(10)?;

        if let Some(next) = chars.next() {
            if next.is_alphanumeric() || next == '_' {
                return None;
            }
        }

        Self::new(digit as u8).ok()
    }

    /// Parse a comma-separated tier list such as `"5"` or `"4,5"`
    pub fn parse_list(raw: &str) -> Result<BTreeSet<Self>> {
        let mut tiers = BTreeSet::new();
        for part in raw.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            let value: u8 = part.parse().map_err(|_| {
                Error::InvalidInput(format!(
                    "codes must be a comma-separated list of integers like '5' or '4,5', got '{}'",
                    raw
                ))
            })?;
            tiers.insert(Self::new(value)?);
        }

        if tiers.is_empty() {
            return Err(Error::InvalidInput("at least one rarity code is required".to_string()));
        }
        Ok(tiers)
    }
}

impl fmt::Display for RarityTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One sighting record, as ingested from the remote source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    /// Lower-cased species code
    pub species_code: String,
    pub common_name: Option<String>,
    pub scientific_name: Option<String>,
    pub lat: f64,
    pub lon: f64,
    pub location_name: String,
    /// Raw observation date/time as reported (`YYYY-MM-DD HH:MM` or `YYYY-MM-DD`)
    pub observed_at: Option<String>,
    pub submission_id: String,
    pub count: Option<u32>,
    pub country_code: Option<String>,
    pub subdivision_code: Option<String>,
}

/// Identity of a record for cross-shard deduplication
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DedupKey {
    pub submission_id: String,
    pub species_code: String,
}

impl Observation {
    pub fn dedup_key(&self) -> DedupKey {
        DedupKey {
            submission_id: self.submission_id.clone(),
            species_code: self.species_code.clone(),
        }
    }

    /// Parsed observation time; `None` when missing or unparsable
    pub fn timestamp(&self) -> Option<NaiveDateTime> {
        self.observed_at.as_deref().and_then(parse_observed_at)
    }

    pub fn checklist_url(&self) -> String {
        format!("{}{}", CHECKLIST_URL_PREFIX, self.submission_id)
    }
}

/// Parse the remote source's observation date formats
pub fn parse_observed_at(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M")
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S"))
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

/// Canonical species-code form used for every comparison
pub fn canonical_species_code(raw: &str) -> String {
    raw.trim().to_lowercase()
}
