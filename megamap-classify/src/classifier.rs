//! Rarity classification
//!
//! Maps checklist rows to species codes for each requested rarity tier.
//! Rows outside the requested tiers are ignored; rows in a requested tier
//! whose name matches no taxonomy variant are reported as unresolved.

use crate::columns::{checklist_detectors, detect_columns, ColumnDetector, Columns};
use crate::table::Table;
use crate::taxonomy::TaxonomyResolver;
use megamap_common::names::expand_variants;
use megamap_common::{RarityTier, ResolvedRarity, Result};
use serde::Serialize;
use std::collections::BTreeSet;
use tracing::{info, warn};

/// One checklist row as read
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RarityRow {
    pub raw_name: String,
    pub rarity_code: String,
}

impl RarityRow {
    pub fn tier(&self) -> Option<RarityTier> {
        RarityTier::parse_code(&self.rarity_code)
    }
}

/// Match report line, one per checklist row
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MatchReportRow {
    #[serde(rename = "ABA_ROW_NAME")]
    pub row_name: String,
    #[serde(rename = "ABA_CODE")]
    pub rarity_code: String,
    #[serde(rename = "MATCH_VARIANT")]
    pub match_variant: Option<String>,
    #[serde(rename = "SPECIES_CODE")]
    pub species_code: Option<String>,
}

/// Result of classifying a checklist
#[derive(Debug, Clone, Default)]
pub struct Classification {
    pub rarity: ResolvedRarity,
    /// Raw names of requested-tier rows with no taxonomy match, in row order
    pub unresolved: Vec<String>,
    pub report: Vec<MatchReportRow>,
    /// Species codes classified under more than one tier
    pub cross_tier: Vec<String>,
}

impl Classification {
    pub fn union(&self) -> BTreeSet<String> {
        self.rarity.union()
    }

    /// Sorted, de-duplicated unresolved names
    pub fn unresolved_unique(&self) -> Vec<String> {
        self.unresolved
            .iter()
            .cloned()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    pub fn matched_rows(&self) -> usize {
        self.report.iter().filter(|r| r.species_code.is_some()).count()
    }
}

/// Classifies checklist rows against a taxonomy
pub struct RarityClassifier<'a> {
    resolver: &'a TaxonomyResolver,
    tiers: BTreeSet<RarityTier>,
    detectors: Vec<Box<dyn ColumnDetector>>,
}

impl<'a> RarityClassifier<'a> {
    pub fn new(resolver: &'a TaxonomyResolver, tiers: BTreeSet<RarityTier>) -> Self {
        Self {
            resolver,
            tiers,
            detectors: checklist_detectors(),
        }
    }

    /// Detect columns, then classify every row. Undetectable columns are fatal.
    pub fn classify_table(&self, table: &Table) -> Result<Classification> {
        let columns = detect_columns(table, &self.detectors)?;
        Ok(self.classify_rows(rows_of(table, columns)))
    }

    pub fn classify_rows(&self, rows: impl IntoIterator<Item = RarityRow>) -> Classification {
        let mut classification = Classification {
            rarity: ResolvedRarity::with_tiers(&self.tiers),
            ..Default::default()
        };

        for row in rows {
            let variants = expand_variants(Some(&row.raw_name));
            let resolved = self.resolver.resolve(&variants);

            classification.report.push(MatchReportRow {
                row_name: row.raw_name.clone(),
                rarity_code: row.rarity_code.clone(),
                match_variant: variants.first().cloned(),
                species_code: resolved.map(|(_, code)| code.to_string()),
            });

            let Some(tier) = row.tier().filter(|t| self.tiers.contains(t)) else {
                continue;
            };

            match resolved {
                Some((_, code)) => classification.rarity.insert(tier, code.to_string()),
                None if !row.raw_name.trim().is_empty() => {
                    classification.unresolved.push(row.raw_name.clone());
                }
                None => {}
            }
        }

        classification.cross_tier = classification.rarity.cross_tier_codes();
        if !classification.cross_tier.is_empty() {
            warn!(
                species = ?classification.cross_tier,
                "Species classified under more than one tier"
            );
        }

        info!(
            "Matched {} of {} rows",
            classification.matched_rows(),
            classification.report.len()
        );
        for (tier, codes) in classification.rarity.tiers() {
            info!(tier = %tier, species = codes.len(), "Classified tier");
        }
        if !classification.unresolved.is_empty() {
            warn!(
                unresolved = classification.unresolved.len(),
                "Checklist names without a taxonomy match"
            );
        }

        classification
    }
}

/// Checklist rows from the detected columns
pub fn rows_of(table: &Table, columns: Columns) -> impl Iterator<Item = RarityRow> + '_ {
    (0..table.rows.len()).map(move |row| RarityRow {
        raw_name: table.cell(row, columns.name).unwrap_or("").trim().to_string(),
        rarity_code: table.cell(row, columns.code).unwrap_or("").trim().to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tiers(values: &[u8]) -> BTreeSet<RarityTier> {
        values.iter().map(|v| RarityTier::new(*v).unwrap()).collect()
    }

    fn row(name: &str, code: &str) -> RarityRow {
        RarityRow {
            raw_name: name.to_string(),
            rarity_code: code.to_string(),
        }
    }

    #[test]
    fn test_stellers_sea_eagle_lands_in_tier_five() {
        let resolver = TaxonomyResolver::from_pairs([("Steller's Sea-Eagle", "stseag1")]);
        let classifier = RarityClassifier::new(&resolver, tiers(&[5]));

        let result = classifier.classify_rows([row("Steller's Sea-Eagle", "5")]);
        let five = result.rarity.tier(RarityTier::new(5).unwrap()).unwrap();
        assert!(five.contains("stseag1"));
        assert!(result.unresolved.is_empty());
    }

    #[test]
    fn test_parenthetical_alternate_name_resolves() {
        let resolver = TaxonomyResolver::from_pairs([("Eurasian Heron", "grayhe")]);
        let classifier = RarityClassifier::new(&resolver, tiers(&[5]));

        let result = classifier.classify_rows([row("Gray Heron (Eurasian Heron)", "5")]);
        assert!(result.unresolved.is_empty());
        let five = result.rarity.tier(RarityTier::new(5).unwrap()).unwrap();
        assert!(five.contains("grayhe"));
        assert_eq!(result.report[0].match_variant.as_deref(), Some("gray heron"));
    }

    #[test]
    fn test_unresolved_name_excluded_and_reported() {
        let resolver = TaxonomyResolver::from_pairs([("Snow Goose", "snogoo")]);
        let classifier = RarityClassifier::new(&resolver, tiers(&[4, 5]));

        let result = classifier.classify_rows([row("Imaginary Warbler", "5"), row("Snow Goose", "4")]);
        assert_eq!(result.unresolved, vec!["Imaginary Warbler".to_string()]);
        assert_eq!(result.union().into_iter().collect::<Vec<_>>(), vec!["snogoo"]);
        for (_, codes) in result.rarity.tiers() {
            assert!(codes.iter().all(|c| c != "imaginary warbler"));
        }
    }

    #[test]
    fn test_qualifiers_and_unrequested_tiers() {
        let resolver = TaxonomyResolver::from_pairs([
            ("Ruff", "ruff"),
            ("Ivory Gull", "ivogul"),
            ("Smew", "smew"),
            ("Unknown Thing", "unk"),
        ]);
        let classifier = RarityClassifier::new(&resolver, tiers(&[4, 5]));

        let result = classifier.classify_rows([
            row("Ruff", "3"),
            row("Ivory Gull", "4*"),
            row("Smew", "5?"),
            row("Unknown Thing", "X"),
            row("Not In Taxonomy", "3"),
        ]);

        let four = result.rarity.tier(RarityTier::new(4).unwrap()).unwrap();
        let five = result.rarity.tier(RarityTier::new(5).unwrap()).unwrap();
        assert_eq!(four.iter().collect::<Vec<_>>(), vec!["ivogul"]);
        assert_eq!(five.iter().collect::<Vec<_>>(), vec!["smew"]);
        // Unrequested tier rows are never reported as unresolved
        assert!(result.unresolved.is_empty());
        assert_eq!(result.report.len(), 5);
    }

    #[test]
    fn test_inconsistent_rows_reported_not_prevented() {
        let resolver = TaxonomyResolver::from_pairs([("Ruff", "ruff")]);
        let classifier = RarityClassifier::new(&resolver, tiers(&[4, 5]));

        let result = classifier.classify_rows([row("Ruff", "4"), row("Ruff", "5")]);
        assert_eq!(result.cross_tier, vec!["ruff".to_string()]);
        assert_eq!(result.union().len(), 1);
    }

    #[test]
    fn test_classify_table_with_undetectable_columns_fails() {
        let resolver = TaxonomyResolver::default();
        let classifier = RarityClassifier::new(&resolver, tiers(&[5]));
        let table = Table {
            headers: vec!["a".to_string(), "b".to_string()],
            rows: vec![vec!["x".to_string(), "y".to_string()]],
            header_line: 0,
            delimiter: b',',
        };
        assert!(classifier.classify_table(&table).is_err());
    }
}
