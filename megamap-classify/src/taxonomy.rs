//! Reference taxonomy lookup
//!
//! Maps normalized common names to species codes. Duplicate normalized names
//! resolve to the entry loaded last; there is no canonical tie-break in the
//! reference data, so shadowed entries are only counted and logged.

use crate::columns::{detect_columns, taxonomy_detectors};
use crate::table::{read_taxonomy, Table};
use megamap_common::models::canonical_species_code;
use megamap_common::names::normalize_str;
use megamap_common::Result;
use std::collections::HashMap;
use std::path::Path;
use tracing::{info, warn};

/// Normalized common name → species code
#[derive(Debug, Clone, Default)]
pub struct TaxonomyResolver {
    by_name: HashMap<String, String>,
    /// Reference names as written, for diagnostics
    display_names: Vec<String>,
    shadowed: usize,
}

impl TaxonomyResolver {
    /// Build from `(name, code)` pairs in load order
    pub fn from_pairs<N, C>(pairs: impl IntoIterator<Item = (N, C)>) -> Self
    where
        N: AsRef<str>,
        C: AsRef<str>,
    {
        let mut resolver = Self::default();
        for (name, code) in pairs {
            resolver.insert(name.as_ref(), code.as_ref());
        }
        resolver
    }

    /// Load the taxonomy file and detect its name and code columns
    pub fn load(path: &Path) -> Result<Self> {
        let table = read_taxonomy(path)?;
        let resolver = Self::from_table(&table)?;
        info!(
            path = %path.display(),
            names = resolver.len(),
            shadowed = resolver.shadowed,
            "Loaded taxonomy"
        );
        Ok(resolver)
    }

    pub fn from_table(table: &Table) -> Result<Self> {
        let columns = detect_columns(table, &taxonomy_detectors())?;
        let pairs = (0..table.rows.len()).map(|row| {
            (
                table.cell(row, columns.name).unwrap_or(""),
                table.cell(row, columns.code).unwrap_or(""),
            )
        });
        let resolver = Self::from_pairs(pairs);

        if resolver.shadowed > 0 {
            warn!(
                shadowed = resolver.shadowed,
                "Taxonomy has duplicate normalized names; last entry wins"
            );
        }
        Ok(resolver)
    }

    fn insert(&mut self, name: &str, code: &str) {
        let normalized = normalize_str(name);
        let code = canonical_species_code(code);
        if normalized.is_empty() || code.is_empty() {
            return;
        }

        self.display_names.push(name.trim().to_string());
        if let Some(previous) = self.by_name.insert(normalized, code) {
            self.shadowed += 1;
            tracing::debug!(name = %name.trim(), previous = %previous, "Taxonomy name shadowed");
        }
    }

    /// Species code for an already-normalized name
    pub fn lookup(&self, normalized: &str) -> Option<&str> {
        self.by_name.get(normalized).map(String::as_str)
    }

    /// First variant with a match, as `(variant, species_code)`
    pub fn resolve<'a>(&'a self, variants: &'a [String]) -> Option<(&'a str, &'a str)> {
        variants
            .iter()
            .find_map(|v| self.lookup(v).map(|code| (v.as_str(), code)))
    }

    pub fn display_names(&self) -> &[String] {
        &self.display_names
    }

    /// Entries replaced by a later duplicate
    pub fn shadowed(&self) -> usize {
        self.shadowed
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use megamap_common::names::expand_variants;

    #[test]
    fn test_resolve_with_variants() {
        let resolver = TaxonomyResolver::from_pairs([("Steller's Sea-Eagle", "STSEAG1")]);
        let variants = expand_variants(Some("Steller's Sea-Eagle"));
        assert_eq!(
            resolver.resolve(&variants),
            Some(("steller s sea eagle", "stseag1"))
        );
    }

    #[test]
    fn test_last_duplicate_wins() {
        let resolver = TaxonomyResolver::from_pairs([
            ("Gray Heron", "graher1"),
            ("Gray  heron", "graher2"),
        ]);
        assert_eq!(resolver.lookup("gray heron"), Some("graher2"));
        assert_eq!(resolver.shadowed(), 1);
        assert_eq!(resolver.len(), 1);
        assert_eq!(resolver.display_names().len(), 2);
    }

    #[test]
    fn test_blank_rows_skipped() {
        let resolver = TaxonomyResolver::from_pairs([("", "abc"), ("Ruff", " "), ("Ruff", "ruff")]);
        assert_eq!(resolver.len(), 1);
        assert_eq!(resolver.shadowed(), 0);
    }

    #[test]
    fn test_from_table_case_insensitive_headers() {
        let table = Table {
            headers: vec!["species_code".to_string(), "primary_com_name".to_string()],
            rows: vec![vec!["snogoo".to_string(), "Snow Goose".to_string()]],
            header_line: 0,
            delimiter: b',',
        };
        let resolver = TaxonomyResolver::from_table(&table).unwrap();
        assert_eq!(resolver.lookup("snow goose"), Some("snogoo"));
        assert_eq!(resolver.len(), 1);
    }
}
