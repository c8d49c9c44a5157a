//! Fuzzy suggestions for unresolved checklist names
//!
//! Helps whoever maintains the checklist spot spelling drift against the
//! taxonomy. Suggestions are diagnostics only and never feed classification.

use serde::Serialize;
use std::collections::BTreeSet;

/// Minimum normalized Levenshtein similarity for a suggestion
pub const SUGGESTION_CUTOFF: f64 = 0.7;

/// Suggestions kept per unresolved name
pub const MAX_SUGGESTIONS: usize = 3;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Suggestion {
    #[serde(rename = "ABA_ROW_NAME")]
    pub row_name: String,
    #[serde(rename = "SUGGESTED_MATCH")]
    pub suggested: String,
}

fn squash(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase()
}

/// Up to [`MAX_SUGGESTIONS`] close taxonomy names per unresolved name
pub fn suggest(unresolved: &[String], taxonomy_names: &[String]) -> Vec<Suggestion> {
    let candidates: Vec<(String, &String)> = taxonomy_names
        .iter()
        .collect::<BTreeSet<_>>()
        .into_iter()
        .map(|name| (squash(name), name))
        .collect();

    let wanted: BTreeSet<&String> = unresolved.iter().collect();
    let mut out = Vec::new();

    for name in wanted {
        let needle = squash(name);
        if needle.is_empty() {
            continue;
        }

        let mut scored: Vec<(f64, &String)> = candidates
            .iter()
            .map(|(squashed, original)| (strsim::normalized_levenshtein(&needle, squashed), *original))
            .filter(|(score, _)| *score >= SUGGESTION_CUTOFF)
            .collect();
        scored.sort_by(|a, b| b.0.total_cmp(&a.0).then_with(|| a.1.cmp(b.1)));

        out.extend(scored.into_iter().take(MAX_SUGGESTIONS).map(|(_, original)| Suggestion {
            row_name: name.clone(),
            suggested: original.clone(),
        }));
    }
    out
}
