//! Species-name normalization
//!
//! Checklist names and taxonomy names are written by different authorities,
//! so both sides are reduced to the same canonical form before matching:
//! diacritics stripped, lower-cased, parenthetical qualifiers removed,
//! punctuation turned into spaces and whitespace collapsed.

use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Canonicalize an optional free-text name. `None` yields an empty string.
pub fn normalize(name: Option<&str>) -> String {
    name.map(normalize_str).unwrap_or_default()
}

/// Canonicalize a free-text species name.
///
/// Idempotent: `normalize_str(&normalize_str(x)) == normalize_str(x)`.
///
/// # Examples
///
/// ```
/// use megamap_common::names::normalize_str;
///
/// assert_eq!(normalize_str("Steller's Sea-Eagle"), "steller s sea eagle");
/// assert_eq!(normalize_str("  Común   Pájaro (Mexico) "), "comun pajaro");
/// ```
pub fn normalize_str(name: &str) -> String {
    let folded = fold_case_and_marks(name);
    let without_parens = strip_parentheticals(&folded);

    let cleaned: String = without_parens
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect();

    cleaned.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Produce the normalized name followed by fallback spellings.
///
/// The primary normalized form is always first. Fallbacks cover hyphen and
/// slash/comma separators, possessive `'s` (kept as `s` or dropped) and
/// generic punctuation. Each parenthetical alternate name, as in
/// `"Common Name (AOS Name)"`, is tried last. Duplicates are removed keeping
/// first-seen order and empty results are filtered out.
pub fn expand_variants(name: Option<&str>) -> Vec<String> {
    let Some(base) = name else {
        return Vec::new();
    };

    let mut candidates = vec![
        normalize_str(base),
        normalize_str(&base.replace('-', " ")),
        normalize_str(&base.replace('/', " ")),
        normalize_str(&base.replace(',', " ")),
        normalize_str(&replace_possessive(base, "s")),
        normalize_str(&replace_possessive(base, "")),
        normalize_str(&replace_punctuation(base)),
    ];
    candidates.extend(parentheticals(base).into_iter().map(normalize_str));

    let mut variants: Vec<String> = Vec::with_capacity(candidates.len());
    for candidate in candidates {
        if !candidate.is_empty() && !variants.contains(&candidate) {
            variants.push(candidate);
        }
    }
    variants
}

/// NFKD-decompose, drop combining marks and lower-case.
///
/// Lower-casing can itself produce decomposable characters (e.g. `İ`), so the
/// decomposition runs again afterwards.
fn fold_case_and_marks(s: &str) -> String {
    let stripped: String = s.nfkd().filter(|c| !is_combining_mark(*c)).collect();
    stripped
        .to_lowercase()
        .nfkd()
        .filter(|c| !is_combining_mark(*c))
        .collect()
}

/// Remove every `( ... )` span. An unmatched `(` is left in place.
fn strip_parentheticals(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut rest = s;

    while let Some(open) = rest.find('(') {
        match rest[open..].find(')') {
            Some(close) => {
                out.push_str(&rest[..open]);
                rest = &rest[open + close + 1..];
            }
            None => break,
        }
    }
    out.push_str(rest);
    out
}

/// Text between each `(` and the next `)`; an unmatched `(` ends the scan
fn parentheticals(s: &str) -> Vec<&str> {
    let mut spans = Vec::new();
    let mut rest = s;

    while let Some(open) = rest.find('(') {
        match rest[open..].find(')') {
            Some(close) => {
                spans.push(&rest[open + 1..open + close]);
                rest = &rest[open + close + 1..];
            }
            None => break,
        }
    }
    spans
}

/// Replace a possessive `'s` (straight or curly apostrophe) that ends a word.
fn replace_possessive(s: &str, replacement: &str) -> String {
    let chars: Vec<char> = s.chars().collect();
    let mut out = String::with_capacity(s.len());
    let mut i = 0;

    while i < chars.len() {
        let is_apostrophe = chars[i] == '\'' || chars[i] == '\u{2019}';
        let followed_by_s = chars.get(i + 1).is_some_and(|c| *c == 's' || *c == 'S');
        let ends_word = chars
            .get(i + 2)
            .map_or(true, |c| !(c.is_alphanumeric() || *c == '_'));

        if is_apostrophe && followed_by_s && ends_word {
            out.push_str(replacement);
            i += 2;
        } else {
            out.push(chars[i]);
            i += 1;
        }
    }
    out
}

/// Replace anything that is neither a word character nor whitespace.
fn replace_punctuation(s: &str) -> String {
    s.chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '_' || c.is_whitespace() {
                c
            } else {
                ' '
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_basic() {
        assert_eq!(normalize_str("Snow Goose"), "snow goose");
        assert_eq!(normalize_str("Steller's Sea-Eagle"), "steller s sea eagle");
        assert_eq!(normalize_str("Black-tailed Gull"), "black tailed gull");
    }

    #[test]
    fn test_normalize_strips_diacritics() {
        assert_eq!(normalize_str("Chachalaca Común"), "chachalaca comun");
        assert_eq!(normalize_str("Ñandú"), "nandu");
    }

    #[test]
    fn test_normalize_drops_parentheticals() {
        assert_eq!(normalize_str("Gray Heron (Eurasian)"), "gray heron");
        assert_eq!(normalize_str("Bean-Goose (Taiga) (rare)"), "bean goose");
        // Unmatched parenthesis becomes a separator
        assert_eq!(normalize_str("Odd (name"), "odd name");
    }

    #[test]
    fn test_normalize_empty() {
        assert_eq!(normalize(None), "");
        assert_eq!(normalize(Some("")), "");
        assert_eq!(normalize(Some("   ")), "");
        assert_eq!(normalize(Some("(only qualifier)")), "");
    }

    #[test]
    fn test_normalize_idempotent() {
        let samples = [
            "Steller's Sea-Eagle",
            "  Common   Name (AOS Name) ",
            "İstanbul Kuşu",
            "ℌawk / Falcon, Large",
            "Bewick’s Wren",
            "x²",
            "(((",
            "",
        ];
        for s in samples {
            let once = normalize_str(s);
            assert_eq!(normalize_str(&once), once, "not idempotent for {:?}", s);
        }
    }

    #[test]
    fn test_expand_variants_primary_first() {
        let names = ["Steller's Sea-Eagle", "Gray/Grey Heron", "Wren, Bewick's", "Ruff"];
        for name in names {
            let variants = expand_variants(Some(name));
            assert_eq!(variants[0], normalize_str(name));
        }
    }

    #[test]
    fn test_expand_variants_tries_parenthetical_names_last() {
        let variants = expand_variants(Some("Gray Heron (Eurasian Heron)"));
        assert_eq!(variants.first().map(String::as_str), Some("gray heron"));
        assert_eq!(variants.last().map(String::as_str), Some("eurasian heron"));

        let variants = expand_variants(Some("Bean-Goose (Taiga) (Tundra)"));
        assert!(variants.contains(&"taiga".to_string()));
        assert!(variants.contains(&"tundra".to_string()));

        // Unclosed and empty spans add nothing
        assert_eq!(expand_variants(Some("Ruff (")), vec!["ruff".to_string()]);
        assert_eq!(expand_variants(Some("Ruff ()")), vec!["ruff".to_string()]);
    }

    #[test]
    fn test_expand_variants_possessive() {
        let variants = expand_variants(Some("Steller's Sea-Eagle"));
        assert_eq!(variants[0], "steller s sea eagle");
        assert!(variants.contains(&"stellers sea eagle".to_string()));
        assert!(variants.contains(&"steller sea eagle".to_string()));
    }

    #[test]
    fn test_expand_variants_dedup_and_empty() {
        let variants = expand_variants(Some("Ruff"));
        assert_eq!(variants, vec!["ruff".to_string()]);

        assert!(expand_variants(None).is_empty());
        assert!(expand_variants(Some("")).is_empty());
        assert!(expand_variants(Some("---")).is_empty());
    }

    #[test]
    fn test_replace_possessive_only_at_word_end() {
        assert_eq!(replace_possessive("Steller's", "s"), "Stellers");
        assert_eq!(replace_possessive("Steller's", ""), "Steller");
        assert_eq!(replace_possessive("it'sy", ""), "it'sy");
    }
}
