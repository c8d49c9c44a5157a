//! Column detection strategies
//!
//! Checklists and taxonomies spell their headers in many ways. Detection runs
//! an explicit, ordered list of [`ColumnDetector`] strategies per column role;
//! the first strategy that finds a column wins. When no strategy finds a
//! column the run is aborted: there is no safe default.

use crate::table::Table;
use megamap_common::{Error, Result};
use tracing::{debug, info};

/// Number of values sampled by the content heuristic
const SAMPLE_SIZE: usize = 40;

/// Rarity codes used by the checklist authority
const CODE_RANGE: std::ops::RangeInclusive<u8> = 1..=6;

/// Which column a detector is looking for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnRole {
    Name,
    Code,
}

impl ColumnRole {
    fn label(self) -> &'static str {
        match self {
            ColumnRole::Name => "name",
            ColumnRole::Code => "code",
        }
    }
}

/// One column detection strategy
pub trait ColumnDetector: Send + Sync {
    /// Strategy identifier for logs
    fn name(&self) -> &'static str;

    /// Index of the column playing `role`, never `exclude`
    fn detect(&self, table: &Table, role: ColumnRole, exclude: Option<usize>) -> Option<usize>;
}

/// Resolved column indexes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Columns {
    pub name: usize,
    pub code: usize,
}

/// How header text is compared with an alias
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AliasMatch {
    /// Byte-for-byte after trimming
    Exact,
    /// Case-insensitive after trimming
    CaseInsensitive,
    /// Case-insensitive with every non-alphanumeric character removed
    Folded,
}

impl AliasMatch {
    fn key(self, s: &str) -> String {
        match self {
            AliasMatch::Exact => s.trim().to_string(),
            AliasMatch::CaseInsensitive => s.trim().to_lowercase(),
            AliasMatch::Folded => s
                .chars()
                .filter(|c| c.is_alphanumeric())
                .flat_map(char::to_lowercase)
                .collect(),
        }
    }
}

/// Match headers against known spellings
#[derive(Debug, Clone)]
pub struct HeaderAlias {
    pub label: &'static str,
    pub name_aliases: &'static [&'static str],
    pub code_aliases: &'static [&'static str],
    pub matching: AliasMatch,
}

impl ColumnDetector for HeaderAlias {
    fn name(&self) -> &'static str {
        self.label
    }

    fn detect(&self, table: &Table, role: ColumnRole, exclude: Option<usize>) -> Option<usize> {
        let aliases = match role {
            ColumnRole::Name => self.name_aliases,
            ColumnRole::Code => self.code_aliases,
        };
        let header_keys: Vec<String> = table.headers.iter().map(|h| self.matching.key(h)).collect();

        // Alias order is priority order
        aliases.iter().find_map(|alias| {
            let wanted = self.matching.key(alias);
            header_keys
                .iter()
                .enumerate()
                .find(|(idx, key)| Some(*idx) != exclude && **key == wanted)
                .map(|(idx, _)| idx)
        })
    }
}

/// Guess columns from their values: multi-word text for names, small
/// integers for rarity codes
#[derive(Debug, Clone, Default)]
pub struct ContentHeuristic;

impl ContentHeuristic {
    fn looks_like_names(table: &Table, column: usize) -> bool {
        let sample: Vec<&str> = table
            .column(column)
            .flatten()
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .take(SAMPLE_SIZE)
            .collect();
        if sample.is_empty() {
            return false;
        }
        let multi_word = sample.iter().filter(|v| v.contains(' ')).count();
        multi_word * 2 > sample.len()
    }

    /// At least half the sampled cells are numbers and every number is a
    /// whole value inside [`CODE_RANGE`]
    fn looks_like_codes(table: &Table, column: usize) -> bool {
        let sample: Vec<Option<&str>> = table.column(column).take(SAMPLE_SIZE).collect();
        if sample.is_empty() {
            return false;
        }
        let parsed: Vec<f64> = sample
            .iter()
            .filter_map(|v| v.and_then(leading_number))
            .collect();
        !parsed.is_empty()
            && parsed.len() * 2 >= sample.len()
            && parsed.iter().all(|n| {
                n.fract() == 0.0
                    && *n >= f64::from(*CODE_RANGE.start())
                    && *n <= f64::from(*CODE_RANGE.end())
            })
    }
}

/// Numeric value of a cell: the whole cell as a float, else its leading
/// digits (`"5*"` is 5). Cells that do not start with a digit are not numbers.
fn leading_number(cell: &str) -> Option<f64> {
    let cell = cell.trim();
    if let Ok(value) = cell.parse::<f64>() {
        return value.is_finite().then_some(value);
    }
    let digits: String = cell.chars().take_while(char::is_ascii_digit).collect();
    digits.parse::<u64>().ok().map(|v| v as f64)
}

impl ColumnDetector for ContentHeuristic {
    fn name(&self) -> &'static str {
        "content-heuristic"
    }

    fn detect(&self, table: &Table, role: ColumnRole, exclude: Option<usize>) -> Option<usize> {
        (0..table.headers.len())
            .filter(|idx| Some(*idx) != exclude)
            .find(|idx| match role {
                ColumnRole::Name => Self::looks_like_names(table, *idx),
                ColumnRole::Code => Self::looks_like_codes(table, *idx),
            })
    }
}

const CHECKLIST_NAME_ALIASES: &[&str] = &[
    "primary_com_name",
    "common name",
    "english name",
    "name",
    "primary com name",
    "primary common name",
];

const CHECKLIST_CODE_ALIASES: &[&str] = &[
    "abachecklistcode",
    "abacode",
    "code",
    "abraritycode",
    "raritycode",
    "aba checklist code",
    "aba rarity code",
    "aba code",
];

const TAXONOMY_NAME_ALIASES: &[&str] = &[
    "PRIMARY_COM_NAME",
    "PRIMARY COM NAME",
    "ENGLISH_NAME",
    "English Name",
    "Common Name",
];

const TAXONOMY_CODE_ALIASES: &[&str] = &["SPECIES_CODE"];

/// Checklist strategies in priority order
pub fn checklist_detectors() -> Vec<Box<dyn ColumnDetector>> {
    vec![
        Box::new(HeaderAlias {
            label: "header-alias",
            name_aliases: CHECKLIST_NAME_ALIASES,
            code_aliases: CHECKLIST_CODE_ALIASES,
            matching: AliasMatch::CaseInsensitive,
        }),
        Box::new(HeaderAlias {
            label: "header-alias-folded",
            name_aliases: CHECKLIST_NAME_ALIASES,
            code_aliases: CHECKLIST_CODE_ALIASES,
            matching: AliasMatch::Folded,
        }),
        Box::new(ContentHeuristic),
    ]
}

/// Taxonomy strategies in priority order: exact spelling, then case-insensitive
pub fn taxonomy_detectors() -> Vec<Box<dyn ColumnDetector>> {
    vec![
        Box::new(HeaderAlias {
            label: "taxonomy-exact",
            name_aliases: TAXONOMY_NAME_ALIASES,
            code_aliases: TAXONOMY_CODE_ALIASES,
            matching: AliasMatch::Exact,
        }),
        Box::new(HeaderAlias {
            label: "taxonomy-case-insensitive",
            name_aliases: TAXONOMY_NAME_ALIASES,
            code_aliases: TAXONOMY_CODE_ALIASES,
            matching: AliasMatch::CaseInsensitive,
        }),
    ]
}

/// Run `detectors` for the name column, then the code column
pub fn detect_columns(table: &Table, detectors: &[Box<dyn ColumnDetector>]) -> Result<Columns> {
    let name = detect_role(table, detectors, ColumnRole::Name, None);
    let code = detect_role(table, detectors, ColumnRole::Code, name);

    match (name, code) {
        (Some(name), Some(code)) => {
            info!(
                name_column = table.header(name),
                code_column = table.header(code),
                "Using name column and code column"
            );
            Ok(Columns { name, code })
        }
        (name, code) => {
            let missing: Vec<&str> = [(name, ColumnRole::Name), (code, ColumnRole::Code)]
                .iter()
                .filter(|(found, _)| found.is_none())
                .map(|(_, role)| role.label())
                .collect();
            Err(Error::UnparseableHeader(format!(
                "could not locate {} column(s); header: {:?}",
                missing.join(" and "),
                table.headers
            )))
        }
    }
}

fn detect_role(
    table: &Table,
    detectors: &[Box<dyn ColumnDetector>],
    role: ColumnRole,
    exclude: Option<usize>,
) -> Option<usize> {
    detectors.iter().find_map(|detector| {
        let found = detector.detect(table, role, exclude);
        debug!(
            strategy = detector.name(),
            role = role.label(),
            found = ?found,
            "Column detection attempt"
        );
        found
    })
}
