//! Classifier artifacts
//!
//! Everything is rendered in memory first; files are only written once the
//! whole classification has succeeded.

use crate::classifier::Classification;
use crate::suggest::{suggest, Suggestion};
use megamap_common::output::write_atomic;
use megamap_common::{Error, Result};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::info;

/// Unresolved-names diagnostic file name
pub const UNRESOLVED_FILE: &str = "unresolved_names.csv";

#[derive(Serialize)]
struct UnresolvedRow<'a> {
    #[serde(rename = "UNRESOLVED_COMMON_NAME")]
    name: &'a str,
}

/// Serialize rows as CSV with a header line
pub fn csv_bytes<T: Serialize>(rows: &[T]) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    for row in rows {
        writer.serialize(row)?;
    }
    writer
        .into_inner()
        .map_err(|e| Error::Internal(format!("CSV buffer flush failed: {}", e)))
}

/// Paths written by [`write_outputs`]
#[derive(Debug, Clone, Default)]
pub struct WrittenOutputs {
    pub unresolved: Option<PathBuf>,
    pub report: Option<PathBuf>,
    pub suggestions: Option<PathBuf>,
}

/// Write tier files, union file and the optional diagnostics
pub fn write_outputs(
    out_dir: &Path,
    classification: &Classification,
    report_path: Option<&Path>,
    suggest_path: Option<&Path>,
    taxonomy_names: &[String],
) -> Result<WrittenOutputs> {
    let unresolved = classification.unresolved_unique();

    let unresolved_csv = if unresolved.is_empty() {
        None
    } else {
        let rows: Vec<UnresolvedRow> = unresolved.iter().map(|n| UnresolvedRow { name: n }).collect();
        Some(csv_bytes(&rows)?)
    };
    let report_csv = match report_path {
        Some(_) => Some(csv_bytes(&classification.report)?),
        None => None,
    };
    let suggestion_csv = match suggest_path {
        Some(_) => {
            let suggestions: Vec<Suggestion> = suggest(&unresolved, taxonomy_names);
            info!(suggestions = suggestions.len(), "Computed suggestions for unresolved names");
            Some(csv_bytes(&suggestions)?)
        }
        None => None,
    };

    classification.rarity.save(out_dir)?;

    let mut written = WrittenOutputs::default();
    if let Some(bytes) = unresolved_csv {
        let path = out_dir.join(UNRESOLVED_FILE);
        write_atomic(&path, &bytes)?;
        written.unresolved = Some(path);
    }
    if let (Some(path), Some(bytes)) = (report_path, report_csv) {
        write_atomic(path, &bytes)?;
        written.report = Some(path.to_path_buf());
    }
    if let (Some(path), Some(bytes)) = (suggest_path, suggestion_csv) {
        write_atomic(path, &bytes)?;
        written.suggestions = Some(path.to_path_buf());
    }

    Ok(written)
}
