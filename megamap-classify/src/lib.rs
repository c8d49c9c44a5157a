//! megamap-classify library interface
//!
//! Resolves a rarity checklist against the reference taxonomy and writes one
//! species-code set per requested tier plus their union.

pub mod classifier;
pub mod columns;
pub mod output;
pub mod suggest;
pub mod table;
pub mod taxonomy;

pub use classifier::{Classification, RarityClassifier, RarityRow};
pub use taxonomy::TaxonomyResolver;

use megamap_common::config::ClassifyConfig;
use megamap_common::Result;
use output::WrittenOutputs;
use tracing::info;

/// Classify the checklist named in `config` and write every artifact.
///
/// Inputs are validated and the whole classification is computed before the
/// first file is written.
pub fn run(config: &ClassifyConfig) -> Result<(Classification, WrittenOutputs)> {
    config.validate()?;

    let resolver = TaxonomyResolver::load(&config.taxonomy)?;
    let checklist = table::read_checklist(&config.checklist)?;
    info!(
        path = %config.checklist.display(),
        rows = checklist.rows.len(),
        "Loaded checklist"
    );

    let classification =
        RarityClassifier::new(&resolver, config.tiers.clone()).classify_table(&checklist)?;

    let written = output::write_outputs(
        &config.out_dir,
        &classification,
        config.report.as_deref(),
        config.suggest.as_deref(),
        resolver.display_names(),
    )?;

    Ok((classification, written))
}
