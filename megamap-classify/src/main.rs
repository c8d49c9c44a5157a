//! megamap-classify - builds per-tier species-code sets
//!
//! Reads the ABA checklist and the eBird taxonomy, resolves checklist names
//! to species codes and writes `aba{tier}.json` files plus `aba_allowed.json`.

use anyhow::Result;
use clap::Parser;
use megamap_common::config::ClassifyConfig;
use megamap_common::RarityTier;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info};

/// Command-line arguments for megamap-classify
#[derive(Parser, Debug)]
#[command(name = "megamap-classify")]
#[command(about = "Resolve ABA checklist codes to eBird species codes")]
#[command(version)]
struct Args {
    /// ABA checklist CSV/TSV
    #[arg(long, alias = "aba_csv")]
    checklist: PathBuf,

    /// eBird taxonomy CSV
    #[arg(long, alias = "taxonomy_csv")]
    taxonomy: PathBuf,

    /// Output directory for tier files
    #[arg(long, default_value = "docs/mega")]
    out_dir: PathBuf,

    /// Comma-separated ABA codes to include, e.g. '5' or '4,5'
    #[arg(long, default_value = "5")]
    codes: String,

    /// Optional: write a CSV match report
    #[arg(long)]
    report: Option<PathBuf>,

    /// Optional: write fuzzy suggestions for unresolved names
    #[arg(long)]
    suggest: Option<PathBuf>,

    /// Log level when RUST_LOG is unset
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn main() -> ExitCode {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&args.log_level)),
        )
        .init();

    info!(
        "Starting megamap-classify v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            let code = e
                .downcast_ref::<megamap_common::Error>()
                .map(megamap_common::Error::exit_code)
                .unwrap_or(1);
            ExitCode::from(code as u8)
        }
    }
}

fn run(args: Args) -> Result<()> {
    let config = ClassifyConfig {
        checklist: args.checklist,
        taxonomy: args.taxonomy,
        out_dir: args.out_dir,
        tiers: RarityTier::parse_list(&args.codes)?,
        report: args.report,
        suggest: args.suggest,
    };

    let (classification, written) = megamap_classify::run(&config)?;

    if let Some(path) = written.unresolved {
        info!("Unresolved names written to {}", path.display());
    }
    info!(
        "Wrote {} species codes across {} tier(s) to {}",
        classification.union().len(),
        config.tiers.len(),
        config.out_dir.display()
    );
    Ok(())
}
