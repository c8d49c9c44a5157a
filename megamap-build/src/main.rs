//! megamap-build - builds the rarity sighting map
//!
//! Loads the classified tier files, fetches recent notable observations for
//! every US and Canadian region, and writes `markers.json` and
//! `summary.json` to the output directory.

use anyhow::{Context, Result};
use clap::Parser;
use megamap_build::cli::BuildArgs;
use megamap_build::EbirdClient;
use megamap_common::config::{
    load_toml_config, resolve_api_token, BuildConfig, TomlConfig, API_TOKEN_ENV,
};
use std::process::ExitCode;
use tracing::{error, info};

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let args = BuildArgs::parse();

    // Config file is read before logging starts so its level can apply
    let toml = load_toml_config(args.config.as_deref());
    let level = args
        .log_level
        .clone()
        .or_else(|| {
            toml.as_ref()
                .ok()
                .and_then(Option::as_ref)
                .map(|t| t.logging.level.clone())
        })
        .unwrap_or_else(|| "info".to_string());

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&level)),
        )
        .init();

    info!(
        "Starting megamap-build v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    let result = match toml {
        Ok(toml) => run(args, toml).await,
        Err(e) => Err(e.into()),
    };

    match result {
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

async fn run(args: BuildArgs, toml: Option<TomlConfig>) -> Result<()> {
    let config = BuildConfig::resolve(args.overrides(), toml.as_ref())?;
    info!(
        mode = %config.mode,
        back_days = config.back_days,
        per_species_max = config.per_species_max,
        national_max = config.national_max,
        hard_ceiling = config.hard_ceiling,
        "Resolved build configuration"
    );

    let token = resolve_api_token(std::env::var(API_TOKEN_ENV).ok())?;
    let client = EbirdClient::new(token).context("Failed to create eBird client")?;

    let outcome = megamap_build::run(&config, &client).await?;

    info!(
        "Build complete: {} markers from {} records, {} failed region(s); summary at {}",
        outcome.summary.count_markers,
        outcome.summary.count_megas,
        outcome.summary.failed_regions.len(),
        outcome.summary_path.display()
    );
    Ok(())
}
