//! Command-line arguments for megamap-build
//!
//! Each tunable can also come from its `MEGA_*` environment variable; clap
//! resolves argument over environment, the TOML file and compiled defaults
//! are applied later by [`BuildConfig::resolve`](megamap_common::config::BuildConfig::resolve).

use clap::Parser;
use megamap_common::config::BuildOverrides;
use std::path::PathBuf;

#[derive(Parser, Debug, Clone)]
#[command(name = "megamap-build")]
#[command(about = "Build the rarity sighting map from recent eBird notable observations")]
#[command(version)]
pub struct BuildArgs {
    /// Directory holding aba{tier}.json files
    #[arg(long)]
    pub tiers_dir: Option<PathBuf>,

    /// Output directory for markers.json and summary.json
    #[arg(long)]
    pub out_dir: Option<PathBuf>,

    /// Comma-separated rarity codes to map, e.g. '5' or '4,5'
    #[arg(long)]
    pub codes: Option<String>,

    /// Filter mode: 'aba5_only' or 'union'
    #[arg(long, env = "MEGA_MODE")]
    pub mode: Option<String>,

    /// Lookback window in days (1-30)
    #[arg(long, env = "MEGA_BACK_DAYS_RECENT")]
    pub back_days: Option<u32>,

    /// Global cap on mapped records
    #[arg(long, env = "MEGA_NATIONAL_MAX")]
    pub national_max: Option<usize>,

    /// Per-species cap (0 = unlimited)
    #[arg(long, env = "MEGA_PER_SPECIES_MAX")]
    pub per_species_max: Option<usize>,

    /// Abort when more records than this remain after capping
    #[arg(long, env = "MEGA_HARD_CEILING")]
    pub hard_ceiling: Option<usize>,

    /// TOML config file (default: <config dir>/megamap/megamap.toml)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Log level when RUST_LOG is unset (overrides the config file)
    #[arg(long)]
    pub log_level: Option<String>,
}

impl BuildArgs {
    pub fn overrides(&self) -> BuildOverrides {
        BuildOverrides {
            mode: self.mode.clone(),
            codes: self.codes.clone(),
            back_days: self.back_days,
            per_species_max: self.per_species_max,
            national_max: self.national_max,
            hard_ceiling: self.hard_ceiling,
            tiers_dir: self.tiers_dir.clone(),
            out_dir: self.out_dir.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use megamap_common::config::{BuildConfig, FilterMode, TomlConfig};
    use serial_test::serial;
    use std::env;

    const VARS: &[&str] = &[
        "MEGA_MODE",
        "MEGA_BACK_DAYS_RECENT",
        "MEGA_NATIONAL_MAX",
        "MEGA_PER_SPECIES_MAX",
        "MEGA_HARD_CEILING",
    ];

    fn clear_env() {
        for var in VARS {
            env::remove_var(var);
        }
    }

    #[test]
    #[serial]
    fn test_environment_fills_missing_arguments() {
        clear_env();
        env::set_var("MEGA_NATIONAL_MAX", "25");
        env::set_var("MEGA_MODE", "union");

        let args = BuildArgs::try_parse_from(["megamap-build"]).unwrap();
        let config = BuildConfig::resolve(args.overrides(), None).unwrap();

        assert_eq!(config.national_max, 25);
        assert_eq!(config.mode, FilterMode::Union);
        assert_eq!(config.back_days, 1);
        clear_env();
    }

    #[test]
    #[serial]
    fn test_argument_beats_environment_beats_toml() {
        clear_env();
        env::set_var("MEGA_BACK_DAYS_RECENT", "7");
        env::set_var("MEGA_PER_SPECIES_MAX", "3");

        let toml: TomlConfig = toml::from_str(
            "[build]\nback_days = 14\nper_species_max = 9\nhard_ceiling = 500\n",
        )
        .unwrap();
        let args =
            BuildArgs::try_parse_from(["megamap-build", "--per-species-max", "0"]).unwrap();
        let config = BuildConfig::resolve(args.overrides(), Some(&toml)).unwrap();

        assert_eq!(config.per_species_max, 0);
        assert_eq!(config.back_days, 7);
        assert_eq!(config.hard_ceiling, 500);
        clear_env();
    }

    #[test]
    #[serial]
    fn test_invalid_environment_value_rejected() {
        clear_env();
        env::set_var("MEGA_BACK_DAYS_RECENT", "45");

        let args = BuildArgs::try_parse_from(["megamap-build"]).unwrap();
        let err = BuildConfig::resolve(args.overrides(), None).unwrap_err();
        assert_eq!(err.exit_code(), 2);
        clear_env();
    }

    #[test]
    #[serial]
    fn test_codes_and_paths() {
        clear_env();
        let args = BuildArgs::try_parse_from([
            "megamap-build",
            "--codes",
            "4,5",
            "--tiers-dir",
            "data/tiers",
            "--out-dir",
            "site/mega",
        ])
        .unwrap();
        let config = BuildConfig::resolve(args.overrides(), None).unwrap();

        assert_eq!(config.tiers.len(), 2);
        assert_eq!(config.tiers_dir, PathBuf::from("data/tiers"));
        assert_eq!(config.out_dir, PathBuf::from("site/mega"));
    }
}
