//! Configuration loading and resolution
//!
//! Every run builds one explicit configuration value up front and passes it
//! into the components; nothing below the binaries reads the environment.
//!
//! Priority order per setting:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable (handled by the binaries' argument parser)
//! 3. TOML config file
//! 4. Compiled default (fallback)

use crate::{Error, RarityTier, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use tracing::{info, warn};

/// Environment variable holding the eBird API token
pub const API_TOKEN_ENV: &str = "EBIRD_API_KEY";

pub const DEFAULT_BACK_DAYS: u32 = 1;
pub const DEFAULT_PER_SPECIES_MAX: usize = 1;
pub const DEFAULT_NATIONAL_MAX: usize = 60;
pub const DEFAULT_HARD_CEILING: usize = 2000;
pub const DEFAULT_CODES: &str = "5";
pub const DEFAULT_INTER_SHARD_DELAY_MS: u64 = 120;
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
pub const DEFAULT_RETRY_BASE_DELAY_MS: u64 = 500;
pub const DEFAULT_OUT_DIR: &str = "docs/mega";

/// eBird accepts a lookback window of 1 to 30 days
const MAX_BACK_DAYS: u32 = 30;

/// Bootstrap configuration loaded from TOML file
///
/// Every field is optional; missing values fall through to compiled defaults.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct TomlConfig {
    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub build: BuildSection,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// `[build]` table of the TOML file
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct BuildSection {
    pub mode: Option<String>,
    pub codes: Option<String>,
    pub back_days: Option<u32>,
    pub per_species_max: Option<usize>,
    pub national_max: Option<usize>,
    pub hard_ceiling: Option<usize>,
    pub inter_shard_delay_ms: Option<u64>,
    pub max_attempts: Option<u32>,
    pub retry_base_delay_ms: Option<u64>,
    pub tiers_dir: Option<PathBuf>,
    pub out_dir: Option<PathBuf>,
}

/// Default TOML location: `<config dir>/megamap/megamap.toml`
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("megamap").join("megamap.toml"))
}

/// Load the TOML config file.
///
/// An explicitly requested file must exist. The default location is optional:
/// a missing file only logs and returns `None`.
pub fn load_toml_config(explicit: Option<&Path>) -> Result<Option<TomlConfig>> {
    let path = match explicit {
        Some(path) => {
            if !path.exists() {
                return Err(Error::MissingInput(path.to_path_buf()));
            }
            path.to_path_buf()
        }
        None => match default_config_path() {
            Some(path) if path.exists() => path,
            _ => {
                info!("No config file found, using defaults");
                return Ok(None);
            }
        },
    };

    let content = std::fs::read_to_string(&path)
        .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;
    let config: TomlConfig = toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse {} failed: {}", path.display(), e)))?;

    info!("Loaded config file: {}", path.display());
    Ok(Some(config))
}

/// Observation filter mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FilterMode {
    /// Keep only species in the classified union set
    #[default]
    Restricted,
    /// Pass every observation through
    Union,
}

impl FilterMode {
    pub fn as_str(self) -> &'static str {
        match self {
            FilterMode::Restricted => "aba5_only",
            FilterMode::Union => "union",
        }
    }
}

impl FromStr for FilterMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "" | "aba5_only" | "restricted" => Ok(FilterMode::Restricted),
            "union" => Ok(FilterMode::Union),
            other => Err(Error::Config(format!(
                "unknown mode '{}' (expected 'aba5_only' or 'union')",
                other
            ))),
        }
    }
}

impl fmt::Display for FilterMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for FilterMode {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Values supplied on the command line or through the environment
#[derive(Debug, Clone, Default)]
pub struct BuildOverrides {
    pub mode: Option<String>,
    pub codes: Option<String>,
    pub back_days: Option<u32>,
    pub per_species_max: Option<usize>,
    pub national_max: Option<usize>,
    pub hard_ceiling: Option<usize>,
    pub tiers_dir: Option<PathBuf>,
    pub out_dir: Option<PathBuf>,
}

/// Fully resolved configuration of one map build
#[derive(Debug, Clone)]
pub struct BuildConfig {
    pub mode: FilterMode,
    pub tiers: BTreeSet<RarityTier>,
    /// Lookback window in days
    pub back_days: u32,
    /// Per-species cap, 0 = unlimited
    pub per_species_max: usize,
    /// Global cap applied after the per-species cap
    pub national_max: usize,
    /// Absolute ceiling; exceeding it aborts the build
    pub hard_ceiling: usize,
    pub inter_shard_delay: Duration,
    pub max_attempts: u32,
    pub retry_base_delay: Duration,
    /// Directory holding the classifier's tier files
    pub tiers_dir: PathBuf,
    pub out_dir: PathBuf,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            mode: FilterMode::Restricted,
            tiers: RarityTier::parse_list(DEFAULT_CODES).unwrap_or_default(),
            back_days: DEFAULT_BACK_DAYS,
            per_species_max: DEFAULT_PER_SPECIES_MAX,
            national_max: DEFAULT_NATIONAL_MAX,
            hard_ceiling: DEFAULT_HARD_CEILING,
            inter_shard_delay: Duration::from_millis(DEFAULT_INTER_SHARD_DELAY_MS),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            retry_base_delay: Duration::from_millis(DEFAULT_RETRY_BASE_DELAY_MS),
            tiers_dir: PathBuf::from(DEFAULT_OUT_DIR),
            out_dir: PathBuf::from(DEFAULT_OUT_DIR),
        }
    }
}

impl BuildConfig {
    /// Merge overrides, TOML and defaults, then validate
    pub fn resolve(overrides: BuildOverrides, toml: Option<&TomlConfig>) -> Result<Self> {
        let section = toml.map(|t| t.build.clone()).unwrap_or_default();

        let mode = match overrides.mode.or(section.mode) {
            Some(raw) => raw.parse()?,
            None => FilterMode::default(),
        };
        let codes = overrides
            .codes
            .or(section.codes)
            .unwrap_or_else(|| DEFAULT_CODES.to_string());

        let config = Self {
            mode,
            tiers: RarityTier::parse_list(&codes)?,
            back_days: overrides
                .back_days
                .or(section.back_days)
                .unwrap_or(DEFAULT_BACK_DAYS),
            per_species_max: overrides
                .per_species_max
                .or(section.per_species_max)
                .unwrap_or(DEFAULT_PER_SPECIES_MAX),
            national_max: overrides
                .national_max
                .or(section.national_max)
                .unwrap_or(DEFAULT_NATIONAL_MAX),
            hard_ceiling: overrides
                .hard_ceiling
                .or(section.hard_ceiling)
                .unwrap_or(DEFAULT_HARD_CEILING),
            inter_shard_delay: Duration::from_millis(
                section.inter_shard_delay_ms.unwrap_or(DEFAULT_INTER_SHARD_DELAY_MS),
            ),
            max_attempts: section.max_attempts.unwrap_or(DEFAULT_MAX_ATTEMPTS),
            retry_base_delay: Duration::from_millis(
                section.retry_base_delay_ms.unwrap_or(DEFAULT_RETRY_BASE_DELAY_MS),
            ),
            tiers_dir: overrides
                .tiers_dir
                .or(section.tiers_dir)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_OUT_DIR)),
            out_dir: overrides
                .out_dir
                .or(section.out_dir)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_OUT_DIR)),
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if !(1..=MAX_BACK_DAYS).contains(&self.back_days) {
            return Err(Error::Config(format!(
                "back_days must be in 1..={}, got {}",
                MAX_BACK_DAYS, self.back_days
            )));
        }
        if self.national_max == 0 {
            return Err(Error::Config("national_max must be at least 1".to_string()));
        }
        if self.hard_ceiling == 0 {
            return Err(Error::Config("hard_ceiling must be at least 1".to_string()));
        }
        if self.max_attempts == 0 {
            return Err(Error::Config("max_attempts must be at least 1".to_string()));
        }
        if self.tiers.is_empty() {
            return Err(Error::Config("at least one rarity code is required".to_string()));
        }
        if self.national_max > self.hard_ceiling {
            warn!(
                national_max = self.national_max,
                hard_ceiling = self.hard_ceiling,
                "national_max exceeds hard_ceiling; large builds will abort"
            );
        }
        Ok(())
    }
}

/// Configuration of one classification run
#[derive(Debug, Clone)]
pub struct ClassifyConfig {
    pub checklist: PathBuf,
    pub taxonomy: PathBuf,
    pub out_dir: PathBuf,
    pub tiers: BTreeSet<RarityTier>,
    /// Optional full match report CSV
    pub report: Option<PathBuf>,
    /// Optional fuzzy-suggestion CSV for unresolved names
    pub suggest: Option<PathBuf>,
}

impl ClassifyConfig {
    /// Both inputs must exist before anything is read or written
    pub fn validate(&self) -> Result<()> {
        for path in [&self.checklist, &self.taxonomy] {
            if !path.exists() {
                return Err(Error::MissingInput(path.clone()));
            }
        }
        if self.tiers.is_empty() {
            return Err(Error::Config("at least one rarity code is required".to_string()));
        }
        Ok(())
    }
}

/// API token; never printed in full
#[derive(Clone)]
pub struct ApiToken(String);

impl ApiToken {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiToken(***)")
    }
}

/// Validate the token value taken from [`API_TOKEN_ENV`]
pub fn resolve_api_token(value: Option<String>) -> Result<ApiToken> {
    match value {
        Some(key) if is_valid_key(&key) => Ok(ApiToken(key.trim().to_string())),
        _ => Err(Error::MissingCredential(API_TOKEN_ENV.to_string())),
    }
}

/// Validate API key (non-empty, non-whitespace)
pub fn is_valid_key(key: &str) -> bool {
    !key.trim().is_empty()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_mode_parse() {
        assert_eq!("aba5_only".parse::<FilterMode>().unwrap(), FilterMode::Restricted);
        assert_eq!("".parse::<FilterMode>().unwrap(), FilterMode::Restricted);
        assert_eq!("union".parse::<FilterMode>().unwrap(), FilterMode::Union);
        assert!("everything".parse::<FilterMode>().is_err());
    }

    #[test]
    fn test_token_debug_is_redacted() {
        let token = resolve_api_token(Some("secret-key".to_string())).unwrap();
        assert_eq!(format!("{:?}", token), "ApiToken(***)");
        assert_eq!(token.as_str(), "secret-key");
    }

    #[test]
    fn test_blank_token_is_missing_credential() {
        let err = resolve_api_token(Some("   ".to_string())).unwrap_err();
        assert!(matches!(err, Error::MissingCredential(_)));
        assert_eq!(err.exit_code(), 2);

        assert!(resolve_api_token(None).is_err());
    }
}
