//! # megamap common library
//!
//! Shared code for the megamap binaries:
//! - Error type and exit-status mapping
//! - Configuration loading (TOML, environment, command line)
//! - Domain models (observations, tiers, dedup keys)
//! - Species-name normalization
//! - Per-tier species-code sets
//! - Atomic artifact writing

pub mod config;
pub mod error;
pub mod models;
pub mod names;
pub mod output;
pub mod rarity;

pub use error::{Error, Result};
pub use models::{DedupKey, Observation, RarityTier};
pub use rarity::ResolvedRarity;
