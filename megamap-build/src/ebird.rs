//! eBird API v2 client
//!
//! Queries recent notable observations for one region at a time. Status
//! handling is deliberately coarse: the fetcher decides what to retry.

use crate::fetcher::ObservationSource;
use async_trait::async_trait;
use megamap_common::config::ApiToken;
use megamap_common::models::canonical_species_code;
use megamap_common::Observation;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

const EBIRD_BASE_URL: &str = "https://api.ebird.org/v2";
const USER_AGENT: &str = concat!("megamap/", env!("CARGO_PKG_VERSION"));
const TOKEN_HEADER: &str = "X-eBirdApiToken";
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Largest result page the API hands out
pub const MAX_RESULTS: u32 = 10_000;

/// Response bodies are truncated to this many characters in errors
const BODY_PREFIX_CHARS: usize = 200;

/// Per-shard fetch errors
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Rate limited (HTTP 429)")]
    RateLimited,

    #[error("Rate limit persisted for {region} after {attempts} attempts")]
    RateLimitExhausted { region: String, attempts: u32 },

    #[error("API error {0}: {1}")]
    Api(u16, String),

    #[error("Parse error: {0}")]
    Parse(String),
}

/// Query parameters shared by every shard request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryParams {
    /// Lookback window in days
    pub back_days: u32,
    pub max_results: u32,
}

impl QueryParams {
    pub fn new(back_days: u32) -> Self {
        Self {
            back_days,
            max_results: MAX_RESULTS,
        }
    }

    pub fn query_pairs(&self) -> [(&'static str, String); 3] {
        [
            ("back", self.back_days.to_string()),
            ("detail", "full".to_string()),
            ("maxResults", self.max_results.to_string()),
        ]
    }
}

/// One record of the `recent/notable` response (`detail=full`)
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EbirdObservation {
    #[serde(default)]
    pub species_code: String,
    pub com_name: Option<String>,
    pub sci_name: Option<String>,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    pub loc_name: Option<String>,
    pub obs_dt: Option<String>,
    #[serde(default)]
    pub sub_id: String,
    pub how_many: Option<u32>,
    pub country_code: Option<String>,
    #[serde(rename = "subnational1Code")]
    pub subnational1_code: Option<String>,
}

impl EbirdObservation {
    /// Convert to the internal record; `None` when coordinates are missing
    pub fn into_observation(self) -> Option<Observation> {
        let (lat, lon) = (self.lat?, self.lng?);
        Some(Observation {
            species_code: canonical_species_code(&self.species_code),
            common_name: self.com_name,
            scientific_name: self.sci_name,
            lat,
            lon,
            location_name: self.loc_name.unwrap_or_default(),
            observed_at: self.obs_dt,
            submission_id: self.sub_id.trim().to_string(),
            count: self.how_many,
            country_code: self.country_code,
            subdivision_code: self.subnational1_code,
        })
    }
}

/// eBird API client
pub struct EbirdClient {
    http_client: reqwest::Client,
    base_url: String,
    token: ApiToken,
}

impl EbirdClient {
    pub fn new(token: ApiToken) -> Result<Self, FetchError> {
        Self::with_base_url(token, EBIRD_BASE_URL)
    }

    /// Client against another API root, e.g. a local test server
    pub fn with_base_url(token: ApiToken, base_url: &str) -> Result<Self, FetchError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| FetchError::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
        })
    }

    fn notable_url(&self, region: &str) -> String {
        format!("{}/data/obs/{}/recent/notable", self.base_url, region)
    }
}

#[async_trait]
impl ObservationSource for EbirdClient {
    async fn recent_notable(
        &self,
        region: &str,
        params: &QueryParams,
    ) -> Result<Vec<EbirdObservation>, FetchError> {
        let url = self.notable_url(region);
        tracing::debug!(region = %region, url = %url, "Querying eBird API");

        let response = self
            .http_client
            .get(&url)
            .header(TOKEN_HEADER, self.token.as_str())
            .query(&params.query_pairs())
            .send()
            .await
            .map_err(|e| FetchError::Network(e.to_string()))?;

        let status = response.status();

        if status.as_u16() == 429 {
            return Err(FetchError::RateLimited);
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            if status.as_u16() == 400 {
                tracing::warn!(region = %region, body = %body, "eBird rejected request");
            }
            let prefix: String = body.chars().take(BODY_PREFIX_CHARS).collect();
            return Err(FetchError::Api(status.as_u16(), prefix));
        }

        let body = response
            .text()
            .await
            .map_err(|e| FetchError::Network(e.to_string()))?;
        serde_json::from_str(&body).map_err(|e| FetchError::Parse(e.to_string()))
    }
}
