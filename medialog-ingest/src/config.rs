//! Configuration for the ingest pipeline
//!
//! Credentials for the external catalogs are consumed from the environment.
//! A missing credential disables that source: its lookups fail immediately
//! and the canonicalizer falls through to the next source in priority order.

use crate::retry::RetryPolicy;
use tracing::{info, warn};

/// Environment variable carrying the TMDB API key
pub const TMDB_API_KEY_VAR: &str = "TMDB_API_KEY";
/// Environment variables carrying the IGDB (Twitch) credentials
pub const IGDB_CLIENT_ID_VAR: &str = "IGDB_CLIENT_ID";
pub const IGDB_ACCESS_TOKEN_VAR: &str = "IGDB_ACCESS_TOKEN";
/// Environment variable gating the Open Library source
pub const OPENLIBRARY_API_KEY_VAR: &str = "OPENLIBRARY_API_KEY";

/// Credentials for the external metadata services
#[derive(Debug, Clone, Default)]
pub struct Credentials {
    pub tmdb_api_key: Option<String>,
    pub igdb_client_id: Option<String>,
    pub igdb_access_token: Option<String>,
    pub openlibrary_api_key: Option<String>,
}

impl Credentials {
    /// Resolve credentials from the environment
    ///
    /// Logs which sources are enabled; never fails — a run with no
    /// credentials at all still produces (fully degraded) output.
    pub fn from_env() -> Self {
        let creds = Self {
            tmdb_api_key: read_key(TMDB_API_KEY_VAR),
            igdb_client_id: read_key(IGDB_CLIENT_ID_VAR),
            igdb_access_token: read_key(IGDB_ACCESS_TOKEN_VAR),
            openlibrary_api_key: read_key(OPENLIBRARY_API_KEY_VAR),
        };

        if creds.tmdb_api_key.is_some() {
            info!("TMDB source enabled");
        } else {
            warn!("{} not set; TV/movie lookups disabled", TMDB_API_KEY_VAR);
        }
        if creds.igdb_client_id.is_some() && creds.igdb_access_token.is_some() {
            info!("IGDB source enabled");
        } else {
            warn!(
                "{} / {} not set; game lookups disabled",
                IGDB_CLIENT_ID_VAR, IGDB_ACCESS_TOKEN_VAR
            );
        }
        if creds.openlibrary_api_key.is_some() {
            info!("Open Library source enabled");
        } else {
            warn!(
                "{} not set; book lookups disabled",
                OPENLIBRARY_API_KEY_VAR
            );
        }

        creds
    }
}

/// Read and validate one credential from the environment
fn read_key(var: &str) -> Option<String> {
    std::env::var(var).ok().filter(|key| is_valid_key(key))
}

/// Validate a credential (non-empty, non-whitespace)
fn is_valid_key(key: &str) -> bool {
    !key.trim().is_empty()
}

/// Tuning knobs for one pipeline run
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Resolutions below this confidence degrade the entry to Unknown/0.0
    pub confidence_floor: f32,
    /// Bounded worker pool size for parallel title lookups
    pub concurrency: usize,
    /// Retry policy for transient source failures
    pub retry: RetryPolicy,
    /// Header of the date-range column in the input file
    pub date_column: String,
    /// Optional cap on the number of candidate events processed
    pub limit: Option<usize>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            confidence_floor: 0.5,
            concurrency: 4,
            retry: RetryPolicy::default(),
            date_column: "DateRange".to_string(),
            limit: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_keys_are_rejected() {
        assert!(!is_valid_key(""));
        assert!(!is_valid_key("   "));
        assert!(is_valid_key("abc123"));
    }

    #[test]
    fn default_config_matches_documented_values() {
        let config = PipelineConfig::default();
        assert_eq!(config.confidence_floor, 0.5);
        assert_eq!(config.concurrency, 4);
        assert_eq!(config.retry.max_retries, 2);
        assert_eq!(config.retry.base_delay.as_millis(), 500);
        assert_eq!(config.date_column, "DateRange");
    }
}
