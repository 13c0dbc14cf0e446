//! TMDB client (TV shows and movies)
//!
//! Queries The Movie Database search API in both `tv` and `movie` modes and
//! merges the candidates. Genre IDs are resolved through the per-mode genre
//! list endpoint, fetched lazily and cached for the run.
//!
//! # Confidence Scoring
//! `0.7 * title_similarity + 0.2 * min(1, popularity/100)
//!  + 0.1 * min(1, vote_average/10)`
//!
//! # API Reference
//! - Endpoint: https://api.themoviedb.org/3/search/{tv,movie}
//! - Documentation: https://developer.themoviedb.org/reference/search-tv

use crate::sources::title_similarity;
use crate::types::{MetadataSource, Resolution, SourceError, SourceId};
use async_trait::async_trait;
use medialog_common::models::{MediaType, Tags};
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::{sleep, Instant};
use tracing::{debug, warn};

/// TMDB API base URL
const TMDB_API_URL: &str = "https://api.themoviedb.org/3";

/// Default timeout for TMDB API requests
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Courtesy spacing between requests
const RATE_LIMIT_INTERVAL: Duration = Duration::from_millis(250);

/// Candidates kept per query
const MAX_RESULTS: usize = 5;

/// TMDB source adapter
///
/// Covers both TV shows and movies; a single query fans out to both search
/// modes and returns the merged candidates sorted by confidence.
pub struct TmdbSource {
    http_client: Client,
    api_key: Option<String>,
    /// Genre-ID → name maps, cached per mode for the run
    genre_maps: Mutex<HashMap<&'static str, HashMap<i64, String>>>,
    /// Last request time, for request spacing
    rate_limiter: Mutex<Option<Instant>>,
}

impl TmdbSource {
    /// Create a new TMDB source; `api_key = None` disables it
    pub fn new(api_key: Option<String>) -> Self {
        Self {
            http_client: Client::builder()
                .timeout(DEFAULT_TIMEOUT)
                .build()
                .expect("Failed to create HTTP client"),
            api_key,
            genre_maps: Mutex::new(HashMap::new()),
            rate_limiter: Mutex::new(None),
        }
    }

    async fn enforce_rate_limit(&self) {
        let mut last_request = self.rate_limiter.lock().await;

        if let Some(last_time) = *last_request {
            let elapsed = last_time.elapsed();
            if elapsed < RATE_LIMIT_INTERVAL {
                sleep(RATE_LIMIT_INTERVAL - elapsed).await;
            }
        }

        *last_request = Some(Instant::now());
    }

    /// Fetch (or reuse) the genre-ID map for one search mode
    ///
    /// Genre resolution is best-effort: a failed fetch degrades to an empty
    /// map for this query instead of failing the search.
    async fn genre_map(&self, api_key: &str, mode: &'static str) -> HashMap<i64, String> {
        {
            let maps = self.genre_maps.lock().await;
            if let Some(map) = maps.get(mode) {
                return map.clone();
            }
        }

        let url = format!("{}/genre/{}/list", TMDB_API_URL, mode);
        let fetched = async {
            let response = self
                .http_client
                .get(&url)
                .query(&[("api_key", api_key), ("language", "en-US")])
                .send()
                .await
                .map_err(|e| SourceError::Network(format!("TMDB genre list failed: {}", e)))?;

            if !response.status().is_success() {
                return Err(SourceError::Api(format!(
                    "TMDB genre list returned {}",
                    response.status()
                )));
            }

            response
                .json::<GenreListResponse>()
                .await
                .map_err(|e| SourceError::Parse(format!("TMDB genre list: {}", e)))
        }
        .await;

        match fetched {
            Ok(list) => {
                let map: HashMap<i64, String> =
                    list.genres.into_iter().map(|g| (g.id, g.name)).collect();
                self.genre_maps.lock().await.insert(mode, map.clone());
                map
            }
            Err(err) => {
                warn!(mode, error = %err, "TMDB genre map unavailable, tagging without genres");
                HashMap::new()
            }
        }
    }

    /// Run one search mode and score its candidates
    async fn search_mode(
        &self,
        api_key: &str,
        mode: &'static str,
        title: &str,
        release_year: Option<i32>,
    ) -> Result<Vec<Resolution>, SourceError> {
        self.enforce_rate_limit().await;

        let mut params = vec![
            ("api_key".to_string(), api_key.to_string()),
            ("query".to_string(), title.to_string()),
            ("language".to_string(), "en-US".to_string()),
            ("page".to_string(), "1".to_string()),
            ("include_adult".to_string(), "false".to_string()),
        ];
        if let Some(year) = release_year {
            let year_param = if mode == "tv" { "first_air_date_year" } else { "year" };
            params.push((year_param.to_string(), year.to_string()));
        }

        let url = format!("{}/search/{}", TMDB_API_URL, mode);
        let response = self
            .http_client
            .get(&url)
            .query(&params)
            .send()
            .await
            .map_err(|e| SourceError::Network(format!("TMDB search failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(SourceError::Api(format!(
                "TMDB search/{} returned {}",
                mode,
                response.status()
            )));
        }

        let data: SearchResponse = response
            .json()
            .await
            .map_err(|e| SourceError::Parse(format!("TMDB search response: {}", e)))?;

        let genre_map = self.genre_map(api_key, mode).await;

        let resolutions = data
            .results
            .into_iter()
            .take(MAX_RESULTS)
            .filter_map(|item| self.score_item(mode, title, item, &genre_map))
            .collect();

        Ok(resolutions)
    }

    fn score_item(
        &self,
        mode: &str,
        query: &str,
        item: SearchItem,
        genre_map: &HashMap<i64, String>,
    ) -> Option<Resolution> {
        // TV entries carry `name`, movies carry `title`
        let canonical_title = if mode == "tv" { item.name } else { item.title }?;
        if canonical_title.is_empty() {
            return None;
        }

        let similarity = title_similarity(query, &canonical_title);
        let popularity = (item.popularity.unwrap_or(0.0) / 100.0).min(1.0);
        let vote = (item.vote_average.unwrap_or(0.0) / 10.0).min(1.0);
        let confidence = 0.7 * similarity + 0.2 * popularity + 0.1 * vote;

        let genre = item
            .genre_ids
            .unwrap_or_default()
            .iter()
            .filter_map(|id| genre_map.get(id).cloned())
            .collect();

        let date = if mode == "tv" {
            item.first_air_date
        } else {
            item.release_date
        };
        let release_year = date
            .as_deref()
            .and_then(|d| d.get(..4))
            .and_then(|y| y.parse().ok());

        Some(Resolution {
            canonical_title,
            media_type: if mode == "tv" { MediaType::Tv } else { MediaType::Movie },
            tags: Tags {
                genre,
                release_year,
                ..Tags::default()
            },
            confidence: confidence.clamp(0.0, 1.0),
        })
    }
}

#[async_trait]
impl MetadataSource for TmdbSource {
    fn id(&self) -> SourceId {
        SourceId::Tmdb
    }

    async fn query(
        &self,
        title: &str,
        release_year: Option<i32>,
    ) -> Result<Vec<Resolution>, SourceError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or(SourceError::Disabled("tmdb"))?;

        debug!(title, "Querying TMDB");

        let mut hits = self.search_mode(api_key, "movie", title, release_year).await?;
        hits.extend(self.search_mode(api_key, "tv", title, release_year).await?);

        if hits.is_empty() {
            return Err(SourceError::NoMatch(title.to_string()));
        }

        hits.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
        hits.truncate(MAX_RESULTS);
        Ok(hits)
    }
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<SearchItem>,
}

#[derive(Debug, Deserialize)]
struct SearchItem {
    /// Movie display name
    title: Option<String>,
    /// TV display name
    name: Option<String>,
    popularity: Option<f32>,
    vote_average: Option<f32>,
    genre_ids: Option<Vec<i64>>,
    release_date: Option<String>,
    first_air_date: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GenreListResponse {
    #[serde(default)]
    genres: Vec<Genre>,
}

#[derive(Debug, Deserialize)]
struct Genre {
    id: i64,
    name: String,
}
