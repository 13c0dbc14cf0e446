//! IGDB client (video games)
//!
//! Queries the Internet Game Database `games` endpoint with an Apicalypse
//! search body. Requires two Twitch credentials (client ID + access token);
//! either missing disables the source.
//!
//! # Confidence Scoring
//! `0.7 * title_similarity + 0.3 * min(1, rating/100)` using the
//! aggregated critic rating when present, the user rating otherwise.
//!
//! # API Reference
//! - Endpoint: https://api.igdb.com/v4/games
//! - Documentation: https://api-docs.igdb.com/#game

use crate::sources::title_similarity;
use crate::types::{MetadataSource, Resolution, SourceError, SourceId};
use async_trait::async_trait;
use chrono::{DateTime, Datelike};
use medialog_common::models::{MediaType, Tags};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

/// IGDB games endpoint
const IGDB_API_URL: &str = "https://api.igdb.com/v4/games";

/// Default timeout for IGDB API requests
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Candidates requested per query
const MAX_RESULTS: usize = 5;

/// IGDB source adapter
pub struct IgdbSource {
    http_client: Client,
    client_id: Option<String>,
    access_token: Option<String>,
}

impl IgdbSource {
    /// Create a new IGDB source; a missing credential disables it
    pub fn new(client_id: Option<String>, access_token: Option<String>) -> Self {
        Self {
            http_client: Client::builder()
                .timeout(DEFAULT_TIMEOUT)
                .build()
                .expect("Failed to create HTTP client"),
            client_id,
            access_token,
        }
    }

    fn score_game(&self, query: &str, game: IgdbGame) -> Option<Resolution> {
        let canonical_title = game.name?;
        if canonical_title.is_empty() {
            return None;
        }

        let similarity = title_similarity(query, &canonical_title);
        let rating = game.aggregated_rating.or(game.rating).unwrap_or(0.0);
        let confidence = 0.7 * similarity + 0.3 * (rating as f32 / 100.0).min(1.0);

        let genre = game
            .genres
            .unwrap_or_default()
            .into_iter()
            .map(|g| g.name)
            .collect();
        let platform = game
            .platforms
            .unwrap_or_default()
            .into_iter()
            .filter_map(|p| p.abbreviation.or(p.name))
            .collect();
        let release_year = game
            .first_release_date
            .and_then(|ts| DateTime::from_timestamp(ts, 0))
            .map(|dt| dt.year());

        Some(Resolution {
            canonical_title,
            media_type: MediaType::Game,
            tags: Tags {
                genre,
                platform,
                release_year,
                ..Tags::default()
            },
            confidence: confidence.clamp(0.0, 1.0),
        })
    }
}

#[async_trait]
impl MetadataSource for IgdbSource {
    fn id(&self) -> SourceId {
        SourceId::Igdb
    }

    async fn query(
        &self,
        title: &str,
        _release_year: Option<i32>,
    ) -> Result<Vec<Resolution>, SourceError> {
        let (client_id, token) = match (&self.client_id, &self.access_token) {
            (Some(id), Some(token)) => (id, token),
            _ => return Err(SourceError::Disabled("igdb")),
        };

        debug!(title, "Querying IGDB");

        // Apicalypse query body; search terms must have quotes escaped
        let escaped = title.replace('"', "\\\"");
        let body = format!(
            "search \"{}\"; fields name,rating,aggregated_rating,genres.name,\
             platforms.abbreviation,platforms.name,first_release_date; limit {};",
            escaped, MAX_RESULTS
        );

        let response = self
            .http_client
            .post(IGDB_API_URL)
            .header("Client-ID", client_id)
            .bearer_auth(token)
            .body(body)
            .send()
            .await
            .map_err(|e| SourceError::Network(format!("IGDB request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(SourceError::Api(format!(
                "IGDB returned {}",
                response.status()
            )));
        }

        let games: Vec<IgdbGame> = response
            .json()
            .await
            .map_err(|e| SourceError::Parse(format!("IGDB response: {}", e)))?;

        let mut hits: Vec<Resolution> = games
            .into_iter()
            .filter_map(|game| self.score_game(title, game))
            .collect();

        if hits.is_empty() {
            return Err(SourceError::NoMatch(title.to_string()));
        }

        hits.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
        Ok(hits)
    }
}

#[derive(Debug, Deserialize)]
struct IgdbGame {
    name: Option<String>,
    rating: Option<f64>,
    aggregated_rating: Option<f64>,
    genres: Option<Vec<IgdbGenre>>,
    platforms: Option<Vec<IgdbPlatform>>,
    first_release_date: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct IgdbGenre {
    name: String,
}

#[derive(Debug, Deserialize)]
struct IgdbPlatform {
    abbreviation: Option<String>,
    name: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_credentials_disable_source() {
        let source = IgdbSource::new(Some("id".to_string()), None);
        let err = source.query("Hades", None).await.unwrap_err();
        assert!(matches!(err, SourceError::Disabled("igdb")));
    }

    #[test]
    fn scores_game_with_platform_tags() {
        let source = IgdbSource::new(None, None);
        let resolution = source
            .score_game(
                "The Witcher 3",
                IgdbGame {
                    name: Some("The Witcher 3: Wild Hunt".to_string()),
                    rating: Some(93.4),
                    aggregated_rating: Some(91.2),
                    genres: Some(vec![IgdbGenre {
                        name: "Role-playing (RPG)".to_string(),
                    }]),
                    platforms: Some(vec![IgdbPlatform {
                        abbreviation: Some("PC".to_string()),
                        name: Some("PC (Microsoft Windows)".to_string()),
                    }]),
                    // May 19, 2015
                    first_release_date: Some(1431993600),
                },
            )
            .unwrap();

        assert_eq!(resolution.media_type, MediaType::Game);
        assert_eq!(resolution.tags.platform, vec!["PC"]);
        assert_eq!(resolution.tags.release_year, Some(2015));
        assert!(resolution.confidence > 0.7);
    }

    #[test]
    fn nameless_game_is_dropped() {
        let source = IgdbSource::new(None, None);
        assert!(source
            .score_game(
                "x",
                IgdbGame {
                    name: None,
                    rating: None,
                    aggregated_rating: None,
                    genres: None,
                    platforms: None,
                    first_release_date: None,
                },
            )
            .is_none());
    }
}
