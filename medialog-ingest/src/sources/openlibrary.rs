//! Open Library client (books)
//!
//! Queries the Open Library search API. The endpoint itself is keyless, but
//! the source follows the same credential gate as the other adapters so a
//! run can disable book lookups uniformly.
//!
//! # Confidence Scoring
//! `0.8 * title_similarity`, plus 0.1 when an author is attributed and 0.1
//! when the first-publish year matches a hinted release year.
//!
//! # API Reference
//! - Endpoint: https://openlibrary.org/search.json
//! - Documentation: https://openlibrary.org/dev/docs/api/search

use crate::sources::title_similarity;
use crate::types::{MetadataSource, Resolution, SourceError, SourceId};
use async_trait::async_trait;
use medialog_common::models::{MediaType, Tags};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

/// Open Library search endpoint
const OPENLIBRARY_API_URL: &str = "https://openlibrary.org/search.json";

/// Default timeout for Open Library API requests
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Candidates requested per query
const MAX_RESULTS: usize = 5;

/// Subjects kept as genre tags per candidate
const MAX_SUBJECTS: usize = 3;

/// Open Library source adapter
pub struct OpenLibrarySource {
    http_client: Client,
    api_key: Option<String>,
}

impl OpenLibrarySource {
    /// Create a new Open Library source; `api_key = None` disables it
    pub fn new(api_key: Option<String>) -> Self {
        Self {
            http_client: Client::builder()
                .timeout(DEFAULT_TIMEOUT)
                .build()
                .expect("Failed to create HTTP client"),
            api_key,
        }
    }

    fn score_doc(
        &self,
        query: &str,
        release_year: Option<i32>,
        doc: OpenLibraryDoc,
    ) -> Option<Resolution> {
        let canonical_title = doc.title?;
        if canonical_title.is_empty() {
            return None;
        }

        let similarity = title_similarity(query, &canonical_title);
        let has_author = doc
            .author_name
            .as_ref()
            .map(|a| !a.is_empty())
            .unwrap_or(false);
        let year_match = match (release_year, doc.first_publish_year) {
            (Some(wanted), Some(published)) => wanted == published,
            _ => false,
        };

        let mut confidence = 0.8 * similarity;
        if has_author {
            confidence += 0.1;
        }
        if year_match {
            confidence += 0.1;
        }

        let genre = doc
            .subject
            .unwrap_or_default()
            .into_iter()
            .take(MAX_SUBJECTS)
            .collect();

        Some(Resolution {
            canonical_title,
            media_type: MediaType::Book,
            tags: Tags {
                genre,
                release_year: doc.first_publish_year,
                ..Tags::default()
            },
            confidence: confidence.clamp(0.0, 1.0),
        })
    }
}

#[async_trait]
impl MetadataSource for OpenLibrarySource {
    fn id(&self) -> SourceId {
        SourceId::OpenLibrary
    }

    async fn query(
        &self,
        title: &str,
        release_year: Option<i32>,
    ) -> Result<Vec<Resolution>, SourceError> {
        if self.api_key.is_none() {
            return Err(SourceError::Disabled("openlibrary"));
        }

        debug!(title, "Querying Open Library");

        let response = self
            .http_client
            .get(OPENLIBRARY_API_URL)
            .query(&[("title", title), ("limit", &MAX_RESULTS.to_string())])
            .send()
            .await
            .map_err(|e| SourceError::Network(format!("Open Library request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(SourceError::Api(format!(
                "Open Library returned {}",
                response.status()
            )));
        }

        let data: SearchResponse = response
            .json()
            .await
            .map_err(|e| SourceError::Parse(format!("Open Library response: {}", e)))?;

        let mut hits: Vec<Resolution> = data
            .docs
            .into_iter()
            .take(MAX_RESULTS)
            .filter_map(|doc| self.score_doc(title, release_year, doc))
            .collect();

        if hits.is_empty() {
            return Err(SourceError::NoMatch(title.to_string()));
        }

        hits.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
        Ok(hits)
    }
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    docs: Vec<OpenLibraryDoc>,
}

#[derive(Debug, Deserialize)]
struct OpenLibraryDoc {
    title: Option<String>,
    author_name: Option<Vec<String>>,
    first_publish_year: Option<i32>,
    subject: Option<Vec<String>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_credential_disables_source() {
        let source = OpenLibrarySource::new(None);
        let err = source.query("The Hobbit", None).await.unwrap_err();
        assert!(matches!(err, SourceError::Disabled("openlibrary")));
    }

    #[test]
    fn author_and_year_match_boost_confidence() {
        let source = OpenLibrarySource::new(Some("k".to_string()));

        let bare = source
            .score_doc(
                "The Hobbit",
                None,
                OpenLibraryDoc {
                    title: Some("The Hobbit".to_string()),
                    author_name: None,
                    first_publish_year: None,
                    subject: None,
                },
            )
            .unwrap();

        let attributed = source
            .score_doc(
                "The Hobbit",
                Some(1937),
                OpenLibraryDoc {
                    title: Some("The Hobbit".to_string()),
                    author_name: Some(vec!["J.R.R. Tolkien".to_string()]),
                    first_publish_year: Some(1937),
                    subject: Some(vec![
                        "Fantasy".to_string(),
                        "Fiction".to_string(),
                        "Adventure".to_string(),
                        "Middle Earth".to_string(),
                    ]),
                },
            )
            .unwrap();

        assert!(attributed.confidence > bare.confidence);
        assert_eq!(attributed.confidence, 1.0);
        assert_eq!(attributed.media_type, MediaType::Book);
        // Subjects are capped
        assert_eq!(attributed.tags.genre.len(), 3);
        assert_eq!(attributed.tags.release_year, Some(1937));
    }
}
