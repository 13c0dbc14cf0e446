//! Core types and trait definitions for the ingest pipeline
//!
//! Defines the units flowing through the strict pipeline
//! Loader → Extraction → Canonicalizer → Validator/Serializer:
//! - `WeeklyRecord` — one raw input row, immutable after loading
//! - `CandidateEvent` — one extracted, not-yet-tagged consumption occurrence
//! - `Resolution` — one confidence-scored answer from a metadata source
//!
//! Also defines the `MetadataSource` trait implemented by each external
//! catalog adapter, so the canonicalizer stays polymorphic over a common
//! lookup capability.

use async_trait::async_trait;
use chrono::NaiveDate;
use medialog_common::models::{MediaType, Tags};
use thiserror::Error;

/// One raw input row: a date range with free-text notes
///
/// Created once per row by the loader; immutable thereafter; consumed by
/// the extraction engine.
#[derive(Debug, Clone)]
pub struct WeeklyRecord {
    /// Original date-range text, e.g. "Feb 1-6" (year may be absent)
    pub date_range_raw: String,
    /// Resolved range start; always `start_date <= end_date`
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    /// Free text, possibly containing multiple events joined by '&' or newlines
    pub raw_notes: String,
}

/// Verb/aspect detected for one extracted event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Started,
    Finished,
    /// Single-week consumption (covers the log's "watched", "played", "read"
    /// verbs); both boundaries anchor at the week date
    Watched,
    /// No leading action verb was recognized
    Unknown,
}

/// One segment extracted from a weekly record's notes
#[derive(Debug, Clone)]
pub struct CandidateEvent {
    /// The exact substring detected as one event
    pub raw_text: String,
    pub action: Action,
    /// Best-effort title; empty string marks a malformed segment that must
    /// still surface as a degraded entry
    pub raw_title: String,
    /// The record's anchor date (start or end depending on action)
    pub week_date: NaiveDate,
    /// Weak media-type hint inferred from the verb phrasing
    /// (e.g. "playing" suggests a game)
    pub type_hint: Option<MediaType>,
}

/// Identifier for an external metadata source adapter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceId {
    Tmdb,
    Igdb,
    OpenLibrary,
}

impl SourceId {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceId::Tmdb => "tmdb",
            SourceId::Igdb => "igdb",
            SourceId::OpenLibrary => "openlibrary",
        }
    }
}

/// One confidence-scored canonicalization answer from a source
#[derive(Debug, Clone)]
pub struct Resolution {
    pub canonical_title: String,
    pub media_type: MediaType,
    pub tags: Tags,
    /// Match confidence in [0, 1]
    pub confidence: f32,
}

/// Errors produced by metadata source adapters
///
/// These never escape the canonicalizer; exhausted retries degrade the
/// affected entry instead of aborting the run.
#[derive(Debug, Error)]
pub enum SourceError {
    /// Source has no credential configured; fails immediately, no retry
    #[error("source disabled (no credential): {0}")]
    Disabled(&'static str),

    /// Network-level failure (timeout, connection refused)
    #[error("network error: {0}")]
    Network(String),

    /// API returned an error status or rate-limited the request
    #[error("API error: {0}")]
    Api(String),

    /// Response body could not be decoded
    #[error("parse error: {0}")]
    Parse(String),

    /// Query succeeded but returned no candidate at all
    #[error("no match for title: {0}")]
    NoMatch(String),
}

impl SourceError {
    /// Whether a retry could plausibly succeed
    pub fn is_transient(&self) -> bool {
        matches!(self, SourceError::Network(_) | SourceError::Api(_))
    }
}

/// Common lookup capability implemented by each external catalog adapter
///
/// Each query returns candidate resolutions ordered by descending
/// confidence, or a `SourceError`. Adapters own their HTTP client, rate
/// limiting, and credential gating.
#[async_trait]
pub trait MetadataSource: Send + Sync {
    /// Source identity for provenance tracking and call accounting
    fn id(&self) -> SourceId;

    /// Query the catalog for a title
    ///
    /// `release_year` narrows the search when a hint supplies it.
    async fn query(
        &self,
        title: &str,
        release_year: Option<i32>,
    ) -> Result<Vec<Resolution>, SourceError>;
}
