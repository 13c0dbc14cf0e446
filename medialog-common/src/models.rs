//! Output data model for the medialog pipeline
//!
//! These types define the serialized contract consumed by the presentation
//! layer. Absent dates, empty tag sets and `confidence = 0.0` are all valid,
//! displayable states, never errors.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Media category of a resolved entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum MediaType {
    #[serde(rename = "TV")]
    Tv,
    Movie,
    Game,
    Book,
    Unknown,
}

impl MediaType {
    /// String form used in the statistics report
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaType::Tv => "TV",
            MediaType::Movie => "Movie",
            MediaType::Game => "Game",
            MediaType::Book => "Book",
            MediaType::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Consumption status derived from which date boundaries were observed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    InProgress,
    Completed,
    Unknown,
}

impl Status {
    /// Derive status from boundary presence
    ///
    /// A finish date implies the item was completed even when no start was
    /// recorded; a lone start date means consumption is still in progress.
    pub fn from_boundaries(has_start: bool, has_finish: bool) -> Self {
        match (has_start, has_finish) {
            (_, true) => Status::Completed,
            (true, false) => Status::InProgress,
            (false, false) => Status::Unknown,
        }
    }
}

/// Category tags attached to a resolved entry
///
/// Absent categories are empty vectors, never null, so the presentation
/// layer can iterate them without guards.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Tags {
    #[serde(default)]
    pub genre: Vec<String>,
    #[serde(default)]
    pub platform: Vec<String>,
    #[serde(default)]
    pub mood: Vec<String>,
    /// Release year reported by the resolving catalog, when known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub release_year: Option<i32>,
}

impl Tags {
    /// True when no category carries any value
    pub fn is_empty(&self) -> bool {
        self.genre.is_empty()
            && self.platform.is_empty()
            && self.mood.is_empty()
            && self.release_year.is_none()
    }
}

/// Final structured output unit
///
/// Created by the canonicalizer from grouped candidate events, finalized
/// (validated, possibly date-swapped) by the validator, then serialized.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaEntry {
    /// Raw title as typed in the weekly notes
    pub title: String,
    /// Resolved display name from hints or an external catalog
    pub canonical_title: String,
    #[serde(rename = "type")]
    pub media_type: MediaType,
    pub start_date: Option<NaiveDate>,
    pub finish_date: Option<NaiveDate>,
    /// `finish_date - start_date` when both boundaries are present
    pub duration_days: Option<i64>,
    pub status: Status,
    pub tags: Tags,
    /// Resolution confidence in [0, 1]; 1.0 for hint-resolved entries,
    /// 0.0 on persistent lookup failure
    pub confidence: f32,
    /// Provenance of the resolution ("hint", "tmdb", "igdb", "openlibrary", "fallback")
    pub source: String,
    /// Exact note segments this entry was extracted from
    pub raw_text: String,
    /// Audit trail of every degradation applied to this entry
    pub warnings: Vec<String>,
}

/// Aggregate statistics for one pipeline run
///
/// Rendered once per run as a human-readable report; never consumed for
/// control flow by any downstream component.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunStatistics {
    /// Weekly rows successfully parsed by the loader
    pub weeks_parsed: usize,
    /// Rows skipped for unparsable date ranges
    pub rows_skipped: usize,
    /// Candidate events produced by the extraction engine
    pub events_extracted: usize,
    /// Entries present in the output document
    pub entries_emitted: usize,
    /// Entry counts by media type
    pub by_type: BTreeMap<MediaType, usize>,
    /// Entries with confidence below the configured floor
    pub low_confidence: usize,
    /// Entries with only a start boundary
    pub start_only: usize,
    /// Entries with only a finish boundary
    pub finish_only: usize,
    /// Entries resolved via manual hints
    pub hint_resolved: usize,
    /// Entries suppressed by an `ignore` hint
    pub ignored: usize,
    /// External API calls issued, by source
    pub api_calls: BTreeMap<String, usize>,
}

impl fmt::Display for RunStatistics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Pipeline run summary")?;
        writeln!(
            f,
            "  Weeks parsed: {} ({} rows skipped)",
            self.weeks_parsed, self.rows_skipped
        )?;
        writeln!(f, "  Events extracted: {}", self.events_extracted)?;
        writeln!(f, "  Entries emitted: {}", self.entries_emitted)?;
        writeln!(f, "  By type:")?;
        for (media_type, count) in &self.by_type {
            writeln!(f, "    {}: {}", media_type, count)?;
        }
        writeln!(f, "  Low confidence: {}", self.low_confidence)?;
        writeln!(f, "  Start-only: {}", self.start_only)?;
        writeln!(f, "  Finish-only: {}", self.finish_only)?;
        writeln!(f, "  Hint-resolved: {}", self.hint_resolved)?;
        writeln!(f, "  Ignored via hints: {}", self.ignored)?;
        writeln!(f, "  API calls:")?;
        for (source, count) in &self.api_calls {
            writeln!(f, "    {}: {}", source, count)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_derivation_from_boundaries() {
        assert_eq!(Status::from_boundaries(true, true), Status::Completed);
        assert_eq!(Status::from_boundaries(true, false), Status::InProgress);
        assert_eq!(Status::from_boundaries(false, true), Status::Completed);
        assert_eq!(Status::from_boundaries(false, false), Status::Unknown);
    }

    #[test]
    fn media_entry_serializes_contract_fields() {
        let entry = MediaEntry {
            title: "FF7".to_string(),
            canonical_title: "Final Fantasy VII Remake".to_string(),
            media_type: MediaType::Game,
            start_date: NaiveDate::from_ymd_opt(2023, 2, 1),
            finish_date: None,
            duration_days: None,
            status: Status::InProgress,
            tags: Tags {
                platform: vec!["PS5".to_string()],
                ..Tags::default()
            },
            confidence: 1.0,
            source: "hint".to_string(),
            raw_text: "Started playing FF7".to_string(),
            warnings: vec![],
        };

        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["type"], "Game");
        assert_eq!(json["status"], "in_progress");
        assert_eq!(json["start_date"], "2023-02-01");
        assert!(json["finish_date"].is_null());
        assert!(json["duration_days"].is_null());
        assert_eq!(json["tags"]["platform"][0], "PS5");
        // Empty categories serialize as arrays, never null
        assert!(json["tags"]["genre"].as_array().unwrap().is_empty());
        assert_eq!(json["confidence"], 1.0);
        assert_eq!(json["warnings"].as_array().unwrap().len(), 0);
    }

    #[test]
    fn media_type_round_trips_display_names() {
        let json = serde_json::to_string(&MediaType::Tv).unwrap();
        assert_eq!(json, "\"TV\"");
        let back: MediaType = serde_json::from_str("\"TV\"").unwrap();
        assert_eq!(back, MediaType::Tv);
    }

    #[test]
    fn statistics_report_renders_counts() {
        let mut stats = RunStatistics {
            weeks_parsed: 10,
            rows_skipped: 1,
            events_extracted: 14,
            entries_emitted: 12,
            ..RunStatistics::default()
        };
        stats.by_type.insert(MediaType::Game, 5);
        stats.api_calls.insert("tmdb".to_string(), 7);

        let report = stats.to_string();
        assert!(report.contains("Weeks parsed: 10 (1 rows skipped)"));
        assert!(report.contains("Game: 5"));
        assert!(report.contains("tmdb: 7"));
    }
}
