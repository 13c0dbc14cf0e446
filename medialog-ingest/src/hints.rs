//! Manual hint overrides
//!
//! A hints file maps normalized title keys to partial entry data
//! (canonical title, type, tags). Hints are loaded once per run, are
//! read-only, and take precedence over any automated lookup: a matching
//! title skips external queries entirely and resolves with confidence 1.0.
//!
//! A hint may carry a `week` (the start date of one weekly row, quoted
//! ISO-8601): it then applies only to events anchored inside that week,
//! so one raw title can mean different works in different weeks.
//!
//! File format (TOML):
//!
//! ```toml
//! [ff7]
//! canonical_title = "Final Fantasy VII Remake"
//! type = "Game"
//! release_year = 2020
//! week = "2023-02-01"
//!
//! [ff7.tags]
//! platform = ["PS5"]
//! ```

use crate::normalize::title_key;
use chrono::NaiveDate;
use medialog_common::models::{MediaType, Tags};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use tracing::{info, warn};

/// One manually curated override
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Hint {
    /// Authoritative display name; falls back to the raw title when absent
    pub canonical_title: Option<String>,
    #[serde(rename = "type")]
    pub media_type: Option<MediaType>,
    #[serde(default)]
    pub tags: Tags,
    /// Narrows external searches when the hint leaves resolution to the APIs
    pub release_year: Option<i32>,
    /// Start date of the one weekly row this hint applies to; absent means
    /// every week
    pub week: Option<NaiveDate>,
    /// Suppress this title entirely (counted, never silently lost)
    #[serde(default)]
    pub ignore: bool,
}

impl Hint {
    /// Whether this hint covers an event anchored on `date`
    ///
    /// A week-scoped hint covers the seven days starting at its `week`;
    /// an unscoped hint covers everything.
    pub fn covers(&self, date: NaiveDate) -> bool {
        match self.week {
            None => true,
            Some(week) => (0..7).contains(&(date - week).num_days()),
        }
    }
}

/// The full hint mapping for one pipeline run, keyed by normalized title
#[derive(Debug, Clone, Default)]
pub struct HintSet {
    hints: HashMap<String, Hint>,
}

impl HintSet {
    /// Load hints from a TOML file
    ///
    /// A missing or unreadable file yields an empty set with a warning;
    /// hints are an optional curation aid, never a hard requirement.
    pub fn load(path: &Path) -> Self {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "Hints file not readable; no manual overrides will be applied"
                );
                return Self::default();
            }
        };

        match toml::from_str::<HashMap<String, Hint>>(&content) {
            Ok(raw) => {
                let hints: HashMap<String, Hint> = raw
                    .into_iter()
                    .map(|(key, hint)| (title_key(&key), hint))
                    .collect();
                info!(count = hints.len(), path = %path.display(), "Loaded hints");
                Self { hints }
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "Failed to parse hints file; no manual overrides will be applied"
                );
                Self::default()
            }
        }
    }

    /// Build a hint set directly from entries; keys are normalized
    pub fn from_entries(entries: impl IntoIterator<Item = (String, Hint)>) -> Self {
        Self {
            hints: entries
                .into_iter()
                .map(|(key, hint)| (title_key(&key), hint))
                .collect(),
        }
    }

    /// Look up a hint by normalized title key
    pub fn get(&self, key: &str) -> Option<&Hint> {
        self.hints.get(key)
    }

    /// All normalized keys, for seeding the extraction split guard
    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.hints.keys()
    }

    pub fn len(&self) -> usize {
        self.hints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hints.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_hints(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn loads_and_normalizes_keys() {
        let file = write_hints(
            r#"
            [FF7]
            canonical_title = "Final Fantasy VII Remake"
            type = "Game"

            [FF7.tags]
            platform = ["PS5"]
            "#,
        );

        let hints = HintSet::load(file.path());
        assert_eq!(hints.len(), 1);

        let hint = hints.get("ff7").expect("normalized key");
        assert_eq!(
            hint.canonical_title.as_deref(),
            Some("Final Fantasy VII Remake")
        );
        assert_eq!(hint.media_type, Some(MediaType::Game));
        assert_eq!(hint.tags.platform, vec!["PS5"]);
        assert!(!hint.ignore);
    }

    #[test]
    fn week_scope_parses_and_bounds_coverage() {
        let file = write_hints(
            r#"
            [rebecca]
            canonical_title = "Rebecca (1940)"
            type = "Movie"
            week = "2023-02-01"
            "#,
        );

        let hints = HintSet::load(file.path());
        let hint = hints.get("rebecca").unwrap();
        assert_eq!(hint.week, NaiveDate::from_ymd_opt(2023, 2, 1));
        assert!(hint.covers(NaiveDate::from_ymd_opt(2023, 2, 1).unwrap()));
        assert!(hint.covers(NaiveDate::from_ymd_opt(2023, 2, 7).unwrap()));
        assert!(!hint.covers(NaiveDate::from_ymd_opt(2023, 2, 8).unwrap()));
        assert!(!hint.covers(NaiveDate::from_ymd_opt(2023, 1, 31).unwrap()));
    }

    #[test]
    fn unscoped_hint_covers_any_week() {
        let hint = Hint::default();
        assert!(hint.covers(NaiveDate::from_ymd_opt(1999, 1, 1).unwrap()));
    }

    #[test]
    fn ignore_flag_parses() {
        let file = write_hints(
            r#"
            ["some spam line"]
            ignore = true
            "#,
        );

        let hints = HintSet::load(file.path());
        assert!(hints.get("some spam line").unwrap().ignore);
    }

    #[test]
    fn missing_file_yields_empty_set() {
        let hints = HintSet::load(Path::new("/nonexistent/hints.toml"));
        assert!(hints.is_empty());
    }

    #[test]
    fn malformed_file_yields_empty_set() {
        let file = write_hints("this is not { toml");
        let hints = HintSet::load(file.path());
        assert!(hints.is_empty());
    }
}
