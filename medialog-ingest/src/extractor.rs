//! Extraction engine
//!
//! Segments each weekly record's free-text notes into discrete candidate
//! events, detecting an action class and a raw title per event. Pure and
//! deterministic: no external calls, no retries. A malformed segment is
//! expressed as an empty-title marker rather than an error, so one bad
//! segment never aborts the batch.

use crate::normalize::title_key;
use crate::types::{Action, CandidateEvent, WeeklyRecord};
use medialog_common::models::MediaType;
use regex::Regex;
use std::collections::HashSet;
use std::sync::OnceLock;

fn action_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)^(started|finished|watched|played|read)\b\s*(?:(playing|watching|reading)\s+)?(.*)$")
            .expect("valid pattern")
    })
}

/// Allow-list of known titles that legitimately contain '&'
///
/// Sourced from the hint keys; consulted before segment-splitting so a
/// title like "Law & Order" is never broken into two events.
#[derive(Debug, Default)]
pub struct SplitGuard {
    protected: HashSet<String>,
}

impl SplitGuard {
    /// Build a guard from normalized hint keys, keeping only those that
    /// would be damaged by ampersand splitting
    pub fn new(keys: impl IntoIterator<Item = String>) -> Self {
        Self {
            protected: keys.into_iter().filter(|k| k.contains('&')).collect(),
        }
    }

    fn protects(&self, text: &str) -> bool {
        !self.protected.is_empty() && self.protected.contains(&title_key(text))
    }
}

/// Extract candidate events from a weekly record's notes
///
/// Notes are segmented on newlines and ampersands; each segment is scanned
/// against the ordered action patterns (first match wins, matched verb span
/// stripped). Segments with no recognizable verb yield `Action::Unknown`
/// with the whole segment as the title.
///
/// Anchor dates: `started`/`watched`/`unknown` events anchor at the
/// record's start date, `finished` at its end date.
pub fn extract_entries(record: &WeeklyRecord, guard: &SplitGuard) -> Vec<CandidateEvent> {
    let mut events = Vec::new();

    for line in record.raw_notes.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        // Check the verb-stripped payload against the allow-list before
        // splitting, so protected '&' titles survive as one event
        if let Some((action, hint, payload)) = detect_action(line) {
            if guard.protects(payload) {
                events.push(build_event(record, line, action, hint, payload));
                continue;
            }
        } else if guard.protects(line) {
            events.push(build_event(record, line, Action::Unknown, None, line));
            continue;
        }

        let mut line_events = Vec::new();
        for segment in line.split('&') {
            let segment = segment.trim();
            if segment.is_empty() {
                continue;
            }
            let (action, hint, payload) = detect_action(segment)
                .unwrap_or((Action::Unknown, None, segment));
            line_events.push(build_event(record, segment, action, hint, payload));
        }

        if line_events.is_empty() {
            // Non-empty line that dissolved into separators: surface it as a
            // single degraded event rather than dropping it silently
            line_events.push(build_event(record, line, Action::Unknown, None, ""));
        }

        events.append(&mut line_events);
    }

    events
}

/// Detect the leading action verb of one segment
///
/// Returns the action, a weak media-type hint inferred from the verb
/// phrasing ("playing" suggests a game, "reading" a book), and the
/// remaining title payload.
fn detect_action(segment: &str) -> Option<(Action, Option<MediaType>, &str)> {
    let caps = action_re().captures(segment)?;

    let verb = caps.get(1).map(|m| m.as_str().to_lowercase()).unwrap_or_default();
    let gerund = caps.get(2).map(|m| m.as_str().to_lowercase());
    let payload = caps.get(3).map(|m| m.as_str().trim()).unwrap_or("");

    let action = match verb.as_str() {
        "started" => Action::Started,
        "finished" => Action::Finished,
        // Single-week verbs: consumption begins and ends within the record
        _ => Action::Watched,
    };

    let hint = match (verb.as_str(), gerund.as_deref()) {
        ("played", _) | (_, Some("playing")) => Some(MediaType::Game),
        ("read", _) | (_, Some("reading")) => Some(MediaType::Book),
        ("watched", _) | (_, Some("watching")) => Some(MediaType::Tv),
        _ => None,
    };

    Some((action, hint, payload))
}

fn build_event(
    record: &WeeklyRecord,
    raw_text: &str,
    action: Action,
    type_hint: Option<MediaType>,
    raw_title: &str,
) -> CandidateEvent {
    let week_date = match action {
        Action::Finished => record.end_date,
        _ => record.start_date,
    };

    CandidateEvent {
        raw_text: raw_text.to_string(),
        action,
        raw_title: raw_title.to_string(),
        week_date,
        type_hint,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn record(notes: &str) -> WeeklyRecord {
        WeeklyRecord {
            date_range_raw: "Feb 1-6".to_string(),
            start_date: NaiveDate::from_ymd_opt(2023, 2, 1).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2023, 2, 6).unwrap(),
            raw_notes: notes.to_string(),
        }
    }

    #[test]
    fn splits_on_ampersand_with_per_segment_actions() {
        let events = extract_entries(
            &record("Started playing Hades & Finished FF7"),
            &SplitGuard::default(),
        );

        assert_eq!(events.len(), 2);
        assert_eq!(events[0].action, Action::Started);
        assert_eq!(events[0].raw_title, "Hades");
        assert_eq!(events[0].type_hint, Some(MediaType::Game));
        assert_eq!(events[0].week_date, NaiveDate::from_ymd_opt(2023, 2, 1).unwrap());

        assert_eq!(events[1].action, Action::Finished);
        assert_eq!(events[1].raw_title, "FF7");
        assert_eq!(events[1].week_date, NaiveDate::from_ymd_opt(2023, 2, 6).unwrap());
    }

    #[test]
    fn splits_on_newlines() {
        let events = extract_entries(
            &record("Watched Dune\nRead Project Hail Mary"),
            &SplitGuard::default(),
        );

        assert_eq!(events.len(), 2);
        assert_eq!(events[0].action, Action::Watched);
        assert_eq!(events[0].type_hint, Some(MediaType::Tv));
        assert_eq!(events[1].action, Action::Watched);
        assert_eq!(events[1].raw_title, "Project Hail Mary");
        assert_eq!(events[1].type_hint, Some(MediaType::Book));
    }

    #[test]
    fn bare_segment_becomes_unknown_action() {
        let events = extract_entries(&record("The Expanse"), &SplitGuard::default());

        assert_eq!(events.len(), 1);
        assert_eq!(events[0].action, Action::Unknown);
        assert_eq!(events[0].raw_title, "The Expanse");
        assert_eq!(events[0].week_date, NaiveDate::from_ymd_opt(2023, 2, 1).unwrap());
    }

    #[test]
    fn verb_matching_is_case_insensitive() {
        let events = extract_entries(&record("FINISHED Dune"), &SplitGuard::default());
        assert_eq!(events[0].action, Action::Finished);
        assert_eq!(events[0].raw_title, "Dune");
    }

    #[test]
    fn verb_only_segment_keeps_empty_title_marker() {
        let events = extract_entries(&record("started"), &SplitGuard::default());
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].raw_title, "");
        assert_eq!(events[0].action, Action::Started);
    }

    #[test]
    fn whitespace_only_lines_produce_no_events() {
        let events = extract_entries(&record("   \n\n  "), &SplitGuard::default());
        assert!(events.is_empty());
    }

    #[test]
    fn every_non_empty_line_yields_an_event() {
        // Even a line that is nothing but separators surfaces as one
        // degraded event instead of vanishing
        let events = extract_entries(&record("& &"), &SplitGuard::default());
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].raw_title, "");
    }

    #[test]
    fn protected_titles_survive_ampersand_splitting() {
        let guard = SplitGuard::new(vec!["law & order".to_string()]);
        let events = extract_entries(&record("Watched Law & Order"), &guard);

        assert_eq!(events.len(), 1);
        assert_eq!(events[0].action, Action::Watched);
        assert_eq!(events[0].raw_title, "Law & Order");

        // Unprotected lines still split
        let events = extract_entries(&record("Watched Dune & Foundation"), &guard);
        assert_eq!(events.len(), 2);
    }

    #[test]
    fn extraction_is_deterministic() {
        let rec = record("Started playing Hades & Finished FF7\nWatched Dune");
        let guard = SplitGuard::default();
        let first: Vec<_> = extract_entries(&rec, &guard)
            .into_iter()
            .map(|e| (e.raw_text, e.raw_title))
            .collect();
        let second: Vec<_> = extract_entries(&rec, &guard)
            .into_iter()
            .map(|e| (e.raw_text, e.raw_title))
            .collect();
        assert_eq!(first, second);
    }
}
