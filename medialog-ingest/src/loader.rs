//! Record loader
//!
//! Reads raw weekly rows from a CSV file, parses ambiguous date ranges and
//! infers missing years, yielding normalized `WeeklyRecord`s.
//!
//! # Year inference
//! A running year cursor is threaded across rows in file order. An explicit
//! `"(YYYY)"` marker sets the cursor; a month-number regression between rows
//! (December followed by January) advances it by one. The first row must
//! carry an explicit year or the load fails.
//!
//! Rows with unparsable date ranges are skipped and counted, never fatal to
//! the whole run.

use crate::types::WeeklyRecord;
use chrono::{Datelike, NaiveDate};
use medialog_common::{Error, Result};
use regex::Regex;
use std::path::Path;
use std::sync::OnceLock;
use tracing::{info, warn};

/// Column holding the free-text notes
const NOTES_COLUMN: &str = "Notes";

/// Loader output: normalized records plus row-level statistics
#[derive(Debug)]
pub struct LoadOutcome {
    pub records: Vec<WeeklyRecord>,
    /// Rows dropped for unparsable date ranges
    pub rows_skipped: usize,
}

/// Year-rollover cursor threaded through row parsing
///
/// Modeled as explicit state passed into each parse call rather than
/// ambient global state, so concurrent runs stay independent.
#[derive(Debug, Clone, Copy, Default)]
pub struct YearCursor {
    year: Option<i32>,
    last_month: Option<u32>,
}

fn year_marker_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\((\d{4})\)").expect("valid pattern"))
}

fn to_separator_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\s+to\s+").expect("valid pattern"))
}

/// Load weekly records from a CSV file
///
/// The file must carry a date-range column (named `date_column`, or the
/// sheet-export quirk of an empty header) and a `Notes` column; other
/// columns are ignored.
///
/// # Errors
/// - `Error::Io` — unreadable file
/// - `Error::InputFormat` — missing required columns or malformed CSV
/// - `Error::AmbiguousYear` — a row before any explicit year marker
pub fn load_weekly_records(path: &Path, date_column: &str) -> Result<LoadOutcome> {
    let mut reader = csv::Reader::from_path(path).map_err(csv_error)?;

    let headers = reader.headers().map_err(csv_error)?.clone();
    let date_idx = headers
        .iter()
        .position(|h| h == date_column)
        .or_else(|| headers.iter().position(|h| h.trim().is_empty()))
        .ok_or_else(|| {
            Error::InputFormat(format!("missing required column '{}'", date_column))
        })?;
    let notes_idx = headers
        .iter()
        .position(|h| h == NOTES_COLUMN)
        .ok_or_else(|| {
            Error::InputFormat(format!("missing required column '{}'", NOTES_COLUMN))
        })?;

    let mut records = Vec::new();
    let mut rows_skipped = 0usize;
    let mut cursor = YearCursor::default();

    for row in reader.records() {
        let row = row.map_err(csv_error)?;
        let date_range_raw = row.get(date_idx).unwrap_or("").trim().to_string();
        let raw_notes = row.get(notes_idx).unwrap_or("").trim().to_string();

        match parse_date_range(&date_range_raw, &mut cursor)? {
            Some((start_date, end_date)) => {
                records.push(WeeklyRecord {
                    date_range_raw,
                    start_date,
                    end_date,
                    raw_notes,
                });
            }
            None => {
                warn!(date_range = %date_range_raw, "Skipping row with unparsable date range");
                rows_skipped += 1;
            }
        }
    }

    info!(
        records = records.len(),
        rows_skipped,
        path = %path.display(),
        "Loaded weekly records"
    );

    Ok(LoadOutcome {
        records,
        rows_skipped,
    })
}

fn csv_error(err: csv::Error) -> Error {
    let msg = err.to_string();
    match err.into_kind() {
        csv::ErrorKind::Io(io_err) => Error::Io(io_err),
        _ => Error::InputFormat(msg),
    }
}

/// Parse one date-range string into calendar dates, advancing the cursor.
///
/// Supported separators: hyphen, en/em dash, "to". A single date yields
/// `start == end`. Returns `Ok(None)` for a row-level parse failure (the
/// row is skipped, not fatal).
fn parse_date_range(
    raw: &str,
    cursor: &mut YearCursor,
) -> Result<Option<(NaiveDate, NaiveDate)>> {
    let mut text = raw.trim().to_string();

    // Explicit "(YYYY)" marker sets the cursor for this and following rows
    let mut explicit_year = false;
    if let Some(caps) = year_marker_re().captures(&text) {
        let year: i32 = caps[1].parse().map_err(|_| {
            Error::InputFormat(format!("unreadable year marker in '{}'", raw))
        })?;
        text = text.replace(&caps[0], "").trim().to_string();
        cursor.year = Some(year);
        explicit_year = true;
    }

    let mut year = cursor.year.ok_or_else(|| {
        Error::AmbiguousYear(format!(
            "first row must carry an explicit year, got '{}'",
            raw
        ))
    })?;

    // Normalize separators and the "Sept" quirk
    let text = text.replace(['\u{2013}', '\u{2014}'], "-");
    let text = to_separator_re().replace_all(&text, "-").into_owned();
    let text = text.replace("Sept ", "Sep ");

    let (start, end) = match text.split_once('-') {
        Some((start_str, end_str)) => {
            let Some(mut start) = parse_component(start_str, year, None) else {
                return Ok(None);
            };

            // Month regression against the previous row implies a year
            // rollover (December entry followed by a January entry)
            if !explicit_year {
                if let Some(last_month) = cursor.last_month {
                    if start.month() < last_month {
                        year += 1;
                        cursor.year = Some(year);
                        let Some(bumped) = parse_component(start_str, year, None) else {
                            return Ok(None);
                        };
                        start = bumped;
                    }
                }
            }

            let Some(mut end) = parse_component(end_str, year, Some(start.month())) else {
                return Ok(None);
            };

            // Within-row December→January wrap: the end rolls into the next
            // year and the cursor advances with it
            if end.month() < start.month() {
                let Some(wrapped) = parse_component(end_str, year + 1, Some(start.month()))
                else {
                    return Ok(None);
                };
                end = wrapped;
                cursor.year = Some(year + 1);
            }

            if end < start {
                warn!(date_range = %raw, "End date precedes start date");
                return Ok(None);
            }

            (start, end)
        }
        None => {
            let Some(date) = parse_component(&text, year, None) else {
                return Ok(None);
            };
            (date, date)
        }
    };

    cursor.last_month = Some(end.month());
    Ok(Some((start, end)))
}

/// Parse one date component ("Feb 1", "February 1", or a bare day that
/// inherits the range's start month)
fn parse_component(text: &str, year: i32, inherit_month: Option<u32>) -> Option<NaiveDate> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    for format in ["%b %d %Y", "%B %d %Y"] {
        if let Ok(date) = NaiveDate::parse_from_str(&format!("{} {}", text, year), format) {
            return Some(date);
        }
    }

    if let (Some(month), Ok(day)) = (inherit_month, text.parse::<u32>()) {
        return NaiveDate::from_ymd_opt(year, month, day);
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn explicit_year_marker_anchors_range() {
        let mut cursor = YearCursor::default();
        let parsed = parse_date_range("Jan 1-7 (2023)", &mut cursor).unwrap().unwrap();
        assert_eq!(parsed, (date(2023, 1, 1), date(2023, 1, 7)));
    }

    #[test]
    fn bare_day_end_inherits_start_month() {
        let mut cursor = YearCursor::default();
        parse_date_range("Jan 1-7 (2023)", &mut cursor).unwrap();
        let parsed = parse_date_range("Feb 1-6", &mut cursor).unwrap().unwrap();
        assert_eq!(parsed, (date(2023, 2, 1), date(2023, 2, 6)));
    }

    #[test]
    fn en_dash_and_to_separators() {
        let mut cursor = YearCursor::default();
        let parsed = parse_date_range("Feb 1\u{2013}6 (2023)", &mut cursor)
            .unwrap()
            .unwrap();
        assert_eq!(parsed, (date(2023, 2, 1), date(2023, 2, 6)));

        let parsed = parse_date_range("Mar 1 to Mar 5", &mut cursor).unwrap().unwrap();
        assert_eq!(parsed, (date(2023, 3, 1), date(2023, 3, 5)));
    }

    #[test]
    fn single_date_collapses_range() {
        let mut cursor = YearCursor::default();
        let parsed = parse_date_range("Jul 4 (2022)", &mut cursor).unwrap().unwrap();
        assert_eq!(parsed, (date(2022, 7, 4), date(2022, 7, 4)));
    }

    #[test]
    fn year_rolls_over_on_month_regression() {
        let mut cursor = YearCursor::default();
        parse_date_range("Dec 20-26 (2022)", &mut cursor).unwrap();
        let parsed = parse_date_range("Jan 3-9", &mut cursor).unwrap().unwrap();
        assert_eq!(parsed, (date(2023, 1, 3), date(2023, 1, 9)));
    }

    #[test]
    fn within_row_december_wrap_advances_cursor() {
        let mut cursor = YearCursor::default();
        let parsed = parse_date_range("Dec 28-Jan 3 (2022)", &mut cursor)
            .unwrap()
            .unwrap();
        assert_eq!(parsed, (date(2022, 12, 28), date(2023, 1, 3)));

        // Following year-less January row stays in 2023
        let parsed = parse_date_range("Jan 4-10", &mut cursor).unwrap().unwrap();
        assert_eq!(parsed, (date(2023, 1, 4), date(2023, 1, 10)));
    }

    #[test]
    fn full_month_names_and_sept_quirk() {
        let mut cursor = YearCursor::default();
        let parsed = parse_date_range("September 1-5 (2023)", &mut cursor)
            .unwrap()
            .unwrap();
        assert_eq!(parsed, (date(2023, 9, 1), date(2023, 9, 5)));

        let parsed = parse_date_range("Sept 10-12", &mut cursor).unwrap().unwrap();
        assert_eq!(parsed, (date(2023, 9, 10), date(2023, 9, 12)));
    }

    #[test]
    fn garbage_range_is_row_level_skip() {
        let mut cursor = YearCursor::default();
        parse_date_range("Jan 1-7 (2023)", &mut cursor).unwrap();
        assert!(parse_date_range("sometime soon", &mut cursor).unwrap().is_none());
        // Cursor survives the bad row
        let parsed = parse_date_range("Feb 1-6", &mut cursor).unwrap().unwrap();
        assert_eq!(parsed, (date(2023, 2, 1), date(2023, 2, 6)));
    }

    #[test]
    fn yearless_first_row_is_fatal() {
        let mut cursor = YearCursor::default();
        let err = parse_date_range("Feb 1-6", &mut cursor).unwrap_err();
        assert!(matches!(err, Error::AmbiguousYear(_)));
    }

    #[test]
    fn loads_records_and_counts_skips() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "DateRange,Notes").unwrap();
        writeln!(file, "Jan 1-7 (2023),Started The Hobbit").unwrap();
        writeln!(file, "not a date,Watched something").unwrap();
        writeln!(file, "Feb 1-6,Finished The Hobbit").unwrap();
        file.flush().unwrap();

        let outcome = load_weekly_records(file.path(), "DateRange").unwrap();
        assert_eq!(outcome.records.len(), 2);
        assert_eq!(outcome.rows_skipped, 1);
        assert_eq!(outcome.records[0].start_date, date(2023, 1, 1));
        assert_eq!(outcome.records[1].end_date, date(2023, 2, 6));
        assert_eq!(outcome.records[1].raw_notes, "Finished The Hobbit");
    }

    #[test]
    fn empty_header_fallback_for_date_column() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, ",Notes").unwrap();
        writeln!(file, "Jan 1-7 (2023),Started The Hobbit").unwrap();
        file.flush().unwrap();

        let outcome = load_weekly_records(file.path(), "DateRange").unwrap();
        assert_eq!(outcome.records.len(), 1);
    }

    #[test]
    fn missing_notes_column_is_input_format_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "DateRange,Stuff").unwrap();
        writeln!(file, "Jan 1-7 (2023),x").unwrap();
        file.flush().unwrap();

        let err = load_weekly_records(file.path(), "DateRange").unwrap_err();
        assert!(matches!(err, Error::InputFormat(_)));
    }
}
