//! Validation and serialization
//!
//! Last pipeline stage: enforces the date-order invariant on every entry,
//! derives durations, aggregates run statistics, and writes the output
//! document. Entries are repaired, never dropped; an inverted date pair is
//! swapped and recorded in the entry's warnings.

use medialog_common::error::{Error, Result};
use medialog_common::models::{MediaEntry, RunStatistics, Status};
use std::path::Path;
use tracing::{info, warn};

/// Validate and finalize resolved entries in place, producing run statistics
///
/// Every entry leaving this function satisfies `start_date <= finish_date`
/// whenever both boundaries are present, and carries a duration and status
/// consistent with its boundaries.
pub fn finalize_entries(entries: &mut [MediaEntry], confidence_floor: f32) -> RunStatistics {
    let mut stats = RunStatistics {
        entries_emitted: entries.len(),
        ..RunStatistics::default()
    };

    for entry in entries.iter_mut() {
        if let (Some(start), Some(finish)) = (entry.start_date, entry.finish_date) {
            if finish < start {
                warn!(
                    title = %entry.title,
                    start = %start,
                    finish = %finish,
                    "Swapping inverted date boundaries"
                );
                entry.start_date = Some(finish);
                entry.finish_date = Some(start);
                entry
                    .warnings
                    .push(format!("dates swapped: {} was after {}", start, finish));
            }
        }

        entry.duration_days = match (entry.start_date, entry.finish_date) {
            (Some(start), Some(finish)) => Some((finish - start).num_days()),
            _ => None,
        };
        entry.status =
            Status::from_boundaries(entry.start_date.is_some(), entry.finish_date.is_some());

        *stats.by_type.entry(entry.media_type).or_insert(0) += 1;
        if entry.confidence < confidence_floor {
            stats.low_confidence += 1;
        }
        match (entry.start_date.is_some(), entry.finish_date.is_some()) {
            (true, false) => stats.start_only += 1,
            (false, true) => stats.finish_only += 1,
            _ => {}
        }
    }

    stats
}

/// Serialize finalized entries to a pretty-printed JSON document
///
/// The entry order is whatever the caller established; combined with the
/// canonicalizer's deterministic sort this makes repeated runs over the
/// same input byte-identical.
pub fn write_entries(entries: &[MediaEntry], path: &Path) -> Result<()> {
    let json = serde_json::to_vec_pretty(entries)
        .map_err(|e| Error::Serialization(e.to_string()))?;
    std::fs::write(path, json)?;
    info!(count = entries.len(), path = %path.display(), "Wrote output document");
    Ok(())
}
