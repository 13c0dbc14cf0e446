//! Medialog ingest pipeline
//!
//! Converts a weekly free-text media-consumption log into validated,
//! structured entries. Four strict stages:
//!
//! 1. **Loader** — CSV rows with ambiguous date ranges → `WeeklyRecord`s
//! 2. **Extraction** — free-text notes → `CandidateEvent`s (pure)
//! 3. **Canonicalizer** — hints + external catalogs → `MediaEntry`s
//! 4. **Validator/Serializer** — invariant enforcement, stats, JSON output
//!
//! Degradation over failure: a malformed segment, an offline catalog, or a
//! missing credential never aborts a run; the affected entries are emitted
//! with warnings and reduced confidence instead.

pub mod config;
pub mod extractor;
pub mod finalize;
pub mod hints;
pub mod loader;
pub mod normalize;
pub mod resolver;
pub mod retry;
pub mod sources;
pub mod types;

use crate::config::PipelineConfig;
use crate::extractor::SplitGuard;
use crate::hints::HintSet;
use crate::resolver::Resolver;
use crate::types::MetadataSource;
use medialog_common::error::{Error, Result};
use medialog_common::models::RunStatistics;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

/// One configured pipeline run
pub struct Pipeline {
    config: PipelineConfig,
    hints: HintSet,
    resolver: Resolver,
}

impl Pipeline {
    pub fn new(
        config: PipelineConfig,
        hints: HintSet,
        sources: Vec<Arc<dyn MetadataSource>>,
    ) -> Self {
        let resolver = Resolver::new(
            sources,
            hints.clone(),
            config.retry.clone(),
            config.confidence_floor,
            config.concurrency,
        );
        Self {
            config,
            hints,
            resolver,
        }
    }

    /// Run the full pipeline: `input` CSV in, `output` JSON out
    pub async fn run(&self, input: &Path, output: &Path) -> Result<RunStatistics> {
        if !(0.0..=1.0).contains(&self.config.confidence_floor) {
            return Err(Error::Config(format!(
                "confidence floor must be within [0, 1], got {}",
                self.config.confidence_floor
            )));
        }

        info!(input = %input.display(), "Starting pipeline run");

        let loaded = loader::load_weekly_records(input, &self.config.date_column)?;

        let guard = SplitGuard::new(self.hints.keys().cloned());
        let mut events = Vec::new();
        for record in &loaded.records {
            events.extend(extractor::extract_entries(record, &guard));
        }
        let events_extracted = events.len();

        if let Some(limit) = self.config.limit {
            if events.len() > limit {
                warn!(
                    limit,
                    dropped = events.len() - limit,
                    "Truncating candidate events to configured limit"
                );
                events.truncate(limit);
            }
        }

        let outcome = self.resolver.apply_tagging(events).await;

        let mut entries = outcome.entries;
        let mut stats = finalize::finalize_entries(&mut entries, self.config.confidence_floor);
        stats.weeks_parsed = loaded.records.len();
        stats.rows_skipped = loaded.rows_skipped;
        stats.events_extracted = events_extracted;
        stats.hint_resolved = outcome.hint_resolved;
        stats.ignored = outcome.ignored;
        stats.api_calls = outcome.api_calls;

        finalize::write_entries(&entries, output)?;

        info!(
            entries = stats.entries_emitted,
            output = %output.display(),
            "Pipeline run complete"
        );
        Ok(stats)
    }
}
