//! Canonicalizer and tagger
//!
//! Resolves each candidate event's raw title to a canonical catalog entry:
//! manual hints first, then external lookups in a priority order derived
//! from the event's weak type hint. Transient source failures are retried
//! with bounded backoff; exhausted or low-confidence lookups degrade the
//! entry (Unknown type, empty tags, confidence 0.0) but never drop it.
//!
//! Events are grouped by normalized title key before resolution, so a
//! "started" and a "finished" note for the same title merge into one entry
//! and repeated titles cost one external lookup. A second merge pass after
//! resolution collapses entries that resolved to the same canonical title
//! and type, catching spelling variants of one work. The per-run resolution
//! cache is owned by the resolver instance; there is no cross-run state.

use crate::hints::HintSet;
use crate::normalize::{normalize_title, title_key};
use crate::retry::{with_retries, RetryPolicy};
use crate::types::{
    Action, CandidateEvent, MetadataSource, Resolution, SourceError, SourceId,
};
use chrono::NaiveDate;
use futures::stream::{self, StreamExt};
use medialog_common::models::{MediaEntry, MediaType, Status, Tags};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info};

/// Provenance label for entries that exhausted every resolution path
const FALLBACK_SOURCE: &str = "fallback";
/// Provenance label for hint-resolved entries
const HINT_SOURCE: &str = "hint";

/// Tagging output: resolved entries plus resolution statistics
#[derive(Debug)]
pub struct TaggingOutcome {
    pub entries: Vec<MediaEntry>,
    /// Entries resolved by a full hint override
    pub hint_resolved: usize,
    /// Events suppressed by an `ignore` hint
    pub ignored: usize,
    /// External API calls issued, by source
    pub api_calls: BTreeMap<String, usize>,
}

/// Source query order for a weak media-type hint
///
/// Pure function: the hint only reorders which catalog is asked first,
/// every enabled source remains a fallback.
pub fn source_priority(hint: Option<MediaType>) -> [SourceId; 3] {
    match hint {
        Some(MediaType::Game) => [SourceId::Igdb, SourceId::Tmdb, SourceId::OpenLibrary],
        Some(MediaType::Book) => [SourceId::OpenLibrary, SourceId::Tmdb, SourceId::Igdb],
        _ => [SourceId::Tmdb, SourceId::Igdb, SourceId::OpenLibrary],
    }
}

/// The single source that authoritatively covers a media type
fn preferred_source(media_type: MediaType) -> Option<SourceId> {
    match media_type {
        MediaType::Tv | MediaType::Movie => Some(SourceId::Tmdb),
        MediaType::Game => Some(SourceId::Igdb),
        MediaType::Book => Some(SourceId::OpenLibrary),
        MediaType::Unknown => None,
    }
}

/// One normalized title key's worth of candidate events
#[derive(Debug)]
struct EventGroup {
    /// Normalized lookup key (season-stripped, case-folded)
    key: String,
    /// First raw title as typed in the notes
    title: String,
    /// Season-stripped title used for external queries
    query_title: String,
    season: Option<String>,
    raw_texts: Vec<String>,
    started: Vec<NaiveDate>,
    finished: Vec<NaiveDate>,
    type_hint: Option<MediaType>,
    /// False when a week-scoped hint exists for this key but does not cover
    /// this group's anchor dates
    apply_hint: bool,
    warnings: Vec<String>,
}

/// Canonicalizer with a per-run resolution cache
pub struct Resolver {
    sources: HashMap<SourceId, Arc<dyn MetadataSource>>,
    hints: HintSet,
    retry: RetryPolicy,
    confidence_floor: f32,
    concurrency: usize,
    /// (query key, source) → cached candidate list; empty = known no-match.
    /// Best-effort under concurrency: two in-flight groups sharing a key may
    /// both miss and duplicate one call, never corrupt the result.
    cache: Mutex<HashMap<(String, SourceId), Vec<Resolution>>>,
    api_calls: Mutex<BTreeMap<String, usize>>,
}

impl Resolver {
    pub fn new(
        sources: Vec<Arc<dyn MetadataSource>>,
        hints: HintSet,
        retry: RetryPolicy,
        confidence_floor: f32,
        concurrency: usize,
    ) -> Self {
        Self {
            sources: sources.into_iter().map(|s| (s.id(), s)).collect(),
            hints,
            retry,
            confidence_floor,
            concurrency: concurrency.max(1),
            cache: Mutex::new(HashMap::new()),
            api_calls: Mutex::new(BTreeMap::new()),
        }
    }

    /// Resolve a batch of candidate events into media entries
    ///
    /// Independent title lookups run on a bounded worker pool; the output
    /// order is deterministic regardless of lookup completion order.
    pub async fn apply_tagging(&self, events: Vec<CandidateEvent>) -> TaggingOutcome {
        let event_count = events.len();
        let (groups, degraded) = group_events(events, &self.hints);
        debug!(
            events = event_count,
            groups = groups.len(),
            degraded = degraded.len(),
            "Grouped candidate events"
        );

        let results: Vec<Option<MediaEntry>> = stream::iter(groups)
            .map(|group| self.resolve_group(group))
            .buffer_unordered(self.concurrency)
            .collect()
            .await;

        let mut entries = degraded;
        let mut ignored = 0usize;
        for result in results {
            match result {
                Some(entry) => entries.push(entry),
                None => ignored += 1,
            }
        }

        entries.sort_by(|a, b| {
            (title_key(&a.title), &a.raw_text).cmp(&(title_key(&b.title), &b.raw_text))
        });
        let mut entries = merge_by_canonical(entries);
        entries.sort_by(|a, b| {
            (title_key(&a.title), &a.raw_text).cmp(&(title_key(&b.title), &b.raw_text))
        });

        let hint_resolved = entries.iter().filter(|e| e.source == HINT_SOURCE).count();
        let api_calls = self.api_calls.lock().await.clone();

        info!(
            entries = entries.len(),
            hint_resolved,
            ignored,
            "Tagging complete"
        );

        TaggingOutcome {
            entries,
            hint_resolved,
            ignored,
            api_calls,
        }
    }

    async fn resolve_group(&self, group: EventGroup) -> Option<MediaEntry> {
        let hint = self.hints.get(&group.key).filter(|_| group.apply_hint);

        if let Some(h) = hint {
            if h.ignore {
                info!(title = %group.title, "Suppressed by ignore hint");
                return None;
            }
        }

        let mut warnings = group.warnings.clone();

        let resolved = match hint.filter(|h| h.canonical_title.is_some()) {
            // Full override: hint supplies the canonical name, no lookup at all
            Some(h) => Resolved {
                canonical_title: h
                    .canonical_title
                    .clone()
                    .unwrap_or_else(|| group.query_title.clone()),
                media_type: h.media_type.unwrap_or(MediaType::Unknown),
                tags: h.tags.clone(),
                confidence: 1.0,
                source: HINT_SOURCE.to_string(),
            },
            None => {
                // A partial hint narrows the search without deciding it
                let hint_type = hint.and_then(|h| h.media_type);
                let release_year = hint.and_then(|h| h.release_year);
                let order: Vec<SourceId> = match hint_type.and_then(preferred_source) {
                    Some(id) => vec![id],
                    None => source_priority(group.type_hint).to_vec(),
                };

                match self
                    .lookup(&group.key, &group.query_title, &order, release_year, &mut warnings)
                    .await
                {
                    Some((resolution, source_id)) => Resolved {
                        canonical_title: resolution.canonical_title,
                        media_type: hint_type.unwrap_or(resolution.media_type),
                        tags: merge_tags(
                            resolution.tags,
                            hint.map(|h| h.tags.clone()).unwrap_or_default(),
                        ),
                        confidence: resolution.confidence,
                        source: source_id.as_str().to_string(),
                    },
                    None => {
                        if warnings.is_empty() {
                            warnings.push("no metadata source available".to_string());
                        }
                        Resolved {
                            canonical_title: group.query_title.clone(),
                            media_type: MediaType::Unknown,
                            tags: Tags::default(),
                            confidence: 0.0,
                            source: FALLBACK_SOURCE.to_string(),
                        }
                    }
                }
            }
        };

        let mut canonical_title = resolved.canonical_title;
        if let Some(season) = &group.season {
            canonical_title = format!("{} {}", canonical_title, season);
        }

        let start_date = group.started.iter().min().copied();
        let finish_date = group.finished.iter().max().copied();

        Some(MediaEntry {
            title: group.title,
            canonical_title,
            media_type: resolved.media_type,
            start_date,
            finish_date,
            duration_days: None,
            status: Status::from_boundaries(start_date.is_some(), finish_date.is_some()),
            tags: resolved.tags,
            confidence: resolved.confidence,
            source: resolved.source,
            raw_text: group.raw_texts.join("; "),
            warnings,
        })
    }

    /// Try each source in priority order until one yields a resolution at
    /// or above the confidence floor
    async fn lookup(
        &self,
        key: &str,
        query_title: &str,
        order: &[SourceId],
        release_year: Option<i32>,
        warnings: &mut Vec<String>,
    ) -> Option<(Resolution, SourceId)> {
        for source_id in order {
            let Some(source) = self.sources.get(source_id) else {
                continue;
            };

            let cache_key = (key.to_string(), *source_id);
            let cached = self.cache.lock().await.get(&cache_key).cloned();

            let hits = match cached {
                Some(hits) => {
                    debug!(key, source = source_id.as_str(), "Resolution cache hit");
                    hits
                }
                None => {
                    {
                        let mut calls = self.api_calls.lock().await;
                        *calls.entry(source_id.as_str().to_string()).or_insert(0) += 1;
                    }

                    match with_retries(&self.retry, source_id.as_str(), || {
                        source.query(query_title, release_year)
                    })
                    .await
                    {
                        Ok(hits) => {
                            self.cache.lock().await.insert(cache_key, hits.clone());
                            hits
                        }
                        Err(SourceError::NoMatch(_)) => {
                            // A definitive miss is cacheable too
                            self.cache.lock().await.insert(cache_key, Vec::new());
                            warnings.push(format!("no match from {}", source_id.as_str()));
                            continue;
                        }
                        Err(err) => {
                            warnings.push(format!(
                                "lookup failed: {}: {}",
                                source_id.as_str(),
                                err
                            ));
                            continue;
                        }
                    }
                }
            };

            let Some(best) = hits.first() else {
                warnings.push(format!("no match from {}", source_id.as_str()));
                continue;
            };

            if best.confidence >= self.confidence_floor {
                return Some((best.clone(), *source_id));
            }

            warnings.push(format!(
                "low confidence from {} ({:.2})",
                source_id.as_str(),
                best.confidence
            ));
        }

        None
    }
}

struct Resolved {
    canonical_title: String,
    media_type: MediaType,
    tags: Tags,
    confidence: f32,
    source: String,
}

/// Merge catalog tags with hint tags; hand-curated categories win
fn merge_tags(api: Tags, hint: Tags) -> Tags {
    Tags {
        genre: if hint.genre.is_empty() { api.genre } else { hint.genre },
        platform: if hint.platform.is_empty() { api.platform } else { hint.platform },
        mood: if hint.mood.is_empty() { api.mood } else { hint.mood },
        release_year: hint.release_year.or(api.release_year),
    }
}

/// Group candidate events by (normalized title key, season marker)
///
/// Grouping by season keeps "Severance S1" and "Severance S2" as distinct
/// entries while their external lookups share one cache slot under the
/// stripped key. When a week-scoped hint exists for a key, events inside
/// and outside its week are split into separate groups so the hint binds
/// only the covered week. Empty-title events cannot be grouped or resolved;
/// they surface immediately as degraded entries so nothing is silently
/// dropped.
fn group_events(
    events: Vec<CandidateEvent>,
    hints: &HintSet,
) -> (Vec<EventGroup>, Vec<MediaEntry>) {
    let mut groups: BTreeMap<(String, String, bool), EventGroup> = BTreeMap::new();
    let mut degraded = Vec::new();

    for event in events {
        if event.raw_title.trim().is_empty() {
            degraded.push(degraded_entry(&event));
            continue;
        }

        let norm = normalize_title(&event.raw_title);
        let season_key = norm
            .season
            .as_deref()
            .map(|s| s.to_lowercase())
            .unwrap_or_default();
        let apply_hint = hints
            .get(&norm.key)
            .map(|h| h.covers(event.week_date))
            .unwrap_or(true);

        let group = groups
            .entry((norm.key.clone(), season_key, apply_hint))
            .or_insert_with(|| EventGroup {
                key: norm.key,
                title: event.raw_title.trim().to_string(),
                query_title: norm.display,
                season: norm.season,
                raw_texts: Vec::new(),
                started: Vec::new(),
                finished: Vec::new(),
                type_hint: None,
                apply_hint,
                warnings: Vec::new(),
            });

        match event.action {
            Action::Started => group.started.push(event.week_date),
            Action::Finished => group.finished.push(event.week_date),
            Action::Watched => {
                group.started.push(event.week_date);
                group.finished.push(event.week_date);
            }
            Action::Unknown => {
                group.started.push(event.week_date);
                group
                    .warnings
                    .push(format!("no action verb detected in '{}'", event.raw_text));
            }
        }

        if group.type_hint.is_none() {
            group.type_hint = event.type_hint;
        }
        // A season marker is strong evidence of a TV show
        if group.type_hint.is_none() && group.season.is_some() {
            group.type_hint = Some(MediaType::Tv);
        }

        if !group.raw_texts.contains(&event.raw_text) {
            group.raw_texts.push(event.raw_text);
        }
    }

    (groups.into_values().collect(), degraded)
}

/// Collapse entries that resolved to the same canonical title and type
///
/// Two raw spellings of one work ("FF7", "Final Fantasy 7") resolve to the
/// same catalog entry; this pass unions their boundaries and note segments
/// into one output entry. The first entry in input order is the base: its
/// tags, confidence, and provenance stand, and a differing tag set on a
/// later duplicate is discarded with a warning. Entries with no canonical
/// title are never merged.
fn merge_by_canonical(entries: Vec<MediaEntry>) -> Vec<MediaEntry> {
    let mut merged: Vec<MediaEntry> = Vec::with_capacity(entries.len());
    let mut index: HashMap<(String, MediaType), usize> = HashMap::new();

    for entry in entries {
        if entry.canonical_title.is_empty() {
            merged.push(entry);
            continue;
        }

        let key = (entry.canonical_title.clone(), entry.media_type);
        let Some(&slot) = index.get(&key) else {
            index.insert(key, merged.len());
            merged.push(entry);
            continue;
        };

        let base = &mut merged[slot];
        debug!(
            canonical = %base.canonical_title,
            duplicate = %entry.title,
            "Merging duplicate canonical entry"
        );

        base.start_date = match (base.start_date, entry.start_date) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        };
        base.finish_date = match (base.finish_date, entry.finish_date) {
            (Some(a), Some(b)) => Some(a.max(b)),
            (a, b) => a.or(b),
        };
        base.status =
            Status::from_boundaries(base.start_date.is_some(), base.finish_date.is_some());

        if !entry.raw_text.is_empty() {
            if base.raw_text.is_empty() {
                base.raw_text = entry.raw_text;
            } else if base.raw_text != entry.raw_text {
                base.raw_text = format!("{}; {}", base.raw_text, entry.raw_text);
            }
        }

        if entry.tags != base.tags {
            base.warnings.push(format!(
                "inconsistent tags from '{}' discarded during merge",
                entry.title
            ));
        }
        base.warnings.extend(entry.warnings);
    }

    merged
}

/// A segment with no extractable title still becomes an auditable entry
fn degraded_entry(event: &CandidateEvent) -> MediaEntry {
    let (start_date, finish_date) = match event.action {
        Action::Finished => (None, Some(event.week_date)),
        Action::Watched => (Some(event.week_date), Some(event.week_date)),
        _ => (Some(event.week_date), None),
    };

    MediaEntry {
        title: String::new(),
        canonical_title: String::new(),
        media_type: MediaType::Unknown,
        start_date,
        finish_date,
        duration_days: None,
        status: Status::from_boundaries(start_date.is_some(), finish_date.is_some()),
        tags: Tags::default(),
        confidence: 0.0,
        source: FALLBACK_SOURCE.to_string(),
        raw_text: event.raw_text.clone(),
        warnings: vec![format!(
            "empty title extracted from segment '{}'",
            event.raw_text
        )],
    }
}
