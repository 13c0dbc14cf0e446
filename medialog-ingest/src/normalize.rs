//! Title normalization
//!
//! Raw titles are case-folded, trimmed, and stripped of trailing
//! season/episode markers before they are used as hint keys or cache keys.
//! The stripped marker is kept so the canonicalizer can re-append it to the
//! resolved display name.

use regex::Regex;
use std::sync::OnceLock;

/// Normalized form of a raw title
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedTitle {
    /// Lookup key: lower-cased, trimmed, season marker removed
    pub key: String,
    /// Season-stripped title with original casing, used for external queries
    pub display: String,
    /// Trailing season/episode marker ("Season 2", "S2", "S1E4"), original casing
    pub season: Option<String>,
}

fn season_marker_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)[\s,:\-]*\b(season\s*\d{1,2}|s\d{1,2}(?:\s*e\d{1,2})?)\s*$")
            .expect("valid pattern")
    })
}

/// Normalize a raw title into a lookup key plus any season marker
pub fn normalize_title(raw: &str) -> NormalizedTitle {
    let trimmed = raw.trim();

    if let Some(caps) = season_marker_re().captures(trimmed) {
        let marker = caps.get(1).map(|m| m.as_str().trim().to_string());
        let stripped = trimmed[..caps.get(0).map(|m| m.start()).unwrap_or(trimmed.len())].trim();
        let key = stripped.to_lowercase();
        // A bare marker with no remaining title is not a season reference
        if !key.is_empty() {
            return NormalizedTitle {
                key,
                display: stripped.to_string(),
                season: marker,
            };
        }
    }

    NormalizedTitle {
        key: trimmed.to_lowercase(),
        display: trimmed.to_string(),
        season: None,
    }
}

/// Shorthand for the lookup key alone
pub fn title_key(raw: &str) -> String {
    normalize_title(raw).key
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_trailing_season_word_marker() {
        let norm = normalize_title("The Good Place, Season 2");
        assert_eq!(norm.key, "the good place");
        assert_eq!(norm.display, "The Good Place");
        assert_eq!(norm.season.as_deref(), Some("Season 2"));
    }

    #[test]
    fn strips_compact_season_episode_marker() {
        let norm = normalize_title("Severance S2");
        assert_eq!(norm.key, "severance");
        assert_eq!(norm.season.as_deref(), Some("S2"));

        let norm = normalize_title("Severance s1e4");
        assert_eq!(norm.key, "severance");
        assert_eq!(norm.season.as_deref(), Some("s1e4"));
    }

    #[test]
    fn plain_titles_pass_through_casefolded() {
        let norm = normalize_title("  Elden Ring ");
        assert_eq!(norm.key, "elden ring");
        assert_eq!(norm.season, None);
    }

    #[test]
    fn bare_marker_is_not_a_season() {
        let norm = normalize_title("Season 2");
        assert_eq!(norm.key, "season 2");
        assert_eq!(norm.season, None);
    }
}
