//! External metadata source adapters
//!
//! One adapter per catalog, each implementing the `MetadataSource` trait:
//! - **TMDB** — TV shows and movies
//! - **IGDB** — video games
//! - **Open Library** — books
//!
//! Adapters own their HTTP client and credential gating. A source with no
//! credential fails every lookup immediately with `SourceError::Disabled`,
//! which the canonicalizer counts as a source failure and falls through.

pub mod igdb;
pub mod openlibrary;
pub mod tmdb;

pub use igdb::IgdbSource;
pub use openlibrary::OpenLibrarySource;
pub use tmdb::TmdbSource;

use crate::config::Credentials;
use crate::types::MetadataSource;
use std::sync::Arc;

/// Build the full adapter set from resolved credentials
pub fn build_sources(credentials: &Credentials) -> Vec<Arc<dyn MetadataSource>> {
    vec![
        Arc::new(TmdbSource::new(credentials.tmdb_api_key.clone())),
        Arc::new(IgdbSource::new(
            credentials.igdb_client_id.clone(),
            credentials.igdb_access_token.clone(),
        )),
        Arc::new(OpenLibrarySource::new(
            credentials.openlibrary_api_key.clone(),
        )),
    ]
}

/// Levenshtein-based similarity between a queried and a returned title
///
/// `1.0 - distance / max_len`, case-folded; identical strings score 1.0.
pub(crate) fn title_similarity(query: &str, candidate: &str) -> f32 {
    let query = query.to_lowercase();
    let candidate = candidate.to_lowercase();
    let max_len = query.chars().count().max(candidate.chars().count());
    if max_len == 0 {
        return 0.0;
    }

    let distance = strsim::levenshtein(&query, &candidate);
    (1.0 - distance as f32 / max_len as f32).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_titles_score_one() {
        assert_eq!(title_similarity("Hades", "hades"), 1.0);
    }

    #[test]
    fn disjoint_titles_score_low() {
        assert!(title_similarity("Hades", "Stardew Valley") < 0.3);
    }

    #[test]
    fn near_matches_score_high() {
        assert!(title_similarity("The Witcher 3", "The Witcher 3: Wild Hunt") > 0.5);
    }

    #[test]
    fn empty_query_scores_zero() {
        assert_eq!(title_similarity("", ""), 0.0);
    }
}
