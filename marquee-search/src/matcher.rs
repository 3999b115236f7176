//! Candidate selection by title similarity.
//!
//! The `_by` variants take a key extractor so structured candidates (scraped
//! entities) can be ranked by one of their fields without copying it out.

use crate::normalize::normalize;
use crate::similarity::{fuzzy_match, normalized_ratio};
use crate::types::ContentEntity;

/// Threshold used by [`match_titles`] for its fuzzy fallback.
pub const TITLE_MATCH_THRESHOLD: f64 = 0.85;

/// Best candidate whose similarity strictly exceeds `threshold`.
///
/// The running best starts at `threshold` and only a strictly higher score
/// replaces it: a candidate scoring exactly `threshold` never wins, and on
/// equal scores the first candidate is kept.
pub fn best_match<'a, S: AsRef<str>>(
    query: &str,
    candidates: &'a [S],
    threshold: f64,
) -> Option<&'a S> {
    best_match_by(query, candidates, threshold, |c| c.as_ref())
}

/// [`best_match`] over candidates compared through `key`.
pub fn best_match_by<'a, T, F>(
    query: &str,
    candidates: &'a [T],
    threshold: f64,
    key: F,
) -> Option<&'a T>
where
    F: Fn(&T) -> &str,
{
    let query = normalize(query);
    let mut best = None;
    let mut best_score = threshold;

    for candidate in candidates {
        let score = normalized_ratio(&query, &normalize(key(candidate)));
        if score > best_score {
            best_score = score;
            best = Some(candidate);
        }
    }

    best
}

/// Every candidate scoring at least `threshold`, best first.
///
/// Sorting is stable, so equal scores keep their input order.
pub fn all_matches<'a, S: AsRef<str>>(
    query: &str,
    candidates: &'a [S],
    threshold: f64,
) -> Vec<(&'a S, f64)> {
    all_matches_by(query, candidates, threshold, |c| c.as_ref())
}

/// [`all_matches`] over candidates compared through `key`.
pub fn all_matches_by<'a, T, F>(
    query: &str,
    candidates: &'a [T],
    threshold: f64,
    key: F,
) -> Vec<(&'a T, f64)>
where
    F: Fn(&T) -> &str,
{
    let query = normalize(query);
    let mut matches: Vec<(&T, f64)> = candidates
        .iter()
        .map(|c| (c, normalized_ratio(&query, &normalize(key(c)))))
        .filter(|(_, score)| *score >= threshold)
        .collect();

    matches.sort_by(|a, b| b.1.total_cmp(&a.1));
    matches
}

/// Whether two titles name the same thing.
///
/// Equal normalized forms always match. With `allow_partial`, one
/// normalized title containing the other also matches. Otherwise falls back
/// to a fuzzy comparison at [`TITLE_MATCH_THRESHOLD`].
pub fn match_titles(a: &str, b: &str, allow_partial: bool) -> bool {
    match_titles_with(a, b, allow_partial, TITLE_MATCH_THRESHOLD)
}

/// [`match_titles`] with an explicit fuzzy threshold.
pub fn match_titles_with(a: &str, b: &str, allow_partial: bool, threshold: f64) -> bool {
    let norm_a = normalize(a);
    let norm_b = normalize(b);

    if norm_a == norm_b {
        return true;
    }

    // An empty title is a substring of everything; never a partial match.
    if allow_partial
        && !norm_a.is_empty()
        && !norm_b.is_empty()
        && (norm_a.contains(&norm_b) || norm_b.contains(&norm_a))
    {
        return true;
    }

    fuzzy_match(a, b, threshold)
}

/// Filters and orders search hits against the query that produced them.
///
/// Keeps an entity when its title scores at least `threshold` or the
/// normalized titles contain one another ("Matrix" finds "The Matrix
/// Reloaded"). Best scores first; ties keep upstream order.
pub fn rank_search_results(
    query: &str,
    entities: Vec<ContentEntity>,
    threshold: f64,
) -> Vec<ContentEntity> {
    let normalized_query = normalize(query);
    if normalized_query.is_empty() {
        return Vec::new();
    }

    let mut scored: Vec<(ContentEntity, f64)> = entities
        .into_iter()
        .filter_map(|entity| {
            let title = normalize(&entity.title);
            let score = normalized_ratio(&normalized_query, &title);
            let contained = !title.is_empty()
                && (title.contains(&normalized_query) || normalized_query.contains(&title));
            (score >= threshold || contained).then_some((entity, score))
        })
        .collect();

    scored.sort_by(|a, b| b.1.total_cmp(&a.1));
    scored.into_iter().map(|(entity, _)| entity).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ContentKind;

    fn entity(title: &str) -> ContentEntity {
        let url = format!("https://catalog.test/{}", title.replace(' ', "-"));
        ContentEntity {
            kind: ContentKind::Movie,
            id: format!("cuevanap_{url}"),
            title: title.to_string(),
            poster_url: None,
            year: None,
            source_url: url,
        }
    }

    #[test]
    fn test_best_match_picks_strict_maximum() {
        let candidates = ["The Matrix", "The Matrix Reloaded", "Matrix"];
        assert_eq!(
            best_match("matrix", &candidates, 0.8),
            Some(&"Matrix")
        );
    }

    #[test]
    fn test_best_match_none_below_threshold() {
        let candidates = ["Inception", "Interstellar"];
        assert_eq!(best_match("The Godfather", &candidates, 0.8), None);
        assert_eq!(best_match::<&str>("anything", &[], 0.8), None);
    }

    #[test]
    fn test_best_match_at_threshold_never_wins() {
        // similarity("abcd", "bcde") == 0.75 exactly
        assert_eq!(best_match("abcd", &["bcde"], 0.75), None);
        assert_eq!(best_match("abcd", &["bcde"], 0.74), Some(&"bcde"));
    }

    #[test]
    fn test_best_match_tie_keeps_first() {
        let candidates = ["Dune", "DUNE", "dune"];
        let best = best_match("dune", &candidates, 0.5).unwrap();
        assert!(std::ptr::eq(best, &candidates[0]));
    }

    #[test]
    fn test_all_matches_sorted_and_filtered() {
        let candidates = ["Matrix", "The Matrix", "Inception", "Matrix!"];
        let matches = all_matches("matrix", &candidates, 0.7);

        let titles: Vec<&str> = matches.iter().map(|(c, _)| **c).collect();
        assert_eq!(titles, vec!["Matrix", "Matrix!", "The Matrix"]);
        for pair in matches.windows(2) {
            assert!(pair[0].1 >= pair[1].1);
        }
        assert!(matches.iter().all(|(_, score)| *score >= 0.7));
    }

    #[test]
    fn test_all_matches_stable_on_ties() {
        let candidates = ["dune", "Dune", "DUNE"];
        let matches = all_matches("Dune", &candidates, 0.8);
        let order: Vec<&str> = matches.iter().map(|(c, _)| **c).collect();
        assert_eq!(order, vec!["dune", "Dune", "DUNE"]);
    }

    #[test]
    fn test_match_titles() {
        assert!(match_titles("The Matrix", "the matrix", false));
        assert!(match_titles("Matrix", "The Matrix Reloaded", true));
        assert!(!match_titles("Matrix", "The Matrix Reloaded", false));
        assert!(match_titles("Interstellar", "Intersteller", false));
        assert!(!match_titles("", "The Matrix", true));
    }

    #[test]
    fn test_best_match_by_entities() {
        let entities = vec![entity("Dune"), entity("Dune Part Two"), entity("Alien")];
        let best = best_match_by("dune: part two", &entities, 0.8, |e| e.title.as_str());
        assert_eq!(best.map(|e| e.title.as_str()), Some("Dune Part Two"));
    }

    #[test]
    fn test_rank_search_results_keeps_partial_hits() {
        let entities = vec![
            entity("The Matrix Reloaded"),
            entity("Paddington"),
            entity("Matrix"),
        ];
        let ranked = rank_search_results("matrix", entities, 0.6);
        let titles: Vec<&str> = ranked.iter().map(|e| e.title.as_str()).collect();
        assert_eq!(titles, vec!["Matrix", "The Matrix Reloaded"]);
    }

    #[test]
    fn test_rank_search_results_blank_query() {
        assert!(rank_search_results("  ", vec![entity("Matrix")], 0.6).is_empty());
    }
}
