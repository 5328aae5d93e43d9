//! Confidence scoring for metadata search candidates.
//!
//! `total = 0.6 * title_similarity + 0.3 * year_match + 0.1 * type_match`,
//! and `confidence = min(1, 1.2 * total)`. Every component lies in `[0, 1]`.

use scenecatalog_common::MediaKind;
use serde::Serialize;

use super::provider::SearchHit;

const TITLE_WEIGHT: f64 = 0.6;
const YEAR_WEIGHT: f64 = 0.3;
const TYPE_WEIGHT: f64 = 0.1;
const CONFIDENCE_SCALE: f64 = 1.2;

const STOP_WORDS: &[&str] = &[
    "the", "a", "an", "and", "or", "but", "in", "on", "at", "to", "for", "of", "with", "by",
];

/// What we are trying to match.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchQuery {
    pub title: String,
    pub year: Option<u16>,
    pub kind: MediaKind,
}

impl MatchQuery {
    pub fn new(title: impl Into<String>, year: Option<u16>, kind: MediaKind) -> Self {
        Self {
            title: title.into(),
            year,
            kind,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MatchingScore {
    pub title_similarity: f64,
    pub year_match: f64,
    pub type_match: f64,
    pub total_score: f64,
    pub confidence: f64,
}

/// A search hit together with its score.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchCandidate {
    pub hit: SearchHit,
    pub score: MatchingScore,
}

pub fn calculate_matching_score(query: &MatchQuery, hit: &SearchHit) -> MatchingScore {
    let title_similarity = title_similarity(&query.title, &hit.title);
    let year_match = year_match(query.year, hit.year);
    let type_match = type_match(query.kind, hit.kind);

    let total_score =
        TITLE_WEIGHT * title_similarity + YEAR_WEIGHT * year_match + TYPE_WEIGHT * type_match;

    MatchingScore {
        title_similarity,
        year_match,
        type_match,
        total_score,
        confidence: (total_score * CONFIDENCE_SCALE).min(1.0),
    }
}

/// Score every hit and keep the best. Ties go to the earlier hit.
pub fn best_candidate(query: &MatchQuery, hits: Vec<SearchHit>) -> Option<MatchCandidate> {
    let mut best: Option<MatchCandidate> = None;
    for hit in hits {
        let score = calculate_matching_score(query, &hit);
        let better = best
            .as_ref()
            .map_or(true, |b| score.total_score > b.score.total_score);
        if better {
            best = Some(MatchCandidate { hit, score });
        }
    }
    best
}

/// Lower-case, drop punctuation and stop words, collapse whitespace.
pub fn clean_title(title: &str) -> String {
    let lowered = title.to_lowercase();
    let spaced: String = lowered
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '_' { c } else { ' ' })
        .collect();

    spaced
        .split_whitespace()
        .filter(|word| !STOP_WORDS.contains(word))
        .collect::<Vec<_>>()
        .join(" ")
}

/// `1 - levenshtein / max_len` over cleaned titles. Two empty titles score 0.
pub fn title_similarity(a: &str, b: &str) -> f64 {
    let a: Vec<char> = clean_title(a).chars().collect();
    let b: Vec<char> = clean_title(b).chars().collect();

    let max_len = a.len().max(b.len());
    if max_len == 0 {
        return 0.0;
    }
    1.0 - levenshtein(&a, &b) as f64 / max_len as f64
}

pub fn year_match(query: Option<u16>, candidate: Option<u16>) -> f64 {
    match (query, candidate) {
        (Some(q), Some(c)) => {
            let delta = q.abs_diff(c);
            if delta <= 1 {
                1.0
            } else {
                (1.0 - f64::from(delta) / 10.0).max(0.0)
            }
        }
        _ => 0.5,
    }
}

pub fn type_match(query: MediaKind, candidate: MediaKind) -> f64 {
    if !query.is_known() || !candidate.is_known() {
        0.5
    } else if query == candidate {
        1.0
    } else {
        0.0
    }
}

fn levenshtein(a: &[char], b: &[char]) -> usize {
    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0; b.len() + 1];

    for (i, ca) in a.iter().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let cost = usize::from(ca != cb);
            curr[j + 1] = (prev[j + 1] + 1).min(curr[j] + 1).min(prev[j] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[b.len()]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hit(title: &str, year: Option<u16>, kind: MediaKind) -> SearchHit {
        SearchHit {
            id: title.to_lowercase(),
            title: title.into(),
            year,
            kind,
            overview: None,
            poster_path: None,
            backdrop_path: None,
            rating: None,
            provider_name: "stub".into(),
        }
    }

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn levenshtein_distances() {
        let d = |a: &str, b: &str| {
            levenshtein(
                &a.chars().collect::<Vec<_>>(),
                &b.chars().collect::<Vec<_>>(),
            )
        };
        assert_eq!(d("kitten", "sitting"), 3);
        assert_eq!(d("", "abc"), 3);
        assert_eq!(d("same", "same"), 0);
    }

    #[test]
    fn clean_title_strips_stop_words_and_punctuation() {
        assert_eq!(clean_title("The Lord of the Rings: Return"), "lord rings return");
        assert_eq!(clean_title("Spider-Man"), "spider man");
        assert_eq!(clean_title("  "), "");
    }

    #[test]
    fn similarity_bounds() {
        assert!(approx(title_similarity("Inception", "inception"), 1.0));
        assert!(approx(title_similarity("The Matrix", "Matrix"), 1.0));
        assert!(approx(title_similarity("", ""), 0.0));
        assert!(approx(title_similarity("the", "a"), 0.0));
        assert!(approx(title_similarity("abc", ""), 0.0));
        let s = title_similarity("Inception", "Interception");
        assert!(s > 0.0 && s < 1.0);
    }

    #[test]
    fn year_match_rules() {
        assert!(approx(year_match(Some(2010), Some(2010)), 1.0));
        assert!(approx(year_match(Some(2010), Some(2011)), 1.0));
        assert!(approx(year_match(Some(2010), Some(2013)), 0.7));
        assert!(approx(year_match(Some(1990), Some(2010)), 0.0));
        assert!(approx(year_match(None, Some(2010)), 0.5));
    }

    #[test]
    fn type_match_rules() {
        assert!(approx(type_match(MediaKind::Movie, MediaKind::Movie), 1.0));
        assert!(approx(type_match(MediaKind::Movie, MediaKind::Tv), 0.0));
        assert!(approx(type_match(MediaKind::Unknown, MediaKind::Tv), 0.5));
    }

    #[test]
    fn perfect_candidate_clamps_to_one() {
        let query = MatchQuery::new("Inception", Some(2010), MediaKind::Movie);
        let score = calculate_matching_score(&query, &hit("Inception", Some(2010), MediaKind::Movie));
        assert!(approx(score.total_score, 1.0));
        assert!(approx(score.confidence, 1.0));
    }

    #[test]
    fn confidence_scales_total() {
        let query = MatchQuery::new("Inception", None, MediaKind::Unknown);
        let score = calculate_matching_score(&query, &hit("Inception", Some(2010), MediaKind::Movie));
        // 0.6 + 0.15 + 0.05
        assert!(approx(score.total_score, 0.8));
        assert!(approx(score.confidence, 0.96));
    }

    #[test]
    fn score_is_case_symmetric() {
        let q1 = MatchQuery::new("Blade Runner", Some(1982), MediaKind::Movie);
        let q2 = MatchQuery::new("BLADE RUNNER", Some(1982), MediaKind::Movie);
        let h1 = hit("Blade Runner 2049", Some(2017), MediaKind::Movie);
        let h2 = hit("blade runner 2049", Some(2017), MediaKind::Movie);
        assert_eq!(calculate_matching_score(&q1, &h1), calculate_matching_score(&q2, &h2));
    }

    #[test]
    fn score_is_monotonic_in_year_distance() {
        let query = MatchQuery::new("Dune", Some(2021), MediaKind::Movie);
        let mut last = f64::INFINITY;
        for year in [2021, 2023, 2025, 2028, 2040] {
            let s = calculate_matching_score(&query, &hit("Dune", Some(year), MediaKind::Movie));
            assert!(s.total_score <= last);
            last = s.total_score;
        }
    }

    #[test]
    fn best_candidate_prefers_first_on_tie() {
        let query = MatchQuery::new("Heat", Some(1995), MediaKind::Movie);
        let best = best_candidate(
            &query,
            vec![
                hit("Heat", Some(1995), MediaKind::Movie),
                hit("HEAT", Some(1995), MediaKind::Movie),
                hit("Heatwave", Some(1995), MediaKind::Movie),
            ],
        )
        .unwrap();
        assert_eq!(best.hit.title, "Heat");
        assert!(best_candidate(&query, Vec::new()).is_none());
    }
}
