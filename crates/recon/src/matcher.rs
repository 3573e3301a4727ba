/// Similarity ratio in [0, 1] between two already-normalized strings.
pub fn similarity(a: &str, b: &str) -> f64 {
    strsim::normalized_levenshtein(a, b)
}

/// Best fuzzy match for `query` among `candidates`.
///
/// Comparison is case-insensitive on trimmed strings. Returns the index and
/// score of the highest-scoring candidate when it reaches `threshold`; ties go
/// to the earliest candidate.
pub fn best_match<S: AsRef<str>>(query: &str, candidates: &[S], threshold: f64) -> Option<(usize, f64)> {
    let query = normalize_label(query);
    if query.is_empty() {
        return None;
    }

    let mut best: Option<(usize, f64)> = None;
    for (idx, candidate) in candidates.iter().enumerate() {
        let candidate = normalize_label(candidate.as_ref());
        if candidate.is_empty() {
            continue;
        }
        let score = similarity(&query, &candidate);
        if best.map_or(true, |(_, s)| score > s) {
            best = Some((idx, score));
        }
    }

    best.filter(|(_, score)| *score >= threshold)
}

/// Label normalization shared by every column comparison: trim + case-fold.
pub fn normalize_label(s: &str) -> String {
    s.trim().to_lowercase()
}
