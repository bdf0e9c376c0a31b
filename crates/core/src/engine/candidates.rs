use crate::engine::types::{Candidate, CandidateBuckets};

/// Listings farther than this are out of scope while searching locally.
pub const MAX_LOCAL_RADIUS_MILES: f64 = 25.0;

/// Provider, then feed, then public. Duplicates across buckets are kept.
pub fn collect_candidates(buckets: &CandidateBuckets) -> Vec<&Candidate> {
    buckets.provider.iter().chain(buckets.feed.iter()).chain(buckets.public.iter()).collect()
}

/// Drops listings beyond the local radius. Listings with no known distance stay.
pub fn filter_local<'a>(candidates: Vec<&'a Candidate>) -> Vec<&'a Candidate> {
    candidates
        .into_iter()
        .filter(|candidate| {
            candidate.distance().map_or(true, |miles| miles <= MAX_LOCAL_RADIUS_MILES)
        })
        .collect()
}

/// Keeps listings the user's disambiguation answer points at: an exact id or name
/// match, or either of answer and name containing the other. Comparison is trimmed
/// and case-insensitive.
pub fn narrow_by_clarification<'a>(
    candidates: Vec<&'a Candidate>,
    answer: &str,
) -> Vec<&'a Candidate> {
    let answer = fold(answer);
    candidates
        .into_iter()
        .filter(|candidate| {
            let id = fold(&candidate.id);
            let name = fold(&candidate.name);
            id == answer || name == answer || name.contains(&answer) || answer.contains(&name)
        })
        .collect()
}

fn fold(text: &str) -> String {
    text.trim().to_lowercase()
}
