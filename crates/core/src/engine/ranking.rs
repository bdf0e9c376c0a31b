use std::cmp::Ordering;

use crate::engine::outcome::DecisionRule;
use crate::engine::scoring::score;
use crate::engine::types::Candidate;

/// Candidates within this much of the top score are considered tied.
pub const TIE_SCORE_DELTA: f64 = 0.02;

/// A tie is settled by distance only when the tied listings are spread wider than this.
pub const DISTANCE_TIE_BREAK_MILES: f64 = 5.0;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ScoredCandidate<'a> {
    pub candidate: &'a Candidate,
    pub score: f64,
}

#[derive(Clone, Debug, PartialEq)]
pub struct TieResolution<'a> {
    pub top_score: f64,
    /// Unambiguous winner, if the tie set resolves to one.
    pub primary: Option<&'a Candidate>,
    /// Every candidate within [`TIE_SCORE_DELTA`] of the top score, in rank order.
    pub tied: Vec<&'a Candidate>,
    pub rule: DecisionRule,
}

/// Orders candidates by descending score, then ascending distance. The sort is stable,
/// so equal keys keep their collection order.
pub fn rank<'a>(candidates: &[&'a Candidate]) -> Vec<ScoredCandidate<'a>> {
    let mut ranked: Vec<ScoredCandidate<'a>> = candidates
        .iter()
        .map(|candidate| ScoredCandidate { candidate, score: score(candidate) })
        .collect();

    ranked.sort_by(|left, right| {
        right
            .score
            .total_cmp(&left.score)
            .then_with(|| compare_distance(left.candidate, right.candidate))
    });
    ranked
}

pub fn resolve_tie<'a>(ranked: &[ScoredCandidate<'a>]) -> Option<TieResolution<'a>> {
    let first = ranked.first()?;
    let top_score = first.score;

    let tied: Vec<&'a Candidate> = ranked
        .iter()
        .filter(|scored| (scored.score - top_score).abs() <= TIE_SCORE_DELTA)
        .map(|scored| scored.candidate)
        .collect();

    if tied.len() <= 1 {
        return Some(TieResolution {
            top_score,
            primary: Some(first.candidate),
            tied,
            rule: DecisionRule::SinglePrimary,
        });
    }

    let mut by_distance = tied.clone();
    by_distance.sort_by(|left, right| compare_distance(left, right));

    let (closest, farthest) = match (by_distance.first(), by_distance.last()) {
        (Some(closest), Some(farthest)) => (*closest, *farthest),
        _ => return None,
    };
    // Missing distances count as zero here, so an undistanced listing never widens the spread.
    let spread = farthest.distance().unwrap_or(0.0) - closest.distance().unwrap_or(0.0);

    if spread > DISTANCE_TIE_BREAK_MILES {
        return Some(TieResolution {
            top_score,
            primary: Some(closest),
            tied,
            rule: DecisionRule::TieBrokenByDistance,
        });
    }

    Some(TieResolution { top_score, primary: None, tied, rule: DecisionRule::TieUnresolved })
}

fn compare_distance(left: &Candidate, right: &Candidate) -> Ordering {
    left.distance_key().total_cmp(&right.distance_key())
}
