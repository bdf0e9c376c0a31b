//! Relevance scoring for candidate listings

use crate::engine::types::Candidate;

/// Weights for the three relevance signals
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoringWeights {
    /// Weight for source authority (default: 0.5)
    pub authority: f64,
    /// Weight for cross-source agreement (default: 0.3)
    pub agreement: f64,
    /// Weight for listing freshness (default: 0.2)
    pub freshness: f64,
}

pub const DEFAULT_WEIGHTS: ScoringWeights =
    ScoringWeights { authority: 0.5, agreement: 0.3, freshness: 0.2 };

impl Default for ScoringWeights {
    fn default() -> Self {
        DEFAULT_WEIGHTS
    }
}

/// Maps a raw signal into `[0, 1]`. Non-finite values count as zero.
pub fn clamp_signal(value: f64) -> f64 {
    if !value.is_finite() {
        return 0.0;
    }
    value.clamp(0.0, 1.0)
}

pub fn score(candidate: &Candidate) -> f64 {
    score_with(&DEFAULT_WEIGHTS, candidate)
}

pub fn score_with(weights: &ScoringWeights, candidate: &Candidate) -> f64 {
    let total = weights.authority * clamp_signal(candidate.authority)
        + weights.agreement * clamp_signal(candidate.agreement)
        + weights.freshness * clamp_signal(candidate.freshness);

    clamp_signal(total)
}

#[cfg(test)]
mod tests {
    use super::{clamp_signal, score, score_with, ScoringWeights};
    use crate::engine::types::{Candidate, CandidateSource};

    fn candidate(authority: f64, agreement: f64, freshness: f64) -> Candidate {
        Candidate {
            id: "c".to_owned(),
            name: "Candidate".to_owned(),
            source: CandidateSource::Provider,
            authority,
            agreement,
            freshness,
            distance_miles: None,
            availability: None,
            open_now: None,
            location_label: None,
        }
    }

    #[test]
    fn full_signals_score_exactly_one() {
        assert_eq!(score(&candidate(1.0, 1.0, 1.0)), 1.0);
        assert_eq!(score(&candidate(0.0, 0.0, 0.0)), 0.0);
    }

    #[test]
    fn weights_follow_authority_agreement_freshness_order() {
        assert!((score(&candidate(1.0, 0.0, 0.0)) - 0.5).abs() < 1e-12);
        assert!((score(&candidate(0.0, 1.0, 0.0)) - 0.3).abs() < 1e-12);
        assert!((score(&candidate(0.0, 0.0, 1.0)) - 0.2).abs() < 1e-12);
    }

    #[test]
    fn out_of_range_values_clamp_to_nearest_bound() {
        assert_eq!(clamp_signal(1.7), 1.0);
        assert_eq!(clamp_signal(-0.4), 0.0);
        assert_eq!(score(&candidate(3.0, -2.0, 0.0)), 0.5);
    }

    #[test]
    fn non_finite_values_contribute_nothing() {
        assert_eq!(clamp_signal(f64::NAN), 0.0);
        assert_eq!(clamp_signal(f64::INFINITY), 0.0);
        assert_eq!(clamp_signal(f64::NEG_INFINITY), 0.0);

        let scored = score(&candidate(f64::NAN, f64::INFINITY, 1.0));
        assert!((scored - 0.2).abs() < 1e-12);
    }

    #[test]
    fn score_stays_in_unit_interval_for_any_signals() {
        let samples = [f64::NAN, f64::INFINITY, -1.0, 0.0, 0.25, 0.5, 0.99, 1.0, 42.0];
        for authority in samples {
            for agreement in samples {
                for freshness in samples {
                    let value = score(&candidate(authority, agreement, freshness));
                    assert!((0.0..=1.0).contains(&value), "score {value} escaped [0, 1]");
                }
            }
        }
    }

    #[test]
    fn custom_weights_are_clamped_into_unit_interval() {
        let heavy = ScoringWeights { authority: 2.0, agreement: 2.0, freshness: 2.0 };
        assert_eq!(score_with(&heavy, &candidate(1.0, 1.0, 1.0)), 1.0);
    }
}
