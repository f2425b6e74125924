//! Weighted multi-criterion scoring shared by navigator matching and provider ranking.

use super::domain::{MatchResult, ScoreComponent};

/// Tolerance applied when checking that criterion weights sum to one.
pub const WEIGHT_TOLERANCE: f64 = 1e-9;

/// Anything that can be ranked needs a stable identifier for tie-breaks.
pub trait Candidate {
    fn candidate_id(&self) -> &str;
}

/// When a criterion's sub-score earns a human-readable match reason.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Notability {
    Silent,
    Above(f64),
    AtLeast(f64),
}

impl Notability {
    fn is_notable(self, score: f64) -> bool {
        match self {
            Notability::Silent => false,
            Notability::Above(threshold) => score > threshold,
            Notability::AtLeast(threshold) => score >= threshold,
        }
    }
}

/// One weighted scoring rule. `score` must return a value in `[0, 1]`.
pub struct Criterion<C, X> {
    pub name: &'static str,
    pub weight: f64,
    pub notability: Notability,
    pub reason: &'static str,
    pub score: fn(&C, &X) -> f64,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum WeightError {
    #[error("at least one criterion is required")]
    Empty,
    #[error("criterion {criterion} has invalid weight {weight}")]
    Invalid { criterion: &'static str, weight: f64 },
    #[error("criterion weights sum to {sum}, expected 1.0")]
    NotNormalized { sum: f64 },
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ScoringError {
    #[error("criterion {criterion} scored {value} for candidate {candidate}, outside [0, 1]")]
    OutOfRange {
        criterion: &'static str,
        candidate: String,
        value: f64,
    },
}

/// Validated, ordered criterion list.
pub struct MatchScorer<C, X> {
    criteria: Vec<Criterion<C, X>>,
}

impl<C, X> MatchScorer<C, X>
where
    C: Candidate,
{
    pub fn new(criteria: Vec<Criterion<C, X>>) -> Result<Self, WeightError> {
        if criteria.is_empty() {
            return Err(WeightError::Empty);
        }

        for criterion in &criteria {
            if !criterion.weight.is_finite() || criterion.weight < 0.0 {
                return Err(WeightError::Invalid {
                    criterion: criterion.name,
                    weight: criterion.weight,
                });
            }
        }

        let sum: f64 = criteria.iter().map(|criterion| criterion.weight).sum();
        if (sum - 1.0).abs() > WEIGHT_TOLERANCE {
            return Err(WeightError::NotNormalized { sum });
        }

        Ok(Self { criteria })
    }

    pub fn criteria(&self) -> impl Iterator<Item = (&'static str, f64)> + '_ {
        self.criteria
            .iter()
            .map(|criterion| (criterion.name, criterion.weight))
    }

    /// Score one candidate against the context.
    pub fn score(&self, candidate: C, context: &X) -> Result<MatchResult<C>, ScoringError> {
        let mut total = 0.0;
        let mut reasons = Vec::new();
        let mut components = Vec::with_capacity(self.criteria.len());

        for criterion in &self.criteria {
            let value = (criterion.score)(&candidate, context);
            if !(0.0..=1.0).contains(&value) {
                return Err(ScoringError::OutOfRange {
                    criterion: criterion.name,
                    candidate: candidate.candidate_id().to_string(),
                    value,
                });
            }

            total += criterion.weight * value;
            if criterion.notability.is_notable(value) {
                reasons.push(criterion.reason.to_string());
            }
            components.push(ScoreComponent {
                criterion: criterion.name,
                weight: criterion.weight,
                score: value,
            });
        }

        Ok(MatchResult {
            candidate,
            // Sub-scores are in [0, 1] and weights sum to 1 within tolerance; the clamp only
            // absorbs floating-point drift at the edges.
            score: total.clamp(0.0, 1.0),
            reasons,
            components,
        })
    }

    /// Score every candidate and order them best first, ties broken by candidate id.
    pub fn rank(
        &self,
        candidates: Vec<C>,
        context: &X,
    ) -> Result<Vec<MatchResult<C>>, ScoringError> {
        let mut results = candidates
            .into_iter()
            .map(|candidate| self.score(candidate, context))
            .collect::<Result<Vec<_>, _>>()?;

        results.sort_by(|left, right| {
            right.score.total_cmp(&left.score).then_with(|| {
                left.candidate
                    .candidate_id()
                    .cmp(right.candidate.candidate_id())
            })
        });

        Ok(results)
    }
}
