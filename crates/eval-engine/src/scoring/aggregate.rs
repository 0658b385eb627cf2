//! Combining sub-scores into a recommendation

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

use super::{NEUTRAL_SCORE, ScoreComponent, ScoreKind, ScoreResult};
use crate::config::ScoreWeights;

/// Most strengths, and most graded weaknesses besides red flags, reported
const MAX_FINDINGS: usize = 3;

/// Merit at or above which a component counts as a strength
const STRENGTH_MERIT: f64 = 70.0;

/// Merit at or below which a component counts as a weakness
const WEAKNESS_MERIT: f64 = 40.0;

/// Investment verdict
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    StrongInvest,
    Invest,
    Watch,
    Pass,
    /// Too little evidence to recommend anything
    InsufficientEvidence,
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Verdict::StrongInvest => "strong_invest",
            Verdict::Invest => "invest",
            Verdict::Watch => "watch",
            Verdict::Pass => "pass",
            Verdict::InsufficientEvidence => "insufficient_evidence",
        };
        f.write_str(name)
    }
}

/// A graded aspect singled out as a strength or weakness
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Finding {
    pub kind: ScoreKind,
    /// How favourable the aspect is in [0, 100]; risk components are inverted
    pub merit: f64,
    pub note: String,
}

impl fmt::Display for Finding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.note)
    }
}

impl Finding {
    fn from_component(kind: ScoreKind, component: &ScoreComponent) -> Self {
        let merit = match kind {
            ScoreKind::Risk => 100.0 - component.score,
            _ => component.score,
        };
        Self {
            kind,
            merit,
            note: component.note.clone(),
        }
    }

    /// Stable order: by merit, then kind, then note
    fn cmp_merit(&self, other: &Self) -> Ordering {
        self.merit
            .total_cmp(&other.merit)
            .then(self.kind.cmp(&other.kind))
            .then_with(|| self.note.cmp(&other.note))
    }
}

/// Final recommendation derived from all sub-scores
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    /// Weighted score in [0, 100], risk inverted
    pub aggregate_score: f64,
    pub confidence: f64,
    /// 1 (weakest) to 5 (strongest)
    pub investment_score: u8,
    pub verdict: Verdict,
    pub weights: ScoreWeights,
    pub summary: String,
    /// Best-graded aspects, strongest first
    pub strengths: Vec<Finding>,
    /// Red flags first, then the worst-graded aspects
    pub weaknesses: Vec<Finding>,
    /// How each sub-score fed into the aggregate
    pub justification: String,
}

/// Weighted combination of sub-scores
#[derive(Debug, Clone)]
pub struct Aggregator {
    weights: ScoreWeights,
    min_confidence: f64,
}

impl Aggregator {
    pub fn new(weights: ScoreWeights, min_confidence: f64) -> Self {
        Self {
            weights,
            min_confidence,
        }
    }

    fn weight(&self, kind: ScoreKind) -> f64 {
        match kind {
            ScoreKind::Financial => self.weights.financial,
            ScoreKind::Founder => self.weights.founder,
            ScoreKind::Risk => self.weights.risk,
            ScoreKind::Valuation => self.weights.valuation,
        }
    }

    pub fn aggregate(&self, scores: &[ScoreResult]) -> Recommendation {
        let mut total_weight = 0.0;
        let mut weighted_score = 0.0;
        let mut weighted_confidence = 0.0;

        for result in scores {
            let weight = self.weight(result.kind);
            let score = match result.kind {
                ScoreKind::Risk => 100.0 - result.score,
                _ => result.score,
            };
            total_weight += weight;
            weighted_score += weight * score;
            weighted_confidence += weight * result.confidence;
        }

        let (aggregate_score, confidence) = if total_weight > 0.0 {
            (
                (weighted_score / total_weight).clamp(0.0, 100.0),
                (weighted_confidence / total_weight).clamp(0.0, 1.0),
            )
        } else {
            (NEUTRAL_SCORE, 0.0)
        };

        let verdict = if confidence < self.min_confidence {
            Verdict::InsufficientEvidence
        } else if aggregate_score >= 75.0 {
            Verdict::StrongInvest
        } else if aggregate_score >= 60.0 {
            Verdict::Invest
        } else if aggregate_score >= 45.0 {
            Verdict::Watch
        } else {
            Verdict::Pass
        };

        let investment_score = 1 + (aggregate_score / 25.0).round() as u8;
        let (strengths, weaknesses) = findings(scores);

        Recommendation {
            aggregate_score,
            confidence,
            investment_score,
            verdict,
            weights: self.weights,
            summary: format!(
                "{verdict}: aggregate {aggregate_score:.1}/100 at confidence {confidence:.2}"
            ),
            strengths,
            weaknesses,
            justification: self.justification(scores, aggregate_score),
        }
    }

    fn justification(&self, scores: &[ScoreResult], aggregate_score: f64) -> String {
        if scores.is_empty() {
            return "No sub-scores; neutral aggregate.".to_string();
        }
        let parts: Vec<String> = scores
            .iter()
            .map(|result| {
                let weight = self.weight(result.kind);
                match result.kind {
                    ScoreKind::Risk => format!(
                        "risk {:.0} counted as {:.0} (weight {weight:.2})",
                        result.score,
                        100.0 - result.score
                    ),
                    kind => format!("{kind} {:.0} (weight {weight:.2})", result.score),
                }
            })
            .collect();
        format!("{} give {aggregate_score:.1}/100.", parts.join(", "))
    }
}

/// Split scorer components into strengths and weaknesses
///
/// Scores with zero confidence carry no evidence and are skipped. Red flags
/// are always weaknesses.
fn findings(scores: &[ScoreResult]) -> (Vec<Finding>, Vec<Finding>) {
    let mut flags = Vec::new();
    let mut graded = Vec::new();
    for result in scores.iter().filter(|r| r.confidence > 0.0) {
        for component in &result.components {
            let finding = Finding::from_component(result.kind, component);
            if component.red_flag {
                flags.push(finding);
            } else {
                graded.push(finding);
            }
        }
    }

    graded.sort_by(Finding::cmp_merit);
    let weak: Vec<Finding> = graded
        .iter()
        .take_while(|f| f.merit <= WEAKNESS_MERIT)
        .take(MAX_FINDINGS)
        .cloned()
        .collect();
    let strengths: Vec<Finding> = graded
        .into_iter()
        .rev()
        .take_while(|f| f.merit >= STRENGTH_MERIT)
        .take(MAX_FINDINGS)
        .collect();

    flags.sort_by(Finding::cmp_merit);
    flags.extend(weak);
    (strengths, flags)
}
