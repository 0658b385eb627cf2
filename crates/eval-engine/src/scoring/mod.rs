//! Scoring pipeline
//!
//! Four independent scorers read the canonical record and each produce a
//! sub-score with a rationale. The [`Aggregator`] combines them into a
//! [`Recommendation`].

mod aggregate;
mod financial;
mod founder;
mod risk;
mod valuation;

pub use aggregate::{Aggregator, Finding, Recommendation, Verdict};
pub use financial::FinancialScorer;
pub use founder::FounderScorer;
pub use risk::RiskScorer;
pub use valuation::ValuationScorer;

use eval_core::{Error, Field, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

use crate::config::EvalConfig;
use crate::record::CanonicalRecord;

/// Score returned when there is no usable evidence
pub const NEUTRAL_SCORE: f64 = 50.0;

/// Which aspect of the startup a scorer assesses
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreKind {
    Financial,
    Founder,
    /// Higher means riskier
    Risk,
    Valuation,
}

impl fmt::Display for ScoreKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ScoreKind::Financial => "financial",
            ScoreKind::Founder => "founder",
            ScoreKind::Risk => "risk",
            ScoreKind::Valuation => "valuation",
        };
        f.write_str(name)
    }
}

/// One graded aspect behind a sub-score
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreComponent {
    /// Component score in [0, 100], on the scorer's own scale
    pub score: f64,
    pub note: String,
    /// Always reported as a weakness, whatever the score
    #[serde(default)]
    pub red_flag: bool,
}

/// Output of one scorer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreResult {
    pub kind: ScoreKind,
    /// Sub-score in [0, 100]
    pub score: f64,
    pub confidence: f64,
    /// Share of needed fields that were present
    pub completeness: f64,
    pub rationale: String,
    pub fields_used: Vec<Field>,
    pub missing_fields: Vec<Field>,
    pub metrics: BTreeMap<String, f64>,
    /// Graded aspects in the order the scorer assessed them
    #[serde(default)]
    pub components: Vec<ScoreComponent>,
}

/// A pure function from the canonical record to a sub-score
pub trait Scorer: Send + Sync {
    fn kind(&self) -> ScoreKind;

    /// Fields this scorer draws on
    fn needs(&self) -> &'static [Field];

    fn score(&self, record: &CanonicalRecord) -> Result<ScoreResult>;
}

/// Runs every scorer over a shared record
pub struct ScoringPipeline {
    scorers: Vec<Arc<dyn Scorer>>,
    aggregator: Aggregator,
}

impl ScoringPipeline {
    pub fn new(config: &EvalConfig) -> Self {
        let max_chars = config.rationale_max_chars;
        Self {
            scorers: vec![
                Arc::new(FinancialScorer::new(max_chars)),
                Arc::new(FounderScorer::new(max_chars)),
                Arc::new(RiskScorer::new(max_chars)),
                Arc::new(ValuationScorer::new(max_chars)),
            ],
            aggregator: Aggregator::new(config.weights, config.min_recommendation_confidence),
        }
    }

    pub fn aggregator(&self) -> &Aggregator {
        &self.aggregator
    }

    /// Validate the record, then run all scorers concurrently on the blocking pool
    ///
    /// Results come back ordered by [`ScoreKind`].
    pub async fn run(&self, record: Arc<CanonicalRecord>) -> Result<Vec<ScoreResult>> {
        record.validate()?;

        let handles: Vec<_> = self
            .scorers
            .iter()
            .map(|scorer| {
                let scorer = Arc::clone(scorer);
                let record = Arc::clone(&record);
                tokio::task::spawn_blocking(move || scorer.score(&record))
            })
            .collect();

        let joined = futures::future::join_all(handles).await;

        let mut results = Vec::with_capacity(joined.len());
        for joined in joined {
            let result =
                joined.map_err(|e| Error::Internal(format!("scorer task failed: {e}")))??;
            debug!(
                kind = %result.kind,
                score = result.score,
                confidence = result.confidence,
                "Scorer finished"
            );
            results.push(result);
        }

        results.sort_by_key(|r| r.kind);
        Ok(results)
    }
}

/// Presence and confidence of a scorer's needed fields
pub(crate) struct Evidence<'a> {
    record: &'a CanonicalRecord,
    needs: &'static [Field],
}

impl<'a> Evidence<'a> {
    pub(crate) fn new(record: &'a CanonicalRecord, needs: &'static [Field]) -> Self {
        Self { record, needs }
    }

    pub(crate) fn present(&self) -> Vec<Field> {
        self.needs
            .iter()
            .copied()
            .filter(|f| self.record.contains(*f))
            .collect()
    }

    pub(crate) fn missing(&self) -> Vec<Field> {
        self.needs
            .iter()
            .copied()
            .filter(|f| !self.record.contains(*f))
            .collect()
    }

    pub(crate) fn completeness(&self) -> f64 {
        if self.needs.is_empty() {
            return 0.0;
        }
        self.present().len() as f64 / self.needs.len() as f64
    }

    /// Mean confidence of present fields, scaled by the share present
    pub(crate) fn confidence(&self) -> f64 {
        let confidences: Vec<f64> = self
            .present()
            .into_iter()
            .filter_map(|f| self.record.confidence(f))
            .collect();
        if confidences.is_empty() {
            return 0.0;
        }
        let mean = confidences.iter().sum::<f64>() / confidences.len() as f64;
        mean * self.completeness()
    }
}

/// Accumulates the components of one score
pub(crate) struct ScoreSheet {
    kind: ScoreKind,
    components: Vec<ScoreComponent>,
    metrics: BTreeMap<String, f64>,
}

impl ScoreSheet {
    pub(crate) fn new(kind: ScoreKind) -> Self {
        Self {
            kind,
            components: Vec::new(),
            metrics: BTreeMap::new(),
        }
    }

    /// Record a component score in [0, 100] with a short explanation
    pub(crate) fn component(&mut self, score: f64, note: impl Into<String>) {
        self.push(score, note.into(), false);
    }

    /// Record a component that must surface as a weakness
    pub(crate) fn red_flag(&mut self, score: f64, note: impl Into<String>) {
        self.push(score, note.into(), true);
    }

    fn push(&mut self, score: f64, note: String, red_flag: bool) {
        self.components.push(ScoreComponent {
            score: score.clamp(0.0, 100.0),
            note,
            red_flag,
        });
    }

    pub(crate) fn metric(&mut self, name: &str, value: f64) {
        if value.is_finite() {
            self.metrics.insert(name.to_string(), value);
        }
    }

    pub(crate) fn finish(self, evidence: &Evidence<'_>, max_chars: usize) -> ScoreResult {
        let missing = evidence.missing();
        let (score, confidence, mut rationale) = if self.components.is_empty() {
            (
                NEUTRAL_SCORE,
                0.0,
                format!("No usable {} evidence; neutral score.", self.kind),
            )
        } else {
            let mean = self.components.iter().map(|c| c.score).sum::<f64>()
                / self.components.len() as f64;
            let notes: Vec<&str> = self.components.iter().map(|c| c.note.as_str()).collect();
            (mean, evidence.confidence(), format!("{}.", notes.join("; ")))
        };

        if !missing.is_empty() {
            let names: Vec<&str> = missing.iter().map(Field::as_str).collect();
            rationale.push_str(&format!(" Missing: {}.", names.join(", ")));
        }

        ScoreResult {
            kind: self.kind,
            score: score.clamp(0.0, 100.0),
            confidence: confidence.clamp(0.0, 1.0),
            completeness: evidence.completeness(),
            rationale: truncate(&rationale, max_chars),
            fields_used: evidence.present(),
            missing_fields: missing,
            metrics: self.metrics,
            components: self.components,
        }
    }
}

/// Linear map of `value` from `[low, high]` onto `[0, 100]`, clamped
pub(crate) fn scale(value: f64, low: f64, high: f64) -> f64 {
    ((value - low) / (high - low) * 100.0).clamp(0.0, 100.0)
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let kept: String = text.chars().take(max_chars.saturating_sub(3)).collect();
    format!("{}...", kept.trim_end())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::tests::record_with;
    use eval_core::FieldValue;

    #[test]
    fn test_truncate_respects_char_boundaries() {
        let text = "é".repeat(100);
        let short = truncate(&text, 50);
        assert_eq!(short.chars().count(), 50);
        assert!(short.ends_with("..."));
        assert_eq!(truncate("short", 50), "short");
    }

    #[test]
    fn test_evidence_confidence_scales_with_presence() {
        const NEEDS: &[Field] = &[Field::Revenue, Field::NetIncome];
        let record = record_with(&[(Field::Revenue, FieldValue::Number(1.0), 0.8)]);
        let evidence = Evidence::new(&record, NEEDS);
        assert!((evidence.confidence() - 0.4).abs() < 1e-9);
        assert_eq!(evidence.missing(), vec![Field::NetIncome]);
    }

    #[test]
    fn test_sheet_keeps_components_with_notes() {
        const NEEDS: &[Field] = &[Field::Revenue];
        let record = record_with(&[(Field::Revenue, FieldValue::Number(1.0), 0.8)]);
        let mut sheet = ScoreSheet::new(ScoreKind::Risk);
        sheet.component(20.0, "calm coverage");
        sheet.red_flag(140.0, "sanctions");

        let result = sheet.finish(&Evidence::new(&record, NEEDS), 200);
        assert!((result.score - 60.0).abs() < 1e-9);
        assert_eq!(result.components.len(), 2);
        assert!(!result.components[0].red_flag);
        assert!(result.components[1].red_flag);
        assert!((result.components[1].score - 100.0).abs() < f64::EPSILON);
        assert_eq!(result.rationale, "calm coverage; sanctions.");
    }

    #[tokio::test]
    async fn test_pipeline_returns_results_in_kind_order() {
        let record = Arc::new(record_with(&[
            (Field::AnnualRecurringRevenue, FieldValue::Number(2e6), 0.9),
            (Field::FounderYearsExperience, FieldValue::Number(12.0), 0.75),
        ]));
        let results = ScoringPipeline::new(&EvalConfig::default())
            .run(record)
            .await
            .unwrap();
        let kinds: Vec<ScoreKind> = results.iter().map(|r| r.kind).collect();
        assert_eq!(
            kinds,
            vec![
                ScoreKind::Financial,
                ScoreKind::Founder,
                ScoreKind::Risk,
                ScoreKind::Valuation
            ]
        );
    }

    #[tokio::test]
    async fn test_pipeline_rejects_structurally_invalid_record() {
        let record = Arc::new(record_with(&[(Field::Revenue, FieldValue::Number(1.0), 2.0)]));
        let err = ScoringPipeline::new(&EvalConfig::default())
            .run(record)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Structural(_)));
    }

    #[tokio::test]
    async fn test_empty_record_scores_neutral() {
        let results = ScoringPipeline::new(&EvalConfig::default())
            .run(Arc::new(CanonicalRecord::default()))
            .await
            .unwrap();
        for result in results {
            assert!((result.score - NEUTRAL_SCORE).abs() < f64::EPSILON);
            assert!(result.confidence.abs() < f64::EPSILON);
            assert!(result.rationale.contains("Missing"));
        }
    }
}
