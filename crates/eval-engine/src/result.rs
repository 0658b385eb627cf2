//! Evaluation results

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::record::{CanonicalRecord, SourceStatus};
use crate::scoring::{Recommendation, ScoreKind, ScoreResult};

/// How much evidence the evaluation was built on
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvidenceSummary {
    pub agents_run: usize,
    pub succeeded: usize,
    /// Failed runs that still contributed a partial fragment
    pub partial: usize,
    pub failed: usize,
    /// Share of all known fields present in the record
    pub field_completeness: f64,
    /// Agents re-run once follow-up discovery supplied their missing input
    pub follow_up_agents: Vec<String>,
}

impl EvidenceSummary {
    pub(crate) fn from_record(record: &CanonicalRecord, follow_up_agents: Vec<String>) -> Self {
        let count = |status: SourceStatus| {
            record
                .sources()
                .iter()
                .filter(|report| report.status == status)
                .count()
        };
        Self {
            agents_run: record.sources().len(),
            succeeded: count(SourceStatus::Succeeded),
            partial: count(SourceStatus::Partial),
            failed: count(SourceStatus::Failed),
            field_completeness: record.completeness(),
            follow_up_agents,
        }
    }

    /// Whether no agent contributed anything
    pub fn is_blackout(&self) -> bool {
        self.succeeded == 0 && self.partial == 0
    }
}

/// Final structured result of one evaluation request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationResult {
    pub request_id: Uuid,
    /// Company name as resolved from the record, else as given
    pub company_name: Option<String>,
    pub record: CanonicalRecord,
    /// One result per scorer, ordered by kind
    pub scores: Vec<ScoreResult>,
    pub recommendation: Recommendation,
    pub evidence: EvidenceSummary,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub elapsed_ms: u64,
}

impl EvaluationResult {
    pub fn score(&self, kind: ScoreKind) -> Option<&ScoreResult> {
        self.scores.iter().find(|s| s.kind == kind)
    }
}
