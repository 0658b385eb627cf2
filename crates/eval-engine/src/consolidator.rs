//! Merging agent fragments into one canonical record
//!
//! Consolidation is append-then-resolve: every contribution from successful
//! and partial fragments is collected per field first, put into canonical
//! order, and only then resolved. The result therefore depends on the set of
//! inputs and never on the order agents finished in.

use chrono::{DateTime, Utc};
use eval_core::{AgentRun, Field, FieldValue, SourceKind, SourcePriority};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use tracing::{debug, info};

use crate::config::EvalConfig;
use crate::record::{
    CanonicalRecord, Contribution, Resolution, ResolvedField, SourceReport, SourceStatus,
};

/// Merges fragments under explicit conflict-resolution rules
#[derive(Debug, Clone)]
pub struct Consolidator {
    priority: SourcePriority,
    tolerance: f64,
}

struct Candidate {
    agent: String,
    source: SourceKind,
    value: FieldValue,
    confidence: f64,
    observed_at: DateTime<Utc>,
}

impl Default for Consolidator {
    fn default() -> Self {
        Self::new(SourcePriority::default(), 0.01)
    }
}

impl Consolidator {
    pub fn new(priority: SourcePriority, tolerance: f64) -> Self {
        Self {
            priority,
            tolerance,
        }
    }

    pub fn from_config(config: &EvalConfig) -> Self {
        Self::new(config.source_priority.clone(), config.numeric_tolerance)
    }

    /// Merge every run's fragment into a canonical record
    pub fn merge(&self, runs: Vec<AgentRun>) -> CanonicalRecord {
        let mut pool: BTreeMap<Field, Vec<Candidate>> = BTreeMap::new();
        let mut sources = Vec::with_capacity(runs.len());

        for run in runs {
            let status = match (&run.outcome.failure(), run.outcome.fragment()) {
                (None, _) => SourceStatus::Succeeded,
                (Some(_), Some(_)) => SourceStatus::Partial,
                (Some(_), None) => SourceStatus::Failed,
            };
            let failure = run.outcome.failure().map(ToString::to_string);

            let mut fields = Vec::new();
            if let Some(fragment) = run.outcome.into_fragment() {
                for (field, entry) in fragment.entries() {
                    fields.push(field);
                    pool.entry(field).or_default().push(Candidate {
                        agent: fragment.agent().to_string(),
                        source: fragment.source(),
                        value: entry.value.clone(),
                        confidence: entry.confidence,
                        observed_at: fragment.produced_at(),
                    });
                }
            }

            sources.push(SourceReport {
                agent: run.agent,
                source: run.source,
                status,
                failure,
                fields,
                elapsed_ms: u64::try_from(run.elapsed.as_millis()).unwrap_or(u64::MAX),
            });
        }

        let fields: BTreeMap<Field, ResolvedField> = pool
            .into_iter()
            .filter_map(|(field, candidates)| {
                self.resolve(field, candidates)
                    .map(|resolved| (field, resolved))
            })
            .collect();

        let record = CanonicalRecord::from_parts(fields, sources);
        info!(
            fields = record.len(),
            conflicts = record.conflicts().count(),
            "Consolidated fragments"
        );
        record
    }

    fn resolve(&self, field: Field, mut candidates: Vec<Candidate>) -> Option<ResolvedField> {
        candidates.sort_by(|a, b| self.canonical_order(a, b));

        let winner = candidates.first()?;
        let selected_value = winner.value.clone();
        let selected_confidence = winner.confidence;

        let agreement: Vec<bool> = candidates
            .iter()
            .map(|c| c.value.agrees_with(&selected_value, self.tolerance))
            .collect();

        let resolution = if candidates.len() == 1 {
            Resolution::Single
        } else if agreement.iter().all(|agrees| *agrees) {
            Resolution::Corroborated
        } else {
            Resolution::Conflict
        };

        if resolution == Resolution::Conflict {
            debug!(
                field = %field,
                winner = %winner.agent,
                contributions = candidates.len(),
                "Resolved conflicting contributions"
            );
        }

        let provenance = candidates
            .into_iter()
            .zip(agreement)
            .enumerate()
            .map(|(index, (candidate, agrees))| Contribution {
                agent: candidate.agent,
                source: candidate.source,
                value: candidate.value,
                confidence: candidate.confidence,
                observed_at: candidate.observed_at,
                selected: index == 0,
                agrees_with_selected: agrees,
            })
            .collect();

        Some(ResolvedField::new(
            selected_value,
            selected_confidence,
            resolution,
            provenance,
        ))
    }

    /// Strongest contribution first
    ///
    /// Confidence descending, then source priority, then agent name, then the
    /// value's canonical text, then observation time.
    fn canonical_order(&self, a: &Candidate, b: &Candidate) -> Ordering {
        b.confidence
            .total_cmp(&a.confidence)
            .then_with(|| self.priority.rank(a.source).cmp(&self.priority.rank(b.source)))
            .then_with(|| a.agent.cmp(&b.agent))
            .then_with(|| a.value.canonical().cmp(&b.value.canonical()))
            .then_with(|| a.observed_at.cmp(&b.observed_at))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use eval_core::{AgentOutcome, FailureReason, Fragment};
    use std::time::Duration;

    fn ts() -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000, 0).unwrap()
    }

    fn run(fragment: Fragment) -> AgentRun {
        AgentRun::new(
            fragment.agent().to_string(),
            fragment.source(),
            Duration::from_millis(10),
            AgentOutcome::success(fragment.with_timestamp(ts())),
        )
    }

    #[test]
    fn test_single_contribution() {
        let record = Consolidator::default().merge(vec![run(
            Fragment::new("doc", SourceKind::Document).with(Field::CompanyName, "Acme"),
        )]);

        let resolved = record.get(Field::CompanyName).unwrap();
        assert_eq!(resolved.resolution(), Resolution::Single);
        assert_eq!(resolved.provenance().len(), 1);
        assert!(resolved.provenance()[0].selected);
        assert!(record.validate().is_ok());
    }

    #[test]
    fn test_higher_confidence_wins_conflict() {
        let record = Consolidator::default().merge(vec![
            run(Fragment::new("web", SourceKind::WebSearch).with_confidence(
                Field::AnnualRecurringRevenue,
                2_000_000.0,
                0.6,
            )),
            run(Fragment::new("doc", SourceKind::Document).with_confidence(
                Field::AnnualRecurringRevenue,
                1_200_000.0,
                0.9,
            )),
        ]);

        let resolved = record.get(Field::AnnualRecurringRevenue).unwrap();
        assert_eq!(resolved.value(), &FieldValue::Number(1_200_000.0));
        assert_eq!(resolved.resolution(), Resolution::Conflict);
        assert!((resolved.confidence() - 0.9).abs() < f64::EPSILON);

        let loser = resolved
            .provenance()
            .iter()
            .find(|c| c.agent == "web")
            .unwrap();
        assert!(!loser.selected);
        assert!(!loser.agrees_with_selected);
        assert_eq!(loser.value, FieldValue::Number(2_000_000.0));
    }

    #[test]
    fn test_priority_breaks_confidence_ties() {
        let record = Consolidator::default().merge(vec![
            run(Fragment::new("news", SourceKind::News).with_confidence(
                Field::Headquarters,
                "Berlin",
                0.7,
            )),
            run(Fragment::new("doc", SourceKind::Document).with_confidence(
                Field::Headquarters,
                "Munich",
                0.7,
            )),
        ]);
        assert_eq!(record.text(Field::Headquarters), Some("Munich"));

        let news_first = SourcePriority::new(vec![
            SourceKind::News,
            SourceKind::Document,
            SourceKind::Financial,
            SourceKind::Profile,
            SourceKind::WebSearch,
        ])
        .unwrap();
        let record = Consolidator::new(news_first, 0.01).merge(vec![
            run(Fragment::new("news", SourceKind::News).with_confidence(
                Field::Headquarters,
                "Berlin",
                0.7,
            )),
            run(Fragment::new("doc", SourceKind::Document).with_confidence(
                Field::Headquarters,
                "Munich",
                0.7,
            )),
        ]);
        assert_eq!(record.text(Field::Headquarters), Some("Berlin"));
    }

    #[test]
    fn test_agreeing_values_are_corroborated() {
        let record = Consolidator::default().merge(vec![
            run(Fragment::new("doc", SourceKind::Document).with(Field::Revenue, 1_000_000.0)),
            run(Fragment::new("fin", SourceKind::Financial).with(Field::Revenue, 1_004_000.0)),
            run(Fragment::new("web", SourceKind::WebSearch).with(Field::Industry, "Fintech")),
        ]);

        let resolved = record.get(Field::Revenue).unwrap();
        assert_eq!(resolved.resolution(), Resolution::Corroborated);
        assert_eq!(resolved.value(), &FieldValue::Number(1_000_000.0));
        assert!(resolved.provenance().iter().all(|c| c.agrees_with_selected));
    }

    #[test]
    fn test_merge_is_order_independent() {
        let fragments = || {
            vec![
                run(Fragment::new("doc", SourceKind::Document)
                    .with(Field::CompanyName, "Acme")
                    .with_confidence(Field::Revenue, 500.0, 0.7)),
                run(Fragment::new("news", SourceKind::News)
                    .with_confidence(Field::Revenue, 900.0, 0.7)
                    .with(Field::NewsSentiment, 0.2)),
                run(Fragment::new("web", SourceKind::WebSearch)
                    .with_confidence(Field::Revenue, 900.0, 0.7)
                    .with(Field::CompanyName, "ACME")),
            ]
        };

        let forward = Consolidator::default().merge(fragments());
        let mut reversed_runs = fragments();
        reversed_runs.reverse();
        let reversed = Consolidator::default().merge(reversed_runs);
        let mut rotated_runs = fragments();
        rotated_runs.rotate_left(1);
        let rotated = Consolidator::default().merge(rotated_runs);

        let bytes = serde_json::to_vec(&forward).unwrap();
        assert_eq!(bytes, serde_json::to_vec(&reversed).unwrap());
        assert_eq!(bytes, serde_json::to_vec(&rotated).unwrap());
        assert_eq!(forward.number(Field::Revenue), Some(500.0));
    }

    #[test]
    fn test_no_fabrication() {
        let record = Consolidator::default().merge(vec![
            run(Fragment::new("doc", SourceKind::Document).with(Field::CompanyName, "Acme")),
            AgentRun::new(
                "news",
                SourceKind::News,
                Duration::from_millis(5),
                AgentOutcome::failed(FailureReason::Empty),
            ),
        ]);

        assert_eq!(record.len(), 1);
        for (_, resolved) in record.fields() {
            assert!(!resolved.provenance().is_empty());
        }
        assert_eq!(record.sources().len(), 2);
        assert_eq!(record.sources()[1].status, SourceStatus::Failed);
    }

    #[test]
    fn test_partial_fragments_are_merged() {
        let partial = Fragment::new("doc", SourceKind::Document)
            .with(Field::CompanyName, "Acme")
            .with_timestamp(ts());
        let record = Consolidator::default().merge(vec![AgentRun::new(
            "doc",
            SourceKind::Document,
            Duration::from_millis(50),
            AgentOutcome::failed_with_partial(FailureReason::Timeout, partial),
        )]);

        assert_eq!(record.text(Field::CompanyName), Some("Acme"));
        let report = &record.sources()[0];
        assert_eq!(report.status, SourceStatus::Partial);
        assert_eq!(report.failure.as_deref(), Some("timeout"));
        assert_eq!(report.fields, vec![Field::CompanyName]);
    }

    #[test]
    fn test_empty_input_yields_empty_record() {
        let record = Consolidator::default().merge(Vec::new());
        assert!(record.is_empty());
        assert!(record.validate().is_ok());
    }
}
