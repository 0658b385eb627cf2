//! End-to-end evaluation of one request
//!
//! The orchestrator wires dispatch, consolidation and scoring together and
//! owns the request deadline. The dispatch stage gets a configurable share of
//! the budget; consolidation and scoring use what is left.

use chrono::Utc;
use eval_core::{AgentRun, ContextInput, Error, EvidenceAgent, Field, QueryContext, Result};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::time::Instant;
use tracing::{Instrument, debug, info, info_span, warn};
use url::Url;

use crate::config::EvalConfig;
use crate::consolidator::Consolidator;
use crate::dispatcher::Dispatcher;
use crate::record::CanonicalRecord;
use crate::result::{EvaluationResult, EvidenceSummary};
use crate::scoring::ScoringPipeline;

/// Runs evaluation requests against a fixed set of agents
pub struct Orchestrator {
    agents: Vec<Arc<dyn EvidenceAgent>>,
    config: Arc<EvalConfig>,
    dispatcher: Dispatcher,
    consolidator: Consolidator,
    pipeline: ScoringPipeline,
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&str> = self.agents.iter().map(|a| a.name()).collect();
        f.debug_struct("Orchestrator")
            .field("agents", &names)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Orchestrator {
    pub fn builder() -> OrchestratorBuilder {
        OrchestratorBuilder::default()
    }

    pub fn config(&self) -> &EvalConfig {
        &self.config
    }

    pub fn agents(&self) -> impl Iterator<Item = &Arc<dyn EvidenceAgent>> {
        self.agents.iter()
    }

    /// Evaluate one startup
    ///
    /// Agent failures and timeouts never fail the request; a total evidence
    /// blackout yields a valid result with verdict `insufficient_evidence`.
    /// Only a structural error in the record is an error. Consolidation and
    /// scoring always run on the terminal outcome set, even past the request
    /// deadline.
    pub async fn evaluate(&self, context: QueryContext) -> Result<EvaluationResult> {
        let span = info_span!(
            "evaluate",
            request_id = %context.request_id(),
            company = context.company_name().unwrap_or("<unknown>"),
        );
        self.evaluate_inner(context).instrument(span).await
    }

    async fn evaluate_inner(&self, context: QueryContext) -> Result<EvaluationResult> {
        let started_at = Utc::now();
        let started = Instant::now();
        let request_deadline = started + self.config.request_deadline();
        let dispatch_deadline = started + self.config.dispatch_budget();

        let context = Arc::new(context);
        info!(agents = self.agents.len(), "Starting evaluation");

        let mut runs = self
            .dispatcher
            .dispatch_until(&context, &self.agents, Some(dispatch_deadline))
            .await;
        let mut record = self.consolidator.merge(runs.clone());

        let mut follow_up_agents = Vec::new();
        if self.config.follow_up_discovery {
            if let Some(rerun) = self
                .follow_up(&context, &record, &runs, dispatch_deadline)
                .await
            {
                follow_up_agents = rerun.iter().map(|run| run.agent.clone()).collect();
                replace_runs(&mut runs, rerun);
                record = self.consolidator.merge(runs);
            }
        }

        if Instant::now() >= request_deadline {
            warn!(
                overrun_ms = request_deadline.elapsed().as_millis() as u64,
                "Request deadline passed during dispatch, scoring the outcomes collected"
            );
        }

        let record = Arc::new(record);
        let scores = self.pipeline.run(Arc::clone(&record)).await?;
        let recommendation = self.pipeline.aggregator().aggregate(&scores);

        let record = Arc::try_unwrap(record).unwrap_or_else(|shared| (*shared).clone());
        let evidence = EvidenceSummary::from_record(&record, follow_up_agents);
        if evidence.is_blackout() {
            warn!("No agent produced any evidence");
        }

        let company_name = record
            .text(Field::CompanyName)
            .or_else(|| context.company_name())
            .map(ToString::to_string);

        let elapsed = started.elapsed();
        info!(
            fields = record.len(),
            verdict = %recommendation.verdict,
            aggregate = recommendation.aggregate_score,
            confidence = recommendation.confidence,
            elapsed_ms = elapsed.as_millis() as u64,
            "Evaluation finished"
        );

        Ok(EvaluationResult {
            request_id: context.request_id(),
            company_name,
            record,
            scores,
            recommendation,
            evidence,
            started_at,
            finished_at: Utc::now(),
            elapsed_ms: u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
        })
    }

    /// Re-run agents that lacked input, if the record has since supplied it
    ///
    /// Only agents whose required inputs are all present in the derived
    /// context, and at least one of them newly filled, are dispatched again.
    async fn follow_up(
        &self,
        context: &Arc<QueryContext>,
        record: &CanonicalRecord,
        runs: &[AgentRun],
        dispatch_deadline: Instant,
    ) -> Option<Vec<AgentRun>> {
        let waiting: HashSet<&str> = runs
            .iter()
            .filter(|run| run.outcome.failure().is_some_and(|r| r.is_missing_input()))
            .map(|run| run.agent.as_str())
            .collect();
        if waiting.is_empty() || Instant::now() >= dispatch_deadline {
            return None;
        }

        let profile_url = record
            .text(Field::FounderProfileUrl)
            .and_then(|raw| Url::parse(raw).ok());
        let (derived, filled) =
            context.derive_with(record.text(Field::CompanyName), profile_url.as_ref())?;

        let agents: Vec<Arc<dyn EvidenceAgent>> = self
            .agents
            .iter()
            .filter(|agent| waiting.contains(agent.name()))
            .filter(|agent| unblocked(agent.requires(), &derived, &filled))
            .cloned()
            .collect();
        if agents.is_empty() {
            debug!(filled = ?filled, "Derived inputs unblock no waiting agent");
            return None;
        }

        info!(
            agents = agents.len(),
            filled = ?filled,
            company = derived.company_name().unwrap_or("<unknown>"),
            profile_url = derived.profile_url().map_or("<none>", Url::as_str),
            "Follow-up discovery"
        );

        let derived = Arc::new(derived);
        Some(
            self.dispatcher
                .dispatch_until(&derived, &agents, Some(dispatch_deadline))
                .await,
        )
    }
}

/// Whether a derived context gives an agent something new to work with
fn unblocked(requires: &[ContextInput], derived: &QueryContext, filled: &[ContextInput]) -> bool {
    if requires.is_empty() {
        return true;
    }
    requires.iter().all(|input| derived.has(*input))
        && requires.iter().any(|input| filled.contains(input))
}

fn replace_runs(runs: &mut Vec<AgentRun>, rerun: Vec<AgentRun>) {
    for run in rerun {
        match runs.iter_mut().find(|existing| existing.agent == run.agent) {
            Some(existing) => *existing = run,
            None => runs.push(run),
        }
    }
}

/// Builder for [`Orchestrator`]
#[derive(Default)]
pub struct OrchestratorBuilder {
    agents: Vec<Arc<dyn EvidenceAgent>>,
    config: Option<EvalConfig>,
}

impl OrchestratorBuilder {
    /// Register an agent
    pub fn agent(mut self, agent: impl EvidenceAgent + 'static) -> Self {
        self.agents.push(Arc::new(agent));
        self
    }

    /// Register an already shared agent
    pub fn shared_agent(mut self, agent: Arc<dyn EvidenceAgent>) -> Self {
        self.agents.push(agent);
        self
    }

    pub fn agents(mut self, agents: impl IntoIterator<Item = Arc<dyn EvidenceAgent>>) -> Self {
        self.agents.extend(agents);
        self
    }

    pub fn config(mut self, config: EvalConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Build the orchestrator
    ///
    /// Fails on invalid configuration or when two agents share a name.
    pub fn build(self) -> Result<Orchestrator> {
        let config = self.config.unwrap_or_default();
        config.validate()?;

        let mut names = HashSet::new();
        for agent in &self.agents {
            if !names.insert(agent.name().to_string()) {
                return Err(Error::Config(format!(
                    "agent name '{}' is registered twice",
                    agent.name()
                )));
            }
        }

        Ok(Orchestrator {
            dispatcher: Dispatcher::new(config.per_agent_timeout()),
            consolidator: Consolidator::from_config(&config),
            pipeline: ScoringPipeline::new(&config),
            agents: self.agents,
            config: Arc::new(config),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unblocked_needs_a_newly_filled_input() {
        let context = QueryContext::builder()
            .company_name("Acme")
            .document("deck.pdf")
            .build()
            .unwrap();
        let url = Url::parse("https://www.linkedin.com/in/jane-doe").unwrap();
        let (derived, filled) = context.derive_with(None, Some(&url)).unwrap();

        assert!(unblocked(&[ContextInput::ProfileUrl], &derived, &filled));
        assert!(!unblocked(&[ContextInput::Document], &derived, &filled));
        assert!(!unblocked(&[ContextInput::CompanyName], &derived, &filled));
        assert!(unblocked(&[], &derived, &filled));
    }

    #[test]
    fn test_unblocked_needs_every_required_input() {
        let context = QueryContext::builder().document("deck.md").build().unwrap();
        let (derived, filled) = context.derive_with(Some("Acme"), None).unwrap();

        let both = [ContextInput::CompanyName, ContextInput::ProfileUrl];
        assert!(!unblocked(&both, &derived, &filled));
        assert!(unblocked(&[ContextInput::CompanyName], &derived, &filled));
    }
}
