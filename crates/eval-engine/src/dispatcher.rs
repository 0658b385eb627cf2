//! Concurrent agent dispatch
//!
//! Every agent runs in its own tokio task against a shared context. A task
//! is bounded by its own deadline, so a slow or failing agent never affects
//! the others. The dispatcher is the only join point.

use eval_core::{
    AgentOutcome, AgentRun, Deadline, EvidenceAgent, FailureReason, QueryContext, SourceKind,
};
use std::any::Any;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::{JoinError, JoinHandle};
use tokio::time::{Instant, timeout_at};
use tracing::{debug, info, warn};

/// Runs agents concurrently and collects one terminal outcome per agent
#[derive(Debug, Clone)]
pub struct Dispatcher {
    per_agent_timeout: Duration,
}

struct PendingRun {
    agent: String,
    source: SourceKind,
    started: Instant,
    handle: JoinHandle<(AgentOutcome, Duration)>,
}

impl Dispatcher {
    pub fn new(per_agent_timeout: Duration) -> Self {
        Self { per_agent_timeout }
    }

    pub fn per_agent_timeout(&self) -> Duration {
        self.per_agent_timeout
    }

    /// Run every agent with only the per-agent timeout in force
    pub async fn dispatch(
        &self,
        context: &Arc<QueryContext>,
        agents: &[Arc<dyn EvidenceAgent>],
    ) -> Vec<AgentRun> {
        self.dispatch_until(context, agents, None).await
    }

    /// Run every agent, aborting whatever is still running at `request_deadline`
    ///
    /// Each agent gets `min(now + per_agent_timeout, request_deadline)`. The
    /// returned runs contain exactly one entry per agent; order is not
    /// significant.
    pub async fn dispatch_until(
        &self,
        context: &Arc<QueryContext>,
        agents: &[Arc<dyn EvidenceAgent>],
        request_deadline: Option<Deadline>,
    ) -> Vec<AgentRun> {
        info!(agents = agents.len(), "Dispatching agents");

        let pending: Vec<PendingRun> = agents
            .iter()
            .map(|agent| self.spawn(context, agent, request_deadline))
            .collect();

        let mut runs = Vec::with_capacity(pending.len());
        for run in pending {
            runs.push(Self::join(run, request_deadline).await);
        }

        let succeeded = runs.iter().filter(|r| r.outcome.is_success()).count();
        info!(
            succeeded,
            failed = runs.len() - succeeded,
            "All agents reached a terminal state"
        );
        runs
    }

    fn spawn(
        &self,
        context: &Arc<QueryContext>,
        agent: &Arc<dyn EvidenceAgent>,
        request_deadline: Option<Deadline>,
    ) -> PendingRun {
        let started = Instant::now();
        let mut deadline = started + self.per_agent_timeout;
        if let Some(request_deadline) = request_deadline {
            deadline = deadline.min(request_deadline);
        }

        let agent_name = agent.name().to_string();
        let source = agent.source();
        let agent = Arc::clone(agent);
        let context = Arc::clone(context);

        debug!(agent = %agent_name, source = %source, "Spawning agent");

        let handle = tokio::spawn(async move {
            let started = Instant::now();
            let outcome = match timeout_at(deadline, agent.run(&context, deadline)).await {
                Ok(outcome) => outcome,
                Err(_) => AgentOutcome::failed(FailureReason::Timeout),
            };
            (outcome, started.elapsed())
        });

        PendingRun {
            agent: agent_name,
            source,
            started,
            handle,
        }
    }

    async fn join(run: PendingRun, request_deadline: Option<Deadline>) -> AgentRun {
        let PendingRun {
            agent,
            source,
            started,
            mut handle,
        } = run;

        let joined = match request_deadline {
            Some(deadline) => match timeout_at(deadline, &mut handle).await {
                Ok(joined) => Some(joined),
                Err(_) => {
                    handle.abort();
                    None
                }
            },
            None => Some(handle.await),
        };

        let (outcome, elapsed) = match joined {
            Some(Ok(finished)) => finished,
            Some(Err(err)) => (
                AgentOutcome::failed(join_failure(err)),
                started.elapsed(),
            ),
            None => (
                AgentOutcome::failed(FailureReason::Timeout),
                started.elapsed(),
            ),
        };

        match outcome.failure() {
            None => info!(
                agent = %agent,
                elapsed_ms = elapsed.as_millis() as u64,
                fields = outcome.fragment().map_or(0, eval_core::Fragment::len),
                "Agent succeeded"
            ),
            Some(reason) => warn!(
                agent = %agent,
                elapsed_ms = elapsed.as_millis() as u64,
                reason = %reason,
                partial_fields = outcome.fragment().map_or(0, eval_core::Fragment::len),
                "Agent failed"
            ),
        }

        AgentRun::new(agent, source, elapsed, outcome)
    }
}

fn join_failure(err: JoinError) -> FailureReason {
    if err.is_panic() {
        FailureReason::Panicked(panic_message(&*err.into_panic()))
    } else {
        FailureReason::Cancelled
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "agent panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use eval_core::{Field, Fragment};

    struct StubAgent {
        name: &'static str,
        source: SourceKind,
        delay: Duration,
        behaviour: Behaviour,
    }

    enum Behaviour {
        Succeed,
        Fail,
        Panic,
    }

    #[async_trait]
    impl EvidenceAgent for StubAgent {
        async fn run(&self, _context: &QueryContext, _deadline: Deadline) -> AgentOutcome {
            tokio::time::sleep(self.delay).await;
            match self.behaviour {
                Behaviour::Succeed => AgentOutcome::success(
                    Fragment::new(self.name, self.source).with(Field::CompanyName, "Acme"),
                ),
                Behaviour::Fail => {
                    AgentOutcome::failed(FailureReason::Provider("HTTP 500".to_string()))
                }
                Behaviour::Panic => panic!("stub agent exploded"),
            }
        }

        fn name(&self) -> &str {
            self.name
        }

        fn source(&self) -> SourceKind {
            self.source
        }
    }

    fn agent(
        name: &'static str,
        source: SourceKind,
        delay_ms: u64,
        behaviour: Behaviour,
    ) -> Arc<dyn EvidenceAgent> {
        Arc::new(StubAgent {
            name,
            source,
            delay: Duration::from_millis(delay_ms),
            behaviour,
        })
    }

    fn context() -> Arc<QueryContext> {
        Arc::new(QueryContext::builder().company_name("Acme").build().unwrap())
    }

    fn find<'a>(runs: &'a [AgentRun], name: &str) -> &'a AgentRun {
        runs.iter().find(|r| r.agent == name).unwrap()
    }

    #[tokio::test]
    async fn test_failures_are_isolated() {
        let agents = vec![
            agent("doc", SourceKind::Document, 5, Behaviour::Succeed),
            agent("news", SourceKind::News, 0, Behaviour::Panic),
            agent("fin", SourceKind::Financial, 0, Behaviour::Fail),
            agent("web", SourceKind::WebSearch, 10, Behaviour::Succeed),
        ];

        let runs = Dispatcher::new(Duration::from_secs(2))
            .dispatch(&context(), &agents)
            .await;

        assert_eq!(runs.len(), 4);
        assert!(find(&runs, "doc").outcome.is_success());
        assert!(find(&runs, "web").outcome.is_success());
        assert!(matches!(
            find(&runs, "news").outcome.failure(),
            Some(FailureReason::Panicked(msg)) if msg.contains("exploded")
        ));
        assert!(matches!(
            find(&runs, "fin").outcome.failure(),
            Some(FailureReason::Provider(_))
        ));
    }

    #[tokio::test]
    async fn test_healthy_agent_timing_is_unaffected() {
        let agents = vec![
            agent("doc", SourceKind::Document, 5, Behaviour::Succeed),
            agent("slow", SourceKind::Profile, 5_000, Behaviour::Succeed),
            agent("news", SourceKind::News, 0, Behaviour::Panic),
        ];

        let runs = Dispatcher::new(Duration::from_millis(300))
            .dispatch(&context(), &agents)
            .await;

        let doc = find(&runs, "doc");
        assert!(doc.outcome.is_success());
        assert!(doc.elapsed < Duration::from_millis(200));
        assert!(find(&runs, "slow").outcome.failure().unwrap().is_timeout());
        assert!(find(&runs, "slow").elapsed >= Duration::from_millis(290));
    }

    #[tokio::test]
    async fn test_per_agent_timeout_is_contained() {
        let agents = vec![
            agent("slow", SourceKind::Profile, 5_000, Behaviour::Succeed),
            agent("fast", SourceKind::Document, 0, Behaviour::Succeed),
        ];

        let started = Instant::now();
        let runs = Dispatcher::new(Duration::from_millis(100))
            .dispatch(&context(), &agents)
            .await;

        assert!(started.elapsed() < Duration::from_secs(2));
        assert!(find(&runs, "fast").outcome.is_success());
        let slow = find(&runs, "slow");
        assert!(slow.outcome.failure().unwrap().is_timeout());
        assert!(slow.elapsed >= Duration::from_millis(90));
    }

    #[tokio::test]
    async fn test_request_deadline_aborts_everything_still_running() {
        let agents = vec![
            agent("slow-a", SourceKind::Profile, 5_000, Behaviour::Succeed),
            agent("slow-b", SourceKind::News, 5_000, Behaviour::Succeed),
            agent("fast", SourceKind::Document, 0, Behaviour::Succeed),
        ];

        let started = Instant::now();
        let deadline = started + Duration::from_millis(150);
        let runs = Dispatcher::new(Duration::from_secs(10))
            .dispatch_until(&context(), &agents, Some(deadline))
            .await;

        assert!(started.elapsed() < Duration::from_secs(2));
        assert_eq!(runs.len(), 3);
        assert!(find(&runs, "fast").outcome.is_success());
        assert!(find(&runs, "slow-a").outcome.failure().unwrap().is_timeout());
        assert!(find(&runs, "slow-b").outcome.failure().unwrap().is_timeout());
    }

    #[tokio::test]
    async fn test_empty_agent_set() {
        let runs = Dispatcher::new(Duration::from_secs(1))
            .dispatch(&context(), &[])
            .await;
        assert!(runs.is_empty());
    }
}
