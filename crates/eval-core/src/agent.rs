//! Core EvidenceAgent trait definition

use async_trait::async_trait;
use std::time::Duration;

use crate::context::{ContextInput, QueryContext};
use crate::outcome::AgentOutcome;
use crate::source::SourceKind;

/// Point in time an agent must finish by
pub type Deadline = tokio::time::Instant;

/// Core trait that all evidence agents implement
///
/// An agent never returns an error past its boundary: every failure becomes
/// [`AgentOutcome::Failed`]. It must not block past `deadline` and must be safe
/// to run concurrently with other agents against the same context.
#[async_trait]
pub trait EvidenceAgent: Send + Sync {
    /// Gather evidence for the context
    async fn run(&self, context: &QueryContext, deadline: Deadline) -> AgentOutcome;

    /// Get the agent's name
    fn name(&self) -> &str;

    /// Kind of source the agent draws from
    fn source(&self) -> SourceKind;

    /// Context inputs the agent cannot run without
    ///
    /// Follow-up discovery re-runs an agent that failed with missing input
    /// only once all of these are present and at least one was newly
    /// derived. An empty list means the agent is re-run whenever anything
    /// new is learned.
    fn requires(&self) -> &[ContextInput] {
        &[]
    }
}

/// Time left before `deadline`, zero once it has passed
pub fn remaining(deadline: Deadline) -> Duration {
    deadline.saturating_duration_since(tokio::time::Instant::now())
}
