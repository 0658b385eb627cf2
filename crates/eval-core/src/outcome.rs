//! Terminal outcomes of agent runs

use serde::Serialize;
use std::fmt;
use std::time::Duration;

use crate::fragment::Fragment;
use crate::source::SourceKind;

/// Why an agent run did not succeed
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", content = "detail", rename_all = "snake_case")]
pub enum FailureReason {
    /// The agent ran past its deadline
    Timeout,
    /// The run was aborted before it could finish
    Cancelled,
    /// The context lacks an input the agent needs
    MissingInput(String),
    /// Transport-level failure talking to a provider
    Network(String),
    /// The provider answered with an error
    Provider(String),
    /// The provider's answer could not be understood
    Parse(String),
    /// The agent finished without finding anything
    Empty,
    /// The agent's task panicked
    Panicked(String),
}

impl FailureReason {
    pub fn is_timeout(&self) -> bool {
        matches!(self, FailureReason::Timeout)
    }

    pub fn is_missing_input(&self) -> bool {
        matches!(self, FailureReason::MissingInput(_))
    }

    /// Short machine-readable label
    pub fn label(&self) -> &'static str {
        match self {
            FailureReason::Timeout => "timeout",
            FailureReason::Cancelled => "cancelled",
            FailureReason::MissingInput(_) => "missing_input",
            FailureReason::Network(_) => "network",
            FailureReason::Provider(_) => "provider",
            FailureReason::Parse(_) => "parse",
            FailureReason::Empty => "empty",
            FailureReason::Panicked(_) => "panicked",
        }
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureReason::Timeout | FailureReason::Cancelled | FailureReason::Empty => {
                f.write_str(self.label())
            }
            FailureReason::MissingInput(detail)
            | FailureReason::Network(detail)
            | FailureReason::Provider(detail)
            | FailureReason::Parse(detail)
            | FailureReason::Panicked(detail) => write!(f, "{}: {detail}", self.label()),
        }
    }
}

/// Terminal result of one agent run
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AgentOutcome {
    Success(Fragment),
    Failed {
        reason: FailureReason,
        /// Whatever the agent had gathered before it failed
        partial: Option<Fragment>,
    },
}

impl AgentOutcome {
    pub fn success(fragment: Fragment) -> Self {
        AgentOutcome::Success(fragment)
    }

    pub fn failed(reason: FailureReason) -> Self {
        AgentOutcome::Failed {
            reason,
            partial: None,
        }
    }

    /// Failure that still carries evidence; an empty partial is discarded
    pub fn failed_with_partial(reason: FailureReason, partial: Fragment) -> Self {
        AgentOutcome::Failed {
            reason,
            partial: (!partial.is_empty()).then_some(partial),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, AgentOutcome::Success(_))
    }

    /// The fragment this outcome contributes, if any
    pub fn fragment(&self) -> Option<&Fragment> {
        match self {
            AgentOutcome::Success(fragment) => Some(fragment),
            AgentOutcome::Failed { partial, .. } => partial.as_ref(),
        }
    }

    pub fn into_fragment(self) -> Option<Fragment> {
        match self {
            AgentOutcome::Success(fragment) => Some(fragment),
            AgentOutcome::Failed { partial, .. } => partial,
        }
    }

    pub fn failure(&self) -> Option<&FailureReason> {
        match self {
            AgentOutcome::Success(_) => None,
            AgentOutcome::Failed { reason, .. } => Some(reason),
        }
    }
}

/// An outcome tagged by the dispatcher with who produced it and how long it took
#[derive(Debug, Clone, Serialize)]
pub struct AgentRun {
    pub agent: String,
    pub source: SourceKind,
    pub elapsed: Duration,
    pub outcome: AgentOutcome,
}

impl AgentRun {
    pub fn new(
        agent: impl Into<String>,
        source: SourceKind,
        elapsed: Duration,
        outcome: AgentOutcome,
    ) -> Self {
        Self {
            agent: agent.into(),
            source,
            elapsed,
            outcome,
        }
    }
}
