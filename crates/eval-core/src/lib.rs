//! Core abstractions for startup evaluation
//!
//! This crate defines the contract every evidence agent implements and the data
//! that flows out of agents: query contexts, canonical fields and values,
//! fragments, outcomes, and the error taxonomy shared by the workspace.

pub mod agent;
pub mod context;
pub mod error;
pub mod field;
pub mod fragment;
pub mod outcome;
pub mod source;

pub use agent::{Deadline, EvidenceAgent, remaining};
pub use context::{ContextInput, DocumentHandle, QueryContext, QueryContextBuilder};
pub use error::{Error, Result};
pub use field::{Field, FieldCategory, FieldValue, ValueKind};
pub use fragment::{FieldEntry, Fragment};
pub use outcome::{AgentOutcome, AgentRun, FailureReason};
pub use source::{SourceKind, SourcePriority};
