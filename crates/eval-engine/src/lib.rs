//! Evaluation engine
//!
//! Dispatches evidence agents concurrently, consolidates their fragments into
//! a provenance-tracked [`CanonicalRecord`], and scores the record.
//!
//! # Example
//!
//! ```no_run
//! use eval_engine::{EvalConfig, Orchestrator};
//! use eval_core::QueryContext;
//!
//! # async fn run() -> eval_core::Result<()> {
//! let orchestrator = Orchestrator::builder()
//!     .config(EvalConfig::default())
//!     .build()?;
//!
//! let context = QueryContext::builder().company_name("Acme Robotics").build()?;
//! let result = orchestrator.evaluate(context).await?;
//! println!("{}", result.recommendation.summary);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod consolidator;
pub mod dispatcher;
pub mod orchestrator;
pub mod record;
pub mod result;
pub mod scoring;

pub use config::{EvalConfig, EvalConfigBuilder, ScoreWeights};
pub use consolidator::Consolidator;
pub use dispatcher::Dispatcher;
pub use orchestrator::{Orchestrator, OrchestratorBuilder};
pub use record::{
    CanonicalRecord, Contribution, Resolution, ResolvedField, SourceReport, SourceStatus,
};
pub use result::{EvaluationResult, EvidenceSummary};
pub use scoring::{
    Aggregator, Finding, Recommendation, ScoreComponent, ScoreKind, ScoreResult, Scorer,
    ScoringPipeline, Verdict,
};
