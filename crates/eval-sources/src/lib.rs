//! Evidence sources for startup evaluation
//!
//! Provider clients (SEC EDGAR, NewsAPI, Bright Data, an OpenAI-compatible
//! research model) and the five agents built on them. Clients share a
//! response cache and retry transient failures within the caller's deadline.
//!
//! ```no_run
//! use eval_sources::{SourcesConfig, default_agents};
//!
//! # fn build() -> eval_sources::Result<()> {
//! let config = SourcesConfig::default().with_env_keys()?;
//! let agents = default_agents(&config)?;
//! assert_eq!(agents.len(), 5);
//! # Ok(())
//! # }
//! ```

pub mod agents;
pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod parse;
pub mod retry;

pub use agents::{
    DocumentAgent, DocumentExtractor, FinancialAgent, NewsAgent, NewsDigest, ProfileAgent,
    WebSearchAgent, default_agents,
};
pub use cache::{CacheKey, ResponseCache};
pub use config::{SourcesConfig, SourcesConfigBuilder};
pub use error::{Result, SourceError};
pub use retry::RetryPolicy;
