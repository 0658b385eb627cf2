//! Evidence agents backed by documents and provider APIs

pub mod document;
pub mod financial;
pub mod news;
pub mod profile;
pub mod web_search;

pub use document::{DocumentAgent, DocumentExtractor};
pub use financial::FinancialAgent;
pub use news::{NewsAgent, NewsDigest};
pub use profile::ProfileAgent;
pub use web_search::WebSearchAgent;

use eval_core::{AgentOutcome, EvidenceAgent, FailureReason, Fragment};
use std::sync::Arc;
use tracing::debug;

use crate::api::{BrightDataClient, NewsApiClient, SecEdgarClient, WebSearchClient};
use crate::cache::ResponseCache;
use crate::config::SourcesConfig;
use crate::error::{Result, SourceError};

/// Build the five standard agents, sharing one response cache
pub fn default_agents(config: &SourcesConfig) -> Result<Vec<Arc<dyn EvidenceAgent>>> {
    config.validate()?;
    let cache = ResponseCache::new(config.cache_ttl);

    Ok(vec![
        Arc::new(DocumentAgent::new()),
        Arc::new(FinancialAgent::new(SecEdgarClient::new(config, cache.clone())?)),
        Arc::new(ProfileAgent::new(BrightDataClient::new(config, cache.clone())?)),
        Arc::new(NewsAgent::new(NewsApiClient::new(config, cache.clone())?)),
        Arc::new(WebSearchAgent::new(WebSearchClient::new(config, cache)?)),
    ])
}

/// Turn a collection result into the run's outcome
///
/// An empty fragment is a failure: the agent ran but learned nothing.
pub(crate) fn finish(agent: &str, result: Result<Fragment>) -> AgentOutcome {
    match result {
        Ok(fragment) if fragment.is_empty() => AgentOutcome::failed(FailureReason::Empty),
        Ok(fragment) => {
            debug!(agent, fields = fragment.len(), "Collected evidence");
            AgentOutcome::success(fragment)
        }
        Err(error) => AgentOutcome::failed(FailureReason::from(error)),
    }
}

pub(crate) fn require<'a>(value: Option<&'a str>, what: &str) -> Result<&'a str> {
    value.ok_or_else(|| SourceError::MissingInput(format!("no {what} supplied")))
}
