//! Provider API clients

pub mod bright_data;
pub mod news_api;
pub mod sec_edgar;
pub mod web_search;

pub use bright_data::{BrightDataClient, Experience, ProfileRecord, SnapshotState};
pub use news_api::{Article, ArticleSource, NewsApiClient};
pub use sec_edgar::{CompanyFinancials, SecEdgarClient};
pub use web_search::{CompanyFacts, WebSearchClient};

use reqwest::{Client, Response};
use std::time::Duration;

use crate::error::{Result, SourceError};

const USER_AGENT: &str = concat!("startup-eval/", env!("CARGO_PKG_VERSION"));

/// Longest a single HTTP exchange may take; the agent deadline still applies
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Upper bound on error bodies carried into failure reasons
const MAX_ERROR_BODY: usize = 300;

pub(crate) fn http_client(user_agent: Option<&str>) -> Result<Client> {
    Client::builder()
        .user_agent(user_agent.unwrap_or(USER_AGENT))
        .timeout(REQUEST_TIMEOUT)
        .build()
        .map_err(SourceError::from)
}

/// Decode a JSON body, turning non-success statuses into provider errors
pub(crate) async fn read_json(provider: &'static str, response: Response) -> Result<serde_json::Value> {
    let status = response.status();
    if !status.is_success() {
        let mut body = response.text().await.unwrap_or_default();
        if body.len() > MAX_ERROR_BODY {
            let cut = (0..=MAX_ERROR_BODY)
                .rev()
                .find(|i| body.is_char_boundary(*i))
                .unwrap_or(0);
            body.truncate(cut);
        }
        return Err(SourceError::Provider {
            provider,
            status: status.as_u16(),
            body,
        });
    }
    Ok(response.json().await?)
}
