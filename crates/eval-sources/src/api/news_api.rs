//! NewsAPI client
//!
//! Uses the `everything` endpoint, which searches article titles and bodies
//! across all indexed sources.

use eval_core::Deadline;
use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::num::NonZeroU32;
use std::sync::Arc;

use super::{http_client, read_json};
use crate::cache::{CacheKey, ResponseCache};
use crate::config::SourcesConfig;
use crate::error::{Result, SourceError};
use crate::retry::RetryPolicy;

type SharedRateLimiter = Arc<RateLimiter<NotKeyed, InMemoryState, DefaultClock>>;

const PROVIDER: &str = "newsapi";
const NEWSAPI_BASE_URL: &str = "https://newsapi.org/v2";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ArticleSource {
    pub id: Option<String>,
    pub name: Option<String>,
}

/// One search hit
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Article {
    pub source: ArticleSource,
    pub author: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub url: Option<String>,
    pub published_at: Option<String>,
    pub content: Option<String>,
}

impl Article {
    /// Title, description and content joined for text analysis
    pub fn text(&self) -> String {
        [&self.title, &self.description, &self.content]
            .into_iter()
            .flatten()
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EverythingResponse {
    status: String,
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    articles: Vec<Article>,
}

/// NewsAPI client
pub struct NewsApiClient {
    client: Client,
    api_key: Option<String>,
    page_size: u32,
    cache: ResponseCache,
    retry: RetryPolicy,
    rate_limiter: SharedRateLimiter,
}

impl NewsApiClient {
    pub fn new(config: &SourcesConfig, cache: ResponseCache) -> Result<Self> {
        // The developer plan allows 100 requests per day; stay well under a burst
        let quota = Quota::per_minute(NonZeroU32::new(30).unwrap_or(NonZeroU32::MIN));
        Ok(Self {
            client: http_client(None)?,
            api_key: config.news_api_key.clone(),
            page_size: config.news_page_size,
            cache,
            retry: RetryPolicy::from_config(config),
            rate_limiter: Arc::new(RateLimiter::direct(quota)),
        })
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    /// Most relevant English articles mentioning `query`
    pub async fn search(&self, query: &str, deadline: Deadline) -> Result<Vec<Article>> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| SourceError::NotConfigured("NEWSAPI_API_TOKEN is not set".to_string()))?;

        let client = &self.client;
        let limiter = &self.rate_limiter;
        let page_size = self.page_size.to_string();
        let page_size = page_size.as_str();
        let url = format!("{NEWSAPI_BASE_URL}/everything");
        let url = url.as_str();

        let body = self
            .cache
            .get_or_fetch(CacheKey::new(PROVIDER, "everything", query), move || {
                self.retry.execute("newsapi.everything", deadline, move || async move {
                    limiter.until_ready().await;
                    let response = client
                        .get(url)
                        .header("X-Api-Key", api_key)
                        .query(&[
                            ("q", query),
                            ("language", "en"),
                            ("sortBy", "relevancy"),
                            ("pageSize", page_size),
                            ("page", "1"),
                        ])
                        .send()
                        .await?;
                    read_json(PROVIDER, response).await
                })
            })
            .await?;

        parse_everything(body)
    }
}

/// Decode an `everything` response body
pub fn parse_everything(body: Value) -> Result<Vec<Article>> {
    let response: EverythingResponse = serde_json::from_value(body)?;
    if response.status != "ok" {
        return Err(SourceError::Rejected {
            provider: PROVIDER,
            message: format!(
                "{}: {}",
                response.code.as_deref().unwrap_or("error"),
                response.message.as_deref().unwrap_or("no message")
            ),
        });
    }
    Ok(response.articles)
}
