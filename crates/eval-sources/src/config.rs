//! Configuration for evidence providers

use eval_utils::{env_parse, env_var};
use std::fmt;
use std::time::Duration;

use crate::error::{Result, SourceError};

pub const DEFAULT_WEB_SEARCH_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_WEB_SEARCH_MODEL: &str = "gpt-4o";
pub const DEFAULT_SEC_USER_AGENT: &str = "startup-eval (startup-eval@example.com)";

/// Credentials and tuning for the provider-backed agents
///
/// Missing credentials are not an error here: the agent that needs them
/// fails its run with a provider error and the others carry on.
#[derive(Clone)]
pub struct SourcesConfig {
    /// NewsAPI key
    pub news_api_key: Option<String>,

    /// Bright Data API token
    pub bright_data_token: Option<String>,

    /// Bright Data dataset holding profile snapshots
    pub bright_data_dataset_id: Option<String>,

    /// Base URL of an OpenAI-compatible chat completions API
    pub web_search_base_url: String,

    /// API key for the web search model
    pub web_search_api_key: Option<String>,

    /// Model asked for company facts
    pub web_search_model: String,

    /// User agent sent to SEC EDGAR (name and contact email)
    pub sec_user_agent: String,

    /// How long provider responses stay cached
    pub cache_ttl: Duration,

    /// Attempts per provider request, including the first
    pub max_retries: u32,

    /// Backoff before the first retry, doubled on each further retry
    pub retry_backoff_base: Duration,

    /// Interval between profile snapshot polls
    pub profile_poll_interval: Duration,

    /// Number of articles requested from NewsAPI
    pub news_page_size: u32,
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            news_api_key: None,
            bright_data_token: None,
            bright_data_dataset_id: None,
            web_search_base_url: DEFAULT_WEB_SEARCH_BASE_URL.to_string(),
            web_search_api_key: None,
            web_search_model: DEFAULT_WEB_SEARCH_MODEL.to_string(),
            sec_user_agent: DEFAULT_SEC_USER_AGENT.to_string(),
            cache_ttl: Duration::from_secs(900),
            max_retries: 3,
            retry_backoff_base: Duration::from_millis(250),
            profile_poll_interval: Duration::from_secs(2),
            news_page_size: 10,
        }
    }
}

impl fmt::Debug for SourcesConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let redact = |key: &Option<String>| key.as_ref().map(|_| "<redacted>");
        f.debug_struct("SourcesConfig")
            .field("news_api_key", &redact(&self.news_api_key))
            .field("bright_data_token", &redact(&self.bright_data_token))
            .field("bright_data_dataset_id", &self.bright_data_dataset_id)
            .field("web_search_base_url", &self.web_search_base_url)
            .field("web_search_api_key", &redact(&self.web_search_api_key))
            .field("web_search_model", &self.web_search_model)
            .field("sec_user_agent", &self.sec_user_agent)
            .field("cache_ttl", &self.cache_ttl)
            .field("max_retries", &self.max_retries)
            .field("retry_backoff_base", &self.retry_backoff_base)
            .field("profile_poll_interval", &self.profile_poll_interval)
            .field("news_page_size", &self.news_page_size)
            .finish()
    }
}

impl SourcesConfig {
    pub fn builder() -> SourcesConfigBuilder {
        SourcesConfigBuilder::default()
    }

    /// Fill credentials and provider settings from the environment
    ///
    /// Reads `NEWSAPI_API_TOKEN`, `BRIGHTDATA_API_TOKEN`,
    /// `BRIGHTDATA_DATASET_ID`, `OPENAI_API_KEY`, `OPENAI_BASE_URL`,
    /// `STARTUP_EVAL_WEB_SEARCH_MODEL` and `SEC_USER_AGENT`. Values already
    /// set are overwritten only by non-blank variables.
    pub fn with_env_keys(mut self) -> Result<Self> {
        let set = |slot: &mut Option<String>, name: &str| {
            if let Some(value) = env_var(name) {
                *slot = Some(value);
            }
        };
        set(&mut self.news_api_key, "NEWSAPI_API_TOKEN");
        set(&mut self.bright_data_token, "BRIGHTDATA_API_TOKEN");
        set(&mut self.bright_data_dataset_id, "BRIGHTDATA_DATASET_ID");
        set(&mut self.web_search_api_key, "OPENAI_API_KEY");

        if let Some(url) = env_var("OPENAI_BASE_URL") {
            self.web_search_base_url = url;
        }
        if let Some(model) = env_var("STARTUP_EVAL_WEB_SEARCH_MODEL") {
            self.web_search_model = model;
        }
        if let Some(agent) = env_var("SEC_USER_AGENT") {
            self.sec_user_agent = agent;
        }
        if let Some(retries) = env_parse::<u32>("STARTUP_EVAL_MAX_RETRIES")
            .map_err(|e| SourceError::NotConfigured(e.to_string()))?
        {
            self.max_retries = retries;
        }

        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_retries == 0 {
            return Err(SourceError::NotConfigured(
                "max_retries must be greater than 0".to_string(),
            ));
        }
        if self.profile_poll_interval.is_zero() {
            return Err(SourceError::NotConfigured(
                "profile_poll_interval must be greater than 0".to_string(),
            ));
        }
        if self.news_page_size == 0 || self.news_page_size > 100 {
            return Err(SourceError::NotConfigured(
                "news_page_size must be between 1 and 100".to_string(),
            ));
        }
        if url::Url::parse(&self.web_search_base_url).is_err() {
            return Err(SourceError::NotConfigured(format!(
                "web_search_base_url '{}' is not a valid URL",
                self.web_search_base_url
            )));
        }
        Ok(())
    }
}

/// Builder for [`SourcesConfig`]
#[derive(Debug, Default)]
pub struct SourcesConfigBuilder {
    news_api_key: Option<String>,
    bright_data_token: Option<String>,
    bright_data_dataset_id: Option<String>,
    web_search_base_url: Option<String>,
    web_search_api_key: Option<String>,
    web_search_model: Option<String>,
    sec_user_agent: Option<String>,
    cache_ttl: Option<Duration>,
    max_retries: Option<u32>,
    retry_backoff_base: Option<Duration>,
    profile_poll_interval: Option<Duration>,
    news_page_size: Option<u32>,
}

impl SourcesConfigBuilder {
    pub fn news_api_key(mut self, key: impl Into<String>) -> Self {
        self.news_api_key = Some(key.into());
        self
    }

    pub fn bright_data_token(mut self, token: impl Into<String>) -> Self {
        self.bright_data_token = Some(token.into());
        self
    }

    pub fn bright_data_dataset_id(mut self, dataset_id: impl Into<String>) -> Self {
        self.bright_data_dataset_id = Some(dataset_id.into());
        self
    }

    pub fn web_search_base_url(mut self, url: impl Into<String>) -> Self {
        self.web_search_base_url = Some(url.into());
        self
    }

    pub fn web_search_api_key(mut self, key: impl Into<String>) -> Self {
        self.web_search_api_key = Some(key.into());
        self
    }

    pub fn web_search_model(mut self, model: impl Into<String>) -> Self {
        self.web_search_model = Some(model.into());
        self
    }

    pub fn sec_user_agent(mut self, agent: impl Into<String>) -> Self {
        self.sec_user_agent = Some(agent.into());
        self
    }

    pub fn cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = Some(ttl);
        self
    }

    pub fn max_retries(mut self, retries: u32) -> Self {
        self.max_retries = Some(retries);
        self
    }

    pub fn retry_backoff_base(mut self, backoff: Duration) -> Self {
        self.retry_backoff_base = Some(backoff);
        self
    }

    pub fn profile_poll_interval(mut self, interval: Duration) -> Self {
        self.profile_poll_interval = Some(interval);
        self
    }

    pub fn news_page_size(mut self, size: u32) -> Self {
        self.news_page_size = Some(size);
        self
    }

    pub fn build(self) -> Result<SourcesConfig> {
        let defaults = SourcesConfig::default();

        let config = SourcesConfig {
            news_api_key: self.news_api_key,
            bright_data_token: self.bright_data_token,
            bright_data_dataset_id: self.bright_data_dataset_id,
            web_search_base_url: self
                .web_search_base_url
                .unwrap_or(defaults.web_search_base_url),
            web_search_api_key: self.web_search_api_key,
            web_search_model: self.web_search_model.unwrap_or(defaults.web_search_model),
            sec_user_agent: self.sec_user_agent.unwrap_or(defaults.sec_user_agent),
            cache_ttl: self.cache_ttl.unwrap_or(defaults.cache_ttl),
            max_retries: self.max_retries.unwrap_or(defaults.max_retries),
            retry_backoff_base: self.retry_backoff_base.unwrap_or(defaults.retry_backoff_base),
            profile_poll_interval: self
                .profile_poll_interval
                .unwrap_or(defaults.profile_poll_interval),
            news_page_size: self.news_page_size.unwrap_or(defaults.news_page_size),
        };

        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = SourcesConfig::default();
        assert!(config.news_api_key.is_none());
        assert_eq!(config.web_search_model, "gpt-4o");
        assert_eq!(config.max_retries, 3);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder_overrides() {
        let config = SourcesConfig::builder()
            .news_api_key("news-key")
            .web_search_base_url("http://localhost:1234/v1")
            .max_retries(1)
            .profile_poll_interval(Duration::from_millis(50))
            .build()
            .unwrap();
        assert_eq!(config.news_api_key.as_deref(), Some("news-key"));
        assert_eq!(config.web_search_base_url, "http://localhost:1234/v1");
        assert_eq!(config.max_retries, 1);
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(SourcesConfig::builder().max_retries(0).build().is_err());
        assert!(SourcesConfig::builder().news_page_size(500).build().is_err());
        assert!(
            SourcesConfig::builder()
                .web_search_base_url("not a url")
                .build()
                .is_err()
        );
    }

    #[test]
    fn test_debug_redacts_credentials() {
        let config = SourcesConfig::builder()
            .bright_data_token("secret-token")
            .build()
            .unwrap();
        let debug = format!("{config:?}");
        assert!(!debug.contains("secret-token"));
        assert!(debug.contains("<redacted>"));
    }
}
