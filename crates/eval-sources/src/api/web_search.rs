//! Company research through an OpenAI-compatible chat completions API
//!
//! The model is asked for a JSON object of company facts; only keys it
//! actually fills are reported.

use eval_core::Deadline;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use super::{http_client, read_json};
use crate::cache::{CacheKey, ResponseCache};
use crate::config::SourcesConfig;
use crate::error::{Result, SourceError};
use crate::parse::{headcount, json_number, json_text, year};
use crate::retry::RetryPolicy;

const PROVIDER: &str = "web_search";

const SYSTEM_PROMPT: &str = "You are a company research assistant that searches the web for \
accurate company information. Only report facts found in reliable sources, never estimates.";

/// Facts reported for a company
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CompanyFacts {
    pub founding_year: Option<i32>,
    pub headquarters: Option<String>,
    pub industry: Option<String>,
    pub business_model: Option<String>,
    pub employees: Option<f64>,
    pub website: Option<String>,
    pub pitch: Option<String>,
    pub annual_recurring_revenue: Option<f64>,
    pub customer_count: Option<f64>,
    /// Profile URL of the CEO or founder
    pub founder_profile_url: Option<String>,
}

impl CompanyFacts {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    response_format: ResponseFormat,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: AssistantMessage,
}

#[derive(Debug, Deserialize)]
struct AssistantMessage {
    content: Option<String>,
}

/// Chat completions client used for web research
pub struct WebSearchClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    model: String,
    cache: ResponseCache,
    retry: RetryPolicy,
}

impl WebSearchClient {
    pub fn new(config: &SourcesConfig, cache: ResponseCache) -> Result<Self> {
        Ok(Self {
            client: http_client(None)?,
            base_url: config.web_search_base_url.trim_end_matches('/').to_string(),
            api_key: config.web_search_api_key.clone(),
            model: config.web_search_model.clone(),
            cache,
            retry: RetryPolicy::from_config(config),
        })
    }

    /// Ask the model for basic facts about `company`
    pub async fn company_facts(&self, company: &str, deadline: Deadline) -> Result<CompanyFacts> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| SourceError::NotConfigured("OPENAI_API_KEY is not set".to_string()))?;

        let prompt = company_prompt(company);
        let request = ChatRequest {
            model: &self.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: &prompt,
                },
            ],
            response_format: ResponseFormat { kind: "json_object" },
            temperature: 0.0,
        };

        let client = &self.client;
        let request = &request;
        let url = format!("{}/chat/completions", self.base_url);
        let url = url.as_str();

        let body = self
            .cache
            .get_or_fetch(
                CacheKey::new(PROVIDER, &self.model, company),
                move || {
                    self.retry.execute("web_search.chat", deadline, move || async move {
                        let response = client
                            .post(url)
                            .bearer_auth(api_key)
                            .json(request)
                            .send()
                            .await?;
                        read_json(PROVIDER, response).await
                    })
                },
            )
            .await?;

        let content = completion_content(body)?;
        debug!(chars = content.len(), "Received company facts");
        parse_company_facts(&content)
    }
}

fn company_prompt(company: &str) -> String {
    format!(
        "Search the web for basic information about the company \"{company}\".\n\
         Respond with a JSON object using these keys, omitting any you cannot find:\n\
         - year_of_founding (integer)\n\
         - location_of_headquarters (string)\n\
         - industry (string)\n\
         - business_model (string such as B2B or B2C)\n\
         - employees (string such as \"10-50\")\n\
         - website_link (string)\n\
         - one_sentence_pitch (string)\n\
         - annual_recurring_revenue (integer USD)\n\
         - customer_count (integer)\n\
         - ceo_linkedin (string, LinkedIn profile URL of the CEO or founder)"
    )
}

fn completion_content(body: Value) -> Result<String> {
    let response: ChatResponse = serde_json::from_value(body)?;
    response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .ok_or_else(|| SourceError::Parse("completion has no content".to_string()))
}

/// Parse the model's JSON answer
///
/// Code fences around the object are tolerated.
pub fn parse_company_facts(content: &str) -> Result<CompanyFacts> {
    let trimmed = content.trim();
    let json = match (trimmed.find('{'), trimmed.rfind('}')) {
        (Some(start), Some(end)) if start < end => &trimmed[start..=end],
        _ => return Err(SourceError::Parse("answer is not a JSON object".to_string())),
    };
    let value: Value = serde_json::from_str(json)?;
    let field = |key: &str| value.get(key);

    Ok(CompanyFacts {
        founding_year: match field("year_of_founding") {
            Some(Value::Number(n)) => n.as_i64().and_then(|y| i32::try_from(y).ok()),
            other => json_text(other).and_then(|s| year(&s)),
        },
        headquarters: json_text(field("location_of_headquarters")),
        industry: json_text(field("industry")),
        business_model: json_text(field("business_model")),
        employees: match field("employees") {
            Some(Value::String(s)) => headcount(s),
            other => json_number(other),
        },
        website: json_text(field("website_link")),
        pitch: json_text(field("one_sentence_pitch")),
        annual_recurring_revenue: json_number(field("annual_recurring_revenue")),
        customer_count: json_number(field("customer_count")),
        founder_profile_url: json_text(field("ceo_linkedin"))
            .filter(|url| url.starts_with("http://") || url.starts_with("https://")),
    })
}
