//! Bright Data dataset client for professional profiles
//!
//! Collection is asynchronous: a trigger call returns a snapshot id, and the
//! snapshot is polled until the records are ready.

use eval_core::{Deadline, remaining};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tokio::time::sleep;
use tracing::debug;

use super::{http_client, read_json};
use crate::cache::{CacheKey, ResponseCache};
use crate::config::SourcesConfig;
use crate::error::{Result, SourceError};
use crate::retry::{RetryPolicy, ensure_time_left};

const PROVIDER: &str = "bright_data";
const BRIGHT_DATA_BASE_URL: &str = "https://api.brightdata.com/datasets/v3";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompanyRef {
    pub name: Option<String>,
}

/// One position in a profile's work history
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Experience {
    pub title: Option<String>,
    pub company: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub description: Option<String>,
}

/// A collected profile
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProfileRecord {
    pub name: Option<String>,
    #[serde(alias = "position", alias = "headline")]
    pub title: Option<String>,
    #[serde(alias = "city")]
    pub location: Option<String>,
    #[serde(alias = "about")]
    pub summary: Option<String>,
    pub skills: Vec<String>,
    pub current_company: Option<CompanyRef>,
    pub experience: Option<Vec<Experience>>,
}

impl ProfileRecord {
    pub fn experience(&self) -> &[Experience] {
        self.experience.as_deref().unwrap_or_default()
    }
}

/// Progress of a snapshot
#[derive(Debug, Clone, PartialEq)]
pub enum SnapshotState {
    Pending(String),
    Ready(Vec<ProfileRecord>),
}

/// Bright Data datasets API client
pub struct BrightDataClient {
    client: Client,
    token: Option<String>,
    dataset_id: Option<String>,
    poll_interval: Duration,
    cache: ResponseCache,
    retry: RetryPolicy,
}

impl BrightDataClient {
    pub fn new(config: &SourcesConfig, cache: ResponseCache) -> Result<Self> {
        Ok(Self {
            client: http_client(None)?,
            token: config.bright_data_token.clone(),
            dataset_id: config.bright_data_dataset_id.clone(),
            poll_interval: config.profile_poll_interval,
            cache,
            retry: RetryPolicy::from_config(config),
        })
    }

    fn credentials(&self) -> Result<(&str, &str)> {
        let token = self
            .token
            .as_deref()
            .ok_or_else(|| SourceError::NotConfigured("BRIGHTDATA_API_TOKEN is not set".to_string()))?;
        let dataset_id = self.dataset_id.as_deref().ok_or_else(|| {
            SourceError::NotConfigured("BRIGHTDATA_DATASET_ID is not set".to_string())
        })?;
        Ok((token, dataset_id))
    }

    /// Collect the profile at `profile_url`, waiting for the snapshot until
    /// the deadline
    pub async fn fetch_profile(&self, profile_url: &str, deadline: Deadline) -> Result<ProfileRecord> {
        let (token, dataset_id) = self.credentials()?;

        let records = self
            .cache
            .get_or_fetch(CacheKey::new(PROVIDER, "profile", profile_url), move || async move {
                let snapshot_id = self.trigger(token, dataset_id, profile_url, deadline).await?;
                let records = self.wait_for_snapshot(token, &snapshot_id, deadline).await?;
                Ok::<_, SourceError>(serde_json::to_value(records)?)
            })
            .await?;

        let records: Vec<ProfileRecord> = serde_json::from_value(records)?;
        records
            .into_iter()
            .find(|record| record.name.is_some())
            .ok_or_else(|| SourceError::NotFound(profile_url.to_string()))
    }

    async fn trigger(
        &self,
        token: &str,
        dataset_id: &str,
        profile_url: &str,
        deadline: Deadline,
    ) -> Result<String> {
        let client = &self.client;
        let url = format!("{BRIGHT_DATA_BASE_URL}/trigger");
        let url = url.as_str();
        let body = serde_json::json!([{ "url": profile_url }]);
        let body = &body;

        let response = self
            .retry
            .execute("bright_data.trigger", deadline, move || async move {
                let response = client
                    .post(url)
                    .bearer_auth(token)
                    .query(&[
                        ("dataset_id", dataset_id),
                        ("include_errors", "true"),
                        ("discover_by", "url"),
                    ])
                    .json(body)
                    .send()
                    .await?;
                read_json(PROVIDER, response).await
            })
            .await?;

        let snapshot_id = response
            .get("snapshot_id")
            .and_then(Value::as_str)
            .ok_or_else(|| SourceError::Parse("trigger response has no snapshot_id".to_string()))?;
        debug!(snapshot_id, "Profile snapshot triggered");
        Ok(snapshot_id.to_string())
    }

    async fn wait_for_snapshot(
        &self,
        token: &str,
        snapshot_id: &str,
        deadline: Deadline,
    ) -> Result<Vec<ProfileRecord>> {
        let client = &self.client;
        let url = format!("{BRIGHT_DATA_BASE_URL}/snapshot/{snapshot_id}");
        let url = url.as_str();

        loop {
            ensure_time_left(deadline, "profile snapshot")?;
            let body = self
                .retry
                .execute("bright_data.snapshot", deadline, move || async move {
                    let response = client
                        .get(url)
                        .bearer_auth(token)
                        .query(&[("format", "json")])
                        .send()
                        .await?;
                    read_json(PROVIDER, response).await
                })
                .await?;

            match parse_snapshot(body)? {
                SnapshotState::Ready(records) => return Ok(records),
                SnapshotState::Pending(status) => {
                    let wait = self.poll_interval.min(remaining(deadline));
                    debug!(snapshot_id, status = %status, wait_ms = wait.as_millis() as u64, "Snapshot not ready");
                    sleep(wait).await;
                }
            }
        }
    }
}

/// Interpret a snapshot response body
pub fn parse_snapshot(body: Value) -> Result<SnapshotState> {
    match body {
        Value::Array(items) => {
            let records = items
                .into_iter()
                .filter(|item| item.get("name").is_some_and(|name| !name.is_null()))
                .map(serde_json::from_value)
                .collect::<std::result::Result<Vec<ProfileRecord>, _>>()?;
            Ok(SnapshotState::Ready(records))
        }
        Value::Object(object) => {
            if object.contains_key("name") {
                let record = serde_json::from_value(Value::Object(object))?;
                return Ok(SnapshotState::Ready(vec![record]));
            }
            match object.get("status").and_then(Value::as_str) {
                Some("failed") => Err(SourceError::Rejected {
                    provider: PROVIDER,
                    message: object
                        .get("message")
                        .and_then(Value::as_str)
                        .unwrap_or("snapshot failed")
                        .to_string(),
                }),
                Some(status) => Ok(SnapshotState::Pending(status.to_string())),
                None => Err(SourceError::Parse(
                    "snapshot response is neither records nor a status".to_string(),
                )),
            }
        }
        _ => Err(SourceError::Parse("unexpected snapshot response".to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_running_snapshot_is_pending() {
        let state = parse_snapshot(json!({"status": "running", "message": "Snapshot is not ready yet"}))
            .unwrap();
        assert_eq!(state, SnapshotState::Pending("running".to_string()));
    }

    #[test]
    fn test_failed_snapshot_is_rejected() {
        let error = parse_snapshot(json!({"status": "failed", "message": "dataset error"})).unwrap_err();
        assert!(error.to_string().contains("dataset error"));
    }

    #[test]
    fn test_ready_snapshot_with_aliases() {
        let state = parse_snapshot(json!([
            {
                "name": "Jane Doe",
                "position": "Co-Founder & CEO at Acme Robotics",
                "city": "Austin, Texas",
                "about": "Robotics engineer, previously sold Widgetly to Initech.",
                "current_company": {"name": "Acme Robotics"},
                "experience": [
                    {"title": "CEO", "company": "Acme Robotics", "start_date": "Jan 2021"},
                    {"title": "Founder", "company": "Widgetly", "start_date": "2012", "end_date": "2019"}
                ]
            },
            {"error": "profile unavailable", "url": "https://www.linkedin.com/in/ghost"}
        ]))
        .unwrap();

        let SnapshotState::Ready(records) = state else {
            panic!("expected ready snapshot");
        };
        assert_eq!(records.len(), 1);
        let profile = &records[0];
        assert_eq!(profile.title.as_deref(), Some("Co-Founder & CEO at Acme Robotics"));
        assert_eq!(profile.location.as_deref(), Some("Austin, Texas"));
        assert_eq!(profile.experience().len(), 2);
        assert_eq!(
            profile.current_company.as_ref().and_then(|c| c.name.as_deref()),
            Some("Acme Robotics")
        );
    }

    #[test]
    fn test_missing_experience_is_empty() {
        let state = parse_snapshot(json!({"name": "Jane Doe", "experience": null})).unwrap();
        let SnapshotState::Ready(records) = state else {
            panic!("expected ready snapshot");
        };
        assert!(records[0].experience().is_empty());
    }

    #[tokio::test]
    async fn test_missing_credentials_are_not_configured() {
        let client = BrightDataClient::new(
            &SourcesConfig::default(),
            ResponseCache::new(Duration::from_secs(60)),
        )
        .unwrap();
        let deadline = tokio::time::Instant::now() + Duration::from_secs(1);
        let error = client
            .fetch_profile("https://www.linkedin.com/in/jane-doe", deadline)
            .await
            .unwrap_err();
        assert!(matches!(error, SourceError::NotConfigured(_)));
    }
}
