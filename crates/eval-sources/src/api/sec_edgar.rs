//! SEC EDGAR client for company filings and XBRL facts
//!
//! Rate limit: 10 requests per second (SEC fair access policy).
//! Every request must carry a User-Agent naming the caller and a contact
//! email.

use eval_core::Deadline;
use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use std::num::NonZeroU32;
use std::sync::Arc;
use tracing::debug;

use super::{http_client, read_json};
use crate::cache::{CacheKey, ResponseCache};
use crate::config::SourcesConfig;
use crate::error::{Result, SourceError};
use crate::retry::RetryPolicy;

type SharedRateLimiter = Arc<RateLimiter<NotKeyed, InMemoryState, DefaultClock>>;

const PROVIDER: &str = "sec_edgar";
const SEC_BASE_URL: &str = "https://data.sec.gov";
const SEC_COMPANY_TICKERS_URL: &str = "https://www.sec.gov/files/company_tickers.json";

const REVENUE_CONCEPTS: &[&str] = &[
    "Revenues",
    "RevenueFromContractWithCustomerExcludingAssessedTax",
    "SalesRevenueNet",
];
const NET_INCOME_CONCEPTS: &[&str] = &["NetIncomeLoss"];
const ASSETS_CONCEPTS: &[&str] = &["Assets"];
const LIABILITIES_CONCEPTS: &[&str] = &["Liabilities"];

/// Trailing tokens ignored when matching company names against SEC titles
const CORPORATE_SUFFIXES: &[&str] = &[
    "inc", "incorporated", "corp", "corporation", "co", "company", "ltd", "limited", "llc",
    "plc", "sa", "ag", "nv", "the",
];

/// Latest annual figures reported by a filer
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CompanyFinancials {
    pub cik: String,
    pub entity_name: Option<String>,
    pub fiscal_year: Option<i64>,
    pub revenue: Option<f64>,
    pub net_income: Option<f64>,
    pub total_assets: Option<f64>,
    pub total_liabilities: Option<f64>,
    /// SIC industry description from the submissions index
    pub industry: Option<String>,
}

impl CompanyFinancials {
    pub fn has_figures(&self) -> bool {
        self.revenue.is_some()
            || self.net_income.is_some()
            || self.total_assets.is_some()
            || self.total_liabilities.is_some()
    }
}

/// SEC EDGAR API client
pub struct SecEdgarClient {
    client: Client,
    cache: ResponseCache,
    retry: RetryPolicy,
    rate_limiter: SharedRateLimiter,
}

impl SecEdgarClient {
    pub fn new(config: &SourcesConfig, cache: ResponseCache) -> Result<Self> {
        let quota = Quota::per_second(NonZeroU32::new(10).unwrap_or(NonZeroU32::MIN));
        Ok(Self {
            client: http_client(Some(&config.sec_user_agent))?,
            cache,
            retry: RetryPolicy::from_config(config),
            rate_limiter: Arc::new(RateLimiter::direct(quota)),
        })
    }

    async fn get_json(&self, endpoint: &'static str, url: String, deadline: Deadline) -> Result<Value> {
        let client = &self.client;
        let limiter = &self.rate_limiter;
        let url = url.as_str();
        self.cache
            .get_or_fetch(CacheKey::new(PROVIDER, endpoint, url), move || {
                self.retry.execute(endpoint, deadline, move || async move {
                    limiter.until_ready().await;
                    let response = client.get(url).send().await?;
                    read_json(PROVIDER, response).await
                })
            })
            .await
    }

    /// Resolve a company name or ticker to a zero-padded CIK
    pub async fn find_cik(&self, company: &str, deadline: Deadline) -> Result<String> {
        let tickers = self
            .get_json("company_tickers", SEC_COMPANY_TICKERS_URL.to_string(), deadline)
            .await?;
        match_cik(&tickers, company).ok_or_else(|| SourceError::NotFound(company.to_string()))
    }

    /// Latest annual revenue, income, assets and liabilities plus industry
    ///
    /// The submissions index only adds the industry, so a failure fetching
    /// it is logged and ignored.
    pub async fn company_financials(&self, cik: &str, deadline: Deadline) -> Result<CompanyFinancials> {
        let facts = self
            .get_json(
                "companyfacts",
                format!("{SEC_BASE_URL}/api/xbrl/companyfacts/CIK{cik}.json"),
                deadline,
            )
            .await?;
        let mut financials = extract_financials(cik, &facts);

        match self
            .get_json(
                "submissions",
                format!("{SEC_BASE_URL}/submissions/CIK{cik}.json"),
                deadline,
            )
            .await
        {
            Ok(submissions) => {
                financials.industry = submissions
                    .get("sicDescription")
                    .and_then(Value::as_str)
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(ToString::to_string);
            }
            Err(e) => debug!(cik, error = %e, "Submissions unavailable"),
        }

        Ok(financials)
    }
}

/// Find a filer in the `company_tickers.json` index
///
/// A normalised title match wins over a ticker match.
pub fn match_cik(tickers: &Value, company: &str) -> Option<String> {
    let entries = tickers.as_object()?;
    let wanted = normalise_company(company);
    let ticker = company.trim().to_uppercase();

    let by_title = entries.values().find(|entry| {
        entry
            .get("title")
            .and_then(Value::as_str)
            .is_some_and(|title| !wanted.is_empty() && normalise_company(title) == wanted)
    });
    let by_ticker = || {
        entries.values().find(|entry| {
            entry
                .get("ticker")
                .and_then(Value::as_str)
                .is_some_and(|t| t.eq_ignore_ascii_case(&ticker))
        })
    };

    let entry = by_title.or_else(by_ticker)?;
    let cik = match entry.get("cik_str")? {
        Value::Number(n) => n.as_u64()?.to_string(),
        Value::String(s) => s.trim().to_string(),
        _ => return None,
    };
    Some(format!("{cik:0>10}"))
}

fn normalise_company(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| if c.is_alphanumeric() { c.to_ascii_lowercase() } else { ' ' })
        .collect();
    let mut tokens: Vec<&str> = cleaned.split_whitespace().collect();
    while tokens.len() > 1 && tokens.last().is_some_and(|t| CORPORATE_SUFFIXES.contains(t)) {
        tokens.pop();
    }
    tokens.join(" ")
}

/// Pull the latest annual figures out of a `companyfacts` document
pub fn extract_financials(cik: &str, facts: &Value) -> CompanyFinancials {
    let gaap = facts.pointer("/facts/us-gaap");
    let latest = |concepts: &[&str]| gaap.and_then(|gaap| latest_annual(gaap, concepts));

    let revenue = latest(REVENUE_CONCEPTS);
    let net_income = latest(NET_INCOME_CONCEPTS);
    let total_assets = latest(ASSETS_CONCEPTS);
    let total_liabilities = latest(LIABILITIES_CONCEPTS);

    CompanyFinancials {
        cik: cik.to_string(),
        entity_name: facts
            .get("entityName")
            .and_then(Value::as_str)
            .map(ToString::to_string),
        fiscal_year: [&revenue, &net_income, &total_assets, &total_liabilities]
            .into_iter()
            .flatten()
            .map(|fact| fact.fiscal_year)
            .max(),
        revenue: revenue.map(|fact| fact.value),
        net_income: net_income.map(|fact| fact.value),
        total_assets: total_assets.map(|fact| fact.value),
        total_liabilities: total_liabilities.map(|fact| fact.value),
        industry: None,
    }
}

#[derive(Debug, Clone, Copy)]
struct AnnualFact<'a> {
    value: f64,
    fiscal_year: i64,
    end: &'a str,
}

/// Latest full-year 10-K value across the candidate concepts
fn latest_annual<'a>(gaap: &'a Value, concepts: &[&str]) -> Option<AnnualFact<'a>> {
    concepts
        .iter()
        .filter_map(|concept| gaap.get(*concept)?.pointer("/units/USD")?.as_array())
        .flatten()
        .filter_map(|fact| {
            let form = fact.get("form")?.as_str()?;
            let period = fact.get("fp")?.as_str()?;
            if !form.starts_with("10-K") || period != "FY" {
                return None;
            }
            Some(AnnualFact {
                value: fact.get("val")?.as_f64()?,
                fiscal_year: fact.get("fy")?.as_i64()?,
                end: fact.get("end")?.as_str()?,
            })
        })
        .max_by(|a, b| a.end.cmp(b.end).then(a.fiscal_year.cmp(&b.fiscal_year)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn tickers() -> Value {
        json!({
            "0": {"cik_str": 320193, "ticker": "AAPL", "title": "Apple Inc."},
            "1": {"cik_str": 1_045_810, "ticker": "NVDA", "title": "NVIDIA CORP"},
            "2": {"cik_str": "789019", "ticker": "MSFT", "title": "MICROSOFT CORP"}
        })
    }

    #[test]
    fn test_match_cik_by_title() {
        assert_eq!(match_cik(&tickers(), "Apple"), Some("0000320193".to_string()));
        assert_eq!(match_cik(&tickers(), "Nvidia Corporation"), Some("0001045810".to_string()));
    }

    #[test]
    fn test_match_cik_by_ticker_and_string_cik() {
        assert_eq!(match_cik(&tickers(), "msft"), Some("0000789019".to_string()));
    }

    #[test]
    fn test_unknown_company() {
        assert_eq!(match_cik(&tickers(), "Acme Robotics"), None);
    }

    #[test]
    fn test_extract_latest_annual_figures() {
        let facts = json!({
            "cik": 320_193,
            "entityName": "Apple Inc.",
            "facts": {"us-gaap": {
                "Revenues": {"units": {"USD": [
                    {"end": "2022-09-24", "val": 394_328_000_000.0_f64, "fy": 2022, "fp": "FY", "form": "10-K"},
                    {"end": "2023-07-01", "val": 81_797_000_000.0_f64, "fy": 2023, "fp": "Q3", "form": "10-Q"}
                ]}},
                "RevenueFromContractWithCustomerExcludingAssessedTax": {"units": {"USD": [
                    {"end": "2023-09-30", "val": 383_285_000_000.0_f64, "fy": 2023, "fp": "FY", "form": "10-K"}
                ]}},
                "NetIncomeLoss": {"units": {"USD": [
                    {"end": "2023-09-30", "val": 96_995_000_000.0_f64, "fy": 2023, "fp": "FY", "form": "10-K"}
                ]}},
                "Assets": {"units": {"USD": [
                    {"end": "2023-09-30", "val": 352_583_000_000.0_f64, "fy": 2023, "fp": "FY", "form": "10-K/A"}
                ]}}
            }}
        });

        let financials = extract_financials("0000320193", &facts);
        assert_eq!(financials.entity_name.as_deref(), Some("Apple Inc."));
        assert_eq!(financials.revenue, Some(383_285_000_000.0));
        assert_eq!(financials.net_income, Some(96_995_000_000.0));
        assert_eq!(financials.total_assets, Some(352_583_000_000.0));
        assert_eq!(financials.total_liabilities, None);
        assert_eq!(financials.fiscal_year, Some(2023));
        assert!(financials.has_figures());
    }

    #[test]
    fn test_extract_without_gaap_facts() {
        let financials = extract_financials("0000000001", &json!({"facts": {}}));
        assert!(!financials.has_figures());
    }

    #[tokio::test]
    #[ignore = "requires network access to SEC EDGAR"]
    async fn test_live_company_financials() {
        let client =
            SecEdgarClient::new(&SourcesConfig::default(), ResponseCache::new(std::time::Duration::from_secs(60)))
                .unwrap();
        let deadline = tokio::time::Instant::now() + std::time::Duration::from_secs(20);
        let cik = client.find_cik("Apple", deadline).await.unwrap();
        let financials = client.company_financials(&cik, deadline).await.unwrap();
        assert!(financials.revenue.is_some());
    }
}
