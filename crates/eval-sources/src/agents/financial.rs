//! Financial agent backed by SEC EDGAR filings

use async_trait::async_trait;
use eval_core::{
    AgentOutcome, ContextInput, Deadline, EvidenceAgent, Field, Fragment, QueryContext,
    SourceKind,
};
use tracing::debug;

use super::{finish, require};
use crate::api::{CompanyFinancials, SecEdgarClient};
use crate::error::Result;

const NAME: &str = "financial";

/// Looks a company up in EDGAR and reports its latest annual figures
pub struct FinancialAgent {
    client: SecEdgarClient,
}

impl FinancialAgent {
    pub fn new(client: SecEdgarClient) -> Self {
        Self { client }
    }

    async fn collect(&self, context: &QueryContext, deadline: Deadline) -> Result<Fragment> {
        let company = require(context.company_name(), "company name")?;
        let lookup = ticker_hint(context.hints()).unwrap_or(company);

        let cik = self.client.find_cik(lookup, deadline).await?;
        debug!(company, cik = %cik, "Resolved EDGAR registrant");
        let financials = self.client.company_financials(&cik, deadline).await?;
        Ok(financials_fragment(&financials))
    }
}

#[async_trait]
impl EvidenceAgent for FinancialAgent {
    async fn run(&self, context: &QueryContext, deadline: Deadline) -> AgentOutcome {
        finish(NAME, self.collect(context, deadline).await)
    }

    fn name(&self) -> &str {
        NAME
    }

    fn source(&self) -> SourceKind {
        SourceKind::Financial
    }

    fn requires(&self) -> &[ContextInput] {
        &[ContextInput::CompanyName]
    }
}

/// A `ticker:XYZ` hint overrides the name used for the registrant lookup
fn ticker_hint(hints: &[String]) -> Option<&str> {
    hints.iter().find_map(|hint| {
        let (key, value) = hint.split_once(':')?;
        let value = value.trim();
        (key.trim().eq_ignore_ascii_case("ticker") && !value.is_empty()).then_some(value)
    })
}

/// Figures from the filings as a fragment
pub fn financials_fragment(financials: &CompanyFinancials) -> Fragment {
    let mut fragment = Fragment::new(NAME, SourceKind::Financial);
    let confidence = SourceKind::Financial.default_confidence();

    let numbers = [
        (Field::Revenue, financials.revenue),
        (Field::NetIncome, financials.net_income),
        (Field::TotalAssets, financials.total_assets),
        (Field::TotalLiabilities, financials.total_liabilities),
    ];
    for (field, value) in numbers {
        if let Some(value) = value {
            fragment.insert(field, value.into(), confidence);
        }
    }
    if let Some(industry) = &financials.industry {
        fragment.insert(Field::Industry, industry.as_str().into(), confidence);
    }
    fragment
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::ResponseCache;
    use crate::config::SourcesConfig;
    use eval_core::FailureReason;
    use std::time::Duration;
    use tokio::time::Instant;

    #[test]
    fn test_fragment_from_financials() {
        let financials = CompanyFinancials {
            cik: "0000320193".to_string(),
            entity_name: Some("Acme Corp".to_string()),
            fiscal_year: Some(2023),
            revenue: Some(4_500_000.0),
            net_income: Some(-1_200_000.0),
            total_assets: Some(9_000_000.0),
            total_liabilities: None,
            industry: Some("Services-Prepackaged Software".to_string()),
        };

        let fragment = financials_fragment(&financials);
        assert_eq!(fragment.len(), 4);
        assert_eq!(fragment.source(), SourceKind::Financial);
        assert_eq!(
            fragment.get(Field::NetIncome).and_then(|e| e.value.as_number()),
            Some(-1_200_000.0)
        );
        assert!(fragment.get(Field::TotalLiabilities).is_none());
        assert_eq!(
            fragment.get(Field::Industry).and_then(|e| e.value.as_text()),
            Some("Services-Prepackaged Software")
        );
    }

    #[test]
    fn test_ticker_hint() {
        let hints = vec!["stage:seed".to_string(), "Ticker: ACME ".to_string()];
        assert_eq!(ticker_hint(&hints), Some("ACME"));
        assert_eq!(ticker_hint(&["ticker:".to_string()]), None);
        assert_eq!(ticker_hint(&[]), None);
    }

    #[tokio::test]
    async fn test_requires_company_name() {
        let cache = ResponseCache::new(Duration::from_secs(60));
        let agent = FinancialAgent::new(SecEdgarClient::new(&SourcesConfig::default(), cache).unwrap());
        let context = QueryContext::builder().document("deck.md").build().unwrap();

        let outcome = agent.run(&context, Instant::now() + Duration::from_secs(1)).await;
        assert!(outcome.failure().is_some_and(FailureReason::is_missing_input));
    }
}
