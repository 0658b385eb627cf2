//! Web research agent

use async_trait::async_trait;
use eval_core::{
    AgentOutcome, ContextInput, Deadline, EvidenceAgent, Field, FieldValue, Fragment,
    QueryContext, SourceKind,
};

use super::{finish, require};
use crate::api::{CompanyFacts, WebSearchClient};
use crate::error::Result;

const NAME: &str = "web_search";

/// Asks a search-capable model for public company facts
pub struct WebSearchAgent {
    client: WebSearchClient,
}

impl WebSearchAgent {
    pub fn new(client: WebSearchClient) -> Self {
        Self { client }
    }

    async fn collect(&self, context: &QueryContext, deadline: Deadline) -> Result<Fragment> {
        let company = require(context.company_name(), "company name")?;
        let facts = self.client.company_facts(company, deadline).await?;
        Ok(facts_fragment(&facts))
    }
}

#[async_trait]
impl EvidenceAgent for WebSearchAgent {
    async fn run(&self, context: &QueryContext, deadline: Deadline) -> AgentOutcome {
        finish(NAME, self.collect(context, deadline).await)
    }

    fn name(&self) -> &str {
        NAME
    }

    fn source(&self) -> SourceKind {
        SourceKind::WebSearch
    }

    fn requires(&self) -> &[ContextInput] {
        &[ContextInput::CompanyName]
    }
}

pub fn facts_fragment(facts: &CompanyFacts) -> Fragment {
    let confidence = SourceKind::WebSearch.default_confidence();
    let text = |value: &Option<String>| value.as_deref().map(FieldValue::from);

    let entries = [
        (Field::FoundingYear, facts.founding_year.map(|y| FieldValue::Number(f64::from(y)))),
        (Field::Headquarters, text(&facts.headquarters)),
        (Field::Industry, text(&facts.industry)),
        (Field::BusinessModel, text(&facts.business_model)),
        (Field::EmployeeCount, facts.employees.map(FieldValue::Number)),
        (Field::Website, text(&facts.website)),
        (Field::OneSentencePitch, text(&facts.pitch)),
        (Field::AnnualRecurringRevenue, facts.annual_recurring_revenue.map(FieldValue::Number)),
        (Field::CustomerCount, facts.customer_count.map(FieldValue::Number)),
        (Field::FounderProfileUrl, text(&facts.founder_profile_url)),
    ];

    let mut fragment = Fragment::new(NAME, SourceKind::WebSearch);
    for (field, value) in entries {
        if let Some(value) = value {
            fragment.insert(field, value, confidence);
        }
    }
    fragment
}
