//! Document agent
//!
//! Reads a text or markdown pitch document and extracts labelled figures
//! line by line. The deadline is checked between lines; when it runs out
//! the fields found so far are returned as a partial fragment.

use async_trait::async_trait;
use eval_core::{
    AgentOutcome, ContextInput, Deadline, EvidenceAgent, FailureReason, Field, FieldValue,
    Fragment, QueryContext, SourceKind,
};
use regex::Regex;
use tokio::time::Instant;
use tracing::{debug, warn};

use super::finish;
use crate::error::SourceError;
use crate::parse::{amount, headcount, year};

const NAME: &str = "document";

/// Lines processed between cooperative yields
const YIELD_EVERY: usize = 256;

/// Longest text value kept from a single line
const MAX_TEXT_CHARS: usize = 200;

const SEP: &str = r"\s*(?:[:=\-–]|\bof\b|\bis\b|\bat\b)?\s*";
const MONEY: &str = r"(-?\$?\s?\d[\d,]*(?:\.\d+)?\s?(?:k|mm|mn|m|bn|b|thousand|million|billion)?)\b";
const LABEL_SEP: &str = r"\s*[:\-–]\s*";

#[derive(Debug, Clone, Copy)]
enum Parser {
    Text,
    Amount,
    Year,
    Headcount,
    Names,
}

/// Extraction rules in priority order; the first match for a field wins
#[allow(clippy::enum_glob_use)]
fn rules() -> Vec<(Field, String, Parser)> {
    use Field::*;
    vec![
        (CompanyName, format!(r"^(?:company|startup)(?:\s+name)?{LABEL_SEP}(.+)$"), Parser::Text),
        (FoundingYear, r"\bfounded\b(?:\s+in)?\s*[:\-]?\s*((?:18|19|20)\d{2})\b".to_string(), Parser::Year),
        (Headquarters, format!(r"^(?:headquarters|hq|location){LABEL_SEP}(.+)$"), Parser::Text),
        (Headquarters, r"\bheadquartered\s+in\s+([^.;]+)".to_string(), Parser::Text),
        (Industry, format!(r"^(?:industry|sector){LABEL_SEP}(.+)$"), Parser::Text),
        (BusinessModel, format!(r"^business\s+model{LABEL_SEP}(.+)$"), Parser::Text),
        (Website, format!(r"^(?:website|web|url){LABEL_SEP}((?:https?://|www\.)\S+)"), Parser::Text),
        (AnnualRecurringRevenue, format!(r"\b(?:arr|annual\s+recurring\s+revenue){SEP}{MONEY}"), Parser::Amount),
        (Revenue, format!(r"^(?:total\s+|annual\s+)?revenues?{SEP}{MONEY}"), Parser::Amount),
        (MonthlyCashBurn, format!(r"\b(?:monthly\s+)?(?:cash\s+)?burn(?:\s+rate)?{SEP}{MONEY}"), Parser::Amount),
        (RunwayMonths, format!(r"\brunway{SEP}(\d+(?:\.\d+)?)\s*months?\b"), Parser::Amount),
        (GrossMargin, format!(r"\bgross\s+margins?{SEP}(-?\d+(?:\.\d+)?)\s*%"), Parser::Amount),
        (
            RevenueGrowthRate,
            format!(r"\b(?:revenue\s+)?growth(?:\s+rate)?(?:\s*\((?:yoy|year over year)\))?{SEP}(-?\d+(?:\.\d+)?)\s*%"),
            Parser::Amount,
        ),
        (
            FundingRequired,
            format!(r"\b(?:raising|seeking|funding\s+(?:required|ask|sought)|investment\s+ask|the\s+ask){SEP}{MONEY}"),
            Parser::Amount,
        ),
        (PreMoneyValuation, format!(r"\b(?:pre-?money\s+)?valuation{SEP}{MONEY}"), Parser::Amount),
        (CustomerCount, format!(r"^customers{SEP}(\d[\d,]*)\b"), Parser::Amount),
        (
            CustomerCount,
            r"\b(\d[\d,]*)\+?\s+(?:paying\s+|active\s+|enterprise\s+)?customers\b".to_string(),
            Parser::Amount,
        ),
        (CustomerAcquisitionCost, format!(r"\b(?:cac|customer\s+acquisition\s+cost){SEP}{MONEY}"), Parser::Amount),
        (
            CustomerLifetimeValue,
            format!(r"\b(?:cltv|ltv|clv|customer\s+lifetime\s+value){SEP}{MONEY}"),
            Parser::Amount,
        ),
        (
            EmployeeCount,
            format!(r"\b(?:employees|team\s+size|headcount){SEP}(\d[\d,]*(?:\s*-\s*\d[\d,]*)?)"),
            Parser::Headcount,
        ),
        (
            EmployeeCount,
            r"\b(\d[\d,]*)\s+(?:employees|ftes?|team\s+members)\b".to_string(),
            Parser::Headcount,
        ),
        (
            FounderName,
            format!(r"^(?:(?:co-?)?founder(?:\s*(?:&|and)\s*ceo)?|ceo(?:\s*(?:&|and)\s*(?:co-?)?founder)?){LABEL_SEP}([^,(|]+)"),
            Parser::Text,
        ),
        (
            FounderProfileUrl,
            r"(https?://(?:[a-z]{2,3}\.)?linkedin\.com/in/[a-z0-9_%\-]+/?)".to_string(),
            Parser::Text,
        ),
        (CofounderCount, format!(r"^co-?founders{LABEL_SEP}(.+)$"), Parser::Names),
    ]
}

/// Line-oriented field extractor with its patterns compiled once
pub struct DocumentExtractor {
    rules: Vec<(Field, Regex, Parser)>,
}

impl Default for DocumentExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentExtractor {
    pub fn new() -> Self {
        let rules = rules()
            .into_iter()
            .filter_map(|(field, pattern, parser)| match Regex::new(&format!("(?i){pattern}")) {
                Ok(regex) => Some((field, regex, parser)),
                Err(e) => {
                    warn!(field = %field, error = %e, "Skipping invalid extraction pattern");
                    None
                }
            })
            .collect();
        Self { rules }
    }

    /// Extract every field from `text` without a deadline
    pub fn extract(&self, text: &str) -> Fragment {
        let mut fragment = Fragment::new(NAME, SourceKind::Document);
        for line in text.lines() {
            self.extract_line(line, &mut fragment);
        }
        fragment
    }

    /// Extract until done or until `deadline`, yielding to the runtime
    /// periodically
    pub async fn extract_until(&self, text: &str, deadline: Deadline) -> AgentOutcome {
        let mut fragment = Fragment::new(NAME, SourceKind::Document);
        for (index, line) in text.lines().enumerate() {
            if Instant::now() >= deadline {
                debug!(lines = index, fields = fragment.len(), "Deadline reached mid-document");
                return AgentOutcome::failed_with_partial(FailureReason::Timeout, fragment);
            }
            if index > 0 && index % YIELD_EVERY == 0 {
                tokio::task::yield_now().await;
            }
            self.extract_line(line, &mut fragment);
        }
        finish(NAME, Ok(fragment))
    }

    fn extract_line(&self, line: &str, fragment: &mut Fragment) {
        let line = line.trim().trim_start_matches(['-', '*', '#', '>', ' ']);
        if line.is_empty() {
            return;
        }
        for (field, regex, parser) in &self.rules {
            if fragment.get(*field).is_some() {
                continue;
            }
            let Some(raw) = regex.captures(line).and_then(|c| c.get(1)) else {
                continue;
            };
            if let Some(value) = parse_value(*parser, raw.as_str()) {
                fragment.insert(*field, value, SourceKind::Document.default_confidence());
            }
        }
    }
}

fn parse_value(parser: Parser, raw: &str) -> Option<FieldValue> {
    match parser {
        Parser::Text => {
            let text = raw.trim().trim_end_matches(['.', ',', ';', '*']).trim();
            (!text.is_empty()).then(|| FieldValue::Text(text.chars().take(MAX_TEXT_CHARS).collect()))
        }
        Parser::Amount => amount(raw).map(FieldValue::Number),
        Parser::Year => year(raw).map(|y| FieldValue::Number(f64::from(y))),
        Parser::Headcount => headcount(raw).map(FieldValue::Number),
        Parser::Names => {
            let count = raw
                .split([',', ';', '&'])
                .flat_map(|part| part.split(" and "))
                .filter(|name| !name.trim().is_empty())
                .count();
            (count > 0).then_some(FieldValue::Number(count as f64))
        }
    }
}

/// Extracts evidence from the document supplied with the request
pub struct DocumentAgent {
    extractor: DocumentExtractor,
}

impl Default for DocumentAgent {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentAgent {
    pub fn new() -> Self {
        Self {
            extractor: DocumentExtractor::new(),
        }
    }
}

#[async_trait]
impl EvidenceAgent for DocumentAgent {
    async fn run(&self, context: &QueryContext, deadline: Deadline) -> AgentOutcome {
        let Some(document) = context.document() else {
            return AgentOutcome::failed(FailureReason::MissingInput(
                "no document supplied".to_string(),
            ));
        };
        if document.is_pdf() {
            return AgentOutcome::failed(FailureReason::MissingInput(format!(
                "{} is a PDF; supply its extracted text",
                document.path().display()
            )));
        }

        let text = match tokio::fs::read_to_string(document.path()).await {
            Ok(text) => text,
            Err(e) => return AgentOutcome::failed(SourceError::from(e).into()),
        };
        debug!(path = %document.path().display(), bytes = text.len(), "Read document");

        self.extractor.extract_until(&text, deadline).await
    }

    fn name(&self) -> &str {
        NAME
    }

    fn source(&self) -> SourceKind {
        SourceKind::Document
    }

    fn requires(&self) -> &[ContextInput] {
        &[ContextInput::Document]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::time::Duration;

    const PITCH: &str = "\
# Acme Robotics
Company: Acme Robotics
Founded in 2019, headquartered in Austin, TX.
Industry: Warehouse automation
Business model: B2B SaaS
Website: https://acme.example

## Traction
- ARR: $1.2M
- Revenue growth: 120% YoY
- Gross margin: 68%
- Monthly burn: $150k
- Runway: 18 months
- 42 paying customers
- CAC: $12,000
- LTV: $90,000

## Team
CEO & Co-founder: Jane Doe (https://www.linkedin.com/in/jane-doe)
Co-founders: Jane Doe, John Roe and Ada Poe
35 employees

## The ask
Raising $3M at a pre-money valuation of $15M
";

    fn number(fragment: &Fragment, field: Field) -> Option<f64> {
        fragment.get(field).and_then(|entry| entry.value.as_number())
    }

    fn text(fragment: &Fragment, field: Field) -> Option<&str> {
        fragment.get(field).and_then(|entry| entry.value.as_text())
    }

    #[test]
    fn test_extracts_pitch_fields() {
        let fragment = DocumentExtractor::new().extract(PITCH);

        assert_eq!(text(&fragment, Field::CompanyName), Some("Acme Robotics"));
        assert_eq!(number(&fragment, Field::FoundingYear), Some(2019.0));
        assert_eq!(text(&fragment, Field::Headquarters), Some("Austin, TX"));
        assert_eq!(text(&fragment, Field::Industry), Some("Warehouse automation"));
        assert_eq!(text(&fragment, Field::BusinessModel), Some("B2B SaaS"));
        assert_eq!(number(&fragment, Field::AnnualRecurringRevenue), Some(1_200_000.0));
        assert_eq!(number(&fragment, Field::RevenueGrowthRate), Some(120.0));
        assert_eq!(number(&fragment, Field::GrossMargin), Some(68.0));
        assert_eq!(number(&fragment, Field::MonthlyCashBurn), Some(150_000.0));
        assert_eq!(number(&fragment, Field::RunwayMonths), Some(18.0));
        assert_eq!(number(&fragment, Field::CustomerCount), Some(42.0));
        assert_eq!(number(&fragment, Field::CustomerAcquisitionCost), Some(12_000.0));
        assert_eq!(number(&fragment, Field::CustomerLifetimeValue), Some(90_000.0));
        assert_eq!(text(&fragment, Field::FounderName), Some("Jane Doe"));
        assert_eq!(
            text(&fragment, Field::FounderProfileUrl),
            Some("https://www.linkedin.com/in/jane-doe")
        );
        assert_eq!(number(&fragment, Field::CofounderCount), Some(3.0));
        assert_eq!(number(&fragment, Field::EmployeeCount), Some(35.0));
        assert_eq!(number(&fragment, Field::FundingRequired), Some(3_000_000.0));
        assert_eq!(number(&fragment, Field::PreMoneyValuation), Some(15_000_000.0));
    }

    #[test]
    fn test_entries_use_document_confidence() {
        let fragment = DocumentExtractor::new().extract("ARR: $2M");
        let entry = fragment.get(Field::AnnualRecurringRevenue).unwrap();
        assert!((entry.confidence - 0.9).abs() < f64::EPSILON);
    }

    #[test]
    fn test_first_mention_wins() {
        let fragment = DocumentExtractor::new().extract("ARR: $1M\nARR: $5M");
        assert_eq!(number(&fragment, Field::AnnualRecurringRevenue), Some(1_000_000.0));
    }

    #[test]
    fn test_unlabelled_text_yields_nothing() {
        let fragment = DocumentExtractor::new().extract("We love robots.\nThey are great.");
        assert!(fragment.is_empty());
    }

    #[tokio::test]
    async fn test_expired_deadline_returns_partial() {
        let extractor = DocumentExtractor::new();
        let outcome = extractor
            .extract_until(PITCH, Instant::now() - Duration::from_millis(1))
            .await;
        assert_eq!(outcome.failure(), Some(&FailureReason::Timeout));
        assert!(outcome.fragment().is_none());
    }

    #[tokio::test]
    async fn test_agent_reads_document() {
        let mut file = tempfile::Builder::new().suffix(".md").tempfile().unwrap();
        file.write_all(PITCH.as_bytes()).unwrap();

        let context = QueryContext::builder().document(file.path()).build().unwrap();
        let deadline = Instant::now() + Duration::from_secs(5);
        let outcome = DocumentAgent::new().run(&context, deadline).await;

        assert!(outcome.is_success());
        let fragment = outcome.fragment().unwrap();
        assert_eq!(fragment.agent(), "document");
        assert_eq!(text(fragment, Field::CompanyName), Some("Acme Robotics"));
    }

    #[tokio::test]
    async fn test_missing_and_pdf_documents() {
        let deadline = Instant::now() + Duration::from_secs(5);
        let agent = DocumentAgent::new();

        let no_document = QueryContext::builder().company_name("Acme").build().unwrap();
        let outcome = agent.run(&no_document, deadline).await;
        assert!(outcome.failure().is_some_and(FailureReason::is_missing_input));

        let pdf = QueryContext::builder().document("deck.pdf").build().unwrap();
        let outcome = agent.run(&pdf, deadline).await;
        assert!(outcome.failure().is_some_and(FailureReason::is_missing_input));
    }

    #[tokio::test]
    async fn test_unreadable_document_is_a_provider_failure() {
        let context = QueryContext::builder()
            .document("/definitely/not/here.md")
            .build()
            .unwrap();
        let deadline = Instant::now() + Duration::from_secs(5);
        let outcome = DocumentAgent::new().run(&context, deadline).await;
        assert_eq!(outcome.failure().map(FailureReason::label), Some("provider"));
    }
}
