//! News agent
//!
//! Searches recent coverage of the company and scores it with small keyword
//! lexicons. Each article gets a polarity of `(positive - negative) / hits`;
//! the company's sentiment is the mean over articles with any hits.

use async_trait::async_trait;
use eval_core::{
    AgentOutcome, ContextInput, Deadline, EvidenceAgent, Field, Fragment, QueryContext,
    SourceKind,
};
use serde::Serialize;
use tracing::debug;

use super::{finish, require};
use crate::api::{Article, NewsApiClient};
use crate::error::Result;

const NAME: &str = "news";

const POSITIVE: &[&str] = &[
    "growth", "raises", "raised", "funding", "launch", "partnership", "award", "record",
    "expands", "expansion", "profitable", "breakthrough", "strong", "surge", "milestone",
    "acquires", "wins", "innovative",
];

const NEGATIVE: &[&str] = &[
    "layoff", "layoffs", "lawsuit", "fraud", "scandal", "decline", "bankrupt", "bankruptcy",
    "shutdown", "shuts down", "loss", "losses", "investigation", "breach", "recall", "fined",
    "crisis", "collapse", "downturn", "controversy",
];

const LITIGATION: &[&str] = &[
    "lawsuit", "sued", "sues", "litigation", "class action", "court", "settlement",
    "complaint filed", "indicted",
];

const REGULATORY: &[&str] = &[
    "regulator", "regulatory", "sec charges", "ftc", "antitrust", "sanction", "sanctions",
    "compliance violation", "probe", "fined", "investigation",
];

/// Lexicon summary of a set of articles
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NewsDigest {
    pub article_count: usize,
    /// Mean polarity in [-1, 1]; `None` when no article hit either lexicon
    pub sentiment: Option<f64>,
    pub negative_articles: usize,
    pub litigation_mentions: usize,
    pub regulatory_risk: bool,
}

fn hits(text: &str, lexicon: &[&str]) -> usize {
    lexicon.iter().filter(|term| text.contains(*term)).count()
}

impl NewsDigest {
    pub fn from_articles(articles: &[Article]) -> Self {
        let mut digest = Self {
            article_count: articles.len(),
            ..Self::default()
        };
        let mut polarity_sum = 0.0;
        let mut scored = 0usize;

        for article in articles {
            let text = article.text().to_lowercase();
            let positive = hits(&text, POSITIVE);
            let negative = hits(&text, NEGATIVE);

            if positive + negative > 0 {
                polarity_sum += (positive as f64 - negative as f64) / (positive + negative) as f64;
                scored += 1;
            }
            if negative > positive {
                digest.negative_articles += 1;
            }
            digest.litigation_mentions += hits(&text, LITIGATION);
            digest.regulatory_risk |= hits(&text, REGULATORY) > 0;
        }

        if scored > 0 {
            digest.sentiment = Some((polarity_sum / scored as f64).clamp(-1.0, 1.0));
        }
        digest
    }

    pub fn into_fragment(self) -> Fragment {
        let mut fragment = Fragment::new(NAME, SourceKind::News)
            .with(Field::NewsArticleCount, self.article_count as f64)
            .with(Field::NegativeNewsCount, self.negative_articles as f64)
            .with(Field::LitigationMentions, self.litigation_mentions as f64)
            .with(Field::RegulatoryRisk, self.regulatory_risk);
        if let Some(sentiment) = self.sentiment {
            fragment.insert(
                Field::NewsSentiment,
                sentiment.into(),
                SourceKind::News.default_confidence(),
            );
        }
        fragment
    }
}

/// Derives news-coverage risk signals for the company
pub struct NewsAgent {
    client: NewsApiClient,
}

impl NewsAgent {
    pub fn new(client: NewsApiClient) -> Self {
        Self { client }
    }

    async fn collect(&self, context: &QueryContext, deadline: Deadline) -> Result<Fragment> {
        let company = require(context.company_name(), "company name")?;
        let articles = self.client.search(&format!("\"{company}\""), deadline).await?;
        let digest = NewsDigest::from_articles(&articles);
        debug!(
            company,
            articles = digest.article_count,
            sentiment = ?digest.sentiment,
            "Digested news coverage"
        );
        Ok(digest.into_fragment())
    }
}

#[async_trait]
impl EvidenceAgent for NewsAgent {
    async fn run(&self, context: &QueryContext, deadline: Deadline) -> AgentOutcome {
        finish(NAME, self.collect(context, deadline).await)
    }

    fn name(&self) -> &str {
        NAME
    }

    fn source(&self) -> SourceKind {
        SourceKind::News
    }

    fn requires(&self) -> &[ContextInput] {
        &[ContextInput::CompanyName]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::ResponseCache;
    use crate::config::SourcesConfig;
    use eval_core::FailureReason;
    use std::time::Duration;
    use tokio::time::Instant;

    fn article(title: &str, description: &str) -> Article {
        Article {
            title: Some(title.to_string()),
            description: Some(description.to_string()),
            ..Article::default()
        }
    }

    #[test]
    fn test_digest_mixed_coverage() {
        let articles = [
            article("Acme raises $20M Series A", "Strong growth in warehouse robotics"),
            article("Acme faces lawsuit over patents", "Competitor sued in federal court"),
            article("Acme opens Denver office", "The company hired locally"),
        ];
        let digest = NewsDigest::from_articles(&articles);

        assert_eq!(digest.article_count, 3);
        assert_eq!(digest.negative_articles, 1);
        // lawsuit, sued, court
        assert_eq!(digest.litigation_mentions, 3);
        assert!(!digest.regulatory_risk);
        // first article +1, second -1
        let sentiment = digest.sentiment.unwrap();
        assert!(sentiment.abs() < 1e-9);
    }

    #[test]
    fn test_regulatory_terms_raise_flag() {
        let digest = NewsDigest::from_articles(&[article(
            "FTC opens antitrust probe into Acme",
            "Regulators question the merger",
        )]);
        assert!(digest.regulatory_risk);
    }

    #[test]
    fn test_no_articles_still_reports_count() {
        let fragment = NewsDigest::from_articles(&[]).into_fragment();
        assert_eq!(
            fragment.get(Field::NewsArticleCount).and_then(|e| e.value.as_number()),
            Some(0.0)
        );
        assert!(fragment.get(Field::NewsSentiment).is_none());
        assert_eq!(
            fragment.get(Field::RegulatoryRisk).and_then(|e| e.value.as_flag()),
            Some(false)
        );
    }

    #[test]
    fn test_sentiment_bounds() {
        let digest = NewsDigest::from_articles(&[article(
            "Fraud scandal ends in bankruptcy",
            "Layoffs follow the collapse",
        )]);
        assert_eq!(digest.sentiment, Some(-1.0));
        assert_eq!(digest.negative_articles, 1);
    }

    #[tokio::test]
    async fn test_unconfigured_key_is_provider_failure() {
        let cache = ResponseCache::new(Duration::from_secs(60));
        let agent = NewsAgent::new(NewsApiClient::new(&SourcesConfig::default(), cache).unwrap());
        let context = QueryContext::builder().company_name("Acme").build().unwrap();

        let outcome = agent.run(&context, Instant::now() + Duration::from_secs(1)).await;
        assert_eq!(outcome.failure().map(FailureReason::label), Some("provider"));
    }
}
