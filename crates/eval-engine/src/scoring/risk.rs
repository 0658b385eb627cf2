//! Risk scorer; higher scores mean riskier

use eval_core::{Field, Result};

use super::{Evidence, ScoreKind, ScoreResult, ScoreSheet, Scorer};
use crate::record::CanonicalRecord;

const NEEDS: &[Field] = &[
    Field::NewsSentiment,
    Field::NegativeNewsCount,
    Field::LitigationMentions,
    Field::RegulatoryRisk,
    Field::PoliticallyExposedFounder,
];

#[derive(Debug, Clone)]
pub struct RiskScorer {
    rationale_max_chars: usize,
}

impl RiskScorer {
    pub fn new(rationale_max_chars: usize) -> Self {
        Self {
            rationale_max_chars,
        }
    }
}

impl Default for RiskScorer {
    fn default() -> Self {
        Self::new(600)
    }
}

impl Scorer for RiskScorer {
    fn kind(&self) -> ScoreKind {
        ScoreKind::Risk
    }

    fn needs(&self) -> &'static [Field] {
        NEEDS
    }

    fn score(&self, record: &CanonicalRecord) -> Result<ScoreResult> {
        let mut sheet = ScoreSheet::new(self.kind());

        if let Some(sentiment) = record.number(Field::NewsSentiment) {
            let sentiment = sentiment.clamp(-1.0, 1.0);
            sheet.metric("news_sentiment", sentiment);
            sheet.component(
                (1.0 - sentiment) / 2.0 * 100.0,
                format!("news sentiment {sentiment:+.2}"),
            );
        }

        if let Some(negative) = record.number(Field::NegativeNewsCount) {
            sheet.metric("negative_news_count", negative);
            if let Some(total) = record.number(Field::NewsArticleCount) {
                if total > 0.0 {
                    sheet.metric("negative_news_share", negative / total);
                }
            }
            sheet.component(negative * 15.0, format!("{negative:.0} negative articles"));
        }

        if let Some(mentions) = record.number(Field::LitigationMentions) {
            sheet.metric("litigation_mentions", mentions);
            let note = format!("{mentions:.0} litigation mentions");
            if mentions > 0.0 {
                sheet.red_flag(mentions * 25.0, note);
            } else {
                sheet.component(0.0, note);
            }
        }

        match record.flag(Field::RegulatoryRisk) {
            Some(true) => sheet.red_flag(80.0, "regulatory exposure reported"),
            Some(false) => sheet.component(10.0, "no regulatory exposure reported"),
            None => {}
        }

        match record.flag(Field::PoliticallyExposedFounder) {
            Some(true) => sheet.red_flag(90.0, "founder is politically exposed"),
            Some(false) => sheet.component(5.0, "founder is not politically exposed"),
            None => {}
        }

        Ok(sheet.finish(&Evidence::new(record, NEEDS), self.rationale_max_chars))
    }
}
