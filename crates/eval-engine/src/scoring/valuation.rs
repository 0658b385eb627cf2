//! Valuation scorer
//!
//! Compares the implied revenue multiple of the asking valuation with a fair
//! multiple range adjusted for growth, and reports the suggested valuation
//! band as metrics.

use eval_core::{Field, Result};

use super::{Evidence, ScoreKind, ScoreResult, ScoreSheet, Scorer};
use crate::record::CanonicalRecord;

const NEEDS: &[Field] = &[
    Field::PreMoneyValuation,
    Field::AnnualRecurringRevenue,
    Field::RevenueGrowthRate,
    Field::FundingRequired,
];

/// Fair ARR multiple range for a company with no growth
const BASE_MULTIPLE_LOW: f64 = 6.0;
const BASE_MULTIPLE_HIGH: f64 = 12.0;

#[derive(Debug, Clone)]
pub struct ValuationScorer {
    rationale_max_chars: usize,
}

impl ValuationScorer {
    pub fn new(rationale_max_chars: usize) -> Self {
        Self {
            rationale_max_chars,
        }
    }
}

impl Default for ValuationScorer {
    fn default() -> Self {
        Self::new(600)
    }
}

impl Scorer for ValuationScorer {
    fn kind(&self) -> ScoreKind {
        ScoreKind::Valuation
    }

    fn needs(&self) -> &'static [Field] {
        NEEDS
    }

    fn score(&self, record: &CanonicalRecord) -> Result<ScoreResult> {
        let mut sheet = ScoreSheet::new(self.kind());

        let arr = record
            .number(Field::AnnualRecurringRevenue)
            .or_else(|| record.number(Field::Revenue))
            .filter(|arr| *arr > 0.0);

        // Growth of 100% doubles the fair multiple; shrinking halves it at most
        let adjustment = record
            .number(Field::RevenueGrowthRate)
            .map_or(0.0, |growth| (growth / 100.0).clamp(-0.5, 3.0));
        let low = BASE_MULTIPLE_LOW * (1.0 + adjustment);
        let high = BASE_MULTIPLE_HIGH * (1.0 + adjustment);
        sheet.metric("fair_multiple_low", low);
        sheet.metric("fair_multiple_high", high);

        if let Some(arr) = arr {
            sheet.metric("suggested_valuation_low", arr * low);
            sheet.metric("suggested_valuation_high", arr * high);
        }

        if let (Some(arr), Some(pre_money)) = (arr, record.number(Field::PreMoneyValuation)) {
            let implied = pre_money / arr;
            sheet.metric("implied_multiple", implied);
            let score = if implied < low {
                90.0
            } else if implied <= high {
                85.0
            } else {
                85.0 - (implied / high - 1.0) * 60.0
            };
            sheet.component(
                score,
                format!("asking {implied:.1}x ARR against a fair {low:.1}x-{high:.1}x"),
            );
        }

        if let (Some(arr), Some(funding)) = (arr, record.number(Field::FundingRequired)) {
            let ratio = funding / arr;
            sheet.metric("funding_to_arr", ratio);
            let score = if ratio <= 1.0 {
                85.0
            } else if ratio <= 3.0 {
                65.0
            } else {
                65.0 - (ratio - 3.0) * 10.0
            };
            sheet.component(score, format!("raising {ratio:.1}x ARR"));
        }

        Ok(sheet.finish(&Evidence::new(record, NEEDS), self.rationale_max_chars))
    }
}
