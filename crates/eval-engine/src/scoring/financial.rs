//! Financial health scorer

use eval_core::{Field, Result};

use super::{Evidence, ScoreKind, ScoreResult, ScoreSheet, Scorer, scale};
use crate::record::CanonicalRecord;

const NEEDS: &[Field] = &[
    Field::AnnualRecurringRevenue,
    Field::Revenue,
    Field::NetIncome,
    Field::TotalAssets,
    Field::TotalLiabilities,
    Field::MonthlyCashBurn,
    Field::RunwayMonths,
    Field::GrossMargin,
    Field::RevenueGrowthRate,
];

/// Runway considered comfortable for an early-stage company
const TARGET_RUNWAY_MONTHS: f64 = 24.0;

/// Scores revenue scale, profitability, leverage, runway, burn, margin and growth
#[derive(Debug, Clone)]
pub struct FinancialScorer {
    rationale_max_chars: usize,
}

impl FinancialScorer {
    pub fn new(rationale_max_chars: usize) -> Self {
        Self {
            rationale_max_chars,
        }
    }
}

impl Default for FinancialScorer {
    fn default() -> Self {
        Self::new(600)
    }
}

impl Scorer for FinancialScorer {
    fn kind(&self) -> ScoreKind {
        ScoreKind::Financial
    }

    fn needs(&self) -> &'static [Field] {
        NEEDS
    }

    fn score(&self, record: &CanonicalRecord) -> Result<ScoreResult> {
        let mut sheet = ScoreSheet::new(self.kind());

        // ARR is the better signal for subscription businesses; fall back to revenue
        let revenue = record
            .number(Field::AnnualRecurringRevenue)
            .or_else(|| record.number(Field::Revenue));

        if let Some(revenue) = revenue {
            sheet.metric("revenue_basis", revenue);
            let score = if revenue > 0.0 {
                // $10k scores 0, $100M scores 100
                scale(revenue.log10(), 4.0, 8.0)
            } else {
                0.0
            };
            sheet.component(score, format!("revenue basis ${revenue:.0}"));
        }

        if let Some(net_income) = record.number(Field::NetIncome) {
            sheet.metric("net_income", net_income);
            let score = match revenue {
                _ if net_income > 0.0 => 85.0,
                _ if net_income.abs() < f64::EPSILON => 50.0,
                Some(revenue) if revenue > 0.0 => {
                    let margin = net_income / revenue;
                    sheet.metric("net_margin", margin);
                    (50.0 + margin * 50.0).clamp(5.0, 50.0)
                }
                _ => 30.0,
            };
            let label = if net_income > 0.0 { "profitable" } else { "not profitable" };
            sheet.component(score, label);
        }

        if let (Some(assets), Some(liabilities)) = (
            record.number(Field::TotalAssets),
            record.number(Field::TotalLiabilities),
        ) {
            if assets > 0.0 {
                let ratio = liabilities / assets;
                sheet.metric("debt_ratio", ratio);
                sheet.component(100.0 - ratio * 60.0, format!("debt ratio {ratio:.2}"));
            }
        }

        if let Some(months) = record.number(Field::RunwayMonths) {
            sheet.metric("runway_months", months);
            sheet.component(
                months / TARGET_RUNWAY_MONTHS * 100.0,
                format!("{months:.0} months of runway"),
            );
        }

        if let Some(burn) = record.number(Field::MonthlyCashBurn) {
            sheet.metric("monthly_cash_burn", burn);
            match revenue {
                _ if burn <= 0.0 => sheet.component(90.0, "no net cash burn"),
                Some(revenue) if revenue > 0.0 => {
                    let multiple = burn * 12.0 / revenue;
                    sheet.metric("burn_multiple", multiple);
                    sheet.component(
                        100.0 - multiple * 40.0,
                        format!("annual burn {multiple:.1}x revenue"),
                    );
                }
                _ => sheet.component(20.0, "burning cash without revenue"),
            }
        }

        if let Some(margin) = record.number(Field::GrossMargin) {
            sheet.metric("gross_margin", margin);
            sheet.component(scale(margin, 20.0, 80.0), format!("gross margin {margin:.0}%"));
        }

        if let Some(growth) = record.number(Field::RevenueGrowthRate) {
            sheet.metric("revenue_growth_rate", growth);
            sheet.component(25.0 + growth * 0.5, format!("growth {growth:.0}% YoY"));
        }

        Ok(sheet.finish(&Evidence::new(record, NEEDS), self.rationale_max_chars))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::tests::record_with;
    use eval_core::FieldValue;

    fn healthy() -> CanonicalRecord {
        record_with(&[
            (Field::AnnualRecurringRevenue, FieldValue::Number(5_000_000.0), 0.9),
            (Field::Revenue, FieldValue::Number(4_800_000.0), 0.85),
            (Field::NetIncome, FieldValue::Number(250_000.0), 0.85),
            (Field::TotalAssets, FieldValue::Number(3_000_000.0), 0.85),
            (Field::TotalLiabilities, FieldValue::Number(600_000.0), 0.85),
            (Field::MonthlyCashBurn, FieldValue::Number(50_000.0), 0.9),
            (Field::RunwayMonths, FieldValue::Number(30.0), 0.9),
            (Field::GrossMargin, FieldValue::Number(75.0), 0.9),
            (Field::RevenueGrowthRate, FieldValue::Number(120.0), 0.9),
        ])
    }

    #[test]
    fn test_healthy_company_scores_high() {
        let result = FinancialScorer::default().score(&healthy()).unwrap();
        assert!(result.score > 70.0, "score was {}", result.score);
        assert!(result.missing_fields.is_empty());
        assert!((result.completeness - 1.0).abs() < f64::EPSILON);
        assert!(result.metrics.contains_key("debt_ratio"));
    }

    #[test]
    fn test_struggling_company_scores_low() {
        let record = record_with(&[
            (Field::Revenue, FieldValue::Number(50_000.0), 0.9),
            (Field::NetIncome, FieldValue::Number(-400_000.0), 0.9),
            (Field::MonthlyCashBurn, FieldValue::Number(80_000.0), 0.9),
            (Field::RunwayMonths, FieldValue::Number(3.0), 0.9),
        ]);
        let result = FinancialScorer::default().score(&record).unwrap();
        assert!(result.score < 35.0, "score was {}", result.score);
    }

    #[test]
    fn test_missing_fields_lower_confidence() {
        let full = FinancialScorer::default().score(&healthy()).unwrap();

        let half = record_with(&[
            (Field::AnnualRecurringRevenue, FieldValue::Number(5_000_000.0), 0.9),
            (Field::NetIncome, FieldValue::Number(250_000.0), 0.85),
            (Field::RunwayMonths, FieldValue::Number(30.0), 0.9),
            (Field::GrossMargin, FieldValue::Number(75.0), 0.9),
        ]);
        let partial = FinancialScorer::default().score(&half).unwrap();

        assert!(partial.confidence < full.confidence);
        assert!(partial.missing_fields.contains(&Field::TotalAssets));
        assert!(partial.rationale.contains("total_assets"));
    }
}
