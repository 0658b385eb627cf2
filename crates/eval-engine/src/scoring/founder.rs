//! Founder quality scorer

use eval_core::{Field, Result};

use super::{Evidence, ScoreKind, ScoreResult, ScoreSheet, Scorer, scale};
use crate::record::CanonicalRecord;

const NEEDS: &[Field] = &[
    Field::FounderName,
    Field::FounderTitle,
    Field::FounderYearsExperience,
    Field::FounderPriorExits,
    Field::FounderSkills,
    Field::CofounderCount,
];

const EXECUTIVE_TITLES: &[&str] = &["ceo", "founder", "chief", "president", "owner"];
const SENIOR_TITLES: &[&str] = &["cto", "coo", "cfo", "vp", "vice president", "director", "head", "partner"];

#[derive(Debug, Clone)]
pub struct FounderScorer {
    rationale_max_chars: usize,
}

impl FounderScorer {
    pub fn new(rationale_max_chars: usize) -> Self {
        Self {
            rationale_max_chars,
        }
    }
}

impl Default for FounderScorer {
    fn default() -> Self {
        Self::new(600)
    }
}

impl Scorer for FounderScorer {
    fn kind(&self) -> ScoreKind {
        ScoreKind::Founder
    }

    fn needs(&self) -> &'static [Field] {
        NEEDS
    }

    fn score(&self, record: &CanonicalRecord) -> Result<ScoreResult> {
        let mut sheet = ScoreSheet::new(self.kind());

        if let Some(years) = record.number(Field::FounderYearsExperience) {
            sheet.metric("years_experience", years);
            sheet.component(scale(years, 0.0, 15.0), format!("{years:.0} years of experience"));
        }

        if let Some(exits) = record.number(Field::FounderPriorExits) {
            sheet.metric("prior_exits", exits);
            let score = if exits >= 2.0 {
                100.0
            } else if exits >= 1.0 {
                75.0
            } else {
                30.0
            };
            sheet.component(score, format!("{exits:.0} prior exits"));
        }

        if let Some(skills) = record.list(Field::FounderSkills) {
            let count = skills.len() as f64;
            sheet.metric("skill_count", count);
            sheet.component(scale(count, 0.0, 10.0), format!("{count:.0} listed skills"));
        }

        if let Some(cofounders) = record.number(Field::CofounderCount) {
            sheet.metric("cofounder_count", cofounders);
            let score = match cofounders {
                n if n < 1.0 => 40.0,
                n if n <= 2.0 => 90.0,
                n if n <= 3.0 => 75.0,
                _ => 60.0,
            };
            sheet.component(score, format!("{cofounders:.0} co-founders"));
        }

        if let Some(title) = record.text(Field::FounderTitle) {
            let score = title_seniority(title);
            sheet.metric("title_seniority", score);
            sheet.component(score, format!("title '{title}'"));
        }

        Ok(sheet.finish(&Evidence::new(record, NEEDS), self.rationale_max_chars))
    }
}

fn title_seniority(title: &str) -> f64 {
    let title = title.to_lowercase();
    if EXECUTIVE_TITLES.iter().any(|t| title.contains(t)) {
        90.0
    } else if SENIOR_TITLES.iter().any(|t| title.contains(t)) {
        75.0
    } else {
        50.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::tests::record_with;
    use eval_core::FieldValue;

    #[test]
    fn test_title_seniority() {
        assert!((title_seniority("Co-Founder & CEO") - 90.0).abs() < f64::EPSILON);
        assert!((title_seniority("VP Engineering") - 75.0).abs() < f64::EPSILON);
        assert!((title_seniority("Engineer") - 50.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_experienced_founder_scores_high() {
        let record = record_with(&[
            (Field::FounderName, FieldValue::from("Jane Doe"), 0.75),
            (Field::FounderTitle, FieldValue::from("CEO"), 0.75),
            (Field::FounderYearsExperience, FieldValue::Number(14.0), 0.75),
            (Field::FounderPriorExits, FieldValue::Number(2.0), 0.75),
            (
                Field::FounderSkills,
                FieldValue::List((0..8).map(|i| format!("skill-{i}")).collect()),
                0.75,
            ),
            (Field::CofounderCount, FieldValue::Number(2.0), 0.9),
        ]);
        let result = FounderScorer::default().score(&record).unwrap();
        assert!(result.score > 80.0, "score was {}", result.score);
        assert!(result.missing_fields.is_empty());
    }

    #[test]
    fn test_name_alone_is_not_usable_evidence() {
        let record = record_with(&[(Field::FounderName, FieldValue::from("Jane Doe"), 0.75)]);
        let result = FounderScorer::default().score(&record).unwrap();
        assert!((result.score - 50.0).abs() < f64::EPSILON);
        assert!(result.confidence.abs() < f64::EPSILON);
        assert!(result.completeness > 0.0);
    }
}
