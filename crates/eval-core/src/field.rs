//! Canonical fields and their values

use serde::{Deserialize, Serialize};
use std::fmt;

/// Group a canonical field belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldCategory {
    Company,
    Financial,
    Operational,
    Founder,
    Risk,
}

/// Shape of the value a field holds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueKind {
    Text,
    Number,
    Flag,
    List,
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ValueKind::Text => "text",
            ValueKind::Number => "number",
            ValueKind::Flag => "flag",
            ValueKind::List => "list",
        };
        f.write_str(name)
    }
}

/// Every field the canonical record recognises
///
/// Monetary amounts are in USD, rates and margins in percent, durations in
/// months or years as the name says. `news_sentiment` lies in [-1, 1].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    // Company metadata
    CompanyName,
    Industry,
    Headquarters,
    FoundingYear,
    BusinessModel,
    Website,
    EmployeeCount,
    OneSentencePitch,
    FounderProfileUrl,

    // Financial metrics
    Revenue,
    AnnualRecurringRevenue,
    NetIncome,
    TotalAssets,
    TotalLiabilities,
    MonthlyCashBurn,
    RunwayMonths,
    GrossMargin,
    RevenueGrowthRate,
    FundingRequired,
    PreMoneyValuation,

    // Operational metrics
    CustomerCount,
    CustomerAcquisitionCost,
    CustomerLifetimeValue,
    NewsArticleCount,

    // Founder metrics
    FounderName,
    FounderTitle,
    FounderYearsExperience,
    FounderPriorExits,
    FounderSkills,
    CofounderCount,

    // Risk indicators
    NewsSentiment,
    NegativeNewsCount,
    LitigationMentions,
    RegulatoryRisk,
    PoliticallyExposedFounder,
}

impl Field {
    pub const ALL: [Field; 35] = [
        Field::CompanyName,
        Field::Industry,
        Field::Headquarters,
        Field::FoundingYear,
        Field::BusinessModel,
        Field::Website,
        Field::EmployeeCount,
        Field::OneSentencePitch,
        Field::FounderProfileUrl,
        Field::Revenue,
        Field::AnnualRecurringRevenue,
        Field::NetIncome,
        Field::TotalAssets,
        Field::TotalLiabilities,
        Field::MonthlyCashBurn,
        Field::RunwayMonths,
        Field::GrossMargin,
        Field::RevenueGrowthRate,
        Field::FundingRequired,
        Field::PreMoneyValuation,
        Field::CustomerCount,
        Field::CustomerAcquisitionCost,
        Field::CustomerLifetimeValue,
        Field::NewsArticleCount,
        Field::FounderName,
        Field::FounderTitle,
        Field::FounderYearsExperience,
        Field::FounderPriorExits,
        Field::FounderSkills,
        Field::CofounderCount,
        Field::NewsSentiment,
        Field::NegativeNewsCount,
        Field::LitigationMentions,
        Field::RegulatoryRisk,
        Field::PoliticallyExposedFounder,
    ];

    pub fn category(&self) -> FieldCategory {
        use Field::*;
        match self {
            CompanyName | Industry | Headquarters | FoundingYear | BusinessModel | Website
            | EmployeeCount | OneSentencePitch | FounderProfileUrl => FieldCategory::Company,
            Revenue | AnnualRecurringRevenue | NetIncome | TotalAssets | TotalLiabilities
            | MonthlyCashBurn | RunwayMonths | GrossMargin | RevenueGrowthRate
            | FundingRequired | PreMoneyValuation => FieldCategory::Financial,
            CustomerCount | CustomerAcquisitionCost | CustomerLifetimeValue
            | NewsArticleCount => FieldCategory::Operational,
            FounderName | FounderTitle | FounderYearsExperience | FounderPriorExits
            | FounderSkills | CofounderCount => FieldCategory::Founder,
            NewsSentiment | NegativeNewsCount | LitigationMentions | RegulatoryRisk
            | PoliticallyExposedFounder => FieldCategory::Risk,
        }
    }

    pub fn kind(&self) -> ValueKind {
        use Field::*;
        match self {
            CompanyName | Industry | Headquarters | BusinessModel | Website
            | OneSentencePitch | FounderProfileUrl | FounderName | FounderTitle => ValueKind::Text,
            RegulatoryRisk | PoliticallyExposedFounder => ValueKind::Flag,
            FounderSkills => ValueKind::List,
            _ => ValueKind::Number,
        }
    }

    pub fn as_str(&self) -> &'static str {
        use Field::*;
        match self {
            CompanyName => "company_name",
            Industry => "industry",
            Headquarters => "headquarters",
            FoundingYear => "founding_year",
            BusinessModel => "business_model",
            Website => "website",
            EmployeeCount => "employee_count",
            OneSentencePitch => "one_sentence_pitch",
            FounderProfileUrl => "founder_profile_url",
            Revenue => "revenue",
            AnnualRecurringRevenue => "annual_recurring_revenue",
            NetIncome => "net_income",
            TotalAssets => "total_assets",
            TotalLiabilities => "total_liabilities",
            MonthlyCashBurn => "monthly_cash_burn",
            RunwayMonths => "runway_months",
            GrossMargin => "gross_margin",
            RevenueGrowthRate => "revenue_growth_rate",
            FundingRequired => "funding_required",
            PreMoneyValuation => "pre_money_valuation",
            CustomerCount => "customer_count",
            CustomerAcquisitionCost => "customer_acquisition_cost",
            CustomerLifetimeValue => "customer_lifetime_value",
            NewsArticleCount => "news_article_count",
            FounderName => "founder_name",
            FounderTitle => "founder_title",
            FounderYearsExperience => "founder_years_experience",
            FounderPriorExits => "founder_prior_exits",
            FounderSkills => "founder_skills",
            CofounderCount => "cofounder_count",
            NewsSentiment => "news_sentiment",
            NegativeNewsCount => "negative_news_count",
            LitigationMentions => "litigation_mentions",
            RegulatoryRisk => "regulatory_risk",
            PoliticallyExposedFounder => "politically_exposed_founder",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A value held by a canonical field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum FieldValue {
    Text(String),
    Number(f64),
    Flag(bool),
    List(Vec<String>),
}

impl FieldValue {
    pub fn kind(&self) -> ValueKind {
        match self {
            FieldValue::Text(_) => ValueKind::Text,
            FieldValue::Number(_) => ValueKind::Number,
            FieldValue::Flag(_) => ValueKind::Flag,
            FieldValue::List(_) => ValueKind::List,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            FieldValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_flag(&self) -> Option<bool> {
        match self {
            FieldValue::Flag(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[String]> {
        match self {
            FieldValue::List(items) => Some(items),
            _ => None,
        }
    }

    /// Whether the value carries real evidence
    ///
    /// Non-finite numbers and blank text are placeholders, not data.
    pub fn is_well_formed(&self) -> bool {
        match self {
            FieldValue::Text(s) => !s.trim().is_empty(),
            FieldValue::Number(n) => n.is_finite(),
            FieldValue::Flag(_) => true,
            FieldValue::List(items) => items.iter().any(|s| !s.trim().is_empty()),
        }
    }

    /// Normalised agreement test used by the consolidator
    ///
    /// Text compares after case and whitespace folding, numbers within a
    /// relative `tolerance`, lists as folded sets.
    pub fn agrees_with(&self, other: &FieldValue, tolerance: f64) -> bool {
        match (self, other) {
            (FieldValue::Text(a), FieldValue::Text(b)) => fold(a) == fold(b),
            (FieldValue::Number(a), FieldValue::Number(b)) => {
                let scale = a.abs().max(b.abs());
                (a - b).abs() <= tolerance * scale || a == b
            }
            (FieldValue::Flag(a), FieldValue::Flag(b)) => a == b,
            (FieldValue::List(a), FieldValue::List(b)) => folded_set(a) == folded_set(b),
            _ => false,
        }
    }

    /// Stable textual form used as the last tie-break when ordering values
    pub fn canonical(&self) -> String {
        match self {
            FieldValue::Text(s) => fold(s),
            FieldValue::Number(n) => format!("{n:.6}"),
            FieldValue::Flag(b) => b.to_string(),
            FieldValue::List(items) => folded_set(items).join(","),
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Text(s) => f.write_str(s),
            FieldValue::Number(n) => {
                if n.fract() == 0.0 && n.abs() < 1e15 {
                    write!(f, "{n:.0}")
                } else {
                    write!(f, "{n:.2}")
                }
            }
            FieldValue::Flag(b) => write!(f, "{}", if *b { "yes" } else { "no" }),
            FieldValue::List(items) => f.write_str(&items.join(", ")),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        FieldValue::Text(s.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        FieldValue::Text(s)
    }
}

impl From<f64> for FieldValue {
    fn from(n: f64) -> Self {
        FieldValue::Number(n)
    }
}

impl From<u32> for FieldValue {
    fn from(n: u32) -> Self {
        FieldValue::Number(f64::from(n))
    }
}

impl From<bool> for FieldValue {
    fn from(b: bool) -> Self {
        FieldValue::Flag(b)
    }
}

impl From<Vec<String>> for FieldValue {
    fn from(items: Vec<String>) -> Self {
        FieldValue::List(items)
    }
}

fn fold(s: &str) -> String {
    s.split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}

fn folded_set(items: &[String]) -> Vec<String> {
    let mut folded: Vec<String> = items
        .iter()
        .map(|s| fold(s))
        .filter(|s| !s.is_empty())
        .collect();
    folded.sort();
    folded.dedup();
    folded
}
