//! Founder profile agent

use async_trait::async_trait;
use chrono::{Datelike, Utc};
use eval_core::{
    AgentOutcome, ContextInput, Deadline, EvidenceAgent, Field, Fragment, QueryContext,
    SourceKind,
};
use tracing::debug;
use url::Url;

use super::{finish, require};
use crate::api::{BrightDataClient, Experience, ProfileRecord};
use crate::error::Result;
use crate::parse::year;

const NAME: &str = "profile";

const EXIT_TERMS: &[&str] = &["acquired by", "sold to", "exited", "exit to", "went public", "ipo"];

const PEP_TERMS: &[&str] = &[
    "minister", "senator", "congressman", "congresswoman", "member of parliament", "governor",
    "ambassador", "mayor", "government official", "head of state", "politician",
];

/// Collects the founder's professional profile
pub struct ProfileAgent {
    client: BrightDataClient,
}

impl ProfileAgent {
    pub fn new(client: BrightDataClient) -> Self {
        Self { client }
    }

    async fn collect(&self, context: &QueryContext, deadline: Deadline) -> Result<Fragment> {
        let url = require(context.profile_url().map(Url::as_str), "profile url")?;
        let record = self.client.fetch_profile(url, deadline).await?;
        debug!(profile = url, positions = record.experience().len(), "Fetched founder profile");
        Ok(profile_fragment(&record, Utc::now().year()))
    }
}

#[async_trait]
impl EvidenceAgent for ProfileAgent {
    async fn run(&self, context: &QueryContext, deadline: Deadline) -> AgentOutcome {
        finish(NAME, self.collect(context, deadline).await)
    }

    fn name(&self) -> &str {
        NAME
    }

    fn source(&self) -> SourceKind {
        SourceKind::Profile
    }

    fn requires(&self) -> &[ContextInput] {
        &[ContextInput::ProfileUrl]
    }
}

/// Founder attributes from a profile record, with experience counted up
/// to `current_year`
pub fn profile_fragment(record: &ProfileRecord, current_year: i32) -> Fragment {
    let mut fragment = Fragment::new(NAME, SourceKind::Profile);
    let confidence = SourceKind::Profile.default_confidence();

    if let Some(name) = &record.name {
        fragment.insert(Field::FounderName, name.as_str().into(), confidence);
    }
    if let Some(title) = &record.title {
        fragment.insert(Field::FounderTitle, title.as_str().into(), confidence);
    }
    if !record.skills.is_empty() {
        fragment.insert(Field::FounderSkills, record.skills.clone().into(), confidence);
    }

    let first_year = record
        .experience()
        .iter()
        .filter_map(|position| position.start_date.as_deref().and_then(year))
        .min();
    if let Some(first_year) = first_year {
        let years = (current_year - first_year).max(0);
        fragment.insert(Field::FounderYearsExperience, f64::from(years).into(), confidence);
    }

    let history = profile_text(record);
    if !record.experience().is_empty() || record.summary.is_some() {
        let mut exits = record
            .experience()
            .iter()
            .filter(|position| mentions_any(&position_text(position), EXIT_TERMS))
            .count();
        // a summary mention only counts when no position already shows one
        if exits == 0 && mentions_any(&history, EXIT_TERMS) {
            exits = 1;
        }
        fragment.insert(Field::FounderPriorExits, (exits as f64).into(), confidence);
    }
    fragment.insert(
        Field::PoliticallyExposedFounder,
        mentions_any(&history, PEP_TERMS).into(),
        confidence,
    );

    fragment
}

fn position_text(position: &Experience) -> String {
    [&position.title, &position.company, &position.description]
        .into_iter()
        .flatten()
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

fn profile_text(record: &ProfileRecord) -> String {
    let mut text = [&record.title, &record.summary]
        .into_iter()
        .flatten()
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase();
    for position in record.experience() {
        text.push(' ');
        text.push_str(&position_text(position));
    }
    text
}

fn mentions_any(text: &str, terms: &[&str]) -> bool {
    terms.iter().any(|term| text.contains(term))
}
