//! The canonical, provenance-tracked record of a startup
//!
//! Only the [`Consolidator`](crate::Consolidator) builds records. Everything
//! else reads them, usually through an `Arc` shared with the scorers.

use chrono::{DateTime, Utc};
use eval_core::{Error, Field, FieldValue, Result, SourceKind};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// How a field's value was chosen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Resolution {
    /// Only one agent reported the field
    Single,
    /// Several agents reported agreeing values
    Corroborated,
    /// Agents disagreed and the strongest contribution won
    Conflict,
}

impl std::fmt::Display for Resolution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Resolution::Single => "single",
            Resolution::Corroborated => "corroborated",
            Resolution::Conflict => "conflict",
        };
        f.write_str(name)
    }
}

/// One agent's value for a field, as kept in the provenance trail
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contribution {
    pub agent: String,
    pub source: SourceKind,
    pub value: FieldValue,
    pub confidence: f64,
    pub observed_at: DateTime<Utc>,
    pub selected: bool,
    pub agrees_with_selected: bool,
}

/// A field's resolved value and the trail of every contribution to it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedField {
    value: FieldValue,
    confidence: f64,
    resolution: Resolution,
    provenance: Vec<Contribution>,
}

impl ResolvedField {
    pub(crate) fn new(
        value: FieldValue,
        confidence: f64,
        resolution: Resolution,
        provenance: Vec<Contribution>,
    ) -> Self {
        Self {
            value,
            confidence,
            resolution,
            provenance,
        }
    }

    pub fn value(&self) -> &FieldValue {
        &self.value
    }

    pub fn confidence(&self) -> f64 {
        self.confidence
    }

    pub fn resolution(&self) -> Resolution {
        self.resolution
    }

    /// Every contribution, the selected one first
    pub fn provenance(&self) -> &[Contribution] {
        &self.provenance
    }

    pub fn selected(&self) -> Option<&Contribution> {
        self.provenance.iter().find(|c| c.selected)
    }
}

/// Terminal state of one agent run as seen by the record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceStatus {
    Succeeded,
    /// Failed, but contributed a partial fragment
    Partial,
    Failed,
}

impl std::fmt::Display for SourceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            SourceStatus::Succeeded => "succeeded",
            SourceStatus::Partial => "partial",
            SourceStatus::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Per-agent summary kept alongside the merged fields
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceReport {
    pub agent: String,
    pub source: SourceKind,
    pub status: SourceStatus,
    pub failure: Option<String>,
    pub fields: Vec<Field>,
    pub elapsed_ms: u64,
}

/// The single merged entity produced by consolidation
///
/// Every present field holds exactly one resolved value; fields nobody
/// reported are absent. There are no public mutators.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CanonicalRecord {
    fields: BTreeMap<Field, ResolvedField>,
    sources: Vec<SourceReport>,
}

impl CanonicalRecord {
    pub(crate) fn from_parts(
        fields: BTreeMap<Field, ResolvedField>,
        mut sources: Vec<SourceReport>,
    ) -> Self {
        sources.sort_by(|a, b| a.agent.cmp(&b.agent).then(a.source.cmp(&b.source)));
        Self { fields, sources }
    }

    pub fn get(&self, field: Field) -> Option<&ResolvedField> {
        self.fields.get(&field)
    }

    pub fn contains(&self, field: Field) -> bool {
        self.fields.contains_key(&field)
    }

    pub fn value(&self, field: Field) -> Option<&FieldValue> {
        self.get(field).map(ResolvedField::value)
    }

    pub fn text(&self, field: Field) -> Option<&str> {
        self.value(field).and_then(FieldValue::as_text)
    }

    pub fn number(&self, field: Field) -> Option<f64> {
        self.value(field).and_then(FieldValue::as_number)
    }

    pub fn flag(&self, field: Field) -> Option<bool> {
        self.value(field).and_then(FieldValue::as_flag)
    }

    pub fn list(&self, field: Field) -> Option<&[String]> {
        self.value(field).and_then(FieldValue::as_list)
    }

    pub fn confidence(&self, field: Field) -> Option<f64> {
        self.get(field).map(ResolvedField::confidence)
    }

    pub fn fields(&self) -> impl Iterator<Item = (Field, &ResolvedField)> {
        self.fields.iter().map(|(field, resolved)| (*field, resolved))
    }

    pub fn sources(&self) -> &[SourceReport] {
        &self.sources
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Share of all known fields that are present
    pub fn completeness(&self) -> f64 {
        self.fields.len() as f64 / Field::ALL.len() as f64
    }

    /// Fields whose contributions disagreed
    pub fn conflicts(&self) -> impl Iterator<Item = Field> + '_ {
        self.fields
            .iter()
            .filter(|(_, resolved)| resolved.resolution == Resolution::Conflict)
            .map(|(field, _)| *field)
    }

    /// Check the record's structural invariants
    ///
    /// Scoring refuses to run on a record that fails this check.
    pub fn validate(&self) -> Result<()> {
        for (field, resolved) in &self.fields {
            if resolved.value.kind() != field.kind() {
                return Err(Error::Structural(format!(
                    "field '{field}' holds a {} value, expected {}",
                    resolved.value.kind(),
                    field.kind()
                )));
            }
            if !resolved.value.is_well_formed() {
                return Err(Error::Structural(format!(
                    "field '{field}' holds a malformed value"
                )));
            }
            if !is_unit(resolved.confidence) {
                return Err(Error::Structural(format!(
                    "field '{field}' has confidence {} outside [0, 1]",
                    resolved.confidence
                )));
            }
            if resolved.provenance.is_empty() {
                return Err(Error::Structural(format!(
                    "field '{field}' has an empty provenance trail"
                )));
            }

            let selected: Vec<&Contribution> =
                resolved.provenance.iter().filter(|c| c.selected).collect();
            match selected.as_slice() {
                [only] if only.value == resolved.value => {}
                [_] => {
                    return Err(Error::Structural(format!(
                        "field '{field}' resolved to a value missing from its provenance"
                    )));
                }
                _ => {
                    return Err(Error::Structural(format!(
                        "field '{field}' has {} selected contributions",
                        selected.len()
                    )));
                }
            }

            if let Some(bad) = resolved
                .provenance
                .iter()
                .find(|c| c.value.kind() != field.kind() || !is_unit(c.confidence))
            {
                return Err(Error::Structural(format!(
                    "field '{field}' has an invalid contribution from '{}'",
                    bad.agent
                )));
            }
        }
        Ok(())
    }
}

fn is_unit(value: f64) -> bool {
    (0.0..=1.0).contains(&value)
}
