//! Partial records produced by a single agent

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::warn;

use crate::field::{Field, FieldValue};
use crate::source::SourceKind;

/// A value together with the confidence its agent assigns to it
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldEntry {
    pub value: FieldValue,
    pub confidence: f64,
}

/// One agent's sparse contribution to the canonical record
///
/// Entries are checked on insertion: a value whose kind does not match its
/// field, or that is not well formed, is dropped with a warning. Confidence
/// is clamped to [0, 1]; a non-finite confidence falls back to the source's
/// default tier.
#[derive(Debug, Clone, Serialize)]
pub struct Fragment {
    agent: String,
    source: SourceKind,
    produced_at: DateTime<Utc>,
    entries: BTreeMap<Field, FieldEntry>,
}

impl Fragment {
    pub fn new(agent: impl Into<String>, source: SourceKind) -> Self {
        Self {
            agent: agent.into(),
            source,
            produced_at: Utc::now(),
            entries: BTreeMap::new(),
        }
    }

    /// Override the production timestamp
    pub fn with_timestamp(mut self, produced_at: DateTime<Utc>) -> Self {
        self.produced_at = produced_at;
        self
    }

    /// Add an entry at the source's default confidence
    pub fn with(mut self, field: Field, value: impl Into<FieldValue>) -> Self {
        let confidence = self.source.default_confidence();
        self.insert(field, value.into(), confidence);
        self
    }

    /// Add an entry at an explicit confidence
    pub fn with_confidence(
        mut self,
        field: Field,
        value: impl Into<FieldValue>,
        confidence: f64,
    ) -> Self {
        self.insert(field, value.into(), confidence);
        self
    }

    /// Insert an entry, returning whether it was accepted
    ///
    /// A later insert for the same field replaces the earlier one.
    pub fn insert(&mut self, field: Field, value: FieldValue, confidence: f64) -> bool {
        if value.kind() != field.kind() {
            warn!(
                agent = %self.agent,
                field = %field,
                expected = %field.kind(),
                actual = %value.kind(),
                "Rejecting fragment entry with mismatched value kind"
            );
            return false;
        }
        if !value.is_well_formed() {
            warn!(agent = %self.agent, field = %field, "Rejecting malformed fragment entry");
            return false;
        }

        let confidence = if confidence.is_finite() {
            confidence.clamp(0.0, 1.0)
        } else {
            self.source.default_confidence()
        };

        self.entries.insert(field, FieldEntry { value, confidence });
        true
    }

    pub fn agent(&self) -> &str {
        &self.agent
    }

    pub fn source(&self) -> SourceKind {
        self.source
    }

    pub fn produced_at(&self) -> DateTime<Utc> {
        self.produced_at
    }

    pub fn get(&self, field: Field) -> Option<&FieldEntry> {
        self.entries.get(&field)
    }

    pub fn entries(&self) -> impl Iterator<Item = (Field, &FieldEntry)> {
        self.entries.iter().map(|(field, entry)| (*field, entry))
    }

    pub fn fields(&self) -> impl Iterator<Item = Field> + '_ {
        self.entries.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
