//! Evidence sources and their tie-break ranking

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{Error, Result};

/// Kind of evidence source an agent draws from
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    /// Data extracted directly from a document supplied with the request
    Document,
    /// Regulatory filings and other financial-data lookups
    Financial,
    /// Professional profile of the founder
    Profile,
    /// News coverage
    News,
    /// General web search
    WebSearch,
}

impl SourceKind {
    /// Every source kind, in default priority order
    pub const ALL: [SourceKind; 5] = [
        SourceKind::Document,
        SourceKind::Financial,
        SourceKind::Profile,
        SourceKind::News,
        SourceKind::WebSearch,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::Document => "document",
            SourceKind::Financial => "financial",
            SourceKind::Profile => "profile",
            SourceKind::News => "news",
            SourceKind::WebSearch => "web_search",
        }
    }

    /// Confidence assigned to an entry when the agent does not supply one
    pub fn default_confidence(&self) -> f64 {
        match self {
            SourceKind::Document => 0.90,
            SourceKind::Financial => 0.85,
            SourceKind::Profile => 0.75,
            SourceKind::News => 0.60,
            SourceKind::WebSearch => 0.50,
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ordering used to break confidence ties during conflict resolution
///
/// Must be a permutation of [`SourceKind::ALL`]; earlier entries win.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<SourceKind>", into = "Vec<SourceKind>")]
pub struct SourcePriority(Vec<SourceKind>);

impl SourcePriority {
    /// Create a ranking, validating that every source appears exactly once
    pub fn new(order: Vec<SourceKind>) -> Result<Self> {
        for kind in SourceKind::ALL {
            let count = order.iter().filter(|k| **k == kind).count();
            if count != 1 {
                return Err(Error::Config(format!(
                    "source priority must list '{kind}' exactly once (found {count})"
                )));
            }
        }
        if order.len() != SourceKind::ALL.len() {
            return Err(Error::Config(format!(
                "source priority must have {} entries, got {}",
                SourceKind::ALL.len(),
                order.len()
            )));
        }
        Ok(Self(order))
    }

    /// Rank of a source; lower ranks win ties
    pub fn rank(&self, source: SourceKind) -> usize {
        self.0
            .iter()
            .position(|k| *k == source)
            .unwrap_or(self.0.len())
    }

    pub fn as_slice(&self) -> &[SourceKind] {
        &self.0
    }
}

impl Default for SourcePriority {
    fn default() -> Self {
        Self(SourceKind::ALL.to_vec())
    }
}

impl TryFrom<Vec<SourceKind>> for SourcePriority {
    type Error = Error;

    fn try_from(order: Vec<SourceKind>) -> Result<Self> {
        Self::new(order)
    }
}

impl From<SourcePriority> for Vec<SourceKind> {
    fn from(priority: SourcePriority) -> Self {
        priority.0
    }
}
