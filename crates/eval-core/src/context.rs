//! Query context shared by all agents of one request
//!
//! A `QueryContext` is created once per evaluation and never mutated. When
//! follow-up discovery learns a company name or profile URL the context was
//! missing, a new context is derived with [`QueryContext::derive_with`]; the
//! original is left untouched.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use url::Url;
use uuid::Uuid;

use crate::error::{Error, Result};

/// Reference to a document supplied with the request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentHandle(PathBuf);

impl DocumentHandle {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self(path.into())
    }

    pub fn path(&self) -> &Path {
        &self.0
    }

    pub fn is_pdf(&self) -> bool {
        self.0
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"))
    }
}

/// An input an agent can draw from the query context
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContextInput {
    CompanyName,
    Document,
    ProfileUrl,
}

/// Immutable input bundle for one evaluation request
///
/// # Example
///
/// ```
/// use eval_core::QueryContext;
///
/// let ctx = QueryContext::builder()
///     .company_name("Acme Robotics")
///     .hint("series A")
///     .build()
///     .unwrap();
///
/// assert_eq!(ctx.company_name(), Some("Acme Robotics"));
/// assert!(ctx.profile_url().is_none());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryContext {
    request_id: Uuid,
    company_name: Option<String>,
    document: Option<DocumentHandle>,
    profile_url: Option<Url>,
    hints: Vec<String>,
}

impl QueryContext {
    pub fn builder() -> QueryContextBuilder {
        QueryContextBuilder::default()
    }

    pub fn request_id(&self) -> Uuid {
        self.request_id
    }

    pub fn company_name(&self) -> Option<&str> {
        self.company_name.as_deref()
    }

    pub fn document(&self) -> Option<&DocumentHandle> {
        self.document.as_ref()
    }

    pub fn profile_url(&self) -> Option<&Url> {
        self.profile_url.as_ref()
    }

    pub fn hints(&self) -> &[String] {
        &self.hints
    }

    /// Whether the context carries `input`
    pub fn has(&self, input: ContextInput) -> bool {
        match input {
            ContextInput::CompanyName => self.company_name.is_some(),
            ContextInput::Document => self.document.is_some(),
            ContextInput::ProfileUrl => self.profile_url.is_some(),
        }
    }

    /// Derive a context that fills in values this one lacks
    ///
    /// Values already present are kept; the request id carries over. Returns
    /// the new context with the inputs it filled, or `None` when nothing new
    /// was learned.
    pub fn derive_with(
        &self,
        company_name: Option<&str>,
        profile_url: Option<&Url>,
    ) -> Option<(Self, Vec<ContextInput>)> {
        let new_name = match (&self.company_name, company_name.map(str::trim)) {
            (None, Some(name)) if !name.is_empty() => Some(name.to_string()),
            _ => None,
        };
        let new_url = match (&self.profile_url, profile_url) {
            (None, Some(url)) => Some(url.clone()),
            _ => None,
        };

        let mut filled = Vec::new();
        if new_name.is_some() {
            filled.push(ContextInput::CompanyName);
        }
        if new_url.is_some() {
            filled.push(ContextInput::ProfileUrl);
        }
        if filled.is_empty() {
            return None;
        }

        let derived = Self {
            request_id: self.request_id,
            company_name: new_name.or_else(|| self.company_name.clone()),
            document: self.document.clone(),
            profile_url: new_url.or_else(|| self.profile_url.clone()),
            hints: self.hints.clone(),
        };
        Some((derived, filled))
    }
}

/// Builder for [`QueryContext`]
#[derive(Debug, Default)]
pub struct QueryContextBuilder {
    request_id: Option<Uuid>,
    company_name: Option<String>,
    document: Option<DocumentHandle>,
    profile_url: Option<String>,
    hints: Vec<String>,
}

impl QueryContextBuilder {
    /// Use a fixed request id instead of a generated one
    pub fn request_id(mut self, id: Uuid) -> Self {
        self.request_id = Some(id);
        self
    }

    pub fn company_name(mut self, name: impl Into<String>) -> Self {
        self.company_name = Some(name.into());
        self
    }

    pub fn document(mut self, path: impl Into<PathBuf>) -> Self {
        self.document = Some(DocumentHandle::new(path));
        self
    }

    pub fn profile_url(mut self, url: impl Into<String>) -> Self {
        self.profile_url = Some(url.into());
        self
    }

    pub fn hint(mut self, hint: impl Into<String>) -> Self {
        self.hints.push(hint.into());
        self
    }

    /// Build the context
    ///
    /// Fails when the profile URL does not parse, or when there is neither a
    /// company name nor a document to evaluate.
    pub fn build(self) -> Result<QueryContext> {
        let company_name = self
            .company_name
            .map(|name| name.trim().to_string())
            .filter(|name| !name.is_empty());

        let profile_url = match self.profile_url.as_deref().map(str::trim) {
            Some("") | None => None,
            Some(raw) => Some(
                Url::parse(raw)
                    .map_err(|e| Error::InvalidQuery(format!("invalid profile url '{raw}': {e}")))?,
            ),
        };

        if company_name.is_none() && self.document.is_none() {
            return Err(Error::InvalidQuery(
                "a company name or a document is required".to_string(),
            ));
        }

        let hints = self
            .hints
            .into_iter()
            .map(|hint| hint.trim().to_string())
            .filter(|hint| !hint.is_empty())
            .collect();

        Ok(QueryContext {
            request_id: self.request_id.unwrap_or_else(Uuid::new_v4),
            company_name,
            document: self.document,
            profile_url,
            hints,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_requires_name_or_document() {
        let err = QueryContext::builder().hint("anything").build().unwrap_err();
        assert!(matches!(err, Error::InvalidQuery(_)));

        let blank = QueryContext::builder().company_name("   ").build();
        assert!(blank.is_err());

        let doc_only = QueryContext::builder().document("deck.md").build().unwrap();
        assert!(doc_only.company_name().is_none());
    }

    #[test]
    fn test_invalid_profile_url_is_rejected() {
        let result = QueryContext::builder()
            .company_name("Acme")
            .profile_url("not a url")
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn test_request_ids_are_unique() {
        let a = QueryContext::builder().company_name("Acme").build().unwrap();
        let b = QueryContext::builder().company_name("Acme").build().unwrap();
        assert_ne!(a.request_id(), b.request_id());
    }

    #[test]
    fn test_derive_fills_only_missing_values() {
        let ctx = QueryContext::builder()
            .company_name("Acme")
            .document("deck.md")
            .build()
            .unwrap();
        let url = Url::parse("https://www.linkedin.com/in/jane-doe").unwrap();

        let (derived, filled) = ctx.derive_with(Some("Other Co"), Some(&url)).unwrap();
        assert_eq!(derived.company_name(), Some("Acme"));
        assert_eq!(derived.profile_url(), Some(&url));
        assert_eq!(derived.request_id(), ctx.request_id());
        assert_eq!(filled, vec![ContextInput::ProfileUrl]);
        assert!(derived.has(ContextInput::Document));
        assert!(!ctx.has(ContextInput::ProfileUrl));
    }

    #[test]
    fn test_derive_reports_every_filled_input() {
        let ctx = QueryContext::builder().document("deck.md").build().unwrap();
        let url = Url::parse("https://www.linkedin.com/in/jane-doe").unwrap();

        let (derived, filled) = ctx.derive_with(Some(" Acme "), Some(&url)).unwrap();
        assert_eq!(derived.company_name(), Some("Acme"));
        assert_eq!(
            filled,
            vec![ContextInput::CompanyName, ContextInput::ProfileUrl]
        );
    }

    #[test]
    fn test_derive_without_new_values_is_none() {
        let ctx = QueryContext::builder().company_name("Acme").build().unwrap();
        assert!(ctx.derive_with(Some("Acme Inc"), None).is_none());
        assert!(ctx.derive_with(None, None).is_none());
    }

    #[test]
    fn test_pdf_detection() {
        assert!(DocumentHandle::new("deck.PDF").is_pdf());
        assert!(!DocumentHandle::new("deck.md").is_pdf());
    }
}
