//! Context-scoped views of the corpus
//!
//! Many recognizers and resolvers may annotate the same documents. A
//! [`ContextScope`] picks one recognizer layer and, optionally, one resolver
//! layer; views built under a scope expose only those annotations. Views are
//! detached snapshots, so scoping never touches stored rows or other callers.

use crate::db::models::{Document, Feature, Reference, Referent};
use crate::modules::{FeatureKey, Span};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Which annotation layers a view exposes
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContextScope {
    pub recognizer_id: Option<String>,
    pub resolver_id: Option<String>,
}

impl ContextScope {
    /// No layers: documents expose zero references
    pub fn none() -> Self {
        Self::default()
    }

    /// References of one recognizer, without referents
    pub fn recognizer(recognizer_id: impl Into<String>) -> Self {
        Self {
            recognizer_id: Some(recognizer_id.into()),
            resolver_id: None,
        }
    }

    /// Also expose referents of one resolver
    pub fn with_resolver(mut self, resolver_id: impl Into<String>) -> Self {
        self.resolver_id = Some(resolver_id.into());
        self
    }
}

/// A document with the references visible under a scope
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentView {
    pub id: Uuid,
    pub project_id: Uuid,
    pub text: String,
    pub references: Vec<ReferenceView>,
}

impl DocumentView {
    pub(crate) fn new(document: Document, references: Vec<ReferenceView>) -> Self {
        Self {
            id: document.id,
            project_id: document.project_id,
            text: document.text,
            references,
        }
    }

    /// Spans of the visible references, in view order
    pub fn spans(&self) -> Vec<Span> {
        self.references.iter().map(ReferenceView::span).collect()
    }
}

/// A reference with the referent visible under a scope
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceView {
    pub id: Uuid,
    pub start: i32,
    pub end: i32,
    pub text: String,
    pub recognizer_id: String,
    pub referent: Option<ReferentView>,
}

impl ReferenceView {
    pub(crate) fn new(reference: Reference, referent: Option<ReferentView>) -> Self {
        Self {
            id: reference.id,
            start: reference.start,
            end: reference.end,
            text: reference.text,
            recognizer_id: reference.recognizer_id,
            referent,
        }
    }

    pub fn span(&self) -> Span {
        Span::new(self.start, self.end)
    }
}

/// The gazetteer feature a resolver assigned to a reference
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferentView {
    pub id: Uuid,
    pub resolver_id: String,
    pub feature: Feature,
}

impl ReferentView {
    pub(crate) fn new(referent: Referent, feature: Feature) -> Self {
        Self {
            id: referent.id,
            resolver_id: referent.resolver_id,
            feature,
        }
    }

    /// The pair a resolver would emit for this feature
    pub fn feature_key(&self) -> FeatureKey {
        FeatureKey::new(
            self.feature.gazetteer_name.clone(),
            self.feature.identifier_value.clone(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scope_builders() {
        assert_eq!(ContextScope::none().recognizer_id, None);

        let scope = ContextScope::recognizer("abc").with_resolver("def");
        assert_eq!(scope.recognizer_id.as_deref(), Some("abc"));
        assert_eq!(scope.resolver_id.as_deref(), Some("def"));
    }
}
