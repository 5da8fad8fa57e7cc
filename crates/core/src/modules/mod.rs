//! Module capability interface
//!
//! Recognizers find toponym spans, resolvers map spans to gazetteer features.
//! Every module carries a [`ModuleIdentity`] derived from its name and
//! normalized configuration; equal name + config always yields the same id,
//! which is the key of the module's registry row.

mod manual;
mod recognizer;
mod resolver;

pub use manual::{ManualRecognizer, ManualResolver, MANUAL_RECOGNIZER_NAME, MANUAL_RESOLVER_NAME};
pub use recognizer::Recognizer;
pub use resolver::Resolver;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Half-open character span `[start, end)` within a document text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Span {
    pub start: i32,
    pub end: i32,
}

impl Span {
    pub fn new(start: i32, end: i32) -> Self {
        Self { start, end }
    }

    /// Whether the two spans share at least one character
    pub fn overlaps(&self, other: &Span) -> bool {
        self.start < other.end && self.end > other.start
    }
}

impl From<(i32, i32)> for Span {
    fn from((start, end): (i32, i32)) -> Self {
        Self { start, end }
    }
}

/// The `(gazetteer_name, identifier)` pair a resolver emits for a span
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FeatureKey {
    pub gazetteer_name: String,
    pub identifier: String,
}

impl FeatureKey {
    pub fn new(gazetteer_name: impl Into<String>, identifier: impl Into<String>) -> Self {
        Self {
            gazetteer_name: gazetteer_name.into(),
            identifier: identifier.into(),
        }
    }
}

/// Normalized module configuration
///
/// Keys are kept sorted; set-valued entries are de-duplicated and sorted on
/// insertion, so construction order never changes the canonical form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ModuleConfig(BTreeMap<String, Value>);

impl ModuleConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a plain value
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    /// Add a set-like value; stored as a sorted sequence without duplicates
    pub fn with_set<I, T>(mut self, key: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<Value>,
    {
        let mut items: Vec<Value> = values.into_iter().map(Into::into).collect();
        items.sort_by(canonical_cmp);
        items.dedup();
        self.0.insert(key.into(), Value::Array(items));
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Canonical JSON text (sorted keys, no whitespace)
    pub fn canonical_json(&self) -> String {
        let map: Map<String, Value> = self
            .0
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        Value::Object(map).to_string()
    }
}

/// Orders numbers numerically, strings lexically, and anything else by its
/// JSON text. Values of different kinds sort by kind first.
fn canonical_cmp(a: &Value, b: &Value) -> Ordering {
    fn rank(v: &Value) -> u8 {
        match v {
            Value::Null => 0,
            Value::Bool(_) => 1,
            Value::Number(_) => 2,
            Value::String(_) => 3,
            Value::Array(_) => 4,
            Value::Object(_) => 5,
        }
    }

    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        _ => rank(a)
            .cmp(&rank(b))
            .then_with(|| a.to_string().cmp(&b.to_string())),
    }
}

/// Stable identity of a module instance
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleIdentity {
    id: String,
    name: String,
    config: ModuleConfig,
}

impl ModuleIdentity {
    pub fn new(name: impl Into<String>, config: ModuleConfig) -> Self {
        let name = name.into();
        let id = derive_id(&name, &config);
        Self { id, name, config }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> &ModuleConfig {
        &self.config
    }
}

/// First 16 hex chars of SHA-256 over `name`, a NUL byte and the canonical config
fn derive_id(name: &str, config: &ModuleConfig) -> String {
    let mut hasher = Sha256::new();
    hasher.update(name.as_bytes());
    hasher.update([0u8]);
    hasher.update(config.canonical_json().as_bytes());
    let digest = hex::encode(hasher.finalize());
    digest[..16].to_string()
}

/// Options passed through to a module's training call
#[derive(Debug, Clone, Default)]
pub struct FitOptions {
    /// Where the trained artefact should be written
    pub output_path: Option<PathBuf>,

    /// Free-form training parameters
    pub params: Map<String, Value>,
}

impl FitOptions {
    pub fn new(output_path: impl Into<PathBuf>) -> Self {
        Self {
            output_path: Some(output_path.into()),
            params: Map::new(),
        }
    }

    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_ignores_construction_order() {
        let a = ModuleConfig::new()
            .with("model", "en_core_web_sm")
            .with_set("entity_types", ["GPE", "LOC", "FAC"]);
        let b = ModuleConfig::new()
            .with_set("entity_types", ["LOC", "FAC", "GPE", "LOC"])
            .with("model", "en_core_web_sm");

        let id_a = ModuleIdentity::new("SpacyRecognizer", a);
        let id_b = ModuleIdentity::new("SpacyRecognizer", b);
        assert_eq!(id_a.id(), id_b.id());
        assert_eq!(id_a.id().len(), 16);
        assert_eq!(
            id_a.config().canonical_json(),
            r#"{"entity_types":["FAC","GPE","LOC"],"model":"en_core_web_sm"}"#
        );
    }

    #[test]
    fn test_identity_depends_on_name_and_config() {
        let config = ModuleConfig::new().with("label", "gold");
        let a = ModuleIdentity::new("ManualRecognizer", config.clone());
        let b = ModuleIdentity::new("ManualResolver", config);
        let c = ModuleIdentity::new("ManualRecognizer", ModuleConfig::new().with("label", "silver"));
        assert_ne!(a.id(), b.id());
        assert_ne!(a.id(), c.id());
    }

    #[test]
    fn test_numeric_sets_sort_numerically() {
        let config = ModuleConfig::new().with_set("sizes", [10, 9, 100]);
        assert_eq!(config.canonical_json(), r#"{"sizes":[9,10,100]}"#);
    }

    #[test]
    fn test_span_overlap() {
        let paris = Span::new(0, 5);
        assert!(paris.overlaps(&Span::new(4, 8)));
        assert!(!paris.overlaps(&Span::new(5, 8)));
        assert!(paris.overlaps(&Span::new(1, 2)));
    }
}
