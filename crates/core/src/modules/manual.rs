//! Manual (ground-truth) modules
//!
//! A manual module replays annotations supplied by the caller. Its identity
//! depends on the label only, so re-importing under the same label reuses the
//! same registry row whatever annotation data is passed.

use super::{FeatureKey, ModuleConfig, ModuleIdentity, Recognizer, Resolver, Span};
use crate::errors::{AppError, Result};
use async_trait::async_trait;
use std::collections::HashMap;

pub const MANUAL_RECOGNIZER_NAME: &str = "ManualRecognizer";
pub const MANUAL_RESOLVER_NAME: &str = "ManualResolver";

fn label_config(label: &str) -> ModuleConfig {
    ModuleConfig::new().with("label", label)
}

/// Index of the first occurrence of each text
fn index_texts(texts: &[String]) -> HashMap<String, usize> {
    let mut index = HashMap::with_capacity(texts.len());
    for (i, text) in texts.iter().enumerate() {
        index.entry(text.clone()).or_insert(i);
    }
    index
}

/// Recognizer that returns caller-supplied spans for exactly matching texts
#[derive(Debug, Clone)]
pub struct ManualRecognizer {
    identity: ModuleIdentity,
    index: HashMap<String, usize>,
    references: Vec<Vec<Span>>,
}

impl ManualRecognizer {
    /// `references[i]` holds the spans annotated on `texts[i]`, in the order
    /// they should be replayed
    pub fn new(label: &str, texts: Vec<String>, references: Vec<Vec<Span>>) -> Result<Self> {
        if texts.len() != references.len() {
            return Err(AppError::validation(
                "references",
                format!(
                    "{} texts but {} reference lists",
                    texts.len(),
                    references.len()
                ),
            ));
        }

        Ok(Self {
            identity: ModuleIdentity::new(MANUAL_RECOGNIZER_NAME, label_config(label)),
            index: index_texts(&texts),
            references,
        })
    }
}

#[async_trait]
impl Recognizer for ManualRecognizer {
    fn identity(&self) -> &ModuleIdentity {
        &self.identity
    }

    async fn predict(&self, texts: &[String]) -> Result<Vec<Option<Vec<Span>>>> {
        Ok(texts
            .iter()
            .map(|text| self.index.get(text).map(|&i| self.references[i].clone()))
            .collect())
    }
}

/// Resolver that returns caller-supplied referents for annotated spans of
/// exactly matching texts
#[derive(Debug, Clone)]
pub struct ManualResolver {
    identity: ModuleIdentity,
    index: HashMap<String, usize>,
    labels: Vec<HashMap<Span, Option<FeatureKey>>>,
}

impl ManualResolver {
    /// `referents[i][j]` labels `references[i][j]` on `texts[i]`; `None`
    /// leaves that span unresolved
    pub fn new(
        label: &str,
        texts: Vec<String>,
        references: Vec<Vec<Span>>,
        referents: Vec<Vec<Option<FeatureKey>>>,
    ) -> Result<Self> {
        if texts.len() != references.len() || texts.len() != referents.len() {
            return Err(AppError::validation(
                "referents",
                format!(
                    "{} texts, {} reference lists and {} referent lists",
                    texts.len(),
                    references.len(),
                    referents.len()
                ),
            ));
        }

        let mut labels = Vec::with_capacity(texts.len());
        for (i, (spans, keys)) in references.into_iter().zip(referents).enumerate() {
            if spans.len() != keys.len() {
                return Err(AppError::validation(
                    "referents",
                    format!(
                        "document {}: {} spans but {} referents",
                        i,
                        spans.len(),
                        keys.len()
                    ),
                ));
            }
            labels.push(spans.into_iter().zip(keys).collect());
        }

        Ok(Self {
            identity: ModuleIdentity::new(MANUAL_RESOLVER_NAME, label_config(label)),
            index: index_texts(&texts),
            labels,
        })
    }
}

#[async_trait]
impl Resolver for ManualResolver {
    fn identity(&self) -> &ModuleIdentity {
        &self.identity
    }

    async fn predict(
        &self,
        texts: &[String],
        references: &[Vec<Span>],
    ) -> Result<Vec<Vec<Option<FeatureKey>>>> {
        Ok(texts
            .iter()
            .zip(references)
            .map(|(text, spans)| match self.index.get(text) {
                Some(&i) => spans
                    .iter()
                    .map(|span| self.labels[i].get(span).cloned().flatten())
                    .collect(),
                None => vec![None; spans.len()],
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::FitOptions;

    fn texts(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_recognizer_exact_match_preserves_order() {
        let recognizer = ManualRecognizer::new(
            "gold",
            texts(&["Paris and Lyon.", "Nothing here."]),
            vec![vec![Span::new(10, 14), Span::new(0, 5)], vec![]],
        )
        .unwrap();

        let output = recognizer
            .predict(&texts(&["Paris and Lyon.", "paris and lyon.", "Nothing here.", "Paris"]))
            .await
            .unwrap();

        assert_eq!(output[0], Some(vec![Span::new(10, 14), Span::new(0, 5)]));
        assert_eq!(output[1], None);
        assert_eq!(output[2], Some(vec![]));
        assert_eq!(output[3], None);
    }

    #[tokio::test]
    async fn test_recognizer_first_occurrence_wins() {
        let recognizer = ManualRecognizer::new(
            "gold",
            texts(&["Rome.", "Rome."]),
            vec![vec![Span::new(0, 4)], vec![]],
        )
        .unwrap();

        let output = recognizer.predict(&texts(&["Rome."])).await.unwrap();
        assert_eq!(output, vec![Some(vec![Span::new(0, 4)])]);
    }

    #[test]
    fn test_identity_depends_only_on_label() {
        let a = ManualRecognizer::new("gold", texts(&["A"]), vec![vec![]]).unwrap();
        let b = ManualRecognizer::new("gold", texts(&["B", "C"]), vec![vec![], vec![]]).unwrap();
        let c = ManualRecognizer::new("silver", texts(&["A"]), vec![vec![]]).unwrap();
        assert_eq!(a.id(), b.id());
        assert_ne!(a.id(), c.id());
        assert_eq!(a.name(), MANUAL_RECOGNIZER_NAME);
        assert_eq!(a.config().get("label"), Some(&serde_json::json!("gold")));
    }

    #[test]
    fn test_length_mismatch_is_rejected() {
        let err = ManualRecognizer::new("gold", texts(&["A", "B"]), vec![vec![]]).unwrap_err();
        assert!(matches!(err, AppError::Validation { .. }));

        let err = ManualResolver::new(
            "gold",
            texts(&["A"]),
            vec![vec![Span::new(0, 1)]],
            vec![vec![]],
        )
        .unwrap_err();
        assert!(matches!(err, AppError::Validation { .. }));
    }

    #[tokio::test]
    async fn test_resolver_distinguishes_unannotated_span_from_unknown_text() {
        let resolver = ManualResolver::new(
            "gold",
            texts(&["Paris and Lyon."]),
            vec![vec![Span::new(0, 5), Span::new(10, 14)]],
            vec![vec![Some(FeatureKey::new("geonames", "2988507")), None]],
        )
        .unwrap();

        let output = resolver
            .predict(
                &texts(&["Paris and Lyon.", "Lyon is big."]),
                &[
                    vec![Span::new(10, 14), Span::new(0, 5), Span::new(6, 9)],
                    vec![Span::new(0, 4)],
                ],
            )
            .await
            .unwrap();

        assert_eq!(
            output[0],
            vec![None, Some(FeatureKey::new("geonames", "2988507")), None]
        );
        assert_eq!(output[1], vec![None]);
    }

    #[tokio::test]
    async fn test_manual_modules_do_not_train() {
        let recognizer = ManualRecognizer::new("gold", vec![], vec![]).unwrap();
        assert!(!recognizer.supports_training());
        let err = recognizer
            .fit(&[], &[], &FitOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::TrainingUnsupported { .. }));
    }
}
