//! Recognizer capability

use super::{FitOptions, ModuleConfig, ModuleIdentity, Span};
use crate::errors::{AppError, Result};
use async_trait::async_trait;

/// Trait for toponym recognition
///
/// `predict` output aligns positionally with its input. `None` at position
/// *i* means the module has no opinion on text *i*; an empty vector means it
/// looked and found nothing.
#[async_trait]
pub trait Recognizer: Send + Sync {
    /// Name and normalized config of this instance
    fn identity(&self) -> &ModuleIdentity;

    fn id(&self) -> &str {
        self.identity().id()
    }

    fn name(&self) -> &str {
        self.identity().name()
    }

    fn config(&self) -> &ModuleConfig {
        self.identity().config()
    }

    /// Find toponym spans in each text (one batch call)
    async fn predict(&self, texts: &[String]) -> Result<Vec<Option<Vec<Span>>>>;

    /// Whether `fit` is implemented
    fn supports_training(&self) -> bool {
        false
    }

    /// Train on annotated texts
    async fn fit(
        &self,
        _texts: &[String],
        _references: &[Vec<Span>],
        _options: &FitOptions,
    ) -> Result<()> {
        Err(AppError::TrainingUnsupported {
            module: self.name().to_string(),
        })
    }
}
