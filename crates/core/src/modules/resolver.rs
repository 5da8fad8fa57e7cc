//! Resolver capability

use super::{FeatureKey, FitOptions, ModuleConfig, ModuleIdentity, Span};
use crate::errors::{AppError, Result};
use async_trait::async_trait;

/// Trait for toponym resolution
///
/// Outer output alignment is per document, inner alignment per submitted
/// span. `None` for a span means the resolver abstains on it.
#[async_trait]
pub trait Resolver: Send + Sync {
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

    /// Map every span of every text to a gazetteer feature (one batch call)
    async fn predict(
        &self,
        texts: &[String],
        references: &[Vec<Span>],
    ) -> Result<Vec<Vec<Option<FeatureKey>>>>;

    /// Whether `fit` is implemented
    fn supports_training(&self) -> bool {
        false
    }

    /// Train on resolved spans; `referents[i][j]` labels `references[i][j]`
    async fn fit(
        &self,
        _texts: &[String],
        _references: &[Vec<Span>],
        _referents: &[Vec<FeatureKey>],
        _options: &FitOptions,
    ) -> Result<()> {
        Err(AppError::TrainingUnsupported {
            module: self.name().to_string(),
        })
    }
}
