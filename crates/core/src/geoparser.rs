//! One-shot geoparsing
//!
//! Runs a recognizer and a resolver over a batch of texts inside a throwaway
//! project and returns the annotated documents.

use crate::config::PipelineSettings;
use crate::context::{ContextScope, DocumentView};
use crate::db::Repository;
use crate::errors::Result;
use crate::modules::{Recognizer, Resolver};
use crate::project::{Project, TextBatch};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

/// Recognizer + resolver pipeline over ad-hoc texts
pub struct Geoparser {
    repository: Repository,
    recognizer: Arc<dyn Recognizer>,
    resolver: Arc<dyn Resolver>,
    settings: PipelineSettings,
}

impl Geoparser {
    pub fn new(
        repository: Repository,
        recognizer: Arc<dyn Recognizer>,
        resolver: Arc<dyn Resolver>,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            repository,
            recognizer,
            resolver,
            settings,
        }
    }

    /// Geoparse `texts`; with `save` the temporary project is kept and its
    /// name logged, otherwise it is deleted before returning
    #[instrument(skip(self, texts), fields(recognizer = %self.recognizer.name(), resolver = %self.resolver.name()))]
    pub async fn parse(&self, texts: impl Into<TextBatch>, save: bool) -> Result<Vec<DocumentView>> {
        let name = Uuid::new_v4().to_string();
        let project =
            Project::load_with_settings(self.repository.clone(), &name, self.settings.clone()).await?;

        let views = self.annotate(&project, texts.into()).await;

        if save {
            info!(project = %name, "Geoparsing results saved");
            return views;
        }

        match (views, project.delete().await) {
            (Ok(views), Ok(())) => Ok(views),
            (Ok(_), Err(e)) => Err(e),
            (Err(e), cleanup) => {
                if let Err(cleanup_err) = cleanup {
                    warn!(error = %cleanup_err, project = %name, "Failed to delete temporary project");
                }
                Err(e)
            }
        }
    }

    async fn annotate(&self, project: &Project, texts: TextBatch) -> Result<Vec<DocumentView>> {
        project.create_documents(texts).await?;
        project.run_recognizer(self.recognizer.clone()).await?;
        project.run_resolver(self.resolver.clone()).await?;

        let scope = ContextScope::recognizer(self.recognizer.id()).with_resolver(self.resolver.id());
        project.get_documents(&scope).await
    }
}
