//! Project facade
//!
//! A project is a named corpus. It loads-or-creates by name, runs modules
//! over all of its documents and hands back context-scoped views.

use crate::config::PipelineSettings;
use crate::context::{ContextScope, DocumentView};
use crate::db::models::Document;
use crate::db::Repository;
use crate::errors::{AppError, Result};
use crate::modules::{
    FeatureKey, FitOptions, ManualRecognizer, ManualResolver, Recognizer, Resolver, Span,
};
use crate::services::{RecognitionReport, RecognitionService, ResolutionReport, ResolutionService};
use serde::Deserialize;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

/// One or more document texts
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TextBatch(Vec<String>);

impl TextBatch {
    pub fn into_inner(self) -> Vec<String> {
        self.0
    }
}

impl From<&str> for TextBatch {
    fn from(text: &str) -> Self {
        Self(vec![text.to_string()])
    }
}

impl From<String> for TextBatch {
    fn from(text: String) -> Self {
        Self(vec![text])
    }
}

impl From<Vec<String>> for TextBatch {
    fn from(texts: Vec<String>) -> Self {
        Self(texts)
    }
}

impl From<Vec<&str>> for TextBatch {
    fn from(texts: Vec<&str>) -> Self {
        Self(texts.into_iter().map(str::to_string).collect())
    }
}

impl From<&[&str]> for TextBatch {
    fn from(texts: &[&str]) -> Self {
        Self(texts.iter().map(|t| t.to_string()).collect())
    }
}

impl From<&[String]> for TextBatch {
    fn from(texts: &[String]) -> Self {
        Self(texts.to_vec())
    }
}

impl<const N: usize> From<[&str; N]> for TextBatch {
    fn from(texts: [&str; N]) -> Self {
        Self(texts.iter().map(|t| t.to_string()).collect())
    }
}

/// Annotation export: `{"gazetteer": .., "documents": [{"text", "toponyms"}]}`
#[derive(Debug, Deserialize)]
struct AnnotationFile {
    gazetteer: String,
    documents: Vec<AnnotatedDocument>,
}

#[derive(Debug, Deserialize)]
struct AnnotatedDocument {
    text: String,
    #[serde(default)]
    toponyms: Vec<AnnotatedToponym>,
}

#[derive(Debug, Deserialize)]
struct AnnotatedToponym {
    start: i32,
    end: i32,
    #[serde(default)]
    loc_id: Option<serde_json::Value>,
}

impl AnnotatedToponym {
    /// Empty, null and missing ids mean "not resolved"
    fn location_id(&self) -> Option<String> {
        match &self.loc_id {
            Some(serde_json::Value::String(id)) if !id.is_empty() => Some(id.clone()),
            Some(serde_json::Value::Number(id)) => Some(id.to_string()),
            _ => None,
        }
    }
}

/// A named corpus
pub struct Project {
    id: Uuid,
    name: String,
    repository: Repository,
    settings: PipelineSettings,
}

impl Project {
    /// Load the project with this name, creating it if absent
    pub async fn load(repository: Repository, name: &str) -> Result<Self> {
        Self::load_with_settings(repository, name, PipelineSettings::default()).await
    }

    /// Load or create, running modules with the given pipeline settings
    pub async fn load_with_settings(
        repository: Repository,
        name: &str,
        settings: PipelineSettings,
    ) -> Result<Self> {
        let project = repository.get_or_create_project(name).await?;
        Ok(Self {
            id: project.id,
            name: project.name,
            repository,
            settings,
        })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Append documents in input order
    pub async fn create_documents(&self, texts: impl Into<TextBatch>) -> Result<Vec<Document>> {
        let texts = texts.into().into_inner();
        self.repository.create_documents(self.id, &texts).await
    }

    /// All documents, in insertion order
    pub async fn documents(&self) -> Result<Vec<Document>> {
        self.repository.list_documents(self.id).await
    }

    /// Run a recognizer over every document of the project
    #[instrument(skip(self, recognizer), fields(project = %self.name, recognizer = %recognizer.name()))]
    pub async fn run_recognizer(&self, recognizer: Arc<dyn Recognizer>) -> Result<RecognitionReport> {
        let documents = self.documents().await?;
        RecognitionService::new(self.repository.clone(), recognizer, self.settings.clone())
            .run(&documents)
            .await
    }

    /// Run a resolver over the references of every document of the project
    #[instrument(skip(self, resolver), fields(project = %self.name, resolver = %resolver.name()))]
    pub async fn run_resolver(&self, resolver: Arc<dyn Resolver>) -> Result<ResolutionReport> {
        let documents = self.documents().await?;
        ResolutionService::new(self.repository.clone(), resolver, self.settings.clone())
            .run(&documents)
            .await
    }

    /// Store ground-truth spans under `label`; documents whose text matches
    /// `texts[i]` exactly receive `references[i]`
    pub async fn create_references(
        &self,
        label: &str,
        texts: Vec<String>,
        references: Vec<Vec<Span>>,
    ) -> Result<RecognitionReport> {
        let recognizer = ManualRecognizer::new(label, texts, references)?;
        self.run_recognizer(Arc::new(recognizer)).await
    }

    /// Store ground-truth referents under `label` for the annotated spans
    pub async fn create_referents(
        &self,
        label: &str,
        texts: Vec<String>,
        references: Vec<Vec<Span>>,
        referents: Vec<Vec<Option<FeatureKey>>>,
    ) -> Result<ResolutionReport> {
        let resolver = ManualResolver::new(label, texts, references, referents)?;
        self.run_resolver(Arc::new(resolver)).await
    }

    /// Documents with the annotations the scope selects
    pub async fn get_documents(&self, scope: &ContextScope) -> Result<Vec<DocumentView>> {
        self.repository.document_views(self.id, scope).await
    }

    /// Train a recognizer on the references of `recognizer_id`
    pub async fn train_recognizer(
        &self,
        recognizer: Arc<dyn Recognizer>,
        recognizer_id: &str,
        options: &FitOptions,
    ) -> Result<()> {
        let documents = self
            .get_documents(&ContextScope::recognizer(recognizer_id))
            .await?;
        RecognitionService::new(self.repository.clone(), recognizer, self.settings.clone())
            .fit(&documents, options)
            .await
    }

    /// Train a resolver on the referents `resolver_id` assigned to the
    /// references of `recognizer_id`
    pub async fn train_resolver(
        &self,
        resolver: Arc<dyn Resolver>,
        recognizer_id: &str,
        resolver_id: &str,
        options: &FitOptions,
    ) -> Result<()> {
        let scope = ContextScope::recognizer(recognizer_id).with_resolver(resolver_id);
        let documents = self.get_documents(&scope).await?;
        ResolutionService::new(self.repository.clone(), resolver, self.settings.clone())
            .fit(&documents, options)
            .await
    }

    /// Import an annotation export under `label`.
    ///
    /// Spans become references of a manual recognizer; toponyms with a
    /// location id also become referents of a manual resolver.
    #[instrument(skip(self, path), fields(project = %self.name, path = %path.as_ref().display()))]
    pub async fn load_annotations(
        &self,
        path: impl AsRef<Path>,
        label: &str,
        create_documents: bool,
    ) -> Result<()> {
        let raw = tokio::fs::read_to_string(path.as_ref()).await?;
        let file: AnnotationFile = serde_json::from_str(&raw)?;

        let texts: Vec<String> = file.documents.iter().map(|d| d.text.clone()).collect();
        let references: Vec<Vec<Span>> = file
            .documents
            .iter()
            .map(|d| d.toponyms.iter().map(|t| Span::new(t.start, t.end)).collect())
            .collect();
        let referents: Vec<Vec<Option<FeatureKey>>> = file
            .documents
            .iter()
            .map(|d| {
                d.toponyms
                    .iter()
                    .map(|t| t.location_id().map(|id| FeatureKey::new(file.gazetteer.clone(), id)))
                    .collect()
            })
            .collect();

        if create_documents {
            self.create_documents(texts.clone()).await?;
        }

        let recognized = self
            .create_references(label, texts.clone(), references.clone())
            .await?;
        let resolved = self
            .create_referents(label, texts, references, referents)
            .await?;

        info!(
            documents = file.documents.len(),
            references = recognized.references,
            referents = resolved.referents,
            "Annotations loaded"
        );
        Ok(())
    }

    /// Delete the project with all its documents and annotations
    pub async fn delete(self) -> Result<()> {
        if !self.repository.delete_project(self.id).await? {
            return Err(AppError::ProjectNotFound {
                id: self.id.to_string(),
            });
        }
        info!(project = %self.name, "Project deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::testing;
    use crate::services::mocks::{ScriptedRecognizer, ScriptedResolver};
    use std::io::Write;
    use tokio_test::{assert_err, assert_ok};

    fn owned(texts: &[&str]) -> Vec<String> {
        texts.iter().map(|t| t.to_string()).collect()
    }

    #[tokio::test]
    async fn test_load_is_stable_and_delete_resets_id() {
        let repo = testing::repository().await;
        let first = Project::load(repo.clone(), "X").await.unwrap();
        let again = Project::load(repo.clone(), "X").await.unwrap();
        assert_eq!(first.id(), again.id());

        let old_id = first.id();
        first.delete().await.unwrap();
        assert_err!(again.delete().await);

        let fresh = Project::load(repo, "X").await.unwrap();
        assert_ne!(fresh.id(), old_id);
    }

    #[tokio::test]
    async fn test_create_documents_accepts_one_or_many() {
        let repo = testing::repository().await;
        let project = Project::load(repo, "batch").await.unwrap();

        project.create_documents("Only one.").await.unwrap();
        project.create_documents(["Two.", "Three."]).await.unwrap();
        project.create_documents(vec!["Four.".to_string()]).await.unwrap();

        let texts: Vec<String> = project
            .documents()
            .await
            .unwrap()
            .into_iter()
            .map(|d| d.text)
            .collect();
        assert_eq!(texts, owned(&["Only one.", "Two.", "Three.", "Four."]));
    }

    #[tokio::test]
    async fn test_paris_scenario() {
        let repo = testing::repository().await;
        let project = Project::load(repo, "paris").await.unwrap();
        project.create_documents("Paris is nice.").await.unwrap();

        let recognizer = ManualRecognizer::new("r", owned(&["Paris is nice."]), vec![vec![Span::new(0, 5)]]).unwrap();
        let recognizer_id = recognizer.id().to_string();
        let recognizer: Arc<dyn Recognizer> = Arc::new(recognizer);

        project.run_recognizer(recognizer.clone()).await.unwrap();
        let report = project.run_recognizer(recognizer).await.unwrap();
        assert_eq!(report.skipped, 1);

        let documents = project
            .get_documents(&ContextScope::recognizer(recognizer_id))
            .await
            .unwrap();
        assert_eq!(documents[0].references.len(), 1);
        let paris = &documents[0].references[0];
        assert_eq!((paris.start, paris.end), (0, 5));
        assert_eq!(paris.text, "Paris");
    }

    #[tokio::test]
    async fn test_context_is_opt_in_and_layers_are_independent() {
        let repo = testing::repository().await;
        let project = Project::load(repo, "layers").await.unwrap();
        project.create_documents("New York City is big.").await.unwrap();

        let city = Arc::new(ScriptedRecognizer::new(
            "City",
            &[("New York City is big.", Some(vec![(0, 13)]))],
        ));
        let state = Arc::new(ScriptedRecognizer::new(
            "State",
            &[("New York City is big.", Some(vec![(0, 8)]))],
        ));
        assert_ok!(project.run_recognizer(city.clone()).await);
        assert_ok!(project.run_recognizer(state.clone()).await);

        let none = project.get_documents(&ContextScope::none()).await.unwrap();
        assert!(none[0].references.is_empty());

        let a = project
            .get_documents(&ContextScope::recognizer(city.id()))
            .await
            .unwrap();
        let b = project
            .get_documents(&ContextScope::recognizer(state.id()))
            .await
            .unwrap();
        assert_eq!(a[0].references[0].text, "New York City");
        assert_eq!(b[0].references[0].text, "New York");
        assert_ne!(a[0].references[0].id, b[0].references[0].id);
    }

    #[tokio::test]
    async fn test_create_references_and_referents() {
        let repo = testing::repository().await;
        testing::seed_features(&repo, "geonames", &["2988507"]).await;
        let project = Project::load(repo, "manual").await.unwrap();
        let texts = owned(&["Paris and Lyon."]);
        let spans = vec![vec![Span::new(0, 5), Span::new(10, 14)]];
        project.create_documents(texts.clone()).await.unwrap();

        let recognized = project
            .create_references("gold", texts.clone(), spans.clone())
            .await
            .unwrap();
        assert_eq!(recognized.references, 2);

        let resolved = project
            .create_referents(
                "gold",
                texts.clone(),
                spans.clone(),
                vec![vec![Some(FeatureKey::new("geonames", "2988507")), None]],
            )
            .await
            .unwrap();
        assert_eq!(resolved.referents, 1);
        assert_eq!(resolved.abstained, 1);

        let recognizer_id = ManualRecognizer::new("gold", vec![], vec![]).unwrap().id().to_string();
        let resolver_id = ManualResolver::new("gold", vec![], vec![], vec![]).unwrap().id().to_string();
        let documents = project
            .get_documents(&ContextScope::recognizer(recognizer_id).with_resolver(resolver_id))
            .await
            .unwrap();
        let references = &documents[0].references;
        assert_eq!(references[0].referent.as_ref().unwrap().feature.identifier_value, "2988507");
        assert!(references[1].referent.is_none());
    }

    #[tokio::test]
    async fn test_train_with_manual_modules_is_unsupported() {
        let repo = testing::repository().await;
        let project = Project::load(repo, "train").await.unwrap();
        let recognizer = Arc::new(ManualRecognizer::new("gold", vec![], vec![]).unwrap());

        let err = project
            .train_recognizer(recognizer.clone(), recognizer.id(), &FitOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::TrainingUnsupported { .. }));
    }

    #[tokio::test]
    async fn test_train_resolver_without_examples() {
        let repo = testing::repository().await;
        let project = Project::load(repo, "train").await.unwrap();
        project.create_documents("Paris is nice.").await.unwrap();
        let mut resolver = ScriptedResolver::new("Trainable", &[]);
        resolver.trainable = true;

        let err = project
            .train_resolver(Arc::new(resolver), "nobody", "nothing", &FitOptions::default())
            .await
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "No training examples found for module 'Trainable'"
        );
    }

    #[tokio::test]
    async fn test_load_annotations() {
        let repo = testing::repository().await;
        testing::seed_features(&repo, "geonames", &["2988507", "2996944"]).await;
        let project = Project::load(repo, "import").await.unwrap();

        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"gazetteer": "geonames", "documents": [
                {{"text": "Paris and Lyon.", "toponyms": [
                    {{"start": 0, "end": 5, "loc_id": "2988507"}},
                    {{"start": 10, "end": 14, "loc_id": ""}}
                ]}},
                {{"text": "Lyon again.", "toponyms": [
                    {{"start": 0, "end": 4, "loc_id": 2996944}}
                ]}},
                {{"text": "Nothing here.", "toponyms": []}}
            ]}}"#
        )
        .unwrap();

        project.load_annotations(file.path(), "gold", true).await.unwrap();
        // Importing the same file again adds nothing
        project.load_annotations(file.path(), "gold", false).await.unwrap();

        let recognizer_id = ManualRecognizer::new("gold", vec![], vec![]).unwrap().id().to_string();
        let resolver_id = ManualResolver::new("gold", vec![], vec![], vec![]).unwrap().id().to_string();
        let documents = project
            .get_documents(&ContextScope::recognizer(recognizer_id).with_resolver(resolver_id))
            .await
            .unwrap();

        assert_eq!(documents.len(), 3);
        assert_eq!(documents[0].references.len(), 2);
        assert_eq!(documents[0].references[0].text, "Paris");
        assert!(documents[0].references[1].referent.is_none());
        assert_eq!(
            documents[1].references[0].referent.as_ref().unwrap().feature.identifier_value,
            "2996944"
        );
        assert!(documents[2].references.is_empty());
    }

    #[tokio::test]
    async fn test_load_annotations_rejects_malformed_file() {
        let repo = testing::repository().await;
        let project = Project::load(repo, "broken").await.unwrap();
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{\"documents\": 3}}").unwrap();

        let err = project.load_annotations(file.path(), "gold", true).await.unwrap_err();
        assert!(matches!(err, AppError::Serialization(_)));
    }
}
