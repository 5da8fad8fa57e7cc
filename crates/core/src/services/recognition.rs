//! Recognition service

use super::{call_capability, contract_error};
use crate::config::PipelineSettings;
use crate::context::DocumentView;
use crate::db::models::Document;
use crate::db::{RecognitionOutcome, Repository};
use crate::errors::{AppError, Result};
use crate::metrics;
use crate::modules::{FitOptions, Recognizer, Span};
use futures::{stream, StreamExt, TryStreamExt};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, instrument};
use uuid::Uuid;

/// Summary of one recognition run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RecognitionReport {
    /// Documents recorded by this run
    pub processed: usize,
    /// Documents already recorded before this run
    pub skipped: usize,
    /// Documents the recognizer had no opinion on (left eligible)
    pub abstained: usize,
    /// References created
    pub references: usize,
}

/// Applies one recognizer to documents
pub struct RecognitionService {
    repository: Repository,
    recognizer: Arc<dyn Recognizer>,
    settings: PipelineSettings,
}

impl RecognitionService {
    pub fn new(
        repository: Repository,
        recognizer: Arc<dyn Recognizer>,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            repository,
            recognizer,
            settings,
        }
    }

    /// Recognize toponyms in every document this recognizer has not yet
    /// processed.
    ///
    /// Already processed documents never reach `predict`. A `None`
    /// prediction leaves the document unmarked; any other prediction, empty
    /// included, is stored with its recognition marker in one transaction.
    #[instrument(skip(self, documents), fields(recognizer = %self.recognizer.name(), documents = documents.len()))]
    pub async fn run(&self, documents: &[Document]) -> Result<RecognitionReport> {
        let mut report = RecognitionReport::default();
        if documents.is_empty() {
            return Ok(report);
        }

        let recognizer = &self.recognizer;
        let recognizer_id = recognizer.id();
        self.repository
            .ensure_recognizer(recognizer_id, recognizer.name(), &recognizer.config().canonical_json())
            .await?;

        // The same document passed twice is only submitted once
        let document_ids: Vec<Uuid> = documents.iter().map(|d| d.id).collect();
        let processed = self
            .repository
            .processed_document_ids(recognizer_id, &document_ids)
            .await?;
        let mut seen = HashSet::with_capacity(documents.len());
        let pending: Vec<&Document> = documents
            .iter()
            .filter(|d| !processed.contains(&d.id) && seen.insert(d.id))
            .collect();

        report.skipped = documents.len() - pending.len();
        if report.skipped > 0 {
            metrics::record_skipped(recognizer.name(), "document", report.skipped);
        }
        if pending.is_empty() {
            debug!("All documents already recognized");
            return Ok(report);
        }

        let texts: Vec<String> = pending.iter().map(|d| d.text.clone()).collect();
        let predictions = call_capability(
            recognizer.name(),
            "predict",
            self.settings.capability_timeout(),
            recognizer.predict(&texts),
        )
        .await?;

        if predictions.len() != pending.len() {
            return Err(contract_error(
                recognizer.name(),
                format!(
                    "{} predictions for {} documents",
                    predictions.len(),
                    pending.len()
                ),
            ));
        }

        let mut work: Vec<(&Document, Vec<Span>)> = Vec::with_capacity(pending.len());
        for (document, prediction) in pending.into_iter().zip(predictions) {
            match prediction {
                Some(spans) => work.push((document, spans)),
                None => report.abstained += 1,
            }
        }

        let repository = &self.repository;
        let outcomes: Vec<RecognitionOutcome> = stream::iter(work)
            .map(|(document, spans)| async move {
                repository
                    .record_recognition(document, recognizer_id, &spans)
                    .await
            })
            .buffer_unordered(self.settings.max_concurrency.max(1))
            .try_collect()
            .await?;

        for outcome in outcomes {
            match outcome {
                RecognitionOutcome::Recorded { references } => {
                    report.processed += 1;
                    report.references += references;
                }
                // Lost a race with a concurrent run
                RecognitionOutcome::AlreadyProcessed => report.skipped += 1,
            }
        }

        metrics::record_references(recognizer.name(), report.references);
        info!(
            processed = report.processed,
            skipped = report.skipped,
            abstained = report.abstained,
            references = report.references,
            "Recognition run complete"
        );

        Ok(report)
    }

    /// Train the recognizer on the references visible in `documents`.
    ///
    /// Documents without visible references are left out.
    #[instrument(skip(self, documents, options), fields(recognizer = %self.recognizer.name()))]
    pub async fn fit(&self, documents: &[DocumentView], options: &FitOptions) -> Result<()> {
        let recognizer = &self.recognizer;
        if !recognizer.supports_training() {
            return Err(AppError::TrainingUnsupported {
                module: recognizer.name().to_string(),
            });
        }

        let (texts, references): (Vec<String>, Vec<Vec<Span>>) = documents
            .iter()
            .filter(|d| !d.references.is_empty())
            .map(|d| (d.text.clone(), d.spans()))
            .unzip();

        if texts.is_empty() {
            return Err(AppError::NoTrainingData {
                module: recognizer.name().to_string(),
            });
        }

        info!(documents = texts.len(), "Training recognizer");
        call_capability(
            recognizer.name(),
            "fit",
            self.settings.capability_timeout(),
            recognizer.fit(&texts, &references, options),
        )
        .await
    }
}
