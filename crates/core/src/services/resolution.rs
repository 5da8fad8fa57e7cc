//! Resolution service

use super::{call_capability, contract_error};
use crate::config::{PipelineSettings, ResolutionMarking};
use crate::context::DocumentView;
use crate::db::models::{Document, Reference};
use crate::db::{FeatureLookup, Repository};
use crate::errors::{AppError, Result};
use crate::metrics;
use crate::modules::{FeatureKey, FitOptions, Resolver, Span};
use futures::{stream, StreamExt, TryStreamExt};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, info, instrument};
use uuid::Uuid;

/// Summary of one resolution run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResolutionReport {
    /// References submitted to the resolver
    pub submitted: usize,
    /// References already resolved before this run
    pub skipped: usize,
    /// Submitted references the resolver abstained on
    pub abstained: usize,
    /// Referents created
    pub referents: usize,
}

/// Applies one resolver to the references of documents
pub struct ResolutionService {
    repository: Repository,
    resolver: Arc<dyn Resolver>,
    lookup: Arc<dyn FeatureLookup>,
    settings: PipelineSettings,
}

impl ResolutionService {
    /// Features are looked up in the same store the repository writes to
    pub fn new(
        repository: Repository,
        resolver: Arc<dyn Resolver>,
        settings: PipelineSettings,
    ) -> Self {
        let lookup: Arc<dyn FeatureLookup> = Arc::new(repository.clone());
        Self {
            repository,
            resolver,
            lookup,
            settings,
        }
    }

    /// Use another gazetteer query collaborator
    pub fn with_lookup(mut self, lookup: Arc<dyn FeatureLookup>) -> Self {
        self.lookup = lookup;
        self
    }

    /// Resolve every reference of `documents` this resolver has not yet
    /// processed.
    ///
    /// Documents without unprocessed references are not submitted. Every
    /// returned feature key must name a known feature; otherwise the run
    /// fails before anything is written. Abstentions are marked only under
    /// [`ResolutionMarking::Always`].
    #[instrument(skip(self, documents), fields(resolver = %self.resolver.name(), documents = documents.len()))]
    pub async fn run(&self, documents: &[Document]) -> Result<ResolutionReport> {
        let mut report = ResolutionReport::default();
        if documents.is_empty() {
            return Ok(report);
        }

        let resolver = &self.resolver;
        let resolver_id = resolver.id();
        self.repository
            .ensure_resolver(resolver_id, resolver.name(), &resolver.config().canonical_json())
            .await?;

        let mut seen = HashSet::with_capacity(documents.len());
        let document_ids: Vec<Uuid> = documents
            .iter()
            .map(|d| d.id)
            .filter(|id| seen.insert(*id))
            .collect();
        let mut references = self.repository.references_by_document(&document_ids).await?;
        let reference_ids: Vec<Uuid> = references.values().flatten().map(|r| r.id).collect();
        let processed = self
            .repository
            .processed_reference_ids(resolver_id, &reference_ids)
            .await?;

        let mut texts = Vec::new();
        let mut spans: Vec<Vec<Span>> = Vec::new();
        let mut batch: Vec<Vec<Reference>> = Vec::new();

        for document in documents {
            // remove() also drops a document passed twice
            let Some(fetched) = references.remove(&document.id) else {
                continue;
            };
            let (done, pending): (Vec<Reference>, Vec<Reference>) = fetched
                .into_iter()
                .partition(|r| processed.contains(&r.id));
            report.skipped += done.len();

            if pending.is_empty() {
                continue;
            }

            texts.push(document.text.clone());
            spans.push(pending.iter().map(|r| Span::new(r.start, r.end)).collect());
            batch.push(pending);
        }

        if report.skipped > 0 {
            metrics::record_skipped(resolver.name(), "reference", report.skipped);
        }
        if texts.is_empty() {
            debug!("No unresolved references");
            return Ok(report);
        }

        let predictions = call_capability(
            resolver.name(),
            "predict",
            self.settings.capability_timeout(),
            resolver.predict(&texts, &spans),
        )
        .await?;

        check_alignment(resolver.name(), &spans, &predictions)?;

        let mut work: Vec<(Uuid, Option<FeatureKey>)> = Vec::new();
        for (pending, keys) in batch.into_iter().zip(predictions) {
            for (reference, key) in pending.into_iter().zip(keys) {
                report.submitted += 1;
                match key {
                    Some(key) => work.push((reference.id, Some(key))),
                    None => {
                        report.abstained += 1;
                        if self.settings.resolution_marking == ResolutionMarking::Always {
                            work.push((reference.id, None));
                        }
                    }
                }
            }
        }

        let features = self.lookup_features(&work).await?;

        let repository = &self.repository;
        let features = &features;
        let recorded: Vec<bool> = stream::iter(work)
            .map(|(reference_id, key)| async move {
                let feature_id = key.as_ref().and_then(|k| features.get(k).copied());
                let created = repository
                    .record_resolution(reference_id, resolver_id, feature_id)
                    .await?;
                Ok::<_, AppError>(created && feature_id.is_some())
            })
            .buffer_unordered(self.settings.max_concurrency.max(1))
            .try_collect()
            .await?;

        report.referents = recorded.into_iter().filter(|created| *created).count();

        metrics::record_referents(resolver.name(), report.referents);
        info!(
            submitted = report.submitted,
            skipped = report.skipped,
            abstained = report.abstained,
            referents = report.referents,
            "Resolution run complete"
        );

        Ok(report)
    }

    /// Map every distinct key to a feature id, failing on the first unknown
    async fn lookup_features(
        &self,
        work: &[(Uuid, Option<FeatureKey>)],
    ) -> Result<HashMap<FeatureKey, i32>> {
        let mut features = HashMap::new();

        for key in work.iter().filter_map(|(_, key)| key.as_ref()) {
            if features.contains_key(key) {
                continue;
            }
            let feature = self
                .lookup
                .find_feature(&key.gazetteer_name, &key.identifier)
                .await?
                .ok_or_else(|| AppError::FeatureNotFound {
                    gazetteer_name: key.gazetteer_name.clone(),
                    identifier: key.identifier.clone(),
                })?;
            features.insert(key.clone(), feature.id);
        }

        Ok(features)
    }

    /// Train the resolver on the referents visible in `documents`.
    ///
    /// Only references carrying a visible referent become examples;
    /// documents without any are left out.
    #[instrument(skip(self, documents, options), fields(resolver = %self.resolver.name()))]
    pub async fn fit(&self, documents: &[DocumentView], options: &FitOptions) -> Result<()> {
        let resolver = &self.resolver;
        if !resolver.supports_training() {
            return Err(AppError::TrainingUnsupported {
                module: resolver.name().to_string(),
            });
        }

        let mut texts = Vec::new();
        let mut references = Vec::new();
        let mut referents = Vec::new();

        for document in documents {
            let (spans, keys): (Vec<Span>, Vec<FeatureKey>) = document
                .references
                .iter()
                .filter_map(|r| r.referent.as_ref().map(|referent| (r.span(), referent.feature_key())))
                .unzip();

            if spans.is_empty() {
                continue;
            }

            texts.push(document.text.clone());
            references.push(spans);
            referents.push(keys);
        }

        if texts.is_empty() {
            return Err(AppError::NoTrainingData {
                module: resolver.name().to_string(),
            });
        }

        info!(documents = texts.len(), "Training resolver");
        call_capability(
            resolver.name(),
            "fit",
            self.settings.capability_timeout(),
            resolver.fit(&texts, &references, &referents, options),
        )
        .await
    }
}

fn check_alignment(
    module: &str,
    submitted: &[Vec<Span>],
    predictions: &[Vec<Option<FeatureKey>>],
) -> Result<()> {
    if predictions.len() != submitted.len() {
        return Err(contract_error(
            module,
            format!(
                "{} predictions for {} documents",
                predictions.len(),
                submitted.len()
            ),
        ));
    }

    for (i, (spans, keys)) in submitted.iter().zip(predictions).enumerate() {
        if spans.len() != keys.len() {
            return Err(contract_error(
                module,
                format!(
                    "document {}: {} referents for {} references",
                    i,
                    keys.len(),
                    spans.len()
                ),
            ));
        }
    }

    Ok(())
}
