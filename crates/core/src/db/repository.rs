//! Repository pattern for database operations
//!
//! Provides a clean interface for all data access operations. Writes that
//! form one logical unit (a document's references plus its recognition
//! marker, a referent plus its resolution marker) run in one transaction.

use crate::context::{ContextScope, DocumentView, ReferenceView, ReferentView};
use crate::db::models::*;
use crate::db::DbPool;
use crate::errors::{AppError, Result};
use crate::modules::Span;
use async_trait::async_trait;
use sea_orm::sea_query::OnConflict;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
    Set, TransactionTrait,
};
use std::collections::{HashMap, HashSet};
use tracing::{debug, info, instrument};
use uuid::Uuid;

/// Upper bound on ids bound into one `IN (...)` clause
const IN_CLAUSE_CHUNK: usize = 500;

/// Result of persisting one document's recognizer output
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecognitionOutcome {
    /// Marker written together with this many references
    Recorded { references: usize },
    /// Another run already recorded this document; nothing was written
    AlreadyProcessed,
}

/// Gazetteer query collaborator used when persisting referents
#[async_trait]
pub trait FeatureLookup: Send + Sync {
    /// Find the feature a `(gazetteer_name, identifier)` pair names
    async fn find_feature(&self, gazetteer_name: &str, identifier: &str) -> Result<Option<Feature>>;
}

/// Repository for data access operations
#[derive(Clone)]
pub struct Repository {
    pool: DbPool,
}

impl Repository {
    /// Create a new repository with the given connection pool
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Get the underlying pool
    pub fn pool(&self) -> &DbPool {
        &self.pool
    }

    /// Get the read connection
    fn read_conn(&self) -> &DatabaseConnection {
        self.pool.read()
    }

    /// Get the write connection
    fn write_conn(&self) -> &DatabaseConnection {
        self.pool.write()
    }

    // ========================================================================
    // Health Check
    // ========================================================================

    /// Ping the database
    pub async fn ping(&self) -> Result<()> {
        self.pool.ping().await
    }

    // ========================================================================
    // Project Operations
    // ========================================================================

    /// Find project by exact name
    pub async fn find_project_by_name(&self, name: &str) -> Result<Option<Project>> {
        ProjectEntity::find()
            .filter(ProjectColumn::Name.eq(name))
            .one(self.read_conn())
            .await
            .map_err(Into::into)
    }

    /// Find project by ID
    pub async fn find_project_by_id(&self, id: Uuid) -> Result<Option<Project>> {
        ProjectEntity::find_by_id(id)
            .one(self.read_conn())
            .await
            .map_err(Into::into)
    }

    /// Load the project with this name, creating it if absent.
    ///
    /// Concurrent callers race on the unique name; the loser re-reads the
    /// winner's row, so a name never maps to two projects.
    #[instrument(skip(self))]
    pub async fn get_or_create_project(&self, name: &str) -> Result<Project> {
        let project = ProjectActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(name.to_string()),
            created_at: Set(chrono::Utc::now().into()),
        };

        let inserted = ProjectEntity::insert(project)
            .on_conflict(OnConflict::column(ProjectColumn::Name).do_nothing().to_owned())
            .exec_without_returning(self.write_conn())
            .await?;

        if inserted > 0 {
            info!(project = name, "Created project");
        }

        // Read back from the primary: a replica may not have the row yet
        ProjectEntity::find()
            .filter(ProjectColumn::Name.eq(name))
            .one(self.write_conn())
            .await?
            .ok_or_else(|| AppError::ProjectNotFound {
                id: name.to_string(),
            })
    }

    /// Delete project by ID; documents, references, referents and markers
    /// go with it
    pub async fn delete_project(&self, id: Uuid) -> Result<bool> {
        let result = ProjectEntity::delete_by_id(id)
            .exec(self.write_conn())
            .await?;

        Ok(result.rows_affected > 0)
    }

    // ========================================================================
    // Document Operations
    // ========================================================================

    /// Append documents to a project, keeping input order
    #[instrument(skip(self, texts), fields(count = texts.len()))]
    pub async fn create_documents(&self, project_id: Uuid, texts: &[String]) -> Result<Vec<Document>> {
        if self.find_project_by_id(project_id).await?.is_none() {
            return Err(AppError::ProjectNotFound {
                id: project_id.to_string(),
            });
        }
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let txn = self.write_conn().begin().await?;

        let next_position = DocumentEntity::find()
            .filter(DocumentColumn::ProjectId.eq(project_id))
            .order_by_desc(DocumentColumn::Position)
            .one(&txn)
            .await?
            .map(|last| last.position + 1)
            .unwrap_or(0);

        let now = chrono::Utc::now();
        let mut documents = Vec::with_capacity(texts.len());

        for (offset, text) in texts.iter().enumerate() {
            let document = DocumentActiveModel {
                id: Set(Uuid::new_v4()),
                project_id: Set(project_id),
                position: Set(next_position + offset as i32),
                text: Set(text.clone()),
                created_at: Set(now.into()),
            };
            documents.push(document.insert(&txn).await?);
        }

        txn.commit().await?;
        debug!(project_id = %project_id, "Documents created");

        Ok(documents)
    }

    /// List a project's documents in insertion order
    pub async fn list_documents(&self, project_id: Uuid) -> Result<Vec<Document>> {
        DocumentEntity::find()
            .filter(DocumentColumn::ProjectId.eq(project_id))
            .order_by_asc(DocumentColumn::Position)
            .all(self.read_conn())
            .await
            .map_err(Into::into)
    }

    /// Find document by ID
    pub async fn find_document_by_id(&self, id: Uuid) -> Result<Option<Document>> {
        DocumentEntity::find_by_id(id)
            .one(self.read_conn())
            .await
            .map_err(Into::into)
    }

    // ========================================================================
    // Registry Operations
    // ========================================================================

    /// Create the recognizer row if no row has this id yet
    pub async fn ensure_recognizer(&self, id: &str, name: &str, config: &str) -> Result<()> {
        let record = RecognizerActiveModel {
            id: Set(id.to_string()),
            name: Set(name.to_string()),
            config: Set(config.to_string()),
            created_at: Set(chrono::Utc::now().into()),
        };

        let inserted = RecognizerEntity::insert(record)
            .on_conflict(OnConflict::column(RecognizerColumn::Id).do_nothing().to_owned())
            .exec_without_returning(self.write_conn())
            .await?;

        if inserted > 0 {
            info!(recognizer_id = id, name = name, "Registered recognizer");
        }
        Ok(())
    }

    /// Create the resolver row if no row has this id yet
    pub async fn ensure_resolver(&self, id: &str, name: &str, config: &str) -> Result<()> {
        let record = ResolverActiveModel {
            id: Set(id.to_string()),
            name: Set(name.to_string()),
            config: Set(config.to_string()),
            created_at: Set(chrono::Utc::now().into()),
        };

        let inserted = ResolverEntity::insert(record)
            .on_conflict(OnConflict::column(ResolverColumn::Id).do_nothing().to_owned())
            .exec_without_returning(self.write_conn())
            .await?;

        if inserted > 0 {
            info!(resolver_id = id, name = name, "Registered resolver");
        }
        Ok(())
    }

    /// Find recognizer by ID
    pub async fn find_recognizer(&self, id: &str) -> Result<Option<RecognizerRecord>> {
        RecognizerEntity::find_by_id(id.to_string())
            .one(self.read_conn())
            .await
            .map_err(Into::into)
    }

    /// Find resolver by ID
    pub async fn find_resolver(&self, id: &str) -> Result<Option<ResolverRecord>> {
        ResolverEntity::find_by_id(id.to_string())
            .one(self.read_conn())
            .await
            .map_err(Into::into)
    }

    // ========================================================================
    // Recognition Operations
    // ========================================================================

    /// Documents among `document_ids` this recognizer has already processed
    pub async fn processed_document_ids(
        &self,
        recognizer_id: &str,
        document_ids: &[Uuid],
    ) -> Result<HashSet<Uuid>> {
        let mut processed = HashSet::new();

        for chunk in document_ids.chunks(IN_CLAUSE_CHUNK) {
            let markers = RecognitionEntity::find()
                .filter(RecognitionColumn::RecognizerId.eq(recognizer_id))
                .filter(RecognitionColumn::DocumentId.is_in(chunk.iter().copied()))
                .all(self.read_conn())
                .await?;
            processed.extend(markers.into_iter().map(|m| m.document_id));
        }

        Ok(processed)
    }

    /// Persist one document's spans and its recognition marker atomically.
    ///
    /// Spans must lie inside the document text (character offsets) and must
    /// not overlap each other or earlier spans of the same recognizer.
    #[instrument(skip(self, document, spans), fields(document_id = %document.id, spans = spans.len()))]
    pub async fn record_recognition(
        &self,
        document: &Document,
        recognizer_id: &str,
        spans: &[Span],
    ) -> Result<RecognitionOutcome> {
        let txn = self.write_conn().begin().await?;

        // The document may have been deleted since it was listed
        if DocumentEntity::find_by_id(document.id).one(&txn).await?.is_none() {
            txn.rollback().await?;
            return Err(AppError::DocumentNotFound {
                id: document.id.to_string(),
            });
        }

        let marker = RecognitionActiveModel {
            document_id: Set(document.id),
            recognizer_id: Set(recognizer_id.to_string()),
            created_at: Set(chrono::Utc::now().into()),
        };

        let inserted = RecognitionEntity::insert(marker)
            .on_conflict(
                OnConflict::columns([RecognitionColumn::DocumentId, RecognitionColumn::RecognizerId])
                    .do_nothing()
                    .to_owned(),
            )
            .exec_without_returning(&txn)
            .await?;

        if inserted == 0 {
            txn.rollback().await?;
            debug!("Document already recognized");
            return Ok(RecognitionOutcome::AlreadyProcessed);
        }

        let existing = ReferenceEntity::find()
            .filter(ReferenceColumn::DocumentId.eq(document.id))
            .filter(ReferenceColumn::RecognizerId.eq(recognizer_id))
            .all(&txn)
            .await?;

        let references = build_references(document, recognizer_id, &existing, spans)?;
        let count = references.len();

        if !references.is_empty() {
            ReferenceEntity::insert_many(references)
                .exec_without_returning(&txn)
                .await?;
        }

        txn.commit().await?;

        Ok(RecognitionOutcome::Recorded { references: count })
    }

    /// References of one document, ordered by position
    pub async fn list_references(&self, document_id: Uuid) -> Result<Vec<Reference>> {
        ReferenceEntity::find()
            .filter(ReferenceColumn::DocumentId.eq(document_id))
            .order_by_asc(ReferenceColumn::Start)
            .order_by_asc(ReferenceColumn::End)
            .all(self.read_conn())
            .await
            .map_err(Into::into)
    }

    /// All references of the given documents, grouped per document and
    /// ordered by position
    pub async fn references_by_document(
        &self,
        document_ids: &[Uuid],
    ) -> Result<HashMap<Uuid, Vec<Reference>>> {
        let mut grouped: HashMap<Uuid, Vec<Reference>> = HashMap::new();

        for chunk in document_ids.chunks(IN_CLAUSE_CHUNK) {
            let references = ReferenceEntity::find()
                .filter(ReferenceColumn::DocumentId.is_in(chunk.iter().copied()))
                .order_by_asc(ReferenceColumn::Start)
                .order_by_asc(ReferenceColumn::End)
                .order_by_asc(ReferenceColumn::RecognizerId)
                .all(self.read_conn())
                .await?;

            for reference in references {
                grouped.entry(reference.document_id).or_default().push(reference);
            }
        }

        Ok(grouped)
    }

    // ========================================================================
    // Resolution Operations
    // ========================================================================

    /// References among `reference_ids` this resolver has already processed
    pub async fn processed_reference_ids(
        &self,
        resolver_id: &str,
        reference_ids: &[Uuid],
    ) -> Result<HashSet<Uuid>> {
        let mut processed = HashSet::new();

        for chunk in reference_ids.chunks(IN_CLAUSE_CHUNK) {
            let markers = ResolutionEntity::find()
                .filter(ResolutionColumn::ResolverId.eq(resolver_id))
                .filter(ResolutionColumn::ReferenceId.is_in(chunk.iter().copied()))
                .all(self.read_conn())
                .await?;
            processed.extend(markers.into_iter().map(|m| m.reference_id));
        }

        Ok(processed)
    }

    /// Persist a resolution marker and, when given, the referent atomically.
    ///
    /// Returns false if the reference was already resolved by this resolver,
    /// and `NotFound` if the reference no longer exists.
    #[instrument(skip(self))]
    pub async fn record_resolution(
        &self,
        reference_id: Uuid,
        resolver_id: &str,
        feature_id: Option<i32>,
    ) -> Result<bool> {
        let txn = self.write_conn().begin().await?;

        if ReferenceEntity::find_by_id(reference_id).one(&txn).await?.is_none() {
            txn.rollback().await?;
            return Err(AppError::NotFound {
                resource_type: "reference".to_string(),
                id: reference_id.to_string(),
            });
        }

        let marker = ResolutionActiveModel {
            reference_id: Set(reference_id),
            resolver_id: Set(resolver_id.to_string()),
            created_at: Set(chrono::Utc::now().into()),
        };

        let inserted = ResolutionEntity::insert(marker)
            .on_conflict(
                OnConflict::columns([ResolutionColumn::ReferenceId, ResolutionColumn::ResolverId])
                    .do_nothing()
                    .to_owned(),
            )
            .exec_without_returning(&txn)
            .await?;

        if inserted == 0 {
            txn.rollback().await?;
            debug!("Reference already resolved");
            return Ok(false);
        }

        if let Some(feature_id) = feature_id {
            let referent = ReferentActiveModel {
                id: Set(Uuid::new_v4()),
                reference_id: Set(reference_id),
                resolver_id: Set(resolver_id.to_string()),
                feature_id: Set(feature_id),
            };
            ReferentEntity::insert(referent)
                .exec_without_returning(&txn)
                .await?;
        }

        txn.commit().await?;
        Ok(true)
    }

    // ========================================================================
    // Gazetteer Operations
    // ========================================================================

    /// Create a gazetteer
    pub async fn create_gazetteer(&self, name: &str) -> Result<Gazetteer> {
        let gazetteer = GazetteerActiveModel {
            name: Set(name.to_string()),
            ..Default::default()
        };

        gazetteer.insert(self.write_conn()).await.map_err(Into::into)
    }

    /// Create a source within a gazetteer
    pub async fn create_source(
        &self,
        gazetteer_id: i32,
        name: &str,
        location_id_name: &str,
    ) -> Result<Source> {
        let source = SourceActiveModel {
            gazetteer_id: Set(gazetteer_id),
            name: Set(name.to_string()),
            location_id_name: Set(location_id_name.to_string()),
            ..Default::default()
        };

        source.insert(self.write_conn()).await.map_err(Into::into)
    }

    /// Create a feature within a source
    pub async fn create_feature(
        &self,
        source_id: i32,
        gazetteer_name: &str,
        identifier_name: &str,
        identifier_value: &str,
    ) -> Result<Feature> {
        let feature = FeatureActiveModel {
            source_id: Set(source_id),
            gazetteer_name: Set(gazetteer_name.to_string()),
            identifier_name: Set(identifier_name.to_string()),
            identifier_value: Set(identifier_value.to_string()),
            ..Default::default()
        };

        feature.insert(self.write_conn()).await.map_err(Into::into)
    }

    // ========================================================================
    // Scoped Views
    // ========================================================================

    /// Snapshot of a project's documents with only the annotations the
    /// scope selects. Without a recognizer every document exposes zero
    /// references; without a resolver every reference exposes no referent.
    #[instrument(skip(self))]
    pub async fn document_views(
        &self,
        project_id: Uuid,
        scope: &ContextScope,
    ) -> Result<Vec<DocumentView>> {
        let documents = self.list_documents(project_id).await?;

        let Some(recognizer_id) = scope.recognizer_id.as_deref() else {
            return Ok(documents
                .into_iter()
                .map(|document| DocumentView::new(document, Vec::new()))
                .collect());
        };

        let document_ids: Vec<Uuid> = documents.iter().map(|d| d.id).collect();
        let mut references = Vec::new();

        for chunk in document_ids.chunks(IN_CLAUSE_CHUNK) {
            references.extend(
                ReferenceEntity::find()
                    .filter(ReferenceColumn::DocumentId.is_in(chunk.iter().copied()))
                    .filter(ReferenceColumn::RecognizerId.eq(recognizer_id))
                    .order_by_asc(ReferenceColumn::Start)
                    .order_by_asc(ReferenceColumn::End)
                    .all(self.read_conn())
                    .await?,
            );
        }

        let mut referents: HashMap<Uuid, ReferentView> = HashMap::new();

        if let Some(resolver_id) = scope.resolver_id.as_deref() {
            let reference_ids: Vec<Uuid> = references.iter().map(|r| r.id).collect();

            for chunk in reference_ids.chunks(IN_CLAUSE_CHUNK) {
                let rows = ReferentEntity::find()
                    .filter(ReferentColumn::ReferenceId.is_in(chunk.iter().copied()))
                    .filter(ReferentColumn::ResolverId.eq(resolver_id))
                    .find_also_related(FeatureEntity)
                    .all(self.read_conn())
                    .await?;

                for (referent, feature) in rows {
                    if let Some(feature) = feature {
                        referents.insert(referent.reference_id, ReferentView::new(referent, feature));
                    }
                }
            }
        }

        let mut by_document: HashMap<Uuid, Vec<ReferenceView>> = HashMap::new();
        for reference in references {
            let referent = referents.remove(&reference.id);
            by_document
                .entry(reference.document_id)
                .or_default()
                .push(ReferenceView::new(reference, referent));
        }

        Ok(documents
            .into_iter()
            .map(|document| {
                let references = by_document.remove(&document.id).unwrap_or_default();
                DocumentView::new(document, references)
            })
            .collect())
    }
}

#[async_trait]
impl FeatureLookup for Repository {
    async fn find_feature(&self, gazetteer_name: &str, identifier: &str) -> Result<Option<Feature>> {
        FeatureEntity::find()
            .filter(FeatureColumn::GazetteerName.eq(gazetteer_name))
            .filter(FeatureColumn::IdentifierValue.eq(identifier))
            .one(self.read_conn())
            .await
            .map_err(Into::into)
    }
}

/// Validate spans against the document and build the rows to insert
fn build_references(
    document: &Document,
    recognizer_id: &str,
    existing: &[Reference],
    spans: &[Span],
) -> Result<Vec<ReferenceActiveModel>> {
    let chars: Vec<char> = document.text.chars().collect();
    let len = chars.len() as i64;

    let mut taken: Vec<Span> = existing.iter().map(|r| Span::new(r.start, r.end)).collect();
    let mut rows = Vec::with_capacity(spans.len());

    for span in spans {
        if span.start < 0 || span.start >= span.end || i64::from(span.end) > len {
            return Err(AppError::invariant(format!(
                "span [{}, {}) is outside document {} of length {}",
                span.start, span.end, document.id, len
            )));
        }

        if let Some(other) = taken.iter().find(|other| other.overlaps(span)) {
            return Err(AppError::invariant(format!(
                "span [{}, {}) overlaps [{}, {}) of recognizer {} on document {}",
                span.start, span.end, other.start, other.end, recognizer_id, document.id
            )));
        }

        taken.push(*span);

        let text: String = chars[span.start as usize..span.end as usize].iter().collect();
        rows.push(ReferenceActiveModel {
            id: Set(Uuid::new_v4()),
            document_id: Set(document.id),
            recognizer_id: Set(recognizer_id.to_string()),
            start: Set(span.start),
            end: Set(span.end),
            text: Set(text),
        });
    }

    Ok(rows)
}
