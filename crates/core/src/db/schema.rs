//! Schema bootstrap
//!
//! Tables are derived from the entity definitions, so foreign keys and their
//! cascade rules come straight from the `belongs_to` relations.

use crate::db::models::*;
use crate::errors::Result;
use sea_orm::sea_query::{Index, IndexCreateStatement};
use sea_orm::{ConnectionTrait, DatabaseConnection, EntityTrait, Schema};
use tracing::info;

/// Create every table and index that does not exist yet
pub async fn bootstrap(conn: &DatabaseConnection) -> Result<()> {
    let schema = Schema::new(conn.get_database_backend());

    // Parents before children so foreign keys resolve
    create_table(conn, &schema, ProjectEntity).await?;
    create_table(conn, &schema, DocumentEntity).await?;
    create_table(conn, &schema, RecognizerEntity).await?;
    create_table(conn, &schema, ResolverEntity).await?;
    create_table(conn, &schema, GazetteerEntity).await?;
    create_table(conn, &schema, SourceEntity).await?;
    create_table(conn, &schema, FeatureEntity).await?;
    create_table(conn, &schema, ReferenceEntity).await?;
    create_table(conn, &schema, ReferentEntity).await?;
    create_table(conn, &schema, RecognitionEntity).await?;
    create_table(conn, &schema, ResolutionEntity).await?;

    for index in indexes() {
        conn.execute(conn.get_database_backend().build(&index)).await?;
    }

    info!("Database schema ready");
    Ok(())
}

async fn create_table<E: EntityTrait>(
    conn: &DatabaseConnection,
    schema: &Schema,
    entity: E,
) -> Result<()> {
    let mut stmt = schema.create_table_from_entity(entity);
    stmt.if_not_exists();
    conn.execute(conn.get_database_backend().build(&stmt)).await?;
    Ok(())
}

fn indexes() -> Vec<IndexCreateStatement> {
    vec![
        // A resolver emits (gazetteer_name, identifier); it must name one feature
        Index::create()
            .if_not_exists()
            .name("idx_features_gazetteer_identifier")
            .table(FeatureEntity)
            .col(FeatureColumn::GazetteerName)
            .col(FeatureColumn::IdentifierValue)
            .unique()
            .to_owned(),
        // At most one referent per resolver on a reference
        Index::create()
            .if_not_exists()
            .name("idx_referents_reference_resolver")
            .table(ReferentEntity)
            .col(ReferentColumn::ReferenceId)
            .col(ReferentColumn::ResolverId)
            .unique()
            .to_owned(),
        Index::create()
            .if_not_exists()
            .name("idx_references_document_recognizer")
            .table(ReferenceEntity)
            .col(ReferenceColumn::DocumentId)
            .col(ReferenceColumn::RecognizerId)
            .to_owned(),
        Index::create()
            .if_not_exists()
            .name("idx_documents_project_position")
            .table(DocumentEntity)
            .col(DocumentColumn::ProjectId)
            .col(DocumentColumn::Position)
            .to_owned(),
    ]
}

#[cfg(test)]
mod tests {
    use crate::db::testing;

    #[tokio::test]
    async fn test_bootstrap_is_idempotent() {
        let repo = testing::repository().await;
        super::bootstrap(repo.pool().write()).await.unwrap();
        repo.ping().await.unwrap();
    }
}
