//! Reference entity: a toponym span laid over a document

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "references")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub document_id: Uuid,

    #[sea_orm(column_type = "Text")]
    pub recognizer_id: String,

    /// Character offset, inclusive
    pub start: i32,

    /// Character offset, exclusive
    pub end: i32,

    /// Denormalized slice of the document text between start and end
    #[sea_orm(column_type = "Text")]
    pub text: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::document::Entity",
        from = "Column::DocumentId",
        to = "super::document::Column::Id",
        on_delete = "Cascade"
    )]
    Document,

    #[sea_orm(
        belongs_to = "super::recognizer::Entity",
        from = "Column::RecognizerId",
        to = "super::recognizer::Column::Id",
        on_delete = "Cascade"
    )]
    Recognizer,

    #[sea_orm(has_many = "super::referent::Entity")]
    Referents,

    #[sea_orm(has_many = "super::resolution::Entity")]
    Resolutions,
}

impl Related<super::document::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Document.def()
    }
}

impl Related<super::recognizer::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Recognizer.def()
    }
}

impl Related<super::referent::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Referents.def()
    }
}

impl Related<super::resolution::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Resolutions.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
