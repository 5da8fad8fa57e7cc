//! Recognition marker: a recognizer has processed a document

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "recognitions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub document_id: Uuid,

    #[sea_orm(primary_key, auto_increment = false, column_type = "Text")]
    pub recognizer_id: String,

    pub created_at: DateTimeWithTimeZone,
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

impl ActiveModelBehavior for ActiveModel {}
