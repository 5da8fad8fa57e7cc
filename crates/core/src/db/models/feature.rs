//! Feature entity: one named place in a gazetteer source

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "features")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub source_id: i32,

    /// Unique together with identifier_value
    #[sea_orm(column_type = "Text")]
    pub gazetteer_name: String,

    #[sea_orm(column_type = "Text")]
    pub identifier_name: String,

    #[sea_orm(column_type = "Text")]
    pub identifier_value: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::source::Entity",
        from = "Column::SourceId",
        to = "super::source::Column::Id",
        on_delete = "Cascade"
    )]
    Source,

    #[sea_orm(has_many = "super::referent::Entity")]
    Referents,
}

impl Related<super::source::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Source.def()
    }
}

impl Related<super::referent::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Referents.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
