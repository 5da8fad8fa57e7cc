//! Gazetteer source entity (one imported dataset)

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "sources")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub gazetteer_id: i32,

    #[sea_orm(column_type = "Text")]
    pub name: String,

    /// Column of the dataset holding the location identifier
    #[sea_orm(column_type = "Text")]
    pub location_id_name: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::gazetteer::Entity",
        from = "Column::GazetteerId",
        to = "super::gazetteer::Column::Id",
        on_delete = "Cascade"
    )]
    Gazetteer,

    #[sea_orm(has_many = "super::feature::Entity")]
    Features,
}

impl Related<super::gazetteer::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Gazetteer.def()
    }
}

impl Related<super::feature::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Features.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
