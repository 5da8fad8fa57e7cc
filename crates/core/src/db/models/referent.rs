//! Referent entity: the gazetteer feature a resolver assigned to a reference

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "referents")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub reference_id: Uuid,

    #[sea_orm(column_type = "Text")]
    pub resolver_id: String,

    pub feature_id: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::reference::Entity",
        from = "Column::ReferenceId",
        to = "super::reference::Column::Id",
        on_delete = "Cascade"
    )]
    Reference,

    #[sea_orm(
        belongs_to = "super::resolver::Entity",
        from = "Column::ResolverId",
        to = "super::resolver::Column::Id",
        on_delete = "Cascade"
    )]
    Resolver,

    #[sea_orm(
        belongs_to = "super::feature::Entity",
        from = "Column::FeatureId",
        to = "super::feature::Column::Id",
        on_delete = "Cascade"
    )]
    Feature,
}

impl Related<super::reference::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Reference.def()
    }
}

impl Related<super::resolver::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Resolver.def()
    }
}

impl Related<super::feature::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Feature.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
