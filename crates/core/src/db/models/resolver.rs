//! Resolver registry entity

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "resolvers")]
pub struct Model {
    /// Deterministic id derived from name and config
    #[sea_orm(primary_key, auto_increment = false, column_type = "Text")]
    pub id: String,

    #[sea_orm(column_type = "Text")]
    pub name: String,

    /// Canonical JSON of the normalized config
    #[sea_orm(column_type = "Text")]
    pub config: String,

    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::referent::Entity")]
    Referents,

    #[sea_orm(has_many = "super::resolution::Entity")]
    Resolutions,
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
