//! Recognizer registry entity

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "recognizers")]
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
    #[sea_orm(has_many = "super::reference::Entity")]
    References,

    #[sea_orm(has_many = "super::recognition::Entity")]
    Recognitions,
}

impl Related<super::reference::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::References.def()
    }
}

impl Related<super::recognition::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Recognitions.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
