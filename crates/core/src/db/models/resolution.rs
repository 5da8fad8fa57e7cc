//! Resolution marker: a resolver has processed a reference

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "resolutions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub reference_id: Uuid,

    #[sea_orm(primary_key, auto_increment = false, column_type = "Text")]
    pub resolver_id: String,

    pub created_at: DateTimeWithTimeZone,
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

impl ActiveModelBehavior for ActiveModel {}
