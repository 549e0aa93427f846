use sea_orm::entity::prelude::*;

use crate::domain::RelationType;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "anime_relation")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub anime_aid: i32,
    pub related_aid: i32,
    pub relation_type: i32,
}

impl Model {
    #[must_use]
    pub const fn kind(&self) -> RelationType {
        RelationType::from_code(self.relation_type)
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::anime::Entity",
        from = "Column::AnimeAid",
        to = "super::anime::Column::Aid",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Anime,
}

impl Related<super::anime::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Anime.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
