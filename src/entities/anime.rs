use sea_orm::entity::prelude::*;

/// Cached anime record, keyed by the remote anime id.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "anime")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub aid: i32,
    pub dateflags: Option<i32>,
    pub year: Option<String>,
    pub anime_type: Option<String>,
    pub episodes: Option<i32>,
    pub highest_episode_number: Option<i32>,
    pub special_ep_count: Option<i32>,
    pub air_date: Option<DateTimeUtc>,
    pub end_date: Option<DateTimeUtc>,
    pub url: Option<String>,
    pub picname: Option<String>,
    pub rating: Option<i32>,
    pub vote_count: Option<i32>,
    pub temp_rating: Option<i32>,
    pub temp_vote_count: Option<i32>,
    pub average_review_rating: Option<i32>,
    pub review_count: Option<i32>,
    pub restricted: Option<bool>,
    pub ann_id: Option<i32>,
    pub allcinema_id: Option<i32>,
    pub animenfo_id: Option<String>,
    pub anidb_updated: Option<DateTimeUtc>,
    pub updated: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::anime_relation::Entity")]
    AnimeRelation,
}

impl Related<super::anime_relation::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::AnimeRelation.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
