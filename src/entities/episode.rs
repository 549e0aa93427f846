use sea_orm::entity::prelude::*;

/// Cached episode record, keyed by the remote episode id.
///
/// Looked up by `(aid, epno)` when the episode id is not known yet.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "episode")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub eid: i32,
    pub aid: i32,
    pub epno: String,
    pub length: Option<i32>,
    pub rating: Option<i32>,
    pub votes: Option<i32>,
    pub aired: Option<DateTimeUtc>,
    pub kind: Option<i32>,
    pub updated: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
