use sea_orm::entity::prelude::*;

use crate::domain::{EpisodeNumber, MylistState};

/// Cached file record.
///
/// `fid` is unknown for files the remote service could not identify; such
/// rows are keyed by `path` (plus `size`/`ed2khash`) instead. `aid`/`eid`
/// use `0` for "not identified".
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "file")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub fid: Option<i32>,
    pub aid: i32,
    pub eid: i32,
    pub gid: Option<i32>,
    pub path: Option<String>,
    pub size: Option<i64>,
    pub mtime: Option<DateTimeUtc>,
    pub ed2khash: Option<String>,
    pub md5: Option<String>,
    pub sha1: Option<String>,
    pub crc32: Option<String>,
    pub is_generic: bool,
    pub is_deprecated: Option<bool>,
    pub crc_ok: Option<bool>,
    pub file_version: Option<i32>,
    pub censored: Option<bool>,
    pub quality: Option<String>,
    pub source: Option<String>,
    pub video_codec: Option<String>,
    pub video_resolution: Option<String>,
    pub file_type: Option<String>,
    pub dub_language: Option<String>,
    pub sub_language: Option<String>,
    pub length_in_seconds: Option<i32>,
    pub description: Option<String>,
    pub aired_date: Option<DateTimeUtc>,
    pub episode_numbers: Option<String>, // JSON array stored as string
    pub mylist_state: Option<i32>,
    pub mylist_filestate: Option<i32>,
    pub mylist_viewed: Option<bool>,
    pub mylist_viewdate: Option<DateTimeUtc>,
    pub mylist_storage: Option<String>,
    pub mylist_source: Option<String>,
    pub mylist_other: Option<String>,
    pub updated: DateTimeUtc,
}

impl Model {
    /// Episode numbers guessed from the file name, if any were persisted.
    #[must_use]
    pub fn guessed_episodes(&self) -> Vec<EpisodeNumber> {
        self.episode_numbers
            .as_deref()
            .map(|json| serde_json::from_str(json).unwrap_or_default())
            .unwrap_or_default()
    }

    #[must_use]
    pub fn mylist_state(&self) -> Option<MylistState> {
        self.mylist_state.map(MylistState::from_code)
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
