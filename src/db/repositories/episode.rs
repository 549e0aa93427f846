use anyhow::Result;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set,
    TransactionTrait, Value,
};

use crate::entities::{episode, prelude::*};

pub struct EpisodeRepository {
    conn: DatabaseConnection,
}

impl EpisodeRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn get(&self, eid: i32) -> Result<Option<episode::Model>> {
        Ok(CachedEpisode::find_by_id(eid).one(&self.conn).await?)
    }

    pub async fn find_by_number(&self, aid: i32, epno: &str) -> Result<Option<episode::Model>> {
        Ok(CachedEpisode::find()
            .filter(episode::Column::Aid.eq(aid))
            .filter(episode::Column::Epno.eq(epno))
            .one(&self.conn)
            .await?)
    }

    /// Upserts the episode keyed by `eid`.
    ///
    /// A stale row holding the same `(aid, epno)` under another id is
    /// removed so the number keeps resolving to one episode.
    pub async fn merge(
        &self,
        eid: i32,
        aid: i32,
        epno: String,
        values: Vec<(episode::Column, Value)>,
    ) -> Result<episode::Model> {
        let txn = self.conn.begin().await?;

        let existing = CachedEpisode::find_by_id(eid).one(&txn).await?;
        let is_new = existing.is_none();
        let mut active: episode::ActiveModel = match existing {
            Some(model) => model.into(),
            None => episode::ActiveModel {
                eid: Set(eid),
                ..Default::default()
            },
        };
        active.aid = Set(aid);
        for (column, value) in values {
            active.set(column, value);
        }
        active.epno = Set(epno.clone());
        active.updated = Set(Utc::now());

        let aid = active.aid.clone().take().unwrap_or(aid);
        CachedEpisode::delete_many()
            .filter(episode::Column::Aid.eq(aid))
            .filter(episode::Column::Epno.eq(epno))
            .filter(episode::Column::Eid.ne(eid))
            .exec(&txn)
            .await?;

        let model = if is_new {
            active.insert(&txn).await?
        } else {
            active.update(&txn).await?
        };

        txn.commit().await?;
        Ok(model)
    }
}
