use anyhow::Result;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set,
    TransactionTrait, Value,
};

use crate::entities::{file, prelude::*};

pub struct FileRepository {
    conn: DatabaseConnection,
}

impl FileRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn get(&self, id: i32) -> Result<Option<file::Model>> {
        Ok(CachedFile::find_by_id(id).one(&self.conn).await?)
    }

    pub async fn find_by_fid(&self, fid: i32) -> Result<Option<file::Model>> {
        Ok(CachedFile::find()
            .filter(file::Column::Fid.eq(fid))
            .one(&self.conn)
            .await?)
    }

    pub async fn find_by_path(&self, path: &str) -> Result<Option<file::Model>> {
        Ok(CachedFile::find()
            .filter(file::Column::Path.eq(path))
            .one(&self.conn)
            .await?)
    }

    /// Generic placeholder row standing in for "some file of this episode".
    pub async fn find_generic(&self, aid: i32, eid: i32) -> Result<Option<file::Model>> {
        Ok(CachedFile::find()
            .filter(file::Column::Aid.eq(aid))
            .filter(file::Column::Eid.eq(eid))
            .filter(file::Column::IsGeneric.eq(true))
            .one(&self.conn)
            .await?)
    }

    pub async fn delete(&self, id: i32) -> Result<bool> {
        let result = CachedFile::delete_by_id(id).exec(&self.conn).await?;
        Ok(result.rows_affected > 0)
    }

    /// Applies converted column values to the row `id`, or to the path-less
    /// row holding `fid` when `id` is unknown, inserting a new row (carrying
    /// `fid`) if neither exists. Bumps `updated`.
    ///
    /// Rows with a path are keyed by that path, so copies of one remote file
    /// at different paths each keep their row. A path-less row is keyed by
    /// its `fid`: other path-less rows claiming it are dropped.
    pub async fn merge(
        &self,
        id: Option<i32>,
        fid: Option<i32>,
        values: Vec<(file::Column, Value)>,
    ) -> Result<file::Model> {
        let txn = self.conn.begin().await?;

        let existing = match (id, fid) {
            (Some(id), _) => CachedFile::find_by_id(id).one(&txn).await?,
            (None, Some(fid)) => {
                CachedFile::find()
                    .filter(file::Column::Fid.eq(fid))
                    .filter(file::Column::Path.is_null())
                    .one(&txn)
                    .await?
            }
            (None, None) => None,
        };
        let is_new = existing.is_none();
        let mut active: file::ActiveModel = match existing {
            Some(model) => model.into(),
            None => file::ActiveModel {
                fid: Set(fid),
                aid: Set(0),
                eid: Set(0),
                is_generic: Set(false),
                ..Default::default()
            },
        };
        for (column, value) in values {
            active.set(column, value);
        }
        active.updated = Set(Utc::now());

        let model = if is_new {
            active.insert(&txn).await?
        } else {
            active.update(&txn).await?
        };

        if let (Some(fid), None) = (model.fid, &model.path) {
            CachedFile::delete_many()
                .filter(file::Column::Fid.eq(fid))
                .filter(file::Column::Path.is_null())
                .filter(file::Column::Id.ne(model.id))
                .exec(&txn)
                .await?;
        }

        txn.commit().await?;
        Ok(model)
    }
}
