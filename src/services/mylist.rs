//! Adding files to and removing them from the personal library.

use std::sync::Arc;

use chrono::Utc;
use sea_orm::Value;
use tracing::{debug, info, warn};

use super::SyncError;
use super::file::{FileEntity, cleared_mylist};
use super::sync::Refresh;
use crate::clients::link::{MylistAdd, MylistQuery};
use crate::clients::{Command, ResultCode};
use crate::domain::{MylistState, Priority};
use crate::entities::file;

/// What to record when adding a file to the mylist.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MylistEntry {
    pub state: MylistState,
    pub watched: bool,
    pub source: Option<String>,
    pub other: Option<String>,
}

impl FileEntity {
    /// Adds the file to the mylist.
    ///
    /// Known files are added by id. Generic files get one generic entry per
    /// covered episode, sent one after another. Anything else is added by
    /// size and hash, or by anime and episode when there is no hash.
    ///
    /// Local mylist fields are written once the service has confirmed at
    /// least one request. A generic add confirmed for only some of its
    /// episodes still counts as added; the unconfirmed targets are logged.
    ///
    /// Returns whether anything was confirmed.
    pub async fn add_to_mylist(self: &Arc<Self>, entry: MylistEntry) -> Result<bool, SyncError> {
        if let Err(e) = self.update_if_old(false).await {
            warn!(entity = %self.describe(), error = %e, "Refresh before mylist add failed");
        }

        let targets = if let Some(fid) = self.fid().await {
            vec![(MylistQuery::File(fid), false)]
        } else if self.is_generic().await {
            self.episode_targets()
                .await
                .into_iter()
                .map(|query| (query, true))
                .collect()
        } else if let Some(query) = self.hash_target().await? {
            vec![(query, false)]
        } else {
            self.episode_targets()
                .await
                .into_iter()
                .take(1)
                .map(|query| (query, false))
                .collect()
        };
        if targets.is_empty() {
            warn!(entity = %self.describe(), "Nothing identifies the file, not adding to mylist");
            return Ok(false);
        }

        let _guard = self.lock.lock().await;
        let requested = targets.len();
        let mut confirmed = 0;
        for (target, generic) in targets {
            let command = Command::MylistAdd(MylistAdd {
                target: target.clone(),
                generic,
                state: entry.state,
                viewed: entry.watched,
                source: entry.source.clone(),
                other: entry.other.clone(),
            });
            match self.ctx.link.request(command, Priority::Interactive).await {
                Ok(response) => match response.code {
                    ResultCode::MylistEntryAdded | ResultCode::AlreadyInMylist => {
                        debug!(?target, code = %response.code, "Mylist add confirmed");
                        confirmed += 1;
                    }
                    code => warn!(?target, %code, "Could not add to mylist"),
                },
                Err(e) => warn!(?target, error = %e, "Mylist add request failed"),
            }
        }

        if confirmed == 0 {
            return Ok(false);
        }
        if confirmed < requested {
            warn!(entity = %self.describe(), confirmed, requested, "Mylist add only partly confirmed");
        }
        info!(entity = %self.describe(), confirmed, "Added to mylist");

        let mut values = vec![
            (file::Column::MylistState, Value::from(entry.state.code())),
            (file::Column::MylistViewed, Value::from(entry.watched)),
            (file::Column::MylistSource, Value::from(entry.source)),
            (file::Column::MylistOther, Value::from(entry.other)),
        ];
        if entry.watched {
            values.push((file::Column::MylistViewdate, Value::from(Some(Utc::now()))));
        }
        values.extend(self.local_values().await);
        self.commit("mylist add", values).await;
        Ok(true)
    }

    /// Removes the file from the mylist.
    ///
    /// By id when the cached record knows it, else by size and hash, else
    /// one request per covered episode. Local mylist fields are cleared once
    /// a removal is confirmed.
    pub async fn remove_from_mylist(self: &Arc<Self>) -> Result<bool, SyncError> {
        let cached_fid = self.record().await.and_then(|r| r.fid);
        let targets = if let Some(fid) = cached_fid {
            vec![MylistQuery::File(fid)]
        } else if let Some(query) = self.hash_target().await? {
            vec![query]
        } else {
            self.episode_targets().await
        };
        if targets.is_empty() {
            warn!(entity = %self.describe(), "Nothing identifies the file, not removing from mylist");
            return Ok(false);
        }

        let _guard = self.lock.lock().await;
        let mut confirmed = 0;
        for target in targets {
            match self
                .ctx
                .link
                .request(Command::MylistDel(target.clone()), Priority::Interactive)
                .await
            {
                Ok(response) => match response.code {
                    ResultCode::MylistEntryDeleted => confirmed += 1,
                    ResultCode::NoSuchMylistEntry => {
                        warn!(?target, "Not in mylist, nothing to remove");
                    }
                    code => warn!(?target, %code, "Unexpected response to mylist removal"),
                },
                Err(e) => warn!(?target, error = %e, "Mylist removal request failed"),
            }
        }

        if confirmed == 0 {
            return Ok(false);
        }
        info!(entity = %self.describe(), confirmed, "Removed from mylist");

        if self.record().await.is_some() {
            self.commit("mylist removal", cleared_mylist()).await;
        }
        Ok(true)
    }

    async fn hash_target(&self) -> Result<Option<MylistQuery>, SyncError> {
        Ok(self
            .content_key()
            .await?
            .map(|(size, ed2k)| MylistQuery::Hash { size, ed2k }))
    }

    /// One `(anime, episode)` target per covered episode.
    async fn episode_targets(self: &Arc<Self>) -> Vec<MylistQuery> {
        let Some(anime) = self.anime().await else {
            return Vec::new();
        };
        let aid = anime.aid();
        self.multi_episodes()
            .await
            .into_iter()
            .map(|epno| MylistQuery::Episode { aid, epno })
            .collect()
    }
}
