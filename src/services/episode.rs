use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

use super::SyncError;
use super::anime::{AnimeEntity, AnimeSource};
use super::sync::{self, Refresh, settle};
use crate::clients::link::EpisodeQuery;
use crate::clients::{Command, Record, ResultCode};
use crate::domain::{EpisodeNumber, Priority};
use crate::entities::episode;
use crate::parser::fields::EPISODE_TITLE_FIELDS;
use crate::state::SyncContext;

/// A cached episode, identified by episode id or by anime and number.
pub struct EpisodeEntity {
    ctx: Arc<SyncContext>,
    eid: RwLock<Option<i32>>,
    anime: RwLock<Option<Arc<AnimeEntity>>>,
    epno: RwLock<Option<EpisodeNumber>>,
    record: RwLock<Option<episode::Model>>,
    lock: Arc<Mutex<()>>,
}

impl EpisodeEntity {
    /// Builds the entity and loads its cache row, by id when given, else by
    /// `(anime, epno)`.
    ///
    /// # Errors
    ///
    /// - [`SyncError::Construction`] when neither an id nor both anime and
    ///   episode number are given
    /// - [`SyncError::Database`] if the cache row cannot be read
    pub async fn new(
        ctx: Arc<SyncContext>,
        eid: Option<i32>,
        anime: Option<Arc<AnimeEntity>>,
        epno: Option<&str>,
    ) -> Result<Arc<Self>, SyncError> {
        let epno = epno.map(EpisodeNumber::new);
        let record = match (eid, &anime, &epno) {
            (Some(eid), _, _) => ctx.store.get_episode(eid).await?,
            (None, Some(anime), Some(epno)) => {
                ctx.store
                    .find_episode_by_number(anime.aid(), epno.as_str())
                    .await?
            }
            _ => {
                return Err(SyncError::Construction(
                    "episode needs an id or an anime and episode number".to_string(),
                ));
            }
        };

        let eid = eid.or_else(|| record.as_ref().map(|r| r.eid));
        let epno = epno.or_else(|| record.as_ref().map(|r| EpisodeNumber::new(&r.epno)));

        Ok(Arc::new(Self {
            ctx,
            eid: RwLock::new(eid),
            anime: RwLock::new(anime),
            epno: RwLock::new(epno),
            record: RwLock::new(record),
            lock: Arc::new(Mutex::new(())),
        }))
    }

    pub async fn by_id(ctx: Arc<SyncContext>, eid: i32) -> Result<Arc<Self>, SyncError> {
        Self::new(ctx, Some(eid), None, None).await
    }

    pub async fn by_number(
        ctx: Arc<SyncContext>,
        anime: Arc<AnimeEntity>,
        epno: &str,
    ) -> Result<Arc<Self>, SyncError> {
        Self::new(ctx, None, Some(anime), Some(epno)).await
    }

    pub async fn update(self: &Arc<Self>, block: bool) -> Result<(), SyncError> {
        sync::update(self, block).await
    }

    pub async fn update_if_old(self: &Arc<Self>, block: bool) -> Result<(), SyncError> {
        sync::update_if_old(self, self.ctx.settings.episode_max_age(), block).await
    }

    /// Cached row, refreshing first (blocking) when nothing is cached.
    pub async fn record(self: &Arc<Self>) -> Option<episode::Model> {
        if let Err(e) = self.update_if_old(false).await {
            debug!(entity = %self.describe(), error = %e, "Staleness refresh failed");
        }
        self.record.read().await.clone()
    }

    /// Episode id, resolving through the remote service if unknown.
    pub async fn eid(self: &Arc<Self>) -> Option<i32> {
        if let Some(eid) = self.known_eid().await {
            return Some(eid);
        }
        self.record().await.map(|r| r.eid)
    }

    /// Episode id if already known, never refreshing.
    pub async fn known_eid(&self) -> Option<i32> {
        *self.eid.read().await
    }

    pub async fn episode_number(self: &Arc<Self>) -> Option<EpisodeNumber> {
        if let Some(epno) = self.epno.read().await.clone() {
            return Some(epno);
        }
        self.record().await.map(|r| EpisodeNumber::new(&r.epno))
    }

    /// Owning anime, built from the cached anime id if not given.
    pub async fn anime(self: &Arc<Self>) -> Option<Arc<AnimeEntity>> {
        if let Some(anime) = self.anime.read().await.clone() {
            return Some(anime);
        }
        let aid = self.record().await?.aid;
        match AnimeEntity::new(Arc::clone(&self.ctx), AnimeSource::Id(aid)).await {
            Ok(anime) => {
                *self.anime.write().await = Some(Arc::clone(&anime));
                Some(anime)
            }
            Err(e) => {
                warn!(aid, error = %e, "Failed to resolve owning anime");
                None
            }
        }
    }

    async fn merge(&self, mut record: Record) {
        for field in EPISODE_TITLE_FIELDS {
            record.remove(field);
        }

        let eid = record
            .get("eid")
            .and_then(|raw| raw.trim().parse::<i32>().ok())
            .or(*self.eid.read().await);
        let Some(eid) = eid else {
            warn!("Episode response carried no episode id, not merging");
            return;
        };

        let epno = match record.get("epno") {
            Some(raw) => Some(EpisodeNumber::new(raw)),
            None => self.epno.read().await.clone(),
        };
        let Some(epno) = epno else {
            warn!(eid, "Episode response carried no episode number, not merging");
            return;
        };

        let known_aid = self.anime.read().await.as_ref().map(|a| a.aid());
        let aid = record
            .get("aid")
            .and_then(|raw| raw.trim().parse::<i32>().ok())
            .or(known_aid)
            .unwrap_or_default();

        let values = self.ctx.fields.episode.convert::<episode::Column>(&record);
        let merged = self
            .ctx
            .store
            .merge_episode(eid, aid, epno.as_str().to_string(), values)
            .await;
        if let Some(model) = settle("episode", merged) {
            debug!(eid, epno = %epno, "Episode merged");
            *self.eid.write().await = Some(eid);
            *self.epno.write().await = Some(epno);
            *self.record.write().await = Some(model);
        }
    }
}

#[async_trait::async_trait]
impl Refresh for EpisodeEntity {
    fn refresh_lock(&self) -> &Arc<Mutex<()>> {
        &self.lock
    }

    fn describe(&self) -> String {
        let eid = self.eid.try_read().ok().and_then(|e| *e);
        let epno = self.epno.try_read().ok().and_then(|e| e.clone());
        match (eid, epno) {
            (Some(eid), _) => format!("episode {eid}"),
            (None, Some(epno)) => format!("episode #{epno}"),
            (None, None) => "episode".to_string(),
        }
    }

    async fn last_updated(&self) -> Option<DateTime<Utc>> {
        self.record.read().await.as_ref().map(|r| r.updated)
    }

    async fn refresh(&self, priority: Priority) -> Result<(), SyncError> {
        let eid = *self.eid.read().await;
        let query = match eid {
            Some(eid) => EpisodeQuery::Id(eid),
            None => {
                let aid = self.anime.read().await.as_ref().map(|a| a.aid());
                let epno = self.epno.read().await.clone();
                match (aid, epno) {
                    (Some(aid), Some(epno)) => EpisodeQuery::Number { aid, epno },
                    _ => {
                        warn!("Episode has neither id nor anime and number, skipping refresh");
                        return Ok(());
                    }
                }
            }
        };

        let response = match self
            .ctx
            .link
            .request(Command::Episode(query.clone()), priority)
            .await
        {
            Ok(response) => response,
            Err(e) => {
                warn!(?query, error = %e, "Episode request failed");
                return Ok(());
            }
        };

        match response.code {
            ResultCode::Episode => match response.into_first_record() {
                Some(record) => self.merge(record).await,
                None => warn!(?query, "Episode response carried no data"),
            },
            ResultCode::NoSuchEpisode => {
                info!(?query, "Remote service has no such episode");
            }
            code => warn!(?query, %code, "Unexpected response to episode request"),
        }
        Ok(())
    }
}
