use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

use super::SyncError;
use super::sync::{self, Refresh, settle};
use crate::clients::{AnimeTitle, Command, Record, ResultCode, TitleQuery};
use crate::db::RelationInput;
use crate::domain::{Priority, RelationType};
use crate::entities::anime;
use crate::parser::fields::{LIST_SEPARATOR, RELATED_AID_LIST, RELATED_AID_TYPE};
use crate::state::SyncContext;

/// Maximum number of related anime resolved at once.
const RELATION_LOOKUP_CONCURRENCY: usize = 8;

/// How to pick the anime an [`AnimeEntity`] mirrors.
#[derive(Debug, Clone)]
pub enum AnimeSource<'a> {
    Id(i32),
    /// Free text; the best-ranked title match wins whatever its score.
    Name(&'a str),
    /// An already loaded cache row.
    Record(anime::Model),
}

/// A cached anime, refreshed lazily from the remote service.
pub struct AnimeEntity {
    ctx: Arc<SyncContext>,
    aid: i32,
    titles: Vec<AnimeTitle>,
    title: String,
    record: RwLock<Option<anime::Model>>,
    lock: Arc<Mutex<()>>,
}

impl AnimeEntity {
    /// Resolves the anime through the title index and loads its cache row.
    ///
    /// # Errors
    ///
    /// - [`SyncError::UnknownAnime`] if the title index has no candidate for
    ///   an id or name lookup
    /// - [`SyncError::Database`] if the cache row cannot be read
    pub async fn new(ctx: Arc<SyncContext>, source: AnimeSource<'_>) -> Result<Arc<Self>, SyncError> {
        let (query, record) = match source {
            AnimeSource::Id(aid) => (TitleQuery::Id(aid), None),
            AnimeSource::Name(name) => (TitleQuery::Name(name), None),
            AnimeSource::Record(model) => (TitleQuery::Id(model.aid), Some(model)),
        };

        let candidate = ctx.titles.resolve(query, 0.0).into_iter().next();
        let (aid, titles, title) = match (candidate, &record) {
            (Some(candidate), _) => {
                let title = candidate.display_title().to_string();
                (candidate.aid, candidate.titles, title)
            }
            (None, Some(model)) => (model.aid, Vec::new(), format!("aid {}", model.aid)),
            (None, None) => return Err(SyncError::UnknownAnime(query.to_string())),
        };

        let record = match record {
            Some(model) => Some(model),
            None => ctx.store.get_anime(aid).await?,
        };
        debug!(aid, title = %title, cached = record.is_some(), "Anime entity ready");

        Ok(Arc::new(Self {
            ctx,
            aid,
            titles,
            title,
            record: RwLock::new(record),
            lock: Arc::new(Mutex::new(())),
        }))
    }

    #[must_use]
    pub const fn aid(&self) -> i32 {
        self.aid
    }

    /// Main title, falling back to the title index's canonical title.
    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn titles(&self) -> &[AnimeTitle] {
        &self.titles
    }

    /// Cached row as of now, without triggering a refresh.
    pub async fn record(&self) -> Option<anime::Model> {
        self.record.read().await.clone()
    }

    pub async fn update(self: &Arc<Self>, block: bool) -> Result<(), SyncError> {
        sync::update(self, block).await
    }

    pub async fn update_if_old(self: &Arc<Self>, block: bool) -> Result<(), SyncError> {
        sync::update_if_old(self, self.ctx.settings.anime_max_age(), block).await
    }

    /// Cached row after a staleness check. Only blocks when nothing is
    /// cached yet; a stale row is served while the refresh runs.
    pub async fn current(self: &Arc<Self>) -> Option<anime::Model> {
        if let Err(e) = self.update_if_old(false).await {
            debug!(aid = self.aid, error = %e, "Staleness refresh failed");
        }
        self.record().await
    }

    pub async fn episode_count(self: &Arc<Self>) -> Option<i32> {
        self.current().await.and_then(|r| r.episodes)
    }

    pub async fn year(self: &Arc<Self>) -> Option<String> {
        self.current().await.and_then(|r| r.year)
    }

    pub async fn anime_type(self: &Arc<Self>) -> Option<String> {
        self.current().await.and_then(|r| r.anime_type)
    }

    pub async fn rating(self: &Arc<Self>) -> Option<i32> {
        self.current().await.and_then(|r| r.rating)
    }

    pub async fn air_date(self: &Arc<Self>) -> Option<DateTime<Utc>> {
        self.current().await.and_then(|r| r.air_date)
    }

    pub async fn end_date(self: &Arc<Self>) -> Option<DateTime<Utc>> {
        self.current().await.and_then(|r| r.end_date)
    }

    /// Related anime with their relation type.
    ///
    /// Related ids the title index does not know are skipped.
    pub async fn relations(self: &Arc<Self>) -> Vec<(RelationType, Arc<Self>)> {
        if let Err(e) = self.update_if_old(false).await {
            debug!(aid = self.aid, error = %e, "Staleness refresh failed");
        }

        let rows = match self.ctx.store.get_anime_relations(self.aid).await {
            Ok(rows) => rows,
            Err(e) => {
                warn!(aid = self.aid, error = %format!("{e:#}"), "Failed to load relations");
                return Vec::new();
            }
        };

        let ctx = &self.ctx;
        let aid = self.aid;
        stream::iter(rows)
            .map(|row| async move {
                match Self::new(Arc::clone(ctx), AnimeSource::Id(row.related_aid)).await {
                    Ok(entity) => Some((row.kind(), entity)),
                    Err(e) => {
                        warn!(
                            aid,
                            related_aid = row.related_aid,
                            error = %e,
                            "Skipping unresolvable relation"
                        );
                        None
                    }
                }
            })
            .buffered(RELATION_LOOKUP_CONCURRENCY)
            .filter_map(|x| async move { x })
            .collect()
            .await
    }

    async fn merge(&self, mut record: Record) {
        let relations = parse_relations(
            record.remove(RELATED_AID_LIST).as_deref(),
            record.remove(RELATED_AID_TYPE).as_deref(),
        );
        let values = self.ctx.fields.anime.convert::<anime::Column>(&record);

        let merged = self
            .ctx
            .store
            .merge_anime(self.aid, values, relations)
            .await;
        if let Some(model) = settle("anime", merged) {
            debug!(aid = self.aid, "Anime merged");
            *self.record.write().await = Some(model);
        }
    }
}

#[async_trait::async_trait]
impl Refresh for AnimeEntity {
    fn refresh_lock(&self) -> &Arc<Mutex<()>> {
        &self.lock
    }

    fn describe(&self) -> String {
        format!("anime {}", self.aid)
    }

    async fn last_updated(&self) -> Option<DateTime<Utc>> {
        self.record.read().await.as_ref().map(|r| r.updated)
    }

    async fn refresh(&self, priority: Priority) -> Result<(), SyncError> {
        let fields = self
            .ctx
            .fields
            .anime
            .field_names()
            .chain([RELATED_AID_LIST, RELATED_AID_TYPE])
            .map(str::to_string)
            .collect();
        let command = Command::Anime {
            aid: self.aid,
            fields,
        };

        let response = match self.ctx.link.request(command, priority).await {
            Ok(response) => response,
            Err(e) => {
                warn!(aid = self.aid, error = %e, "Anime request failed");
                return Ok(());
            }
        };

        match response.code {
            ResultCode::Anime => {}
            ResultCode::NoSuchAnime => {
                info!(aid = self.aid, "Remote service has no such anime");
                return Ok(());
            }
            code => {
                warn!(aid = self.aid, %code, "Unexpected response to anime request");
                return Ok(());
            }
        }

        match response.into_first_record() {
            Some(record) => self.merge(record).await,
            None => warn!(aid = self.aid, "Anime response carried no data"),
        }
        Ok(())
    }
}

/// Zips the parallel related id and type lists.
///
/// `None` when the response carried neither list, so the stored relations
/// are left alone. Lists that disagree in length are truncated to the
/// shorter one. A pair with a malformed side is skipped without shifting
/// the pairs after it.
fn parse_relations(aids: Option<&str>, types: Option<&str>) -> Option<Vec<RelationInput>> {
    if aids.is_none() && types.is_none() {
        return None;
    }

    let split = |raw: Option<&str>| -> Vec<String> {
        raw.unwrap_or_default()
            .split(LIST_SEPARATOR)
            .map(|part| part.trim().to_string())
            .collect()
    };
    let aids = split(aids);
    let types = split(types);

    if aids.len() != types.len() {
        warn!(
            aids = aids.len(),
            types = types.len(),
            "Related id and type lists differ in length"
        );
    }
    let pairs: Vec<RelationInput> = aids
        .iter()
        .zip(&types)
        .filter(|(aid, kind)| !(aid.is_empty() && kind.is_empty()))
        .filter_map(|(aid, kind)| match (aid.parse(), kind.parse()) {
            (Ok(aid), Ok(kind)) => Some((aid, kind)),
            _ => {
                warn!(aid = %aid, kind = %kind, "Ignoring malformed relation pair");
                None
            }
        })
        .collect();
    Some(pairs)
}
