use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use sea_orm::{IdenStatic, Value};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

use super::SyncError;
use super::anime::{AnimeEntity, AnimeSource};
use super::episode::EpisodeEntity;
use super::identify::guess_identity;
use super::sync::{self, Refresh, settle};
use crate::clients::link::{FileQuery, MylistQuery};
use crate::clients::{Command, FileStat, Record, ResultCode};
use crate::domain::{EpisodeNumber, Priority};
use crate::entities::file;
use crate::parser::FileState;
use crate::parser::fields::{FILE_STATE, MYLIST_IGNORED_FIELDS};
use crate::state::SyncContext;

/// What a [`FileEntity`] is built from.
pub enum FileKey {
    /// A local file. Probed for size and modification time on construction.
    Path(PathBuf),
    /// A remote file id.
    Id(i32),
    /// "Some file of this episode", backed by a generic record.
    Episode {
        anime: Arc<AnimeEntity>,
        episode: Arc<EpisodeEntity>,
    },
}

/// A cached file.
///
/// Refresh runs in two phases under one lock: file metadata first, then
/// the mylist entry. A file the remote service cannot identify gets a
/// generic record, and its anime and episodes are guessed from the path.
pub struct FileEntity {
    pub(super) ctx: Arc<SyncContext>,
    path: Option<PathBuf>,
    stat: Option<FileStat>,
    fid: RwLock<Option<i32>>,
    hash: RwLock<Option<String>>,
    anime: RwLock<Option<Arc<AnimeEntity>>>,
    episode: RwLock<Option<Arc<EpisodeEntity>>>,
    multiep: RwLock<Vec<EpisodeNumber>>,
    record: RwLock<Option<file::Model>>,
    pub(super) lock: Arc<Mutex<()>>,
}

impl FileEntity {
    /// Builds the entity and loads its cache row.
    ///
    /// For a path, a cached row whose size no longer matches the file on
    /// disk is deleted before anything else happens.
    ///
    /// # Errors
    ///
    /// - [`SyncError::Probe`] if the path cannot be stat'ed
    /// - [`SyncError::Database`] if the cache row cannot be read
    pub async fn new(ctx: Arc<SyncContext>, key: FileKey) -> Result<Arc<Self>, SyncError> {
        let mut path = None;
        let mut stat = None;
        let mut fid = None;
        let mut anime = None;
        let mut episode = None;

        let record = match key {
            FileKey::Path(p) => {
                let probed = ctx
                    .probe
                    .stat(&p)
                    .await
                    .map_err(|source| SyncError::Probe {
                        path: p.clone(),
                        source,
                    })?
                    .truncated();
                let cached = ctx.store.find_file_by_path(&path_key(&p)).await?;
                let record = match cached {
                    Some(row) if row.size != Some(probed.size) => {
                        info!(
                            path = %p.display(),
                            cached_size = ?row.size,
                            size = probed.size,
                            "File changed on disk, discarding cached row"
                        );
                        settle("stale file row removal", ctx.store.delete_file(row.id).await);
                        None
                    }
                    other => other,
                };
                path = Some(p);
                stat = Some(probed);
                record
            }
            FileKey::Id(id) => {
                fid = Some(id);
                ctx.store.find_file_by_fid(id).await?
            }
            FileKey::Episode {
                anime: a,
                episode: e,
            } => {
                let record = match e.known_eid().await {
                    Some(eid) => ctx.store.find_generic_file(a.aid(), eid).await?,
                    None => None,
                };
                anime = Some(a);
                episode = Some(e);
                record
            }
        };

        let fid = fid.or_else(|| record.as_ref().and_then(|r| r.fid));
        let multiep = record
            .as_ref()
            .map(file::Model::guessed_episodes)
            .unwrap_or_default();
        if let Some(row) = &record {
            debug!(id = row.id, fid = ?row.fid, "Found cached file row");
        }

        Ok(Arc::new(Self {
            ctx,
            path,
            stat,
            fid: RwLock::new(fid),
            hash: RwLock::new(None),
            anime: RwLock::new(anime),
            episode: RwLock::new(episode),
            multiep: RwLock::new(multiep),
            record: RwLock::new(record),
            lock: Arc::new(Mutex::new(())),
        }))
    }

    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Size and modification time probed at construction.
    #[must_use]
    pub const fn stat(&self) -> Option<FileStat> {
        self.stat
    }

    /// Cached row as of now, without triggering a refresh.
    pub async fn record(&self) -> Option<file::Model> {
        self.record.read().await.clone()
    }

    pub async fn update(self: &Arc<Self>, block: bool) -> Result<(), SyncError> {
        sync::update(self, block).await
    }

    pub async fn update_if_old(self: &Arc<Self>, block: bool) -> Result<(), SyncError> {
        sync::update_if_old(self, self.ctx.settings.file_max_age(), block).await
    }

    async fn force_refresh(self: &Arc<Self>) {
        if let Err(e) = self.update(true).await {
            warn!(entity = %self.describe(), error = %e, "Refresh failed");
        }
    }

    /// Remote file id.
    ///
    /// Forces a blocking refresh when neither memory nor cache knows it,
    /// unless the cached record is generic (the service has no such file).
    pub async fn fid(self: &Arc<Self>) -> Option<i32> {
        if let Some(fid) = self.known_fid().await {
            return Some(fid);
        }
        let generic = self.record.read().await.as_ref().is_some_and(|r| r.is_generic);
        if !generic {
            self.force_refresh().await;
        }
        self.known_fid().await
    }

    /// Whether the cached record is a generic placeholder.
    pub async fn is_generic(self: &Arc<Self>) -> bool {
        if let Err(e) = self.update_if_old(false).await {
            debug!(entity = %self.describe(), error = %e, "Staleness refresh failed");
        }
        self.record.read().await.as_ref().is_some_and(|r| r.is_generic)
    }

    /// Anime the file belongs to, refreshing first when its id is unknown.
    pub async fn anime(self: &Arc<Self>) -> Option<Arc<AnimeEntity>> {
        if let Some(anime) = self.anime.read().await.clone() {
            return Some(anime);
        }
        if self.cached_aid().await.is_none() {
            self.force_refresh().await;
            if let Some(anime) = self.anime.read().await.clone() {
                return Some(anime);
            }
        }
        let aid = self.cached_aid().await?;
        match AnimeEntity::new(Arc::clone(&self.ctx), AnimeSource::Id(aid)).await {
            Ok(anime) => {
                *self.anime.write().await = Some(Arc::clone(&anime));
                Some(anime)
            }
            Err(e) => {
                warn!(aid, error = %e, "Failed to resolve anime of file");
                None
            }
        }
    }

    /// Episode the file belongs to, refreshing first when its id is unknown.
    pub async fn episode(self: &Arc<Self>) -> Option<Arc<EpisodeEntity>> {
        if let Some(episode) = self.episode.read().await.clone() {
            return Some(episode);
        }
        if self.cached_eid().await.is_none() {
            self.force_refresh().await;
            if let Some(episode) = self.episode.read().await.clone() {
                return Some(episode);
            }
        }
        let eid = self.cached_eid().await?;
        let anime = self.anime.read().await.clone();
        match EpisodeEntity::new(Arc::clone(&self.ctx), Some(eid), anime, None).await {
            Ok(episode) => {
                *self.episode.write().await = Some(Arc::clone(&episode));
                Some(episode)
            }
            Err(e) => {
                warn!(eid, error = %e, "Failed to resolve episode of file");
                None
            }
        }
    }

    /// Every episode number the file covers.
    ///
    /// Guessed numbers when the file was identified from its name, else the
    /// number of the single episode it belongs to.
    pub async fn multi_episodes(self: &Arc<Self>) -> Vec<EpisodeNumber> {
        let guessed = self.multiep.read().await.clone();
        if !guessed.is_empty() {
            return guessed;
        }
        match self.episode().await {
            Some(episode) => episode.episode_number().await.into_iter().collect(),
            None => Vec::new(),
        }
    }

    /// Content hash of the file.
    ///
    /// The cached hash is reused while the file's size and modification
    /// time still match the cached row; otherwise it is recomputed.
    pub async fn ed2khash(&self) -> Result<Option<String>, SyncError> {
        if let Some(hash) = self.hash.read().await.clone() {
            return Ok(Some(hash));
        }

        let cached = self.record.read().await.clone();
        let Some(path) = &self.path else {
            return Ok(cached.and_then(|r| r.ed2khash));
        };

        let probe_err = |source| SyncError::Probe {
            path: path.clone(),
            source,
        };
        let live = self.ctx.probe.stat(path).await.map_err(probe_err)?.truncated();
        let reusable = cached.and_then(|r| {
            (r.size == Some(live.size) && r.mtime == Some(live.mtime))
                .then_some(r.ed2khash)
                .flatten()
        });

        let hash = match reusable {
            Some(hash) => hash,
            None => {
                debug!(path = %path.display(), "Hashing file");
                self.ctx.probe.hash(path).await.map_err(probe_err)?
            }
        };
        *self.hash.write().await = Some(hash.clone());
        Ok(Some(hash))
    }

    pub(super) async fn known_fid(&self) -> Option<i32> {
        if let Some(fid) = *self.fid.read().await {
            return Some(fid);
        }
        self.record.read().await.as_ref().and_then(|r| r.fid)
    }

    async fn cached_aid(&self) -> Option<i32> {
        self.record
            .read()
            .await
            .as_ref()
            .map(|r| r.aid)
            .filter(|aid| *aid != 0)
    }

    async fn cached_eid(&self) -> Option<i32> {
        self.record
            .read()
            .await
            .as_ref()
            .map(|r| r.eid)
            .filter(|eid| *eid != 0)
    }

    /// `(size, hash)` identifying the content, without refreshing.
    pub(super) async fn content_key(&self) -> Result<Option<(i64, String)>, SyncError> {
        let size = match self.stat {
            Some(stat) => Some(stat.size),
            None => self.record.read().await.as_ref().and_then(|r| r.size),
        };
        let Some(size) = size else {
            return Ok(None);
        };
        Ok(self.ed2khash().await?.map(|hash| (size, hash)))
    }

    /// Columns describing the local file, for any write made on its behalf.
    pub(super) async fn local_values(&self) -> Vec<(file::Column, Value)> {
        let (Some(path), Some(stat)) = (&self.path, self.stat) else {
            return Vec::new();
        };
        let mut values = vec![
            (file::Column::Path, Value::from(path_key(path))),
            (file::Column::Size, Value::from(stat.size)),
            (file::Column::Mtime, Value::from(Some(stat.mtime))),
        ];
        if let Some(hash) = self.hash.read().await.clone() {
            values.push((file::Column::Ed2khash, Value::from(hash)));
        }
        values
    }

    /// Adds the anime and episode ids held in memory for every id column
    /// `values` does not already set. Learns the episode id if needed.
    async fn with_identity(
        &self,
        mut values: Vec<(file::Column, Value)>,
    ) -> Vec<(file::Column, Value)> {
        if let Some(anime) = self.anime.read().await.clone() {
            fill_missing(&mut values, file::Column::Aid, Value::from(anime.aid()));
        }
        let episode = self.episode.read().await.clone();
        if let Some(episode) = episode {
            if let Some(eid) = episode.eid().await {
                fill_missing(&mut values, file::Column::Eid, Value::from(eid));
            }
        }
        values
    }

    /// Writes `values` to this file's row and adopts the result.
    pub(super) async fn commit(&self, what: &str, values: Vec<(file::Column, Value)>) {
        let values = self.with_identity(values).await;
        let id = self.record.read().await.as_ref().map(|r| r.id);
        let fid = self.known_fid().await;
        let merged = self.ctx.store.merge_file(id, fid, values).await;
        if let Some(model) = settle(what, merged) {
            if let Some(fid) = model.fid {
                *self.fid.write().await = Some(fid);
            }
            *self.record.write().await = Some(model);
        }
    }

    async fn fetch_file_info(&self, priority: Priority) {
        let query = if let Some(fid) = self.known_fid().await {
            FileQuery::Id(fid)
        } else {
            match self.content_key().await {
                Ok(Some((size, ed2k))) => FileQuery::Hash { size, ed2k },
                Ok(None) => {
                    debug!(entity = %self.describe(), "No id or content key, skipping file lookup");
                    return;
                }
                Err(e) => {
                    warn!(entity = %self.describe(), error = %e, "Cannot hash file, skipping file lookup");
                    return;
                }
            }
        };

        let fields = self
            .ctx
            .fields
            .file
            .field_names()
            .chain([FILE_STATE])
            .map(str::to_string)
            .collect();
        let command = Command::File {
            query: query.clone(),
            fields,
        };
        let response = match self.ctx.link.request(command, priority).await {
            Ok(response) => response,
            Err(e) => {
                warn!(?query, error = %e, "File request failed");
                return;
            }
        };

        let mut values = match response.code {
            ResultCode::File => match response.into_first_record() {
                Some(record) => {
                    let mut values = self.with_identity(self.convert_file_info(record)).await;
                    fill_missing(&mut values, file::Column::Aid, Value::from(0));
                    fill_missing(&mut values, file::Column::Eid, Value::from(0));
                    values
                }
                None => {
                    warn!(?query, "File response carried no data");
                    return;
                }
            },
            ResultCode::NoSuchFile | ResultCode::NoSuchEpisode => {
                debug!(?query, code = %response.code, "Unknown file, storing generic record");
                vec![(file::Column::IsGeneric, Value::from(true))]
            }
            code => {
                warn!(?query, %code, "Unexpected response to file request");
                return;
            }
        };

        values.extend(self.local_values().await);
        self.commit("file info", values).await;
    }

    fn convert_file_info(&self, mut record: Record) -> Vec<(file::Column, Value)> {
        let state = record.remove(FILE_STATE);
        record.retain(|field, value| !(field.starts_with("mylist_") && value.is_empty()));

        let mut values = self.ctx.fields.file.convert::<file::Column>(&record);
        if let Some(raw) = state {
            let state = FileState::from_raw(&raw);
            values.push((file::Column::CrcOk, Value::from(state.crc_ok)));
            values.push((file::Column::FileVersion, Value::from(state.version)));
            values.push((file::Column::Censored, Value::from(state.censored)));
        }
        values.push((file::Column::IsGeneric, Value::from(false)));
        values
    }

    /// Anime and episode for the mylist lookup: from memory, from the
    /// cached ids, or guessed from the path. A fresh guess is written to
    /// the cache before returning.
    async fn resolve_identity(&self) -> Option<(Arc<AnimeEntity>, Arc<EpisodeEntity>)> {
        let mut anime = self.anime.read().await.clone();
        let mut episode = self.episode.read().await.clone();

        if anime.is_none() {
            if let Some(aid) = self.cached_aid().await {
                anime = self.build_anime(aid).await;
            }
        }
        if episode.is_none() {
            if let Some(eid) = self.cached_eid().await {
                episode = EpisodeEntity::new(Arc::clone(&self.ctx), Some(eid), anime.clone(), None)
                    .await
                    .inspect_err(|e| warn!(eid, error = %e, "Failed to load episode of file"))
                    .ok();
            }
        }

        if anime.is_none() || episode.is_none() {
            let path = self.path.as_deref()?;
            let guess = guess_identity(path, self.ctx.titles.as_ref(), &self.ctx.settings)?;
            info!(path = %path.display(), aid = guess.aid, episodes = ?guess.episodes, "Guessed file identity");

            if anime.is_none() {
                anime = self.build_anime(guess.aid).await;
            }
            let resolved_anime = anime.clone()?;
            if episode.is_none() {
                let first = guess.episodes.first()?.to_string();
                episode = EpisodeEntity::by_number(
                    Arc::clone(&self.ctx),
                    Arc::clone(&resolved_anime),
                    &first,
                )
                .await
                .inspect_err(|e| warn!(error = %e, "Failed to build guessed episode"))
                .ok();
            }
            let eid = match &episode {
                Some(episode) => episode.eid().await,
                None => None,
            };

            if self.record.read().await.is_some() {
                let json = serde_json::to_string(&guess.episodes).ok();
                let values = vec![
                    (file::Column::Aid, Value::from(resolved_anime.aid())),
                    (file::Column::Eid, Value::from(eid.unwrap_or_default())),
                    (file::Column::EpisodeNumbers, Value::from(json)),
                ];
                self.commit("guessed identity", values).await;
            }
            *self.multiep.write().await = guess.episodes;
        }

        let anime = anime?;
        let episode = episode?;
        *self.anime.write().await = Some(Arc::clone(&anime));
        *self.episode.write().await = Some(Arc::clone(&episode));
        Some((anime, episode))
    }

    async fn build_anime(&self, aid: i32) -> Option<Arc<AnimeEntity>> {
        AnimeEntity::new(Arc::clone(&self.ctx), AnimeSource::Id(aid))
            .await
            .inspect_err(|e| warn!(aid, error = %e, "Failed to load anime of file"))
            .ok()
    }

    async fn fetch_mylist(&self, priority: Priority) -> Result<(), SyncError> {
        let query = if let Some(fid) = self.known_fid().await {
            MylistQuery::File(fid)
        } else {
            let Some((anime, episode)) = self.resolve_identity().await else {
                debug!(entity = %self.describe(), "Identity unknown, skipping mylist lookup");
                return Ok(());
            };
            let Some(epno) = episode.episode_number().await else {
                debug!(entity = %self.describe(), "Episode number unknown, skipping mylist lookup");
                return Ok(());
            };
            MylistQuery::Episode {
                aid: anime.aid(),
                epno,
            }
        };

        let response = match self
            .ctx
            .link
            .request(Command::Mylist(query.clone()), priority)
            .await
        {
            Ok(response) => response,
            Err(e) => {
                warn!(?query, error = %e, "Mylist request failed");
                return Ok(());
            }
        };

        let mut values = match response.code {
            ResultCode::MultipleMylistEntries => {
                return Err(SyncError::Unsupported(format!(
                    "multiple mylist entries for one episode ({query:?})"
                )));
            }
            ResultCode::NoSuchEntry => {
                debug!(?query, "Not in mylist");
                let mut values = cleared_mylist();
                if self.record.read().await.is_none() {
                    values.push((file::Column::IsGeneric, Value::from(true)));
                }
                values
            }
            ResultCode::MylistEntry => match response.into_first_record() {
                Some(record) => self.convert_mylist(record),
                None => {
                    warn!(?query, "Mylist response carried no data");
                    return Ok(());
                }
            },
            code => {
                warn!(?query, %code, "Unexpected response to mylist request");
                return Ok(());
            }
        };

        values.extend(self.local_values().await);
        self.commit("mylist entry", values).await;
        Ok(())
    }

    fn convert_mylist(&self, mut record: Record) -> Vec<(file::Column, Value)> {
        for field in MYLIST_IGNORED_FIELDS {
            record.remove(field);
        }
        let viewed = record
            .get("viewdate")
            .is_some_and(|raw| !matches!(raw.trim(), "" | "0"));

        let mut values = self.ctx.fields.mylist.convert::<file::Column>(&record);
        values.push((file::Column::MylistViewed, Value::from(viewed)));
        values
    }
}

/// Mylist columns reset to "no entry".
pub(super) fn cleared_mylist() -> Vec<(file::Column, Value)> {
    vec![
        (file::Column::MylistState, Value::from(None::<i32>)),
        (file::Column::MylistFilestate, Value::from(None::<i32>)),
        (file::Column::MylistViewed, Value::from(None::<bool>)),
        (file::Column::MylistViewdate, Value::from(None::<DateTime<Utc>>)),
        (file::Column::MylistStorage, Value::from(None::<String>)),
        (file::Column::MylistSource, Value::from(None::<String>)),
        (file::Column::MylistOther, Value::from(None::<String>)),
    ]
}

/// Appends `(column, value)` unless `values` already sets that column.
fn fill_missing(values: &mut Vec<(file::Column, Value)>, column: file::Column, value: Value) {
    if !values.iter().any(|(c, _)| c.as_str() == column.as_str()) {
        values.push((column, value));
    }
}

fn path_key(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

#[async_trait::async_trait]
impl Refresh for FileEntity {
    fn refresh_lock(&self) -> &Arc<Mutex<()>> {
        &self.lock
    }

    fn describe(&self) -> String {
        if let Some(path) = &self.path {
            return format!("file '{}'", path.display());
        }
        match self.fid.try_read().ok().and_then(|f| *f) {
            Some(fid) => format!("file {fid}"),
            None => "generic file".to_string(),
        }
    }

    async fn last_updated(&self) -> Option<DateTime<Utc>> {
        self.record.read().await.as_ref().map(|r| r.updated)
    }

    async fn refresh(&self, priority: Priority) -> Result<(), SyncError> {
        self.fetch_file_info(priority).await;
        self.fetch_mylist(priority).await
    }
}
