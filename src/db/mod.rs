use anyhow::Result;
use sea_orm::{
    ConnectOptions, ConnectionTrait, Database, DatabaseConnection, EntityTrait, PaginatorTrait,
    Statement, Value,
};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::info;

use crate::entities::{anime, anime_relation, episode, file, prelude::*};

pub mod migrator;
pub mod repositories;

pub use repositories::anime::{RelationInput, RelationPlan, plan_relations};

/// Row counts per cache table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub anime: u64,
    pub relations: u64,
    pub episodes: u64,
    pub files: u64,
}

/// Local cache database.
///
/// Reads go straight to the pool. Writes are serialized through
/// `write_lock` since SQLite allows a single writer at a time.
#[derive(Clone)]
pub struct Store {
    pub conn: DatabaseConnection,
    write_lock: Arc<Mutex<()>>,
}

impl Store {
    pub async fn new(db_url: &str) -> Result<Self> {
        Self::with_pool_options(db_url, 5, 1).await
    }

    pub async fn with_pool_options(
        db_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self> {
        use sea_orm_migration::MigratorTrait;

        if !db_url.contains(":memory:") {
            let path_str = db_url.trim_start_matches("sqlite:");
            if let Some(parent) = Path::new(path_str).parent() {
                tokio::fs::create_dir_all(parent).await.ok();
            }
            if !Path::new(path_str).exists() {
                std::fs::File::create(path_str)?;
            }
        }

        let mut opt = ConnectOptions::new(db_url.to_string());
        opt.max_connections(max_connections)
            .min_connections(min_connections)
            .connect_timeout(Duration::from_secs(10))
            .acquire_timeout(Duration::from_secs(10))
            .idle_timeout(Duration::from_secs(300))
            .max_lifetime(Duration::from_secs(600))
            .sqlx_logging(false);

        let conn = Database::connect(opt).await?;

        migrator::Migrator::up(&conn, None).await?;

        info!(
            "Cache database connected & migrations applied (pool: {}-{})",
            min_connections, max_connections
        );

        Ok(Self {
            conn,
            write_lock: Arc::new(Mutex::new(())),
        })
    }

    pub async fn ping(&self) -> Result<()> {
        let backend = self.conn.get_database_backend();
        self.conn
            .query_one(Statement::from_string(backend, "SELECT 1".to_string()))
            .await?;
        Ok(())
    }

    pub async fn close(self) -> Result<()> {
        self.conn.close().await?;
        info!("Cache database closed");
        Ok(())
    }

    fn anime_repo(&self) -> repositories::anime::AnimeRepository {
        repositories::anime::AnimeRepository::new(self.conn.clone())
    }

    fn episode_repo(&self) -> repositories::episode::EpisodeRepository {
        repositories::episode::EpisodeRepository::new(self.conn.clone())
    }

    fn file_repo(&self) -> repositories::file::FileRepository {
        repositories::file::FileRepository::new(self.conn.clone())
    }

    pub async fn stats(&self) -> Result<CacheStats> {
        Ok(CacheStats {
            anime: CachedAnime::find().count(&self.conn).await?,
            relations: AnimeRelation::find().count(&self.conn).await?,
            episodes: CachedEpisode::find().count(&self.conn).await?,
            files: CachedFile::find().count(&self.conn).await?,
        })
    }

    // Anime

    pub async fn get_anime(&self, aid: i32) -> Result<Option<anime::Model>> {
        self.anime_repo().get(aid).await
    }

    pub async fn get_anime_relations(&self, aid: i32) -> Result<Vec<anime_relation::Model>> {
        self.anime_repo().relations(aid).await
    }

    pub async fn merge_anime(
        &self,
        aid: i32,
        values: Vec<(anime::Column, Value)>,
        relations: Option<Vec<RelationInput>>,
    ) -> Result<anime::Model> {
        let _guard = self.write_lock.lock().await;
        self.anime_repo().merge(aid, values, relations).await
    }

    // Episodes

    pub async fn get_episode(&self, eid: i32) -> Result<Option<episode::Model>> {
        self.episode_repo().get(eid).await
    }

    pub async fn find_episode_by_number(
        &self,
        aid: i32,
        epno: &str,
    ) -> Result<Option<episode::Model>> {
        self.episode_repo().find_by_number(aid, epno).await
    }

    pub async fn merge_episode(
        &self,
        eid: i32,
        aid: i32,
        epno: String,
        values: Vec<(episode::Column, Value)>,
    ) -> Result<episode::Model> {
        let _guard = self.write_lock.lock().await;
        self.episode_repo().merge(eid, aid, epno, values).await
    }

    // Files

    pub async fn get_file(&self, id: i32) -> Result<Option<file::Model>> {
        self.file_repo().get(id).await
    }

    pub async fn find_file_by_fid(&self, fid: i32) -> Result<Option<file::Model>> {
        self.file_repo().find_by_fid(fid).await
    }

    pub async fn find_file_by_path(&self, path: &str) -> Result<Option<file::Model>> {
        self.file_repo().find_by_path(path).await
    }

    pub async fn find_generic_file(&self, aid: i32, eid: i32) -> Result<Option<file::Model>> {
        self.file_repo().find_generic(aid, eid).await
    }

    pub async fn delete_file(&self, id: i32) -> Result<bool> {
        let _guard = self.write_lock.lock().await;
        self.file_repo().delete(id).await
    }

    pub async fn merge_file(
        &self,
        id: Option<i32>,
        fid: Option<i32>,
        values: Vec<(file::Column, Value)>,
    ) -> Result<file::Model> {
        let _guard = self.write_lock.lock().await;
        self.file_repo().merge(id, fid, values).await
    }
}
