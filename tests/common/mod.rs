//! Shared fixtures: a temp-dir cache database and in-memory collaborators.

#![allow(dead_code)]

use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use anidb_sync::SyncContext;
use anidb_sync::clients::{
    AnimeTitle, Command, FileProbe, FileStat, LinkError, RemoteLink, Response, TitleCandidate,
    TitleQuery, TitleResolver,
};
use anidb_sync::config::SyncConfig;
use anidb_sync::db::Store;
use anidb_sync::domain::Priority;
use chrono::{DateTime, Utc};
use tokio::sync::watch;

pub async fn temp_store(name: &str) -> Store {
    let db_path =
        std::env::temp_dir().join(format!("anidb-sync-{name}-{}.db", uuid::Uuid::new_v4()));
    Store::new(&format!("sqlite:{}", db_path.display()))
        .await
        .expect("Failed to open cache database")
}

type Handler = dyn Fn(&Command) -> Response + Send + Sync;

/// Answers every command through a handler and records what was asked.
///
/// A gated link holds every answer until the gate is opened.
pub struct FakeLink {
    handler: Box<Handler>,
    requests: Mutex<Vec<(Command, Priority)>>,
    gate: Option<watch::Receiver<bool>>,
}

impl FakeLink {
    pub fn new(handler: impl Fn(&Command) -> Response + Send + Sync + 'static) -> Arc<Self> {
        Arc::new(Self {
            handler: Box::new(handler),
            requests: Mutex::new(Vec::new()),
            gate: None,
        })
    }

    pub fn gated(
        handler: impl Fn(&Command) -> Response + Send + Sync + 'static,
    ) -> (Arc<Self>, watch::Sender<bool>) {
        let (open, gate) = watch::channel(false);
        let link = Arc::new(Self {
            handler: Box::new(handler),
            requests: Mutex::new(Vec::new()),
            gate: Some(gate),
        });
        (link, open)
    }

    pub fn commands(&self) -> Vec<Command> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .map(|(command, _)| command.clone())
            .collect()
    }

    pub fn priorities(&self) -> Vec<Priority> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .map(|(_, priority)| *priority)
            .collect()
    }

    pub fn count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait::async_trait]
impl RemoteLink for FakeLink {
    async fn request(&self, command: Command, priority: Priority) -> Result<Response, LinkError> {
        self.requests
            .lock()
            .unwrap()
            .push((command.clone(), priority));

        if let Some(gate) = &self.gate {
            let mut gate = gate.clone();
            let opened = gate.wait_for(|open| *open).await.is_ok();
            if !opened {
                return Err(LinkError::Closed);
            }
        }
        Ok((self.handler)(&command))
    }
}

/// Exact-match title index.
#[derive(Default)]
pub struct FakeTitles {
    by_name: HashMap<String, i32>,
    by_id: HashMap<i32, String>,
    name_lookups: AtomicUsize,
}

impl FakeTitles {
    pub fn with(entries: &[(i32, &str)]) -> Arc<Self> {
        let mut titles = Self::default();
        for (aid, name) in entries {
            titles.by_name.insert((*name).to_string(), *aid);
            titles.by_id.insert(*aid, (*name).to_string());
        }
        Arc::new(titles)
    }

    pub fn name_lookups(&self) -> usize {
        self.name_lookups.load(Ordering::SeqCst)
    }
}

impl TitleResolver for FakeTitles {
    fn resolve(&self, query: TitleQuery<'_>, _min_score: f32) -> Vec<TitleCandidate> {
        let hit = match query {
            TitleQuery::Id(aid) => self.by_id.get(&aid).map(|name| (aid, name.clone())),
            TitleQuery::Name(name) => {
                self.name_lookups.fetch_add(1, Ordering::SeqCst);
                self.by_name.get(name).map(|aid| (*aid, name.to_string()))
            }
        };
        hit.map(|(aid, name)| TitleCandidate {
            aid,
            titles: vec![AnimeTitle::main(name.clone())],
            score: 1.0,
            canonical_title: name,
        })
        .into_iter()
        .collect()
    }
}

/// Files that exist only in memory.
#[derive(Default)]
pub struct FakeProbe {
    files: Mutex<HashMap<PathBuf, (FileStat, String)>>,
    hash_calls: AtomicUsize,
}

impl FakeProbe {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn add(&self, path: impl Into<PathBuf>, size: i64, hash: &str) {
        let stat = FileStat {
            size,
            mtime: mtime(),
        };
        self.files
            .lock()
            .unwrap()
            .insert(path.into(), (stat, hash.to_string()));
    }

    pub fn hash_calls(&self) -> usize {
        self.hash_calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl FileProbe for FakeProbe {
    async fn stat(&self, path: &Path) -> io::Result<FileStat> {
        self.files
            .lock()
            .unwrap()
            .get(path)
            .map(|(stat, _)| *stat)
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "no such file"))
    }

    async fn hash(&self, path: &Path) -> io::Result<String> {
        self.hash_calls.fetch_add(1, Ordering::SeqCst);
        self.files
            .lock()
            .unwrap()
            .get(path)
            .map(|(_, hash)| hash.clone())
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "no such file"))
    }
}

pub fn mtime() -> DateTime<Utc> {
    DateTime::from_timestamp(1_700_000_000, 0).unwrap()
}

pub fn context(
    store: Store,
    link: Arc<FakeLink>,
    titles: Arc<FakeTitles>,
    probe: Arc<FakeProbe>,
) -> Arc<SyncContext> {
    Arc::new(SyncContext::new(
        store,
        link,
        titles,
        probe,
        SyncConfig::default(),
    ))
}
