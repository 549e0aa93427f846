use std::sync::Arc;

use crate::clients::{FileProbe, RemoteLink, TitleResolver};
use crate::config::{Config, SyncConfig};
use crate::db::Store;
use crate::parser::FieldTables;

/// Everything a cache entity needs: the cache store, the three
/// collaborators, the field conversion tables and the sync policy.
///
/// Entities hold it behind an `Arc`; nothing in here is global.
#[derive(Clone)]
pub struct SyncContext {
    pub store: Store,

    pub link: Arc<dyn RemoteLink>,

    pub titles: Arc<dyn TitleResolver>,

    pub probe: Arc<dyn FileProbe>,

    pub fields: Arc<FieldTables>,

    pub settings: Arc<SyncConfig>,
}

impl SyncContext {
    #[must_use]
    pub fn new(
        store: Store,
        link: Arc<dyn RemoteLink>,
        titles: Arc<dyn TitleResolver>,
        probe: Arc<dyn FileProbe>,
        settings: SyncConfig,
    ) -> Self {
        Self {
            store,
            link,
            titles,
            probe,
            fields: Arc::new(FieldTables::default()),
            settings: Arc::new(settings),
        }
    }

    /// Replaces the default conversion tables.
    #[must_use]
    pub fn with_field_tables(mut self, fields: FieldTables) -> Self {
        self.fields = Arc::new(fields);
        self
    }

    /// Opens the cache database named in `config` and wires in the
    /// collaborators.
    pub async fn from_config(
        config: &Config,
        link: Arc<dyn RemoteLink>,
        titles: Arc<dyn TitleResolver>,
        probe: Arc<dyn FileProbe>,
    ) -> anyhow::Result<Self> {
        let store = Store::with_pool_options(
            &config.general.database_path,
            config.general.max_db_connections,
            config.general.min_db_connections,
        )
        .await?;

        Ok(Self::new(store, link, titles, probe, config.sync.clone()))
    }

    /// Releases the remote link first and the storage session last.
    pub async fn close(self) -> anyhow::Result<()> {
        let Self { store, link, .. } = self;
        drop(link);
        store.close().await
    }
}
