//! Cache statistics command handler

use crate::config::Config;
use crate::db::Store;

pub async fn cmd_cache_stats(config: &Config) -> anyhow::Result<()> {
    let store = Store::with_pool_options(
        &config.general.database_path,
        config.general.max_db_connections,
        config.general.min_db_connections,
    )
    .await?;
    let stats = store.stats().await?;

    println!("Cache: {}", config.general.database_path);
    println!("{:-<40}", "");
    println!("  Anime:     {}", stats.anime);
    println!("  Relations: {}", stats.relations);
    println!("  Episodes:  {}", stats.episodes);
    println!("  Files:     {}", stats.files);

    store.close().await
}
