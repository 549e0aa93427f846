mod cache;
mod episodes;
mod init;

pub use cache::cmd_cache_stats;
pub use episodes::cmd_episodes;
pub use init::cmd_init;
