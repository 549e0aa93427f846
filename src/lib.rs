pub mod cli;
pub mod clients;
pub mod config;
pub mod db;
pub mod domain;
pub mod entities;
pub mod parser;
pub mod services;
pub mod state;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands};
pub use config::Config;
pub use state::SyncContext;

pub async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = Config::load()?;
    config.validate()?;

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.general.log_level));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    match cli.command {
        Commands::Init => cli::cmd_init(),
        Commands::Episodes { files } => {
            cli::cmd_episodes(&config, &files);
            Ok(())
        }
        Commands::Cache => cli::cmd_cache_stats(&config).await,
    }
}
