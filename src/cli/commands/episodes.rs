//! Episodes command handler

use std::path::PathBuf;

use crate::config::Config;
use crate::parser::{episodes_from_filename, title_query_from_filename};

pub fn cmd_episodes(config: &Config, files: &[PathBuf]) {
    for path in files {
        let Some(name) = path.file_name().map(|n| n.to_string_lossy()) else {
            println!("{}: not a file name", path.display());
            continue;
        };

        let episodes = episodes_from_filename(&name, config.sync.max_episode_range);
        let query = title_query_from_filename(&name);

        println!("{name}");
        if episodes.is_empty() {
            println!("  Episodes: (none found, no title lookup would be made)");
        } else {
            let list: Vec<String> = episodes.iter().map(ToString::to_string).collect();
            println!("  Episodes: {}", list.join(", "));
        }
        if let Some(dir) = path.parent().and_then(|p| p.file_name()) {
            println!("  Directory query: {}", dir.to_string_lossy());
        }
        println!("  Filename query:  {query}");
    }
}
