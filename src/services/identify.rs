//! Guessing which anime and episodes a file holds from its path alone.

use std::path::Path;

use tracing::debug;

use crate::clients::{TitleQuery, TitleResolver};
use crate::config::SyncConfig;
use crate::domain::EpisodeNumber;
use crate::parser::{episodes_from_filename, title_query_from_filename};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityGuess {
    pub aid: i32,
    pub episodes: Vec<EpisodeNumber>,
}

/// Guesses the anime and episodes of `path`.
///
/// Episode numbers come from the file name; without any, no title lookup is
/// made. The anime is matched on the parent directory name first, then on
/// the cleaned-up file name at the lower filename threshold.
pub fn guess_identity(
    path: &Path,
    titles: &dyn TitleResolver,
    settings: &SyncConfig,
) -> Option<IdentityGuess> {
    let filename = path.file_name()?.to_string_lossy();

    let episodes = episodes_from_filename(&filename, settings.max_episode_range);
    if episodes.is_empty() {
        debug!(file = %filename, "Could not figure out episode numbers");
        return None;
    }
    debug!(file = %filename, ?episodes, "Guessed episode numbers");

    let from_dir = path
        .parent()
        .and_then(Path::file_name)
        .map(|dir| dir.to_string_lossy())
        .filter(|dir| !dir.is_empty())
        .and_then(|dir| {
            let best = titles
                .resolve(TitleQuery::Name(&dir), settings.title_min_score)
                .into_iter()
                .next();
            match &best {
                Some(c) => debug!(dir = %dir, score = c.score, title = %c.canonical_title, "Directory matched"),
                None => debug!(dir = %dir, "Directory did not match"),
            }
            best
        });

    let candidate = from_dir.or_else(|| {
        let query = title_query_from_filename(&filename);
        if query.is_empty() {
            return None;
        }
        let best = titles
            .resolve(TitleQuery::Name(&query), settings.filename_title_min_score)
            .into_iter()
            .next();
        match &best {
            Some(c) => debug!(file = %filename, query = %query, score = c.score, title = %c.canonical_title, "File name matched"),
            None => debug!(file = %filename, query = %query, "File name did not match"),
        }
        best
    })?;

    Some(IdentityGuess {
        aid: candidate.aid,
        episodes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::TitleCandidate;
    use std::sync::Mutex;

    /// Matches one exact name and records every lookup.
    struct OneTitle {
        name: &'static str,
        aid: i32,
        queries: Mutex<Vec<(String, f32)>>,
    }

    impl OneTitle {
        fn new(name: &'static str, aid: i32) -> Self {
            Self {
                name,
                aid,
                queries: Mutex::new(Vec::new()),
            }
        }
    }

    impl TitleResolver for OneTitle {
        fn resolve(&self, query: TitleQuery<'_>, min_score: f32) -> Vec<TitleCandidate> {
            let TitleQuery::Name(name) = query else {
                return Vec::new();
            };
            self.queries
                .lock()
                .unwrap()
                .push((name.to_string(), min_score));
            if name == self.name {
                vec![TitleCandidate {
                    aid: self.aid,
                    titles: Vec::new(),
                    score: 1.0,
                    canonical_title: self.name.to_string(),
                }]
            } else {
                Vec::new()
            }
        }
    }

    #[test]
    fn test_directory_match() {
        let titles = OneTitle::new("Show", 42);
        let guess = guess_identity(
            Path::new("/media/Show/[Grp] Show - 05.mkv"),
            &titles,
            &SyncConfig::default(),
        )
        .unwrap();

        assert_eq!(guess.aid, 42);
        assert_eq!(guess.episodes, vec![EpisodeNumber::from(5)]);
        assert_eq!(titles.queries.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_falls_back_to_filename() {
        let titles = OneTitle::new("Some Show 05", 7);
        let guess = guess_identity(
            Path::new("/media/incoming/[Grp] Some Show - 05 [1080p].mkv"),
            &titles,
            &SyncConfig::default(),
        )
        .unwrap();
        assert_eq!(guess.aid, 7);

        let queries = titles.queries.lock().unwrap();
        assert_eq!(queries.len(), 2);
        assert_eq!(queries[0].0, "incoming");
        assert!((queries[0].1 - 0.8).abs() < f32::EPSILON);
        assert!((queries[1].1 - 0.6).abs() < f32::EPSILON);
    }

    #[test]
    fn test_no_episode_means_no_lookup() {
        let titles = OneTitle::new("Show", 42);
        let guess = guess_identity(
            Path::new("/media/Show/Random Title.mkv"),
            &titles,
            &SyncConfig::default(),
        );

        assert!(guess.is_none());
        assert!(titles.queries.lock().unwrap().is_empty());
    }
}
