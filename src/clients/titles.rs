//! Fuzzy title lookup contract.
//!
//! Scoring is up to the implementation; callers only rely on candidates
//! coming back best-first and on `min_score` filtering.

use std::fmt;

/// Kind of title as listed in the title dump.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TitleKind {
    Main,
    Official,
    Synonym,
    Short,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnimeTitle {
    pub title: String,
    /// Language code, `None` for the language-less main title.
    pub lang: Option<String>,
    pub kind: TitleKind,
}

impl AnimeTitle {
    #[must_use]
    pub fn main(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            lang: None,
            kind: TitleKind::Main,
        }
    }
}

/// One ranked match.
#[derive(Debug, Clone, PartialEq)]
pub struct TitleCandidate {
    pub aid: i32,
    pub titles: Vec<AnimeTitle>,
    pub score: f32,
    /// Title the implementation considers canonical for display.
    pub canonical_title: String,
}

impl TitleCandidate {
    /// Display title: the language-less main title, else the canonical one.
    #[must_use]
    pub fn display_title(&self) -> &str {
        self.titles
            .iter()
            .find(|t| t.lang.is_none() && t.kind == TitleKind::Main)
            .map_or(self.canonical_title.as_str(), |t| t.title.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TitleQuery<'a> {
    Id(i32),
    Name(&'a str),
}

impl fmt::Display for TitleQuery<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Id(aid) => write!(f, "aid {aid}"),
            Self::Name(name) => write!(f, "'{name}'"),
        }
    }
}

pub trait TitleResolver: Send + Sync {
    /// Ranked candidates scoring at least `min_score`, best first.
    fn resolve(&self, query: TitleQuery<'_>, min_score: f32) -> Vec<TitleCandidate>;
}
