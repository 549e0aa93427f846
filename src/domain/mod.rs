//! Domain types shared by the cache entities.
//!
//! Newtypes and small enums that keep remote codes and episode numbering
//! from leaking around as bare strings and integers.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Episode number as the remote service spells it.
///
/// Regular episodes are numeric and are kept in canonical integer form
/// (`"05"` becomes `"5"`). Anything else, such as the special-episode
/// prefix in `"S2"`, is kept verbatim.
///
/// # Examples
///
/// ```rust
/// use anidb_sync::domain::EpisodeNumber;
///
/// assert_eq!(EpisodeNumber::new("05").as_str(), "5");
/// assert_eq!(EpisodeNumber::new("S2").as_str(), "S2");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EpisodeNumber(String);

impl EpisodeNumber {
    #[must_use]
    pub fn new(raw: &str) -> Self {
        let raw = raw.trim();
        raw.parse::<i64>()
            .map_or_else(|_| Self(raw.to_string()), |n| Self(n.to_string()))
    }

    /// Special episode `n`, spelled with the remote service's `S` prefix.
    #[must_use]
    pub fn special(n: u32) -> Self {
        Self(format!("S{n}"))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn is_special(&self) -> bool {
        self.0.starts_with(['S', 's'])
    }
}

impl fmt::Display for EpisodeNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EpisodeNumber {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

impl From<u32> for EpisodeNumber {
    fn from(n: u32) -> Self {
        Self(n.to_string())
    }
}

impl Serialize for EpisodeNumber {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for EpisodeNumber {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Ok(Self::new(&raw))
    }
}

/// Kind of link between two anime, stored as the remote numeric code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RelationType {
    Sequel,
    Prequel,
    SameSetting,
    AlternativeSetting,
    AlternativeVersion,
    MusicVideo,
    Character,
    SideStory,
    ParentStory,
    Summary,
    FullStory,
    Other,
    Unknown(i32),
}

impl RelationType {
    #[must_use]
    pub const fn from_code(code: i32) -> Self {
        match code {
            1 => Self::Sequel,
            2 => Self::Prequel,
            11 => Self::SameSetting,
            12 => Self::AlternativeSetting,
            32 => Self::AlternativeVersion,
            41 => Self::MusicVideo,
            42 => Self::Character,
            51 => Self::SideStory,
            52 => Self::ParentStory,
            61 => Self::Summary,
            62 => Self::FullStory,
            100 => Self::Other,
            other => Self::Unknown(other),
        }
    }

    #[must_use]
    pub const fn code(self) -> i32 {
        match self {
            Self::Sequel => 1,
            Self::Prequel => 2,
            Self::SameSetting => 11,
            Self::AlternativeSetting => 12,
            Self::AlternativeVersion => 32,
            Self::MusicVideo => 41,
            Self::Character => 42,
            Self::SideStory => 51,
            Self::ParentStory => 52,
            Self::Summary => 61,
            Self::FullStory => 62,
            Self::Other => 100,
            Self::Unknown(code) => code,
        }
    }
}

impl fmt::Display for RelationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sequel => f.write_str("sequel"),
            Self::Prequel => f.write_str("prequel"),
            Self::SameSetting => f.write_str("same setting"),
            Self::AlternativeSetting => f.write_str("alternative setting"),
            Self::AlternativeVersion => f.write_str("alternative version"),
            Self::MusicVideo => f.write_str("music video"),
            Self::Character => f.write_str("character"),
            Self::SideStory => f.write_str("side story"),
            Self::ParentStory => f.write_str("parent story"),
            Self::Summary => f.write_str("summary"),
            Self::FullStory => f.write_str("full story"),
            Self::Other => f.write_str("other"),
            Self::Unknown(code) => write!(f, "unknown ({code})"),
        }
    }
}

/// Where a mylist entry lives, as tracked by the remote service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MylistState {
    Unknown,
    #[default]
    OnHdd,
    OnCd,
    Deleted,
    Remote,
}

impl MylistState {
    #[must_use]
    pub const fn from_code(code: i32) -> Self {
        match code {
            1 => Self::OnHdd,
            2 => Self::OnCd,
            3 => Self::Deleted,
            4 => Self::Remote,
            _ => Self::Unknown,
        }
    }

    #[must_use]
    pub const fn code(self) -> i32 {
        match self {
            Self::Unknown => 0,
            Self::OnHdd => 1,
            Self::OnCd => 2,
            Self::Deleted => 3,
            Self::Remote => 4,
        }
    }
}

/// Scheduling hint carried by every outbound request.
///
/// Replaces a bare `prio: bool` so call sites say what they mean.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Priority {
    /// Staleness-driven refreshes nobody is waiting on.
    #[default]
    Background,
    /// A caller is blocked on the answer.
    Interactive,
}

impl Priority {
    #[must_use]
    pub const fn for_blocking(block: bool) -> Self {
        if block {
            Self::Interactive
        } else {
            Self::Background
        }
    }

    #[must_use]
    pub const fn is_interactive(self) -> bool {
        matches!(self, Self::Interactive)
    }
}
