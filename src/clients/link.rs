//! Request/response contract of the remote anime metadata service.
//!
//! The byte encoding of commands and the transport itself live behind
//! [`RemoteLink`]; this module only fixes the shapes both sides agree on.

use std::collections::HashMap;
use std::fmt;

use thiserror::Error;

use crate::domain::{EpisodeNumber, MylistState, Priority};

/// One data line of a response: raw field name to raw string value.
pub type Record = HashMap<String, String>;

/// Result codes the cache layer reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResultCode {
    MylistEntryAdded,
    MylistEntryDeleted,
    File,
    MylistEntry,
    Anime,
    Episode,
    AlreadyInMylist,
    MylistEntryEdited,
    MultipleMylistEntries,
    NoSuchFile,
    NoSuchEntry,
    NoSuchAnime,
    NoSuchEpisode,
    NoSuchGroup,
    NoSuchMylistEntry,
    Other(u16),
}

impl ResultCode {
    #[must_use]
    pub const fn code(self) -> u16 {
        match self {
            Self::MylistEntryAdded => 210,
            Self::MylistEntryDeleted => 211,
            Self::File => 220,
            Self::MylistEntry => 221,
            Self::Anime => 230,
            Self::Episode => 240,
            Self::AlreadyInMylist => 310,
            Self::MylistEntryEdited => 311,
            Self::MultipleMylistEntries => 312,
            Self::NoSuchFile => 320,
            Self::NoSuchEntry => 321,
            Self::NoSuchAnime => 330,
            Self::NoSuchEpisode => 340,
            Self::NoSuchGroup => 350,
            Self::NoSuchMylistEntry => 411,
            Self::Other(code) => code,
        }
    }
}

impl From<u16> for ResultCode {
    fn from(code: u16) -> Self {
        match code {
            210 => Self::MylistEntryAdded,
            211 => Self::MylistEntryDeleted,
            220 => Self::File,
            221 => Self::MylistEntry,
            230 => Self::Anime,
            240 => Self::Episode,
            310 => Self::AlreadyInMylist,
            311 => Self::MylistEntryEdited,
            312 => Self::MultipleMylistEntries,
            320 => Self::NoSuchFile,
            321 => Self::NoSuchEntry,
            330 => Self::NoSuchAnime,
            340 => Self::NoSuchEpisode,
            350 => Self::NoSuchGroup,
            411 => Self::NoSuchMylistEntry,
            other => Self::Other(other),
        }
    }
}

impl fmt::Display for ResultCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Response to a single request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub code: ResultCode,
    pub records: Vec<Record>,
}

impl Response {
    #[must_use]
    pub const fn new(code: ResultCode) -> Self {
        Self {
            code,
            records: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_record<K, V>(mut self, fields: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.records.push(
            fields
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        );
        self
    }

    /// Consumes the response, returning its first data line.
    #[must_use]
    pub fn into_first_record(self) -> Option<Record> {
        self.records.into_iter().next()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EpisodeQuery {
    Id(i32),
    Number { aid: i32, epno: EpisodeNumber },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileQuery {
    Id(i32),
    Hash { size: i64, ed2k: String },
}

/// Ways of addressing a mylist entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MylistQuery {
    File(i32),
    Hash { size: i64, ed2k: String },
    Episode { aid: i32, epno: EpisodeNumber },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MylistAdd {
    pub target: MylistQuery,
    /// Register a generic (episode-level) entry rather than a specific file.
    pub generic: bool,
    pub state: MylistState,
    pub viewed: bool,
    pub source: Option<String>,
    pub other: Option<String>,
}

/// Commands understood by the remote service.
///
/// Fetch commands carry the raw field names they want back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Anime { aid: i32, fields: Vec<String> },
    Episode(EpisodeQuery),
    File { query: FileQuery, fields: Vec<String> },
    Mylist(MylistQuery),
    MylistAdd(MylistAdd),
    MylistDel(MylistQuery),
}

#[derive(Debug, Error)]
pub enum LinkError {
    #[error("Link is closed")]
    Closed,

    #[error("Request timed out")]
    Timeout,

    #[error("Transport error: {0}")]
    Transport(String),
}

/// Asynchronous transport to the remote service.
///
/// Each call resolves exactly once with the service's answer. Retry,
/// backoff and rate limiting belong to the implementation.
#[async_trait::async_trait]
pub trait RemoteLink: Send + Sync {
    async fn request(&self, command: Command, priority: Priority) -> Result<Response, LinkError>;
}
