pub mod link;
pub mod probe;
pub mod titles;

pub use link::{Command, LinkError, Record, RemoteLink, Response, ResultCode};
pub use probe::{FileProbe, FileStat};
pub use titles::{AnimeTitle, TitleCandidate, TitleKind, TitleQuery, TitleResolver};
