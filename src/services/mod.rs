pub mod error;
pub use error::SyncError;

pub mod sync;
pub use sync::{Refresh, settle, update, update_if_old};

pub mod anime;
pub use anime::{AnimeEntity, AnimeSource};

pub mod episode;
pub use episode::EpisodeEntity;

pub mod file;
pub use file::{FileEntity, FileKey};

pub mod identify;
pub use identify::{IdentityGuess, guess_identity};

pub mod mylist;
pub use mylist::MylistEntry;
