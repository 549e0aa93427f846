pub use super::anime::Entity as CachedAnime;
pub use super::anime_relation::Entity as AnimeRelation;
pub use super::episode::Entity as CachedEpisode;
pub use super::file::Entity as CachedFile;
