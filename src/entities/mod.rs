pub mod prelude;

pub mod anime;
pub mod anime_relation;
pub mod episode;
pub mod file;
