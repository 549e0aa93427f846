pub mod episode;
pub mod fields;
pub mod file_state;

pub use episode::{episodes_from_filename, title_query_from_filename};
pub use fields::{FieldError, FieldKind, FieldSpec, FieldTable, FieldTables};
pub use file_state::FileState;
