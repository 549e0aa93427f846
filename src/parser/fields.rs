//! Raw response field conversion.
//!
//! The remote service answers with untyped strings. Each entity owns a
//! [`FieldTable`] naming, for every raw field it understands, the cache
//! column it lands in and how to parse it. Tables live in the
//! [`SyncContext`](crate::state::SyncContext) so call sites never hard-code
//! field handling.

use std::collections::BTreeMap;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use sea_orm::Value;
use thiserror::Error;
use tracing::{debug, warn};

use crate::clients::Record;

/// Paired relation fields of the anime command. Consumed by the relation
/// merge, never stored as scalars.
pub const RELATED_AID_LIST: &str = "related_aid_list";
pub const RELATED_AID_TYPE: &str = "related_aid_type";

/// Separator used inside list-valued fields.
pub const LIST_SEPARATOR: char = '\'';

/// Status bitmask of the file command, decoded by
/// [`FileState`](super::file_state::FileState).
pub const FILE_STATE: &str = "state";

/// Episode fields that are fetched but deliberately not persisted; anime
/// titles already cover search.
pub const EPISODE_TITLE_FIELDS: [&str; 3] = ["title_eng", "title_romaji", "title_kanji"];

/// Mylist fields with no cache counterpart.
pub const MYLIST_IGNORED_FIELDS: [&str; 2] = ["lid", "date"];

#[derive(Debug, Error, PartialEq, Eq)]
#[error("Invalid {kind:?} value for field {field}: '{raw}'")]
pub struct FieldError {
    pub field: String,
    pub kind: FieldKind,
    pub raw: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Int,
    BigInt,
    /// `1`/`0` flags.
    Bool,
    Text,
    /// Unix seconds; `0` means "not set".
    Timestamp,
}

impl FieldKind {
    /// Parses a raw value.
    ///
    /// Returns `Ok(None)` for an empty non-text value, which callers treat as
    /// "field absent". Empty text clears the column.
    pub fn parse(self, field: &str, raw: &str) -> Result<Option<Value>, FieldError> {
        let invalid = || FieldError {
            field: field.to_string(),
            kind: self,
            raw: raw.to_string(),
        };

        if self == Self::Text {
            let value = if raw.is_empty() {
                Value::from(None::<String>)
            } else {
                Value::from(raw.to_string())
            };
            return Ok(Some(value));
        }

        let raw = raw.trim();
        if raw.is_empty() {
            return Ok(None);
        }

        let value = match self {
            Self::Int => Value::from(raw.parse::<i32>().map_err(|_| invalid())?),
            Self::BigInt => Value::from(raw.parse::<i64>().map_err(|_| invalid())?),
            Self::Bool => match raw {
                "1" | "true" => Value::from(true),
                "0" | "false" => Value::from(false),
                _ => return Err(invalid()),
            },
            Self::Timestamp => {
                let secs = raw.parse::<i64>().map_err(|_| invalid())?;
                let at: Option<DateTime<Utc>> = if secs == 0 {
                    None
                } else {
                    Some(DateTime::from_timestamp(secs, 0).ok_or_else(invalid)?)
                };
                Value::from(at)
            }
            Self::Text => unreachable!("handled above"),
        };
        Ok(Some(value))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub column: &'static str,
    pub kind: FieldKind,
}

/// Raw field name to cache column and parser.
#[derive(Debug, Clone, Default)]
pub struct FieldTable {
    entries: BTreeMap<String, FieldSpec>,
}

impl FieldTable {
    #[must_use]
    pub fn from_entries(entries: &[(&str, &'static str, FieldKind)]) -> Self {
        let mut table = Self::default();
        for (raw, column, kind) in entries {
            table.insert(*raw, column, *kind);
        }
        table
    }

    pub fn insert(&mut self, raw: impl Into<String>, column: &'static str, kind: FieldKind) {
        self.entries.insert(raw.into(), FieldSpec { column, kind });
    }

    #[must_use]
    pub fn get(&self, raw: &str) -> Option<&FieldSpec> {
        self.entries.get(raw)
    }

    /// Raw field names to request from the remote service.
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn specs(&self) -> impl Iterator<Item = (&str, &FieldSpec)> {
        self.entries.iter().map(|(raw, spec)| (raw.as_str(), spec))
    }

    /// Converts every mapped field of `record` into a typed column value.
    ///
    /// Unmapped fields are skipped. Unparsable values are logged and skipped,
    /// so one bad field never sinks the whole merge.
    pub fn convert<C: FromStr>(&self, record: &Record) -> Vec<(C, Value)> {
        let mut values = Vec::with_capacity(record.len());
        for (raw, data) in record {
            let Some(spec) = self.entries.get(raw) else {
                debug!(field = %raw, "Ignoring unmapped field");
                continue;
            };
            let Ok(column) = C::from_str(spec.column) else {
                warn!(field = %raw, column = spec.column, "Field table names an unknown column");
                continue;
            };
            match spec.kind.parse(raw, data) {
                Ok(Some(value)) => values.push((column, value)),
                Ok(None) => {}
                Err(e) => warn!(error = %e, "Skipping unparsable field"),
            }
        }
        values
    }
}

/// Conversion tables for every entity kind.
#[derive(Debug, Clone)]
pub struct FieldTables {
    pub anime: FieldTable,
    pub episode: FieldTable,
    pub file: FieldTable,
    pub mylist: FieldTable,
}

impl Default for FieldTables {
    fn default() -> Self {
        Self {
            anime: anime_table(),
            episode: episode_table(),
            file: file_table(),
            mylist: mylist_table(),
        }
    }
}

#[must_use]
pub fn anime_table() -> FieldTable {
    use FieldKind::{Bool, Int, Text, Timestamp};
    FieldTable::from_entries(&[
        ("dateflags", "dateflags", Int),
        ("year", "year", Text),
        ("type", "anime_type", Text),
        ("episodes", "episodes", Int),
        ("highest_episode_number", "highest_episode_number", Int),
        ("special_ep_count", "special_ep_count", Int),
        ("air_date", "air_date", Timestamp),
        ("end_date", "end_date", Timestamp),
        ("url", "url", Text),
        ("picname", "picname", Text),
        ("rating", "rating", Int),
        ("vote_count", "vote_count", Int),
        ("temp_rating", "temp_rating", Int),
        ("temp_vote_count", "temp_vote_count", Int),
        ("average_review_rating", "average_review_rating", Int),
        ("review_count", "review_count", Int),
        ("is_18_restricted", "restricted", Bool),
        ("ann_id", "ann_id", Int),
        ("allcinema_id", "allcinema_id", Int),
        ("animenfo_id", "animenfo_id", Text),
        ("date_record_updated", "anidb_updated", Timestamp),
    ])
}

#[must_use]
pub fn episode_table() -> FieldTable {
    use FieldKind::{Int, Timestamp};
    FieldTable::from_entries(&[
        ("aid", "aid", Int),
        ("length", "length", Int),
        ("rating", "rating", Int),
        ("votes", "votes", Int),
        ("aired", "aired", Timestamp),
        ("type", "kind", Int),
    ])
}

#[must_use]
pub fn file_table() -> FieldTable {
    use FieldKind::{BigInt, Bool, Int, Text, Timestamp};
    FieldTable::from_entries(&[
        ("fid", "fid", Int),
        ("aid", "aid", Int),
        ("eid", "eid", Int),
        ("gid", "gid", Int),
        ("is_deprecated", "is_deprecated", Bool),
        ("size", "size", BigInt),
        ("ed2k", "ed2khash", Text),
        ("md5", "md5", Text),
        ("sha1", "sha1", Text),
        ("crc32", "crc32", Text),
        ("quality", "quality", Text),
        ("source", "source", Text),
        ("video_codec", "video_codec", Text),
        ("video_resolution", "video_resolution", Text),
        ("file_type", "file_type", Text),
        ("dub_language", "dub_language", Text),
        ("sub_language", "sub_language", Text),
        ("length_in_seconds", "length_in_seconds", Int),
        ("description", "description", Text),
        ("aired_date", "aired_date", Timestamp),
        ("mylist_state", "mylist_state", Int),
        ("mylist_filestate", "mylist_filestate", Int),
        ("mylist_viewed", "mylist_viewed", Bool),
        ("mylist_viewdate", "mylist_viewdate", Timestamp),
        ("mylist_storage", "mylist_storage", Text),
        ("mylist_source", "mylist_source", Text),
        ("mylist_other", "mylist_other", Text),
    ])
}

#[must_use]
pub fn mylist_table() -> FieldTable {
    use FieldKind::{Int, Text, Timestamp};
    FieldTable::from_entries(&[
        ("fid", "fid", Int),
        ("eid", "eid", Int),
        ("aid", "aid", Int),
        ("gid", "gid", Int),
        ("state", "mylist_state", Int),
        ("filestate", "mylist_filestate", Int),
        ("viewdate", "mylist_viewdate", Timestamp),
        ("storage", "mylist_storage", Text),
        ("source", "mylist_source", Text),
        ("other", "mylist_other", Text),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{anime, episode, file};
    use sea_orm::{ActiveModelTrait, IdenStatic};

    fn sample(kind: FieldKind) -> Value {
        let raw = match kind {
            FieldKind::Int | FieldKind::BigInt | FieldKind::Bool => "1",
            FieldKind::Text => "text",
            FieldKind::Timestamp => "1262304000",
        };
        kind.parse("sample", raw).unwrap().unwrap()
    }

    // Every default entry must name a real column of a compatible type;
    // `ActiveModel::set` panics otherwise.
    #[test]
    fn anime_table_matches_columns() {
        for (raw, spec) in anime_table().specs() {
            let column = anime::Column::from_str(spec.column)
                .unwrap_or_else(|_| panic!("unknown column for {raw}"));
            let mut model = <anime::ActiveModel as Default>::default();
            model.set(column, sample(spec.kind));
        }
    }

    #[test]
    fn episode_table_matches_columns() {
        for (raw, spec) in episode_table().specs() {
            let column = episode::Column::from_str(spec.column)
                .unwrap_or_else(|_| panic!("unknown column for {raw}"));
            let mut model = <episode::ActiveModel as Default>::default();
            model.set(column, sample(spec.kind));
        }
    }

    #[test]
    fn file_and_mylist_tables_match_columns() {
        for (raw, spec) in file_table().specs().chain(mylist_table().specs()) {
            let column = file::Column::from_str(spec.column)
                .unwrap_or_else(|_| panic!("unknown column for {raw}"));
            let mut model = <file::ActiveModel as Default>::default();
            model.set(column, sample(spec.kind));
        }
    }

    #[test]
    fn parse_handles_empty_values() {
        assert_eq!(FieldKind::Int.parse("episodes", "").unwrap(), None);
        assert_eq!(
            FieldKind::Text.parse("url", "").unwrap(),
            Some(Value::from(None::<String>))
        );
        assert_eq!(
            FieldKind::Timestamp.parse("air_date", "0").unwrap(),
            Some(Value::from(None::<DateTime<Utc>>))
        );
    }

    #[test]
    fn parse_rejects_garbage() {
        let err = FieldKind::Int.parse("episodes", "twelve").unwrap_err();
        assert_eq!(err.field, "episodes");
        assert_eq!(err.kind, FieldKind::Int);
        assert!(FieldKind::Bool.parse("flag", "maybe").is_err());
    }

    #[test]
    fn convert_skips_unmapped_and_bad_fields() {
        let record: Record = [
            ("episodes", "12"),
            ("rating", "not-a-number"),
            ("unheard_of", "x"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        let values: Vec<(anime::Column, Value)> = anime_table().convert(&record);
        let named: Vec<(&str, Value)> = values
            .iter()
            .map(|(column, value)| (column.as_str(), value.clone()))
            .collect();
        assert_eq!(named, vec![("episodes", Value::from(12))]);
    }
}
