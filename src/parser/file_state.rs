//! Decoding of the file status bitmask.
//!
//! Bit layout of the `state` field:
//!
//! | bits   | meaning                                   |
//! |--------|-------------------------------------------|
//! | `0x01` | CRC matched the official one              |
//! | `0x02` | CRC did not match                         |
//! | `0x04` | version 2                                 |
//! | `0x08` | version 3                                 |
//! | `0x10` | version 4                                 |
//! | `0x20` | version 5                                 |
//! | `0x40` | uncensored                                |
//! | `0x80` | censored                                  |
//!
//! No version bit means version 1. Within each group the first set bit in
//! table order wins.

const CRC_BITS: [(u32, bool); 2] = [(0x01, true), (0x02, false)];
const VERSION_BITS: [(u32, i32); 4] = [(0x04, 2), (0x08, 3), (0x10, 4), (0x20, 5)];
const CENSOR_BITS: [(u32, bool); 2] = [(0x40, false), (0x80, true)];

const DEFAULT_VERSION: i32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileState {
    pub crc_ok: Option<bool>,
    pub version: i32,
    pub censored: Option<bool>,
}

impl FileState {
    #[must_use]
    pub fn decode(state: u32) -> Self {
        Self {
            crc_ok: first_match(state, &CRC_BITS),
            version: first_match(state, &VERSION_BITS).unwrap_or(DEFAULT_VERSION),
            censored: first_match(state, &CENSOR_BITS),
        }
    }

    /// Parses the raw field, treating anything unparsable as "no bits set".
    #[must_use]
    pub fn from_raw(raw: &str) -> Self {
        Self::decode(raw.trim().parse().unwrap_or(0))
    }
}

fn first_match<T: Copy>(state: u32, table: &[(u32, T)]) -> Option<T> {
    table
        .iter()
        .find(|(bit, _)| state & bit != 0)
        .map(|(_, value)| *value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_bit_only() {
        let state = FileState::decode(4);
        assert_eq!(state.version, 2);
        assert_eq!(state.crc_ok, None);
        assert_eq!(state.censored, None);
    }

    #[test]
    fn test_no_bits() {
        assert_eq!(
            FileState::decode(0),
            FileState {
                crc_ok: None,
                version: 1,
                censored: None,
            }
        );
    }

    #[test]
    fn test_combined_bits() {
        let state = FileState::decode(0x01 | 0x20 | 0x80);
        assert_eq!(state.crc_ok, Some(true));
        assert_eq!(state.version, 5);
        assert_eq!(state.censored, Some(true));

        let state = FileState::decode(0x02 | 0x40);
        assert_eq!(state.crc_ok, Some(false));
        assert_eq!(state.censored, Some(false));
    }

    #[test]
    fn test_from_raw() {
        assert_eq!(FileState::from_raw("8").version, 3);
        assert_eq!(FileState::from_raw("junk").version, 1);
    }
}
