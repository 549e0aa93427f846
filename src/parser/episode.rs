use std::borrow::Cow;
use std::sync::OnceLock;

use regex::{Captures, Regex};

use crate::domain::EpisodeNumber;

/// Numbering patterns in priority order. The flag marks patterns where the
/// last match in the name wins instead of the first.
const NUMBERING_PATTERNS: [(&str, bool); 5] = [
    // S01E05, S01E05E06, S01E05-E07
    (
        r"(?i)\bs\d{1,2} ?e(?P<first>\d{1,4})(?P<rest>(?:[-~]?e\d{1,4}|[-~]\d{1,4})*)",
        false,
    ),
    // Show - 05, Show - 01-03, Show - S2, Show - 05v2
    (
        r"(?i)\s-\s+(?P<special>sp?)?(?P<first>\d{1,4})(?P<rest>(?:[-~&]\d{1,4}|\s~\s\d{1,4})*)(?:v\d+)?(?:\s|$)",
        false,
    ),
    // Ep 12, Episode 3-4
    (
        r"(?i)\b(?:ep|episode) ?(?P<first>\d{1,4})(?P<rest>(?:[-~&]\d{1,4})*)(?:v\d+)?\b",
        false,
    ),
    // Show S2, Show SP1
    (r"(?i)\b(?P<special>sp?)(?P<first>\d{1,3})(?:v\d+)?\b", false),
    // Show 07
    (r"\b(?P<first>\d{1,3})(?:v\d+)?\b", true),
];

fn get_regex(re: &'static OnceLock<Regex>, pattern: &str) -> &'static Regex {
    re.get_or_init(|| Regex::new(pattern).expect("Invalid regex pattern defined in code"))
}

fn numbering_patterns() -> &'static [(Regex, bool)] {
    static PATTERNS: OnceLock<Vec<(Regex, bool)>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        NUMBERING_PATTERNS
            .iter()
            .map(|(pattern, last)| {
                (
                    Regex::new(pattern).expect("Invalid regex pattern defined in code"),
                    *last,
                )
            })
            .collect()
    })
}

fn strip_tags<'a>(s: &'a str, replacement: &str) -> Cow<'a, str> {
    static RE: OnceLock<Regex> = OnceLock::new();
    get_regex(&RE, r"[{\[(][^\]})]*?[})\]]").replace_all(s, replacement)
}

fn strip_extension(s: &str) -> &str {
    s.rsplit_once('.').map_or(s, |(stem, _)| stem)
}

/// Guesses the episode numbers a file contains from its name.
///
/// Bracketed tags and the extension are ignored. The first numbering
/// pattern that matches decides; a `-` or `~` between two numbers expands
/// to a range of at most `max_range` episodes. Returns an empty list when
/// nothing looks like an episode number.
///
/// # Examples
///
/// ```rust
/// use anidb_sync::parser::episode::episodes_from_filename;
///
/// let eps = episodes_from_filename("[Group] Show - 01-03 [1080p].mkv", 200);
/// let eps: Vec<&str> = eps.iter().map(|e| e.as_str()).collect();
/// assert_eq!(eps, ["1", "2", "3"]);
/// ```
#[must_use]
pub fn episodes_from_filename(filename: &str, max_range: u32) -> Vec<EpisodeNumber> {
    let stripped = strip_tags(filename, " ");
    let stem: String = strip_extension(&stripped)
        .chars()
        .map(|c| if c == '_' || c == '.' { ' ' } else { c })
        .collect();
    let stem = stem.trim_end();

    for (re, last) in numbering_patterns() {
        let caps = if *last {
            re.captures_iter(stem).last()
        } else {
            re.captures(stem)
        };
        if let Some(caps) = caps {
            let episodes = expand(&caps, max_range);
            if !episodes.is_empty() {
                return episodes;
            }
        }
    }
    Vec::new()
}

fn expand(caps: &Captures<'_>, max_range: u32) -> Vec<EpisodeNumber> {
    static REST: OnceLock<Regex> = OnceLock::new();
    let rest_re = get_regex(&REST, r"(?i)(?P<sep>[-~&]|\s~\s|e)e?(?P<num>\d+)");

    let special = caps.name("special").is_some_and(|m| !m.as_str().is_empty());
    let Some(first) = caps.name("first").and_then(|m| m.as_str().parse::<u32>().ok()) else {
        return Vec::new();
    };

    let mut numbers = vec![first];
    let mut prev = first;
    if let Some(rest) = caps.name("rest") {
        for token in rest_re.captures_iter(rest.as_str()) {
            let Some(num) = token.name("num").and_then(|m| m.as_str().parse::<u32>().ok())
            else {
                continue;
            };
            let is_range = token
                .name("sep")
                .is_some_and(|m| matches!(m.as_str().trim(), "-" | "~"));
            if is_range && num > prev && num - prev <= max_range {
                numbers.extend(prev + 1..=num);
            } else {
                numbers.push(num);
            }
            prev = num;
        }
    }

    let mut episodes: Vec<EpisodeNumber> = Vec::with_capacity(numbers.len());
    for n in numbers {
        let episode = if special {
            EpisodeNumber::special(n)
        } else {
            EpisodeNumber::from(n)
        };
        if !episodes.contains(&episode) {
            episodes.push(episode);
        }
    }
    episodes
}

/// Turns a file name into a title search string.
///
/// Drops bracketed, parenthesized and braced tags (release group, codec,
/// checksum) and the extension, then keeps only word characters.
#[must_use]
pub fn title_query_from_filename(filename: &str) -> String {
    static WORDS: OnceLock<Regex> = OnceLock::new();
    let words = get_regex(&WORDS, r"\w+");

    let stripped = strip_tags(filename, "");
    words
        .find_iter(strip_extension(&stripped))
        .map(|m| m.as_str())
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eps(filename: &str) -> Vec<String> {
        episodes_from_filename(filename, 200)
            .into_iter()
            .map(|e| e.to_string())
            .collect()
    }

    #[test]
    fn test_dash_separator() {
        assert_eq!(eps("Show - 05.mkv"), ["5"]);
        assert_eq!(eps("[Group] Show - 12v2 [720p].mkv"), ["12"]);
        assert_eq!(eps("Some_Show_-_03_[ABCD1234].mkv"), ["3"]);
    }

    #[test]
    fn test_special_episode() {
        assert_eq!(eps("Show S2.mkv"), ["S2"]);
        assert_eq!(eps("Show - S1.mkv"), ["S1"]);
        assert_eq!(eps("Show SP3.mkv"), ["S3"]);
    }

    #[test]
    fn test_season_episode() {
        assert_eq!(eps("Show.S01E05.1080p.mkv"), ["5"]);
        assert_eq!(eps("Show S01E05E06.mkv"), ["5", "6"]);
        assert_eq!(eps("Show S02E01-E03.mkv"), ["1", "2", "3"]);
    }

    #[test]
    fn test_episode_keyword() {
        assert_eq!(eps("Show Ep 12.mkv"), ["12"]);
        assert_eq!(eps("Show Episode 3-4.mkv"), ["3", "4"]);
    }

    #[test]
    fn test_ranges() {
        assert_eq!(eps("[Group] Show - 01-03 [1080p].mkv"), ["1", "2", "3"]);
        assert_eq!(eps("Show - 01~02.mkv"), ["1", "2"]);
        assert_eq!(eps("Show - 01&04.mkv"), ["1", "4"]);
        // Beyond the cap only the endpoints survive
        assert_eq!(episodes_from_filename("Show - 1-999.mkv", 200).len(), 2);
    }

    #[test]
    fn test_bare_number_uses_last() {
        assert_eq!(eps("Show 2 07.mkv"), ["7"]);
        assert_eq!(eps("Show 07v2.mkv"), ["7"]);
    }

    #[test]
    fn test_unparsable() {
        assert!(eps("Random Title.mkv").is_empty());
        assert!(eps("[Group] Movie [1080p][x264].mkv").is_empty());
    }

    #[test]
    fn test_title_query() {
        assert_eq!(
            title_query_from_filename("[Group] Some Show - 05 (1080p) [ABCD1234].mkv"),
            "Some Show 05"
        );
        assert_eq!(title_query_from_filename("Show.Name.mkv"), "Show Name");
        assert_eq!(title_query_from_filename("no extension"), "no extension");
    }
}
