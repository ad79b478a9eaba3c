//! Pattern matching implementation.

use std::str::FromStr;

use crate::crypto::wire::PAYLOAD_OFFSET;

use super::difficulty::{expected_trials, ExpectedTrials};

/// Where in the encoded key a pattern has to occur.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Location {
    /// Match anywhere in the encoded key
    #[default]
    Anywhere,
    /// Match at the beginning of the key payload (after the fixed header)
    Start,
    /// Match at the end of the encoded key
    End,
}

impl Location {
    /// Integer code understood by the device kernel.
    pub fn device_code(self) -> u32 {
        match self {
            Location::Anywhere => 0,
            Location::Start => 1,
            Location::End => 2,
        }
    }

    /// Inverse of [`Location::device_code`].
    pub fn from_device_code(code: u32) -> Option<Self> {
        match code {
            0 => Some(Location::Anywhere),
            1 => Some(Location::Start),
            2 => Some(Location::End),
            _ => None,
        }
    }
}

impl FromStr for Location {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "anywhere" | "any" | "contains" => Ok(Location::Anywhere),
            "start" | "prefix" | "begin" => Ok(Location::Start),
            "end" | "suffix" => Ok(Location::End),
            _ => Err(format!(
                "Unknown location: {} (use anywhere, start or end)",
                s
            )),
        }
    }
}

impl std::fmt::Display for Location {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Location::Anywhere => write!(f, "anywhere"),
            Location::Start => write!(f, "start"),
            Location::End => write!(f, "end"),
        }
    }
}

/// Result of a pattern match operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchResult {
    /// At least one pattern matched
    Match,
    /// No match
    NoMatch,
}

impl MatchResult {
    #[inline]
    pub fn is_match(self) -> bool {
        matches!(self, MatchResult::Match)
    }
}

impl From<bool> for MatchResult {
    #[inline]
    fn from(matched: bool) -> Self {
        if matched {
            MatchResult::Match
        } else {
            MatchResult::NoMatch
        }
    }
}

/// A set of target patterns sharing one location and case policy.
#[derive(Debug, Clone)]
pub struct PatternSet {
    /// Patterns, lowercased up front when matching is case insensitive
    patterns: Vec<String>,
    location: Location,
    case_sensitive: bool,
}

impl PatternSet {
    /// Creates a new pattern set.
    pub fn new<I, S>(patterns: I, location: Location, case_sensitive: bool) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let patterns = patterns
            .into_iter()
            .map(|p| {
                let p = p.into();
                if case_sensitive {
                    p
                } else {
                    p.to_lowercase()
                }
            })
            .collect();

        Self {
            patterns,
            location,
            case_sensitive,
        }
    }

    /// Returns the (normalized) patterns.
    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }

    pub fn location(&self) -> Location {
        self.location
    }

    pub fn case_sensitive(&self) -> bool {
        self.case_sensitive
    }

    /// Matches an encoded public key against this set.
    ///
    /// Allocates when matching is case insensitive; hot loops should use
    /// [`PatternSet::matches_with`].
    pub fn matches(&self, encoded: &str) -> MatchResult {
        let mut scratch = String::new();
        self.matches_with(encoded, &mut scratch)
    }

    /// Matches an encoded public key, lowercasing into `scratch` if needed.
    #[inline]
    pub fn matches_with(&self, encoded: &str, scratch: &mut String) -> MatchResult {
        let key = if self.case_sensitive {
            encoded
        } else {
            scratch.clear();
            scratch.push_str(encoded);
            scratch.make_ascii_lowercase();
            scratch.as_str()
        };

        let matched = match self.location {
            Location::Anywhere => self.patterns.iter().any(|p| key.contains(p.as_str())),
            Location::Start => {
                let payload = key.get(PAYLOAD_OFFSET..).unwrap_or("");
                self.patterns.iter().any(|p| payload.starts_with(p.as_str()))
            }
            Location::End => self.patterns.iter().any(|p| key.ends_with(p.as_str())),
        };

        matched.into()
    }

    /// Expected number of candidates until the first match.
    pub fn expected_trials(&self) -> ExpectedTrials {
        expected_trials(&self.patterns, self.location, self.case_sensitive)
    }
}

impl std::fmt::Display for PatternSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.patterns.join(","), self.location)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = "AAAAC3NzaC1lZDI1NTE5AAAAI";

    /// Builds a 68-character key string whose payload is `payload` padded with 'x'.
    fn make_key(payload: &str) -> String {
        let mut key = String::from(HEADER);
        key.push_str(payload);
        while key.len() < 68 {
            key.push('x');
        }
        key
    }

    fn make_key_ending(tail: &str) -> String {
        let mut key = String::from(HEADER);
        while key.len() + tail.len() < 68 {
            key.push('x');
        }
        key.push_str(tail);
        key
    }

    #[test]
    fn test_anywhere_match() {
        let set = PatternSet::new(["abc"], Location::Anywhere, true);
        assert!(set.matches(&make_key("qqqqxxabcxx")).is_match());
    }

    #[test]
    fn test_anywhere_no_match() {
        let set = PatternSet::new(["abc"], Location::Anywhere, true);
        assert!(!set.matches(&make_key("qqqq")).is_match());
    }

    #[test]
    fn test_start_match() {
        let set = PatternSet::new(["abc"], Location::Start, true);
        assert!(set.matches(&make_key("abcdef")).is_match());
    }

    #[test]
    fn test_start_ignores_header() {
        // "AAAA" is present at the very beginning of every key
        let set = PatternSet::new(["AAAA"], Location::Start, true);
        assert!(!set.matches(&make_key("qqqq")).is_match());
    }

    #[test]
    fn test_start_no_match_mid_string() {
        let set = PatternSet::new(["abc"], Location::Start, true);
        assert!(!set.matches(&make_key("qqabcqq")).is_match());
    }

    #[test]
    fn test_end_match() {
        let set = PatternSet::new(["abc"], Location::End, true);
        assert!(set.matches(&make_key_ending("abc")).is_match());
        assert!(!set.matches(&make_key("abc")).is_match());
    }

    #[test]
    fn test_any_of_several_patterns() {
        let set = PatternSet::new(["zzz", "abc"], Location::Anywhere, true);
        assert!(set.matches(&make_key("abc")).is_match());
    }

    #[test]
    fn test_case_insensitive() {
        let insensitive = PatternSet::new(["ABC"], Location::Anywhere, false);
        let sensitive = PatternSet::new(["ABC"], Location::Anywhere, true);
        let key = make_key("xxabcxx");
        assert!(insensitive.matches(&key).is_match());
        assert!(!sensitive.matches(&key).is_match());
    }

    #[test]
    fn test_patterns_lowered_once() {
        let set = PatternSet::new(["MeNg"], Location::End, false);
        assert_eq!(set.patterns(), ["meng"]);
        assert!(set.matches(&make_key_ending("MENG")).is_match());
    }

    #[test]
    fn test_scratch_reuse() {
        let set = PatternSet::new(["abc"], Location::Anywhere, false);
        let mut scratch = String::new();
        assert!(set.matches_with(&make_key("ABC"), &mut scratch).is_match());
        assert!(!set.matches_with(&make_key("QQQ"), &mut scratch).is_match());
    }

    #[test]
    fn test_location_parse() {
        assert_eq!("anywhere".parse::<Location>().unwrap(), Location::Anywhere);
        assert_eq!("START".parse::<Location>().unwrap(), Location::Start);
        assert_eq!("suffix".parse::<Location>().unwrap(), Location::End);
        assert!("middle".parse::<Location>().is_err());
    }

    #[test]
    fn test_device_codes() {
        for location in [Location::Anywhere, Location::Start, Location::End] {
            assert_eq!(Location::from_device_code(location.device_code()), Some(location));
        }
        assert_eq!(Location::from_device_code(7), None);
    }
}
