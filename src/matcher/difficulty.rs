//! Expected search effort under a uniform random model.

use std::fmt;
use std::time::Duration;

use crate::crypto::wire::PAYLOAD_LEN;

use super::Location;

/// Expected number of candidates until the first match.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ExpectedTrials {
    Finite(f64),
    /// No match can be expected (empty pattern set or vanishing probability)
    Unbounded,
}

impl ExpectedTrials {
    /// Returns the count as a float, infinity when unbounded.
    pub fn as_f64(self) -> f64 {
        match self {
            ExpectedTrials::Finite(n) => n,
            ExpectedTrials::Unbounded => f64::INFINITY,
        }
    }

    pub fn is_unbounded(self) -> bool {
        matches!(self, ExpectedTrials::Unbounded)
    }

    /// Expected waiting time at `keys_per_second`, `None` meaning infinite.
    pub fn eta(self, keys_per_second: f64) -> Option<Duration> {
        match self {
            ExpectedTrials::Finite(n) if keys_per_second > 0.0 => {
                Duration::try_from_secs_f64(n / keys_per_second).ok()
            }
            _ => None,
        }
    }

    /// Returns a human-readable difficulty estimate.
    pub fn description(self) -> &'static str {
        match self {
            ExpectedTrials::Unbounded => "Impossible",
            ExpectedTrials::Finite(n) if n <= 1e3 => "Very Easy (< 1 second)",
            ExpectedTrials::Finite(n) if n <= 1e6 => "Easy (seconds)",
            ExpectedTrials::Finite(n) if n <= 1e9 => "Medium (minutes to hours)",
            ExpectedTrials::Finite(n) if n <= 1e12 => "Hard (days)",
            ExpectedTrials::Finite(_) => "Very Hard (years or more)",
        }
    }
}

impl fmt::Display for ExpectedTrials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExpectedTrials::Finite(n) => write!(f, "{:.0}", n),
            ExpectedTrials::Unbounded => write!(f, "∞"),
        }
    }
}

/// Computes the expected number of trials to the first match.
///
/// Each pattern is treated as independent: `P(any) = 1 - Π(1 - P(pattern))`
/// with `P(pattern) = (1/charset)^len * positions`, capped at 1. Case folding roughly
/// halves the alphabet. For `Anywhere`, the number of positions is derived
/// from the shortest pattern.
pub fn expected_trials(
    patterns: &[String],
    location: Location,
    case_sensitive: bool,
) -> ExpectedTrials {
    let Some(min_len) = patterns.iter().map(String::len).min() else {
        return ExpectedTrials::Unbounded;
    };

    let charset: f64 = if case_sensitive { 64.0 } else { 32.0 };

    let positions: i64 = match location {
        Location::Start | Location::End => 1,
        Location::Anywhere => (PAYLOAD_LEN as i64 - min_len as i64 + 1).max(1),
    };
    let positions = positions as f64;

    let prob_none: f64 = patterns
        .iter()
        .map(|p| 1.0 - ((1.0 / charset).powi(p.len() as i32) * positions).min(1.0))
        .product();
    let prob_any = 1.0 - prob_none;

    if prob_any <= 0.0 || !prob_any.is_finite() {
        return ExpectedTrials::Unbounded;
    }

    ExpectedTrials::Finite(1.0 / prob_any)
}
