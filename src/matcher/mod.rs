//! Pattern matching for encoded SSH public keys.
//!
//! Supports three locations:
//! - Anywhere: match anywhere in the encoded key
//! - Start: match at the start of the key payload
//! - End: match at the end of the encoded key

mod difficulty;
mod pattern;

pub use difficulty::{expected_trials, ExpectedTrials};
pub use pattern::{Location, MatchResult, PatternSet};
