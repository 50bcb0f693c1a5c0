//! Shared patterns for field extraction.
//!
//! The HITS pattern is a regular expression, not a literal substring: the
//! `.` in `pool.root` matches any character, which is how the physics output
//! naming check has always behaved.

use lazy_static::lazy_static;
use regex::Regex;

/// Default pattern for the HITS output file name.
pub const DEFAULT_HITS_PATTERN: &str = "pool.root";

lazy_static! {
    /// HITS output file naming convention (e.g. `HITS.12345._000001.pool.root.1`)
    pub static ref HITS_PATTERN: Regex = Regex::new(DEFAULT_HITS_PATTERN).unwrap();

    /// Leading decimal digits of a diagnostic value (`3725s` -> `3725`)
    static ref LEADING_DIGITS: Regex = Regex::new(r"^[0-9]+").unwrap();
}

/// Extract the leading digits of a value as an integer.
///
/// Returns `None` when the value does not start with a digit. A number too
/// large for a `u64` saturates to `u64::MAX`.
pub fn leading_integer(value: &str) -> Option<u64> {
    LEADING_DIGITS
        .find(value.trim_start())
        .map(|m| m.as_str().parse().unwrap_or(u64::MAX))
}
