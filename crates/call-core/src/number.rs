//! Phone number normalization
//!
//! Numbers are only ever compared in normalized form: every character except
//! ASCII digits is dropped, and a `+` survives only when it leads the result.
//! `"+1 (234) 567-890"` and `"+1234567890"` therefore normalize to the same
//! value and collide in the recent-caller cache and in contact lookups.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A phone number reduced to digits and an optional leading `+`
///
/// A `NormalizedNumber` always contains at least one digit. Withheld,
/// empty or digit-free inputs have no normalized form.
///
/// ```rust
/// use dialer_call_core::NormalizedNumber;
///
/// let a = NormalizedNumber::parse("+1 (234) 567-890").unwrap();
/// let b = NormalizedNumber::parse("+1234567890").unwrap();
/// assert_eq!(a, b);
/// assert_eq!(a.as_str(), "+1234567890");
/// assert!(NormalizedNumber::parse("anonymous").is_none());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NormalizedNumber(String);

impl NormalizedNumber {
    /// Normalize a raw dialable string
    pub fn parse(raw: &str) -> Option<Self> {
        let mut clean = String::with_capacity(raw.len());
        let mut has_digit = false;

        for c in raw.chars() {
            if c.is_ascii_digit() {
                clean.push(c);
                has_digit = true;
            } else if c == '+' && clean.is_empty() {
                clean.push(c);
            }
        }

        if has_digit {
            Some(Self(clean))
        } else {
            None
        }
    }

    /// Normalize an optional caller number; absent numbers stay absent
    pub fn from_caller(raw: Option<&str>) -> Option<Self> {
        raw.and_then(Self::parse)
    }

    /// The normalized digits
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NormalizedNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for NormalizedNumber {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
