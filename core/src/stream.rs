//! Event stream identification and versioning.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Error type for `StreamId` parsing.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Invalid stream ID: {0}")]
pub struct ParseStreamIdError(String);

/// Identifier of one event stream, e.g. `"unit-<uuid>"`.
///
/// `FromStr` rejects empty input; `new()` and `From` trust their caller.
///
/// # Examples
///
/// ```
/// use bloodtrack_core::stream::StreamId;
///
/// let stream_id = StreamId::new("unit-42");
/// assert_eq!(stream_id.as_str(), "unit-42");
///
/// let parsed: StreamId = "unit-43".parse().unwrap();
/// assert_eq!(parsed, StreamId::new("unit-43"));
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StreamId(String);

impl StreamId {
    /// Create a new `StreamId` from a string.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the stream ID as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Convert the `StreamId` into its inner `String`.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for StreamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for StreamId {
    type Err = ParseStreamIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().is_empty() {
            return Err(ParseStreamIdError("Stream ID cannot be empty".to_string()));
        }
        Ok(Self(s.to_string()))
    }
}

impl From<String> for StreamId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for StreamId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl AsRef<str> for StreamId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Number of events in a stream, used as the optimistic concurrency token.
///
/// An empty stream is at [`Version::INITIAL`] (0). Appending `n` events to a
/// stream at version `v` moves it to `v + n`, so the version after an append
/// is also the 1-based position of the last appended event.
///
/// # Examples
///
/// ```
/// use bloodtrack_core::stream::Version;
///
/// let v0 = Version::INITIAL;
/// assert_eq!(v0.next(), Version::new(1));
/// assert_eq!(Version::new(5).value(), 5);
/// ```
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Version(u64);

impl Version {
    /// The version of a stream with no events.
    pub const INITIAL: Self = Self(0);

    /// Create a new `Version` with the given value.
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Get the version number.
    #[must_use]
    pub const fn value(self) -> u64 {
        self.0
    }

    /// Get the next version (current + 1).
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0 + 1)
    }

    /// Check if this is the initial version (0).
    #[must_use]
    pub const fn is_initial(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for Version {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl From<Version> for u64 {
    fn from(version: Version) -> Self {
        version.0
    }
}

impl std::ops::Add<u64> for Version {
    type Output = Self;

    fn add(self, rhs: u64) -> Self::Output {
        Self(self.0 + rhs)
    }
}

#[cfg(test)]
#[allow(clippy::expect_used)]
mod tests {
    use super::*;

    mod stream_id_tests {
        use super::*;

        #[test]
        #[allow(clippy::expect_used)]
        fn parse_accepts_non_empty() {
            let id: StreamId = "unit-123".parse().expect("parse should succeed");
            assert_eq!(id, StreamId::new("unit-123"));
            assert_eq!(format!("{id}"), "unit-123");
        }

        #[test]
        fn parse_rejects_blank() {
            assert!("".parse::<StreamId>().is_err());
            assert!("   ".parse::<StreamId>().is_err());
        }

        #[test]
        fn into_inner_returns_string() {
            let id = StreamId::from("unit-9".to_string());
            assert_eq!(id.into_inner(), "unit-9");
        }
    }

    mod version_tests {
        use super::*;

        #[test]
        fn initial_version() {
            assert_eq!(Version::INITIAL, Version::new(0));
            assert!(Version::INITIAL.is_initial());
            assert!(!Version::new(1).is_initial());
        }

        #[test]
        fn next_and_add_agree() {
            let v3 = Version::new(3);
            assert_eq!(v3.next(), v3 + 1);
            assert_eq!(v3 + 4, Version::new(7));
        }

        #[test]
        fn version_ordering() {
            assert!(Version::new(1) < Version::new(2));
        }

        #[test]
        fn version_u64_conversions() {
            let version = Version::from(42_u64);
            let raw: u64 = version.into();
            assert_eq!(raw, 42);
        }

        proptest::proptest! {
            #[test]
            fn appending_n_events_advances_by_n(start in 0_u64..1_000_000, n in 0_u64..1_000) {
                let mut stepped = Version::new(start);
                for _ in 0..n {
                    stepped = stepped.next();
                }
                proptest::prop_assert_eq!(stepped, Version::new(start) + n);
            }
        }
    }
}
