//! Aggregate version numbers for optimistic concurrency control.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Version stamp of a stored aggregate.
///
/// Version 0 means "never stored". Every successful save moves the version
/// forward by exactly one, so a writer that read version `n` can only commit
/// if nobody else committed in between.
///
/// # Examples
///
/// ```
/// use eventbook_core::version::Version;
///
/// let v0 = Version::initial();
/// assert!(v0.is_initial());
/// assert_eq!(v0.next(), Version::new(1));
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Version(u64);

impl Version {
    /// Create a `Version` with the given value.
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// The version of an aggregate that does not exist yet.
    #[must_use]
    pub const fn initial() -> Self {
        Self(0)
    }

    /// Get the raw version number.
    #[must_use]
    pub const fn value(self) -> u64 {
        self.0
    }

    /// The version a successful save produces.
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0.saturating_add(1))
    }

    /// Returns `true` for the "never stored" version.
    #[must_use]
    pub const fn is_initial(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
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
