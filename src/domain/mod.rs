//! Domain primitives with strong typing.
//!
//! Newtype wrappers prevent mixing identifiers of different entities.

pub mod events;

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unique identifier for a user account.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct UserId(i32);

impl UserId {
    #[must_use]
    pub const fn new(id: i32) -> Self {
        debug_assert!(id >= 0, "UserId should be non-negative");
        Self(id)
    }

    #[must_use]
    pub const fn value(&self) -> i32 {
        self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i32> for UserId {
    fn from(id: i32) -> Self {
        Self::new(id)
    }
}

impl From<UserId> for i32 {
    fn from(id: UserId) -> Self {
        id.0
    }
}

/// Unique identifier for a media entry.
///
/// Distinct from [`UserId`] so a library lookup can never silently swap
/// its arguments.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct MediaId(i64);

impl MediaId {
    #[must_use]
    pub const fn new(id: i64) -> Self {
        debug_assert!(id >= 0, "MediaId should be non-negative");
        Self(id)
    }

    #[must_use]
    pub const fn value(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for MediaId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for MediaId {
    fn from(id: i64) -> Self {
        Self::new(id)
    }
}

impl From<MediaId> for i64 {
    fn from(id: MediaId) -> Self {
        id.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_id_conversions() {
        let id = UserId::new(7);
        assert_eq!(id.value(), 7);
        assert_eq!(id.to_string(), "7");
        assert_eq!(i32::from(id), 7);
        assert_eq!(UserId::from(7), id);
    }

    #[test]
    fn media_id_serialization() {
        let id = MediaId::new(42);
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "42");
        let deserialized: MediaId = serde_json::from_str(&json).unwrap();
        assert_eq!(deserialized, id);
    }
}
