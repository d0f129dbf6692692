//! Data models for bmark
//!
//! Defines the lifecycle stamp pair shared by every soft-deletable record
//! and the result shapes returned by store queries.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Logical clock value used to stamp lifecycle transitions.
///
/// Stamps come from the store's persisted clock, incremented once per
/// mutating operation, so "strictly later" comparisons never tie.
pub type Stamp = i64;

/// Prefix marking a tag-set name wherever a URL or tag is accepted.
pub const SET_PREFIX: char = '+';

/// Returns the set name when `value` carries the tag-set prefix.
pub fn set_name(value: &str) -> Option<&str> {
    value.strip_prefix(SET_PREFIX)
}

/// Enable/disable stamp pair carried by URLs, associations and tag sets.
///
/// Disabling never erases history: re-enabling simply stamps a newer
/// `enabled_at` over the old `disabled_at`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lifecycle {
    /// When the record was last enabled
    pub enabled_at: Stamp,
    /// When the record was last disabled, if ever
    pub disabled_at: Option<Stamp>,
}

impl Lifecycle {
    /// Create a lifecycle enabled at the given stamp
    pub fn enabled(stamp: Stamp) -> Self {
        Self {
            enabled_at: stamp,
            disabled_at: None,
        }
    }

    /// A record is active when it was never disabled, or re-enabled
    /// after its last disable.
    pub fn is_active(&self) -> bool {
        match self.disabled_at {
            None => true,
            Some(disabled_at) => self.enabled_at > disabled_at,
        }
    }

    /// Re-enable at the given stamp
    pub fn enable(&mut self, stamp: Stamp) {
        self.enabled_at = stamp;
    }

    /// Disable at the given stamp
    pub fn disable(&mut self, stamp: Stamp) {
        self.disabled_at = Some(stamp);
    }
}

/// Result of a `list` query: URL mapped to its sorted active tags, or
/// `None` when tag detail was not requested. Alphabetical by URL.
pub type Listing = BTreeMap<String, Option<Vec<String>>>;

/// Result of a `tags` query: tag name paired with its active-URL count
/// (global statistics) or `None` (per-URL union). Ordering is carried by
/// the vector: ascending count then name for statistics, alphabetical
/// for unions.
pub type TagSummary = Vec<(String, Option<i64>)>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_lifecycle_is_active() {
        let lc = Lifecycle::enabled(1);
        assert!(lc.is_active());
        assert_eq!(lc.enabled_at, 1);
        assert!(lc.disabled_at.is_none());
    }

    #[test]
    fn test_disable_deactivates() {
        let mut lc = Lifecycle::enabled(1);
        lc.disable(2);
        assert!(!lc.is_active());
    }

    #[test]
    fn test_reenable_after_disable() {
        let mut lc = Lifecycle::enabled(1);
        lc.disable(2);
        lc.enable(3);
        assert!(lc.is_active());
        // History is preserved
        assert_eq!(lc.disabled_at, Some(2));
    }

    #[test]
    fn test_equal_stamps_stay_disabled() {
        // "Strictly later" is required to reactivate
        let lc = Lifecycle {
            enabled_at: 5,
            disabled_at: Some(5),
        };
        assert!(!lc.is_active());
    }

    #[test]
    fn test_set_name() {
        assert_eq!(set_name("+reading"), Some("reading"));
        assert_eq!(set_name("reading"), None);
        assert_eq!(set_name("http://example.com/+x"), None);
        assert_eq!(set_name("+"), Some(""));
    }
}
