//! Validity windows.

use crate::Timestamp;
use std::{
    fmt,
    ops::{Bound, RangeBounds},
};

/// A window of instants during which some entitlement holds.
///
/// `starts` is the earliest instant the window covers and `ends` the latest.
/// Both ends are inclusive when set: a purchase valid until `T` still grants
/// access at exactly `T`. [`Bound::Unbounded`] marks an open end.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    /// Earliest instant covered by this window.
    pub starts: Bound<Timestamp>,

    /// Latest instant covered by this window.
    pub ends: Bound<Timestamp>,
}

impl TimeWindow {
    /// A window with no constraints.
    #[must_use]
    pub const fn unbounded() -> Self {
        Self {
            starts: Bound::Unbounded,
            ends: Bound::Unbounded,
        }
    }

    /// Creates a window from optional inclusive bounds.
    #[must_use]
    pub const fn new(starts: Option<Timestamp>, ends: Option<Timestamp>) -> Self {
        Self {
            starts: match starts {
                Some(t) => Bound::Included(t),
                None => Bound::Unbounded,
            },
            ends: match ends {
                Some(t) => Bound::Included(t),
                None => Bound::Unbounded,
            },
        }
    }

    /// A window open at the start and closing (inclusively) at `ends`.
    #[must_use]
    pub const fn until(ends: Timestamp) -> Self {
        Self::new(None, Some(ends))
    }

    /// Returns `true` if `instant` falls within this window.
    #[must_use]
    pub fn covers(&self, instant: Timestamp) -> bool {
        self.contains(&instant)
    }

    /// The inclusive end of this window, if it has one.
    #[must_use]
    pub fn expires_at(&self) -> Option<Timestamp> {
        match self.ends {
            Bound::Included(t) | Bound::Excluded(t) => Some(t),
            Bound::Unbounded => None,
        }
    }
}

impl Default for TimeWindow {
    fn default() -> Self {
        Self::unbounded()
    }
}

impl RangeBounds<Timestamp> for TimeWindow {
    fn start_bound(&self) -> Bound<&Timestamp> {
        self.starts.as_ref()
    }

    fn end_bound(&self) -> Bound<&Timestamp> {
        self.ends.as_ref()
    }
}

impl fmt::Display for TimeWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.starts {
            Bound::Included(start) | Bound::Excluded(start) => {
                write!(f, "{}", start.to_rfc3339())?
            }
            Bound::Unbounded => {}
        }
        write!(f, "..")?;
        match self.ends {
            Bound::Included(end) => write!(f, "={}", end.to_rfc3339()),
            Bound::Excluded(end) => write!(f, "{}", end.to_rfc3339()),
            Bound::Unbounded => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};
    use pretty_assertions::assert_eq;

    fn at(day: u32) -> Timestamp {
        Utc.with_ymd_and_hms(2025, 1, day, 0, 0, 0).unwrap()
    }

    #[test]
    fn it_covers_both_ends_inclusively() {
        let window = TimeWindow::new(Some(at(1)), Some(at(10)));

        assert!(window.covers(at(1)));
        assert!(window.covers(at(10)));
        assert!(!window.covers(at(10) + Duration::milliseconds(1)));
        assert!(!window.covers(at(1) - Duration::milliseconds(1)));
    }

    #[test]
    fn it_treats_open_ends_as_unbounded() {
        let window = TimeWindow::new(Some(at(5)), None);

        assert!(window.covers(at(31)));
        assert!(!window.covers(at(4)));
        assert_eq!(window.expires_at(), None);
        assert!(TimeWindow::unbounded().covers(at(1)));
    }

    #[test]
    fn it_displays_as_a_range() {
        let window = TimeWindow::until(at(2));
        assert_eq!(window.to_string(), "..=2025-01-02T00:00:00+00:00");
        assert_eq!(TimeWindow::unbounded().to_string(), "..");
    }
}
