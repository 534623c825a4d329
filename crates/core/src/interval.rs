//! Half-open time windows for locker reservations.
//!
//! Every locker claim covers `[start, end)`: the start instant is included,
//! the end instant is not. Two claims on the same locker conflict exactly
//! when their windows overlap under that convention, so a reservation ending
//! at 12:00 and another starting at 12:00 coexist.

use chrono::Duration;
use serde::Serialize;

use crate::error::CoreError;
use crate::types::Timestamp;

/// A half-open interval `[start, end)` on the UTC timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TimeWindow {
    pub start: Timestamp,
    pub end: Timestamp,
}

impl TimeWindow {
    /// Build a window from explicit bounds.
    ///
    /// Fails with [`CoreError::Validation`] unless `start < end` — empty and
    /// inverted windows can never be reserved.
    pub fn new(start: Timestamp, end: Timestamp) -> Result<Self, CoreError> {
        if start >= end {
            return Err(CoreError::Validation(format!(
                "Time window start ({start}) must be before end ({end})"
            )));
        }
        Ok(Self { start, end })
    }

    /// Build the window `[instant, instant + length)`.
    pub fn starting_at(instant: Timestamp, length: Duration) -> Result<Self, CoreError> {
        Self::new(instant, instant + length)
    }

    /// Whether two windows overlap: `self.start < other.end && self.end > other.start`.
    pub fn overlaps(&self, other: &TimeWindow) -> bool {
        self.start < other.end && self.end > other.start
    }

    /// Whether `instant` falls inside the window (start inclusive, end exclusive).
    pub fn contains(&self, instant: Timestamp) -> bool {
        self.start <= instant && instant < self.end
    }

    /// Window length.
    pub fn length(&self) -> Duration {
        self.end - self.start
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn at(hour: u32) -> Timestamp {
        Utc.with_ymd_and_hms(2025, 3, 10, hour, 0, 0).unwrap()
    }

    fn window(start_hour: u32, end_hour: u32) -> TimeWindow {
        TimeWindow::new(at(start_hour), at(end_hour)).unwrap()
    }

    // -----------------------------------------------------------------------
    // Construction
    // -----------------------------------------------------------------------

    #[test]
    fn rejects_inverted_window() {
        assert!(TimeWindow::new(at(12), at(10)).is_err());
    }

    #[test]
    fn rejects_empty_window() {
        assert!(TimeWindow::new(at(10), at(10)).is_err());
    }

    #[test]
    fn starting_at_adds_length() {
        let w = TimeWindow::starting_at(at(10), Duration::hours(2)).unwrap();
        assert_eq!(w.start, at(10));
        assert_eq!(w.end, at(12));
        assert_eq!(w.length(), Duration::hours(2));
    }

    // -----------------------------------------------------------------------
    // Overlap — the invariant every reservation pair must satisfy
    // -----------------------------------------------------------------------

    #[test]
    fn partial_overlap_detected() {
        // [10,12) vs [11,13) share the 11-12 hour.
        assert!(window(10, 12).overlaps(&window(11, 13)));
        assert!(window(11, 13).overlaps(&window(10, 12)));
    }

    #[test]
    fn containment_is_overlap() {
        assert!(window(10, 14).overlaps(&window(11, 12)));
        assert!(window(11, 12).overlaps(&window(10, 14)));
    }

    #[test]
    fn identical_windows_overlap() {
        assert!(window(10, 12).overlaps(&window(10, 12)));
    }

    #[test]
    fn adjacent_windows_do_not_overlap() {
        // Half-open boundary: [10,12) then [12,14) is back-to-back, not a clash.
        assert!(!window(10, 12).overlaps(&window(12, 14)));
        assert!(!window(12, 14).overlaps(&window(10, 12)));
    }

    #[test]
    fn disjoint_windows_do_not_overlap() {
        assert!(!window(8, 9).overlaps(&window(12, 14)));
    }

    // -----------------------------------------------------------------------
    // Containment
    // -----------------------------------------------------------------------

    #[test]
    fn contains_start_but_not_end() {
        let w = window(10, 12);
        assert!(w.contains(at(10)));
        assert!(w.contains(at(11)));
        assert!(!w.contains(at(12)));
    }
}
