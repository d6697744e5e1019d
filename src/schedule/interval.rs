use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

/// Half-open booking window `[start, end)`.
///
/// Construction enforces `start < end`, so every `TimeSlot` has a positive
/// duration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct TimeSlot {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Slot must end after it starts ({start} >= {end})")]
pub struct EmptySlot {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeSlot {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self, EmptySlot> {
        if start < end {
            Ok(Self { start, end })
        } else {
            Err(EmptySlot { start, end })
        }
    }

    /// Slot of `duration` starting at `start`.
    pub fn starting_at(start: DateTime<Utc>, duration: Duration) -> Result<Self, EmptySlot> {
        Self::new(start, start + duration)
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }

    pub fn duration(&self) -> Duration {
        self.end - self.start
    }

    /// True when the two windows share at least one instant.
    pub fn overlaps(&self, other: &TimeSlot) -> bool {
        intervals_overlap(self.start, self.end, other.start, other.end)
    }

    /// True when `other` lies entirely inside this slot.
    pub fn contains(&self, other: &TimeSlot) -> bool {
        self.start <= other.start && other.end <= self.end
    }
}

/// Half-open overlap test for raw bounds: `a_start < b_end && a_end > b_start`.
///
/// Touching intervals (one ends exactly when the other starts) do not
/// overlap, and a zero-length interval overlaps nothing.
pub fn intervals_overlap<T: PartialOrd>(a_start: T, a_end: T, b_start: T, b_end: T) -> bool {
    a_start < b_end && a_end > b_start && a_start < a_end && b_start < b_end
}
