//! Latest device-orientation sample
//!
//! The sensor producer runs on its own schedule and overwrites the cell with
//! every new sample; the coordinator reads whatever is there when a call is
//! answered and never waits for a fresh value.

use chrono::{DateTime, Duration, Utc};
use parking_lot::RwLock;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct OrientationSample {
    is_flat: bool,
    taken_at: DateTime<Utc>,
}

/// Shared single-value cell holding the most recent "lying flat" sample
///
/// Cloning yields another handle to the same cell, so the sensor side and
/// the coordinator can each hold one.
#[derive(Debug, Clone, Default)]
pub struct OrientationCell {
    latest: Arc<RwLock<Option<OrientationSample>>>,
}

impl OrientationCell {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a new sample, replacing the previous one
    pub fn publish(&self, is_flat: bool, taken_at: DateTime<Utc>) {
        *self.latest.write() = Some(OrientationSample { is_flat, taken_at });
    }

    /// Drop the current sample (sensor went away)
    pub fn clear(&self) {
        *self.latest.write() = None;
    }

    /// Whether the device lies flat according to a sample no older than `max_age`
    ///
    /// Missing or stale samples read as not flat.
    pub fn is_flat(&self, now: DateTime<Utc>, max_age: Duration) -> bool {
        match *self.latest.read() {
            Some(sample) if now - sample.taken_at <= max_age => sample.is_flat,
            _ => false,
        }
    }
}
