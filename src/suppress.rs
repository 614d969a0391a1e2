//! Suppression window store
//!
//! Outbound vanilla signals reference raw coordinates, not a stable session
//! identity, so cancellation is attributed to a tracked insert by causal
//! proximity: a signal from location L is suppressed only while L has an
//! entry younger than the window. Entries are created only on observed,
//! remap-eligible inserts, so a false positive cannot occur structurally; an
//! expired window merely lets one vanilla signal through.

use std::time::{Duration, Instant};

use dashmap::DashMap;

use crate::world::DeviceLocation;

/// Short-TTL map of location → last observed insert time
pub struct SuppressionWindowStore {
    entries: DashMap<DeviceLocation, Instant>,
    window: Duration,
}

impl SuppressionWindowStore {
    pub fn new(window: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            window,
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Record an insert at `location`, overwriting any previous timestamp
    pub fn mark(&self, location: &DeviceLocation, now: Instant) {
        self.entries.insert(location.clone(), now);
        tracing::debug!("Suppression window opened at {}", location);
    }

    /// Whether a signal from `location` at `now` falls inside the window
    ///
    /// Entries older than twice the window are pruned lazily on read.
    pub fn should_suppress(&self, location: &DeviceLocation, now: Instant) -> bool {
        let elapsed = match self.entries.get(location) {
            Some(entry) => now.saturating_duration_since(*entry.value()),
            None => return false,
        };

        if elapsed <= self.window {
            true
        } else {
            if elapsed > self.window * 2 {
                self.entries.remove(location);
            }
            false
        }
    }

    /// Evict entries older than twice the window
    pub fn sweep(&self, now: Instant) {
        let cutoff = self.window * 2;
        self.entries
            .retain(|_, inserted| now.saturating_duration_since(*inserted) <= cutoff);
    }

    /// Drop the entry for a location (session stopped)
    pub fn remove(&self, location: &DeviceLocation) {
        self.entries.remove(location);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&self) {
        self.entries.clear();
    }
}
