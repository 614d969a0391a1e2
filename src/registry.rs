//! Working set of known device locations
//!
//! Populated by discovery and by hint paths; entries are only removed by the
//! state scanner once it verifies a location no longer holds a device.

use dashmap::DashSet;

use crate::world::DeviceLocation;

/// Concurrent set of device locations known to the engine
#[derive(Default)]
pub struct DeviceRegistry {
    locations: DashSet<DeviceLocation>,
}

impl DeviceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a location; returns true if it was not already known
    pub fn insert(&self, location: DeviceLocation) -> bool {
        self.locations.insert(location)
    }

    /// Remove a location verified to no longer hold a device
    pub fn remove(&self, location: &DeviceLocation) -> bool {
        self.locations.remove(location).is_some()
    }

    pub fn contains(&self, location: &DeviceLocation) -> bool {
        self.locations.contains(location)
    }

    /// Copy of the current working set, safe to iterate while scans mutate
    pub fn snapshot(&self) -> Vec<DeviceLocation> {
        self.locations.iter().map(|e| e.key().clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.locations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locations.is_empty()
    }

    pub fn clear(&self) {
        self.locations.clear();
    }
}
