//! Device discovery
//!
//! Coarse-interval, read-only enumeration of device-holding structures in
//! regions near connected observers. Discovery only ever adds to the
//! registry; removal is the state scanner's job, since only it verifies
//! that a location no longer matches the expected device kind.

use std::sync::Arc;

use crate::config::ConfigStore;
use crate::registry::DeviceRegistry;
use crate::world::{ObserverDirectory, WorldQuery};

/// Populates the device registry from periodic world enumeration
pub struct DiscoveryScanner {
    config: Arc<ConfigStore>,
    world: Arc<dyn WorldQuery>,
    observers: Arc<dyn ObserverDirectory>,
    registry: Arc<DeviceRegistry>,
}

impl DiscoveryScanner {
    pub fn new(
        config: Arc<ConfigStore>,
        world: Arc<dyn WorldQuery>,
        observers: Arc<dyn ObserverDirectory>,
        registry: Arc<DeviceRegistry>,
    ) -> Self {
        Self {
            config,
            world,
            observers,
            registry,
        }
    }

    /// Enumerate devices near observers and add new ones to the registry
    ///
    /// Failures are skipped silently; the location is picked up by a later
    /// scan once its region loads.
    pub fn full_scan(&self) {
        let radius = self.config.current().discovery_radius;

        for world_id in self.observers.worlds() {
            let observers = self.observers.observers_in(&world_id);
            if observers.is_empty() {
                continue;
            }

            let locations = match self.world.enumerate_devices(&world_id) {
                Ok(locations) => locations,
                Err(e) => {
                    tracing::debug!("Discovery skipped for world {}: {}", world_id, e);
                    continue;
                }
            };

            for location in locations {
                let center = location.center();
                let near_observer = observers
                    .iter()
                    .any(|o| o.position.distance_to(center) <= radius);
                if near_observer && self.registry.insert(location.clone()) {
                    tracing::debug!("Discovered device at {}", location);
                }
            }
        }
    }
}
