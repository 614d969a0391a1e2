//! Ground-truth state scanning
//!
//! The state scanner is the single source of truth for session start and
//! stop. Hint paths may look faster, but they only prime the suppression
//! window; every lifecycle decision waits for this scanner to read the
//! device and confirm what it holds. That ordering prevents double-start
//! races between a fast hint and the authoritative scan.

use std::sync::Arc;

use crate::registry::DeviceRegistry;
use crate::schedule::Scheduler;
use crate::session::AudioSessionManager;
use crate::world::{DeviceLocation, DeviceProbe, WorldQuery};

/// Fine-interval scanner confirming device content for every known location
pub struct StateScanner {
    world: Arc<dyn WorldQuery>,
    scheduler: Arc<dyn Scheduler>,
    registry: Arc<DeviceRegistry>,
    manager: Arc<AudioSessionManager>,
}

impl StateScanner {
    pub fn new(
        world: Arc<dyn WorldQuery>,
        scheduler: Arc<dyn Scheduler>,
        registry: Arc<DeviceRegistry>,
        manager: Arc<AudioSessionManager>,
    ) -> Self {
        Self {
            world,
            scheduler,
            registry,
            manager,
        }
    }

    /// Fan one scan pass out across the owning contexts of all known devices
    pub fn tick(self: &Arc<Self>) {
        for location in self.registry.snapshot() {
            let scanner = Arc::clone(self);
            let loc = location.clone();
            self.scheduler
                .run_at_location(&location, Box::new(move || scanner.scan_location(&loc)));
        }
    }

    /// Read one device and reconcile the session state with what it holds
    ///
    /// Must run on the execution context that owns `location`.
    pub fn scan_location(&self, location: &DeviceLocation) {
        match self.world.probe(location) {
            Err(e) => {
                // Transient; the next tick retries
                tracing::trace!("Probe failed at {}: {}", location, e);
            }
            Ok(DeviceProbe::Missing) => {
                tracing::debug!("Device gone at {}; dropping from registry", location);
                self.registry.remove(location);
                self.manager.forget(location);
            }
            Ok(DeviceProbe::Empty) => self.manager.confirm_content(location, None),
            Ok(DeviceProbe::Holding(content)) => {
                self.manager.confirm_content(location, Some(content))
            }
        }
    }
}
