//! Simulated collaborators for end-to-end engine tests

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use soundswap::error::{IntegrationError, QueryError};
use soundswap::packet::{
    ObserverContext, OutboundSignal, OutboundSignalChannel, SignalInterceptor, Verdict,
};
use soundswap::world::{
    ContentId, DeviceLocation, DeviceProbe, ObserverDirectory, ObserverId, ObserverSnapshot,
    Position, WorldQuery,
};

/// Simulated world holding devices and their content
#[derive(Default)]
pub struct SimWorld {
    devices: Mutex<HashMap<DeviceLocation, Option<ContentId>>>,
}

impl SimWorld {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn place_device(&self, location: DeviceLocation, content: Option<ContentId>) {
        self.devices.lock().insert(location, content);
    }

    pub fn content_at(&self, location: &DeviceLocation) -> Option<ContentId> {
        self.devices.lock().get(location).cloned().flatten()
    }
}

impl WorldQuery for SimWorld {
    fn probe(&self, location: &DeviceLocation) -> Result<DeviceProbe, QueryError> {
        Ok(match self.devices.lock().get(location) {
            None => DeviceProbe::Missing,
            Some(None) => DeviceProbe::Empty,
            Some(Some(content)) => DeviceProbe::Holding(content.clone()),
        })
    }

    fn enumerate_devices(&self, world: &str) -> Result<Vec<DeviceLocation>, QueryError> {
        Ok(self
            .devices
            .lock()
            .keys()
            .filter(|loc| loc.world == world)
            .cloned()
            .collect())
    }

    fn eject(&self, location: &DeviceLocation) -> Result<(), QueryError> {
        match self.devices.lock().get_mut(location) {
            Some(content) => {
                *content = None;
                Ok(())
            }
            None => Err(QueryError::Backend(format!("no device at {}", location))),
        }
    }
}

/// Instruction recorded by [`SimObservers`]
#[derive(Debug, Clone, PartialEq)]
pub enum Delivered {
    Play { observer: ObserverId, sound: String },
    Stop { observer: ObserverId, sound: String },
    ActionBar { observer: ObserverId, message: String },
}

/// Simulated observer directory recording all deliveries
#[derive(Default)]
pub struct SimObservers {
    connected: Mutex<HashMap<ObserverId, (String, Position)>>,
    delivered: Mutex<Vec<Delivered>>,
}

impl SimObservers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn connect(&self, id: ObserverId, world: &str, position: Position) {
        self.connected.lock().insert(id, (world.to_string(), position));
    }

    pub fn move_to(&self, id: ObserverId, position: Position) {
        if let Some(entry) = self.connected.lock().get_mut(&id) {
            entry.1 = position;
        }
    }

    pub fn delivered(&self) -> Vec<Delivered> {
        self.delivered.lock().clone()
    }

    pub fn plays(&self, observer: ObserverId) -> usize {
        self.delivered()
            .iter()
            .filter(|d| matches!(d, Delivered::Play { observer: o, .. } if *o == observer))
            .count()
    }

    pub fn stops(&self, observer: ObserverId) -> usize {
        self.delivered()
            .iter()
            .filter(|d| matches!(d, Delivered::Stop { observer: o, .. } if *o == observer))
            .count()
    }

    pub fn action_bars(&self, observer: ObserverId) -> usize {
        self.delivered()
            .iter()
            .filter(|d| matches!(d, Delivered::ActionBar { observer: o, .. } if *o == observer))
            .count()
    }
}

impl ObserverDirectory for SimObservers {
    fn worlds(&self) -> Vec<String> {
        let mut worlds: Vec<String> = self
            .connected
            .lock()
            .values()
            .map(|(world, _)| world.clone())
            .collect();
        worlds.sort();
        worlds.dedup();
        worlds
    }

    fn observers_in(&self, world: &str) -> Vec<ObserverSnapshot> {
        self.connected
            .lock()
            .iter()
            .filter(|(_, (w, _))| w == world)
            .map(|(id, (_, position))| ObserverSnapshot {
                id: *id,
                position: *position,
            })
            .collect()
    }

    fn play_sound(
        &self,
        observer: ObserverId,
        _at: &DeviceLocation,
        sound: &str,
        _volume: f32,
        _pitch: f32,
    ) {
        self.delivered.lock().push(Delivered::Play {
            observer,
            sound: sound.to_string(),
        });
    }

    fn stop_sound(&self, observer: ObserverId, sound: &str) {
        self.delivered.lock().push(Delivered::Stop {
            observer,
            sound: sound.to_string(),
        });
    }

    fn send_action_bar(&self, observer: ObserverId, message: &str) {
        self.delivered.lock().push(Delivered::ActionBar {
            observer,
            message: message.to_string(),
        });
    }
}

/// Simulated outbound channel delivering signals through the interceptor
#[derive(Default)]
pub struct SimChannel {
    interceptor: Mutex<Option<Arc<dyn SignalInterceptor>>>,
}

impl SimChannel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Send a signal to an observer; returns the interception verdict
    pub fn send(&self, observer: &ObserverContext, signal: &OutboundSignal) -> Verdict {
        match self.interceptor.lock().as_ref() {
            Some(interceptor) => interceptor.intercept(observer, signal),
            None => Verdict::Pass,
        }
    }
}

impl OutboundSignalChannel for SimChannel {
    fn install(&self, interceptor: Arc<dyn SignalInterceptor>) -> Result<(), IntegrationError> {
        *self.interceptor.lock() = Some(interceptor);
        Ok(())
    }

    fn uninstall(&self) {
        self.interceptor.lock().take();
    }
}
