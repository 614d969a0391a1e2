//! Shared test doubles for the engine's collaborators

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use crate::config::{EngineConfig, RemapEntry};
use crate::error::{IntegrationError, QueryError};
use crate::packet::{ObserverContext, OutboundSignal, OutboundSignalChannel, SignalInterceptor, Verdict};
use crate::schedule::{OneShot, Repeating, Scheduler, TaskHandle};
use crate::world::{
    ContentId, DeviceLocation, DeviceProbe, ObserverDirectory, ObserverId, ObserverSnapshot,
    Position, WorldQuery,
};

/// In-memory world with controllable devices and failure injection
#[derive(Default)]
pub(crate) struct FakeWorld {
    devices: Mutex<HashMap<DeviceLocation, Option<ContentId>>>,
    failing: Mutex<HashSet<DeviceLocation>>,
    ejected: Mutex<Vec<DeviceLocation>>,
}

impl FakeWorld {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn place_device(&self, location: DeviceLocation, content: Option<ContentId>) {
        self.devices.lock().insert(location, content);
    }

    pub fn remove_device(&self, location: &DeviceLocation) {
        self.devices.lock().remove(location);
    }

    pub fn set_failing(&self, location: DeviceLocation, failing: bool) {
        if failing {
            self.failing.lock().insert(location);
        } else {
            self.failing.lock().remove(&location);
        }
    }

    pub fn content_at(&self, location: &DeviceLocation) -> Option<ContentId> {
        self.devices.lock().get(location).cloned().flatten()
    }

    pub fn ejected(&self) -> Vec<DeviceLocation> {
        self.ejected.lock().clone()
    }
}

impl WorldQuery for FakeWorld {
    fn probe(&self, location: &DeviceLocation) -> Result<DeviceProbe, QueryError> {
        if self.failing.lock().contains(location) {
            return Err(QueryError::RegionNotLoaded(location.to_string()));
        }
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
        if self.failing.lock().contains(location) {
            return Err(QueryError::RegionNotLoaded(location.to_string()));
        }
        let mut devices = self.devices.lock();
        match devices.get_mut(location) {
            Some(content) => {
                *content = None;
                self.ejected.lock().push(location.clone());
                Ok(())
            }
            None => Err(QueryError::Backend(format!("no device at {}", location))),
        }
    }
}

/// Instruction delivered to an observer, recorded for assertions
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Instruction {
    Play {
        observer: ObserverId,
        at: DeviceLocation,
        sound: String,
    },
    Stop {
        observer: ObserverId,
        sound: String,
    },
    ActionBar {
        observer: ObserverId,
        message: String,
    },
}

/// In-memory observer directory that records delivered instructions
#[derive(Default)]
pub(crate) struct FakeObservers {
    connected: Mutex<HashMap<ObserverId, (String, Position)>>,
    log: Mutex<Vec<Instruction>>,
}

impl FakeObservers {
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

    pub fn disconnect(&self, id: ObserverId) {
        self.connected.lock().remove(&id);
    }

    pub fn instructions(&self) -> Vec<Instruction> {
        self.log.lock().clone()
    }

    pub fn clear_log(&self) {
        self.log.lock().clear();
    }

    pub fn play_count(&self, observer: ObserverId) -> usize {
        self.instructions()
            .iter()
            .filter(|i| matches!(i, Instruction::Play { observer: o, .. } if *o == observer))
            .count()
    }

    pub fn stop_count(&self, observer: ObserverId) -> usize {
        self.instructions()
            .iter()
            .filter(|i| matches!(i, Instruction::Stop { observer: o, .. } if *o == observer))
            .count()
    }

    pub fn action_bar_count(&self, observer: ObserverId) -> usize {
        self.instructions()
            .iter()
            .filter(|i| matches!(i, Instruction::ActionBar { observer: o, .. } if *o == observer))
            .count()
    }
}

impl ObserverDirectory for FakeObservers {
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
        at: &DeviceLocation,
        sound: &str,
        _volume: f32,
        _pitch: f32,
    ) {
        self.log.lock().push(Instruction::Play {
            observer,
            at: at.clone(),
            sound: sound.to_string(),
        });
    }

    fn stop_sound(&self, observer: ObserverId, sound: &str) {
        self.log.lock().push(Instruction::Stop {
            observer,
            sound: sound.to_string(),
        });
    }

    fn send_action_bar(&self, observer: ObserverId, message: &str) {
        self.log.lock().push(Instruction::ActionBar {
            observer,
            message: message.to_string(),
        });
    }
}

enum Body {
    Once(Option<OneShot>),
    Repeat(Repeating),
}

/// A task captured by [`RecordingScheduler`]
pub(crate) struct RecordedTask {
    pub delay: Duration,
    pub period: Option<Duration>,
    pub location: Option<DeviceLocation>,
    pub handle: TaskHandle,
    body: Mutex<Body>,
}

impl RecordedTask {
    pub fn is_repeating(&self) -> bool {
        self.period.is_some()
    }

    /// Run the task body once, unless cancelled
    pub fn fire(&self) {
        if self.handle.is_cancelled() {
            return;
        }
        match &mut *self.body.lock() {
            Body::Once(slot) => {
                if let Some(task) = slot.take() {
                    task();
                }
            }
            Body::Repeat(task) => task(),
        }
    }
}

/// Scheduler that records tasks for manual, deterministic firing
#[derive(Default)]
pub(crate) struct RecordingScheduler {
    tasks: Mutex<Vec<Arc<RecordedTask>>>,
}

impl RecordingScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    fn record(
        &self,
        delay: Duration,
        period: Option<Duration>,
        location: Option<DeviceLocation>,
        body: Body,
    ) -> TaskHandle {
        let task = Arc::new(RecordedTask {
            delay,
            period,
            location,
            handle: TaskHandle::new(),
            body: Mutex::new(body),
        });
        let handle = task.handle.clone();
        self.tasks.lock().push(task);
        handle
    }

    pub fn tasks(&self) -> Vec<Arc<RecordedTask>> {
        self.tasks.lock().clone()
    }

    /// Fire every live zero-delay one-shot task once, in scheduling order
    pub fn fire_one_shots(&self) -> usize {
        let mut fired = 0;
        for task in self.tasks() {
            if !task.is_repeating() && task.delay.is_zero() && !task.handle.is_cancelled() {
                task.fire();
                fired += 1;
            }
        }
        fired
    }

    /// Fire every live one-shot task regardless of its delay
    pub fn fire_all_one_shots(&self) -> usize {
        let mut fired = 0;
        for task in self.tasks() {
            if !task.is_repeating() && !task.handle.is_cancelled() {
                task.fire();
                fired += 1;
            }
        }
        fired
    }

    /// Run every live repeating task once
    pub fn tick_repeating(&self) {
        for task in self.tasks() {
            if task.is_repeating() {
                task.fire();
            }
        }
    }
}

impl Scheduler for RecordingScheduler {
    fn run_later(&self, delay: Duration, task: OneShot) -> TaskHandle {
        self.record(delay, None, None, Body::Once(Some(task)))
    }

    fn run_repeating(
        &self,
        initial_delay: Duration,
        period: Duration,
        task: Repeating,
    ) -> TaskHandle {
        self.record(initial_delay, Some(period), None, Body::Repeat(task))
    }

    fn run_at_location(&self, location: &DeviceLocation, task: OneShot) -> TaskHandle {
        self.record(
            Duration::ZERO,
            None,
            Some(location.clone()),
            Body::Once(Some(task)),
        )
    }

    fn run_at_location_later(
        &self,
        location: &DeviceLocation,
        delay: Duration,
        task: OneShot,
    ) -> TaskHandle {
        self.record(delay, None, Some(location.clone()), Body::Once(Some(task)))
    }

    fn run_at_location_repeating(
        &self,
        location: &DeviceLocation,
        initial_delay: Duration,
        period: Duration,
        task: Repeating,
    ) -> TaskHandle {
        self.record(
            initial_delay,
            Some(period),
            Some(location.clone()),
            Body::Repeat(task),
        )
    }
}

/// Signal channel that records the installed interceptor
#[derive(Default)]
pub(crate) struct FakeChannel {
    installed: Mutex<Option<Arc<dyn SignalInterceptor>>>,
}

impl FakeChannel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_installed(&self) -> bool {
        self.installed.lock().is_some()
    }

    /// Deliver a signal through the installed interceptor, if any
    pub fn intercept(&self, observer: &ObserverContext, signal: &OutboundSignal) -> Verdict {
        match self.installed.lock().as_ref() {
            Some(interceptor) => interceptor.intercept(observer, signal),
            None => Verdict::Pass,
        }
    }
}

impl OutboundSignalChannel for FakeChannel {
    fn install(&self, interceptor: Arc<dyn SignalInterceptor>) -> Result<(), IntegrationError> {
        *self.installed.lock() = Some(interceptor);
        Ok(())
    }

    fn uninstall(&self) {
        self.installed.lock().take();
    }
}

/// Config with a few remaps the tests lean on
pub(crate) fn test_config() -> EngineConfig {
    let mut config = EngineConfig::default();
    config.remaps.insert(
        "disc_a".to_string(),
        RemapEntry {
            custom_sound: Some("custom:tune1".to_string()),
            duration_secs: 30,
            display_name: Some("Tune One".to_string()),
            lore: Vec::new(),
        },
    );
    config.remaps.insert(
        "disc_b".to_string(),
        RemapEntry {
            custom_sound: Some("custom:tune2".to_string()),
            duration_secs: 0,
            display_name: Some("Tune Two".to_string()),
            lore: Vec::new(),
        },
    );
    config.remaps.insert(
        "label_only".to_string(),
        RemapEntry {
            custom_sound: None,
            duration_secs: 0,
            display_name: Some("Label Only".to_string()),
            lore: Vec::new(),
        },
    );
    config
}
