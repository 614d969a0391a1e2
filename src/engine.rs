//! Engine assembly and lifecycle
//!
//! One engine instance owns every cache and scheduled task. It is created
//! at enable time by the host and torn down explicitly; there is no static
//! state. The host feeds it interaction/automation/ambient hints, which
//! prime the suppression window and request a prompt confirm; they never
//! start or stop sessions themselves.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use crate::config::{ConfigStore, EngineConfig};
use crate::constants::{
    CLEANUP_INTERVAL_MS, DISCOVERY_INTERVAL_MS, HINT_CONFIRM_DELAY_MS, STATE_SCAN_INTERVAL_MS,
};
use crate::notify::NotificationDeduper;
use crate::packet::{OutboundSignalChannel, PacketFilter, SignalInterceptor};
use crate::registry::DeviceRegistry;
use crate::scan::{DiscoveryScanner, StateScanner};
use crate::schedule::{Scheduler, TaskHandle};
use crate::session::AudioSessionManager;
use crate::suppress::SuppressionWindowStore;
use crate::world::{ContentId, DeviceLocation, ObserverDirectory, ObserverId, WorldQuery};

/// Hint entry points, implemented by [`Engine`] and consumed by the host's
/// event source adapter
pub trait EventSink: Send + Sync {
    /// An observer used `held_item` on the device at `location`
    fn interaction(&self, observer: ObserverId, location: DeviceLocation, held_item: Option<ContentId>);

    /// An automated item mover pushed `item` into the device at `destination`
    fn automation_move(&self, destination: DeviceLocation, item: ContentId);

    /// Something near `location` warrants a prompt rescan
    fn ambient_trigger(&self, location: DeviceLocation);
}

/// Audio-substitution engine
pub struct Engine {
    config: Arc<ConfigStore>,
    scheduler: Arc<dyn Scheduler>,
    channel: Option<Arc<dyn OutboundSignalChannel>>,
    registry: Arc<DeviceRegistry>,
    suppression: Arc<SuppressionWindowStore>,
    deduper: Arc<NotificationDeduper>,
    sessions: Arc<AudioSessionManager>,
    discovery: Arc<DiscoveryScanner>,
    state_scan: Arc<StateScanner>,
    filter: Arc<PacketFilter>,
    tasks: Mutex<Vec<TaskHandle>>,
    enabled: Arc<AtomicBool>,
}

impl Engine {
    pub fn new(
        config: EngineConfig,
        world: Arc<dyn WorldQuery>,
        observers: Arc<dyn ObserverDirectory>,
        scheduler: Arc<dyn Scheduler>,
        channel: Option<Arc<dyn OutboundSignalChannel>>,
    ) -> Self {
        let suppression = Arc::new(SuppressionWindowStore::new(config.suppression_window()));
        let deduper = Arc::new(NotificationDeduper::new(config.notification_cooldown()));
        let config = Arc::new(ConfigStore::new(config));
        let registry = Arc::new(DeviceRegistry::new());

        let sessions = Arc::new(AudioSessionManager::new(
            config.clone(),
            world.clone(),
            observers.clone(),
            scheduler.clone(),
            suppression.clone(),
            deduper.clone(),
        ));
        let discovery = Arc::new(DiscoveryScanner::new(
            config.clone(),
            world.clone(),
            observers,
            registry.clone(),
        ));
        let state_scan = Arc::new(StateScanner::new(
            world,
            scheduler.clone(),
            registry.clone(),
            sessions.clone(),
        ));
        let filter = Arc::new(PacketFilter::new(
            config.clone(),
            suppression.clone(),
            sessions.clone(),
            scheduler.clone(),
        ));

        Self {
            config,
            scheduler,
            channel,
            registry,
            suppression,
            deduper,
            sessions,
            discovery,
            state_scan,
            filter,
            tasks: Mutex::new(Vec::new()),
            enabled: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    pub fn config(&self) -> &Arc<ConfigStore> {
        &self.config
    }

    pub fn sessions(&self) -> &Arc<AudioSessionManager> {
        &self.sessions
    }

    pub fn registry(&self) -> &Arc<DeviceRegistry> {
        &self.registry
    }

    pub fn suppression(&self) -> &Arc<SuppressionWindowStore> {
        &self.suppression
    }

    /// The interceptor, for hosts that wire interception themselves
    pub fn interceptor(&self) -> Arc<dyn SignalInterceptor> {
        self.filter.clone()
    }

    /// Start scanners, sweeps and packet interception
    pub fn enable(&self) {
        let config = self.config.current();
        if !config.enabled {
            tracing::info!("Audio substitution disabled by configuration");
            return;
        }
        if self.enabled.swap(true, Ordering::SeqCst) {
            return;
        }

        match &self.channel {
            Some(channel) => match channel.install(self.filter.clone()) {
                Ok(()) => {
                    tracing::info!("Signal interception installed; vanilla device audio will be replaced")
                }
                Err(e) => tracing::warn!(
                    "Signal interception unavailable ({}); running degraded without suppression",
                    e
                ),
            },
            None => tracing::warn!(
                "No outbound signal channel; running degraded without suppression or replacement notifications"
            ),
        }

        let mut tasks = self.tasks.lock();

        let discovery_interval = Duration::from_millis(DISCOVERY_INTERVAL_MS);
        let discovery = self.discovery.clone();
        tasks.push(self.scheduler.run_repeating(
            Duration::ZERO,
            discovery_interval,
            Box::new(move || discovery.full_scan()),
        ));

        let scan_interval = Duration::from_millis(STATE_SCAN_INTERVAL_MS);
        let state_scan = self.state_scan.clone();
        tasks.push(self.scheduler.run_repeating(
            scan_interval,
            scan_interval,
            Box::new(move || state_scan.tick()),
        ));

        let cleanup_interval = Duration::from_millis(CLEANUP_INTERVAL_MS);
        let suppression = self.suppression.clone();
        let deduper = self.deduper.clone();
        tasks.push(self.scheduler.run_repeating(
            cleanup_interval,
            cleanup_interval,
            Box::new(move || {
                let now = Instant::now();
                suppression.sweep(now);
                deduper.sweep(now);
            }),
        ));

        tracing::info!("Audio substitution enabled ({} remaps)", config.remaps.len());
    }

    /// Cancel all scheduled work, stop all sessions and clear every cache
    pub fn disable(&self) {
        if !self.enabled.swap(false, Ordering::SeqCst) {
            return;
        }
        if let Some(channel) = &self.channel {
            channel.uninstall();
        }
        for task in self.tasks.lock().drain(..) {
            task.cancel();
        }
        self.sessions.stop_all();
        self.sessions.clear_caches();
        self.registry.clear();
        self.suppression.clear();
        self.deduper.clear();
        tracing::info!("Audio substitution disabled; all sessions stopped");
    }

    /// Direct interaction hint: an observer used `held_item` on the device
    /// at `location`
    pub fn on_interaction(
        &self,
        observer: ObserverId,
        location: DeviceLocation,
        held_item: Option<ContentId>,
    ) {
        if !self.is_enabled() {
            return;
        }
        self.registry.insert(location.clone());
        if let Some(content) = held_item {
            if self.config.current().has_sound_remap(&content) {
                self.suppression.mark(&location, Instant::now());
                tracing::debug!(
                    "Interaction by {} primed suppression for {} at {}",
                    observer,
                    content,
                    location
                );
            } else {
                tracing::debug!("{} has no sound remap; vanilla playback allowed", content);
            }
        }
        self.request_confirm(location);
    }

    /// Automation hint: an item mover pushed `item` into the device at
    /// `destination`
    pub fn on_automation_move(&self, destination: DeviceLocation, item: ContentId) {
        if !self.is_enabled() {
            return;
        }
        self.registry.insert(destination.clone());
        if self.config.current().has_sound_remap(&item) {
            self.suppression.mark(&destination, Instant::now());
            tracing::debug!("Automation primed suppression for {} at {}", item, destination);
        }
        self.request_confirm(destination);
    }

    /// Ambient trigger hint: something near `location` warrants a rescan
    pub fn on_ambient_trigger(&self, location: DeviceLocation) {
        if !self.is_enabled() {
            return;
        }
        self.registry.insert(location.clone());
        self.request_confirm(location);
    }

    /// Schedule a prompt out-of-band confirm of one location
    ///
    /// The scanner stays the sole authority: the hint only moves its next
    /// look at this location earlier.
    fn request_confirm(&self, location: DeviceLocation) {
        let scanner = self.state_scan.clone();
        let enabled = self.enabled.clone();
        let loc = location.clone();
        self.scheduler.run_at_location_later(
            &location,
            Duration::from_millis(HINT_CONFIRM_DELAY_MS),
            Box::new(move || {
                if enabled.load(Ordering::SeqCst) {
                    scanner.scan_location(&loc);
                }
            }),
        );
    }
}

impl EventSink for Engine {
    fn interaction(
        &self,
        observer: ObserverId,
        location: DeviceLocation,
        held_item: Option<ContentId>,
    ) {
        self.on_interaction(observer, location, held_item);
    }

    fn automation_move(&self, destination: DeviceLocation, item: ContentId) {
        self.on_automation_move(destination, item);
    }

    fn ambient_trigger(&self, location: DeviceLocation) {
        self.on_ambient_trigger(location);
    }
}
