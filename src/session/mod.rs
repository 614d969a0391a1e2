//! Audio session lifecycle
//!
//! The [`AudioSessionManager`] exclusively owns the session table. Sessions
//! are created only when the state scanner confirms an insert of remapped
//! content and destroyed on confirmed removal, eject-deadline firing, or
//! explicit stop. Start/stop for the same location are serialized through a
//! per-location lock so two sessions can never coexist at one device.

pub mod range;

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use parking_lot::{Mutex, MutexGuard};

use crate::config::ConfigStore;
use crate::constants::{NOW_PLAYING_PREFIX, RANGE_TICK_INTERVAL_MS};
use crate::notify::NotificationDeduper;
use crate::schedule::{Scheduler, TaskHandle};
use crate::suppress::SuppressionWindowStore;
use crate::world::{
    observers_in_range, ContentId, DeviceLocation, DeviceProbe, ObserverDirectory, ObserverId,
    Position, WorldQuery,
};

pub use range::RangeTracker;

/// Live record of a device currently emitting substitute audio
pub struct AudioSession {
    pub location: DeviceLocation,
    pub content_id: ContentId,
    pub custom_sound: String,
    pub duration: Duration,
    pub started_at: Instant,
    pub eject_deadline: Option<Instant>,
    listeners: Mutex<HashSet<ObserverId>>,
    cancelled: AtomicBool,
    tasks: Mutex<SessionTasks>,
}

#[derive(Default)]
struct SessionTasks {
    eject: Option<TaskHandle>,
    range_tick: Option<TaskHandle>,
}

impl AudioSession {
    fn new(
        location: DeviceLocation,
        content_id: ContentId,
        custom_sound: String,
        duration: Duration,
        auto_eject: bool,
    ) -> Self {
        let started_at = Instant::now();
        Self {
            location,
            content_id,
            custom_sound,
            duration,
            started_at,
            eject_deadline: auto_eject.then(|| started_at + duration),
            listeners: Mutex::new(HashSet::new()),
            cancelled: AtomicBool::new(false),
            tasks: Mutex::new(SessionTasks::default()),
        }
    }

    /// Snapshot of the observers currently receiving this session's audio
    pub fn listeners(&self) -> HashSet<ObserverId> {
        self.listeners.lock().clone()
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.lock().len()
    }

    pub(crate) fn listeners_mut(&self) -> MutexGuard<'_, HashSet<ObserverId>> {
        self.listeners.lock()
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    fn set_tasks(&self, eject: Option<TaskHandle>, range_tick: TaskHandle) {
        let mut tasks = self.tasks.lock();
        tasks.eject = eject;
        tasks.range_tick = Some(range_tick);
    }

    /// Mark cancelled and cancel scheduled work; idempotent
    fn cancel(&self) {
        if self.cancelled.swap(true, Ordering::SeqCst) {
            return;
        }
        let tasks = self.tasks.lock();
        if let Some(handle) = &tasks.eject {
            handle.cancel();
        }
        if let Some(handle) = &tasks.range_tick {
            handle.cancel();
        }
    }
}

/// Owner of all session state and the sole executor of start/stop decisions
pub struct AudioSessionManager {
    config: Arc<ConfigStore>,
    world: Arc<dyn WorldQuery>,
    observers: Arc<dyn ObserverDirectory>,
    scheduler: Arc<dyn Scheduler>,
    suppression: Arc<SuppressionWindowStore>,
    deduper: Arc<NotificationDeduper>,
    tracker: RangeTracker,
    sessions: DashMap<DeviceLocation, Arc<AudioSession>>,
    last_content: DashMap<DeviceLocation, ContentId>,
    locks: DashMap<DeviceLocation, Arc<Mutex<()>>>,
}

impl AudioSessionManager {
    pub fn new(
        config: Arc<ConfigStore>,
        world: Arc<dyn WorldQuery>,
        observers: Arc<dyn ObserverDirectory>,
        scheduler: Arc<dyn Scheduler>,
        suppression: Arc<SuppressionWindowStore>,
        deduper: Arc<NotificationDeduper>,
    ) -> Self {
        let tracker = RangeTracker::new(config.clone(), observers.clone());
        Self {
            config,
            world,
            observers,
            scheduler,
            suppression,
            deduper,
            tracker,
            sessions: DashMap::new(),
            last_content: DashMap::new(),
            locks: DashMap::new(),
        }
    }

    /// Per-location writer lock; entries live for the manager's lifetime
    fn location_lock(&self, location: &DeviceLocation) -> Arc<Mutex<()>> {
        self.locks
            .entry(location.clone())
            .or_default()
            .clone()
    }

    pub fn session(&self, location: &DeviceLocation) -> Option<Arc<AudioSession>> {
        self.sessions.get(location).map(|e| e.value().clone())
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    /// Last content the scanner confirmed at a location
    pub fn last_content(&self, location: &DeviceLocation) -> Option<ContentId> {
        self.last_content.get(location).map(|e| e.value().clone())
    }

    /// Start substitute playback for confirmed content; no-op when the
    /// content has no sound remap
    pub fn start(self: &Arc<Self>, location: &DeviceLocation, content: ContentId) {
        let lock = self.location_lock(location);
        let _guard = lock.lock();
        self.start_locked(location, content);
    }

    /// Stop and remove the session at a location; idempotent
    pub fn stop(&self, location: &DeviceLocation) {
        let lock = self.location_lock(location);
        let _guard = lock.lock();
        self.stop_locked(location);
    }

    /// Apply a scanner observation: diff against the cached last-known
    /// content and start/stop accordingly
    pub fn confirm_content(
        self: &Arc<Self>,
        location: &DeviceLocation,
        observed: Option<ContentId>,
    ) {
        let lock = self.location_lock(location);
        let _guard = lock.lock();

        let previous = self.last_content.get(location).map(|e| e.value().clone());
        match (previous, observed) {
            (Some(prev), None) => {
                tracing::debug!("Confirmed removal of {} at {}", prev, location);
                self.last_content.remove(location);
                self.stop_locked(location);
            }
            (None, Some(content)) => {
                tracing::debug!("Confirmed insert of {} at {}", content, location);
                self.last_content.insert(location.clone(), content.clone());
                self.start_locked(location, content);
            }
            (Some(prev), Some(content)) if prev != content => {
                tracing::debug!("Confirmed swap {} -> {} at {}", prev, content, location);
                self.last_content.insert(location.clone(), content.clone());
                self.start_locked(location, content);
            }
            (Some(_), Some(content)) => {
                // Unchanged; re-establish only if a session went missing
                // while remapped content stayed in the device
                if !self.sessions.contains_key(location)
                    && self.config.current().has_sound_remap(&content)
                {
                    self.start_locked(location, content);
                }
            }
            (None, None) => {}
        }
    }

    /// Forget a location verified to no longer hold a device
    pub fn forget(&self, location: &DeviceLocation) {
        let lock = self.location_lock(location);
        let _guard = lock.lock();
        self.last_content.remove(location);
        self.stop_locked(location);
    }

    /// Clear device content at the eject deadline, then stop the session
    pub fn eject(&self, location: &DeviceLocation) {
        let Some(session) = self.session(location) else {
            return;
        };
        if session.is_cancelled() {
            return;
        }
        match self.world.probe(location) {
            Ok(DeviceProbe::Holding(content)) if content == session.content_id => {
                if let Err(e) = self.world.eject(location) {
                    tracing::warn!("Auto-eject failed at {}: {}", location, e);
                    return;
                }
                tracing::debug!("Auto-ejected {} at {}", content, location);
                self.stop(location);
            }
            Ok(_) => {
                // Content changed since the deadline was scheduled; the
                // scanner reconciles on its next pass
            }
            Err(e) => tracing::debug!("Auto-eject probe failed at {}: {}", location, e),
        }
    }

    /// Stop every live session
    pub fn stop_all(&self) {
        let locations: Vec<DeviceLocation> =
            self.sessions.iter().map(|e| e.key().clone()).collect();
        for location in locations {
            self.stop(&location);
        }
    }

    /// Drop cached content and location locks; call only when quiescent
    pub fn clear_caches(&self) {
        self.last_content.clear();
        self.locks.clear();
    }

    /// Nearest live session to a position, within `radius`
    pub fn nearest_session_to(
        &self,
        world: &str,
        position: Position,
        radius: f64,
    ) -> Option<Arc<AudioSession>> {
        self.sessions
            .iter()
            .filter(|e| e.key().world == world && !e.value().is_cancelled())
            .map(|e| {
                let distance = position.distance_to(e.key().center());
                (distance, e.value().clone())
            })
            .filter(|(distance, _)| *distance <= radius)
            .min_by(|(a, _), (b, _)| a.total_cmp(b))
            .map(|(_, session)| session)
    }

    /// Send a substitute now-playing notification for the nearest live
    /// session to the observer's position
    pub fn send_now_playing(&self, observer: ObserverId, world: &str, position: Position) {
        let config = self.config.current();
        let radius = config.broadcast_radius as f64;
        let Some(session) = self.nearest_session_to(world, position, radius) else {
            return;
        };
        let Some(remap) = config.remap(&session.content_id) else {
            return;
        };
        let Some(name) = remap.display_name.as_deref() else {
            return;
        };
        self.observers
            .send_action_bar(observer, &format!("{}{}", NOW_PLAYING_PREFIX, name));
    }

    pub(crate) fn range_tick(&self, location: &DeviceLocation) {
        let Some(session) = self.session(location) else {
            return;
        };
        if session.is_cancelled() {
            return;
        }
        self.tracker.tick(&session);
    }

    fn start_locked(self: &Arc<Self>, location: &DeviceLocation, content: ContentId) {
        let config = self.config.current();
        let Some(remap) = config.remap(&content) else {
            tracing::debug!("No remap for {}; leaving vanilla playback", content);
            return;
        };
        if !remap.has_custom_sound() {
            tracing::debug!("{} has no custom sound; leaving vanilla playback", content);
            return;
        }
        let sound = remap.custom_sound.clone().unwrap_or_default();

        // Clear any stale session before creating the replacement
        self.stop_locked(location);

        let duration = remap.duration();
        let auto_eject = config.auto_eject && !duration.is_zero();
        let session = Arc::new(AudioSession::new(
            location.clone(),
            content.clone(),
            sound.clone(),
            duration,
            auto_eject,
        ));
        self.sessions.insert(location.clone(), session.clone());

        let eject_handle = auto_eject.then(|| {
            let manager = Arc::clone(self);
            let loc = location.clone();
            self.scheduler
                .run_at_location_later(location, duration, Box::new(move || manager.eject(&loc)))
        });
        let tick_period = Duration::from_millis(RANGE_TICK_INTERVAL_MS);
        let tick_handle = {
            let manager = Arc::clone(self);
            let loc = location.clone();
            self.scheduler.run_at_location_repeating(
                location,
                tick_period,
                tick_period,
                Box::new(move || manager.range_tick(&loc)),
            )
        };
        session.set_tasks(eject_handle, tick_handle);

        // The audience is fixed at start time; later range ticks only remove
        let in_range =
            observers_in_range(self.observers.as_ref(), location, config.broadcast_radius as f64);
        {
            let mut listeners = session.listeners_mut();
            for snapshot in &in_range {
                self.observers
                    .play_sound(snapshot.id, location, &sound, config.volume, config.pitch);
                listeners.insert(snapshot.id);
            }
        }
        tracing::debug!(
            "Started session for {} at {} with {} listeners",
            content,
            location,
            in_range.len()
        );

        if let Some(name) = remap.display_name.as_deref() {
            if self.deduper.try_send(name, Instant::now()) {
                let message = format!("{}{}", NOW_PLAYING_PREFIX, name);
                for snapshot in &in_range {
                    self.observers.send_action_bar(snapshot.id, &message);
                }
            }
        }
    }

    fn stop_locked(&self, location: &DeviceLocation) {
        let Some((_, session)) = self.sessions.remove(location) else {
            return;
        };
        session.cancel();
        let listeners: Vec<ObserverId> = session.listeners_mut().drain().collect();
        for observer in &listeners {
            self.observers.stop_sound(*observer, &session.custom_sound);
        }
        self.suppression.remove(location);
        tracing::debug!(
            "Stopped session at {} ({} listeners)",
            location,
            listeners.len()
        );
    }
}
