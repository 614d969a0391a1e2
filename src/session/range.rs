//! Listener range tracking
//!
//! Each live session periodically recomputes which observers remain within
//! the broadcast radius. The adjustment is deliberately one-way: observers
//! who leave range get a stop instruction and are dropped; observers who
//! enter mid-track receive nothing, because a session's audience is fixed
//! when it starts. An empty audience does not end the session; its lifetime
//! stays governed by the eject deadline or a confirmed removal.

use std::collections::HashSet;
use std::sync::Arc;

use crate::config::ConfigStore;
use crate::session::AudioSession;
use crate::world::{observers_in_range, ObserverDirectory, ObserverId};

/// Per-session recomputation of in-range listeners
pub struct RangeTracker {
    config: Arc<ConfigStore>,
    observers: Arc<dyn ObserverDirectory>,
}

impl RangeTracker {
    pub fn new(config: Arc<ConfigStore>, observers: Arc<dyn ObserverDirectory>) -> Self {
        Self { config, observers }
    }

    /// Drop listeners who moved out of range, stopping their audio
    pub fn tick(&self, session: &AudioSession) {
        let radius = self.config.current().broadcast_radius as f64;
        let in_range: HashSet<ObserverId> =
            observers_in_range(self.observers.as_ref(), &session.location, radius)
                .into_iter()
                .map(|snapshot| snapshot.id)
                .collect();

        let mut listeners = session.listeners_mut();
        let left: Vec<ObserverId> = listeners
            .iter()
            .filter(|id| !in_range.contains(id))
            .copied()
            .collect();
        for observer in left {
            self.observers.stop_sound(observer, &session.custom_sound);
            listeners.remove(&observer);
            tracing::debug!(
                "Observer {} left range of {}; stopping audio",
                observer,
                session.location
            );
        }
    }
}
