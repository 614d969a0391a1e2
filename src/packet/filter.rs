//! Signal classification and cancellation decisions
//!
//! One decision function per signal tag. Cancellation is gated on the
//! suppression window: vanilla signals are dropped only when they can be
//! attributed to a tracked insert by causal proximity. Everything here
//! fails open, because blocking legitimate traffic is strictly worse than
//! letting one vanilla signal through.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::config::ConfigStore;
use crate::constants::{DEVICE_START_EVENT, DEVICE_STOP_EVENT, REPLACEMENT_NOTIFY_DELAY_MS, VANILLA_RECORD_KEY_PREFIX};
use crate::error::SignalError;
use crate::packet::signal::{
    AudioCue, ObserverContext, OutboundSignal, TextNotification, Verdict, WorldEventSignal,
};
use crate::packet::SignalInterceptor;
use crate::schedule::Scheduler;
use crate::session::AudioSessionManager;
use crate::suppress::SuppressionWindowStore;

/// Classifies outbound signals and decides cancellation
pub struct PacketFilter {
    config: Arc<ConfigStore>,
    suppression: Arc<SuppressionWindowStore>,
    sessions: Arc<AudioSessionManager>,
    scheduler: Arc<dyn Scheduler>,
}

impl PacketFilter {
    pub fn new(
        config: Arc<ConfigStore>,
        suppression: Arc<SuppressionWindowStore>,
        sessions: Arc<AudioSessionManager>,
        scheduler: Arc<dyn Scheduler>,
    ) -> Self {
        Self {
            config,
            suppression,
            sessions,
            scheduler,
        }
    }

    fn decide(
        &self,
        observer: &ObserverContext,
        signal: &OutboundSignal,
    ) -> Result<Verdict, SignalError> {
        if !self.config.current().enabled {
            return Ok(Verdict::Pass);
        }
        match signal {
            OutboundSignal::AudioCue(cue) => Ok(self.decide_audio_cue(observer, cue)),
            OutboundSignal::WorldEvent(event) => Ok(self.decide_world_event(observer, event)),
            OutboundSignal::Notification(notification) => {
                self.decide_notification(observer, notification)
            }
        }
    }

    fn decide_audio_cue(&self, observer: &ObserverContext, cue: &AudioCue) -> Verdict {
        if !cue.is_device_track() {
            return Verdict::Pass;
        }
        let location = cue.block_location(&observer.world);
        if self.suppression.should_suppress(&location, Instant::now()) {
            tracing::debug!("Cancelled vanilla track cue {} at {}", cue.sound, location);
            Verdict::Cancel
        } else {
            tracing::trace!("Allowing track cue {} at untracked {}", cue.sound, location);
            Verdict::Pass
        }
    }

    fn decide_world_event(
        &self,
        observer: &ObserverContext,
        event: &WorldEventSignal,
    ) -> Verdict {
        match event.code {
            DEVICE_START_EVENT => {
                let location = event.block_location(&observer.world);
                if self.suppression.should_suppress(&location, Instant::now()) {
                    tracing::debug!("Cancelled device start event at {}", location);
                    Verdict::Cancel
                } else {
                    Verdict::Pass
                }
            }
            // Stop events are harmless and keep the client consistent
            DEVICE_STOP_EVENT => Verdict::Pass,
            _ => Verdict::Pass,
        }
    }

    fn decide_notification(
        &self,
        observer: &ObserverContext,
        notification: &TextNotification,
    ) -> Result<Verdict, SignalError> {
        let Some(key) = notification.translation_key()? else {
            return Ok(Verdict::Pass);
        };
        if !key.starts_with(VANILLA_RECORD_KEY_PREFIX) {
            return Ok(Verdict::Pass);
        }
        tracing::debug!("Cancelled vanilla device notification ({})", key);

        // Replace with our own text shortly after, resolved against the
        // nearest live session to this observer
        let sessions = self.sessions.clone();
        let ctx = observer.clone();
        self.scheduler.run_later(
            Duration::from_millis(REPLACEMENT_NOTIFY_DELAY_MS),
            Box::new(move || sessions.send_now_playing(ctx.id, &ctx.world, ctx.position)),
        );
        Ok(Verdict::Cancel)
    }
}

impl SignalInterceptor for PacketFilter {
    /// Decide the signal's fate; parse failures and panics fail open
    fn intercept(&self, observer: &ObserverContext, signal: &OutboundSignal) -> Verdict {
        let decision =
            std::panic::catch_unwind(AssertUnwindSafe(|| self.decide(observer, signal)));
        match decision {
            Ok(Ok(verdict)) => verdict,
            Ok(Err(e)) => {
                tracing::debug!("Unparseable outbound signal, passing through: {}", e);
                Verdict::Pass
            }
            Err(_) => {
                tracing::error!("Panic in interception path; passing signal through");
                Verdict::Pass
            }
        }
    }
}
