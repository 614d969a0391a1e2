//! Outbound signal model
//!
//! One tagged union covers the three signal categories the engine cares
//! about. Classification into the union happens once, at the channel
//! boundary; the payloads keep their wire quirks (fixed-point coordinates,
//! raw component JSON) and are decoded here on demand.

use crate::constants::{AUDIO_CUE_COORD_SCALE, VANILLA_TRACK_SOUND_MARKERS};
use crate::error::SignalError;
use crate::world::{DeviceLocation, ObserverId, Position};

/// Identity and position of the observer a signal is addressed to
#[derive(Debug, Clone)]
pub struct ObserverContext {
    pub id: ObserverId,
    pub world: String,
    pub position: Position,
}

/// Decision for one intercepted signal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Deliver the signal unmodified
    Pass,
    /// Drop the signal before delivery
    Cancel,
}

/// Outbound signal, classified once at ingestion
#[derive(Debug, Clone)]
pub enum OutboundSignal {
    /// Positional audio cue naming a sound and a fixed-point position
    AudioCue(AudioCue),
    /// World event carrying a coded action at a block position
    WorldEvent(WorldEventSignal),
    /// Textual/status notification carrying a chat component payload
    Notification(TextNotification),
}

/// Positional audio cue
///
/// Coordinates arrive in fixed-point format, blocks × 8.
#[derive(Debug, Clone)]
pub struct AudioCue {
    pub sound: String,
    pub fixed_x: i32,
    pub fixed_y: i32,
    pub fixed_z: i32,
}

impl AudioCue {
    /// Whether the sound identifier belongs to the vanilla device-track family
    pub fn is_device_track(&self) -> bool {
        VANILLA_TRACK_SOUND_MARKERS
            .iter()
            .any(|marker| self.sound.contains(marker))
    }

    /// Block location of the cue in the receiving observer's world
    pub fn block_location(&self, world: &str) -> DeviceLocation {
        DeviceLocation::new(
            world,
            self.fixed_x.div_euclid(AUDIO_CUE_COORD_SCALE),
            self.fixed_y.div_euclid(AUDIO_CUE_COORD_SCALE),
            self.fixed_z.div_euclid(AUDIO_CUE_COORD_SCALE),
        )
    }
}

/// World event signal at a block position
#[derive(Debug, Clone)]
pub struct WorldEventSignal {
    pub code: i32,
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl WorldEventSignal {
    pub fn block_location(&self, world: &str) -> DeviceLocation {
        DeviceLocation::new(world, self.x, self.y, self.z)
    }
}

/// Textual notification carrying its raw chat-component payload
#[derive(Debug, Clone)]
pub struct TextNotification {
    /// Serialized chat component (JSON)
    pub component: String,
}

impl TextNotification {
    /// Translation key of the component, if it is a translatable component
    ///
    /// The vanilla now-playing notification is matched by this structural
    /// marker rather than by display text, so substitute notifications
    /// (plain text) are never confused with it.
    pub fn translation_key(&self) -> Result<Option<String>, SignalError> {
        let value: serde_json::Value = serde_json::from_str(&self.component)
            .map_err(|e| SignalError::Malformed(e.to_string()))?;
        Ok(value
            .get("translate")
            .and_then(|key| key.as_str())
            .map(str::to_string))
    }
}
