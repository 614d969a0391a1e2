//! # SoundSwap
//!
//! Server-side audio substitution engine for in-world playback devices.
//!
//! When a device (a jukebox-like block) receives a content item that has a
//! configured remap, the engine suppresses the platform's own audio and
//! notification signals for that insert and delivers a substitute sound to
//! every observer in range, with stop-on-leave tracking and optional timed
//! auto-eject.
//!
//! ## Architecture Overview
//!
//! ```text
//!  interaction / automation hints        periodic scans
//!            │                                │
//!            ▼                                ▼
//!  ┌───────────────────┐        ┌──────────────────────────┐
//!  │ SuppressionWindow │        │ DiscoveryScanner (≈5 s)  │──▶ DeviceRegistry
//!  │ Store (TTL 500ms) │        │ StateScanner    (≈500 ms)│
//!  └─────────┬─────────┘        └────────────┬─────────────┘
//!            │                               │ confirmed insert/removal
//!            │                               ▼
//!            │                  ┌──────────────────────────┐
//!            │                  │    AudioSessionManager   │──▶ RangeTracker (1 s)
//!            │                  │  (session table, eject)  │──▶ NotificationDeduper
//!            │                  └────────────┬─────────────┘
//!            │                               │ play/stop instructions
//!            ▼                               ▼
//!  ┌───────────────────┐        ┌──────────────────────────┐
//!  │   PacketFilter    │───────▶│     ObserverDirectory    │
//!  │ (inline, outbound)│ cancel └──────────────────────────┘
//!  └───────────────────┘
//! ```
//!
//! Hints only prime the suppression window; the state scanner is the sole
//! authority for starting and stopping sessions. The packet filter runs
//! inline with outbound traffic and fails open on anything it cannot parse.

pub mod config;
pub mod engine;
pub mod error;
pub mod notify;
pub mod packet;
pub mod registry;
pub mod scan;
pub mod schedule;
pub mod session;
pub mod suppress;
pub mod world;

#[cfg(test)]
pub(crate) mod test_support;

pub use engine::{Engine, EventSink};
pub use error::{Error, Result};

/// Application-wide constants
pub mod constants {
    /// Default broadcast radius for substitute audio, in blocks
    pub const DEFAULT_BROADCAST_RADIUS: u32 = 64;

    /// Default radius around observers inside which discovery scans run
    pub const DEFAULT_DISCOVERY_RADIUS: f64 = 128.0;

    /// Default suppression window for vanilla signals after an insert
    pub const DEFAULT_SUPPRESSION_WINDOW_MS: u64 = 500;

    /// Default cooldown between duplicate player-visible notifications
    pub const DEFAULT_NOTIFICATION_COOLDOWN_MS: u64 = 2000;

    /// Interval between state-scanner ground-truth passes
    pub const STATE_SCAN_INTERVAL_MS: u64 = 500;

    /// Interval between discovery full scans
    pub const DISCOVERY_INTERVAL_MS: u64 = 5000;

    /// Interval between listener range recomputations per session
    pub const RANGE_TICK_INTERVAL_MS: u64 = 1000;

    /// Interval between cache cleanup sweeps
    pub const CLEANUP_INTERVAL_MS: u64 = 5000;

    /// Delay before a hint-primed out-of-band confirm of a single location
    pub const HINT_CONFIRM_DELAY_MS: u64 = 150;

    /// Delay before sending a replacement now-playing notification
    pub const REPLACEMENT_NOTIFY_DELAY_MS: u64 = 50;

    /// World-event code emitted when a device starts vanilla playback
    pub const DEVICE_START_EVENT: i32 = 1010;

    /// World-event code emitted when a device stops vanilla playback
    pub const DEVICE_STOP_EVENT: i32 = 1011;

    /// Positional audio cues carry fixed-point coordinates (blocks × 8)
    pub const AUDIO_CUE_COORD_SCALE: i32 = 8;

    /// Identifier fragments that mark a sound as a vanilla device track
    pub const VANILLA_TRACK_SOUND_MARKERS: [&str; 3] = ["music_disc", "music.disc", "record"];

    /// Translation key of the vanilla now-playing notification
    pub const VANILLA_NOW_PLAYING_KEY: &str = "record.nowPlaying";

    /// Translation-key prefix shared by vanilla device notifications
    pub const VANILLA_RECORD_KEY_PREFIX: &str = "record.";

    /// Prefix for substitute now-playing notifications
    pub const NOW_PLAYING_PREFIX: &str = "§7Now playing: ";
}
