//! World-facing value types and collaborator traits
//!
//! The engine never holds live handles into world state. Locations are
//! immutable value types, and every read or mutation of the world goes
//! through the [`WorldQuery`] collaborator, issued on the execution context
//! that owns the location (see [`crate::schedule::Scheduler`]).

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::QueryError;

/// Block-grid location of a playback device, keyed by world and coordinates
///
/// Equality and hashing are by value; two `DeviceLocation`s naming the same
/// coordinates are interchangeable.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DeviceLocation {
    pub world: String,
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl DeviceLocation {
    pub fn new(world: impl Into<String>, x: i32, y: i32, z: i32) -> Self {
        Self {
            world: world.into(),
            x,
            y,
            z,
        }
    }

    /// Center of the block, for distance checks against observer positions
    pub fn center(&self) -> Position {
        Position {
            x: self.x as f64 + 0.5,
            y: self.y as f64 + 0.5,
            z: self.z as f64 + 0.5,
        }
    }
}

impl fmt::Display for DeviceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{},{},{}", self.world, self.x, self.y, self.z)
    }
}

/// Continuous position of an observer within a world
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Position {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn distance_to(&self, other: Position) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        let dz = self.z - other.z;
        (dx * dx + dy * dy + dz * dz).sqrt()
    }
}

/// Normalized identifier of a content item (e.g. `music_disc_13`)
///
/// Identifiers are case-insensitive in configuration; normalization to
/// lowercase happens once at construction.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContentId(String);

impl ContentId {
    pub fn new(id: impl AsRef<str>) -> Self {
        Self(id.as_ref().to_ascii_lowercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Stable identity of a connected observer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ObserverId(pub Uuid);

impl ObserverId {
    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for ObserverId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Snapshot of an observer's identity and position at enumeration time
#[derive(Debug, Clone)]
pub struct ObserverSnapshot {
    pub id: ObserverId,
    pub position: Position,
}

/// Result of probing a location for a playback device
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceProbe {
    /// The location does not hold a device of the expected kind
    Missing,
    /// A device is present but holds no content
    Empty,
    /// A device is present and holds the given content
    Holding(ContentId),
}

/// Read and mutate device state in the world
///
/// All methods may fail transiently (e.g. region not loaded); callers skip
/// the location for the current tick and rely on the next scan.
pub trait WorldQuery: Send + Sync {
    /// Probe a single location for a device and its content
    fn probe(&self, location: &DeviceLocation) -> Result<DeviceProbe, QueryError>;

    /// Enumerate device locations in the loaded regions of a world
    ///
    /// Read-only; must not block world mutation.
    fn enumerate_devices(&self, world: &str) -> Result<Vec<DeviceLocation>, QueryError>;

    /// Clear the content held by the device at a location (auto-eject)
    fn eject(&self, location: &DeviceLocation) -> Result<(), QueryError>;
}

/// Enumerate connected observers and deliver observer-directed instructions
pub trait ObserverDirectory: Send + Sync {
    /// Worlds that currently have at least one connected observer
    fn worlds(&self) -> Vec<String>;

    /// Observers currently connected to a world, with positions
    fn observers_in(&self, world: &str) -> Vec<ObserverSnapshot>;

    /// Instruct an observer to start playing a positional sound
    fn play_sound(
        &self,
        observer: ObserverId,
        at: &DeviceLocation,
        sound: &str,
        volume: f32,
        pitch: f32,
    );

    /// Instruct an observer to stop a named sound
    fn stop_sound(&self, observer: ObserverId, sound: &str);

    /// Show a short status-bar message to an observer
    fn send_action_bar(&self, observer: ObserverId, message: &str);
}

/// Observers within `radius` of a device location
pub(crate) fn observers_in_range(
    directory: &dyn ObserverDirectory,
    location: &DeviceLocation,
    radius: f64,
) -> Vec<ObserverSnapshot> {
    let center = location.center();
    directory
        .observers_in(&location.world)
        .into_iter()
        .filter(|o| o.position.distance_to(center) <= radius)
        .collect()
}
