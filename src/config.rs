//! Engine configuration
//!
//! Loaded from TOML. A loaded [`EngineConfig`] is immutable; reloads swap a
//! whole new generation into the [`ConfigStore`] so concurrent readers never
//! observe a half-updated configuration.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use serde::Deserialize;

use crate::constants::*;
use crate::error::ConfigError;
use crate::world::ContentId;

/// Per-content substitution entry
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RemapEntry {
    /// Identifier of the substitute sound to play instead of the vanilla track
    pub custom_sound: Option<String>,

    /// Track length in seconds; 0 disables the auto-eject deadline
    pub duration_secs: u64,

    /// Name shown in the substitute now-playing notification
    pub display_name: Option<String>,

    /// Item lore lines, applied by the label-rewriting collaborator
    pub lore: Vec<String>,
}

impl RemapEntry {
    /// Whether this entry substitutes audio (and not just labels)
    pub fn has_custom_sound(&self) -> bool {
        self.custom_sound.as_deref().is_some_and(|s| !s.is_empty())
    }

    pub fn duration(&self) -> Duration {
        Duration::from_secs(self.duration_secs)
    }
}

/// Engine configuration, one immutable generation
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Master switch; when false the enable hook is a no-op
    pub enabled: bool,

    /// Radius in blocks within which observers receive substitute audio
    pub broadcast_radius: u32,

    /// Radius around observers inside which discovery scans enumerate devices
    pub discovery_radius: f64,

    /// Playback volume for substitute audio
    pub volume: f32,

    /// Playback pitch for substitute audio
    pub pitch: f32,

    /// Eject device content automatically when the track duration elapses
    pub auto_eject: bool,

    /// Cooldown between duplicate notifications for the same subject
    pub notification_cooldown_ms: u64,

    /// Causal window for attributing vanilla signals to a tracked insert
    pub suppression_window_ms: u64,

    /// Content id → substitution entry
    pub remaps: HashMap<String, RemapEntry>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            broadcast_radius: DEFAULT_BROADCAST_RADIUS,
            discovery_radius: DEFAULT_DISCOVERY_RADIUS,
            volume: 1.0,
            pitch: 1.0,
            auto_eject: true,
            notification_cooldown_ms: DEFAULT_NOTIFICATION_COOLDOWN_MS,
            suppression_window_ms: DEFAULT_SUPPRESSION_WINDOW_MS,
            remaps: HashMap::new(),
        }
    }
}

impl EngineConfig {
    /// Parse a configuration from TOML text
    ///
    /// Remap keys are normalized to lowercase. Entries that fail validation
    /// are dropped with a warning and their content treated as unmapped.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let mut config: EngineConfig = toml::from_str(text)?;

        let mut remaps = HashMap::with_capacity(config.remaps.len());
        for (key, entry) in config.remaps.drain() {
            let content = ContentId::new(&key);
            match validate_remap(&content, &entry) {
                Ok(()) => {
                    remaps.insert(content.as_str().to_string(), entry);
                }
                Err(e) => {
                    tracing::warn!("Dropping invalid remap: {}", e);
                }
            }
        }
        config.remaps = remaps;

        Ok(config)
    }

    /// Load a configuration from a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Look up the remap entry for a content id
    pub fn remap(&self, content: &ContentId) -> Option<&RemapEntry> {
        self.remaps.get(content.as_str())
    }

    /// Whether the content id maps to a substitute sound
    pub fn has_sound_remap(&self, content: &ContentId) -> bool {
        self.remap(content).is_some_and(RemapEntry::has_custom_sound)
    }

    pub fn notification_cooldown(&self) -> Duration {
        Duration::from_millis(self.notification_cooldown_ms)
    }

    pub fn suppression_window(&self) -> Duration {
        Duration::from_millis(self.suppression_window_ms)
    }
}

fn validate_remap(content: &ContentId, entry: &RemapEntry) -> Result<(), ConfigError> {
    if content.as_str().is_empty() {
        return Err(ConfigError::InvalidRemap {
            content: content.to_string(),
            reason: "empty content id".to_string(),
        });
    }
    if entry.custom_sound.as_deref() == Some("") {
        return Err(ConfigError::InvalidRemap {
            content: content.to_string(),
            reason: "custom_sound must not be empty".to_string(),
        });
    }
    if entry.custom_sound.is_none() && entry.display_name.is_none() && entry.lore.is_empty() {
        return Err(ConfigError::InvalidRemap {
            content: content.to_string(),
            reason: "entry remaps nothing".to_string(),
        });
    }
    Ok(())
}

/// Shared handle to the current configuration generation
pub struct ConfigStore {
    current: RwLock<Arc<EngineConfig>>,
}

impl ConfigStore {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            current: RwLock::new(Arc::new(config)),
        }
    }

    /// The current configuration generation
    pub fn current(&self) -> Arc<EngineConfig> {
        self.current.read().clone()
    }

    /// Swap in a new configuration generation
    pub fn replace(&self, config: EngineConfig) {
        let remaps = config.remaps.len();
        *self.current.write() = Arc::new(config);
        tracing::info!("Configuration reloaded: {} remaps", remaps);
    }
}

impl Default for ConfigStore {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}
