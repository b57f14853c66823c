//! Player-facing settings, stored as RON next to the saves

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Game settings that influence the world core
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Show the clock as `HH:MM` instead of `h:MM AM`
    pub clock_24h: bool,
    /// Autosave every N seconds of play time (0 disables autosave)
    pub autosave_interval_secs: u64,
    /// Chunks within this Chebyshev distance of a focus point are Nearby
    pub nearby_radius: i32,
    /// Chunks within this distance are Background, everything else Inactive
    pub background_radius: i32,
    /// Whole-second ticks a chunk may stay Inactive before it is saved and dropped
    pub evict_after_ticks: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            clock_24h: false,
            autosave_interval_secs: 300,
            nearby_radius: 2,
            background_radius: 6,
            evict_after_ticks: 30,
        }
    }
}

impl Settings {
    /// Load settings, falling back to defaults when the file is missing or invalid
    pub fn load(path: &Path) -> Self {
        if !path.exists() {
            log::info!("No settings at {:?}, using defaults", path);
            return Self::default();
        }

        match std::fs::read_to_string(path) {
            Ok(contents) => match ron::from_str(&contents) {
                Ok(settings) => {
                    log::info!("Loaded settings from {:?}", path);
                    settings
                }
                Err(e) => {
                    log::warn!("Failed to parse settings: {}, using defaults", e);
                    Self::default()
                }
            },
            Err(e) => {
                log::warn!("Failed to read settings: {}, using defaults", e);
                Self::default()
            }
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let serialized = ron::ser::to_string_pretty(self, Default::default())
            .context("Failed to serialize settings")?;
        std::fs::write(path, serialized).context("Failed to write settings file")?;
        Ok(())
    }
}
