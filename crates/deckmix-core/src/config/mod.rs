//! Engine configuration
//!
//! Every tunable the engine reads lives here, stored as YAML. All fields
//! carry defaults so a partial (or missing) file still yields a working
//! configuration.
//!
//! ```ignore
//! use deckmix_core::config::{default_config_path, load_config, EngineConfig};
//!
//! let config: EngineConfig = load_config(&default_config_path());
//! ```

mod io;
mod paths;

pub use io::{load_config, save_config};
pub use paths::{default_config_path, CONFIG_DIR_NAME, CONFIG_FILE_NAME};

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Root configuration structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Per-deck signal and transport settings (shared by both decks)
    pub deck: DeckConfig,
    /// Automix timing
    pub automix: AutomixConfig,
    /// Master output level applied after the shared bus, [0, 1]
    pub master_volume: f32,
    /// Crossfader position at startup (0 = deck 1, 1 = deck 2)
    pub initial_crossfader: f32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            deck: DeckConfig::default(),
            automix: AutomixConfig::default(),
            master_volume: 0.8,
            initial_crossfader: 0.5,
        }
    }
}

/// Deck configuration section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeckConfig {
    /// EQ band range in dB either side of unity
    pub eq_range_db: f32,
    /// Filter cutoff when the effect is disengaged (inaudible)
    pub filter_open_hz: f32,
    /// Lowest reachable filter cutoff
    pub filter_closed_hz: f32,
    /// Filter resonance
    pub filter_q: f32,
    /// Length of the cue / hot cue preview when triggered while paused
    pub cue_preview_ms: u64,
    /// Number of hot cue slots, numbered from 1
    pub hot_cue_slots: u8,
    /// Lower bound of the tempo estimate
    pub tempo_min: f64,
    /// Upper bound of the tempo estimate
    pub tempo_max: f64,
    /// Pitch fader range in percent either side of zero
    pub pitch_range_percent: f64,
    /// Seconds moved per jog wheel unit
    pub jog_seconds_per_unit: f64,
    /// Volume fader value after construction
    pub default_volume: f32,
}

impl Default for DeckConfig {
    fn default() -> Self {
        Self {
            eq_range_db: 12.0,
            filter_open_hz: 22_000.0,
            filter_closed_hz: 20.0,
            filter_q: 1.0,
            cue_preview_ms: 500,
            hot_cue_slots: 4,
            tempo_min: 80.0,
            tempo_max: 180.0,
            pitch_range_percent: 100.0,
            jog_seconds_per_unit: 0.05,
            default_volume: 1.0,
        }
    }
}

impl DeckConfig {
    pub fn cue_preview(&self) -> Duration {
        Duration::from_millis(self.cue_preview_ms)
    }
}

/// Automix configuration section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AutomixConfig {
    /// Length of a crossfade transition in seconds
    pub crossfade_secs: f64,
    /// Interval between monitor ticks
    pub monitor_interval_ms: u64,
    /// Interval between crossfader UI steps during a transition
    pub ui_step_ms: u64,
    /// Extra lead time before the crossfade window opens
    ///
    /// A crossfade triggers once remaining time is at most
    /// `crossfade_secs + trigger_lead_secs`.
    pub trigger_lead_secs: f64,
    /// Remaining time below which no crossfade is started
    pub min_remaining_secs: f64,
    /// Distance from the end at which a stopped track counts as finished
    pub end_tolerance_secs: f64,
}

impl Default for AutomixConfig {
    fn default() -> Self {
        Self {
            crossfade_secs: 5.0,
            monitor_interval_ms: 2000,
            ui_step_ms: 100,
            trigger_lead_secs: 2.0,
            min_remaining_secs: 0.5,
            end_tolerance_secs: 0.1,
        }
    }
}

impl AutomixConfig {
    pub fn crossfade(&self) -> Duration {
        Duration::from_secs_f64(self.crossfade_secs.max(0.0))
    }

    pub fn monitor_interval(&self) -> Duration {
        Duration::from_millis(self.monitor_interval_ms)
    }

    pub fn ui_step(&self) -> Duration {
        Duration::from_millis(self.ui_step_ms)
    }

    /// Upper bound of the crossfade trigger window in seconds
    pub fn trigger_window_secs(&self) -> f64 {
        self.crossfade_secs + self.trigger_lead_secs
    }
}
