//! Tunables for motion, probes, collision and camera follow.
//!
//! Every field has a default, so hosts may pass partial JSON such as
//! `{"move_speed": 8.0}`.

use serde::Deserialize;

use crate::error::EngineError;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Lateral speed in units per second.
    pub move_speed: f32,
    /// Vertical speed in units per second.
    pub vertical_speed: f32,
    /// Eye-height floor; the viewpoint never sinks below it.
    pub min_height: f32,
    pub mouse_sensitivity: f32,
    /// Distance a probe covers per tick.
    pub probe_speed: f32,
    pub probe_max_range: f32,
    /// Seconds before a probe's deadline timer retires it.
    pub probe_lifetime: f32,
    pub hit_radius: f32,
    /// How far in front of a selected item the camera settles.
    pub follow_distance: f32,
    /// Exponential smoothing rate (1/s) for camera follow.
    pub follow_smoothing: f32,
    pub grid_columns: usize,
    pub grid_spacing: f32,
    /// Record field holding the item id.
    pub id_field: String,
    pub bindings: KeyBindings,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            move_speed: 5.0,
            vertical_speed: 5.0,
            min_height: 1.6,
            mouse_sensitivity: 0.002,
            probe_speed: 0.5,
            probe_max_range: 100.0,
            probe_lifetime: 5.0,
            hit_radius: 1.0,
            follow_distance: 4.0,
            follow_smoothing: 6.0,
            grid_columns: 10,
            grid_spacing: 2.5,
            id_field: "id".to_string(),
            bindings: KeyBindings::default(),
        }
    }
}

impl EngineConfig {
    pub fn from_json(json: &str) -> Result<Self, EngineError> {
        if json.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_json::from_str(json).map_err(EngineError::Config)
    }
}

/// Key mapping configuration
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct KeyBindings {
    pub forward: Vec<String>,
    pub back: Vec<String>,
    pub left: Vec<String>,
    pub right: Vec<String>,
    pub up: Vec<String>,
    pub down: Vec<String>,
    pub escape: String,
}

impl Default for KeyBindings {
    fn default() -> Self {
        let keys = |ks: &[&str]| ks.iter().map(|k| k.to_string()).collect();
        Self {
            forward: keys(&["w", "ArrowUp"]),
            back: keys(&["s", "ArrowDown"]),
            left: keys(&["a", "ArrowLeft"]),
            right: keys(&["d", "ArrowRight"]),
            up: keys(&[" "]),
            down: keys(&["Shift"]),
            escape: "Escape".to_string(),
        }
    }
}
