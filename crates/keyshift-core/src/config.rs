#![forbid(unsafe_code)]

//! Tunable constants for the compensation engine.
//!
//! Every threshold the engine uses lives in [`EngineConfig`]. The defaults
//! were tuned against iOS Safari keyboard animations and are a starting point,
//! not a contract: hosts can override any subset from JSON.
//!
//! ```
//! use keyshift_core::EngineConfig;
//!
//! let config = EngineConfig::from_json_str(r#"{ "focus_grace_ms": 2500 }"#).unwrap();
//! assert_eq!(config.focus_grace_ms, 2500);
//! assert_eq!(config.keyboard_visible_min_px, 80.0);
//! ```

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigViolation};

/// Engine configuration. Missing JSON fields fall back to [`Default`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Effective keyboard height that must be exceeded before the keyboard
    /// counts as visible.
    pub keyboard_visible_min_px: f64,

    /// How long `Visible` is held after the last qualifying sample (ms).
    pub focus_grace_ms: u64,

    /// Window after a keyboard show during which overlay spikes are replaced
    /// by the stable baseline (ms).
    pub spike_window_ms: u64,

    /// How far above the stable baseline a reading must be to count as a spike.
    pub spike_margin_px: f64,

    /// Maximum drift for a candidate overlay to still count as settled.
    pub stable_epsilon_px: f64,

    /// How long a candidate must stay settled before it becomes the baseline (ms).
    pub stable_dwell_ms: u64,

    /// Per-frame increase cap while the published offset is below
    /// [`ramp_fast_until_px`](Self::ramp_fast_until_px).
    pub ramp_fast_step_px: f64,

    /// Per-frame increase cap once the published offset reached
    /// [`ramp_fast_until_px`](Self::ramp_fast_until_px).
    pub ramp_slow_step_px: f64,

    /// Published offset at which the ramp switches from fast to slow.
    pub ramp_fast_until_px: f64,

    /// Layout height change (relative to the hidden baseline) treated as an
    /// orientation change.
    pub orientation_change_px: f64,

    /// Burst length after a focus, touch-start, or pointer-down trigger (ms).
    pub focus_burst_ms: u64,

    /// Burst length after a blur (ms).
    pub blur_burst_ms: u64,

    /// How long a pre-focus touch keeps hover suppressed while waiting for
    /// the focus event (ms).
    pub pre_focus_hover_hold_ms: u64,

    /// Deadband for the inline input-bar correction.
    pub input_override_tolerance_px: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            keyboard_visible_min_px: 80.0,
            focus_grace_ms: 4000,
            spike_window_ms: 900,
            spike_margin_px: 120.0,
            stable_epsilon_px: 2.0,
            stable_dwell_ms: 140,
            ramp_fast_step_px: 160.0,
            ramp_slow_step_px: 48.0,
            ramp_fast_until_px: 80.0,
            orientation_change_px: 120.0,
            focus_burst_ms: 1800,
            blur_burst_ms: 1800,
            pre_focus_hover_hold_ms: 600,
            input_override_tolerance_px: 1.0,
        }
    }
}

impl EngineConfig {
    /// Parse from JSON and validate.
    pub fn from_json_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(s)?;
        config.validate().map_err(ConfigError::Invalid)?;
        Ok(config)
    }

    /// Check every value is usable. Returns all violations, not just the first.
    pub fn validate(&self) -> Result<(), Vec<ConfigViolation>> {
        let mut errors = Vec::new();

        positive_px("keyboard_visible_min_px", self.keyboard_visible_min_px, &mut errors);
        positive_px("spike_margin_px", self.spike_margin_px, &mut errors);
        positive_px("ramp_fast_step_px", self.ramp_fast_step_px, &mut errors);
        positive_px("ramp_slow_step_px", self.ramp_slow_step_px, &mut errors);
        positive_px("orientation_change_px", self.orientation_change_px, &mut errors);
        non_negative_px("stable_epsilon_px", self.stable_epsilon_px, &mut errors);
        non_negative_px("ramp_fast_until_px", self.ramp_fast_until_px, &mut errors);
        non_negative_px(
            "input_override_tolerance_px",
            self.input_override_tolerance_px,
            &mut errors,
        );

        if self.stable_dwell_ms == 0 {
            errors.push(ConfigViolation::new("stable_dwell_ms", 0, "must be > 0"));
        }
        if self.focus_burst_ms == 0 {
            errors.push(ConfigViolation::new("focus_burst_ms", 0, "must be > 0"));
        }
        if self.blur_burst_ms == 0 {
            errors.push(ConfigViolation::new("blur_burst_ms", 0, "must be > 0"));
        }
        if self.ramp_slow_step_px > self.ramp_fast_step_px {
            errors.push(ConfigViolation::new(
                "ramp_slow_step_px",
                self.ramp_slow_step_px,
                "must not exceed ramp_fast_step_px",
            ));
        }

        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }
}

fn positive_px(field: &'static str, value: f64, errors: &mut Vec<ConfigViolation>) {
    if !value.is_finite() || value <= 0.0 {
        errors.push(ConfigViolation::new(field, value, "must be > 0"));
    }
}

fn non_negative_px(field: &'static str, value: f64, errors: &mut Vec<ConfigViolation>) {
    if !value.is_finite() || value < 0.0 {
        errors.push(ConfigViolation::new(field, value, "must be >= 0"));
    }
}
