#![forbid(unsafe_code)]

//! Keyboard visibility state machine.
//!
//! ```text
//!            effective > min && text focus
//!   Hidden ───────────────────────────────▶ Visible
//!     ▲                                         │
//!     └──────── now >= visible_until ◀──────────┘
//! ```
//!
//! Every *qualifying* sample (text-like focus and an effective keyboard
//! height above the threshold) pushes `visible_until` to `now + grace`. The
//! grace window absorbs the focus blips a keyboard dismissal animation
//! produces, so `Visible` survives a brief focus loss.
//!
//! The effective keyboard height is the larger of the visual overlay and the
//! amount the layout viewport itself shrank relative to the baseline recorded
//! while the keyboard was hidden.

use tracing::debug;

use crate::config::EngineConfig;
use crate::sample::ViewportSample;

/// Keyboard phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KeyboardPhase {
    #[default]
    Hidden,
    Visible,
}

/// Phase change produced by a sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyboardTransition {
    Shown,
    Hidden,
}

/// Measurements derived from one sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KeyboardReading {
    pub raw_overlay_px: f64,
    pub layout_shrink_px: f64,
    /// `max(layout_shrink, raw_overlay)`, clamped to the layout height.
    pub effective_px: f64,
    pub visible: bool,
    pub transition: Option<KeyboardTransition>,
    /// The layout height jumped while hidden, so any overlay baseline learned
    /// for the old orientation is stale.
    pub baseline_reset: bool,
}

/// Tracks whether the on-screen keyboard is up.
#[derive(Debug, Clone)]
pub struct KeyboardStateMachine {
    phase: KeyboardPhase,
    baseline_layout_height_px: Option<f64>,
    show_start_ms: Option<f64>,
    visible_until_ms: f64,
    last_raw_overlay_px: f64,
}

impl Default for KeyboardStateMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyboardStateMachine {
    #[must_use]
    pub fn new() -> Self {
        Self {
            phase: KeyboardPhase::Hidden,
            baseline_layout_height_px: None,
            show_start_ms: None,
            visible_until_ms: 0.0,
            last_raw_overlay_px: 0.0,
        }
    }

    /// Record the layout height the keyboard-hidden page has.
    pub fn set_baseline(&mut self, layout_height_px: f64) {
        self.baseline_layout_height_px = Some(layout_height_px);
    }

    /// Evaluate one sample.
    pub fn observe(
        &mut self,
        sample: &ViewportSample,
        focus_text_like: bool,
        config: &EngineConfig,
    ) -> KeyboardReading {
        let now = sample.timestamp_ms;
        let layout = sample.layout_height_px;
        let baseline = *self.baseline_layout_height_px.get_or_insert(layout);

        let raw_overlay_px = sample.raw_overlay_px();
        let layout_shrink_px = (baseline - layout).max(0.0);
        let effective_px = layout_shrink_px.max(raw_overlay_px).min(layout);
        self.last_raw_overlay_px = raw_overlay_px;

        let qualifying = focus_text_like && effective_px > config.keyboard_visible_min_px;
        if qualifying {
            self.visible_until_ms = self
                .visible_until_ms
                .max(now + config.focus_grace_ms as f64);
        }

        let transition = match self.phase {
            KeyboardPhase::Hidden if qualifying => {
                self.phase = KeyboardPhase::Visible;
                self.show_start_ms = Some(now);
                debug!(
                    effective_px,
                    raw_overlay_px, layout_shrink_px, "keyboard shown"
                );
                Some(KeyboardTransition::Shown)
            }
            KeyboardPhase::Visible if !qualifying && now >= self.visible_until_ms => {
                self.phase = KeyboardPhase::Hidden;
                self.visible_until_ms = 0.0;
                debug!(effective_px, focus_text_like, "keyboard hidden");
                Some(KeyboardTransition::Hidden)
            }
            _ => None,
        };

        let mut baseline_reset = false;
        if self.phase == KeyboardPhase::Hidden {
            if (layout - baseline).abs() > config.orientation_change_px {
                debug!(
                    from = baseline,
                    to = layout,
                    "layout height jumped while hidden; dropping overlay baseline"
                );
                baseline_reset = true;
            }
            self.baseline_layout_height_px = Some(layout);
        }

        KeyboardReading {
            raw_overlay_px,
            layout_shrink_px,
            effective_px,
            visible: self.phase == KeyboardPhase::Visible,
            transition,
            baseline_reset,
        }
    }

    #[inline]
    #[must_use]
    pub fn phase(&self) -> KeyboardPhase {
        self.phase
    }

    #[inline]
    #[must_use]
    pub fn is_visible(&self) -> bool {
        self.phase == KeyboardPhase::Visible
    }

    /// When the current (or last) show started.
    #[inline]
    #[must_use]
    pub fn show_start_ms(&self) -> Option<f64> {
        self.show_start_ms
    }

    /// End of the grace window; `0` while hidden.
    #[inline]
    #[must_use]
    pub fn visible_until_ms(&self) -> f64 {
        self.visible_until_ms
    }

    #[inline]
    #[must_use]
    pub fn baseline_layout_height_px(&self) -> Option<f64> {
        self.baseline_layout_height_px
    }

    #[inline]
    #[must_use]
    pub fn last_raw_overlay_px(&self) -> f64 {
        self.last_raw_overlay_px
    }
}
