#![forbid(unsafe_code)]

//! Sticky-hover suppression for touch devices.
//!
//! On touch-primary devices a tap leaves `:hover` stuck on whatever message
//! was last touched, and the hover lift (a transform) interferes with layout
//! while the keyboard animates. While the message input is focused the
//! suppression flag is raised so the stylesheet can disable hover effects.
//!
//! The flag is also raised a moment *before* focus: a touch on the input
//! latches it for `pre_focus_hover_hold_ms`, which covers the gap between
//! `touchstart` and `focusin` and avoids a one-frame hover flash.

use crate::config::EngineConfig;
use crate::sample::FocusSnapshot;

/// Hover-suppression state.
#[derive(Debug, Clone, Default)]
pub struct HoverSuppression {
    suppressed: bool,
    latch_until_ms: Option<f64>,
}

impl HoverSuppression {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A touch or focus on the designated input is under way.
    ///
    /// Returns `true` when the flag changed.
    pub fn engage(&mut self, touch_primary: bool, now_ms: f64, config: &EngineConfig) -> bool {
        if !touch_primary {
            return false;
        }
        self.latch_until_ms = Some(now_ms + config.pre_focus_hover_hold_ms as f64);
        self.set(true)
    }

    /// The designated input lost focus. Returns `true` when the flag changed.
    pub fn release(&mut self) -> bool {
        self.latch_until_ms = None;
        self.set(false)
    }

    /// Re-derive from the current focus. Returns the flag.
    pub fn sync(&mut self, focus: &FocusSnapshot, touch_primary: bool, now_ms: f64) -> bool {
        let latched = self.latch_until_ms.is_some_and(|until| now_ms < until);
        if !latched {
            self.latch_until_ms = None;
        }
        self.set(touch_primary && (focus.designated_input || latched));
        self.suppressed
    }

    #[inline]
    #[must_use]
    pub fn is_suppressed(&self) -> bool {
        self.suppressed
    }

    fn set(&mut self, value: bool) -> bool {
        let changed = self.suppressed != value;
        self.suppressed = value;
        changed
    }
}
