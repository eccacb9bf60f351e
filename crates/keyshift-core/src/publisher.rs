#![forbid(unsafe_code)]

//! The single writer of the styling surface.
//!
//! Each tick produces one [`LayoutFrame`] holding every value the stylesheet
//! consumes. [`Publisher`] hands the whole frame to a [`LayoutSink`]; sinks
//! overwrite every managed property on every write, so a value from an
//! earlier frame can never linger.
//!
//! # Inline fallback
//!
//! Some host states (a transformed or composited ancestor, a stuck hover
//! transform) make the stylesheet's `--keyboard-offset` rule silently fail to
//! move the input bar. [`InputOverrideController`] watches where the bar
//! actually rendered and applies a corrective inline lift:
//!
//! ```text
//! expected_bottom = visual_bottom + (filtered_overlay - published_offset)
//! error           = bar_bottom - expected_bottom
//! lift'           = clamp(lift + error, 0, published_offset)
//! ```
//!
//! `filtered_overlay - published_offset` is the lag the smoother is
//! deliberately holding, so a working stylesheet yields `error == 0` and the
//! override stays cleared; a failing one converges to the smoothed offset in
//! one step per frame.

use tracing::debug;

use crate::error::PublishError;

/// Named numeric layout parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LayoutParam {
    /// Space to reserve so chat content is not hidden under the keyboard.
    KeyboardHeight,
    /// Smoothed lift applied to the input bar.
    KeyboardOffset,
    /// Compensation for a layout viewport that genuinely shrank.
    ChatTopMargin,
    /// Usable viewport height for `100vh`-style layout.
    AppHeight,
    /// One hundredth of the layout height.
    ViewportUnit,
    VisualHeight,
    VisualOffsetTop,
}

impl LayoutParam {
    pub const ALL: [Self; 7] = [
        Self::KeyboardHeight,
        Self::KeyboardOffset,
        Self::ChatTopMargin,
        Self::AppHeight,
        Self::ViewportUnit,
        Self::VisualHeight,
        Self::VisualOffsetTop,
    ];

    /// CSS custom property name.
    #[must_use]
    pub const fn css_property(self) -> &'static str {
        match self {
            Self::KeyboardHeight => "--keyboard-height",
            Self::KeyboardOffset => "--keyboard-offset",
            Self::ChatTopMargin => "--chat-top-margin",
            Self::AppHeight => "--app-height",
            Self::ViewportUnit => "--vh",
            Self::VisualHeight => "--vv-height",
            Self::VisualOffsetTop => "--vv-offset-top",
        }
    }
}

/// Direct positional override on the input bar.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum InputOverride {
    /// Remove every inline property the override manages.
    #[default]
    Clear,
    /// Translate the bar up by `px`.
    Lift { px: f64 },
}

/// Complete set of outbound values for one tick.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct LayoutFrame {
    pub keyboard_height_px: f64,
    pub keyboard_offset_px: f64,
    pub chat_top_margin_px: f64,
    pub app_height_px: f64,
    pub viewport_unit_px: f64,
    pub visual_height_px: f64,
    pub visual_offset_top_px: f64,
    pub keyboard_visible: bool,
    pub hover_suppressed: bool,
    pub input_override: InputOverride,
    /// Scroll position to restore on the chat list; `None` leaves it alone.
    pub chat_scroll_top_px: Option<f64>,
}

impl LayoutFrame {
    /// Value of a numeric parameter.
    #[must_use]
    pub fn param(&self, param: LayoutParam) -> f64 {
        match param {
            LayoutParam::KeyboardHeight => self.keyboard_height_px,
            LayoutParam::KeyboardOffset => self.keyboard_offset_px,
            LayoutParam::ChatTopMargin => self.chat_top_margin_px,
            LayoutParam::AppHeight => self.app_height_px,
            LayoutParam::ViewportUnit => self.viewport_unit_px,
            LayoutParam::VisualHeight => self.visual_height_px,
            LayoutParam::VisualOffsetTop => self.visual_offset_top_px,
        }
    }

    /// Iterate `(param, value)` for every numeric parameter.
    pub fn params(&self) -> impl Iterator<Item = (LayoutParam, f64)> + '_ {
        LayoutParam::ALL.into_iter().map(|p| (p, self.param(p)))
    }

    /// Whether moving from `previous` to `self` changes element sizes or the
    /// bar position, so the chat list must be measured again.
    #[must_use]
    pub fn reflows_from(&self, previous: &LayoutFrame) -> bool {
        self.keyboard_height_px != previous.keyboard_height_px
            || self.keyboard_offset_px != previous.keyboard_offset_px
            || self.chat_top_margin_px != previous.chat_top_margin_px
            || self.app_height_px != previous.app_height_px
            || self.input_override != previous.input_override
    }

    /// Frame with every keyboard-related value at rest.
    #[must_use]
    pub fn at_rest(layout_height_px: f64, visual_height_px: f64, visual_offset_top_px: f64) -> Self {
        Self {
            app_height_px: layout_height_px.round(),
            viewport_unit_px: layout_height_px * 0.01,
            visual_height_px: visual_height_px.round(),
            visual_offset_top_px: visual_offset_top_px.round(),
            ..Self::default()
        }
    }
}

/// Destination of layout frames.
pub trait LayoutSink {
    /// Overwrite every managed property with the frame's values.
    fn write(&mut self, frame: &LayoutFrame) -> Result<(), PublishError>;
}

impl<K: LayoutSink + ?Sized> LayoutSink for Box<K> {
    fn write(&mut self, frame: &LayoutFrame) -> Result<(), PublishError> {
        (**self).write(frame)
    }
}

/// Inputs to one override decision.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OverrideInputs {
    /// Focus is inside the input bar, the keyboard is visible, and the visual
    /// viewport reports an overlay.
    pub engaged: bool,
    pub bar_bottom_px: Option<f64>,
    pub visual_bottom_px: f64,
    pub filtered_overlay_px: f64,
    pub published_offset_px: f64,
}

/// One-step error-feedback controller for the inline input-bar lift.
#[derive(Debug, Clone, Default)]
pub struct InputOverrideController {
    lift_px: f64,
}

impl InputOverrideController {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next(&mut self, inputs: OverrideInputs, tolerance_px: f64) -> InputOverride {
        let (true, Some(bar_bottom)) = (inputs.engaged, inputs.bar_bottom_px) else {
            self.lift_px = 0.0;
            return InputOverride::Clear;
        };

        let max_lift = inputs.published_offset_px.max(0.0);
        let smoothing_lag = (inputs.filtered_overlay_px - inputs.published_offset_px).max(0.0);
        let expected_bottom = inputs.visual_bottom_px + smoothing_lag;
        let error = bar_bottom - expected_bottom;

        let lift = if error.is_finite() && error.abs() > tolerance_px {
            self.lift_px + error
        } else {
            self.lift_px
        };
        self.lift_px = lift.clamp(0.0, max_lift).round();

        if self.lift_px > 0.0 {
            InputOverride::Lift { px: self.lift_px }
        } else {
            InputOverride::Clear
        }
    }

    #[inline]
    #[must_use]
    pub fn lift_px(&self) -> f64 {
        self.lift_px
    }

    pub fn reset(&mut self) {
        self.lift_px = 0.0;
    }
}

/// Owns the sink and the last frame written.
#[derive(Debug)]
pub struct Publisher<K> {
    sink: K,
    last_frame: Option<LayoutFrame>,
    last_applied: bool,
    /// Diagnostic: writes the sink rejected.
    failed_writes: u64,
}

impl<K: LayoutSink> Publisher<K> {
    #[must_use]
    pub fn new(sink: K) -> Self {
        Self {
            sink,
            last_frame: None,
            last_applied: false,
            failed_writes: 0,
        }
    }

    /// Write a frame. Returns whether the sink accepted it.
    ///
    /// A rejected write is logged and otherwise ignored; the next frame
    /// overwrites everything again.
    pub fn publish(&mut self, frame: LayoutFrame) -> bool {
        let applied = match self.sink.write(&frame) {
            Ok(()) => true,
            Err(err) => {
                self.failed_writes += 1;
                debug!(error = %err, failed_writes = self.failed_writes, "layout frame not applied");
                false
            }
        };
        self.last_frame = Some(frame);
        self.last_applied = applied;
        applied
    }

    /// Rewrite the last frame with a different hover flag.
    ///
    /// Used when hover suppression must change between frames. Returns
    /// `false` when nothing has been published yet or the write failed.
    pub fn republish_hover(&mut self, hover_suppressed: bool) -> bool {
        let Some(mut frame) = self.last_frame.clone() else {
            return false;
        };
        frame.hover_suppressed = hover_suppressed;
        // Scroll restoration already happened with the original frame.
        frame.chat_scroll_top_px = None;
        self.publish(frame)
    }

    #[inline]
    #[must_use]
    pub fn last_frame(&self) -> Option<&LayoutFrame> {
        self.last_frame.as_ref()
    }

    /// The sink accepted the most recent write.
    #[inline]
    #[must_use]
    pub fn last_write_applied(&self) -> bool {
        self.last_applied
    }

    #[inline]
    #[must_use]
    pub fn failed_writes(&self) -> u64 {
        self.failed_writes
    }

    #[inline]
    #[must_use]
    pub fn sink(&self) -> &K {
        &self.sink
    }

    #[inline]
    pub fn sink_mut(&mut self) -> &mut K {
        &mut self.sink
    }
}
