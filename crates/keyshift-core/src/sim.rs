#![forbid(unsafe_code)]

//! In-memory host for deterministic replays and tests.
//!
//! [`ScriptedSource`] reports whatever viewport and focus state the caller
//! last set; [`RecordingSink`] keeps every frame it was handed and can be told
//! to reject writes, which stands in for a host that throws on a style write.

use crate::error::PublishError;
use crate::publisher::{InputOverride, LayoutFrame, LayoutSink};
use crate::sample::{FocusSnapshot, ViewportSample};
use crate::source::{ChatMetrics, ViewportSource};

/// Scripted viewport source.
#[derive(Debug, Clone)]
pub struct ScriptedSource {
    pub layout_height_px: f64,
    /// `None` models a host without `window.visualViewport`.
    pub visual: Option<(f64, f64)>,
    pub focus: FocusSnapshot,
    pub touch_primary: bool,
    /// Bottom of the input bar before any inline override is applied.
    pub natural_bar_bottom_px: Option<f64>,
    /// Lift the stylesheet actually applies to the bar. `None` models a host
    /// where the stylesheet path is broken.
    pub stylesheet_lift_px: Option<f64>,
    /// Lift applied by the inline override, mirrored back by the test.
    pub inline_lift_px: f64,
    pub chat: Option<ChatMetrics>,
    /// When set, the chat list is sized `base - --keyboard-height` by the
    /// stylesheet and [`apply_frame`](Self::apply_frame) resizes it.
    pub chat_reflow_base_px: Option<f64>,
}

impl ScriptedSource {
    /// Portrait phone, keyboard hidden, nothing focused.
    #[must_use]
    pub fn new(layout_height_px: f64) -> Self {
        Self {
            layout_height_px,
            visual: Some((layout_height_px, 0.0)),
            focus: FocusSnapshot::NONE,
            touch_primary: true,
            natural_bar_bottom_px: None,
            stylesheet_lift_px: Some(0.0),
            inline_lift_px: 0.0,
            chat: None,
            chat_reflow_base_px: None,
        }
    }

    /// Host without visual-viewport support.
    #[must_use]
    pub fn without_visual_viewport(mut self) -> Self {
        self.visual = None;
        self
    }

    pub fn set_visual(&mut self, height_px: f64, offset_top_px: f64) {
        self.visual = Some((height_px, offset_top_px));
    }

    /// Mirror what a real page would render after the frame was applied.
    pub fn apply_frame(&mut self, frame: &LayoutFrame) {
        if let Some(lift) = self.stylesheet_lift_px.as_mut() {
            *lift = frame.keyboard_offset_px;
        }
        self.inline_lift_px = match frame.input_override {
            InputOverride::Clear => 0.0,
            InputOverride::Lift { px } => px,
        };
        let Some(chat) = self.chat.as_mut() else {
            return;
        };
        if let Some(top) = frame.chat_scroll_top_px {
            chat.scroll_top_px = top;
        }
        if let Some(base) = self.chat_reflow_base_px {
            chat.client_height_px = (base - frame.keyboard_height_px).max(0.0);
        }
    }
}

impl ViewportSource for ScriptedSource {
    fn sample(&self, now_ms: f64) -> ViewportSample {
        match self.visual {
            Some((height, offset)) => {
                ViewportSample::new(self.layout_height_px, height, offset, now_ms)
            }
            None => ViewportSample::layout_only(self.layout_height_px, now_ms),
        }
    }

    fn focus(&self) -> FocusSnapshot {
        self.focus
    }

    fn is_touch_primary(&self) -> bool {
        self.touch_primary
    }

    fn input_bar_bottom_px(&self) -> Option<f64> {
        let natural = self.natural_bar_bottom_px?;
        let css = self.stylesheet_lift_px.unwrap_or(0.0);
        Some(natural - css - self.inline_lift_px)
    }

    fn chat_metrics(&self) -> Option<ChatMetrics> {
        self.chat
    }
}

/// Sink that records frames.
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    frames: Vec<LayoutFrame>,
    reject_remaining: usize,
    rejected: usize,
}

impl RecordingSink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject the next `n` writes.
    pub fn fail_next(&mut self, n: usize) {
        self.reject_remaining = n;
    }

    #[must_use]
    pub fn frames(&self) -> &[LayoutFrame] {
        &self.frames
    }

    #[must_use]
    pub fn last(&self) -> Option<&LayoutFrame> {
        self.frames.last()
    }

    #[must_use]
    pub fn rejected(&self) -> usize {
        self.rejected
    }

    pub fn clear(&mut self) {
        self.frames.clear();
    }
}

impl LayoutSink for RecordingSink {
    fn write(&mut self, frame: &LayoutFrame) -> Result<(), PublishError> {
        if self.reject_remaining > 0 {
            self.reject_remaining -= 1;
            self.rejected += 1;
            return Err(PublishError::rejected(
                "--keyboard-offset",
                "scripted rejection",
            ));
        }
        self.frames.push(frame.clone());
        Ok(())
    }
}
