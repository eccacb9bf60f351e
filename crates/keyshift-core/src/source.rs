#![forbid(unsafe_code)]

//! Read-only view of the host environment.

use crate::sample::{FocusSnapshot, ViewportSample};

/// Scroll metrics of the chat list, used to keep its bottom edge anchored.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ChatMetrics {
    pub scroll_top_px: f64,
    pub client_height_px: f64,
    pub scroll_height_px: f64,
    /// How far the input bar currently overlaps the bottom of the chat list.
    pub input_overlap_px: f64,
}

impl ChatMetrics {
    /// Chat height that is actually readable above the input bar.
    #[must_use]
    pub fn visible_height_px(&self) -> f64 {
        (self.client_height_px - self.input_overlap_px.max(0.0)).max(0.0)
    }

    /// Largest valid `scroll_top` for the current content.
    #[must_use]
    pub fn max_scroll_top_px(&self) -> f64 {
        (self.scroll_height_px - self.client_height_px).max(0.0)
    }
}

/// Adapter over the host's viewport and focus state.
///
/// Implementations must not fail: a capability the host lacks is reported as
/// its neutral value (see [`ViewportSample::layout_only`]).
pub trait ViewportSource {
    /// Read both viewports. `now_ms` is stamped into the sample.
    fn sample(&self, now_ms: f64) -> ViewportSample;

    /// Describe the currently focused element.
    fn focus(&self) -> FocusSnapshot;

    /// Whether touch is the primary input (sticky-hover prone device).
    fn is_touch_primary(&self) -> bool;

    /// Convenience for [`FocusSnapshot::text_like`].
    fn is_focused_element_text_like(&self) -> bool {
        self.focus().text_like
    }

    /// Rendered bottom edge of the input bar in layout coordinates, if present.
    fn input_bar_bottom_px(&self) -> Option<f64> {
        None
    }

    /// Current chat list scroll metrics, if present.
    fn chat_metrics(&self) -> Option<ChatMetrics> {
        None
    }
}

impl<S: ViewportSource + ?Sized> ViewportSource for Box<S> {
    fn sample(&self, now_ms: f64) -> ViewportSample {
        (**self).sample(now_ms)
    }

    fn focus(&self) -> FocusSnapshot {
        (**self).focus()
    }

    fn is_touch_primary(&self) -> bool {
        (**self).is_touch_primary()
    }

    fn input_bar_bottom_px(&self) -> Option<f64> {
        (**self).input_bar_bottom_px()
    }

    fn chat_metrics(&self) -> Option<ChatMetrics> {
        (**self).chat_metrics()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn visible_height_subtracts_overlap() {
        let m = ChatMetrics {
            scroll_top_px: 0.0,
            client_height_px: 600.0,
            scroll_height_px: 2000.0,
            input_overlap_px: 72.0,
        };
        assert_eq!(m.visible_height_px(), 528.0);
        assert_eq!(m.max_scroll_top_px(), 1400.0);
    }

    #[test]
    fn short_content_has_no_scroll_range() {
        let m = ChatMetrics {
            client_height_px: 600.0,
            scroll_height_px: 300.0,
            ..Default::default()
        };
        assert_eq!(m.max_scroll_top_px(), 0.0);
    }
}
