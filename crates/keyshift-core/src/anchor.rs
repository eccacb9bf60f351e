#![forbid(unsafe_code)]

//! Keeps the chat list's bottom edge in place across viewport changes.
//!
//! When the keyboard opens, the readable part of the chat list shrinks. The
//! browser keeps `scrollTop` fixed, so the newest messages slide under the
//! input bar. The anchor remembers the bottom edge of the readable region
//! (`scroll_top + visible_height`) and, when the readable height changes on a
//! tick that asked for it, scrolls so that edge stays where it was.

use crate::source::ChatMetrics;

#[derive(Debug, Clone, Default)]
pub struct ScrollAnchor {
    last_visible_height_px: Option<f64>,
    last_bottom_px: Option<f64>,
}

impl ScrollAnchor {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Observe current metrics and return the `scroll_top` to apply, if any.
    pub fn update(&mut self, metrics: Option<ChatMetrics>, preserve: bool) -> Option<f64> {
        let Some(m) = metrics else {
            self.last_visible_height_px = None;
            self.last_bottom_px = None;
            return None;
        };

        let visible = m.visible_height_px();
        let height_changed = self
            .last_visible_height_px
            .is_some_and(|prev| (prev - visible).abs() >= 1.0);

        let restore = match self.last_bottom_px {
            Some(bottom) if preserve && height_changed => {
                Some((bottom - visible).clamp(0.0, m.max_scroll_top_px()).round())
            }
            _ => None,
        };

        let scroll_top = restore.unwrap_or(m.scroll_top_px);
        self.last_visible_height_px = Some(visible);
        self.last_bottom_px = Some(scroll_top + visible);
        restore
    }
}
