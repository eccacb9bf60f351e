#![forbid(unsafe_code)]

//! Per-frame viewport and focus readings.

/// One reading of the layout and visual viewports.
///
/// Samples are read fresh on every tick and dropped afterwards; the engine
/// never replays an old one.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewportSample {
    pub layout_height_px: f64,
    pub visual_height_px: f64,
    pub visual_offset_top_px: f64,
    pub timestamp_ms: f64,
}

impl ViewportSample {
    /// Build a sample, replacing non-finite or negative readings with `0`.
    #[must_use]
    pub fn new(
        layout_height_px: f64,
        visual_height_px: f64,
        visual_offset_top_px: f64,
        timestamp_ms: f64,
    ) -> Self {
        Self {
            layout_height_px: sanitize(layout_height_px),
            visual_height_px: sanitize(visual_height_px),
            visual_offset_top_px: sanitize(visual_offset_top_px),
            timestamp_ms: if timestamp_ms.is_finite() {
                timestamp_ms
            } else {
                0.0
            },
        }
    }

    /// Sample for a host without visual-viewport support: the visual viewport
    /// is taken to be the layout viewport, so the overlay is always `0`.
    #[must_use]
    pub fn layout_only(layout_height_px: f64, timestamp_ms: f64) -> Self {
        Self::new(layout_height_px, layout_height_px, 0.0, timestamp_ms)
    }

    /// Bottom edge of the visual viewport in layout coordinates.
    #[inline]
    #[must_use]
    pub fn visual_bottom_px(&self) -> f64 {
        self.visual_height_px + self.visual_offset_top_px
    }

    /// Gap between the layout and visual viewport bottoms. Never negative.
    #[inline]
    #[must_use]
    pub fn raw_overlay_px(&self) -> f64 {
        (self.layout_height_px - self.visual_bottom_px()).max(0.0)
    }
}

#[inline]
fn sanitize(px: f64) -> f64 {
    if px.is_finite() { px.max(0.0) } else { 0.0 }
}

/// What currently holds input focus, as far as the engine cares.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FocusSnapshot {
    /// Focused element accepts text entry (input, textarea, contenteditable).
    pub text_like: bool,
    /// Focused element is the chat's message input.
    pub designated_input: bool,
    /// Focused element sits inside the input bar container.
    pub within_input_container: bool,
}

impl FocusSnapshot {
    /// Nothing text-like is focused.
    pub const NONE: Self = Self {
        text_like: false,
        designated_input: false,
        within_input_container: false,
    };

    /// The designated message input is focused.
    pub const MESSAGE_INPUT: Self = Self {
        text_like: true,
        designated_input: true,
        within_input_container: true,
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overlay_is_gap_below_visual_viewport() {
        let s = ViewportSample::new(800.0, 460.0, 40.0, 0.0);
        assert_eq!(s.visual_bottom_px(), 500.0);
        assert_eq!(s.raw_overlay_px(), 300.0);
    }

    #[test]
    fn overlay_never_negative() {
        // Visual viewport scrolled past the layout bottom (rubber-band overscroll).
        let s = ViewportSample::new(800.0, 800.0, 60.0, 0.0);
        assert_eq!(s.raw_overlay_px(), 0.0);
    }

    #[test]
    fn garbage_readings_are_sanitized() {
        let s = ViewportSample::new(f64::NAN, -20.0, f64::INFINITY, f64::NAN);
        assert_eq!(s.layout_height_px, 0.0);
        assert_eq!(s.visual_height_px, 0.0);
        assert_eq!(s.visual_offset_top_px, 0.0);
        assert_eq!(s.timestamp_ms, 0.0);
        assert_eq!(s.raw_overlay_px(), 0.0);
    }

    #[test]
    fn layout_only_sample_has_no_overlay() {
        let s = ViewportSample::layout_only(640.0, 12.0);
        assert_eq!(s.raw_overlay_px(), 0.0);
        assert_eq!(s.visual_height_px, 640.0);
    }
}
