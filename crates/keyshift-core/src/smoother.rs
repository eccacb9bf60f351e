#![forbid(unsafe_code)]

//! Asymmetric rate limiter for the published keyboard offset.
//!
//! Rising offsets are capped per frame: a fast step while the offset is still
//! small (the keyboard is appearing) and a slow step near the final position.
//! Falling offsets apply immediately so an input bar never hangs above a
//! keyboard that is already gone.

use crate::config::EngineConfig;

/// Holds the offset last handed to the publisher.
#[derive(Debug, Clone, Default)]
pub struct OffsetSmoother {
    published_offset_px: f64,
}

impl OffsetSmoother {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Move towards `target_px` by at most one step and return the new offset.
    ///
    /// The target is clamped to `[0, layout_height_px]` first, and the result
    /// always stays inside that range.
    pub fn advance(&mut self, target_px: f64, layout_height_px: f64, config: &EngineConfig) -> f64 {
        let ceiling = layout_height_px.max(0.0);
        let target = if target_px.is_finite() {
            target_px.clamp(0.0, ceiling)
        } else {
            0.0
        };
        let current = self.published_offset_px;

        self.published_offset_px = if target > current {
            let step = if current < config.ramp_fast_until_px {
                config.ramp_fast_step_px
            } else {
                config.ramp_slow_step_px
            };
            target.min(current + step)
        } else {
            target
        };
        self.published_offset_px
    }

    /// Drop to zero (keyboard hidden).
    pub fn reset(&mut self) -> f64 {
        self.published_offset_px = 0.0;
        0.0
    }

    #[inline]
    #[must_use]
    pub fn published_offset_px(&self) -> f64 {
        self.published_offset_px
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fast_then_slow_ramp() {
        let cfg = EngineConfig::default();
        let mut s = OffsetSmoother::new();
        let steps: Vec<f64> = (0..5).map(|_| s.advance(300.0, 800.0, &cfg)).collect();
        assert_eq!(steps, vec![160.0, 208.0, 256.0, 300.0, 300.0]);
    }

    #[test]
    fn fast_step_applies_only_below_threshold() {
        let cfg = EngineConfig::default();
        let mut s = OffsetSmoother::new();
        assert_eq!(s.advance(60.0, 800.0, &cfg), 60.0);
        // Still below 80, so the next rise may take the fast step.
        assert_eq!(s.advance(400.0, 800.0, &cfg), 220.0);
        assert_eq!(s.advance(400.0, 800.0, &cfg), 268.0);
    }

    #[test]
    fn decrease_is_immediate() {
        let cfg = EngineConfig::default();
        let mut s = OffsetSmoother::new();
        for _ in 0..10 {
            s.advance(300.0, 800.0, &cfg);
        }
        assert_eq!(s.advance(20.0, 800.0, &cfg), 20.0);
        assert_eq!(s.advance(0.0, 800.0, &cfg), 0.0);
    }

    #[test]
    fn target_clamped_to_layout() {
        let cfg = EngineConfig::default();
        let mut s = OffsetSmoother::new();
        for _ in 0..20 {
            s.advance(900.0, 400.0, &cfg);
        }
        assert_eq!(s.published_offset_px(), 400.0);
        // Layout shrank below the published offset: follow it down at once.
        assert_eq!(s.advance(900.0, 250.0, &cfg), 250.0);
        assert_eq!(s.advance(-5.0, 250.0, &cfg), 0.0);
        assert_eq!(s.advance(f64::NAN, 250.0, &cfg), 0.0);
    }

    #[test]
    fn reset_zeroes() {
        let cfg = EngineConfig::default();
        let mut s = OffsetSmoother::new();
        s.advance(100.0, 800.0, &cfg);
        assert_eq!(s.reset(), 0.0);
        assert_eq!(s.published_offset_px(), 0.0);
    }
}
