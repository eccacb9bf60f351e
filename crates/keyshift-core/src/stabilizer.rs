#![forbid(unsafe_code)]

//! Overlay spike filter and stable-baseline tracker.
//!
//! iOS Safari sometimes reports a visual viewport that is far too short for a
//! frame or two right after the keyboard is re-shown. Applying that reading
//! lifts the input bar well above the keyboard and then drops it back, which
//! reads as a bounce.
//!
//! # Algorithm
//!
//! - **Spike filter**: during the first `spike_window_ms` after a show, a raw
//!   overlay above `stable + spike_margin_px` is replaced by `stable`. Without
//!   a baseline (first show of the session) readings pass through untouched.
//! - **Stabilizer**: a candidate value is tracked together with the time it
//!   was first seen. Readings within `stable_epsilon_px` of the candidate keep
//!   it alive; once it has lived for `stable_dwell_ms` the latest reading
//!   becomes the new baseline. Any other reading restarts the candidate.
//!
//! # Invariants
//!
//! 1. The baseline only changes after a settled dwell; one outlier never moves it.
//! 2. A reading flagged as a spike never becomes the baseline.
//! 3. Readings at or below the visibility threshold are ignored, so a
//!    dismissal animation cannot teach the baseline `0`.

use tracing::{debug, trace};

use crate::config::EngineConfig;

/// Overlay value for one tick after spike filtering.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FilteredOverlay {
    pub value_px: f64,
    /// The raw reading was replaced by the stable baseline.
    pub spike: bool,
}

/// A value being evaluated for promotion to the baseline.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Candidate {
    pub value_px: f64,
    pub since_ms: f64,
}

/// Rolling stable-overlay baseline with spike rejection.
#[derive(Debug, Clone, Default)]
pub struct OverlayStabilizer {
    stable_px: Option<f64>,
    candidate: Option<Candidate>,
    /// Diagnostic: readings replaced as spikes.
    spikes: u64,
    /// Diagnostic: baseline promotions.
    promotions: u64,
}

impl OverlayStabilizer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply the spike filter to a raw overlay reading.
    pub fn filter(
        &mut self,
        raw_overlay_px: f64,
        now_ms: f64,
        show_start_ms: Option<f64>,
        config: &EngineConfig,
    ) -> FilteredOverlay {
        let in_window = show_start_ms
            .is_some_and(|start| now_ms - start < config.spike_window_ms as f64);

        if let Some(stable) = self.stable_px
            && in_window
            && raw_overlay_px > stable + config.spike_margin_px
        {
            self.spikes += 1;
            debug!(raw_overlay_px, stable, "overlay spike replaced by baseline");
            return FilteredOverlay {
                value_px: stable,
                spike: true,
            };
        }

        FilteredOverlay {
            value_px: raw_overlay_px,
            spike: false,
        }
    }

    /// Feed the filtered overlay into candidate tracking.
    pub fn observe(&mut self, overlay: FilteredOverlay, now_ms: f64, config: &EngineConfig) {
        if overlay.value_px <= config.keyboard_visible_min_px {
            self.candidate = None;
            return;
        }

        match self.candidate {
            Some(cand) if (overlay.value_px - cand.value_px).abs() <= config.stable_epsilon_px => {
                let settled = now_ms - cand.since_ms >= config.stable_dwell_ms as f64;
                if settled && !overlay.spike && self.stable_px != Some(overlay.value_px) {
                    trace!(
                        from = ?self.stable_px,
                        to = overlay.value_px,
                        "overlay baseline promoted"
                    );
                    self.stable_px = Some(overlay.value_px);
                    self.promotions += 1;
                }
            }
            _ => {
                self.candidate = Some(Candidate {
                    value_px: overlay.value_px,
                    since_ms: now_ms,
                });
            }
        }
    }

    /// Forget the candidate but keep the baseline (a new show started).
    pub fn reset_candidate(&mut self) {
        self.candidate = None;
    }

    /// Forget everything (the baseline belongs to a previous orientation).
    pub fn discard_baseline(&mut self) {
        if self.stable_px.is_some() {
            debug!(stable = ?self.stable_px, "overlay baseline discarded");
        }
        self.stable_px = None;
        self.candidate = None;
    }

    #[inline]
    #[must_use]
    pub fn stable_px(&self) -> Option<f64> {
        self.stable_px
    }

    #[inline]
    #[must_use]
    pub fn candidate(&self) -> Option<Candidate> {
        self.candidate
    }

    #[inline]
    #[must_use]
    pub fn spike_count(&self) -> u64 {
        self.spikes
    }

    #[inline]
    #[must_use]
    pub fn promotion_count(&self) -> u64 {
        self.promotions
    }
}
