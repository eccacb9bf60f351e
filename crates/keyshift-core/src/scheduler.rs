#![forbid(unsafe_code)]

//! Animation-frame aligned update scheduling.
//!
//! Host events arrive far faster than the UI can usefully react (a keyboard
//! animation fires several `visualViewport` resize and scroll events per
//! frame). [`FrameScheduler`] turns that stream into at most one engine tick
//! per animation frame and, after a transition-causing event, keeps ticking
//! every frame for a bounded burst so the keyboard animation is tracked even
//! when the browser drops resize events.
//!
//! # Regimes
//!
//! - **Steady**: ticks only when an event asked for one.
//! - **Burst**: ticks on every frame until the burst deadline passes.
//!
//! # Invariants
//!
//! - **Latest-wins**: requests between two frames collapse into one tick; the
//!   tick reads a fresh sample, nothing is queued or replayed.
//! - **Extend-only**: a new burst request moves the deadline to
//!   `max(current, now + duration)`; it never shortens a running burst.
//! - **Bounded**: once `now >= deadline` the scheduler stops asking for frames.

/// Scheduling regime at the time of a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Regime {
    #[default]
    Steady,
    Burst,
}

impl Regime {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Steady => "steady",
            Self::Burst => "burst",
        }
    }
}

/// Decision for one animation frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameDecision {
    /// Evaluate the engine this frame.
    pub run_tick: bool,
    /// The tick should keep the chat list's bottom edge anchored.
    pub preserve_scroll: bool,
    /// Ask the host for another frame after this one.
    pub request_next_frame: bool,
    pub regime: Regime,
}

/// Coalesces update requests into frame-aligned ticks.
#[derive(Debug, Clone, Default)]
pub struct FrameScheduler {
    /// A frame has been requested from the host and has not run yet.
    frame_requested: bool,
    /// Some event asked for an update since the last tick.
    update_pending: bool,
    preserve_scroll: bool,
    burst_until_ms: Option<f64>,
}

impl FrameScheduler {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask for one update on the next frame.
    ///
    /// Returns `true` when the host must request an animation frame; `false`
    /// when one is already outstanding.
    pub fn request_update(&mut self, preserve_scroll: bool) -> bool {
        self.update_pending = true;
        self.preserve_scroll |= preserve_scroll;
        self.claim_frame()
    }

    /// Start or extend a burst ending `duration_ms` from `now_ms`.
    ///
    /// Returns `true` when the host must request an animation frame.
    pub fn extend_burst(&mut self, now_ms: f64, duration_ms: u64) -> bool {
        let until = now_ms + duration_ms as f64;
        self.burst_until_ms = Some(match self.burst_until_ms {
            Some(current) => current.max(until),
            None => until,
        });
        self.update_pending = true;
        self.claim_frame()
    }

    /// Consume the frame the host delivered.
    pub fn on_frame(&mut self, now_ms: f64) -> FrameDecision {
        self.frame_requested = false;

        let in_burst = self.burst_until_ms.is_some_and(|until| now_ms < until);
        if !in_burst {
            self.burst_until_ms = None;
        }

        let run_tick = self.update_pending || in_burst;
        let preserve_scroll = std::mem::take(&mut self.preserve_scroll);
        self.update_pending = false;

        let request_next_frame = in_burst && self.claim_frame();

        FrameDecision {
            run_tick,
            preserve_scroll,
            request_next_frame,
            regime: if in_burst { Regime::Burst } else { Regime::Steady },
        }
    }

    /// Forget outstanding requests (the host cancelled its frame).
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    #[inline]
    #[must_use]
    pub fn frame_requested(&self) -> bool {
        self.frame_requested
    }

    #[inline]
    #[must_use]
    pub fn burst_until_ms(&self) -> Option<f64> {
        self.burst_until_ms
    }

    /// Regime as seen at `now_ms`.
    #[must_use]
    pub fn regime(&self, now_ms: f64) -> Regime {
        if self.burst_until_ms.is_some_and(|until| now_ms < until) {
            Regime::Burst
        } else {
            Regime::Steady
        }
    }

    fn claim_frame(&mut self) -> bool {
        if self.frame_requested {
            false
        } else {
            self.frame_requested = true;
            true
        }
    }
}
