#![forbid(unsafe_code)]

//! The compensation engine.
//!
//! [`ViewportEngine`] owns every piece of state the pipeline needs and is the
//! only code that mutates it. The host drives it with two calls:
//!
//! - [`handle_event`](ViewportEngine::handle_event) for every DOM event the
//!   engine listens to. It never evaluates the pipeline itself; it only asks
//!   for a frame (and, for hover suppression, rewrites the last frame).
//! - [`on_animation_frame`](ViewportEngine::on_animation_frame) from the
//!   `requestAnimationFrame` callback. At most one pipeline evaluation runs
//!   per call, using a sample read at that moment.
//!
//! ```
//! use keyshift_core::sim::{RecordingSink, ScriptedSource};
//! use keyshift_core::{EngineConfig, FocusSnapshot, FocusTarget, HostEvent, ViewportEngine};
//!
//! let mut engine =
//!     ViewportEngine::new(EngineConfig::default(), ScriptedSource::new(800.0), RecordingSink::new());
//! engine.start(0.0);
//!
//! engine.source_mut().focus = FocusSnapshot::MESSAGE_INPUT;
//! engine.source_mut().set_visual(500.0, 0.0);
//! let request = engine.handle_event(HostEvent::FocusIn(FocusTarget::MESSAGE_INPUT), 10.0);
//! assert!(request.needs_frame());
//!
//! let outcome = engine.on_animation_frame(16.0);
//! let report = outcome.report.unwrap();
//! assert!(report.visible);
//! assert_eq!(report.frame.keyboard_offset_px, 160.0);
//! assert!(outcome.request_next_frame);
//! ```

use tracing::{debug, trace};

use crate::anchor::ScrollAnchor;
use crate::config::EngineConfig;
use crate::event::{FocusTarget, FrameRequest, HostEvent, PointerKind};
use crate::hover::HoverSuppression;
use crate::keyboard::{KeyboardStateMachine, KeyboardTransition};
use crate::publisher::{
    InputOverrideController, LayoutFrame, LayoutSink, OverrideInputs, Publisher,
};
use crate::sample::ViewportSample;
use crate::scheduler::{FrameScheduler, Regime};
use crate::smoother::OffsetSmoother;
use crate::source::ViewportSource;
use crate::stabilizer::{FilteredOverlay, OverlayStabilizer};

/// Read-only snapshot of the keyboard tracking state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KeyboardState {
    pub visible: bool,
    pub raw_overlay_px: f64,
    pub stable_overlay_px: Option<f64>,
    pub candidate_overlay_px: Option<f64>,
    pub candidate_since_ms: Option<f64>,
    pub show_start_ms: Option<f64>,
    pub visible_until_ms: f64,
}

/// Everything one pipeline evaluation computed.
#[derive(Debug, Clone, PartialEq)]
pub struct TickReport {
    pub sample: ViewportSample,
    pub regime: Regime,
    pub raw_overlay_px: f64,
    pub layout_shrink_px: f64,
    pub effective_keyboard_px: f64,
    pub filtered_overlay_px: f64,
    pub spike: bool,
    pub visible: bool,
    pub transition: Option<KeyboardTransition>,
    pub published_offset_px: f64,
    pub frame: LayoutFrame,
    /// The sink accepted the frame. `false` means "retry next tick".
    pub applied: bool,
}

/// Result of one animation frame.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameOutcome {
    /// `None` when the frame had nothing to do.
    pub report: Option<TickReport>,
    /// The host must request another animation frame.
    pub request_next_frame: bool,
}

impl FrameOutcome {
    const IDLE: Self = Self {
        report: None,
        request_next_frame: false,
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Lifecycle {
    Created,
    Running,
    Disposed,
}

/// Self-scheduled frames after consecutive rejected writes before the
/// engine waits for the next host event.
pub const MAX_PUBLISH_RETRIES: u32 = 60;

/// Single owner of all compensation state.
#[derive(Debug)]
pub struct ViewportEngine<S, K> {
    config: EngineConfig,
    source: S,
    publisher: Publisher<K>,
    scheduler: FrameScheduler,
    keyboard: KeyboardStateMachine,
    stabilizer: OverlayStabilizer,
    smoother: OffsetSmoother,
    hover: HoverSuppression,
    input_override: InputOverrideController,
    anchor: ScrollAnchor,
    publish_retries: u32,
    lifecycle: Lifecycle,
}

impl<S: ViewportSource, K: LayoutSink> ViewportEngine<S, K> {
    #[must_use]
    pub fn new(config: EngineConfig, source: S, sink: K) -> Self {
        Self {
            config,
            source,
            publisher: Publisher::new(sink),
            scheduler: FrameScheduler::new(),
            keyboard: KeyboardStateMachine::new(),
            stabilizer: OverlayStabilizer::new(),
            smoother: OffsetSmoother::new(),
            hover: HoverSuppression::new(),
            input_override: InputOverrideController::new(),
            anchor: ScrollAnchor::new(),
            publish_retries: 0,
            lifecycle: Lifecycle::Created,
        }
    }

    /// Record the keyboard-hidden baseline and publish the first frame.
    ///
    /// Returns `None` if the engine was already started or disposed. When the
    /// first write is rejected a retry is queued; check
    /// [`frame_pending`](Self::frame_pending) afterwards.
    pub fn start(&mut self, now_ms: f64) -> Option<TickReport> {
        if self.lifecycle != Lifecycle::Created {
            return None;
        }
        self.lifecycle = Lifecycle::Running;
        let sample = self.source.sample(now_ms);
        self.keyboard.set_baseline(sample.layout_height_px);
        debug!(layout_height_px = sample.layout_height_px, "viewport engine started");
        let (report, _) = self.tick(now_ms, false, Regime::Steady);
        Some(report)
    }

    /// Stop reacting to events and leave the styling surface at rest.
    pub fn dispose(&mut self) {
        if self.lifecycle != Lifecycle::Running {
            self.lifecycle = Lifecycle::Disposed;
            return;
        }
        self.lifecycle = Lifecycle::Disposed;
        self.scheduler.reset();
        self.smoother.reset();
        self.input_override.reset();
        self.hover.release();

        let sample = self.source.sample(0.0);
        let frame = LayoutFrame::at_rest(
            sample.layout_height_px,
            sample.visual_height_px,
            sample.visual_offset_top_px,
        );
        self.publisher.publish(frame);
        debug!("viewport engine disposed");
    }

    /// Deliver a host event.
    pub fn handle_event(&mut self, event: HostEvent, now_ms: f64) -> FrameRequest {
        if self.lifecycle != Lifecycle::Running {
            return FrameRequest::None;
        }
        trace!(event = event.as_str(), now_ms, "host event");
        self.publish_retries = 0;

        let need_frame = match event {
            HostEvent::Resize
            | HostEvent::OrientationChange
            | HostEvent::PageShow
            | HostEvent::VisualViewportResize
            | HostEvent::VisualViewportScroll => {
                self.scheduler.request_update(event.preserves_scroll())
            }
            HostEvent::FocusIn(target) => {
                let mut need = self.scheduler.request_update(true);
                if target.text_like {
                    need |= self.scheduler.extend_burst(now_ms, self.config.focus_burst_ms);
                }
                if target.designated_input {
                    self.engage_hover(now_ms);
                }
                need
            }
            HostEvent::FocusOut(target) => {
                let mut need = self.scheduler.request_update(true);
                if target.text_like {
                    need |= self.scheduler.extend_burst(now_ms, self.config.blur_burst_ms);
                }
                if target.designated_input && self.hover.release() {
                    need |= self.republish_hover(false);
                }
                need
            }
            HostEvent::TouchStart(target) => self.pre_focus(target, now_ms),
            HostEvent::PointerDown {
                kind: PointerKind::Mouse,
                ..
            } => false,
            HostEvent::PointerDown { target, .. } => self.pre_focus(target, now_ms),
        };

        if need_frame {
            FrameRequest::RequestFrame
        } else {
            FrameRequest::None
        }
    }

    /// Run the frame the host scheduled.
    pub fn on_animation_frame(&mut self, now_ms: f64) -> FrameOutcome {
        if self.lifecycle != Lifecycle::Running {
            return FrameOutcome::IDLE;
        }
        let decision = self.scheduler.on_frame(now_ms);
        if !decision.run_tick {
            return FrameOutcome {
                report: None,
                request_next_frame: decision.request_next_frame,
            };
        }
        let (report, follow_up) = self.tick(now_ms, decision.preserve_scroll, decision.regime);
        FrameOutcome {
            report: Some(report),
            request_next_frame: decision.request_next_frame || follow_up,
        }
    }

    /// A tick is queued behind a frame the host still has to deliver.
    ///
    /// Only [`start`](Self::start) can queue one without telling the host.
    #[inline]
    #[must_use]
    pub fn frame_pending(&self) -> bool {
        self.scheduler.frame_requested()
    }

    /// Touch or pen contact on an element, before any focus change.
    fn pre_focus(&mut self, target: FocusTarget, now_ms: f64) -> bool {
        if !target.designated_input {
            return false;
        }
        self.engage_hover(now_ms);
        self.scheduler.extend_burst(now_ms, self.config.focus_burst_ms)
    }

    fn engage_hover(&mut self, now_ms: f64) {
        let touch_primary = self.source.is_touch_primary();
        if self.hover.engage(touch_primary, now_ms, &self.config) {
            // Result ignored: every caller already claims a frame.
            let _ = self.republish_hover(true);
        }
    }

    /// Rewrite the hover flag now; a rejected write falls back to a tick.
    fn republish_hover(&mut self, hover_suppressed: bool) -> bool {
        if self.publisher.republish_hover(hover_suppressed) {
            false
        } else {
            self.scheduler.request_update(false)
        }
    }

    /// One pipeline evaluation. The flag is `true` when the tick itself
    /// claimed another frame.
    fn tick(&mut self, now_ms: f64, preserve_scroll: bool, regime: Regime) -> (TickReport, bool) {
        let config = &self.config;
        let sample = self.source.sample(now_ms);
        let focus = self.source.focus();
        let touch_primary = self.source.is_touch_primary();
        let layout = sample.layout_height_px;

        let reading = self.keyboard.observe(&sample, focus.text_like, config);
        if reading.baseline_reset {
            self.stabilizer.discard_baseline();
        }
        if reading.transition == Some(KeyboardTransition::Shown) {
            self.stabilizer.reset_candidate();
        }

        let (filtered, published_offset_px) = if reading.visible {
            let filtered = self.stabilizer.filter(
                reading.raw_overlay_px,
                now_ms,
                self.keyboard.show_start_ms(),
                config,
            );
            self.stabilizer.observe(filtered, now_ms, config);
            let offset = self.smoother.advance(filtered.value_px, layout, config);
            (filtered, offset)
        } else {
            self.stabilizer.reset_candidate();
            let passthrough = FilteredOverlay {
                value_px: reading.raw_overlay_px,
                spike: false,
            };
            (passthrough, self.smoother.reset())
        };

        let hover_suppressed = self.hover.sync(&focus, touch_primary, now_ms);

        let mut frame = LayoutFrame::at_rest(
            layout,
            sample.visual_height_px,
            sample.visual_offset_top_px,
        );
        frame.hover_suppressed = hover_suppressed;
        if reading.visible {
            frame.keyboard_visible = true;
            frame.keyboard_height_px = reading
                .layout_shrink_px
                .max(filtered.value_px)
                .min(layout)
                .round();
            frame.keyboard_offset_px = published_offset_px.round();
            frame.chat_top_margin_px = reading.layout_shrink_px.round();
        }

        frame.input_override = self.input_override.next(
            OverrideInputs {
                engaged: reading.visible
                    && focus.within_input_container
                    && reading.raw_overlay_px > 0.0,
                bar_bottom_px: self.source.input_bar_bottom_px(),
                visual_bottom_px: sample.visual_bottom_px(),
                filtered_overlay_px: filtered.value_px,
                published_offset_px,
            },
            config.input_override_tolerance_px,
        );
        frame.chat_scroll_top_px = self
            .anchor
            .update(self.source.chat_metrics(), preserve_scroll);

        // After a rejected write the page state is unknown; measure again.
        let reflowed = self.publisher.last_frame().is_some_and(|previous| {
            !self.publisher.last_write_applied() || frame.reflows_from(previous)
        });
        let applied = self.publisher.publish(frame.clone());
        let follow_up = self.schedule_follow_up(applied, reflowed, preserve_scroll);

        trace!(
            regime = regime.as_str(),
            layout_height_px = layout,
            raw_overlay_px = reading.raw_overlay_px,
            effective_px = reading.effective_px,
            filtered_overlay_px = filtered.value_px,
            published_offset_px,
            visible = reading.visible,
            applied,
            reflowed,
            "viewport tick"
        );

        let report = TickReport {
            sample,
            regime,
            raw_overlay_px: reading.raw_overlay_px,
            layout_shrink_px: reading.layout_shrink_px,
            effective_keyboard_px: reading.effective_px,
            filtered_overlay_px: filtered.value_px,
            spike: filtered.spike,
            visible: reading.visible,
            transition: reading.transition,
            published_offset_px,
            frame,
            applied,
        };
        (report, follow_up)
    }

    /// Queue the tick a frame leaves behind: a retry after a rejected write,
    /// and a re-measure of the chat list after the page reflowed.
    fn schedule_follow_up(&mut self, applied: bool, reflowed: bool, preserve_scroll: bool) -> bool {
        let mut claimed = false;
        if applied {
            self.publish_retries = 0;
        } else if self.publish_retries < MAX_PUBLISH_RETRIES {
            self.publish_retries += 1;
            claimed |= self.scheduler.request_update(preserve_scroll);
        } else if self.publish_retries == MAX_PUBLISH_RETRIES {
            self.publish_retries += 1;
            debug!(
                retries = MAX_PUBLISH_RETRIES,
                "layout frame still rejected; waiting for the next host event"
            );
        }
        if reflowed && applied {
            claimed |= self.scheduler.request_update(true);
        }
        claimed
    }

    /// Snapshot of the keyboard tracking state.
    #[must_use]
    pub fn keyboard_state(&self) -> KeyboardState {
        let candidate = self.stabilizer.candidate();
        KeyboardState {
            visible: self.keyboard.is_visible(),
            raw_overlay_px: self.keyboard.last_raw_overlay_px(),
            stable_overlay_px: self.stabilizer.stable_px(),
            candidate_overlay_px: candidate.map(|c| c.value_px),
            candidate_since_ms: candidate.map(|c| c.since_ms),
            show_start_ms: self.keyboard.show_start_ms(),
            visible_until_ms: self.keyboard.visible_until_ms(),
        }
    }

    #[inline]
    #[must_use]
    pub fn published_offset_px(&self) -> f64 {
        self.smoother.published_offset_px()
    }

    #[inline]
    #[must_use]
    pub fn hover_suppressed(&self) -> bool {
        self.hover.is_suppressed()
    }

    #[inline]
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.lifecycle == Lifecycle::Running
    }

    #[inline]
    #[must_use]
    pub fn regime(&self, now_ms: f64) -> Regime {
        self.scheduler.regime(now_ms)
    }

    #[inline]
    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    #[inline]
    #[must_use]
    pub fn source(&self) -> &S {
        &self.source
    }

    #[inline]
    pub fn source_mut(&mut self) -> &mut S {
        &mut self.source
    }

    #[inline]
    #[must_use]
    pub fn publisher(&self) -> &Publisher<K> {
        &self.publisher
    }

    #[inline]
    #[must_use]
    pub fn sink(&self) -> &K {
        self.publisher.sink()
    }

    #[inline]
    pub fn sink_mut(&mut self) -> &mut K {
        self.publisher.sink_mut()
    }
}
