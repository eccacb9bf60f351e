#![forbid(unsafe_code)]

//! End-to-end keyboard scenarios driven through the scripted host.
//!
//! Every test advances time in 16ms frames and mirrors each published frame
//! back into the scripted page, the way a browser would render it before the
//! next sample.

use keyshift_core::keyboard::KeyboardTransition;
use keyshift_core::sim::{RecordingSink, ScriptedSource};
use keyshift_core::{
    ChatMetrics, EngineConfig, FocusSnapshot, FocusTarget, HostEvent, InputOverride, LayoutFrame,
    TickReport, ViewportEngine, ViewportSource,
};
use pretty_assertions::assert_eq;

const FRAME_MS: f64 = 16.0;

struct Harness {
    engine: ViewportEngine<ScriptedSource, RecordingSink>,
    now: f64,
}

impl Harness {
    fn new(source: ScriptedSource) -> Self {
        let mut engine = ViewportEngine::new(EngineConfig::default(), source, RecordingSink::new());
        let first = engine.start(0.0).expect("fresh engine starts");
        engine.source_mut().apply_frame(&first.frame);
        Self { engine, now: 0.0 }
    }

    fn phone() -> Self {
        Self::new(ScriptedSource::new(800.0))
    }

    fn source(&mut self) -> &mut ScriptedSource {
        self.engine.source_mut()
    }

    fn focus_input(&mut self) {
        self.source().focus = FocusSnapshot::MESSAGE_INPUT;
        let _ = self
            .engine
            .handle_event(HostEvent::FocusIn(FocusTarget::MESSAGE_INPUT), self.now);
    }

    fn blur_input(&mut self) {
        self.source().focus = FocusSnapshot::NONE;
        let _ = self
            .engine
            .handle_event(HostEvent::FocusOut(FocusTarget::MESSAGE_INPUT), self.now);
    }

    fn skip(&mut self, ms: f64) {
        self.now += ms;
    }

    /// Deliver `event` and run the next frame.
    fn tick_with(&mut self, event: HostEvent) -> TickReport {
        let _ = self.engine.handle_event(event, self.now);
        self.now += FRAME_MS;
        let report = self
            .engine
            .on_animation_frame(self.now)
            .report
            .expect("requested frame evaluates the pipeline");
        self.engine.source_mut().apply_frame(&report.frame);
        report
    }

    /// Run the next frame without delivering an event.
    fn frame(&mut self) -> Option<TickReport> {
        self.now += FRAME_MS;
        let report = self.engine.on_animation_frame(self.now).report?;
        self.engine.source_mut().apply_frame(&report.frame);
        Some(report)
    }

    fn tick(&mut self) -> TickReport {
        self.tick_with(HostEvent::VisualViewportResize)
    }

    fn ticks(&mut self, n: usize) -> Vec<TickReport> {
        (0..n).map(|_| self.tick()).collect()
    }
}

#[test]
fn keyboard_open_ramps_offset_instead_of_jumping() {
    let mut h = Harness::phone();
    h.focus_input();
    h.source().set_visual(500.0, 0.0);

    let reports = h.ticks(6);
    assert!(reports[0].visible);
    assert!(reports[0].frame.keyboard_visible);
    assert_eq!(reports[0].raw_overlay_px, 300.0);
    assert_eq!(reports[0].frame.keyboard_height_px, 300.0);

    let offsets: Vec<f64> = reports.iter().map(|r| r.frame.keyboard_offset_px).collect();
    assert_eq!(offsets, vec![160.0, 208.0, 256.0, 300.0, 300.0, 300.0]);
}

#[test]
fn early_overshoot_is_clamped_to_stable_baseline() {
    let mut h = Harness::phone();
    h.focus_input();
    h.source().set_visual(500.0, 0.0);

    // First show at t=16; 300 is promoted once it has held for the dwell.
    let shown = h.tick();
    let show_start = h.engine.keyboard_state().show_start_ms;
    assert_eq!(show_start, Some(shown.sample.timestamp_ms));
    h.ticks(9);
    assert_eq!(h.engine.keyboard_state().stable_overlay_px, Some(300.0));

    // iOS briefly reports the keyboard plus its accessory bar twice over.
    h.source().set_visual(200.0, 0.0);
    let spiked = h.tick();
    assert!(spiked.sample.timestamp_ms - show_start.unwrap() < 900.0);
    assert_eq!(spiked.raw_overlay_px, 600.0);
    assert!(spiked.spike);
    assert_eq!(spiked.filtered_overlay_px, 300.0);
    assert!(spiked.frame.keyboard_offset_px <= 300.0);
    assert_eq!(h.engine.keyboard_state().stable_overlay_px, Some(300.0));
}

#[test]
fn refocus_overshoot_is_clamped_to_earlier_stable() {
    let mut h = Harness::phone();
    h.focus_input();
    h.source().set_visual(500.0, 0.0);
    h.ticks(10);
    assert_eq!(h.engine.keyboard_state().stable_overlay_px, Some(300.0));

    h.blur_input();
    h.source().set_visual(800.0, 0.0);
    h.tick();
    h.skip(4000.0);
    let hidden = h.tick();
    assert!(!hidden.visible);
    assert_eq!(hidden.transition, Some(KeyboardTransition::Hidden));
    assert_eq!(h.engine.keyboard_state().stable_overlay_px, Some(300.0));

    // The keyboard comes back and the first reading is the doubled one.
    h.focus_input();
    h.source().set_visual(200.0, 0.0);
    let reshown = h.tick();
    assert_eq!(reshown.transition, Some(KeyboardTransition::Shown));
    let show_start = h.engine.keyboard_state().show_start_ms;
    assert_eq!(show_start, Some(reshown.sample.timestamp_ms));
    assert_eq!(reshown.raw_overlay_px, 600.0);
    assert!(reshown.spike);
    assert_eq!(reshown.filtered_overlay_px, 300.0);
    assert_eq!(reshown.frame.keyboard_height_px, 300.0);
}

#[test]
fn large_overlay_after_window_is_trusted() {
    let mut h = Harness::phone();
    h.focus_input();
    h.source().set_visual(500.0, 0.0);
    h.ticks(10);
    assert_eq!(h.engine.keyboard_state().stable_overlay_px, Some(300.0));

    h.skip(1000.0);
    h.source().set_visual(200.0, 0.0);
    let report = h.tick();
    assert!(!report.spike);
    assert_eq!(report.filtered_overlay_px, 600.0);
}

#[test]
fn blur_holds_visibility_for_grace_then_rests() {
    let mut h = Harness::phone();
    h.focus_input();
    h.source().set_visual(500.0, 0.0);
    let reports = h.ticks(5);
    let last_qualifying_ms = reports[4].sample.timestamp_ms;

    h.blur_input();
    h.source().set_visual(800.0, 0.0);
    let held = h.tick();
    assert!(held.visible);
    assert!(held.frame.keyboard_visible);
    assert_eq!(held.frame.keyboard_offset_px, 0.0);
    assert_eq!(held.frame.keyboard_height_px, 0.0);
    assert_eq!(held.frame.input_override, InputOverride::Clear);

    // One millisecond short of the grace deadline.
    h.now = last_qualifying_ms + 4000.0 - 1.0 - FRAME_MS;
    assert!(h.tick().visible);

    h.now = last_qualifying_ms + 4000.0 - FRAME_MS;
    let rested = h.tick();
    assert!(!rested.visible);
    assert_eq!(rested.frame, LayoutFrame::at_rest(800.0, 800.0, 0.0));
}

#[test]
fn refocus_during_grace_keeps_keyboard_up() {
    let mut h = Harness::phone();
    h.focus_input();
    h.source().set_visual(500.0, 0.0);
    h.ticks(3);

    h.blur_input();
    h.tick();
    h.skip(2000.0);
    h.focus_input();
    let report = h.tick();
    assert!(report.visible);
    assert_eq!(report.transition, None);
}

#[test]
fn layout_shrink_alone_shows_keyboard_without_visual_viewport() {
    let mut h = Harness::new(ScriptedSource::new(800.0).without_visual_viewport());
    h.focus_input();
    assert!(!h.tick().visible);

    h.source().layout_height_px = 500.0;
    let report = h.tick();
    assert_eq!(report.raw_overlay_px, 0.0);
    assert_eq!(report.layout_shrink_px, 300.0);
    assert!(report.visible);
    assert_eq!(report.frame.keyboard_height_px, 300.0);
    assert_eq!(report.frame.chat_top_margin_px, 300.0);
    // The layout already moved the bar; nothing to lift.
    assert_eq!(report.frame.keyboard_offset_px, 0.0);
    assert_eq!(report.frame.app_height_px, 500.0);
}

#[test]
fn small_overlay_is_not_a_keyboard() {
    let mut h = Harness::phone();
    h.focus_input();
    // Collapsing URL bar, not a keyboard.
    h.source().set_visual(740.0, 0.0);
    let report = h.tick();
    assert_eq!(report.raw_overlay_px, 60.0);
    assert!(!report.visible);
    assert_eq!(report.frame.keyboard_offset_px, 0.0);
}

#[test]
fn overlay_without_text_focus_is_ignored() {
    let mut h = Harness::phone();
    h.source().set_visual(500.0, 0.0);
    let report = h.tick_with(HostEvent::Resize);
    assert!(!report.visible);
    assert_eq!(report.frame.keyboard_height_px, 0.0);
}

#[test]
fn settled_state_publishes_identical_frames() {
    let mut h = Harness::phone();
    h.source().natural_bar_bottom_px = Some(800.0);
    h.focus_input();
    h.source().set_visual(500.0, 0.0);
    h.ticks(12);

    let settled = h.ticks(4);
    let frames: Vec<&LayoutFrame> = settled.iter().map(|r| &r.frame).collect();
    for frame in &frames[1..] {
        assert_eq!(*frame, frames[0]);
    }
    assert_eq!(frames[0].keyboard_offset_px, 300.0);
    assert_eq!(frames[0].input_override, InputOverride::Clear);
}

#[test]
fn broken_stylesheet_falls_back_to_inline_lift() {
    let mut h = Harness::phone();
    h.source().natural_bar_bottom_px = Some(800.0);
    h.source().stylesheet_lift_px = None;
    h.focus_input();
    h.source().set_visual(500.0, 0.0);

    let reports = h.ticks(8);
    let last = reports.last().unwrap();
    assert_eq!(last.frame.input_override, InputOverride::Lift { px: 300.0 });
    assert_eq!(h.engine.source().input_bar_bottom_px(), Some(500.0));
}

#[test]
fn inline_override_clears_when_keyboard_hides() {
    let mut h = Harness::phone();
    h.source().natural_bar_bottom_px = Some(800.0);
    h.source().stylesheet_lift_px = None;
    h.focus_input();
    h.source().set_visual(500.0, 0.0);
    h.ticks(8);

    h.blur_input();
    h.source().set_visual(800.0, 0.0);
    let report = h.tick();
    assert_eq!(report.frame.input_override, InputOverride::Clear);
    assert_eq!(h.engine.source().inline_lift_px, 0.0);
}

#[test]
fn rejected_write_is_repaired_by_next_frame() {
    let mut h = Harness::phone();
    h.focus_input();
    h.source().set_visual(500.0, 0.0);
    h.engine.sink_mut().fail_next(1);

    let lost = h.tick();
    assert!(!lost.applied);
    let repaired = h.tick();
    assert!(repaired.applied);
    assert_eq!(h.engine.sink().last(), Some(&repaired.frame));
    assert!(repaired.frame.keyboard_visible);
    assert_eq!(repaired.frame.keyboard_offset_px, 208.0);
    assert_eq!(h.engine.sink().rejected(), 1);
}

fn chat(scroll_top: f64, overlap: f64) -> ChatMetrics {
    ChatMetrics {
        scroll_top_px: scroll_top,
        client_height_px: 700.0,
        scroll_height_px: 3000.0,
        input_overlap_px: overlap,
    }
}

#[test]
fn keyboard_open_keeps_latest_messages_in_view() {
    let mut source = ScriptedSource::new(800.0);
    source.chat = Some(chat(1000.0, 80.0));
    let mut h = Harness::new(source);

    h.source().focus = FocusSnapshot::MESSAGE_INPUT;
    h.source().set_visual(500.0, 0.0);
    h.source().chat = Some(chat(1000.0, 380.0));
    let report = h.tick_with(HostEvent::FocusIn(FocusTarget::MESSAGE_INPUT));
    assert_eq!(report.frame.chat_scroll_top_px, Some(1300.0));
    assert_eq!(h.engine.source().chat.unwrap().scroll_top_px, 1300.0);

    // Nothing moved since; the user's scroll position is left alone.
    assert_eq!(h.tick_with(HostEvent::Resize).frame.chat_scroll_top_px, None);
}

#[test]
fn chat_is_remeasured_after_its_own_reflow() {
    let mut source = ScriptedSource::new(800.0);
    source.chat = Some(chat(1000.0, 0.0));
    source.chat_reflow_base_px = Some(700.0);
    let mut h = Harness::new(source);

    h.source().set_visual(500.0, 0.0);
    h.focus_input();
    // The focus tick measures the list before `--keyboard-height` shrank
    // it; the restore lands on the frame after.
    let restores: Vec<Option<f64>> = (0..6)
        .map(|_| {
            h.frame()
                .expect("focus burst keeps frames coming")
                .frame
                .chat_scroll_top_px
        })
        .collect();
    assert_eq!(restores, vec![None, Some(1300.0), None, None, None, None]);

    let chat = h.engine.source().chat.unwrap();
    assert_eq!(chat.client_height_px, 400.0);
    assert_eq!(chat.scroll_top_px, 1300.0);
}

#[test]
fn visual_viewport_scroll_never_moves_chat() {
    let mut source = ScriptedSource::new(800.0);
    source.chat = Some(chat(1000.0, 80.0));
    let mut h = Harness::new(source);

    h.source().chat = Some(chat(1000.0, 380.0));
    let report = h.tick_with(HostEvent::VisualViewportScroll);
    assert_eq!(report.frame.chat_scroll_top_px, None);
}

#[test]
fn rotation_while_hidden_discards_stale_baseline() {
    // Landscape first: keyboard of 150 settles.
    let mut h = Harness::new(ScriptedSource::new(400.0));
    h.focus_input();
    h.source().set_visual(250.0, 0.0);
    h.ticks(12);
    assert_eq!(h.engine.keyboard_state().stable_overlay_px, Some(150.0));

    h.blur_input();
    h.source().set_visual(400.0, 0.0);
    h.tick();
    h.skip(4000.0);
    assert!(!h.tick().visible);

    // Rotate to portrait while hidden.
    h.source().layout_height_px = 800.0;
    h.source().set_visual(800.0, 0.0);
    h.tick_with(HostEvent::OrientationChange);
    assert_eq!(h.engine.keyboard_state().stable_overlay_px, None);

    // A portrait keyboard is far above the old landscape baseline but real.
    h.focus_input();
    h.source().set_visual(500.0, 0.0);
    let report = h.tick();
    assert!(report.visible);
    assert!(!report.spike);
    assert_eq!(report.filtered_overlay_px, 300.0);
}

#[test]
fn dispose_leaves_page_at_rest() {
    let mut h = Harness::phone();
    h.source().natural_bar_bottom_px = Some(800.0);
    h.source().stylesheet_lift_px = None;
    h.focus_input();
    h.source().set_visual(500.0, 0.0);
    h.ticks(4);

    h.engine.dispose();
    assert_eq!(
        h.engine.sink().last(),
        Some(&LayoutFrame::at_rest(800.0, 500.0, 0.0))
    );
    assert!(!h.engine.is_running());
}
