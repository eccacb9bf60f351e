#![forbid(unsafe_code)]

//! Diagnostic events emitted by the engine.
//!
//!   cargo test -p keyshift-core --test tracing_tests

use std::sync::{Arc, Mutex};

use keyshift_core::sim::{RecordingSink, ScriptedSource};
use keyshift_core::{EngineConfig, FocusSnapshot, FocusTarget, HostEvent, ViewportEngine};
use tracing_subscriber::layer::SubscriberExt;

/// A captured event: level and message.
#[derive(Debug, Clone, PartialEq)]
struct CapturedEvent {
    level: tracing::Level,
    message: String,
}

struct EventCapture {
    events: Arc<Mutex<Vec<CapturedEvent>>>,
}

struct MessageVisitor(String);

impl tracing::field::Visit for MessageVisitor {
    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            self.0 = format!("{value:?}");
        }
    }
}

impl<S: tracing::Subscriber> tracing_subscriber::Layer<S> for EventCapture {
    fn on_event(
        &self,
        event: &tracing::Event<'_>,
        _ctx: tracing_subscriber::layer::Context<'_, S>,
    ) {
        let mut visitor = MessageVisitor(String::new());
        event.record(&mut visitor);
        self.events.lock().unwrap().push(CapturedEvent {
            level: *event.metadata().level(),
            message: visitor.0,
        });
    }
}

fn capture<F: FnOnce()>(f: F) -> Vec<CapturedEvent> {
    let events = Arc::new(Mutex::new(Vec::new()));
    let subscriber = tracing_subscriber::registry().with(EventCapture {
        events: events.clone(),
    });
    tracing::subscriber::with_default(subscriber, f);
    let out = events.lock().unwrap().clone();
    out
}

fn has(events: &[CapturedEvent], level: tracing::Level, message: &str) -> bool {
    events.iter().any(|e| e.level == level && e.message == message)
}

#[test]
fn keyboard_transitions_are_logged_at_debug() {
    let events = capture(|| {
        let mut engine = ViewportEngine::new(
            EngineConfig::default(),
            ScriptedSource::new(800.0),
            RecordingSink::new(),
        );
        let _ = engine.start(0.0);
        engine.source_mut().focus = FocusSnapshot::MESSAGE_INPUT;
        engine.source_mut().set_visual(500.0, 0.0);
        let _ = engine.handle_event(HostEvent::FocusIn(FocusTarget::MESSAGE_INPUT), 0.0);
        let _ = engine.on_animation_frame(16.0);

        engine.source_mut().focus = FocusSnapshot::NONE;
        engine.source_mut().set_visual(800.0, 0.0);
        let _ = engine.handle_event(HostEvent::FocusOut(FocusTarget::MESSAGE_INPUT), 20.0);
        let _ = engine.on_animation_frame(32.0);
        let _ = engine.handle_event(HostEvent::Resize, 5000.0);
        let _ = engine.on_animation_frame(5016.0);
    });

    assert!(has(&events, tracing::Level::DEBUG, "viewport engine started"));
    assert!(has(&events, tracing::Level::DEBUG, "keyboard shown"));
    assert!(has(&events, tracing::Level::DEBUG, "keyboard hidden"));
    assert!(has(&events, tracing::Level::TRACE, "viewport tick"));
}

#[test]
fn rejected_frames_are_logged() {
    let events = capture(|| {
        let mut engine = ViewportEngine::new(
            EngineConfig::default(),
            ScriptedSource::new(800.0),
            RecordingSink::new(),
        );
        engine.sink_mut().fail_next(1);
        let _ = engine.start(0.0);
    });
    assert!(has(&events, tracing::Level::DEBUG, "layout frame not applied"));
}
