#![forbid(unsafe_code)]

//! `wasm-bindgen` exports and the live-DOM source and sink.
//!
//! Only compiled on `wasm32` targets.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use js_sys::{Object, Reflect};
use keyshift_core::{
    ChatMetrics, FocusSnapshot, FocusTarget, HostEvent, InputOverride, LayoutFrame, LayoutSink,
    PointerKind, PublishError, ViewportEngine, ViewportSample, ViewportSource,
};
use tracing::{debug, warn};
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::{
    AddEventListenerOptions, Document, Element, Event, EventTarget, HtmlElement, PointerEvent,
    Window,
};

use crate::heuristics::{TOUCH_PRIMARY_QUERY, is_probably_ios, is_text_entry};
use crate::logging::install_panic_hook;
use crate::options::{CompensatorOptions, DomBindings};

thread_local! {
    static CLOCK_ORIGIN: web_time::Instant = web_time::Instant::now();
}

/// Milliseconds on a monotonic clock shared by events and frames.
fn now_ms() -> f64 {
    CLOCK_ORIGIN.with(|origin| origin.elapsed().as_secs_f64() * 1000.0)
}

fn describe(err: JsValue) -> String {
    err.as_string().unwrap_or_else(|| format!("{err:?}"))
}

fn set_js(obj: &Object, key: &str, value: JsValue) {
    let _ = Reflect::set(obj, &JsValue::from_str(key), &value);
}

fn opt_f64(value: Option<f64>) -> JsValue {
    value.map_or(JsValue::NULL, JsValue::from_f64)
}

fn focus_target(el: &Element, bindings: &DomBindings) -> FocusTarget {
    let tag = el.tag_name();
    let editable = el
        .dyn_ref::<HtmlElement>()
        .is_some_and(HtmlElement::is_content_editable);
    FocusTarget {
        text_like: is_text_entry(&tag, editable, tag.eq_ignore_ascii_case("body")),
        designated_input: el.id() == bindings.input_id,
    }
}

// ── Source ────────────────────────────────────────────────────────────

struct DomViewportSource {
    window: Window,
    document: Document,
    bindings: DomBindings,
    touch_primary: bool,
}

impl DomViewportSource {
    fn new(window: Window, document: Document, bindings: DomBindings) -> Self {
        let coarse = window
            .match_media(TOUCH_PRIMARY_QUERY)
            .ok()
            .flatten()
            .is_some_and(|query| query.matches());
        let navigator = window.navigator();
        let ios = is_probably_ios(
            &navigator.user_agent().unwrap_or_default(),
            &navigator.platform().unwrap_or_default(),
            navigator.max_touch_points(),
        );
        debug!(coarse, ios, "touch detection");
        Self {
            window,
            document,
            bindings,
            touch_primary: coarse || ios,
        }
    }

    fn element(&self, id: &str) -> Option<Element> {
        self.document.get_element_by_id(id)
    }
}

impl ViewportSource for DomViewportSource {
    fn sample(&self, now_ms: f64) -> ViewportSample {
        let inner = self
            .window
            .inner_height()
            .ok()
            .and_then(|v| v.as_f64())
            .unwrap_or(0.0);
        let client = self
            .document
            .document_element()
            .map_or(0.0, |el| f64::from(el.client_height()));
        let layout = inner.max(client);

        match self.window.visual_viewport() {
            Some(vv) => ViewportSample::new(layout, vv.height(), vv.offset_top(), now_ms),
            None => ViewportSample::layout_only(layout, now_ms),
        }
    }

    fn focus(&self) -> FocusSnapshot {
        let Some(active) = self.document.active_element() else {
            return FocusSnapshot::NONE;
        };
        let target = focus_target(&active, &self.bindings);
        let within_input_container = self
            .element(&self.bindings.input_container_id)
            .is_some_and(|container| container.contains(Some(active.as_ref())));
        FocusSnapshot {
            text_like: target.text_like,
            designated_input: target.designated_input,
            within_input_container,
        }
    }

    fn is_touch_primary(&self) -> bool {
        self.touch_primary
    }

    fn input_bar_bottom_px(&self) -> Option<f64> {
        self.element(&self.bindings.input_container_id)
            .map(|bar| bar.get_bounding_client_rect().bottom())
    }

    fn chat_metrics(&self) -> Option<ChatMetrics> {
        let chat = self.element(&self.bindings.chat_container_id)?;
        let input_overlap_px = self
            .element(&self.bindings.input_container_id)
            .map_or(0.0, |bar| {
                let chat_bottom = chat.get_bounding_client_rect().bottom();
                let bar_top = bar.get_bounding_client_rect().top();
                (chat_bottom - bar_top).max(0.0)
            });
        Some(ChatMetrics {
            scroll_top_px: f64::from(chat.scroll_top()),
            client_height_px: f64::from(chat.client_height()),
            scroll_height_px: f64::from(chat.scroll_height()),
            input_overlap_px,
        })
    }
}

// ── Sink ──────────────────────────────────────────────────────────────

struct DomLayoutSink {
    document: Document,
    bindings: DomBindings,
}

impl DomLayoutSink {
    fn html_element(&self, id: &str) -> Option<HtmlElement> {
        self.document
            .get_element_by_id(id)
            .and_then(|el| el.dyn_into::<HtmlElement>().ok())
    }

    fn apply_override(bar: &HtmlElement, input_override: InputOverride) -> Result<(), PublishError> {
        let style = bar.style();
        match input_override {
            InputOverride::Lift { px } => {
                let transform = format!("translate3d(0, -{px}px, 0)");
                style
                    .set_property("transform", &transform)
                    .map_err(|e| PublishError::rejected("transform", describe(e)))?;
                style
                    .set_property("margin-bottom", "0px")
                    .map_err(|e| PublishError::rejected("margin-bottom", describe(e)))?;
                style
                    .set_property("will-change", "transform")
                    .map_err(|e| PublishError::rejected("will-change", describe(e)))?;
            }
            InputOverride::Clear => {
                for property in ["transform", "margin-bottom", "will-change"] {
                    style
                        .remove_property(property)
                        .map_err(|e| PublishError::rejected(property, describe(e)))?;
                }
            }
        }
        Ok(())
    }
}

impl LayoutSink for DomLayoutSink {
    /// Writes every part of the frame even when an earlier part fails, and
    /// reports the first failure.
    fn write(&mut self, frame: &LayoutFrame) -> Result<(), PublishError> {
        let mut first_error: Option<PublishError> = None;
        let mut record = |result: Result<(), PublishError>| {
            if let Err(err) = result {
                first_error.get_or_insert(err);
            }
        };

        match self
            .document
            .document_element()
            .and_then(|el| el.dyn_into::<HtmlElement>().ok())
        {
            Some(root) => {
                let style = root.style();
                for (param, value) in frame.params() {
                    let property = param.css_property();
                    record(
                        style
                            .set_property(property, &format!("{value}px"))
                            .map_err(|e| PublishError::rejected(property, describe(e))),
                    );
                }
            }
            None => record(Err(PublishError::MissingElement("documentElement"))),
        }

        match self.document.body() {
            Some(body) => {
                let classes = body.class_list();
                let toggles = [
                    (&self.bindings.keyboard_visible_class, frame.keyboard_visible),
                    (&self.bindings.hover_suppressed_class, frame.hover_suppressed),
                ];
                for (class, on) in toggles {
                    record(
                        classes
                            .toggle_with_force(class, on)
                            .map(|_| ())
                            .map_err(|e| PublishError::rejected("body.classList", describe(e))),
                    );
                }
            }
            None => record(Err(PublishError::MissingElement("body"))),
        }

        if let Some(bar) = self.html_element(&self.bindings.input_container_id) {
            record(Self::apply_override(&bar, frame.input_override));
        }

        if let Some(top) = frame.chat_scroll_top_px
            && let Some(chat) = self.document.get_element_by_id(&self.bindings.chat_container_id)
        {
            chat.set_scroll_top(top as i32);
        }

        first_error.map_or(Ok(()), Err)
    }
}

// ── Event wiring ──────────────────────────────────────────────────────

type DomEngine = ViewportEngine<DomViewportSource, DomLayoutSink>;

struct Shared {
    bindings: DomBindings,
    window: Window,
    engine: RefCell<DomEngine>,
    raf_handle: Cell<Option<i32>>,
    raf_callback: RefCell<Option<Closure<dyn FnMut(f64)>>>,
}

impl Shared {
    fn dispatch(&self, event: HostEvent) {
        let request = self.engine.borrow_mut().handle_event(event, now_ms());
        if request.needs_frame() {
            self.request_frame();
        }
    }

    fn on_frame(&self) {
        self.raf_handle.set(None);
        let outcome = self.engine.borrow_mut().on_animation_frame(now_ms());
        if outcome.request_next_frame {
            self.request_frame();
        }
    }

    fn request_frame(&self) {
        if self.raf_handle.get().is_some() {
            return;
        }
        let callback = self.raf_callback.borrow();
        let Some(callback) = callback.as_ref() else {
            return;
        };
        match self
            .window
            .request_animation_frame(callback.as_ref().unchecked_ref())
        {
            Ok(handle) => self.raf_handle.set(Some(handle)),
            Err(err) => warn!(error = %describe(err), "requestAnimationFrame failed"),
        }
    }

    fn cancel_frame(&self) {
        if let Some(handle) = self.raf_handle.take() {
            let _ = self.window.cancel_animation_frame(handle);
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ListenerKind {
    Resize,
    OrientationChange,
    PageShow,
    VisualViewportResize,
    VisualViewportScroll,
    FocusIn,
    FocusOut,
    TouchStart,
    PointerDown,
}

impl ListenerKind {
    const WINDOW: [Self; 3] = [Self::Resize, Self::OrientationChange, Self::PageShow];
    const VISUAL_VIEWPORT: [Self; 2] = [Self::VisualViewportResize, Self::VisualViewportScroll];
    const DOCUMENT: [Self; 4] = [Self::FocusIn, Self::FocusOut, Self::TouchStart, Self::PointerDown];

    const fn dom_name(self) -> &'static str {
        match self {
            Self::Resize | Self::VisualViewportResize => "resize",
            Self::OrientationChange => "orientationchange",
            Self::PageShow => "pageshow",
            Self::VisualViewportScroll => "scroll",
            Self::FocusIn => "focusin",
            Self::FocusOut => "focusout",
            Self::TouchStart => "touchstart",
            Self::PointerDown => "pointerdown",
        }
    }

    /// Document listeners run in the capture phase so stopPropagation in app
    /// code cannot hide focus changes.
    const fn capture(self) -> bool {
        matches!(
            self,
            Self::FocusIn | Self::FocusOut | Self::TouchStart | Self::PointerDown
        )
    }

    fn classify(self, event: &Event, bindings: &DomBindings) -> Option<HostEvent> {
        let target = || {
            event
                .target()
                .and_then(|t| t.dyn_into::<Element>().ok())
                .map(|el| focus_target(&el, bindings))
        };
        Some(match self {
            Self::Resize => HostEvent::Resize,
            Self::OrientationChange => HostEvent::OrientationChange,
            Self::PageShow => HostEvent::PageShow,
            Self::VisualViewportResize => HostEvent::VisualViewportResize,
            Self::VisualViewportScroll => HostEvent::VisualViewportScroll,
            Self::FocusIn => HostEvent::FocusIn(target()?),
            Self::FocusOut => HostEvent::FocusOut(target()?),
            Self::TouchStart => HostEvent::TouchStart(target()?),
            Self::PointerDown => {
                let kind = event
                    .dyn_ref::<PointerEvent>()
                    .map_or(PointerKind::Mouse, |p| PointerKind::from_dom(&p.pointer_type()));
                HostEvent::PointerDown {
                    kind,
                    target: target()?,
                }
            }
        })
    }
}

struct Listener {
    target: EventTarget,
    kind: ListenerKind,
    callback: Closure<dyn FnMut(Event)>,
}

impl Listener {
    fn attach(target: EventTarget, kind: ListenerKind, shared: Weak<Shared>) -> Result<Self, JsValue> {
        let callback = Closure::<dyn FnMut(Event)>::new(move |event: Event| {
            let Some(shared) = shared.upgrade() else {
                return;
            };
            if let Some(host) = kind.classify(&event, &shared.bindings) {
                shared.dispatch(host);
            }
        });
        let options = AddEventListenerOptions::new();
        options.set_capture(kind.capture());
        options.set_passive(true);
        target.add_event_listener_with_callback_and_add_event_listener_options(
            kind.dom_name(),
            callback.as_ref().unchecked_ref(),
            &options,
        )?;
        Ok(Self {
            target,
            kind,
            callback,
        })
    }

    fn detach(&self) {
        let _ = self.target.remove_event_listener_with_callback_and_bool(
            self.kind.dom_name(),
            self.callback.as_ref().unchecked_ref(),
            self.kind.capture(),
        );
    }
}

// ── Exports ───────────────────────────────────────────────────────────

/// Keeps the chat input bar above the on-screen keyboard.
///
/// Construct once per page, call `start()` after the chat DOM exists and
/// `dispose()` when tearing the page down. A disposed compensator cannot be
/// restarted; construct a new one instead.
#[wasm_bindgen]
pub struct KeyboardCompensator {
    shared: Rc<Shared>,
    document: Document,
    listeners: Vec<Listener>,
}

#[wasm_bindgen]
impl KeyboardCompensator {
    /// `options_json` is an optional JSON object; see `CompensatorOptions`.
    #[wasm_bindgen(constructor)]
    pub fn new(options_json: Option<String>) -> Result<KeyboardCompensator, JsValue> {
        install_panic_hook();
        let options = match options_json.as_deref() {
            Some(json) => CompensatorOptions::from_json_str(json)
                .map_err(|err| JsValue::from_str(&err.to_string()))?,
            None => CompensatorOptions::default(),
        };
        let window =
            web_sys::window().ok_or_else(|| JsValue::from_str("KeyboardCompensator needs a window"))?;
        let document = window
            .document()
            .ok_or_else(|| JsValue::from_str("KeyboardCompensator needs a document"))?;

        let source = DomViewportSource::new(window.clone(), document.clone(), options.dom.clone());
        let sink = DomLayoutSink {
            document: document.clone(),
            bindings: options.dom.clone(),
        };
        let shared = Rc::new(Shared {
            bindings: options.dom,
            window,
            engine: RefCell::new(ViewportEngine::new(options.engine, source, sink)),
            raf_handle: Cell::new(None),
            raf_callback: RefCell::new(None),
        });

        let weak = Rc::downgrade(&shared);
        let raf = Closure::<dyn FnMut(f64)>::new(move |_timestamp: f64| {
            if let Some(shared) = weak.upgrade() {
                shared.on_frame();
            }
        });
        *shared.raf_callback.borrow_mut() = Some(raf);

        Ok(Self {
            shared,
            document,
            listeners: Vec::new(),
        })
    }

    /// Publish the first frame and begin listening.
    pub fn start(&mut self) -> Result<(), JsValue> {
        if self.shared.engine.borrow_mut().start(now_ms()).is_none() {
            return Ok(());
        }

        let window: EventTarget = self.shared.window.clone().into();
        for kind in ListenerKind::WINDOW {
            self.listen(window.clone(), kind)?;
        }
        if let Some(vv) = self.shared.window.visual_viewport() {
            let vv: EventTarget = vv.into();
            for kind in ListenerKind::VISUAL_VIEWPORT {
                self.listen(vv.clone(), kind)?;
            }
        }
        let document: EventTarget = self.document.clone().into();
        for kind in ListenerKind::DOCUMENT {
            self.listen(document.clone(), kind)?;
        }
        debug!(listeners = self.listeners.len(), "keyboard compensator listening");
        if self.shared.engine.borrow().frame_pending() {
            self.shared.request_frame();
        }
        Ok(())
    }

    /// Remove listeners, cancel the pending frame and reset the page styling.
    pub fn dispose(&mut self) {
        for listener in self.listeners.drain(..) {
            listener.detach();
        }
        self.shared.cancel_frame();
        self.shared.engine.borrow_mut().dispose();
        self.shared.raf_callback.borrow_mut().take();
    }

    #[wasm_bindgen(js_name = isKeyboardVisible)]
    pub fn is_keyboard_visible(&self) -> bool {
        self.shared.engine.borrow().keyboard_state().visible
    }

    #[wasm_bindgen(js_name = publishedOffset)]
    pub fn published_offset(&self) -> f64 {
        self.shared.engine.borrow().published_offset_px()
    }

    #[wasm_bindgen(js_name = hoverSuppressed)]
    pub fn hover_suppressed(&self) -> bool {
        self.shared.engine.borrow().hover_suppressed()
    }

    /// Snapshot of the keyboard tracking state, for debugging overlays.
    #[wasm_bindgen(js_name = keyboardState)]
    pub fn keyboard_state(&self) -> JsValue {
        let state = self.shared.engine.borrow().keyboard_state();
        let obj = Object::new();
        set_js(&obj, "visible", JsValue::from_bool(state.visible));
        set_js(&obj, "rawOverlayPx", JsValue::from_f64(state.raw_overlay_px));
        set_js(&obj, "stableOverlayPx", opt_f64(state.stable_overlay_px));
        set_js(&obj, "candidateOverlayPx", opt_f64(state.candidate_overlay_px));
        set_js(&obj, "candidateSinceMs", opt_f64(state.candidate_since_ms));
        set_js(&obj, "showStartMs", opt_f64(state.show_start_ms));
        set_js(&obj, "visibleUntilMs", JsValue::from_f64(state.visible_until_ms));
        obj.into()
    }
}

impl KeyboardCompensator {
    fn listen(&mut self, target: EventTarget, kind: ListenerKind) -> Result<(), JsValue> {
        let listener = Listener::attach(target, kind, Rc::downgrade(&self.shared))?;
        self.listeners.push(listener);
        Ok(())
    }
}

impl Drop for KeyboardCompensator {
    fn drop(&mut self) {
        self.dispose();
    }
}
