#![forbid(unsafe_code)]

//! Host events the engine reacts to.

/// Properties of the element an event targeted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FocusTarget {
    pub text_like: bool,
    pub designated_input: bool,
}

impl FocusTarget {
    /// Target is the chat's message input.
    pub const MESSAGE_INPUT: Self = Self {
        text_like: true,
        designated_input: true,
    };

    /// Target is some other text-entry control.
    pub const OTHER_TEXT: Self = Self {
        text_like: true,
        designated_input: false,
    };

    /// Target does not accept text.
    pub const NON_TEXT: Self = Self {
        text_like: false,
        designated_input: false,
    };
}

/// Pointer device kind reported by `pointerdown`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerKind {
    Mouse,
    Touch,
    Pen,
}

impl PointerKind {
    /// Map the DOM `pointerType` string. Unknown kinds count as touch.
    #[must_use]
    pub fn from_dom(pointer_type: &str) -> Self {
        match pointer_type {
            "mouse" => Self::Mouse,
            "pen" => Self::Pen,
            _ => Self::Touch,
        }
    }
}

/// Viewport-affecting event dispatched by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostEvent {
    Resize,
    OrientationChange,
    PageShow,
    VisualViewportResize,
    VisualViewportScroll,
    FocusIn(FocusTarget),
    FocusOut(FocusTarget),
    TouchStart(FocusTarget),
    PointerDown { kind: PointerKind, target: FocusTarget },
}

impl HostEvent {
    /// Whether a tick caused by this event should keep the chat list's bottom
    /// edge in place.
    ///
    /// A visual-viewport scroll moves the viewport, not the content, so it
    /// must not drag the chat list with it.
    #[must_use]
    pub const fn preserves_scroll(&self) -> bool {
        !matches!(self, Self::VisualViewportScroll)
    }

    /// Stable label for logs.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Resize => "resize",
            Self::OrientationChange => "orientationchange",
            Self::PageShow => "pageshow",
            Self::VisualViewportResize => "visualviewport.resize",
            Self::VisualViewportScroll => "visualviewport.scroll",
            Self::FocusIn(_) => "focusin",
            Self::FocusOut(_) => "focusout",
            Self::TouchStart(_) => "touchstart",
            Self::PointerDown { .. } => "pointerdown",
        }
    }
}

/// What the host must do after delivering an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use]
pub enum FrameRequest {
    /// Schedule an animation frame and call the engine from it.
    RequestFrame,
    /// A frame is already scheduled (or the engine is stopped).
    None,
}

impl FrameRequest {
    #[inline]
    #[must_use]
    pub const fn needs_frame(self) -> bool {
        matches!(self, Self::RequestFrame)
    }
}
