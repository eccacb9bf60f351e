#![forbid(unsafe_code)]

//! `keyshift-core` keeps a fixed-position chat UI above the on-screen keyboard.
//!
//! The crate reconciles a browser's *layout viewport* (the CSS positioning
//! viewport) with its *visual viewport* (what is actually on screen once a
//! keyboard overlaps it) and publishes the layout parameters a stylesheet needs
//! to compensate.
//!
//! Design goals:
//! - **Host-driven**: the embedding environment pushes events and animation
//!   frames; the core never reads a clock or touches the DOM.
//! - **One engine, one writer**: all state lives in [`ViewportEngine`] and
//!   every styling write goes through [`Publisher`] as a full overwrite.
//! - **Self-correcting**: every failure is cosmetic and the next frame
//!   converges again.
//!
//! Pipeline (leaf-first):
//!
//! ```text
//! host events ─▶ FrameScheduler ─▶ KeyboardStateMachine ─▶ OverlayStabilizer
//!                                                │                 │
//!                    HoverSuppression ◀──────────┘          OffsetSmoother
//!                           │                                      │
//!                           └──────────────▶ Publisher ◀───────────┘
//! ```

pub mod anchor;
pub mod config;
pub mod engine;
pub mod error;
pub mod event;
pub mod hover;
pub mod keyboard;
pub mod publisher;
pub mod sample;
pub mod scheduler;
pub mod sim;
pub mod smoother;
pub mod source;
pub mod stabilizer;

pub use config::EngineConfig;
pub use engine::{FrameOutcome, KeyboardState, TickReport, ViewportEngine};
pub use error::{ConfigError, ConfigViolation, PublishError};
pub use event::{FocusTarget, FrameRequest, HostEvent, PointerKind};
pub use publisher::{InputOverride, LayoutFrame, LayoutParam, LayoutSink, Publisher};
pub use sample::{FocusSnapshot, ViewportSample};
pub use source::{ChatMetrics, ViewportSource};
