#![forbid(unsafe_code)]

//! Browser adapter for `keyshift-core`.
//!
//! The wasm build wires a [`keyshift_core::ViewportEngine`] to the live DOM:
//! - window, `visualViewport` and document listeners feed host events,
//! - `requestAnimationFrame` drives the engine's frames,
//! - CSS custom properties, body classes and an inline transform on the input
//!   bar receive every published frame.
//!
//! JS usage:
//!
//! ```text
//! import init, { KeyboardCompensator, initLogging } from "./keyshift_web.js";
//! await init();
//! initLogging("debug");
//! const kc = new KeyboardCompensator(JSON.stringify({ dom: { input_id: "composer" } }));
//! kc.start();
//! ```
//!
//! [`options`] and [`heuristics`] hold the host-independent pieces so they
//! can be tested natively.

pub mod heuristics;
pub mod options;

pub use options::{CompensatorOptions, DomBindings};

#[cfg(target_arch = "wasm32")]
mod logging;
#[cfg(target_arch = "wasm32")]
mod wasm;

#[cfg(target_arch = "wasm32")]
pub use logging::init_logging;
#[cfg(target_arch = "wasm32")]
pub use wasm::KeyboardCompensator;

/// Native builds compile this crate as a stub so `cargo check --workspace` stays
/// green on non-wasm targets. Options are still parsed and validated.
#[cfg(not(target_arch = "wasm32"))]
#[derive(Debug, Default)]
pub struct KeyboardCompensator {
    options: CompensatorOptions,
}

#[cfg(not(target_arch = "wasm32"))]
impl KeyboardCompensator {
    pub fn new(options_json: Option<String>) -> Result<Self, keyshift_core::ConfigError> {
        let options = match options_json {
            Some(json) => CompensatorOptions::from_json_str(&json)?,
            None => CompensatorOptions::default(),
        };
        Ok(Self { options })
    }

    #[must_use]
    pub fn options(&self) -> &CompensatorOptions {
        &self.options
    }
}
