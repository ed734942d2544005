//! Cardcrop WASM - WebAssembly bindings for the crop modal
//!
//! This crate exposes the cardcrop-core crop engine and size-bounded
//! encoder to JavaScript/TypeScript hosts.
//!
//! # Module Structure
//!
//! - `modal` - The crop modal: open a photo, drag, confirm or close
//! - `policy` - Compression policy presets and JSON config
//! - `types` - WASM-compatible wrapper types for rectangles and results
//!
//! # Usage
//!
//! ```typescript
//! import init, { JsCropModal, JsCompressionPolicy } from '@cardcrop/wasm';
//!
//! await init();
//!
//! const modal = new JsCropModal(JsCompressionPolicy.medical_certificate());
//! const rect = modal.open(new Uint8Array(await file.arrayBuffer()), 360, 480);
//! ```

use wasm_bindgen::prelude::*;

mod modal;
mod policy;
mod types;

pub use modal::JsCropModal;
pub use policy::JsCompressionPolicy;
pub use types::{JsCropRect, JsCropResult};

/// Initialize the WASM module (called automatically on load)
#[wasm_bindgen(start)]
pub fn init() {}

/// Get the version of the WASM module
#[wasm_bindgen]
pub fn version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

/// Console logging; a no-op off wasm32 so host-target tests can run.
pub(crate) mod log {
    #[cfg(target_arch = "wasm32")]
    pub fn warn(message: &str) {
        web_sys::console::warn_1(&wasm_bindgen::JsValue::from_str(message));
    }

    #[cfg(not(target_arch = "wasm32"))]
    pub fn warn(_message: &str) {}
}
