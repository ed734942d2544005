//! WASM-compatible wrapper types for crop rectangles and results.

use cardcrop_core::{CompressionAttempt, CropRect, CropResult};
use wasm_bindgen::prelude::*;

/// A crop rectangle in display coordinates.
#[wasm_bindgen]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JsCropRect {
    left: f64,
    top: f64,
    right: f64,
    bottom: f64,
}

#[wasm_bindgen]
impl JsCropRect {
    #[wasm_bindgen(getter)]
    pub fn left(&self) -> f64 {
        self.left
    }

    #[wasm_bindgen(getter)]
    pub fn top(&self) -> f64 {
        self.top
    }

    #[wasm_bindgen(getter)]
    pub fn right(&self) -> f64 {
        self.right
    }

    #[wasm_bindgen(getter)]
    pub fn bottom(&self) -> f64 {
        self.bottom
    }

    #[wasm_bindgen(getter)]
    pub fn width(&self) -> f64 {
        self.right - self.left
    }

    #[wasm_bindgen(getter)]
    pub fn height(&self) -> f64 {
        self.bottom - self.top
    }

    /// `[left, top, right, bottom]` as a `Float64Array`.
    pub fn to_array(&self) -> js_sys::Float64Array {
        js_sys::Float64Array::from(&[self.left, self.top, self.right, self.bottom][..])
    }
}

impl From<CropRect> for JsCropRect {
    fn from(rect: CropRect) -> Self {
        Self {
            left: rect.left,
            top: rect.top,
            right: rect.right,
            bottom: rect.bottom,
        }
    }
}

/// A confirmed crop, with the encoded bytes copied out of the codec.
///
/// The bytes are owned by this object; the codec has already released its
/// copy.
#[wasm_bindgen]
#[derive(Debug, Clone)]
pub struct JsCropResult {
    width: u32,
    height: u32,
    size_bytes: usize,
    base64: Option<String>,
    mime_type: String,
    attempts: Vec<CompressionAttempt>,
    bytes: Vec<u8>,
}

#[wasm_bindgen]
impl JsCropResult {
    #[wasm_bindgen(getter)]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[wasm_bindgen(getter)]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Encoded size in bytes
    #[wasm_bindgen(getter)]
    pub fn size_bytes(&self) -> usize {
        self.size_bytes
    }

    /// Plain base64 payload (no `data:` prefix)
    #[wasm_bindgen(getter)]
    pub fn base64(&self) -> Option<String> {
        self.base64.clone()
    }

    #[wasm_bindgen(getter)]
    pub fn mime_type(&self) -> String {
        self.mime_type.clone()
    }

    /// Number of encodes it took to fit the budget
    #[wasm_bindgen(getter)]
    pub fn attempt_count(&self) -> usize {
        self.attempts.len()
    }

    /// `data:` URL ready for an `<img>` element, when a payload is present.
    pub fn data_url(&self) -> Option<String> {
        self.base64
            .as_ref()
            .map(|b64| format!("data:{};base64,{}", self.mime_type, b64))
    }

    /// Encoded image bytes as a `Uint8Array` (copied).
    pub fn bytes(&self) -> Vec<u8> {
        self.bytes.clone()
    }

    /// Per-attempt diagnostics (`{ quality, format, sizeBytes }[]`).
    pub fn attempts(&self) -> Result<JsValue, JsValue> {
        serde_wasm_bindgen::to_value(&self.attempts).map_err(|e| JsValue::from_str(&e.to_string()))
    }
}

impl JsCropResult {
    pub(crate) fn new(result: CropResult, mime_type: &str, bytes: Vec<u8>) -> Self {
        Self {
            width: result.width,
            height: result.height,
            size_bytes: result.size_bytes,
            base64: result.base64,
            mime_type: mime_type.to_string(),
            attempts: result.attempts,
            bytes,
        }
    }
}
