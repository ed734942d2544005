//! Compression policy bindings.
//!
//! Hosts pick one of the presets or pass a plain object, which is merged
//! over the membership card defaults:
//!
//! ```typescript
//! const policy = JsCompressionPolicy.from_json({
//!   budget: { maxBytes: 500_000, maxEdgePixels: 1600 },
//!   reencodeSource: 'originalCrop',
//! });
//! ```

use cardcrop_core::CompressionPolicy;
use wasm_bindgen::prelude::*;

/// Compression policy wrapper for JavaScript.
#[wasm_bindgen]
#[derive(Debug, Clone, Copy, Default)]
pub struct JsCompressionPolicy {
    inner: CompressionPolicy,
}

#[wasm_bindgen]
impl JsCompressionPolicy {
    /// Membership card defaults
    #[wasm_bindgen(constructor)]
    pub fn new() -> JsCompressionPolicy {
        Self::default()
    }

    pub fn membership_card() -> JsCompressionPolicy {
        Self {
            inner: CompressionPolicy::membership_card(),
        }
    }

    pub fn medical_certificate() -> JsCompressionPolicy {
        Self {
            inner: CompressionPolicy::medical_certificate(),
        }
    }

    #[wasm_bindgen(getter)]
    pub fn max_bytes(&self) -> usize {
        self.inner.budget.max_bytes
    }

    #[wasm_bindgen(getter)]
    pub fn max_edge_pixels(&self) -> u32 {
        self.inner.budget.max_edge_pixels
    }

    #[wasm_bindgen(getter)]
    pub fn max_reencodes(&self) -> u32 {
        self.inner.max_reencodes
    }

    /// Serialize to a plain object
    pub fn to_json(&self) -> Result<JsValue, JsValue> {
        serde_wasm_bindgen::to_value(&self.inner).map_err(|e| JsValue::from_str(&e.to_string()))
    }

    /// Deserialize and validate a plain object
    pub fn from_json(value: JsValue) -> Result<JsCompressionPolicy, JsValue> {
        let inner: CompressionPolicy =
            serde_wasm_bindgen::from_value(value).map_err(|e| JsValue::from_str(&e.to_string()))?;
        let inner = inner
            .validated()
            .map_err(|e| JsValue::from_str(&e.to_string()))?;
        Ok(Self { inner })
    }
}

impl JsCompressionPolicy {
    pub(crate) fn inner(&self) -> CompressionPolicy {
        self.inner
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets() {
        let card = JsCompressionPolicy::membership_card();
        assert_eq!(card.max_bytes(), 380_000);
        assert_eq!(card.max_edge_pixels(), 1400);
        assert_eq!(card.max_reencodes(), 3);

        let cert = JsCompressionPolicy::medical_certificate();
        assert_eq!(cert.max_edge_pixels(), 1600);
        assert_eq!(cert.inner().max_reencodes, 2);
    }

    #[test]
    fn test_default_is_card() {
        assert_eq!(JsCompressionPolicy::new().inner(), CompressionPolicy::membership_card());
    }
}
