//! Crop modal bindings.
//!
//! `JsCropModal` owns an in-memory codec and one crop session at a time.
//! The host feeds it photo bytes and drag events, then calls `confirm()`;
//! the returned result is always within the policy's hard ceiling.
//!
//! ```typescript
//! const modal = new JsCropModal(JsCompressionPolicy.membership_card());
//! modal.open(bytes, container.clientWidth, container.clientHeight);
//!
//! // pointerdown
//! const handle = modal.hit_test(x, y, 24) ?? 'move';
//! modal.begin_drag(handle);
//! // pointermove: cumulative offset since pointerdown
//! const rect = modal.drag(dx, dy);
//! // pointerup
//! modal.end_drag();
//!
//! try {
//!   const result = modal.confirm();
//!   onConfirm(result);
//! } catch (message) {
//!   showToast(message); // session stays open for another try
//! }
//! ```

use cardcrop_core::geometry::SessionError;
use cardcrop_core::{
    CropConfig, CropPipeline, DisplaySize, DragDelta, Handle, ImageCodec, MemoryCodec,
    PipelineError,
};
use thiserror::Error;
use wasm_bindgen::prelude::*;

use crate::log;
use crate::policy::JsCompressionPolicy;
use crate::types::{JsCropRect, JsCropResult};

/// Failure of a modal call, before conversion to a JavaScript string.
#[derive(Debug, Error)]
pub(crate) enum ModalError {
    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    #[error(transparent)]
    Session(#[from] SessionError),
}

impl ModalError {
    /// Message shown to the user.
    pub(crate) fn user_message(&self) -> String {
        match self {
            ModalError::Pipeline(e) => e.user_message().to_string(),
            ModalError::Session(e) => e.to_string(),
        }
    }
}

fn to_js(err: ModalError) -> JsValue {
    log::warn(&format!("cardcrop: {err}"));
    JsValue::from_str(&err.user_message())
}

/// Crop modal for JavaScript hosts.
#[wasm_bindgen]
pub struct JsCropModal {
    pipeline: CropPipeline<MemoryCodec>,
    source_uri: Option<String>,
}

#[wasm_bindgen]
impl JsCropModal {
    #[wasm_bindgen(constructor)]
    pub fn new(policy: &JsCompressionPolicy) -> Result<JsCropModal, JsValue> {
        Self::build(policy, CropConfig::default()).map_err(to_js)
    }

    /// Modal with custom minimum crop size and initial inset.
    pub fn with_crop_config(
        policy: &JsCompressionPolicy,
        min_size: f64,
        inset_ratio: f64,
    ) -> Result<JsCropModal, JsValue> {
        let config = CropConfig {
            min_size,
            inset_ratio,
        };
        Self::build(policy, config).map_err(to_js)
    }

    /// Load photo bytes and open a session; returns the initial rectangle.
    pub fn open(
        &mut self,
        bytes: Vec<u8>,
        container_width: f64,
        container_height: f64,
    ) -> Result<JsCropRect, JsValue> {
        self.try_open(bytes, container_width, container_height)
            .map_err(to_js)
    }

    #[wasm_bindgen(getter)]
    pub fn is_open(&self) -> bool {
        self.pipeline.is_open()
    }

    /// Rendered image width, or 0 with no session
    #[wasm_bindgen(getter)]
    pub fn display_width(&self) -> f64 {
        self.pipeline.engine().map_or(0.0, |e| e.display().width)
    }

    /// Rendered image height, or 0 with no session
    #[wasm_bindgen(getter)]
    pub fn display_height(&self) -> f64 {
        self.pipeline.engine().map_or(0.0, |e| e.display().height)
    }

    /// Current orchestrator state name (`idle`, `cropping`, ...).
    #[wasm_bindgen(getter)]
    pub fn state(&self) -> String {
        state_name(&self.pipeline.state())
    }

    pub fn rect(&self) -> Option<JsCropRect> {
        self.pipeline.engine().map(|e| e.rect().into())
    }

    /// Handle under a display point, as a handle name.
    pub fn hit_test(&self, x: f64, y: f64, tolerance: f64) -> Option<String> {
        self.pipeline
            .engine()
            .and_then(|e| e.hit_test(x, y, tolerance))
            .map(|h| h.as_str().to_string())
    }

    /// Start a drag with one of `move`, `top`, `bottom`, `left`, `right`,
    /// `topLeft`, `topRight`, `bottomLeft`, `bottomRight`.
    pub fn begin_drag(&mut self, handle: &str) -> Result<(), JsValue> {
        self.try_begin_drag(handle).map_err(to_js)
    }

    /// Apply the cumulative pointer offset since `begin_drag`.
    pub fn drag(&mut self, dx: f64, dy: f64) -> Result<JsCropRect, JsValue> {
        self.try_drag(dx, dy).map_err(to_js)
    }

    pub fn end_drag(&mut self) -> Option<JsCropRect> {
        self.pipeline.engine_mut().map(|e| e.end_session().into())
    }

    /// Map, encode and compress the current crop.
    ///
    /// Throws a user-facing message on failure; the session stays open.
    pub fn confirm(&mut self) -> Result<JsCropResult, JsValue> {
        self.try_confirm().map_err(to_js)
    }

    /// Close the modal and drop the loaded photo.
    pub fn close(&mut self) {
        self.pipeline.close();
        self.release_source();
    }
}

impl JsCropModal {
    fn build(policy: &JsCompressionPolicy, config: CropConfig) -> Result<Self, ModalError> {
        let pipeline =
            CropPipeline::new(MemoryCodec::new(), policy.inner())?.with_crop_config(config)?;
        Ok(Self {
            pipeline,
            source_uri: None,
        })
    }

    pub(crate) fn try_open(
        &mut self,
        bytes: Vec<u8>,
        container_width: f64,
        container_height: f64,
    ) -> Result<JsCropRect, ModalError> {
        self.close();

        let container = DisplaySize::new(container_width, container_height)
            .map_err(PipelineError::from)?;
        let uri = self.pipeline.codec().insert_source(bytes).map_err(PipelineError::from)?;
        self.source_uri = Some(uri.clone());

        match self.pipeline.open(&uri, container) {
            Ok(rect) => Ok(rect.into()),
            Err(e) => {
                self.release_source();
                Err(e.into())
            }
        }
    }

    pub(crate) fn try_begin_drag(&mut self, handle: &str) -> Result<(), ModalError> {
        let handle: Handle = handle.parse()?;
        self.engine_mut()?.begin_session(handle)?;
        Ok(())
    }

    pub(crate) fn try_drag(&mut self, dx: f64, dy: f64) -> Result<JsCropRect, ModalError> {
        Ok(self.engine_mut()?.update(DragDelta::new(dx, dy)).into())
    }

    pub(crate) fn try_confirm(&mut self) -> Result<JsCropResult, ModalError> {
        let result = match self.pipeline.confirm() {
            Ok(result) => result,
            Err(e) => {
                // a cancelled run closes the session
                if !self.pipeline.is_open() {
                    self.release_source();
                }
                return Err(e.into());
            }
        };

        let codec = self.pipeline.codec();
        let bytes = codec.get(&result.uri).map_err(PipelineError::from)?;
        let bytes = (*bytes).clone();
        if let Err(e) = codec.release(&result.uri) {
            log::warn(&format!("cardcrop: failed to release result: {e}"));
        }
        self.release_source();

        Ok(JsCropResult::new(
            result,
            self.pipeline.policy().format.mime_type(),
            bytes,
        ))
    }

    fn engine_mut(&mut self) -> Result<&mut cardcrop_core::CropEngine, ModalError> {
        self.pipeline
            .engine_mut()
            .ok_or(ModalError::Pipeline(PipelineError::NotOpen))
    }

    fn release_source(&mut self) {
        if let Some(uri) = self.source_uri.take() {
            if let Err(e) = self.pipeline.codec().release(&uri) {
                log::warn(&format!("cardcrop: failed to release source: {e}"));
            }
        }
    }

    #[cfg(test)]
    pub(crate) fn stored_blobs(&self) -> usize {
        self.pipeline.codec().len()
    }
}

fn state_name(state: &cardcrop_core::PipelineState) -> String {
    use cardcrop_core::PipelineState::*;
    match state {
        Idle => "idle",
        Cropping => "cropping",
        Mapping => "mapping",
        Encoding => "encoding",
        Compressing { .. } => "compressing",
        Done => "done",
        Failed => "failed",
    }
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use cardcrop_core::encode::encode_jpeg;

    fn photo(width: u32, height: u32) -> Vec<u8> {
        let pixels: Vec<u8> = (0..width * height * 3).map(|i| (i % 239) as u8).collect();
        encode_jpeg(&pixels, width, height, 90).unwrap()
    }

    fn modal() -> JsCropModal {
        JsCropModal::build(&JsCompressionPolicy::membership_card(), CropConfig::default()).unwrap()
    }

    #[test]
    fn test_open_reports_initial_rect() {
        let mut modal = modal();
        let rect = modal.try_open(photo(400, 300), 320.0, 320.0).unwrap();

        assert!(modal.is_open());
        assert_eq!(modal.display_width(), 320.0);
        assert_eq!(modal.display_height(), 240.0);
        assert!((rect.left() - 25.6).abs() < 1e-9);
        assert_eq!(modal.state(), "cropping");
    }

    #[test]
    fn test_open_rejects_garbage_bytes() {
        let mut modal = modal();
        let err = modal.try_open(vec![1, 2, 3], 320.0, 320.0).unwrap_err();

        assert_eq!(err.user_message(), "Cannot load image.");
        assert!(!modal.is_open());
        assert_eq!(modal.stored_blobs(), 0);
    }

    #[test]
    fn test_drag_requires_open_session() {
        let mut modal = modal();
        assert!(matches!(
            modal.try_begin_drag("move"),
            Err(ModalError::Pipeline(PipelineError::NotOpen))
        ));
        assert!(modal.end_drag().is_none());
    }

    #[test]
    fn test_error_display_is_transparent() {
        let err = ModalError::from(PipelineError::NotOpen);
        assert_eq!(err.to_string(), PipelineError::NotOpen.to_string());
        assert_eq!(err.user_message(), "Cropping was cancelled.");
    }

    #[test]
    fn test_unknown_handle() {
        let mut modal = modal();
        modal.try_open(photo(400, 300), 320.0, 240.0).unwrap();
        assert!(matches!(
            modal.try_begin_drag("middle"),
            Err(ModalError::Session(SessionError::UnknownHandle(_)))
        ));
    }

    #[test]
    fn test_corner_drag_and_confirm() {
        let mut modal = modal();
        modal.try_open(photo(400, 300), 320.0, 240.0).unwrap();

        assert_eq!(modal.hit_test(294.4, 220.8, 10.0).as_deref(), Some("bottomRight"));
        modal.try_begin_drag("bottomRight").unwrap();
        let rect = modal.try_drag(-1000.0, -1000.0).unwrap();
        assert!((rect.width() - 80.0).abs() < 1e-9);
        assert!((rect.height() - 80.0).abs() < 1e-9);
        modal.end_drag();

        let result = modal.try_confirm().unwrap();

        // 80 display px of a 320 px view over a 400 px photo
        assert_eq!((result.width(), result.height()), (100, 100));
        assert_eq!(&result.bytes()[0..2], &[0xFF, 0xD8]);
        assert!(result.data_url().unwrap().starts_with("data:image/jpeg;base64,"));
        assert!(!modal.is_open());
        assert_eq!(modal.stored_blobs(), 0);
    }

    #[test]
    fn test_cancelled_confirm_drops_source() {
        let mut modal = modal();
        modal.try_open(photo(64, 64), 200.0, 200.0).unwrap();
        modal.pipeline.cancel_flag().cancel();

        let err = modal.try_confirm().unwrap_err();

        assert_eq!(err.user_message(), "Cropping was cancelled.");
        assert!(!modal.is_open());
        assert_eq!(modal.stored_blobs(), 0);
    }

    #[test]
    fn test_close_drops_source() {
        let mut modal = modal();
        modal.try_open(photo(64, 64), 200.0, 200.0).unwrap();
        assert_eq!(modal.stored_blobs(), 1);

        modal.close();
        assert_eq!(modal.stored_blobs(), 0);
        assert_eq!(modal.state(), "idle");
        assert!(modal.rect().is_none());
    }
}
