//! Crop modal controller.

use tracing::{debug, info};

use super::{run_with_progress, CancelFlag, CropRequest, CropResult, PipelineError, PipelineState};
use crate::codec::ImageCodec;
use crate::detect::{DocumentDetector, ManualOnly};
use crate::encoder::CompressionPolicy;
use crate::geometry::{CropConfig, CropEngine, CropRect, DisplaySize};
use crate::mapping::ImageSize;

#[derive(Debug)]
struct Session {
    source_uri: String,
    image: ImageSize,
    engine: CropEngine,
}

/// Owns one crop session at a time and runs the pipeline on confirm.
///
/// Mirrors the modal lifecycle: [`open`](Self::open) with a photo, let the
/// user drag through [`engine_mut`](Self::engine_mut), then
/// [`confirm`](Self::confirm) or [`close`](Self::close). A failed confirm
/// keeps the session open so the user can adjust the crop and retry.
#[derive(Debug)]
pub struct CropPipeline<C> {
    codec: C,
    policy: CompressionPolicy,
    config: CropConfig,
    session: Option<Session>,
    state: PipelineState,
    cancel: CancelFlag,
}

impl<C: ImageCodec> CropPipeline<C> {
    pub fn new(codec: C, policy: CompressionPolicy) -> Result<Self, PipelineError> {
        Ok(Self {
            codec,
            policy: policy.validated()?,
            config: CropConfig::default(),
            session: None,
            state: PipelineState::Idle,
            cancel: CancelFlag::new(),
        })
    }

    /// Replace the crop constraints used by future sessions.
    pub fn with_crop_config(mut self, config: CropConfig) -> Result<Self, PipelineError> {
        self.config = config.validated()?;
        Ok(self)
    }

    pub fn codec(&self) -> &C {
        &self.codec
    }

    pub fn policy(&self) -> &CompressionPolicy {
        &self.policy
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    pub fn is_open(&self) -> bool {
        self.session.is_some()
    }

    /// Flag that tears down the current run; usable from another thread.
    pub fn cancel_flag(&self) -> CancelFlag {
        self.cancel.clone()
    }

    /// Open a session for `source_uri` shown in `container`.
    pub fn open(
        &mut self,
        source_uri: &str,
        container: DisplaySize,
    ) -> Result<CropRect, PipelineError> {
        self.open_with_detector(source_uri, container, &ManualOnly)
    }

    /// Open a session, seeding the rectangle from `detector` when it finds
    /// a document.
    ///
    /// Any previous session and any run still in flight are torn down
    /// first. On error no session is open.
    pub fn open_with_detector(
        &mut self,
        source_uri: &str,
        container: DisplaySize,
        detector: &dyn DocumentDetector,
    ) -> Result<CropRect, PipelineError> {
        self.close();

        let image = self
            .codec
            .probe(source_uri)
            .map_err(|e| PipelineError::InvalidSource(e.to_string()))?;
        let fitted = DisplaySize::fit_within(image, container)?;
        let mut engine = CropEngine::new(fitted, self.config)?;

        if let Some(proposed) = detector.detect(source_uri, fitted) {
            engine.set_rect(proposed);
        }
        let rect = engine.rect();

        info!(
            source = source_uri,
            image_width = image.width,
            image_height = image.height,
            display_width = fitted.width,
            display_height = fitted.height,
            "crop session opened"
        );
        self.session = Some(Session {
            source_uri: source_uri.to_string(),
            image,
            engine,
        });
        self.state = PipelineState::Cropping;
        Ok(rect)
    }

    pub fn engine(&self) -> Option<&CropEngine> {
        self.session.as_ref().map(|s| &s.engine)
    }

    pub fn engine_mut(&mut self) -> Option<&mut CropEngine> {
        self.session.as_mut().map(|s| &mut s.engine)
    }

    pub fn source_uri(&self) -> Option<&str> {
        self.session.as_ref().map(|s| s.source_uri.as_str())
    }

    pub fn image_size(&self) -> Option<ImageSize> {
        self.session.as_ref().map(|s| s.image)
    }

    /// Finalize the rectangle and run the pipeline.
    ///
    /// An unfinished drag is ended first. On success the session closes and
    /// the result is within the policy's hard ceiling. A cancelled run
    /// closes the session like [`close`](Self::close); any other failure
    /// leaves it open for another try.
    pub fn confirm(&mut self) -> Result<CropResult, PipelineError> {
        let session = self.session.as_mut().ok_or(PipelineError::NotOpen)?;
        if session.engine.is_active() {
            session.engine.end_session();
        }

        let request = CropRequest {
            source_uri: session.source_uri.clone(),
            rect: session.engine.rect(),
            display: session.engine.display(),
            image: session.image,
        };
        debug!(rect = ?request.rect, "confirming crop");

        let state = &mut self.state;
        let result = run_with_progress(&self.codec, &request, &self.policy, &self.cancel, |s| {
            *state = s
        });

        match &result {
            Ok(_) => self.session = None,
            Err(PipelineError::Cancelled) => self.close(),
            Err(_) => {}
        }
        result
    }

    /// Close the modal: cancel any run in flight and drop the session.
    pub fn close(&mut self) {
        self.cancel.cancel();
        self.cancel = CancelFlag::new();
        if let Some(session) = self.session.take() {
            debug!(source = %session.source_uri, "crop session closed");
        }
        self.state = PipelineState::Idle;
    }

    /// Same as [`close`](Self::close).
    pub fn cancel(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::MemoryCodec;
    use crate::encode::encode_jpeg;
    use crate::geometry::{DragDelta, Handle};
    use crate::testing::ScriptedCodec;

    struct Fixed(CropRect);

    impl DocumentDetector for Fixed {
        fn detect(&self, _source_uri: &str, _display: DisplaySize) -> Option<CropRect> {
            Some(self.0)
        }
    }

    fn scripted(sizes: Vec<usize>) -> CropPipeline<ScriptedCodec> {
        CropPipeline::new(ScriptedCodec::new(sizes), CompressionPolicy::membership_card()).unwrap()
    }

    fn container() -> DisplaySize {
        DisplaySize::new(320.0, 320.0).unwrap()
    }

    #[test]
    fn test_open_fits_and_centers() {
        let mut pipeline = scripted(vec![1]);

        let rect = pipeline.open("photo", container()).unwrap();

        // 4000x3000 contained in 320x320 renders at 320x240
        let engine = pipeline.engine().unwrap();
        assert_eq!(engine.display(), DisplaySize::new(320.0, 240.0).unwrap());
        assert!((rect.left - 25.6).abs() < 1e-9);
        assert!((rect.bottom - 220.8).abs() < 1e-9);
        assert_eq!(pipeline.state(), PipelineState::Cropping);
        assert_eq!(pipeline.image_size(), ImageSize::new(4000, 3000).ok());
    }

    #[test]
    fn test_open_invalid_source() {
        let codec = ScriptedCodec::new(vec![1]).with_image(None);
        let mut pipeline = CropPipeline::new(codec, CompressionPolicy::membership_card()).unwrap();

        let err = pipeline.open("missing", container()).unwrap_err();
        assert!(matches!(err, PipelineError::InvalidSource(_)));
        assert_eq!(err.user_message(), "Cannot load image.");
        assert!(!pipeline.is_open());
        assert_eq!(pipeline.state(), PipelineState::Idle);
    }

    #[test]
    fn test_open_with_detector_normalizes_proposal() {
        let mut pipeline = scripted(vec![1]);

        let rect = pipeline
            .open_with_detector(
                "photo",
                container(),
                &Fixed(CropRect::new(-50.0, 10.0, 500.0, 200.0)),
            )
            .unwrap();

        assert_eq!(rect, CropRect::new(0.0, 10.0, 320.0, 200.0));
    }

    #[test]
    fn test_confirm_without_session() {
        let mut pipeline = scripted(vec![1]);
        assert!(matches!(pipeline.confirm(), Err(PipelineError::NotOpen)));
    }

    #[test]
    fn test_confirm_ends_active_drag_and_closes() {
        let mut pipeline = scripted(vec![200_000]);
        pipeline.open("photo", container()).unwrap();

        let engine = pipeline.engine_mut().unwrap();
        engine.begin_session(Handle::BottomRight).unwrap();
        engine.update(DragDelta::new(-1000.0, -1000.0));

        let result = pipeline.confirm().unwrap();

        // an 80x80 display crop of a 320-wide view is 1000x1000 source pixels
        assert_eq!((result.width, result.height), (1000, 1000));
        assert_eq!(pipeline.state(), PipelineState::Done);
        assert!(!pipeline.is_open());
    }

    #[test]
    fn test_failed_confirm_keeps_session_for_retry() {
        let codec = ScriptedCodec::new(vec![900_000, 900_000, 900_000, 900_000, 100_000]);
        let mut pipeline = CropPipeline::new(codec, CompressionPolicy::membership_card()).unwrap();
        pipeline.open("photo", container()).unwrap();

        let err = pipeline.confirm().unwrap_err();
        assert!(err.is_retryable());
        assert_eq!(pipeline.state(), PipelineState::Failed);
        assert!(pipeline.is_open());

        let result = pipeline.confirm().unwrap();
        assert_eq!(result.size_bytes, 100_000);
    }

    #[test]
    fn test_close_cancels_and_resets() {
        let mut pipeline = scripted(vec![1]);
        pipeline.open("photo", container()).unwrap();
        let flag = pipeline.cancel_flag();

        pipeline.close();

        assert!(flag.is_cancelled());
        assert!(!pipeline.cancel_flag().is_cancelled());
        assert!(pipeline.engine().is_none());
        assert_eq!(pipeline.state(), PipelineState::Idle);
    }

    #[test]
    fn test_cancelled_confirm_closes_session() {
        let mut pipeline = scripted(vec![100_000]);
        pipeline.open("photo", container()).unwrap();
        // cancelled from another thread, e.g. the host's close button
        pipeline.cancel_flag().cancel();

        let err = pipeline.confirm().unwrap_err();

        assert!(matches!(err, PipelineError::Cancelled));
        assert!(!pipeline.is_open());
        assert!(!pipeline.cancel_flag().is_cancelled());
        assert_eq!(pipeline.state(), PipelineState::Idle);

        pipeline.open("photo", container()).unwrap();
        assert_eq!(pipeline.confirm().unwrap().size_bytes, 100_000);
    }

    #[test]
    fn test_reopen_replaces_session() {
        let mut pipeline = scripted(vec![1]);
        pipeline.open("first", container()).unwrap();
        let old_flag = pipeline.cancel_flag();

        pipeline.open("second", container()).unwrap();

        assert!(old_flag.is_cancelled());
        assert_eq!(pipeline.source_uri(), Some("second"));
    }

    #[test]
    fn test_custom_crop_config() {
        let config = CropConfig {
            min_size: 40.0,
            inset_ratio: 0.0,
        };
        let mut pipeline = scripted(vec![1]).with_crop_config(config).unwrap();

        let rect = pipeline.open("photo", container()).unwrap();
        assert_eq!(rect, CropRect::new(0.0, 0.0, 320.0, 240.0));
    }

    #[test]
    fn test_end_to_end_with_memory_codec() {
        let codec = MemoryCodec::new();
        let jpeg = encode_jpeg(&vec![120u8; 800 * 600 * 3], 800, 600, 95).unwrap();
        let uri = codec.insert_source(jpeg).unwrap();

        let mut pipeline =
            CropPipeline::new(codec, CompressionPolicy::medical_certificate()).unwrap();
        pipeline.open(&uri, DisplaySize::new(400.0, 400.0).unwrap()).unwrap();

        let result = pipeline.confirm().unwrap();

        // centered 8% inset of 800x600: 672x504
        assert_eq!((result.width, result.height), (672, 504));
        assert!(result.size_bytes <= 700_000);
        assert!(pipeline.codec().contains(&result.uri));
    }
}
