//! Critique session state machine.
//!
//! Drives one practice round: pose the cube, capture, upload a drawing,
//! optionally crop it to the capture's aspect, analyze, show the result.
//! The comparison runs on a worker thread; results come back through an
//! inbox drained by [`CritiqueSession::poll`] on the UI thread. Every
//! request carries an id and only the current one may change the session,
//! so a late answer from an abandoned or reset round is dropped.

mod error;
mod state;

pub use error::{ActionError, SessionError};
pub use state::{ANALYZING_CAPTIONS, SessionState};

use std::sync::Arc;
use std::time::{Duration, Instant};

use image::RgbaImage;
use image::imageops::{self, FilterType};
use parking_lot::Mutex;
use pt_core::{
    CameraConfig, CubePose, Difficulty, EdgeSegment, FailureKind, Normalized, PerspectiveMode,
    PixelRect, fit_aspect,
};
use pt_critique::{
    Comparator, ComparisonPhase, ComparisonRequest, ComparisonResult, CritiqueError, InlineImage,
};
use pt_renderer::{CaptureController, CaptureHandoff, CaptureResult, CaptureSurface};
use uuid::Uuid;

use crate::config::SessionConfig;
use crate::progress::{CritiqueRecord, CritiqueReward, ProgressRecorder};

enum WorkerMessage {
    Phase {
        id: Uuid,
        phase: ComparisonPhase,
    },
    Finished {
        id: Uuid,
        outcome: Result<ComparisonResult, CritiqueError>,
    },
}

type Inbox = Arc<Mutex<Vec<WorkerMessage>>>;

struct InFlight {
    id: Uuid,
    started: Instant,
    difficulty: Difficulty,
    phase: Option<ComparisonPhase>,
}

/// Everything the worker needs for one comparison
struct Job {
    id: Uuid,
    capture: Arc<CaptureResult>,
    drawing: Arc<RgbaImage>,
    reference_edges: Option<Vec<EdgeSegment<Normalized>>>,
    difficulty: Difficulty,
}

impl Job {
    fn request(&self) -> Result<ComparisonRequest, CritiqueError> {
        Ok(ComparisonRequest {
            reference: InlineImage::from_rgba(&self.capture.solid)?,
            drawing: InlineImage::from_rgba(&self.drawing)?,
            reference_edges: self.reference_edges.clone(),
            difficulty: self.difficulty,
            mode: self.capture.camera.mode,
        })
    }

    fn run(self, comparator: Arc<dyn Comparator>, inbox: Inbox) {
        let id = self.id;
        let outcome = self.request().and_then(|request| {
            comparator.compare(&request, &mut |phase| {
                inbox.lock().push(WorkerMessage::Phase { id, phase });
            })
        });
        inbox.lock().push(WorkerMessage::Finished { id, outcome });
    }
}

/// One practice round
pub struct CritiqueSession {
    config: SessionConfig,
    comparator: Arc<dyn Comparator>,
    recorder: Box<dyn ProgressRecorder>,
    state: SessionState,
    pose: CubePose,
    camera: CameraConfig,
    capture: Option<Arc<CaptureResult>>,
    upload: Option<RgbaImage>,
    suggested_crop: Option<PixelRect>,
    drawing: Option<Arc<RgbaImage>>,
    result: Option<ComparisonResult>,
    reward: Option<CritiqueReward>,
    error: Option<SessionError>,
    in_flight: Option<InFlight>,
    inbox: Inbox,
}

impl CritiqueSession {
    pub fn new(
        comparator: Arc<dyn Comparator>,
        recorder: Box<dyn ProgressRecorder>,
        config: SessionConfig,
        mode: PerspectiveMode,
    ) -> Self {
        Self {
            config,
            comparator,
            recorder,
            state: SessionState::Posing,
            pose: CubePose::preset(mode),
            camera: CameraConfig::preset(mode),
            capture: None,
            upload: None,
            suggested_crop: None,
            drawing: None,
            result: None,
            reward: None,
            error: None,
            in_flight: None,
            inbox: Arc::default(),
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn pose(&self) -> &CubePose {
        &self.pose
    }

    pub fn camera(&self) -> &CameraConfig {
        &self.camera
    }

    pub fn mode(&self) -> PerspectiveMode {
        self.camera.mode
    }

    pub fn capture(&self) -> Option<&Arc<CaptureResult>> {
        self.capture.as_ref()
    }

    /// Drawing waiting for a crop
    pub fn upload(&self) -> Option<&RgbaImage> {
        self.upload.as_ref()
    }

    pub fn suggested_crop(&self) -> Option<PixelRect> {
        self.suggested_crop
    }

    /// Drawing sized to the capture crop
    pub fn drawing(&self) -> Option<&Arc<RgbaImage>> {
        self.drawing.as_ref()
    }

    pub fn result(&self) -> Option<&ComparisonResult> {
        self.result.as_ref()
    }

    pub fn reward(&self) -> Option<CritiqueReward> {
        self.reward
    }

    pub fn error(&self) -> Option<&SessionError> {
        self.error.as_ref()
    }

    pub fn phase(&self) -> Option<ComparisonPhase> {
        self.in_flight.as_ref().and_then(|f| f.phase)
    }

    /// Id of the comparison in flight
    pub fn request_id(&self) -> Option<Uuid> {
        self.in_flight.as_ref().map(|f| f.id)
    }

    fn require(&self, action: &'static str, allowed: &[SessionState]) -> Result<(), ActionError> {
        if allowed.contains(&self.state) {
            Ok(())
        } else {
            Err(ActionError::InvalidState {
                action,
                state: self.state,
            })
        }
    }

    /// Switch perspective preset; resets pose and camera.
    pub fn set_mode(&mut self, mode: PerspectiveMode) -> Result<(), ActionError> {
        self.require("change perspective", &[SessionState::Posing])?;
        self.pose = CubePose::preset(mode);
        self.camera = CameraConfig::preset(mode);
        Ok(())
    }

    /// Rotate the cube about Y. Ignored outside posing.
    pub fn rotate_cube(&mut self, delta: f32) {
        if self.state == SessionState::Posing {
            self.pose.rotate(delta, self.camera.mode);
        }
    }

    /// Drag the cube on the ground plane. Ignored outside posing.
    pub fn move_cube(&mut self, dx: f32, dz: f32) {
        if self.state == SessionState::Posing {
            self.pose.translate(dx, dz);
        }
    }

    /// Orbit the free camera. Ignored outside posing.
    pub fn orbit_camera(&mut self, delta_yaw: f32, delta_pitch: f32) {
        if self.state == SessionState::Posing {
            self.camera.orbit(delta_yaw, delta_pitch);
        }
    }

    /// Eye height in three-point mode. Ignored outside posing.
    pub fn set_camera_height(&mut self, height: f32) {
        if self.state == SessionState::Posing && self.camera.mode == PerspectiveMode::ThreePoint {
            self.camera.height = height;
        }
    }

    /// Capture the posed cube and move on to the drawing upload.
    pub fn capture_scene<S: CaptureSurface + ?Sized>(
        &mut self,
        surface: &mut S,
        controller: &CaptureController,
    ) -> Result<CaptureHandoff, ActionError> {
        self.require("capture", &[SessionState::Posing])?;
        let capture = Arc::new(controller.capture(surface, &self.pose, &self.camera)?);
        tracing::info!(
            "Captured {} scene, crop {}x{}",
            self.camera.mode.name(),
            capture.crop.width,
            capture.crop.height
        );

        self.capture = Some(Arc::clone(&capture));
        self.upload = None;
        self.suggested_crop = None;
        self.drawing = None;
        self.state = SessionState::DrawingUpload;
        Ok(CaptureHandoff::new(capture))
    }

    /// Accept the user's drawing.
    ///
    /// A drawing whose aspect matches the capture crop is resized to the
    /// crop size right away; otherwise the session enters
    /// [`SessionState::Cropping`] with a centred suggestion.
    pub fn upload_drawing(&mut self, image: RgbaImage) -> Result<(), ActionError> {
        self.require("upload a drawing", &[SessionState::DrawingUpload, SessionState::Cropping])?;
        let (crop_w, crop_h) = self.crop_size()?;
        let (w, h) = image.dimensions();
        if w == 0 || h == 0 {
            return Err(ActionError::Drawing("image is empty".to_string()));
        }

        let ratio = (w as f32 / h as f32) / (crop_w as f32 / crop_h as f32);
        if (ratio - 1.0).abs() <= self.config.aspect_tolerance {
            self.drawing = Some(Arc::new(fit_to(&image, crop_w, crop_h)));
            self.upload = None;
            self.suggested_crop = None;
            self.state = SessionState::DrawingUpload;
        } else {
            tracing::debug!("Drawing aspect {:.3} differs from capture; cropping", ratio);
            self.suggested_crop = Some(fit_aspect(w, h, crop_w, crop_h));
            self.upload = Some(image);
            self.drawing = None;
            self.state = SessionState::Cropping;
        }
        Ok(())
    }

    /// Crop the uploaded drawing (to `rect`, or the suggestion) and resize it
    /// to the capture crop.
    pub fn confirm_crop(&mut self, rect: Option<PixelRect>) -> Result<(), ActionError> {
        self.require("confirm a crop", &[SessionState::Cropping])?;
        let (crop_w, crop_h) = self.crop_size()?;
        let upload = self
            .upload
            .as_ref()
            .ok_or_else(|| ActionError::NotReady("No drawing to crop".to_string()))?;
        let rect = rect
            .or(self.suggested_crop)
            .ok_or_else(|| ActionError::NotReady("No crop selected".to_string()))?;
        let (w, h) = upload.dimensions();
        if !rect.fits_within(w, h) {
            return Err(ActionError::Drawing(format!(
                "crop {}x{} at ({}, {}) is outside the {}x{} drawing",
                rect.width, rect.height, rect.x, rect.y, w, h
            )));
        }

        // Keep the capture aspect even if the user dragged a free rectangle
        let inner = fit_aspect(rect.width, rect.height, crop_w, crop_h);
        let cropped = imageops::crop_imm(
            upload,
            rect.x + inner.x,
            rect.y + inner.y,
            inner.width,
            inner.height,
        )
        .to_image();

        self.drawing = Some(Arc::new(fit_to(&cropped, crop_w, crop_h)));
        self.upload = None;
        self.suggested_crop = None;
        self.state = SessionState::DrawingUpload;
        Ok(())
    }

    /// Start the comparison.
    pub fn submit(&mut self, now: Instant) -> Result<Uuid, ActionError> {
        self.require("submit", &[SessionState::DrawingUpload])?;
        self.start_analysis(now)
    }

    /// Re-run the comparison with the same capture and drawing.
    pub fn retry(&mut self, now: Instant) -> Result<Uuid, ActionError> {
        self.require("retry", &[SessionState::Error])?;
        self.start_analysis(now)
    }

    fn start_analysis(&mut self, now: Instant) -> Result<Uuid, ActionError> {
        let capture = self
            .capture
            .clone()
            .ok_or_else(|| ActionError::NotReady("Capture the cube first".to_string()))?;
        let drawing = self
            .drawing
            .clone()
            .ok_or_else(|| ActionError::NotReady("Upload a drawing first".to_string()))?;

        self.result = None;
        self.reward = None;
        self.error = None;

        let id = Uuid::new_v4();
        let difficulty = self.recorder.difficulty();
        let job = Job {
            id,
            reference_edges: self
                .config
                .use_ground_truth_reference
                .then(|| capture.normalized_ground_truth()),
            capture,
            drawing,
            difficulty,
        };

        let comparator = Arc::clone(&self.comparator);
        let inbox = Arc::clone(&self.inbox);
        let spawned = std::thread::Builder::new()
            .name("critique-worker".to_string())
            .spawn(move || job.run(comparator, inbox));
        if let Err(e) = spawned {
            let error = SessionError::new(FailureKind::Unknown, format!("Could not start analysis: {e}"));
            tracing::error!("{}", error);
            self.error = Some(error.clone());
            self.state = SessionState::Error;
            return Err(ActionError::NotReady(error.message));
        }

        tracing::info!("Analysis {} started ({})", id, difficulty);
        self.in_flight = Some(InFlight {
            id,
            started: now,
            difficulty,
            phase: None,
        });
        self.state = SessionState::Analyzing;
        Ok(id)
    }

    /// Apply worker messages. Returns whether anything changed.
    pub fn poll(&mut self) -> bool {
        let messages = std::mem::take(&mut *self.inbox.lock());
        let mut changed = false;

        for message in messages {
            match message {
                WorkerMessage::Phase { id, phase } => match self.in_flight.as_mut() {
                    Some(flight) if flight.id == id => {
                        flight.phase = Some(phase);
                        changed = true;
                    }
                    _ => tracing::debug!("Dropping stale progress from {}", id),
                },
                WorkerMessage::Finished { id, outcome } => {
                    let Some(flight) = self.in_flight.take_if(|f| f.id == id) else {
                        tracing::debug!("Dropping stale result from {}", id);
                        continue;
                    };
                    match outcome {
                        Ok(result) => self.finish(result, flight.difficulty),
                        Err(e) => {
                            tracing::warn!("Analysis {} failed: {}", id, e);
                            self.error = Some(SessionError::from(&e));
                            self.state = SessionState::Error;
                        }
                    }
                    changed = true;
                }
            }
        }
        changed
    }

    fn finish(&mut self, result: ComparisonResult, difficulty: Difficulty) {
        let record = CritiqueRecord {
            thumbnail: self.thumbnail(),
            grade: result.grade,
            feedback: result.feedback.clone(),
            difficulty,
        };
        self.reward = match self.recorder.record_critique(record) {
            Ok(reward) => Some(reward),
            Err(e) => {
                tracing::warn!("Failed to record critique: {}", e);
                None
            }
        };
        self.result = Some(result);
        self.state = SessionState::Result;
    }

    fn thumbnail(&self) -> String {
        let Some(drawing) = &self.drawing else {
            return String::new();
        };
        let size = self.config.thumbnail_size.max(1);
        let (w, h) = drawing.dimensions();
        let scale = (size as f32 / w.max(h) as f32).min(1.0);
        let thumb = imageops::thumbnail(
            &**drawing,
            ((w as f32 * scale).round() as u32).max(1),
            ((h as f32 * scale).round() as u32).max(1),
        );
        match InlineImage::from_rgba(&thumb) {
            Ok(image) => image.to_data_uri(),
            Err(e) => {
                tracing::warn!("Thumbnail encoding failed: {}", e);
                String::new()
            }
        }
    }

    /// Time spent analyzing
    pub fn elapsed(&self, now: Instant) -> Option<Duration> {
        self.in_flight
            .as_ref()
            .map(|f| now.saturating_duration_since(f.started))
    }

    /// Caption for the current analysis time
    pub fn caption(&self, now: Instant) -> Option<&'static str> {
        let elapsed = self.elapsed(now)?;
        let step = elapsed.as_millis() / self.config.caption_interval().as_millis();
        Some(ANALYZING_CAPTIONS[(step % ANALYZING_CAPTIONS.len() as u128) as usize])
    }

    /// Whether the user may abandon the analysis
    pub fn can_cancel(&self, now: Instant) -> bool {
        self.elapsed(now)
            .is_some_and(|e| e >= self.config.cancel_after())
    }

    /// Stop waiting for the analysis.
    ///
    /// The request is not aborted; its answer is ignored when it arrives.
    pub fn cancel(&mut self, now: Instant) -> Result<(), ActionError> {
        self.require("cancel", &[SessionState::Analyzing])?;
        let elapsed = self.elapsed(now).unwrap_or_default();
        if elapsed < self.config.cancel_after() {
            return Err(ActionError::NotReady(format!(
                "You can stop waiting after {} seconds",
                self.config.cancel_after_secs
            )));
        }

        if let Some(flight) = self.in_flight.take() {
            tracing::info!("Analysis {} abandoned after {:?}", flight.id, elapsed);
        }
        self.error = Some(SessionError::new(
            FailureKind::Timeout,
            format!(
                "Stopped waiting after {} seconds. Your capture and drawing are kept, so you can retry.",
                elapsed.as_secs()
            ),
        ));
        self.state = SessionState::Error;
        Ok(())
    }

    /// Drop everything and return to posing.
    pub fn reset(&mut self) {
        let mode = self.camera.mode;
        if let Some(flight) = self.in_flight.take() {
            tracing::debug!("Reset while analysis {} in flight", flight.id);
        }
        self.inbox.lock().clear();
        self.pose = CubePose::preset(mode);
        self.camera = CameraConfig::preset(mode);
        self.capture = None;
        self.upload = None;
        self.suggested_crop = None;
        self.drawing = None;
        self.result = None;
        self.reward = None;
        self.error = None;
        self.state = SessionState::Posing;
    }

    fn crop_size(&self) -> Result<(u32, u32), ActionError> {
        self.capture
            .as_ref()
            .map(|c| c.crop_size())
            .filter(|&(w, h)| w > 0 && h > 0)
            .ok_or_else(|| ActionError::NotReady("Capture the cube first".to_string()))
    }
}

fn fit_to(image: &RgbaImage, width: u32, height: u32) -> RgbaImage {
    if image.dimensions() == (width, height) {
        image.clone()
    } else {
        imageops::resize(image, width, height, FilterType::Triangle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::LocalProgress;
    use pt_renderer::{CaptureConfig, SoftwareSurface};

    struct NeverCalled;

    impl Comparator for NeverCalled {
        fn compare(
            &self,
            _request: &ComparisonRequest,
            _progress: &mut dyn FnMut(ComparisonPhase),
        ) -> Result<ComparisonResult, CritiqueError> {
            Err(CritiqueError::Network("offline".to_string()))
        }
    }

    fn session() -> CritiqueSession {
        CritiqueSession::new(
            Arc::new(NeverCalled),
            Box::new(LocalProgress::in_memory(Difficulty::Beginner)),
            SessionConfig::default(),
            PerspectiveMode::TwoPoint,
        )
    }

    fn captured() -> CritiqueSession {
        let config = CaptureConfig {
            viewport_width: 200,
            viewport_height: 150,
            ..Default::default()
        };
        let mut s = session();
        let mut surface = SoftwareSurface::new(&config);
        s.capture_scene(&mut surface, &CaptureController::new(config)).unwrap();
        s
    }

    #[test]
    fn test_actions_rejected_in_wrong_state() {
        let mut s = session();
        assert!(matches!(
            s.submit(Instant::now()),
            Err(ActionError::InvalidState { state: SessionState::Posing, .. })
        ));
        assert!(s.upload_drawing(RgbaImage::new(10, 10)).is_err());
        assert!(s.confirm_crop(None).is_err());
        assert!(s.retry(Instant::now()).is_err());
        assert!(s.cancel(Instant::now()).is_err());
    }

    #[test]
    fn test_capture_moves_to_upload() {
        let s = captured();
        assert_eq!(s.state(), SessionState::DrawingUpload);
        assert!(s.capture().is_some());
    }

    #[test]
    fn test_matching_aspect_skips_cropping() {
        let mut s = captured();
        let (w, h) = s.capture().unwrap().crop_size();
        s.upload_drawing(RgbaImage::new(w * 3, h * 3)).unwrap();
        assert_eq!(s.state(), SessionState::DrawingUpload);
        assert_eq!(s.drawing().unwrap().dimensions(), (w, h));
    }

    #[test]
    fn test_mismatched_aspect_requires_crop() {
        let mut s = captured();
        let (w, h) = s.capture().unwrap().crop_size();
        s.upload_drawing(RgbaImage::new(w * 4, h)).unwrap();
        assert_eq!(s.state(), SessionState::Cropping);
        assert!(s.drawing().is_none());
        assert!(s.submit(Instant::now()).is_err());

        let suggestion = s.suggested_crop().unwrap();
        assert_eq!(suggestion.height, h);

        s.confirm_crop(None).unwrap();
        assert_eq!(s.state(), SessionState::DrawingUpload);
        assert_eq!(s.drawing().unwrap().dimensions(), (w, h));
    }

    #[test]
    fn test_crop_outside_drawing_rejected() {
        let mut s = captured();
        let (w, h) = s.capture().unwrap().crop_size();
        s.upload_drawing(RgbaImage::new(w * 4, h)).unwrap();
        let err = s.confirm_crop(Some(PixelRect::new(w * 4, 0, 10, 10))).unwrap_err();
        assert!(matches!(err, ActionError::Drawing(_)));
        assert_eq!(s.state(), SessionState::Cropping);
    }

    #[test]
    fn test_pose_locked_after_capture() {
        let mut s = captured();
        let before = *s.pose();
        s.rotate_cube(0.5);
        s.move_cube(1.0, 1.0);
        assert_eq!(*s.pose(), before);
        assert!(s.set_mode(PerspectiveMode::OnePoint).is_err());
    }

    #[test]
    fn test_reset_clears_everything() {
        let mut s = captured();
        let (w, h) = s.capture().unwrap().crop_size();
        s.upload_drawing(RgbaImage::new(w, h)).unwrap();
        s.reset();
        assert_eq!(s.state(), SessionState::Posing);
        assert!(s.capture().is_none());
        assert!(s.drawing().is_none());
        assert!(s.result().is_none());
        assert!(s.error().is_none());
    }

    #[test]
    fn test_captions_cycle_with_time() {
        let mut s = captured();
        let (w, h) = s.capture().unwrap().crop_size();
        s.upload_drawing(RgbaImage::new(w, h)).unwrap();
        let start = Instant::now();
        s.submit(start).unwrap();
        let interval = SessionConfig::default().caption_interval();
        assert_eq!(s.caption(start), Some(ANALYZING_CAPTIONS[0]));
        assert_eq!(s.caption(start + interval), Some(ANALYZING_CAPTIONS[1]));
        assert_eq!(
            s.caption(start + interval * ANALYZING_CAPTIONS.len() as u32),
            Some(ANALYZING_CAPTIONS[0])
        );
    }
}
