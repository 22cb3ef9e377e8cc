//! Capture session and per-tick pipeline.
//!
//! A [`CaptureSession`] exists from the moment the user grants camera
//! access until it is closed. Each call to [`CaptureSession::tick`] runs
//! one iteration of the pipeline:
//!
//! 1. read a frame (on failure: close, reopen once, report `Reconnecting`)
//! 2. resize it to the configured resolution
//! 3. extract landmarks; no person counts as good posture
//! 4. classify and advance the alert debouncer
//! 5. draw the overlay
//! 6. speak the alert message if the debouncer fired
//!
//! Ticks never fail: every per-tick error degrades to a good verdict and
//! is logged. The caller owns the cadence.

use crate::{
    alert::Speaker,
    camera::CameraBackend,
    config::Config,
    debounce::{AlertDebouncer, DebounceState},
    error::{Error, Result},
    landmarks::{LandmarkSet, LandmarkSource},
    overlay::Annotator,
    posture::{PostureClassifier, PostureMetrics, PostureVerdict},
};
use log::{debug, error, info, warn};
use opencv::{
    core::{Mat, Size},
    imgproc::{self, InterpolationFlags},
    prelude::*,
};

/// Settings a session needs from the configuration
#[derive(Debug, Clone)]
pub struct SessionSettings {
    /// Camera index to open and reopen
    pub camera_index: i32,
    /// Resolution frames are normalized to
    pub frame_size: Size,
    /// Classifier used on every frame
    pub classifier: PostureClassifier,
    /// Spoken when the debouncer fires
    pub alert_message: String,
}

impl SessionSettings {
    /// Extract session settings from the application configuration
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self {
            camera_index: config.camera.index,
            frame_size: Size::new(config.camera.frame_width, config.camera.frame_height),
            classifier: PostureClassifier::new(config.posture.thresholds()),
            alert_message: config.alert.message.clone(),
        }
    }
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

/// How the verdict of a processed tick was reached
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Detection {
    /// A person was found and classified
    Classified,
    /// No person in the frame
    NoPerson,
    /// A person was found but a required landmark was absent
    MissingLandmark,
    /// The landmark source failed on this frame
    SourceFailed,
}

/// Output of one processed tick
#[derive(Debug)]
pub struct TickResult {
    /// Verdict for this tick
    pub verdict: PostureVerdict,
    /// Frame with the overlay, at the normalized resolution
    pub frame: Mat,
    /// True when the alert fired on this tick
    pub alert: bool,
    /// How the verdict was reached
    pub detection: Detection,
    /// Measurements, when a person was classified
    pub metrics: Option<PostureMetrics>,
}

impl TickResult {
    /// Status line for the presentation layer
    #[must_use]
    pub fn status_text(&self) -> String {
        format!("Posture: {}", self.verdict.label())
    }
}

/// What a tick did
#[derive(Debug)]
pub enum TickOutcome {
    /// Session not running, nothing was touched
    Idle,
    /// No frame could be read; the camera was closed and reopened once
    Reconnecting {
        /// Whether the reopen succeeded
        reopened: bool,
    },
    /// A frame went through the pipeline
    Processed(TickResult),
}

/// Camera ownership, running flag and debounce state for one session
pub struct CaptureSession<C: CameraBackend> {
    camera: C,
    handle: Option<C::Handle>,
    running: bool,
    debouncer: AlertDebouncer,
    settings: SessionSettings,
}

impl<C: CameraBackend> CaptureSession<C> {
    /// Open the camera and create a stopped session
    ///
    /// # Errors
    ///
    /// Returns `CameraPermissionDenied` if the device cannot be opened
    pub fn open(mut camera: C, settings: SessionSettings) -> Result<Self> {
        let handle = camera.open(settings.camera_index).map_err(|e| {
            warn!("Camera {} could not be opened: {}", settings.camera_index, e);
            Error::CameraPermissionDenied(settings.camera_index)
        })?;
        info!("Capture session opened on camera {}", settings.camera_index);

        Ok(Self {
            camera,
            handle: Some(handle),
            running: false,
            debouncer: AlertDebouncer::new(),
            settings,
        })
    }

    /// Begin processing frames on subsequent ticks
    pub fn start(&mut self) {
        if !self.running {
            info!("Posture monitoring started");
        }
        self.running = true;
    }

    /// Stop processing; takes effect at the top of the next tick
    pub fn stop(&mut self) {
        if self.running {
            info!("Posture monitoring stopped");
        }
        self.running = false;
    }

    /// Whether ticks process frames
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Whether a camera handle is currently open
    #[must_use]
    pub fn has_camera(&self) -> bool {
        self.handle.is_some()
    }

    /// Current debounce state
    #[must_use]
    pub fn debounce_state(&self) -> DebounceState {
        self.debouncer.state()
    }

    /// Session settings
    #[must_use]
    pub fn settings(&self) -> &SessionSettings {
        &self.settings
    }

    /// Camera backend
    #[must_use]
    pub fn camera(&self) -> &C {
        &self.camera
    }

    /// Release the camera and end the session
    pub fn close(mut self) -> C {
        self.running = false;
        if let Some(handle) = self.handle.take() {
            self.camera.close(handle);
        }
        info!("Capture session closed");
        self.camera
    }

    /// Run one iteration of the pipeline
    pub fn tick(
        &mut self,
        source: &mut dyn LandmarkSource,
        annotator: &dyn Annotator,
        speaker: &dyn Speaker,
    ) -> TickOutcome {
        if !self.running {
            return TickOutcome::Idle;
        }

        let frame = match self.acquire_frame() {
            Ok(frame) => frame,
            Err(e) => {
                warn!("Frame acquisition failed: {}", e);
                return TickOutcome::Reconnecting {
                    reopened: self.reconnect(),
                };
            }
        };

        let frame = match self.normalize(frame) {
            Ok(frame) => frame,
            Err(e) => {
                warn!("Failed to normalize frame: {}", e);
                return TickOutcome::Reconnecting {
                    reopened: self.reconnect(),
                };
            }
        };

        let (landmarks, verdict, detection, metrics) = self.evaluate(source, &frame);
        let alert = self.debouncer.update(verdict);

        let frame = match annotator.annotate(&frame, landmarks.as_ref(), verdict) {
            Ok(annotated) => annotated,
            Err(e) => {
                warn!("Failed to draw overlay: {}", e);
                frame
            }
        };

        if alert {
            info!("Bad posture detected, raising alert");
            if let Err(e) = speaker.speak(&self.settings.alert_message) {
                warn!("Failed to deliver alert: {}", e);
            }
        }

        TickOutcome::Processed(TickResult {
            verdict,
            frame,
            alert,
            detection,
            metrics,
        })
    }

    fn acquire_frame(&mut self) -> Result<Mat> {
        let handle = self
            .handle
            .as_mut()
            .ok_or_else(|| Error::CameraUnavailable("Camera is not open".to_string()))?;
        self.camera.read(handle)
    }

    /// Close the current handle and try to open the device once
    fn reconnect(&mut self) -> bool {
        if let Some(handle) = self.handle.take() {
            self.camera.close(handle);
        }

        match self.camera.open(self.settings.camera_index) {
            Ok(handle) => {
                info!("Camera {} reopened", self.settings.camera_index);
                self.handle = Some(handle);
                true
            }
            Err(e) => {
                error!("Camera {} reopen failed: {}", self.settings.camera_index, e);
                false
            }
        }
    }

    fn normalize(&self, frame: Mat) -> Result<Mat> {
        if frame.size()? == self.settings.frame_size {
            return Ok(frame);
        }

        let mut resized = Mat::default();
        imgproc::resize(
            &frame,
            &mut resized,
            self.settings.frame_size,
            0.0,
            0.0,
            InterpolationFlags::INTER_LINEAR as i32,
        )?;
        Ok(resized)
    }

    /// Landmarks, verdict, detection kind and metrics for one frame
    fn evaluate(
        &self,
        source: &mut dyn LandmarkSource,
        frame: &Mat,
    ) -> (Option<LandmarkSet>, PostureVerdict, Detection, Option<PostureMetrics>) {
        let landmarks = match source.extract(frame) {
            Ok(Some(landmarks)) => landmarks,
            Ok(None) => return (None, PostureVerdict::Good, Detection::NoPerson, None),
            Err(e) => {
                warn!("Landmark extraction failed: {}", e);
                return (None, PostureVerdict::Good, Detection::SourceFailed, None);
            }
        };

        match self.settings.classifier.assess(&landmarks) {
            Ok((verdict, metrics)) => {
                debug!(
                    "Shoulder tilt {:.3}, forward lean {:.3}: {}",
                    metrics.shoulder_tilt, metrics.forward_lean, verdict
                );
                (Some(landmarks), verdict, Detection::Classified, Some(metrics))
            }
            Err(e) => {
                debug!("Skipping classification: {}", e);
                (Some(landmarks), PostureVerdict::Good, Detection::MissingLandmark, None)
            }
        }
    }
}
