//! Main application module: session lifecycle and the cooperative loop.

use crate::{
    alert::Speaker,
    camera::CameraBackend,
    capture::{CaptureSession, SessionSettings, TickOutcome},
    config::{Config, GuiMode},
    display::{PresentationSink, StatusTone, UserCommand},
    error::{Error, Result},
    landmarks::LandmarkSource,
    overlay::Annotator,
};
use log::{info, warn};

/// Status shown before the camera has been opened
pub const STATUS_AWAITING_PERMISSION: &str = "Please allow camera access to start.";
/// Status shown once the camera is open
pub const STATUS_GRANTED: &str = "Camera access granted. You can now check posture.";
/// Status shown while the camera is being reopened
pub const STATUS_RECONNECTING: &str = "Camera disconnected. Reconnecting...";
/// Status shown after monitoring is stopped
pub const STATUS_STOPPED: &str = "Posture detection stopped.";
/// Title of the permission notice
pub const NOTICE_CAMERA_TITLE: &str = "Camera Access";
/// Text of the permission notice
pub const NOTICE_CAMERA_DENIED: &str = "Camera permission is denied. Please allow camera access.";

/// Posture monitoring application
///
/// Owns every collaborator explicitly; the capture session exists only
/// between a successful camera grant and close.
pub struct PostureApp<C: CameraBackend + Clone> {
    config: Config,
    camera: C,
    session: Option<CaptureSession<C>>,
    source: Box<dyn LandmarkSource>,
    annotator: Box<dyn Annotator>,
    speaker: Box<dyn Speaker>,
    sink: Box<dyn PresentationSink>,
    closing: bool,
}

impl<C: CameraBackend + Clone> PostureApp<C> {
    /// Create the application; the camera is not opened yet
    pub fn new(
        config: Config,
        camera: C,
        source: Box<dyn LandmarkSource>,
        annotator: Box<dyn Annotator>,
        speaker: Box<dyn Speaker>,
        sink: Box<dyn PresentationSink>,
    ) -> Self {
        Self {
            config,
            camera,
            session: None,
            source,
            annotator,
            speaker,
            sink,
            closing: false,
        }
    }

    /// Active capture session, if camera access was granted
    pub fn session(&self) -> Option<&CaptureSession<C>> {
        self.session.as_ref()
    }

    /// Whether close was requested
    pub fn is_closing(&self) -> bool {
        self.closing
    }

    /// Open the camera and create the session
    ///
    /// Returns whether a session exists afterwards. A device that cannot be
    /// opened is reported to the user and is not an error.
    pub fn request_camera_access(&mut self) -> Result<bool> {
        if self.session.is_some() {
            return Ok(true);
        }

        match CaptureSession::open(self.camera.clone(), SessionSettings::from_config(&self.config)) {
            Ok(session) => {
                self.session = Some(session);
                self.sink.status(STATUS_GRANTED, StatusTone::Neutral)?;
                Ok(true)
            }
            Err(Error::CameraPermissionDenied(index)) => {
                warn!("Camera {} access denied", index);
                self.sink.notice(NOTICE_CAMERA_TITLE, NOTICE_CAMERA_DENIED)?;
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    /// Start checking posture; requests camera access first if needed
    pub fn start_monitoring(&mut self) -> Result<()> {
        match self.session.as_mut() {
            Some(session) => session.start(),
            None => {
                self.request_camera_access()?;
            }
        }
        Ok(())
    }

    /// Stop checking posture; the camera stays open
    pub fn stop_monitoring(&mut self) -> Result<()> {
        if let Some(session) = self.session.as_mut() {
            session.stop();
        }
        self.sink.status(STATUS_STOPPED, StatusTone::Neutral)
    }

    /// Release the camera and end the loop
    pub fn close(&mut self) {
        if let Some(session) = self.session.take() {
            session.close();
        }
        self.closing = true;
    }

    /// Apply a user command
    pub fn handle_command(&mut self, command: UserCommand) -> Result<()> {
        info!("User command: {:?}", command);
        match command {
            UserCommand::GrantCamera => self.request_camera_access().map(|_| ()),
            UserCommand::Start => self.start_monitoring(),
            UserCommand::Stop => self.stop_monitoring(),
            UserCommand::Close => {
                self.close();
                Ok(())
            }
        }
    }

    /// Run one tick and forward its outcome to the sink
    ///
    /// A sink that fails to show the outcome is logged; the loop goes on.
    pub fn tick(&mut self) {
        let Some(session) = self.session.as_mut() else {
            return;
        };

        let shown = match session.tick(self.source.as_mut(), self.annotator.as_ref(), self.speaker.as_ref()) {
            TickOutcome::Idle => Ok(()),
            TickOutcome::Reconnecting { .. } => self.sink.status(STATUS_RECONNECTING, StatusTone::Warning),
            TickOutcome::Processed(result) => self.sink.present(&result),
        };
        if let Err(e) = shown {
            warn!("Failed to display tick: {}", e);
        }
    }

    /// Run until the user closes the application
    ///
    /// # Errors
    ///
    /// Returns `CameraPermissionDenied` when a headless run cannot open the
    /// camera, and any error from the sink outside of a tick
    pub fn run(&mut self) -> Result<()> {
        info!("Starting posture monitor");
        self.sink.status(STATUS_AWAITING_PERMISSION, StatusTone::Neutral)?;

        if self.config.capture.auto_start {
            if self.request_camera_access()? {
                self.start_monitoring()?;
            } else if self.config.display.gui_mode == GuiMode::None {
                // Without a window nothing can grant access later
                return Err(Error::CameraPermissionDenied(self.config.camera.index));
            }
        }

        let interval = self.config.capture.tick_interval();
        while !self.closing {
            self.tick();

            if let Some(command) = self.sink.poll(interval)? {
                self.handle_command(command)?;
            }
        }

        info!("Posture monitor shutting down");
        Ok(())
    }
}

impl<C: CameraBackend + Clone> Drop for PostureApp<C> {
    fn drop(&mut self) {
        if let Some(session) = self.session.take() {
            session.close();
        }
    }
}
