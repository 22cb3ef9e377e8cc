//! Presentation of tick results and user input.
//!
//! The sink shows the annotated frame with a status line and doubles as the
//! cooperative scheduler: [`PresentationSink::poll`] waits out the delay
//! before the next tick while handling user input.

use crate::{capture::TickResult, error::Result, posture::PostureVerdict};
use log::{debug, error, info, warn};
use opencv::{
    core::{self, Mat, Point, Scalar, BORDER_CONSTANT, CV_8UC3},
    highgui::{self, WINDOW_AUTOSIZE, WND_PROP_VISIBLE},
    imgproc::{self, FONT_HERSHEY_SIMPLEX, LINE_8},
    prelude::*,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// Height of the status strip below the video
const STATUS_BAR_HEIGHT: i32 = 70;

/// Keyboard help shown under the status line
const KEY_HINT: &str = "[a] allow camera  [s] check posture  [p] stop  [q] close";

/// Colour class of a status message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusTone {
    /// Informational
    Neutral,
    /// Posture acceptable
    Acceptable,
    /// Posture unacceptable
    Unacceptable,
    /// Transient problem, e.g. camera reconnecting
    Warning,
}

impl StatusTone {
    /// Tone for a verdict
    #[must_use]
    pub const fn for_verdict(verdict: PostureVerdict) -> Self {
        match verdict {
            PostureVerdict::Good => StatusTone::Acceptable,
            PostureVerdict::Bad => StatusTone::Unacceptable,
        }
    }

    /// BGR text colour
    #[must_use]
    pub fn color(self) -> Scalar {
        match self {
            StatusTone::Neutral => Scalar::new(40.0, 40.0, 40.0, 0.0),
            StatusTone::Acceptable => Scalar::new(0.0, 160.0, 0.0, 0.0),
            StatusTone::Unacceptable => Scalar::new(0.0, 0.0, 255.0, 0.0),
            StatusTone::Warning => Scalar::new(0.0, 140.0, 255.0, 0.0),
        }
    }
}

/// Actions the user can request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserCommand {
    /// Open the camera
    GrantCamera,
    /// Start checking posture
    Start,
    /// Stop checking posture
    Stop,
    /// Release the camera and exit
    Close,
}

/// Map a HighGUI key code to a command
#[must_use]
pub fn command_for_key(key: i32) -> Option<UserCommand> {
    if key < 0 {
        return None;
    }
    match key & 0xFF {
        k if k == i32::from(b'a') => Some(UserCommand::GrantCamera),
        k if k == i32::from(b's') => Some(UserCommand::Start),
        k if k == i32::from(b'p') => Some(UserCommand::Stop),
        k if k == i32::from(b'q') || k == 27 => Some(UserCommand::Close),
        _ => None,
    }
}

/// Command after one poll of the window
///
/// A key press wins; otherwise a window the user closed (`visible` below 1)
/// means `Close`.
#[must_use]
pub fn command_after_poll(key: i32, visible: f64) -> Option<UserCommand> {
    command_for_key(key).or_else(|| (visible < 1.0).then_some(UserCommand::Close))
}

/// Receives per-tick results and status messages, and paces the loop
pub trait PresentationSink {
    /// Show a processed tick
    ///
    /// # Errors
    ///
    /// Returns an error if the display cannot be updated
    fn present(&mut self, result: &TickResult) -> Result<()>;

    /// Replace the status line
    ///
    /// # Errors
    ///
    /// Returns an error if the display cannot be updated
    fn status(&mut self, text: &str, tone: StatusTone) -> Result<()>;

    /// Show a notice the user must acknowledge
    ///
    /// # Errors
    ///
    /// Returns an error if the display cannot be updated
    fn notice(&mut self, title: &str, text: &str) -> Result<()>;

    /// Wait `delay` while handling input; returns the first command received
    ///
    /// # Errors
    ///
    /// Returns an error if the event loop fails
    fn poll(&mut self, delay: Duration) -> Result<Option<UserCommand>>;
}

/// `OpenCV` HighGUI window with a status strip under the video
pub struct HighGuiDisplay {
    title: String,
    frame_size: core::Size,
    frame: Option<Mat>,
    status: String,
    tone: StatusTone,
}

impl HighGuiDisplay {
    /// Create the window
    ///
    /// # Errors
    ///
    /// Returns an error if the window cannot be created
    pub fn new(title: &str, frame_size: core::Size) -> Result<Self> {
        info!("Creating window '{}'", title);
        highgui::named_window(title, WINDOW_AUTOSIZE)?;

        Ok(Self {
            title: title.to_string(),
            frame_size,
            frame: None,
            status: String::new(),
            tone: StatusTone::Neutral,
        })
    }

    fn blank(&self) -> Result<Mat> {
        let canvas = Mat::new_rows_cols_with_default(
            self.frame_size.height,
            self.frame_size.width,
            CV_8UC3,
            Scalar::new(240.0, 240.0, 240.0, 0.0),
        )?;
        Ok(canvas)
    }

    fn render(&self) -> Result<()> {
        let video = match &self.frame {
            Some(frame) => frame.try_clone()?,
            None => self.blank()?,
        };

        let mut canvas = Mat::default();
        core::copy_make_border(
            &video,
            &mut canvas,
            0,
            STATUS_BAR_HEIGHT,
            0,
            0,
            BORDER_CONSTANT,
            Scalar::new(240.0, 240.0, 240.0, 0.0),
        )?;

        let base = video.rows();
        imgproc::put_text(
            &mut canvas,
            &self.status,
            Point::new(10, base + 30),
            FONT_HERSHEY_SIMPLEX,
            0.8,
            self.tone.color(),
            2,
            LINE_8,
            false,
        )?;
        imgproc::put_text(
            &mut canvas,
            KEY_HINT,
            Point::new(10, base + 58),
            FONT_HERSHEY_SIMPLEX,
            0.45,
            StatusTone::Neutral.color(),
            1,
            LINE_8,
            false,
        )?;

        highgui::imshow(&self.title, &canvas)?;
        Ok(())
    }
}

impl PresentationSink for HighGuiDisplay {
    fn present(&mut self, result: &TickResult) -> Result<()> {
        self.frame = Some(result.frame.try_clone()?);
        self.status = result.status_text();
        self.tone = StatusTone::for_verdict(result.verdict);
        self.render()
    }

    fn status(&mut self, text: &str, tone: StatusTone) -> Result<()> {
        self.status = text.to_string();
        self.tone = tone;
        self.render()
    }

    fn notice(&mut self, title: &str, text: &str) -> Result<()> {
        warn!("{}: {}", title, text);
        let mut canvas = self.blank()?;
        let lines = [
            (title, 1.0, StatusTone::Unacceptable),
            (text, 0.6, StatusTone::Neutral),
            ("Press any key to continue", 0.5, StatusTone::Neutral),
        ];
        for (i, (line, scale, tone)) in (0i32..).zip(lines) {
            imgproc::put_text(
                &mut canvas,
                line,
                Point::new(20, 60 + i * 40),
                FONT_HERSHEY_SIMPLEX,
                scale,
                tone.color(),
                2,
                LINE_8,
                false,
            )?;
        }
        highgui::imshow(&self.title, &canvas)?;
        highgui::wait_key(0)?;
        self.render()
    }

    #[allow(clippy::cast_possible_truncation)] // Tick delays are milliseconds
    fn poll(&mut self, delay: Duration) -> Result<Option<UserCommand>> {
        let millis = (delay.as_millis() as i32).max(1);
        let key = highgui::wait_key(millis)?;
        let visible = highgui::get_window_property(&self.title, WND_PROP_VISIBLE)?;
        Ok(command_after_poll(key, visible))
    }
}

impl Drop for HighGuiDisplay {
    fn drop(&mut self) {
        if let Err(e) = highgui::destroy_window(&self.title) {
            debug!("Failed to destroy window: {}", e);
        }
    }
}

/// Sink without a window: status goes to the log, Ctrl-C closes
pub struct HeadlessDisplay {
    shutdown: Arc<AtomicBool>,
    last_status: Option<String>,
}

impl HeadlessDisplay {
    /// Create a sink that reports `Close` once `shutdown` is set
    #[must_use]
    pub fn new(shutdown: Arc<AtomicBool>) -> Self {
        Self {
            shutdown,
            last_status: None,
        }
    }

    fn log_status(&mut self, text: &str, tone: StatusTone) {
        if self.last_status.as_deref() == Some(text) {
            return;
        }
        match tone {
            StatusTone::Warning | StatusTone::Unacceptable => warn!("{}", text),
            StatusTone::Neutral | StatusTone::Acceptable => info!("{}", text),
        }
        self.last_status = Some(text.to_string());
    }
}

impl PresentationSink for HeadlessDisplay {
    fn present(&mut self, result: &TickResult) -> Result<()> {
        if let Some(metrics) = &result.metrics {
            debug!(
                "{} (tilt {:.3}, lean {:.3})",
                result.verdict, metrics.shoulder_tilt, metrics.forward_lean
            );
        }
        let text = result.status_text();
        self.log_status(&text, StatusTone::for_verdict(result.verdict));
        Ok(())
    }

    fn status(&mut self, text: &str, tone: StatusTone) -> Result<()> {
        self.log_status(text, tone);
        Ok(())
    }

    fn notice(&mut self, title: &str, text: &str) -> Result<()> {
        error!("{}: {}", title, text);
        Ok(())
    }

    fn poll(&mut self, delay: Duration) -> Result<Option<UserCommand>> {
        thread::sleep(delay);
        if self.shutdown.load(Ordering::SeqCst) {
            return Ok(Some(UserCommand::Close));
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_bindings() {
        assert_eq!(command_for_key(i32::from(b'a')), Some(UserCommand::GrantCamera));
        assert_eq!(command_for_key(i32::from(b's')), Some(UserCommand::Start));
        assert_eq!(command_for_key(i32::from(b'p')), Some(UserCommand::Stop));
        assert_eq!(command_for_key(i32::from(b'q')), Some(UserCommand::Close));
        assert_eq!(command_for_key(27), Some(UserCommand::Close));
        assert_eq!(command_for_key(-1), None);
        assert_eq!(command_for_key(i32::from(b'x')), None);
        // Some backends set modifier bits above the low byte
        assert_eq!(command_for_key(0x10_0000 | i32::from(b'q')), Some(UserCommand::Close));
    }

    #[test]
    fn test_closed_window_means_close() {
        assert_eq!(command_after_poll(-1, 1.0), None);
        assert_eq!(command_after_poll(-1, 0.0), Some(UserCommand::Close));
        // Some backends report a destroyed window as -1
        assert_eq!(command_after_poll(-1, -1.0), Some(UserCommand::Close));
        assert_eq!(command_after_poll(i32::from(b's'), 1.0), Some(UserCommand::Start));
        assert_eq!(command_after_poll(i32::from(b'p'), 0.0), Some(UserCommand::Stop));
    }

    #[test]
    fn test_verdict_tones() {
        assert_eq!(StatusTone::for_verdict(PostureVerdict::Good), StatusTone::Acceptable);
        assert_eq!(StatusTone::for_verdict(PostureVerdict::Bad), StatusTone::Unacceptable);
        assert_ne!(StatusTone::Acceptable.color(), StatusTone::Unacceptable.color());
    }

    #[test]
    fn test_headless_poll_reports_shutdown() {
        let flag = Arc::new(AtomicBool::new(false));
        let mut display = HeadlessDisplay::new(Arc::clone(&flag));

        assert_eq!(display.poll(Duration::from_millis(1)).unwrap(), None);
        flag.store(true, Ordering::SeqCst);
        assert_eq!(display.poll(Duration::from_millis(1)).unwrap(), Some(UserCommand::Close));
    }

    #[test]
    fn test_headless_status_deduplicates() {
        let mut display = HeadlessDisplay::new(Arc::new(AtomicBool::new(false)));
        display.status("Posture: Good Posture", StatusTone::Acceptable).unwrap();
        display.status("Posture: Good Posture", StatusTone::Acceptable).unwrap();
        assert_eq!(display.last_status.as_deref(), Some("Posture: Good Posture"));
    }
}
