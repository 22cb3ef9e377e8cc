//! Configuration management for the posture monitor

use crate::{
    camera::CaptureApi,
    constants::{
        DEFAULT_ALERT_MESSAGE, DEFAULT_ALERT_QUEUE_CAPACITY, DEFAULT_FORWARD_LEAN_THRESHOLD, DEFAULT_POSE_INPUT_SIZE,
        DEFAULT_PRESENCE_THRESHOLD, DEFAULT_SHOULDER_TILT_THRESHOLD, DEFAULT_SPEECH_RATE, DEFAULT_TICK_INTERVAL_MS,
        DEFAULT_WINDOW_TITLE, FRAME_HEIGHT, FRAME_WIDTH,
    },
    posture::PostureThresholds,
    Error, Result,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Camera device configuration
    pub camera: CameraConfig,

    /// Pose landmark model configuration
    pub model: ModelConfig,

    /// Posture classification tolerances
    pub posture: PostureConfig,

    /// Capture loop configuration
    pub capture: CaptureConfig,

    /// Spoken alert configuration
    pub alert: AlertConfig,

    /// Display configuration
    pub display: DisplayConfig,
}

/// Camera device configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    /// Camera index
    pub index: i32,

    /// Capture API used to open the device
    pub backend: CaptureApi,

    /// Width frames are resized to before processing
    pub frame_width: i32,

    /// Height frames are resized to before processing
    pub frame_height: i32,
}

/// Pose landmark model configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Path to the pose landmark ONNX model
    pub pose_landmarks: PathBuf,

    /// Square model input size
    pub input_size: i32,

    /// Minimum presence score for a person to be reported (0.0-1.0)
    pub presence_threshold: f32,
}

/// Posture classification tolerances
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PostureConfig {
    /// Largest acceptable vertical distance between the shoulders
    pub shoulder_tilt_threshold: f64,

    /// Smallest acceptable height of the shoulder midline above the nose
    pub forward_lean_threshold: f64,
}

/// Capture loop configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// Delay between ticks in milliseconds
    pub tick_interval_ms: u64,

    /// Grant camera access and start monitoring without waiting for the user
    pub auto_start: bool,
}

/// How alerts reach the speech backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertMode {
    /// Queue on a background worker
    #[default]
    Async,
    /// Speak inside the tick
    Blocking,
}

/// Spoken alert configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertConfig {
    /// Speak when posture turns bad
    pub enabled: bool,

    /// Text spoken
    pub message: String,

    /// Delivery mode
    pub mode: AlertMode,

    /// Speech program overriding the platform default
    pub speech_program: Option<String>,

    /// Arguments for `speech_program`, placed before the text
    pub speech_args: Vec<String>,

    /// Speech rate in words per minute for the platform default
    pub rate: u32,

    /// Pending utterances accepted by the background worker
    pub queue_capacity: usize,
}

/// GUI display mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GuiMode {
    /// Video window with keyboard controls
    #[default]
    Window,
    /// No window, status goes to the log
    None,
}

/// Display configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    /// Display mode
    pub gui_mode: GuiMode,

    /// Window title
    pub window_title: String,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            index: 0,
            backend: CaptureApi::Any,
            frame_width: FRAME_WIDTH,
            frame_height: FRAME_HEIGHT,
        }
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            pose_landmarks: PathBuf::from("assets/pose_landmark_full.onnx"),
            input_size: DEFAULT_POSE_INPUT_SIZE,
            presence_threshold: DEFAULT_PRESENCE_THRESHOLD,
        }
    }
}

impl Default for PostureConfig {
    fn default() -> Self {
        Self {
            shoulder_tilt_threshold: DEFAULT_SHOULDER_TILT_THRESHOLD,
            forward_lean_threshold: DEFAULT_FORWARD_LEAN_THRESHOLD,
        }
    }
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: DEFAULT_TICK_INTERVAL_MS,
            auto_start: false,
        }
    }
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            message: DEFAULT_ALERT_MESSAGE.to_string(),
            mode: AlertMode::Async,
            speech_program: None,
            speech_args: Vec::new(),
            rate: DEFAULT_SPEECH_RATE,
            queue_capacity: DEFAULT_ALERT_QUEUE_CAPACITY,
        }
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            gui_mode: GuiMode::Window,
            window_title: DEFAULT_WINDOW_TITLE.to_string(),
        }
    }
}

impl PostureConfig {
    /// Classifier tolerances
    #[must_use]
    pub fn thresholds(&self) -> PostureThresholds {
        PostureThresholds {
            shoulder_tilt: self.shoulder_tilt_threshold,
            forward_lean: self.forward_lean_threshold,
        }
    }
}

impl CaptureConfig {
    /// Delay between ticks
    #[must_use]
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }
}

impl Config {
    /// Load configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| Error::IoError(e.to_string()))?;

        Self::from_yaml(&content)
    }

    /// Parse configuration from YAML text
    pub fn from_yaml(content: &str) -> Result<Self> {
        serde_yaml::from_str(content).map_err(|e| Error::ConfigError(format!("Failed to parse config: {}", e)))
    }

    /// Save configuration to a YAML file
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = serde_yaml::to_string(self)
            .map_err(|e| Error::ConfigError(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, content).map_err(|e| Error::IoError(e.to_string()))?;

        Ok(())
    }

    /// Validate configuration
    ///
    /// Model file existence is not checked here; loading the model reports
    /// that with the path attached.
    pub fn validate(&self) -> Result<()> {
        // Validate camera settings
        if self.camera.index < 0 {
            return Err(Error::ConfigError("Camera index must not be negative".to_string()));
        }
        if self.camera.frame_width <= 0 || self.camera.frame_height <= 0 {
            return Err(Error::ConfigError("Frame size must be greater than 0".to_string()));
        }

        // Validate model settings
        if self.model.input_size <= 0 {
            return Err(Error::ConfigError("Model input size must be greater than 0".to_string()));
        }
        if !(0.0..=1.0).contains(&self.model.presence_threshold) {
            return Err(Error::ConfigError(
                "Presence threshold must be between 0.0 and 1.0".to_string(),
            ));
        }

        // Validate posture tolerances
        if !(self.posture.shoulder_tilt_threshold > 0.0) {
            return Err(Error::ConfigError(
                "Shoulder tilt threshold must be greater than 0".to_string(),
            ));
        }
        if !(self.posture.forward_lean_threshold <= 0.0) {
            return Err(Error::ConfigError(
                "Forward lean threshold must not be positive".to_string(),
            ));
        }

        // Validate capture loop
        if self.capture.tick_interval_ms == 0 {
            return Err(Error::ConfigError("Tick interval must be greater than 0".to_string()));
        }

        // Validate alerts
        if self.alert.enabled && self.alert.message.trim().is_empty() {
            return Err(Error::ConfigError("Alert message must not be empty".to_string()));
        }
        if self.alert.queue_capacity == 0 {
            return Err(Error::ConfigError("Alert queue capacity must be greater than 0".to_string()));
        }
        if self.alert.speech_program.as_deref().is_some_and(|p| p.trim().is_empty()) {
            return Err(Error::ConfigError("Speech program must not be empty".to_string()));
        }

        Ok(())
    }
}

/// Example configuration file content
pub const EXAMPLE_CONFIG: &str = r#"# Posture Guard Configuration

# Camera device
camera:
  index: 0
  backend: "any"        # any, dshow, msmf, v4l2, avfoundation
  frame_width: 640
  frame_height: 480

# Pose landmark model
model:
  pose_landmarks: "assets/pose_landmark_full.onnx"
  input_size: 256
  presence_threshold: 0.5

# Posture tolerances (normalized image units)
posture:
  shoulder_tilt_threshold: 0.1
  forward_lean_threshold: -0.1

# Capture loop
capture:
  tick_interval_ms: 30
  auto_start: false

# Spoken alerts
alert:
  enabled: true
  message: "Bad posture detected"
  mode: "async"         # async, blocking
  speech_program: null  # platform default when null
  speech_args: []
  rate: 150
  queue_capacity: 4

# Display
display:
  gui_mode: "window"    # window, none
  window_title: "Body Posture Detection System"
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.posture.thresholds(), PostureThresholds::default());
        assert_eq!(config.capture.tick_interval(), Duration::from_millis(30));
        assert_eq!(config.camera.frame_width, 640);
        assert_eq!(config.camera.frame_height, 480);
    }

    #[test]
    fn test_example_config_matches_defaults() {
        let parsed = Config::from_yaml(EXAMPLE_CONFIG).unwrap();
        let defaults = Config::default();

        assert_eq!(parsed.camera.index, defaults.camera.index);
        assert_eq!(parsed.camera.backend, defaults.camera.backend);
        assert_eq!(parsed.model.pose_landmarks, defaults.model.pose_landmarks);
        assert_eq!(parsed.posture.thresholds(), defaults.posture.thresholds());
        assert_eq!(parsed.capture.tick_interval_ms, defaults.capture.tick_interval_ms);
        assert_eq!(parsed.alert.message, defaults.alert.message);
        assert_eq!(parsed.alert.mode, defaults.alert.mode);
        assert_eq!(parsed.alert.speech_program, None);
        assert_eq!(parsed.display.gui_mode, defaults.display.gui_mode);
        assert!(parsed.validate().is_ok());
    }

    #[test]
    fn test_partial_config_fills_defaults() {
        let config = Config::from_yaml("posture:\n  shoulder_tilt_threshold: 0.2\nalert:\n  mode: blocking\n").unwrap();

        assert_eq!(config.posture.shoulder_tilt_threshold, 0.2);
        assert_eq!(config.posture.forward_lean_threshold, DEFAULT_FORWARD_LEAN_THRESHOLD);
        assert_eq!(config.alert.mode, AlertMode::Blocking);
        assert!(config.alert.enabled);
        assert_eq!(config.camera.index, 0);
    }

    #[test]
    fn test_invalid_yaml_is_config_error() {
        match Config::from_yaml("camera: [not, a, map]") {
            Err(Error::ConfigError(msg)) => assert!(msg.contains("Failed to parse config")),
            other => panic!("Expected ConfigError, got {other:?}"),
        }
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let cases: Vec<(&str, Box<dyn Fn(&mut Config)>)> = vec![
            ("negative camera", Box::new(|c| c.camera.index = -1)),
            ("zero width", Box::new(|c| c.camera.frame_width = 0)),
            ("zero input", Box::new(|c| c.model.input_size = 0)),
            ("presence", Box::new(|c| c.model.presence_threshold = 1.5)),
            ("tilt", Box::new(|c| c.posture.shoulder_tilt_threshold = 0.0)),
            ("tilt nan", Box::new(|c| c.posture.shoulder_tilt_threshold = f64::NAN)),
            ("lean", Box::new(|c| c.posture.forward_lean_threshold = 0.05)),
            ("interval", Box::new(|c| c.capture.tick_interval_ms = 0)),
            ("message", Box::new(|c| c.alert.message = "  ".to_string())),
            ("queue", Box::new(|c| c.alert.queue_capacity = 0)),
            ("program", Box::new(|c| c.alert.speech_program = Some(String::new()))),
        ];

        for (name, mutate) in cases {
            let mut config = Config::default();
            mutate(&mut config);
            assert!(
                matches!(config.validate(), Err(Error::ConfigError(_))),
                "Expected validation failure for {name}"
            );
        }
    }

    #[test]
    fn test_empty_message_allowed_when_muted() {
        let mut config = Config::default();
        config.alert.enabled = false;
        config.alert.message = String::new();
        assert!(config.validate().is_ok());
    }
}
