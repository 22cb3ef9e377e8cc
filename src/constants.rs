//! Constants used throughout the application

/// Number of body landmarks in the full-body pose topology
pub const NUM_BODY_LANDMARKS: usize = 33;

/// Values per landmark in the pose model output (x, y, z, visibility, presence)
pub const LANDMARK_STRIDE: usize = 5;

/// Square input resolution of the pose landmark model
pub const DEFAULT_POSE_INPUT_SIZE: i32 = 256;

/// Minimum pose presence score for a frame to count as containing a person
pub const DEFAULT_PRESENCE_THRESHOLD: f32 = 0.5;

/// Maximum vertical difference between the shoulders before posture is bad
pub const DEFAULT_SHOULDER_TILT_THRESHOLD: f64 = 0.1;

/// Minimum shoulder-midline-minus-nose height before posture is bad
pub const DEFAULT_FORWARD_LEAN_THRESHOLD: f64 = -0.1;

/// Frames are normalized to this resolution before landmark extraction
pub const FRAME_WIDTH: i32 = 640;
pub const FRAME_HEIGHT: i32 = 480;

/// Delay between successive capture ticks
pub const DEFAULT_TICK_INTERVAL_MS: u64 = 30;

/// Spoken when posture turns bad
pub const DEFAULT_ALERT_MESSAGE: &str = "Bad posture detected";

/// Speech rate in words per minute
pub const DEFAULT_SPEECH_RATE: u32 = 150;

/// Pending utterances the alert worker accepts before dropping new ones
pub const DEFAULT_ALERT_QUEUE_CAPACITY: usize = 4;

/// Default window title
pub const DEFAULT_WINDOW_TITLE: &str = "Body Posture Detection System";
