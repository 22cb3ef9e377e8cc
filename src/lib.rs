//! Real-time posture monitoring library.
//!
//! Frames from a webcam go through a small pipeline once per tick:
//! 1. A pose landmark model locates the nose and shoulders
//! 2. A geometric classifier decides whether posture is acceptable
//! 3. A debouncer turns the verdict stream into one alert per bad spell
//! 4. The alert is spoken and the annotated frame is displayed
//!
//! The classifier and debouncer are pure and can be used on their own.
//!
//! # Examples
//!
//! ## Classifying and Debouncing
//!
//! ```
//! use posture_guard::{
//!     debounce::AlertDebouncer,
//!     landmarks::{BodyPoint, Landmark, LandmarkSet},
//!     posture::{classify, PostureVerdict},
//! };
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let slouching = LandmarkSet::from_points([
//!     (BodyPoint::Nose, Landmark::new(0.50, 0.55)),
//!     (BodyPoint::LeftShoulder, Landmark::new(0.60, 0.40)),
//!     (BodyPoint::RightShoulder, Landmark::new(0.40, 0.42)),
//! ]);
//!
//! let verdict = classify(&slouching)?;
//! assert_eq!(verdict, PostureVerdict::Bad);
//!
//! let mut debouncer = AlertDebouncer::new();
//! assert!(debouncer.update(verdict)); // first bad frame alerts
//! assert!(!debouncer.update(verdict)); // sustained bad posture stays quiet
//! # Ok(())
//! # }
//! ```
//!
//! ## Running the Capture Loop
//!
//! ```no_run
//! use posture_guard::{
//!     alert::CommandSpeaker,
//!     camera::OpenCvCamera,
//!     capture::{CaptureSession, SessionSettings, TickOutcome},
//!     overlay::SkeletonOverlay,
//!     pose_detection::PoseDetector,
//! };
//! use std::{thread, time::Duration};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut detector = PoseDetector::new("assets/pose_landmark_full.onnx", 256, 0.5)?;
//! let overlay = SkeletonOverlay::default();
//! let speaker = CommandSpeaker::platform_default(150);
//!
//! let mut session = CaptureSession::open(OpenCvCamera::default(), SessionSettings::default())?;
//! session.start();
//!
//! for _ in 0..100 {
//!     match session.tick(&mut detector, &overlay, &speaker) {
//!         TickOutcome::Processed(result) => println!("{}", result.status_text()),
//!         TickOutcome::Reconnecting { reopened } => println!("reconnecting (reopened: {reopened})"),
//!         TickOutcome::Idle => {}
//!     }
//!     thread::sleep(Duration::from_millis(30));
//! }
//!
//! session.close();
//! # Ok(())
//! # }
//! ```

/// Named body landmarks and the landmark source trait
pub mod landmarks;

/// Pose landmark detection with `ONNX` Runtime
pub mod pose_detection;

/// Posture classification from landmarks
pub mod posture;

/// Alert debouncing state machine
pub mod debounce;

/// Camera device access
pub mod camera;

/// Capture session and per-tick pipeline
pub mod capture;

/// Skeleton and verdict overlay drawing
pub mod overlay;

/// Spoken alerts and the background alert worker
pub mod alert;

/// Presentation sinks and user commands
pub mod display;

/// Main application module
pub mod app;

/// Error types and result handling
pub mod error;

/// Constants used throughout the application
pub mod constants;

/// Configuration management
pub mod config;

pub use error::{Error, Result};
