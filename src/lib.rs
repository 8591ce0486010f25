//! Sitting posture monitoring library.
//!
//! This library turns a stream of camera frames into posture verdicts and
//! debounced alerts:
//! - an external landmark estimator reports body joints per frame
//! - neck and spine angles are measured and classified against thresholds
//! - a frame-count hysteresis raises an alert only for sustained bad posture
//!
//! The processing pipeline consists of:
//! 1. Frame normalization to the processing resolution and brightness/contrast adjustment
//! 2. Frame skipping: only every `skip_frames + 1`-th frame is analyzed
//! 3. Landmark cache lookup keyed by nose and shoulder coordinates
//! 4. Angle measurement and classification on a cache miss
//! 5. Alert hysteresis, persistence and presentation
//!
//! # Examples
//!
//! ## Classifying Landmarks
//!
//! ```
//! use posture_monitor::{
//!     classifier::PostureClassifier,
//!     landmarks::{LandmarkId, LandmarkSet},
//! };
//!
//! let landmarks = LandmarkSet::new()
//!     .with(LandmarkId::Nose, (0.5, 0.3))
//!     .with(LandmarkId::LeftShoulder, (0.4, 0.5))
//!     .with(LandmarkId::RightShoulder, (0.6, 0.5))
//!     .with(LandmarkId::LeftHip, (0.45, 0.8))
//!     .with(LandmarkId::RightHip, (0.55, 0.8));
//!
//! let mut classifier = PostureClassifier::default();
//! let result = classifier.classify(Some(&landmarks)).expect("all joints present");
//! println!("{} (spine {:.1}°)", result.verdict.label(), result.angles.spine);
//! ```
//!
//! ## Alert Hysteresis
//!
//! ```
//! use posture_monitor::{
//!     alert::{AlertEngine, AlertEvent},
//!     classifier::{ErrorKind, PostureVerdict},
//! };
//!
//! let mut engine = AlertEngine::default();
//! let bad = PostureVerdict::incorrect(ErrorKind::NeckTilted);
//!
//! for _ in 0..9 {
//!     assert_eq!(engine.update(&bad), AlertEvent::None);
//! }
//! assert!(matches!(engine.update(&bad), AlertEvent::Activated { .. }));
//! assert_eq!(engine.update(&PostureVerdict::correct()), AlertEvent::Cleared);
//! ```
//!
//! ## Monitoring a Recording
//!
//! ```no_run
//! use posture_monitor::{
//!     app::PostureMonitor,
//!     capture::{ImageSequenceSource, SettingsHandle},
//!     config::Config,
//!     estimator::ReplayEstimator,
//!     presentation::LogPresenter,
//!     scheduler::FrameScheduler,
//!     store::InMemoryStore,
//! };
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::default();
//! let capture = ImageSequenceSource::from_dir("recording/frames", false)?;
//! let estimator = ReplayEstimator::from_file("recording/landmarks.jsonl", false)?;
//! let scheduler = FrameScheduler::new(
//!     Box::new(estimator),
//!     config.analysis_session(),
//!     config.scheduler_options(),
//! )?;
//!
//! let mut monitor = PostureMonitor::new(
//!     Box::new(capture),
//!     scheduler,
//!     Box::new(InMemoryStore::new(&config.storage.export_dir)),
//!     Box::new(LogPresenter::new()),
//!     None,
//!     SettingsHandle::new(config.camera.settings()),
//!     config.monitor_options(),
//! )?;
//! let stats = monitor.run(None)?;
//! println!("{} frames, {} alerts", stats.frames, stats.alerts);
//! # Ok(())
//! # }
//! ```

/// Angle between three 2-D points
pub mod geometry;

/// Named body joints and landmark sets
pub mod landmarks;

/// Neck/spine angle measurement and posture classification
pub mod classifier;

/// FIFO cache of classifications keyed by landmark fingerprints
pub mod cache;

/// Alert hysteresis state machine and suggestion lists
pub mod alert;

/// Background audible alert
pub mod notifier;

/// Per-frame skip policy and analysis pipeline
pub mod scheduler;

/// Device threads with deadline-bounded calls
pub mod worker;

/// Frame sources and camera settings
pub mod capture;

/// Landmark estimator interface
pub mod estimator;

/// Posture event storage, summaries and export
pub mod store;

/// Presentation interface and logging presenter
pub mod presentation;

/// Utility functions for numeric casts and pixel adjustment
pub mod utils;

/// Error types and result handling
pub mod error;

/// Monitoring session lifecycle
pub mod app;

/// Constants used throughout the application
pub mod constants;

/// Configuration management
pub mod config;

pub use error::{Error, Result};
