//! Kinesics
//!
//! Webcam hand-gesture classification and action dispatch.
//!
//! Frames come in one per tick, a feature (grayscale template or hand
//! landmark vector) is extracted, matched against registered gestures or a
//! fixed rule set, debounced over time, and the bound action goes out to an
//! `ActionSink` with a per-gesture cooldown. New gestures are registered from
//! the same frame stream and persisted to disk.
//!
//! Camera access, landmark detection and OS input synthesis stay outside the
//! crate behind the `FrameSource`, `FeatureExtractor` and `ActionSink` traits.

pub mod config;
pub mod core;
mod error;
pub mod gestures;
pub mod vision;

// Re-export commonly used types
pub use config::{CaptureSettings, EngineConfig, MatchStrategy};
pub use self::core::{
    ActionDispatcher, ActionSink, CaptureMode, EngineEvent, EngineStatus, GestureEngine,
    GestureRunner, LogSink, RegistrationSession, SmoothingPolicy, TemporalSmoother, TickOutcome,
};
pub use error::{GestureError, Result};
pub use gestures::{Action, Feature, FeatureKind, GestureId, GestureStore, LandmarkVector};
pub use vision::{FeatureExtractor, Frame, FrameSource, Matcher};
