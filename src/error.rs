//! Error types for the gesture engine

use std::path::PathBuf;

use crate::gestures::{FeatureKind, GestureId};

/// Result type for engine operations
pub type Result<T> = std::result::Result<T, GestureError>;

/// Errors raised by the store, matchers, and the engine
#[derive(Debug, thiserror::Error)]
pub enum GestureError {
    /// The frame source did not deliver a frame
    #[error("capture failed: {0}")]
    CaptureFailure(String),

    /// No hand or template was found in the frame
    #[error("no hand detected")]
    FeatureNotDetected,

    /// The persisted gesture table or one of its artifacts is unreadable
    #[error("corrupt gesture state at {path}: {reason}")]
    CorruptState { path: PathBuf, reason: String },

    /// A confirmed gesture is no longer in the store
    #[error("unknown gesture {0}")]
    UnknownGesture(GestureId),

    /// The user declined to supply an action label
    #[error("no action label supplied, registration aborted")]
    EmptyBinding,

    /// A feature of the wrong representation was offered to the store
    #[error("feature kind mismatch: store holds {expected}, got {actual}")]
    FeatureKindMismatch {
        expected: FeatureKind,
        actual: FeatureKind,
    },

    /// Cursor moves are computed per frame and cannot be stored
    #[error("action {0} cannot be bound to a registered gesture")]
    UnbindableAction(String),

    /// `bind_action` was called while no captured gesture is waiting
    #[error("no gesture is awaiting an action binding")]
    NotAwaitingBinding,

    /// A registration is already underway
    #[error("a gesture registration is already in progress")]
    RegistrationInProgress,

    /// The rule-based front-end has a fixed gesture set
    #[error("gesture registration is not supported by the rule-based front-end")]
    RegistrationUnsupported,

    /// The background runner was started twice
    #[error("gesture runner already running")]
    AlreadyRunning,

    /// Invalid configuration value
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Image(#[from] image::ImageError),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Toml(#[from] toml::de::Error),
}

impl GestureError {
    /// Build a corrupt-state error for `path`
    pub fn corrupt(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::CorruptState {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_corrupt_display() {
        let err = GestureError::corrupt("gesture_key_mapping.json", "expected value");
        let s = err.to_string();
        assert!(s.contains("gesture_key_mapping.json"));
        assert!(s.contains("expected value"));
    }

    #[test]
    fn test_kind_mismatch_display() {
        let err = GestureError::FeatureKindMismatch {
            expected: FeatureKind::Template,
            actual: FeatureKind::Landmarks,
        };
        assert_eq!(
            err.to_string(),
            "feature kind mismatch: store holds template, got landmarks"
        );
    }

    #[test]
    fn test_io_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: GestureError = io.into();
        assert!(matches!(err, GestureError::Io(_)));
    }
}
