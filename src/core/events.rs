//! Events, status text and tick outcomes reported by the engine

use std::fmt;
use std::sync::Arc;

use super::registration::CaptureProgress;
use crate::gestures::{Action, GestureId, StoreStatus};
use crate::vision::MatchResult;

/// Something the UI may want to react to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    /// A gesture was captured; ask the user for an action label
    BindingRequested { next_id: GestureId },
    /// A gesture was committed to the store
    GestureRegistered { id: GestureId, action: Action },
    /// Nothing usable was captured
    RegistrationFailed,
    /// An action went out to the input synthesizer
    ActionFired { id: GestureId, action: Action },
    /// All gestures were removed
    Reset,
}

/// Callback type for engine events
pub type EventCallback = Arc<dyn Fn(EngineEvent) + Send + Sync>;

/// Status line shown to the user
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineStatus {
    Store(StoreStatus),
    DetectionStarted,
    DetectionStopped,
    Capturing { captured: u32, total: u32 },
    /// Waiting for the label of gesture `number` (1-based)
    AwaitingBinding { number: u32 },
    Registered { number: u32, action: Action },
    RegistrationFailed,
    RegistrationAborted,
    RegistrationError(String),
    ReadyForNext,
    Reset,
    ResetFailed(String),
    CaptureFailed(String),
    ActionFailed(String),
}

impl fmt::Display for EngineStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineStatus::Store(status) => write!(f, "{}", status),
            EngineStatus::DetectionStarted => write!(f, "Gesture detection started!"),
            EngineStatus::DetectionStopped => write!(f, "Gesture detection stopped."),
            EngineStatus::Capturing { captured, total } => {
                write!(f, "Capturing gesture: frame {} of {}", captured, total)
            }
            EngineStatus::AwaitingBinding { number } => {
                write!(f, "Enter a key for Gesture {}:", number)
            }
            EngineStatus::Registered { number, action } => {
                write!(f, "Gesture {} assigned to key '{}'!", number, action)
            }
            EngineStatus::RegistrationFailed => {
                write!(f, "No hand detected. Gesture not registered.")
            }
            EngineStatus::RegistrationAborted => {
                write!(f, "No key entered. Gesture not registered.")
            }
            EngineStatus::RegistrationError(e) => write!(f, "Could not register gesture: {}", e),
            EngineStatus::ReadyForNext => write!(f, "Proceed to register the next gesture."),
            EngineStatus::Reset => write!(f, "All gestures have been reset."),
            EngineStatus::ResetFailed(e) => write!(f, "Reset incomplete: {}", e),
            EngineStatus::CaptureFailed(e) => write!(f, "Camera frame unavailable: {}", e),
            EngineStatus::ActionFailed(e) => write!(f, "Could not perform action: {}", e),
        }
    }
}

/// Per-frame classification readout
#[derive(Debug, Clone, PartialEq)]
pub enum ConfidenceReading {
    /// Nothing classified yet
    NotAvailable,
    NoHand,
    NoGesture,
    Match { score: f32, label: String },
}

impl fmt::Display for ConfidenceReading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfidenceReading::NotAvailable => write!(f, "Confidence: N/A"),
            ConfidenceReading::NoHand => write!(f, "No hand detected. Confidence: N/A"),
            ConfidenceReading::NoGesture => write!(f, "No gesture detected. Confidence: N/A"),
            ConfidenceReading::Match { score, label } => {
                write!(f, "Confidence: {:.2} - Key: {}", score, label)
            }
        }
    }
}

/// What a tick did with its frame
#[derive(Debug, Clone, PartialEq)]
pub enum TickOutcome {
    /// Registration is waiting on the user; no frame consumed
    Paused,
    /// No frame could be captured
    Skipped,
    /// Detection is off; the frame was only shown
    Live,
    /// The frame went to the registration session
    Registering(CaptureProgress),
    /// The frame was classified
    Classified {
        result: MatchResult,
        confirmed: Option<GestureId>,
        fired: Option<Action>,
    },
}

impl TickOutcome {
    /// Action emitted on this tick, if any
    pub fn fired(&self) -> Option<&Action> {
        match self {
            TickOutcome::Classified { fired, .. } => fired.as_ref(),
            _ => None,
        }
    }
}
