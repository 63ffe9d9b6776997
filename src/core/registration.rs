//! Gesture registration workflow
//!
//! `Idle -> Capturing -> AwaitingBinding -> Committed -> Idle`
//!
//! Capturing consumes one frame per engine tick. Only the last frame of the
//! capture is kept and turned into the stored feature; earlier frames of a
//! burst are dropped as they arrive. The action label is requested by
//! parking the session in `AwaitingBinding` until the caller answers, so the
//! tick loop keeps running (without matching) while the user types.

use serde::{Deserialize, Serialize};
use std::mem;

use crate::gestures::{Action, Feature, GestureId, GestureStore};
use crate::vision::{FeatureExtractor, Frame};
use crate::{GestureError, Result};

/// How many frames a registration captures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum CaptureMode {
    /// One representative frame
    Single,
    /// `repetitions` sequences of `sequence_length` frames
    Burst { sequence_length: u32, repetitions: u32 },
}

impl CaptureMode {
    /// Total frames consumed before extraction, saturating at `u32::MAX`
    pub fn frame_count(&self) -> u32 {
        match self {
            CaptureMode::Single => 1,
            CaptureMode::Burst {
                sequence_length,
                repetitions,
            } => sequence_length.saturating_mul(*repetitions).max(1),
        }
    }
}

/// Observable registration state
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistrationState {
    Idle,
    Capturing { captured: u32, total: u32 },
    AwaitingBinding,
    Committed { id: GestureId, action: Action },
}

/// Result of feeding a frame to the session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureProgress {
    /// Session was not capturing
    Ignored,
    /// More frames needed
    Capturing { captured: u32, total: u32 },
    /// Feature extracted, waiting for an action label
    Captured,
    /// Nothing usable in the final frame, session back to idle
    Failed,
}

enum Phase {
    Idle,
    Capturing {
        captured: u32,
        total: u32,
        last: Option<Frame>,
    },
    AwaitingBinding {
        feature: Feature,
        frame: Frame,
    },
    Committed {
        id: GestureId,
        action: Action,
        frame: Frame,
    },
}

/// Drives one gesture registration at a time
pub struct RegistrationSession {
    phase: Phase,
}

impl RegistrationSession {
    pub fn new() -> Self {
        Self { phase: Phase::Idle }
    }

    /// Start capturing
    pub fn begin(&mut self, mode: CaptureMode) -> Result<()> {
        if !matches!(self.phase, Phase::Idle) {
            return Err(GestureError::RegistrationInProgress);
        }
        let total = mode.frame_count();
        log::info!("Registration started, capturing {} frame(s)", total);
        self.phase = Phase::Capturing {
            captured: 0,
            total,
            last: None,
        };
        Ok(())
    }

    /// Consume a captured frame
    pub fn feed(&mut self, frame: &Frame, extractor: &mut dyn FeatureExtractor) -> CaptureProgress {
        let Phase::Capturing {
            captured,
            total,
            last,
        } = &mut self.phase
        else {
            return CaptureProgress::Ignored;
        };

        *captured += 1;
        *last = Some(frame.clone());
        if *captured < *total {
            return CaptureProgress::Capturing {
                captured: *captured,
                total: *total,
            };
        }

        let Some(frame) = last.take() else {
            self.phase = Phase::Idle;
            return CaptureProgress::Failed;
        };

        match extractor.extract(&frame) {
            Ok(Some(feature)) => {
                log::info!("Registration captured, awaiting action binding");
                self.phase = Phase::AwaitingBinding { feature, frame };
                CaptureProgress::Captured
            }
            Ok(None) | Err(GestureError::FeatureNotDetected) => {
                log::warn!("Registration failed: no hand detected in captured frame");
                self.phase = Phase::Idle;
                CaptureProgress::Failed
            }
            Err(e) => {
                log::warn!("Registration failed: {}", e);
                self.phase = Phase::Idle;
                CaptureProgress::Failed
            }
        }
    }

    /// Bind an action label and commit the gesture
    ///
    /// An empty label aborts the registration without touching the store.
    pub fn bind(&mut self, label: &str, store: &mut GestureStore) -> Result<GestureId> {
        if !matches!(self.phase, Phase::AwaitingBinding { .. }) {
            return Err(GestureError::NotAwaitingBinding);
        }
        let Phase::AwaitingBinding { feature, frame } = mem::replace(&mut self.phase, Phase::Idle)
        else {
            return Err(GestureError::NotAwaitingBinding);
        };

        let action: Action = match label.parse() {
            Ok(action) => action,
            Err(e) => {
                log::info!("Registration aborted: no action supplied");
                return Err(e);
            }
        };

        let id = store.append(feature, action.clone())?;
        let action = store.get(id).map(|r| r.action.clone()).unwrap_or(action);
        self.phase = Phase::Committed { id, action, frame };
        Ok(id)
    }

    /// Abandon a capture or a pending binding
    pub fn cancel(&mut self) -> bool {
        match self.phase {
            Phase::Capturing { .. } | Phase::AwaitingBinding { .. } => {
                log::info!("Registration cancelled");
                self.phase = Phase::Idle;
                true
            }
            _ => false,
        }
    }

    /// Leave `Committed` and hand the camera back to matching
    ///
    /// Returns false while a capture or binding is still pending.
    pub fn proceed(&mut self) -> bool {
        match self.phase {
            Phase::Committed { .. } => {
                self.phase = Phase::Idle;
                true
            }
            Phase::Idle => true,
            _ => false,
        }
    }

    pub fn reset(&mut self) {
        self.phase = Phase::Idle;
    }

    pub fn state(&self) -> RegistrationState {
        match &self.phase {
            Phase::Idle => RegistrationState::Idle,
            Phase::Capturing {
                captured, total, ..
            } => RegistrationState::Capturing {
                captured: *captured,
                total: *total,
            },
            Phase::AwaitingBinding { .. } => RegistrationState::AwaitingBinding,
            Phase::Committed { id, action, .. } => RegistrationState::Committed {
                id: *id,
                action: action.clone(),
            },
        }
    }

    /// True from `begin` until `proceed`, cancel or failure
    pub fn is_active(&self) -> bool {
        !matches!(self.phase, Phase::Idle)
    }

    pub fn is_capturing(&self) -> bool {
        matches!(self.phase, Phase::Capturing { .. })
    }

    /// Frame the pending or committed gesture was taken from
    pub fn preview(&self) -> Option<&Frame> {
        match &self.phase {
            Phase::AwaitingBinding { frame, .. } | Phase::Committed { frame, .. } => Some(frame),
            _ => None,
        }
    }
}

impl Default for RegistrationSession {
    fn default() -> Self {
        Self::new()
    }
}
