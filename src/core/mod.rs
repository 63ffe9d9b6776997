//! Gesture engine core
//!
//! - `TemporalSmoother` - debounces per-frame matches into confirmations
//! - `ActionDispatcher` - rate-limits confirmed gestures into actions
//! - `RegistrationSession` - capture, bind and commit new gestures
//! - `GestureEngine` - ties them together, one frame per tick
//! - `GestureRunner` - drives an engine from a frame source on a worker thread

mod dispatcher;
mod engine;
mod events;
mod registration;
mod runner;
mod smoother;

pub use dispatcher::{ActionDispatcher, ActionSink, DispatchState, LogSink};
pub use engine::GestureEngine;
pub use events::{ConfidenceReading, EngineEvent, EngineStatus, EventCallback, TickOutcome};
pub use registration::{CaptureMode, CaptureProgress, RegistrationSession, RegistrationState};
pub use runner::{GestureRunner, RunnerState};
pub use smoother::{DetectionState, SmoothingPolicy, TemporalSmoother};
