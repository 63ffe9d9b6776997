//! Gesture engine
//!
//! Owns the store, the classifier and all per-session state, and advances
//! everything one frame per tick. The UI drives it through the boundary
//! methods (`begin_registration`, `bind_action`, `proceed`, `reset`,
//! `start_running`, `stop_running`) and reads `status` and
//! `confidence_text` back for display.

use std::mem;
use std::time::Instant;

use super::dispatcher::{ActionDispatcher, ActionSink, DispatchState};
use super::events::{ConfidenceReading, EngineEvent, EngineStatus, TickOutcome};
use super::registration::{CaptureProgress, RegistrationSession, RegistrationState};
use super::smoother::{DetectionState, TemporalSmoother};
use crate::config::{EngineConfig, MatchStrategy};
use crate::gestures::{Action, Feature, GestureId, GestureStore};
use crate::vision::{
    create_matcher, FeatureExtractor, Frame, FrameSource, MatchResult, Matcher, RuleClassifier,
};
use crate::{GestureError, Result};

/// Per-frame classification front-end
enum Classifier {
    /// Compare against registered gestures
    Store(Box<dyn Matcher>),
    /// Fixed poses, actions computed per frame
    Rules(RuleClassifier),
}

/// Mutable engine state, reset together on `reset`
struct EngineState {
    running: bool,
    smoother: TemporalSmoother,
    dispatcher: ActionDispatcher,
    registration: RegistrationSession,
    status: EngineStatus,
    confidence: ConfidenceReading,
    events: Vec<EngineEvent>,
}

/// Gesture classification and action-dispatch engine
pub struct GestureEngine {
    config: EngineConfig,
    store: GestureStore,
    classifier: Classifier,
    extractor: Box<dyn FeatureExtractor>,
    sink: Box<dyn ActionSink>,
    state: EngineState,
}

impl GestureEngine {
    /// Build an engine and open the persisted store
    ///
    /// The extractor must produce the feature kind the strategy matches on.
    pub fn new(
        config: EngineConfig,
        extractor: Box<dyn FeatureExtractor>,
        sink: Box<dyn ActionSink>,
    ) -> Result<Self> {
        config.validate()?;

        let kind = config.strategy.feature_kind();
        if extractor.kind() != kind {
            return Err(GestureError::FeatureKindMismatch {
                expected: kind,
                actual: extractor.kind(),
            });
        }

        let (store, store_status, classifier) = match config.strategy {
            MatchStrategy::Rules => (
                GestureStore::empty(config.storage.clone(), kind),
                None,
                Classifier::Rules(RuleClassifier::new(config.rules.clone())),
            ),
            MatchStrategy::Template | MatchStrategy::Landmark => {
                let (store, status) = GestureStore::open(config.storage.clone(), kind);
                let matcher = create_matcher(kind, Some(config.threshold()));
                (store, Some(status), Classifier::Store(matcher))
            }
        };

        let status = match store_status {
            Some(status) => EngineStatus::Store(status),
            None => EngineStatus::DetectionStopped,
        };

        log::info!(
            "Gesture engine ready: {:?} strategy, {} stored gestures",
            config.strategy,
            store.len()
        );

        let state = EngineState {
            running: false,
            smoother: TemporalSmoother::new(config.smoothing()),
            dispatcher: ActionDispatcher::new(config.cooldown()),
            registration: RegistrationSession::new(),
            status,
            confidence: ConfidenceReading::NotAvailable,
            events: Vec::new(),
        };

        Ok(Self {
            config,
            store,
            classifier,
            extractor,
            sink,
            state,
        })
    }

    /// Whether the next tick would consume a frame
    ///
    /// False while registration waits on the user.
    pub fn wants_frame(&self) -> bool {
        matches!(
            self.state.registration.state(),
            RegistrationState::Idle | RegistrationState::Capturing { .. }
        )
    }

    /// Capture one frame from `source` and process it
    ///
    /// No capture happens while paused. A failed capture skips the tick.
    pub fn poll(&mut self, source: &mut dyn FrameSource) -> TickOutcome {
        if !self.wants_frame() {
            return TickOutcome::Paused;
        }
        match source.capture() {
            Ok(frame) => self.on_tick(&frame),
            Err(e) => {
                log::debug!("Skipping tick: {}", e);
                self.state.status = EngineStatus::CaptureFailed(e.to_string());
                TickOutcome::Skipped
            }
        }
    }

    /// Process one frame
    pub fn on_tick(&mut self, frame: &Frame) -> TickOutcome {
        self.on_tick_at(frame, Instant::now())
    }

    /// Process one frame as if it arrived at `now`
    pub fn on_tick_at(&mut self, frame: &Frame, now: Instant) -> TickOutcome {
        if !self.wants_frame() {
            return TickOutcome::Paused;
        }

        let frame_size = (frame.width(), frame.height());
        let scale = self.config.capture.analysis_scale;
        let scaled;
        let frame = if scale < 1.0 {
            scaled = frame.scale(scale);
            &scaled
        } else {
            frame
        };

        if self.state.registration.is_capturing() {
            return self.feed_registration(frame);
        }
        if !self.state.running {
            return TickOutcome::Live;
        }
        self.classify(frame, frame_size, now)
    }

    fn feed_registration(&mut self, frame: &Frame) -> TickOutcome {
        let progress = self.state.registration.feed(frame, self.extractor.as_mut());
        match &progress {
            CaptureProgress::Capturing { captured, total } => {
                self.state.status = EngineStatus::Capturing {
                    captured: *captured,
                    total: *total,
                };
            }
            CaptureProgress::Captured => {
                let next_id = self.store.current_index();
                self.state.status = EngineStatus::AwaitingBinding {
                    number: next_id + 1,
                };
                self.state.events.push(EngineEvent::BindingRequested { next_id });
            }
            CaptureProgress::Failed => {
                self.state.status = EngineStatus::RegistrationFailed;
                self.state.events.push(EngineEvent::RegistrationFailed);
            }
            CaptureProgress::Ignored => {}
        }
        TickOutcome::Registering(progress)
    }

    fn classify(&mut self, frame: &Frame, frame_size: (u32, u32), now: Instant) -> TickOutcome {
        let feature = match self.extractor.extract(frame) {
            Ok(feature) => feature,
            Err(GestureError::FeatureNotDetected) => None,
            Err(e) => {
                log::warn!("Feature extraction failed: {}", e);
                None
            }
        };

        let state = &mut self.state;
        let (result, confirmed, fired) = match &self.classifier {
            Classifier::Store(matcher) => {
                let result = match &feature {
                    Some(live) => matcher.match_feature(live, &self.store),
                    None => MatchResult::none(),
                };
                state.confidence = match (&feature, result.gesture_id) {
                    (None, _) => ConfidenceReading::NoHand,
                    (Some(_), None) => ConfidenceReading::NoGesture,
                    (Some(_), Some(id)) => ConfidenceReading::Match {
                        score: result.score,
                        label: self
                            .store
                            .get(id)
                            .map(|r| r.action.label())
                            .unwrap_or_default(),
                    },
                };

                let confirmed = state.smoother.observe(result.gesture_id);
                let fired = confirmed.and_then(|id| {
                    match state.dispatcher.dispatch(id, &self.store, now) {
                        Ok(action) => action,
                        Err(e) => {
                            log::warn!("Dropping confirmed gesture: {}", e);
                            None
                        }
                    }
                });
                (result, confirmed, fired)
            }
            Classifier::Rules(rules) => {
                let (result, action) = match &feature {
                    Some(Feature::Landmarks(landmarks)) => {
                        let pose = rules.classify(landmarks);
                        state.confidence = match pose.id() {
                            Some(_) => ConfidenceReading::Match {
                                score: 1.0,
                                label: pose.to_string(),
                            },
                            None => ConfidenceReading::NoGesture,
                        };
                        match pose.id() {
                            Some(id) => (
                                MatchResult::matched(id, 1.0),
                                rules.action(pose, landmarks, frame_size),
                            ),
                            None => (MatchResult::none(), None),
                        }
                    }
                    _ => {
                        state.confidence = ConfidenceReading::NoHand;
                        (MatchResult::none(), None)
                    }
                };

                let confirmed = state.smoother.observe(result.gesture_id);
                let fired = match (confirmed, action) {
                    (Some(id), Some(action)) => state.dispatcher.dispatch_resolved(id, action, now),
                    _ => None,
                };
                (result, confirmed, fired)
            }
        };

        if let (Some(id), Some(action)) = (confirmed, &fired) {
            self.perform(id, action);
        }

        TickOutcome::Classified {
            result,
            confirmed,
            fired,
        }
    }

    fn perform(&mut self, id: GestureId, action: &Action) {
        log::info!("Gesture {} fired: {}", id, action);
        if let Err(e) = self.sink.perform(action) {
            log::warn!("Action sink failed for gesture {}: {}", id, e);
            self.state.status = EngineStatus::ActionFailed(e.to_string());
        }
        self.state.events.push(EngineEvent::ActionFired {
            id,
            action: action.clone(),
        });
    }

    /// Start capturing a new gesture
    pub fn begin_registration(&mut self) -> Result<()> {
        if matches!(self.classifier, Classifier::Rules(_)) {
            return Err(GestureError::RegistrationUnsupported);
        }
        let mode = self.config.registration();
        self.state.registration.begin(mode)?;
        self.state.smoother.reset();
        self.state.status = EngineStatus::Capturing {
            captured: 0,
            total: mode.frame_count(),
        };
        Ok(())
    }

    /// Answer the pending binding prompt
    ///
    /// An empty label aborts the registration and leaves the store untouched.
    pub fn bind_action(&mut self, label: &str) -> Result<GestureId> {
        match self.state.registration.bind(label, &mut self.store) {
            Ok(id) => {
                let action = self
                    .store
                    .get(id)
                    .map(|r| r.action.clone())
                    .unwrap_or_else(|| Action::key(label));
                log::info!("Gesture {} bound to {}", id, action);
                self.state.status = EngineStatus::Registered {
                    number: id + 1,
                    action: action.clone(),
                };
                self.state.events.push(EngineEvent::GestureRegistered { id, action });
                Ok(id)
            }
            Err(GestureError::NotAwaitingBinding) => Err(GestureError::NotAwaitingBinding),
            Err(GestureError::EmptyBinding) => {
                self.state.status = EngineStatus::RegistrationAborted;
                Err(GestureError::EmptyBinding)
            }
            Err(e) => {
                log::warn!("Registration failed: {}", e);
                self.state.status = EngineStatus::RegistrationError(e.to_string());
                Err(e)
            }
        }
    }

    /// Dismiss the binding prompt without saving
    pub fn cancel_binding(&mut self) -> bool {
        let cancelled = self.state.registration.cancel();
        if cancelled {
            self.state.status = EngineStatus::RegistrationAborted;
        }
        cancelled
    }

    /// Return to live matching after a committed registration
    pub fn proceed(&mut self) -> bool {
        let committed = matches!(
            self.state.registration.state(),
            RegistrationState::Committed { .. }
        );
        if !self.state.registration.proceed() {
            return false;
        }
        if committed {
            self.state.smoother.reset();
            self.state.status = EngineStatus::ReadyForNext;
        }
        true
    }

    /// Delete every gesture and return to a fresh session
    pub fn reset(&mut self) -> Result<()> {
        let result = self.store.reset();
        self.state.registration.reset();
        self.state.smoother.reset();
        self.state.dispatcher.reset();
        self.state.confidence = ConfidenceReading::NotAvailable;

        match &result {
            Ok(()) => {
                log::info!("All gestures have been reset");
                self.state.status = EngineStatus::Reset;
                self.state.events.push(EngineEvent::Reset);
            }
            Err(e) => {
                log::warn!("Reset incomplete: {}", e);
                self.state.status = EngineStatus::ResetFailed(e.to_string());
            }
        }
        result
    }

    /// Enable matching and dispatch
    pub fn start_running(&mut self) {
        if !self.state.running {
            log::info!("Gesture detection started");
        }
        self.state.running = true;
        self.state.status = EngineStatus::DetectionStarted;
    }

    /// Disable matching; registration still works
    pub fn stop_running(&mut self) {
        if self.state.running {
            log::info!("Gesture detection stopped");
        }
        self.state.running = false;
        self.state.smoother.reset();
        self.state.status = EngineStatus::DetectionStopped;
    }

    pub fn is_running(&self) -> bool {
        self.state.running
    }

    /// Current status line
    pub fn status(&self) -> String {
        self.state.status.to_string()
    }

    pub fn status_kind(&self) -> &EngineStatus {
        &self.state.status
    }

    /// Classification readout for the last processed frame
    pub fn confidence_text(&self) -> String {
        self.state.confidence.to_string()
    }

    pub fn confidence(&self) -> &ConfidenceReading {
        &self.state.confidence
    }

    /// Take the events raised since the last call
    pub fn drain_events(&mut self) -> Vec<EngineEvent> {
        mem::take(&mut self.state.events)
    }

    pub fn registration_state(&self) -> RegistrationState {
        self.state.registration.state()
    }

    /// Frame of the pending or just committed registration
    pub fn registration_preview(&self) -> Option<&Frame> {
        self.state.registration.preview()
    }

    pub fn detection_state(&self) -> DetectionState {
        self.state.smoother.state()
    }

    pub fn dispatch_state(&self) -> DispatchState {
        self.state.dispatcher.state()
    }

    pub fn store(&self) -> &GestureStore {
        &self.store
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }
}
