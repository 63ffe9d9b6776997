//! Action dispatch with per-gesture cooldown

use std::time::{Duration, Instant};

use crate::gestures::{Action, GestureId, GestureStore};
use crate::{GestureError, Result};

/// Receives actions to synthesize as OS input (key presses, clicks, cursor moves)
pub trait ActionSink: Send {
    fn perform(&mut self, action: &Action) -> Result<()>;
}

impl<F> ActionSink for F
where
    F: FnMut(&Action) -> Result<()> + Send,
{
    fn perform(&mut self, action: &Action) -> Result<()> {
        self(action)
    }
}

/// Sink that only logs, used when no input synthesizer is attached
#[derive(Debug, Default)]
pub struct LogSink;

impl ActionSink for LogSink {
    fn perform(&mut self, action: &Action) -> Result<()> {
        log::info!("Action: {}", action);
        Ok(())
    }
}

/// Last dispatch, used for the cooldown check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DispatchState {
    pub last_fired_id: Option<GestureId>,
    pub last_fire_time: Option<Instant>,
}

/// Turns confirmed gestures into at most one action each
///
/// A gesture different from the last one fired goes out immediately;
/// the same gesture again only after `cooldown` has passed.
#[derive(Debug, Clone)]
pub struct ActionDispatcher {
    cooldown: Duration,
    state: DispatchState,
}

impl ActionDispatcher {
    pub fn new(cooldown: Duration) -> Self {
        Self {
            cooldown,
            state: DispatchState::default(),
        }
    }

    /// Whether `id` may fire at `now`
    pub fn is_ready(&self, id: GestureId, now: Instant) -> bool {
        if self.state.last_fired_id != Some(id) {
            return true;
        }
        match self.state.last_fire_time {
            None => true,
            Some(last) => now.saturating_duration_since(last) > self.cooldown,
        }
    }

    /// Resolve `id` in the store and fire its action if allowed
    ///
    /// `UnknownGesture` when the id is not (or no longer) registered.
    pub fn dispatch(
        &mut self,
        id: GestureId,
        store: &GestureStore,
        now: Instant,
    ) -> Result<Option<Action>> {
        let record = store.get(id).ok_or(GestureError::UnknownGesture(id))?;
        Ok(self.dispatch_resolved(id, record.action.clone(), now))
    }

    /// Fire an already resolved action under the same cooldown rule
    pub fn dispatch_resolved(
        &mut self,
        id: GestureId,
        action: Action,
        now: Instant,
    ) -> Option<Action> {
        if !self.is_ready(id, now) {
            return None;
        }
        self.state = DispatchState {
            last_fired_id: Some(id),
            last_fire_time: Some(now),
        };
        Some(action)
    }

    pub fn state(&self) -> DispatchState {
        self.state
    }

    pub fn cooldown(&self) -> Duration {
        self.cooldown
    }

    pub fn reset(&mut self) {
        self.state = DispatchState::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gestures::{Feature, FeatureKind, LandmarkVector, StorePaths};

    const A: GestureId = 0;
    const B: GestureId = 1;

    fn ms(t0: Instant, n: u64) -> Instant {
        t0 + Duration::from_millis(n)
    }

    #[test]
    fn test_cooldown_and_gesture_change() {
        let mut dispatcher = ActionDispatcher::new(Duration::from_millis(500));
        let t0 = Instant::now();

        assert_eq!(dispatcher.dispatch_resolved(A, Action::key("A"), t0), Some(Action::key("A")));
        assert_eq!(dispatcher.dispatch_resolved(A, Action::key("A"), ms(t0, 300)), None);
        assert_eq!(
            dispatcher.dispatch_resolved(B, Action::key("B"), ms(t0, 310)),
            Some(Action::key("B"))
        );
        assert_eq!(dispatcher.state().last_fired_id, Some(B));
    }

    #[test]
    fn test_repeat_after_cooldown() {
        let mut dispatcher = ActionDispatcher::new(Duration::from_millis(500));
        let t0 = Instant::now();

        assert!(dispatcher.dispatch_resolved(A, Action::Click, t0).is_some());
        // strictly greater than the cooldown
        assert!(dispatcher.dispatch_resolved(A, Action::Click, ms(t0, 500)).is_none());
        assert!(dispatcher.dispatch_resolved(A, Action::Click, ms(t0, 501)).is_some());
    }

    #[test]
    fn test_suppressed_repeat_keeps_fire_time() {
        let mut dispatcher = ActionDispatcher::new(Duration::from_millis(500));
        let t0 = Instant::now();

        dispatcher.dispatch_resolved(A, Action::Click, t0);
        dispatcher.dispatch_resolved(A, Action::Click, ms(t0, 400));
        assert_eq!(dispatcher.state().last_fire_time, Some(t0));
        assert!(dispatcher.dispatch_resolved(A, Action::Click, ms(t0, 600)).is_some());
    }

    #[test]
    fn test_dispatch_from_store() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = GestureStore::empty(StorePaths::under(dir.path()), FeatureKind::Landmarks);
        store
            .append(Feature::Landmarks(LandmarkVector::new(vec![1.0, 0.0, 0.0])), Action::key("q"))
            .unwrap();

        let mut dispatcher = ActionDispatcher::new(Duration::from_millis(1000));
        let now = Instant::now();
        assert_eq!(dispatcher.dispatch(0, &store, now).unwrap(), Some(Action::key("Q")));

        let err = dispatcher.dispatch(7, &store, now).unwrap_err();
        assert!(matches!(err, GestureError::UnknownGesture(7)));
        assert_eq!(dispatcher.state().last_fired_id, Some(0));
    }

    #[test]
    fn test_closure_sink() {
        let mut seen = Vec::new();
        {
            let mut sink = |action: &Action| -> Result<()> {
                seen.push(action.clone());
                Ok(())
            };
            sink.perform(&Action::Click).unwrap();
        }
        assert_eq!(seen, vec![Action::Click]);
    }
}
