//! Temporal smoothing of per-frame matches
//!
//! Single-frame classification flickers between neighbouring poses. The
//! smoother only confirms a gesture after it has been matched on enough
//! consecutive frames.

use serde::{Deserialize, Serialize};

use crate::gestures::GestureId;

/// How many consecutive matches confirm a gesture
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "policy", rename_all = "snake_case")]
pub enum SmoothingPolicy {
    /// Every match is confirmed on the frame it appears
    Immediate,
    /// A gesture must be matched on `required_frames` consecutive frames
    RunLength { required_frames: u32 },
}

impl SmoothingPolicy {
    pub fn required_frames(&self) -> u32 {
        match self {
            SmoothingPolicy::Immediate => 1,
            SmoothingPolicy::RunLength { required_frames } => (*required_frames).max(1),
        }
    }
}

/// Current run being tracked
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DetectionState {
    #[default]
    Idle,
    Accumulating { id: GestureId, count: u32 },
}

/// Debounces a stream of per-frame matches into confirmations
#[derive(Debug, Clone)]
pub struct TemporalSmoother {
    policy: SmoothingPolicy,
    state: DetectionState,
}

impl TemporalSmoother {
    pub fn new(policy: SmoothingPolicy) -> Self {
        Self {
            policy,
            state: DetectionState::Idle,
        }
    }

    /// Feed one frame's match; returns the id when it is confirmed
    ///
    /// Once a run reaches the required length every further frame of the
    /// same gesture confirms again; the dispatcher rate-limits repeats.
    pub fn observe(&mut self, matched: Option<GestureId>) -> Option<GestureId> {
        let required = self.policy.required_frames();

        let Some(id) = matched else {
            self.state = DetectionState::Idle;
            return None;
        };

        let count = match self.state {
            DetectionState::Accumulating { id: current, count } if current == id => {
                (count + 1).min(required)
            }
            _ => 1,
        };
        self.state = DetectionState::Accumulating { id, count };

        (count >= required).then_some(id)
    }

    pub fn state(&self) -> DetectionState {
        self.state
    }

    pub fn policy(&self) -> SmoothingPolicy {
        self.policy
    }

    pub fn reset(&mut self) {
        self.state = DetectionState::Idle;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const A: GestureId = 0;
    const B: GestureId = 1;

    fn confirmations(
        smoother: &mut TemporalSmoother,
        stream: &[Option<GestureId>],
    ) -> Vec<(usize, GestureId)> {
        stream
            .iter()
            .enumerate()
            .filter_map(|(i, m)| smoother.observe(*m).map(|id| (i, id)))
            .collect()
    }

    #[test]
    fn test_run_length_debounce() {
        let mut smoother = TemporalSmoother::new(SmoothingPolicy::RunLength { required_frames: 5 });
        let stream = [Some(A); 5]
            .into_iter()
            .chain([Some(B); 5])
            .collect::<Vec<_>>();

        assert_eq!(confirmations(&mut smoother, &stream), vec![(4, A), (9, B)]);
        assert_eq!(smoother.state(), DetectionState::Accumulating { id: B, count: 5 });
    }

    #[test]
    fn test_gap_resets_run() {
        let mut smoother = TemporalSmoother::new(SmoothingPolicy::RunLength { required_frames: 3 });
        let stream = [Some(A), Some(A), None, Some(A), Some(A), Some(A)];
        assert_eq!(confirmations(&mut smoother, &stream), vec![(5, A)]);
    }

    #[test]
    fn test_switch_restarts_count() {
        let mut smoother = TemporalSmoother::new(SmoothingPolicy::RunLength { required_frames: 3 });
        let stream = [Some(A), Some(A), Some(B), Some(A), Some(A)];
        assert!(confirmations(&mut smoother, &stream).is_empty());
        assert_eq!(smoother.state(), DetectionState::Accumulating { id: A, count: 2 });
    }

    #[test]
    fn test_repeat_confirmations_after_threshold() {
        let mut smoother = TemporalSmoother::new(SmoothingPolicy::RunLength { required_frames: 2 });
        let stream = [Some(A); 4];
        assert_eq!(confirmations(&mut smoother, &stream), vec![(1, A), (2, A), (3, A)]);
    }

    #[test]
    fn test_immediate() {
        let mut smoother = TemporalSmoother::new(SmoothingPolicy::Immediate);
        assert_eq!(smoother.observe(Some(A)), Some(A));
        assert_eq!(smoother.observe(Some(B)), Some(B));
        assert_eq!(smoother.observe(None), None);
        assert_eq!(smoother.state(), DetectionState::Idle);
    }

    #[test]
    fn test_reset() {
        let mut smoother = TemporalSmoother::new(SmoothingPolicy::RunLength { required_frames: 5 });
        smoother.observe(Some(A));
        smoother.reset();
        assert_eq!(smoother.state(), DetectionState::Idle);
    }
}
