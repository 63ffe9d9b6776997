//! Rule-based hand pose classifier
//!
//! Classifies a single hand from fingertip distances in the image plane,
//! with no registered gestures involved. Landmark indices follow the
//! 21-point hand model (4 thumb tip, 8 index tip, 12 middle tip, 16 ring tip).

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::gestures::{Action, GestureId, LandmarkVector};

const THUMB_TIP: usize = 4;
const INDEX_TIP: usize = 8;
const MIDDLE_TIP: usize = 12;
const RING_TIP: usize = 16;
/// Landmarks in the hand model
pub const HAND_LANDMARKS: usize = 21;

/// Distance thresholds, in normalized image coordinates
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleConfig {
    /// Fingertips closer than this count as touching
    #[serde(default = "default_pinch")]
    pub pinch_threshold: f32,
    /// Thumb and index further apart than this mean "pointing"
    #[serde(default = "default_spread")]
    pub spread_threshold: f32,
}

fn default_pinch() -> f32 {
    0.05
}

fn default_spread() -> f32 {
    0.2
}

impl Default for RuleConfig {
    fn default() -> Self {
        Self {
            pinch_threshold: default_pinch(),
            spread_threshold: default_spread(),
        }
    }
}

/// Poses the classifier can tell apart
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HandPose {
    /// Thumb touching index finger
    Click,
    /// Thumb touching middle finger
    VolumeUp,
    /// Thumb touching ring finger
    VolumeDown,
    /// Index finger extended away from the thumb
    MoveCursor,
    Unknown,
}

impl HandPose {
    /// Stable id used for smoothing and cooldown, `None` for `Unknown`
    pub fn id(&self) -> Option<GestureId> {
        match self {
            HandPose::Click => Some(0),
            HandPose::VolumeUp => Some(1),
            HandPose::VolumeDown => Some(2),
            HandPose::MoveCursor => Some(3),
            HandPose::Unknown => None,
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            HandPose::Click => "Click: Bring thumb and index finger together.",
            HandPose::VolumeUp => "Volume Up: Bring thumb and middle finger together.",
            HandPose::VolumeDown => "Volume Down: Bring thumb and ring finger together.",
            HandPose::MoveCursor => "Move Cursor: Extend index finger alone.",
            HandPose::Unknown => "Unknown: Gesture not recognized.",
        }
    }
}

impl fmt::Display for HandPose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            HandPose::Click => "click",
            HandPose::VolumeUp => "volume_up",
            HandPose::VolumeDown => "volume_down",
            HandPose::MoveCursor => "move_cursor",
            HandPose::Unknown => "unknown",
        };
        write!(f, "{}", name)
    }
}

/// Fixed-rule classifier over landmark vectors
#[derive(Debug, Clone, Default)]
pub struct RuleClassifier {
    config: RuleConfig,
}

impl RuleClassifier {
    pub fn new(config: RuleConfig) -> Self {
        Self { config }
    }

    /// Classify one hand; checks run in priority order, click first
    pub fn classify(&self, landmarks: &LandmarkVector) -> HandPose {
        if landmarks.landmark_count() < HAND_LANDMARKS {
            return HandPose::Unknown;
        }
        let dist = |a: usize, b: usize| -> Option<f32> {
            let pa = landmarks.point(a)?;
            let pb = landmarks.point(b)?;
            Some(((pa[0] - pb[0]).powi(2) + (pa[1] - pb[1]).powi(2)).sqrt())
        };
        let (Some(thumb_index), Some(thumb_middle), Some(thumb_ring)) = (
            dist(THUMB_TIP, INDEX_TIP),
            dist(THUMB_TIP, MIDDLE_TIP),
            dist(THUMB_TIP, RING_TIP),
        ) else {
            return HandPose::Unknown;
        };

        if thumb_index < self.config.pinch_threshold {
            HandPose::Click
        } else if thumb_middle < self.config.pinch_threshold {
            HandPose::VolumeUp
        } else if thumb_ring < self.config.pinch_threshold {
            HandPose::VolumeDown
        } else if thumb_index > self.config.spread_threshold {
            HandPose::MoveCursor
        } else {
            HandPose::Unknown
        }
    }

    /// Action for `pose`; cursor moves track the index tip scaled to the frame
    pub fn action(
        &self,
        pose: HandPose,
        landmarks: &LandmarkVector,
        frame_size: (u32, u32),
    ) -> Option<Action> {
        match pose {
            HandPose::Click => Some(Action::Click),
            HandPose::VolumeUp => Some(Action::key("volumeup")),
            HandPose::VolumeDown => Some(Action::key("volumedown")),
            HandPose::MoveCursor => {
                let [x, y, _] = landmarks.point(INDEX_TIP)?;
                Some(Action::MoveCursor {
                    x: (x * frame_size.0 as f32) as i32,
                    y: (y * frame_size.1 as f32) as i32,
                })
            }
            HandPose::Unknown => None,
        }
    }
}
