//! Gesture record types

use image::GrayImage;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::GestureError;

/// Identifier of a registered gesture, dense from 0
pub type GestureId = u32;

/// Which representation a feature uses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureKind {
    /// Single-channel template image
    Template,
    /// Flattened hand landmark vector
    Landmarks,
}

impl FeatureKind {
    /// File extension used for artifacts of this kind
    pub fn extension(&self) -> &'static str {
        match self {
            FeatureKind::Template => "png",
            FeatureKind::Landmarks => "json",
        }
    }
}

impl fmt::Display for FeatureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeatureKind::Template => write!(f, "template"),
            FeatureKind::Landmarks => write!(f, "landmarks"),
        }
    }
}

/// Hand landmarks flattened as all x, then all y, then all z
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LandmarkVector(Vec<f32>);

impl LandmarkVector {
    /// Wrap an already flattened vector
    pub fn new(values: Vec<f32>) -> Self {
        Self(values)
    }

    /// Flatten per-landmark `[x, y, z]` points
    pub fn from_points(points: &[[f32; 3]]) -> Self {
        let mut values = Vec::with_capacity(points.len() * 3);
        for axis in 0..3 {
            values.extend(points.iter().map(|p| p[axis]));
        }
        Self(values)
    }

    /// Number of landmarks (N in a 3xN vector)
    pub fn landmark_count(&self) -> usize {
        self.0.len() / 3
    }

    /// Get landmark `index` as `[x, y, z]`
    pub fn point(&self, index: usize) -> Option<[f32; 3]> {
        let n = self.landmark_count();
        if index >= n {
            return None;
        }
        Some([self.0[index], self.0[n + index], self.0[2 * n + index]])
    }

    pub fn values(&self) -> &[f32] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Euclidean norm
    pub fn norm(&self) -> f32 {
        self.0.iter().map(|v| v * v).sum::<f32>().sqrt()
    }

    /// Cosine similarity, `None` when lengths differ or either norm is zero
    pub fn cosine_similarity(&self, other: &LandmarkVector) -> Option<f32> {
        if self.0.len() != other.0.len() || self.0.is_empty() {
            return None;
        }
        let denom = self.norm() * other.norm();
        if denom <= f32::EPSILON || !denom.is_finite() {
            return None;
        }
        let dot: f32 = self.0.iter().zip(&other.0).map(|(a, b)| a * b).sum();
        Some(dot / denom)
    }
}

/// Feature representation extracted from a frame
#[derive(Debug, Clone, PartialEq)]
pub enum Feature {
    Template(GrayImage),
    Landmarks(LandmarkVector),
}

impl Feature {
    pub fn kind(&self) -> FeatureKind {
        match self {
            Feature::Template(_) => FeatureKind::Template,
            Feature::Landmarks(_) => FeatureKind::Landmarks,
        }
    }
}

/// Symbolic action handed to the input synthesizer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Action {
    /// Press a key by its symbolic name
    Key { key: String },
    /// Left click at the current cursor position
    Click,
    /// Move the cursor to absolute screen coordinates
    MoveCursor { x: i32, y: i32 },
}

impl Action {
    /// Key press action
    pub fn key(key: impl Into<String>) -> Self {
        Action::Key { key: key.into() }
    }

    /// Label written to the persisted table
    pub fn label(&self) -> String {
        self.to_string()
    }
}

impl std::str::FromStr for Action {
    type Err = GestureError;

    /// Parse a user-supplied binding; labels are stored upper-cased
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let label = s.trim().to_uppercase();
        match label.as_str() {
            "" => Err(GestureError::EmptyBinding),
            "CLICK" => Ok(Action::Click),
            _ => Ok(Action::Key { key: label }),
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Key { key } => write!(f, "{}", key),
            Action::Click => write!(f, "CLICK"),
            Action::MoveCursor { x, y } => write!(f, "MOVE({}, {})", x, y),
        }
    }
}

/// A registered gesture
#[derive(Debug, Clone, PartialEq)]
pub struct GestureRecord {
    pub id: GestureId,
    pub feature: Feature,
    pub action: Action,
}
