//! Matching live features against registered gestures
//!
//! The two strategies intentionally disagree on policy:
//! - [`TemplateMatcher`] returns the *first* record (by id) whose
//!   mean-centered correlation clears the threshold, without ranking the rest.
//! - [`LandmarkMatcher`] returns the record with the *highest* cosine
//!   similarity among all that clear the threshold.
//!
//! First-match for templates is kept as-is; a lower-id template that barely
//! clears the threshold shadows a better match with a larger id.

use image::{imageops, GrayImage};

use crate::gestures::{Feature, FeatureKind, GestureId, GestureStore, LandmarkVector};

/// Default acceptance threshold for template correlation
pub const DEFAULT_TEMPLATE_THRESHOLD: f32 = 0.7;
/// Default acceptance threshold for landmark cosine similarity
pub const DEFAULT_LANDMARK_THRESHOLD: f32 = 0.8;

/// Per-frame match outcome
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatchResult {
    /// Matched gesture, if any cleared the threshold
    pub gesture_id: Option<GestureId>,
    /// Similarity of the accepted match (0.0 when none)
    pub score: f32,
}

impl MatchResult {
    pub fn none() -> Self {
        Self {
            gesture_id: None,
            score: 0.0,
        }
    }

    pub fn matched(id: GestureId, score: f32) -> Self {
        Self {
            gesture_id: Some(id),
            score,
        }
    }

    pub fn is_match(&self) -> bool {
        self.gesture_id.is_some()
    }
}

/// Compares a live feature with the stored gestures
pub trait Matcher: Send {
    fn name(&self) -> &'static str;

    /// Acceptance threshold in use
    fn threshold(&self) -> f32;

    fn match_feature(&self, live: &Feature, store: &GestureStore) -> MatchResult;
}

/// Create the matcher for a feature representation
pub fn create_matcher(kind: FeatureKind, threshold: Option<f32>) -> Box<dyn Matcher> {
    match kind {
        FeatureKind::Template => Box::new(TemplateMatcher::new(
            threshold.unwrap_or(DEFAULT_TEMPLATE_THRESHOLD),
        )),
        FeatureKind::Landmarks => Box::new(LandmarkMatcher::new(
            threshold.unwrap_or(DEFAULT_LANDMARK_THRESHOLD),
        )),
    }
}

/// Mean-centered correlation, first match wins
#[derive(Debug, Clone)]
pub struct TemplateMatcher {
    threshold: f32,
}

impl TemplateMatcher {
    pub fn new(threshold: f32) -> Self {
        Self { threshold }
    }

    /// Correlation coefficient of `stored` (resized to `live`) against `live`
    ///
    /// Both images are centered on their own mean, so a uniform or unrelated
    /// frame scores near zero. `None` for empty images or when either image
    /// has zero variance.
    pub fn correlation(live: &GrayImage, stored: &GrayImage) -> Option<f32> {
        if live.width() == 0 || live.height() == 0 || stored.width() == 0 || stored.height() == 0 {
            return None;
        }

        let resized;
        let template = if stored.dimensions() == live.dimensions() {
            stored
        } else {
            resized = imageops::resize(
                stored,
                live.width(),
                live.height(),
                imageops::FilterType::Triangle,
            );
            &resized
        };

        centered_correlation(live.as_raw(), template.as_raw())
    }
}

/// Σ(a-ā)(b-b̄) / √(Σ(a-ā)² Σ(b-b̄)²) over equally sized buffers
fn centered_correlation(a: &[u8], b: &[u8]) -> Option<f32> {
    if a.is_empty() || a.len() != b.len() {
        return None;
    }
    let n = a.len() as f64;
    let mean_a = a.iter().map(|&v| v as f64).sum::<f64>() / n;
    let mean_b = b.iter().map(|&v| v as f64).sum::<f64>() / n;

    let (mut cross, mut var_a, mut var_b) = (0.0f64, 0.0f64, 0.0f64);
    for (&pa, &pb) in a.iter().zip(b) {
        let da = pa as f64 - mean_a;
        let db = pb as f64 - mean_b;
        cross += da * db;
        var_a += da * da;
        var_b += db * db;
    }
    if var_a <= f64::EPSILON || var_b <= f64::EPSILON {
        return None;
    }

    let score = (cross / (var_a * var_b).sqrt()) as f32;
    score.is_finite().then_some(score)
}

impl Matcher for TemplateMatcher {
    fn name(&self) -> &'static str {
        "template"
    }

    fn threshold(&self) -> f32 {
        self.threshold
    }

    fn match_feature(&self, live: &Feature, store: &GestureStore) -> MatchResult {
        let Feature::Template(live) = live else {
            return MatchResult::none();
        };

        for record in store.records() {
            let Feature::Template(stored) = &record.feature else {
                continue;
            };
            if let Some(score) = Self::correlation(live, stored) {
                log::debug!("template {}: correlation {:.3}", record.id, score);
                if score >= self.threshold {
                    return MatchResult::matched(record.id, score);
                }
            }
        }
        MatchResult::none()
    }
}

/// Cosine similarity over landmark vectors, best match wins
#[derive(Debug, Clone)]
pub struct LandmarkMatcher {
    threshold: f32,
}

impl LandmarkMatcher {
    pub fn new(threshold: f32) -> Self {
        Self { threshold }
    }

    fn similarity(live: &LandmarkVector, stored: &LandmarkVector) -> Option<f32> {
        live.cosine_similarity(stored).filter(|s| s.is_finite())
    }
}

impl Matcher for LandmarkMatcher {
    fn name(&self) -> &'static str {
        "landmark"
    }

    fn threshold(&self) -> f32 {
        self.threshold
    }

    fn match_feature(&self, live: &Feature, store: &GestureStore) -> MatchResult {
        let Feature::Landmarks(live) = live else {
            return MatchResult::none();
        };

        let mut best = MatchResult::none();
        for record in store.records() {
            let Feature::Landmarks(stored) = &record.feature else {
                continue;
            };
            let Some(score) = Self::similarity(live, stored) else {
                continue;
            };
            if score >= self.threshold && (best.gesture_id.is_none() || score > best.score) {
                best = MatchResult::matched(record.id, score);
            }
        }
        best
    }
}
