//! Frame capture, feature extraction and matching
//!
//! This module holds everything that looks at pixels or landmarks:
//! - `capture` - frames and the `FrameSource` seam for cameras
//! - `feature` - the `FeatureExtractor` seam and the grayscale template extractor
//! - `matcher` - template (first-match) and landmark (best-match) matchers
//! - `rules` - fixed fingertip-distance classifier for cursor/volume control

pub mod capture;
pub mod feature;
pub mod matcher;
pub mod rules;

pub use capture::{Frame, FrameSequenceCapture, FrameSource};
pub use feature::{FeatureExtractor, FnExtractor, GrayscaleExtractor};
pub use matcher::{create_matcher, LandmarkMatcher, MatchResult, Matcher, TemplateMatcher};
pub use rules::{HandPose, RuleClassifier, RuleConfig};
