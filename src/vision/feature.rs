//! Feature extraction boundary

use image::imageops;

use super::capture::Frame;
use crate::gestures::{Feature, FeatureKind};
use crate::Result;

/// Turns a frame into the representation the matcher compares
///
/// `Ok(None)` means nothing usable was in the frame (no hand, empty frame);
/// `Err(FeatureNotDetected)` is treated the same way.
/// Hand-landmark models live outside this crate and plug in through this trait.
pub trait FeatureExtractor: Send {
    /// Representation this extractor produces
    fn kind(&self) -> FeatureKind;

    fn extract(&mut self, frame: &Frame) -> Result<Option<Feature>>;
}

/// Grayscale template extractor
#[derive(Debug, Clone, Default)]
pub struct GrayscaleExtractor {
    /// Fixed template resolution, if any
    size: Option<(u32, u32)>,
}

impl GrayscaleExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resize every template to `width` x `height`
    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.size = Some((width.max(1), height.max(1)));
        self
    }
}

impl FeatureExtractor for GrayscaleExtractor {
    fn kind(&self) -> FeatureKind {
        FeatureKind::Template
    }

    fn extract(&mut self, frame: &Frame) -> Result<Option<Feature>> {
        if frame.width() == 0 || frame.height() == 0 {
            return Ok(None);
        }
        let gray = frame.to_luma();
        let gray = match self.size {
            Some((w, h)) if (w, h) != gray.dimensions() => {
                imageops::resize(&gray, w, h, imageops::FilterType::Triangle)
            }
            _ => gray,
        };
        Ok(Some(Feature::Template(gray)))
    }
}

/// Adapter for closures, handy for landmark models and tests
pub struct FnExtractor<F> {
    kind: FeatureKind,
    extract: F,
}

impl<F> FnExtractor<F>
where
    F: FnMut(&Frame) -> Option<Feature> + Send,
{
    pub fn new(kind: FeatureKind, extract: F) -> Self {
        Self { kind, extract }
    }
}

impl<F> FeatureExtractor for FnExtractor<F>
where
    F: FnMut(&Frame) -> Option<Feature> + Send,
{
    fn kind(&self) -> FeatureKind {
        self.kind
    }

    fn extract(&mut self, frame: &Frame) -> Result<Option<Feature>> {
        Ok((self.extract)(frame))
    }
}
