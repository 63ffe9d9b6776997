//! Frame capture sources
//!
//! The camera itself lives outside this crate; anything that yields frames
//! implements [`FrameSource`]. [`FrameSequenceCapture`] replays a directory
//! of still images, which is how recorded sessions are exercised offline.

use image::{imageops, DynamicImage, GrayImage, RgbImage};
use std::fs;
use std::path::{Path, PathBuf};

use crate::{GestureError, Result};

/// A captured RGB frame
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    image: RgbImage,
}

impl Frame {
    pub fn new(image: RgbImage) -> Self {
        Self { image }
    }

    /// Build from packed RGB bytes, `None` if the length doesn't match
    pub fn from_raw(width: u32, height: u32, data: Vec<u8>) -> Option<Self> {
        RgbImage::from_raw(width, height, data).map(Self::new)
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn image(&self) -> &RgbImage {
        &self.image
    }

    /// Grayscale copy used for template work
    pub fn to_luma(&self) -> GrayImage {
        imageops::grayscale(&self.image)
    }

    /// Downscale by `factor` (0, 1]; other factors return the frame unchanged
    pub fn scale(&self, factor: f32) -> Frame {
        if !(factor > 0.0 && factor < 1.0) {
            return self.clone();
        }
        let width = ((self.width() as f32 * factor).round() as u32).max(1);
        let height = ((self.height() as f32 * factor).round() as u32).max(1);
        Frame::new(imageops::resize(
            &self.image,
            width,
            height,
            imageops::FilterType::Triangle,
        ))
    }
}

impl From<DynamicImage> for Frame {
    fn from(img: DynamicImage) -> Self {
        Frame::new(img.into_rgb8())
    }
}

/// Something that produces frames, one per call
pub trait FrameSource: Send {
    /// Grab the next frame; `CaptureFailure` when none is available
    fn capture(&mut self) -> Result<Frame>;

    /// Whether the source can currently deliver frames
    fn is_available(&self) -> bool {
        true
    }
}

/// Replays image files from a directory in file-name order
pub struct FrameSequenceCapture {
    paths: Vec<PathBuf>,
    position: usize,
    loop_playback: bool,
}

impl FrameSequenceCapture {
    /// Collect every png/jpg/bmp file in `dir`
    pub fn from_directory(dir: impl AsRef<Path>, loop_playback: bool) -> Result<Self> {
        let dir = dir.as_ref();
        let mut paths: Vec<PathBuf> = fs::read_dir(dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| is_frame_file(p))
            .collect();
        paths.sort();

        if paths.is_empty() {
            return Err(GestureError::CaptureFailure(format!(
                "no frames found in {}",
                dir.display()
            )));
        }

        log::info!("Frame sequence: {} frames from {}", paths.len(), dir.display());
        Ok(Self {
            paths,
            position: 0,
            loop_playback,
        })
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

fn is_frame_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| matches!(e.to_lowercase().as_str(), "png" | "jpg" | "jpeg" | "bmp"))
        .unwrap_or(false)
}

impl FrameSource for FrameSequenceCapture {
    fn capture(&mut self) -> Result<Frame> {
        if self.position >= self.paths.len() {
            if !self.loop_playback {
                return Err(GestureError::CaptureFailure("end of frame sequence".into()));
            }
            self.position = 0;
        }

        let path = &self.paths[self.position];
        self.position += 1;
        let img = image::open(path)
            .map_err(|e| GestureError::CaptureFailure(format!("{}: {}", path.display(), e)))?;
        Ok(Frame::from(img))
    }

    fn is_available(&self) -> bool {
        self.loop_playback || self.position < self.paths.len()
    }
}
