//! Engine configuration
//!
//! Loaded from TOML. Only `strategy` is required; everything else falls back
//! to the defaults of the chosen strategy:
//!
//! ```toml
//! strategy = "landmark"       # "template", "landmark" or "rules"
//! threshold = 0.8
//! cooldown_ms = 1000
//!
//! [smoothing]
//! policy = "run_length"       # or "immediate"
//! required_frames = 5
//!
//! [registration]
//! mode = "burst"              # or "single"
//! sequence_length = 30
//! repetitions = 10
//!
//! [storage]
//! gesture_dir = "gestures"
//! mapping_file = "gesture_key_mapping.json"
//!
//! [capture]
//! interval_ms = 10
//! analysis_scale = 1.0
//! ```

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::core::{CaptureMode, SmoothingPolicy};
use crate::gestures::{FeatureKind, StorePaths};
use crate::vision::matcher::{DEFAULT_LANDMARK_THRESHOLD, DEFAULT_TEMPLATE_THRESHOLD};
use crate::vision::RuleConfig;
use crate::{GestureError, Result};

/// Which front-end classifies frames
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStrategy {
    /// Grayscale template correlation against registered snapshots
    Template,
    /// Cosine similarity against registered landmark vectors
    Landmark,
    /// Fixed fingertip rules, no registration
    Rules,
}

impl MatchStrategy {
    /// Feature representation this strategy consumes
    pub fn feature_kind(&self) -> FeatureKind {
        match self {
            MatchStrategy::Template => FeatureKind::Template,
            MatchStrategy::Landmark | MatchStrategy::Rules => FeatureKind::Landmarks,
        }
    }
}

/// Frame acquisition settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaptureSettings {
    /// Delay between ticks of the background runner
    #[serde(default = "default_interval")]
    pub interval_ms: u32,
    /// Downscale factor applied before extraction, in (0, 1]
    #[serde(default = "default_scale")]
    pub analysis_scale: f32,
}

fn default_interval() -> u32 {
    10
}

fn default_scale() -> f32 {
    1.0
}

impl Default for CaptureSettings {
    fn default() -> Self {
        Self {
            interval_ms: default_interval(),
            analysis_scale: default_scale(),
        }
    }
}

/// Full engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    pub strategy: MatchStrategy,
    /// Match acceptance threshold
    #[serde(default)]
    pub threshold: Option<f32>,
    /// Minimum gap between repeats of the same gesture
    #[serde(default)]
    pub cooldown_ms: Option<u64>,
    #[serde(default)]
    pub smoothing: Option<SmoothingPolicy>,
    #[serde(default)]
    pub registration: Option<CaptureMode>,
    #[serde(default)]
    pub storage: StorePaths,
    #[serde(default)]
    pub capture: CaptureSettings,
    #[serde(default)]
    pub rules: RuleConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::landmark()
    }
}

impl EngineConfig {
    /// Configuration with all defaults for `strategy`
    pub fn new(strategy: MatchStrategy) -> Self {
        Self {
            strategy,
            threshold: None,
            cooldown_ms: None,
            smoothing: None,
            registration: None,
            storage: StorePaths::default(),
            capture: CaptureSettings::default(),
            rules: RuleConfig::default(),
        }
    }

    /// Template matching: fire on every match, 500 ms repeat cooldown,
    /// register from a 10 x 30 frame burst
    pub fn template() -> Self {
        Self::new(MatchStrategy::Template)
    }

    /// Landmark matching: 5-frame confirmation, 1 s repeat cooldown,
    /// register from a single frame
    pub fn landmark() -> Self {
        Self::new(MatchStrategy::Landmark)
    }

    /// Rule-based cursor and volume control
    pub fn rules() -> Self {
        Self::new(MatchStrategy::Rules)
    }

    /// Load and validate a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&text)
    }

    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn with_threshold(mut self, threshold: f32) -> Self {
        self.threshold = Some(threshold);
        self
    }

    pub fn with_cooldown_ms(mut self, ms: u64) -> Self {
        self.cooldown_ms = Some(ms);
        self
    }

    pub fn with_smoothing(mut self, policy: SmoothingPolicy) -> Self {
        self.smoothing = Some(policy);
        self
    }

    pub fn with_registration(mut self, mode: CaptureMode) -> Self {
        self.registration = Some(mode);
        self
    }

    pub fn with_storage(mut self, storage: StorePaths) -> Self {
        self.storage = storage;
        self
    }

    pub fn with_analysis_scale(mut self, scale: f32) -> Self {
        self.capture.analysis_scale = scale;
        self
    }

    /// Effective match threshold
    pub fn threshold(&self) -> f32 {
        self.threshold.unwrap_or(match self.strategy {
            MatchStrategy::Template => DEFAULT_TEMPLATE_THRESHOLD,
            MatchStrategy::Landmark | MatchStrategy::Rules => DEFAULT_LANDMARK_THRESHOLD,
        })
    }

    /// Effective repeat cooldown
    pub fn cooldown(&self) -> Duration {
        let ms = self.cooldown_ms.unwrap_or(match self.strategy {
            MatchStrategy::Template => 500,
            MatchStrategy::Landmark => 1000,
            MatchStrategy::Rules => 0,
        });
        Duration::from_millis(ms)
    }

    /// Effective smoothing policy
    pub fn smoothing(&self) -> SmoothingPolicy {
        self.smoothing.unwrap_or(match self.strategy {
            MatchStrategy::Landmark => SmoothingPolicy::RunLength { required_frames: 5 },
            MatchStrategy::Template | MatchStrategy::Rules => SmoothingPolicy::Immediate,
        })
    }

    /// Effective registration capture mode
    pub fn registration(&self) -> CaptureMode {
        self.registration.unwrap_or(match self.strategy {
            MatchStrategy::Template => CaptureMode::Burst {
                sequence_length: 30,
                repetitions: 10,
            },
            MatchStrategy::Landmark | MatchStrategy::Rules => CaptureMode::Single,
        })
    }

    /// Reject values the engine cannot work with
    pub fn validate(&self) -> Result<()> {
        if let Some(t) = self.threshold {
            if !t.is_finite() || t > 1.0 {
                return Err(GestureError::Config(format!(
                    "threshold must be a number no greater than 1.0, got {}",
                    t
                )));
            }
        }
        let scale = self.capture.analysis_scale;
        if !(scale > 0.0 && scale <= 1.0) {
            return Err(GestureError::Config(format!(
                "analysis_scale must be in (0, 1], got {}",
                scale
            )));
        }
        if let Some(SmoothingPolicy::RunLength { required_frames: 0 }) = self.smoothing {
            return Err(GestureError::Config("required_frames must be at least 1".into()));
        }
        if let Some(CaptureMode::Burst {
            sequence_length,
            repetitions,
        }) = self.registration
        {
            if sequence_length == 0 || repetitions == 0 {
                return Err(GestureError::Config(
                    "burst sequence_length and repetitions must be at least 1".into(),
                ));
            }
        }
        Ok(())
    }
}
