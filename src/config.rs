//! Codec configuration, named options and YAML loading.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{CodecError, Result};

/// Default initial target bitrate (bits per second).
pub const DEFAULT_TARGET_BITRATE_BPS: u64 = 100_000_000;
/// Default frame rate.
pub const DEFAULT_FRAMES_PER_SECOND: u32 = 30;
/// Default encoder reaction latency.
pub const DEFAULT_REACTION_LATENCY: Duration = Duration::from_millis(200);
/// Default number of frames in a transient burst.
pub const DEFAULT_BURST_FRAME_COUNT: u32 = 8;
/// Default size of the first frame of a burst (bytes).
pub const DEFAULT_BURST_FRAME_SIZE: usize = 13_500;
/// Default reference frame interval, also the start-up delay.
pub const DEFAULT_REFERENCE_FRAME_INTERVAL: Duration = Duration::from_millis(33);
/// Default reference frame size (bytes).
pub const DEFAULT_REFERENCE_FRAME_SIZE: usize = 4_170;
/// Default Laplace scale for frame size deviations.
pub const DEFAULT_SIZE_NOISE_SCALE: f64 = 0.15;
/// Default Laplace scale for frame interval deviations.
pub const DEFAULT_DURATION_NOISE_SCALE: f64 = 0.15;
/// Default lowest rate supported by the encoder.
pub const DEFAULT_MIN_BITRATE_BPS: u64 = 150_000;
/// Default highest rate supported by the encoder.
pub const DEFAULT_MAX_BITRATE_BPS: u64 = 150_000_000;

/// Tunables of the statistical codec.
///
/// Set once at construction and read-only afterwards. Durations are
/// (de)serialized as whole milliseconds under `*_ms` keys; missing keys fall
/// back to the defaults above.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CodecConfig {
    /// Initial target bitrate in bits per second
    pub target_bitrate_bps: u64,

    pub frames_per_second: u32,

    /// Minimum time between two accepted bitrate changes
    #[serde(rename = "reaction_latency_ms", with = "duration_ms")]
    pub reaction_latency: Duration,

    /// Frames in the transient period after a bitrate change
    pub burst_frame_count: u32,

    /// Size of the keyframe-like first burst frame in bytes
    pub burst_frame_size: usize,

    /// Nominal frame interval at the default configuration; the first frame
    /// is emitted after this delay
    #[serde(rename = "reference_frame_interval_ms", with = "duration_ms")]
    pub reference_frame_interval: Duration,

    /// Nominal frame size at the default configuration in bytes
    pub reference_frame_size: usize,

    /// Scale of the zero-mean Laplace distribution of normalized frame size
    pub size_noise_scale: f64,

    /// Scale of the zero-mean Laplace distribution of normalized frame interval
    pub duration_noise_scale: f64,

    pub min_bitrate_bps: u64,

    pub max_bitrate_bps: u64,

    /// Clamp accepted bitrates into `[min_bitrate_bps, max_bitrate_bps]`
    pub clamp_to_bounds: bool,

    /// Seed for the noise generators; `None` draws one from entropy
    pub seed: Option<u64>,
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            target_bitrate_bps: DEFAULT_TARGET_BITRATE_BPS,
            frames_per_second: DEFAULT_FRAMES_PER_SECOND,
            reaction_latency: DEFAULT_REACTION_LATENCY,
            burst_frame_count: DEFAULT_BURST_FRAME_COUNT,
            burst_frame_size: DEFAULT_BURST_FRAME_SIZE,
            reference_frame_interval: DEFAULT_REFERENCE_FRAME_INTERVAL,
            reference_frame_size: DEFAULT_REFERENCE_FRAME_SIZE,
            size_noise_scale: DEFAULT_SIZE_NOISE_SCALE,
            duration_noise_scale: DEFAULT_DURATION_NOISE_SCALE,
            min_bitrate_bps: DEFAULT_MIN_BITRATE_BPS,
            max_bitrate_bps: DEFAULT_MAX_BITRATE_BPS,
            clamp_to_bounds: false,
            seed: None,
        }
    }
}

impl CodecConfig {
    /// Build a configuration from the defaults plus a list of options.
    ///
    /// Options are applied in order; the first one that violates an invariant
    /// aborts construction.
    pub fn with_options<I>(options: I) -> Result<Self>
    where
        I: IntoIterator<Item = CodecOption>,
    {
        let mut config = Self::default();
        for option in options {
            option.apply(&mut config)?;
        }
        config.validate()?;
        Ok(config)
    }

    /// Parse a YAML document into a validated configuration.
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml_ng::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a YAML configuration file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let yaml = std::fs::read_to_string(path)
            .map_err(|e| CodecError::file_error(path.to_path_buf(), e))?;
        debug!("Loaded codec config from {} ({} bytes)", path.display(), yaml.len());
        Self::from_yaml_str(&yaml)
    }

    /// Check the invariants the generator relies on.
    pub fn validate(&self) -> Result<()> {
        if self.frames_per_second == 0 {
            return Err(CodecError::invalid_config(
                "frames_per_second",
                "must be greater than zero",
            ));
        }
        if !self.size_noise_scale.is_finite() {
            return Err(CodecError::invalid_config("size_noise_scale", "must be finite"));
        }
        if !self.duration_noise_scale.is_finite() {
            return Err(CodecError::invalid_config("duration_noise_scale", "must be finite"));
        }
        if self.min_bitrate_bps > self.max_bitrate_bps {
            return Err(CodecError::invalid_config(
                "min_bitrate_bps",
                format!(
                    "lower bound {} exceeds upper bound {}",
                    self.min_bitrate_bps, self.max_bitrate_bps
                ),
            ));
        }
        Ok(())
    }

    /// Nominal interval between frames, `1/fps`, truncated to whole nanoseconds.
    pub fn nominal_frame_duration(&self) -> Duration {
        Duration::from_nanos(self.nominal_frame_nanos() as u64)
    }

    pub(crate) fn nominal_frame_nanos(&self) -> f64 {
        1e9 / self.frames_per_second as f64
    }

    /// Apply the bounds to a requested bitrate when clamping is enabled.
    pub fn bounded_bitrate(&self, bps: u64) -> u64 {
        if self.clamp_to_bounds { bps.clamp(self.min_bitrate_bps, self.max_bitrate_bps) } else { bps }
    }
}

/// Named single-field override applied on top of the defaults.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CodecOption {
    FramesPerSecond(u32),
    TargetBitrate(u64),
    ReactionLatency(Duration),
    /// Frames in the transient burst after an accepted update; `0` disables bursts
    BurstFrameCount(u32),
    BurstFrameSize(usize),
    ReferenceFrameInterval(Duration),
    ReferenceFrameSize(usize),
    SizeNoiseScale(f64),
    DurationNoiseScale(f64),
    RateBounds { min_bps: u64, max_bps: u64 },
    ClampToBounds(bool),
    Seed(u64),
}

impl CodecOption {
    /// Write this option into `config`, rejecting values that break an invariant.
    pub fn apply(self, config: &mut CodecConfig) -> Result<()> {
        match self {
            CodecOption::FramesPerSecond(0) => {
                return Err(CodecError::invalid_config(
                    "frames_per_second",
                    "must be greater than zero",
                ));
            }
            CodecOption::FramesPerSecond(fps) => config.frames_per_second = fps,
            CodecOption::TargetBitrate(bps) => config.target_bitrate_bps = bps,
            CodecOption::ReactionLatency(latency) => config.reaction_latency = latency,
            CodecOption::BurstFrameCount(count) => config.burst_frame_count = count,
            CodecOption::BurstFrameSize(size) => config.burst_frame_size = size,
            CodecOption::ReferenceFrameInterval(interval) => {
                config.reference_frame_interval = interval
            }
            CodecOption::ReferenceFrameSize(size) => config.reference_frame_size = size,
            CodecOption::SizeNoiseScale(scale) if !scale.is_finite() => {
                return Err(CodecError::invalid_config("size_noise_scale", "must be finite"));
            }
            CodecOption::SizeNoiseScale(scale) => config.size_noise_scale = scale,
            CodecOption::DurationNoiseScale(scale) if !scale.is_finite() => {
                return Err(CodecError::invalid_config("duration_noise_scale", "must be finite"));
            }
            CodecOption::DurationNoiseScale(scale) => config.duration_noise_scale = scale,
            CodecOption::RateBounds { min_bps, max_bps } => {
                config.min_bitrate_bps = min_bps;
                config.max_bitrate_bps = max_bps;
            }
            CodecOption::ClampToBounds(clamp) => config.clamp_to_bounds = clamp,
            CodecOption::Seed(seed) => config.seed = Some(seed),
        }
        Ok(())
    }
}

mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}
