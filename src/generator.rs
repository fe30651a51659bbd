//! Bitrate state machine and frame generation.
//!
//! [`BitrateState`] holds what changes at runtime: the current target, the
//! instant of the last accepted update and the number of burst frames still
//! owed. [`FrameGenerator`] turns that state into the next [`Frame`]:
//!
//! 1. Burst start: the first frame after an accepted update is exactly
//!    `burst_frame_size` bytes at the nominal interval.
//! 2. Burst continuation: the remaining burst frames share the burst budget,
//!    `target · count / (burst_size + count − 1)` bytes at the nominal interval.
//! 3. Steady state: `target / (8 · fps)` bytes and `1/fps` seconds, each
//!    scaled by `1 − noise` and floored at 1 byte and zero duration.
//!
//! Every burst frame consumes one unit of `remaining_burst_frames`, so a burst
//! lasts exactly `burst_frame_count` frames.

use std::time::Duration;

use tokio::time::Instant;
use tracing::trace;

use crate::CodecConfig;
use crate::noise::{LaplaceNoise, Noise};
use crate::types::Frame;

/// Mutable bitrate state owned by the scheduling loop
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BitrateState {
    target_bitrate_bps: u64,
    last_update: Option<Instant>,
    remaining_burst_frames: u32,
}

impl BitrateState {
    /// Steady state at the initial target, with no update accepted yet
    pub fn new(target_bitrate_bps: u64) -> Self {
        Self { target_bitrate_bps, last_update: None, remaining_burst_frames: 0 }
    }

    pub fn target_bitrate_bps(&self) -> u64 {
        self.target_bitrate_bps
    }

    pub fn last_update(&self) -> Option<Instant> {
        self.last_update
    }

    pub fn remaining_burst_frames(&self) -> u32 {
        self.remaining_burst_frames
    }

    pub fn is_bursting(&self) -> bool {
        self.remaining_burst_frames > 0
    }

    /// Apply an update request at `now`.
    ///
    /// Returns `false` when the previous accepted update is less than the
    /// reaction latency ago; the request is then dropped without effect. An
    /// accepted update (re)starts a burst.
    pub fn try_update(&mut self, bps: u64, now: Instant, config: &CodecConfig) -> bool {
        let too_early = self
            .last_update
            .is_some_and(|last| now.saturating_duration_since(last) < config.reaction_latency);
        if too_early {
            return false;
        }

        self.target_bitrate_bps = config.bounded_bitrate(bps);
        self.last_update = Some(now);
        self.remaining_burst_frames = config.burst_frame_count;
        true
    }

    fn consume_burst_frame(&mut self) {
        self.remaining_burst_frames = self.remaining_burst_frames.saturating_sub(1);
    }
}

/// Produces frames from the configuration, bitrate state and two noise sources
pub struct FrameGenerator<N = LaplaceNoise> {
    frames_per_second: u32,
    burst_frame_count: u32,
    burst_frame_size: usize,
    nominal_nanos: f64,
    size_noise: N,
    duration_noise: N,
}

impl FrameGenerator<LaplaceNoise> {
    /// Build a generator with Laplace noise at the configured scales.
    ///
    /// With a configured seed both noise sources are derived from it and the
    /// frame sequence is reproducible; otherwise each is seeded from entropy.
    pub fn from_config(config: &CodecConfig) -> Self {
        let (size_noise, duration_noise) = match config.seed {
            Some(seed) => (
                LaplaceNoise::seeded(config.size_noise_scale, seed),
                LaplaceNoise::seeded(config.duration_noise_scale, seed.wrapping_add(1)),
            ),
            None => (
                LaplaceNoise::from_entropy(config.size_noise_scale),
                LaplaceNoise::from_entropy(config.duration_noise_scale),
            ),
        };
        Self::with_noise(config, size_noise, duration_noise)
    }
}

impl<N: Noise> FrameGenerator<N> {
    /// Build a generator with explicit noise sources
    pub fn with_noise(config: &CodecConfig, size_noise: N, duration_noise: N) -> Self {
        Self {
            frames_per_second: config.frames_per_second,
            burst_frame_count: config.burst_frame_count,
            burst_frame_size: config.burst_frame_size,
            nominal_nanos: config.nominal_frame_nanos(),
            size_noise,
            duration_noise,
        }
    }

    /// Unperturbed frame interval
    pub fn nominal_duration(&self) -> Duration {
        Duration::from_nanos(self.nominal_nanos as u64)
    }

    /// Generate the next frame, consuming one burst frame if a burst is pending
    pub fn next_frame(&mut self, state: &mut BitrateState) -> Frame {
        let remaining = state.remaining_burst_frames;

        if remaining > 0 && remaining == self.burst_frame_count {
            state.consume_burst_frame();
            trace!("Burst start: {} bytes", self.burst_frame_size);
            return Frame::new(self.burst_frame_size.max(1), self.nominal_duration());
        }

        if remaining > 0 {
            state.consume_burst_frame();
            let size = self.burst_continuation_size(state.target_bitrate_bps);
            trace!("Burst continuation: {} bytes, {} remaining", size, state.remaining_burst_frames);
            return Frame::new(size, self.nominal_duration());
        }

        let bytes_per_frame = state.target_bitrate_bps / (8 * self.frames_per_second as u64);
        let size = (bytes_per_frame as f64 * (1.0 - self.size_noise.sample())).max(1.0);
        let nanos = (self.nominal_nanos * (1.0 - self.duration_noise.sample())).max(0.0);

        Frame::new(size as usize, Duration::from_nanos(nanos as u64))
    }

    // Mixes a bit rate with byte-valued denominators; kept as-is so existing
    // traces stay comparable.
    fn burst_continuation_size(&self, target_bitrate_bps: u64) -> usize {
        let count = self.burst_frame_count as u64;
        let numerator = target_bitrate_bps.saturating_mul(count);
        let denominator = (self.burst_frame_size as u64 + count).saturating_sub(1).max(1);
        usize::try_from(numerator / denominator).unwrap_or(usize::MAX).max(1)
    }
}
