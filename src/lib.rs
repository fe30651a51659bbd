//! Synthetic video codec for testing rate adaptation.
//!
//! `syncodec` fabricates a stream of video frames (size in bytes, presentation
//! duration) that behaves like the output of a rate-controlled encoder,
//! without encoding anything. It is meant to drive bandwidth estimators and
//! congestion controllers under test.
//!
//! # Features
//!
//! - **Realistic jitter**: frame sizes and intervals perturbed by Laplace noise
//! - **Encoder reaction**: a minimum interval between accepted bitrate changes
//! - **Transient bursts**: keyframe-like spikes right after a bitrate change
//! - **Real-time pacing**: frames are emitted on a timer, one per frame duration
//! - **Reproducible**: seed the noise generators for deterministic runs
//!
//! ## Example
//!
//! ```rust,no_run
//! use syncodec::{CodecOption, StatisticalCodec};
//!
//! #[tokio::main]
//! async fn main() -> syncodec::Result<()> {
//!     let sink = |frame: syncodec::Frame| println!("{} bytes", frame.len());
//!     let codec = StatisticalCodec::with_options(sink, [
//!         CodecOption::TargetBitrate(1_000_000),
//!         CodecOption::FramesPerSecond(30),
//!     ])?;
//!
//!     let task = codec.spawn()?;
//!     tokio::time::sleep(std::time::Duration::from_secs(1)).await;
//!     codec.set_target_bitrate(500_000);
//!     tokio::time::sleep(std::time::Duration::from_secs(1)).await;
//!
//!     codec.close()?;
//!     task.await.expect("codec task panicked")
//! }
//! ```

// Core types and error handling
mod error;
pub mod types;

// Generation engine
pub mod config;
pub mod generator;
pub mod noise;

// Runtime and collaborators
pub mod codec;
pub mod sink;
pub mod sinks;
pub mod statistical;

pub use error::*;
pub use types::*;

pub use codec::Codec;
pub use config::{CodecConfig, CodecOption};
pub use generator::{BitrateState, FrameGenerator};
pub use noise::{LaplaceNoise, Noise};
pub use sink::FrameSink;
pub use sinks::{ChannelSink, FrameStream, frame_channel};
pub use statistical::StatisticalCodec;
