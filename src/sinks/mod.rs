//! Frame sink implementations

pub mod channel;

pub use channel::{ChannelSink, FrameStream, frame_channel};
