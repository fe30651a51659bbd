//! Channel-backed sink exposing frames as a `Stream`

use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

use futures::Stream;
use pin_project_lite::pin_project;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::debug;

use crate::sink::FrameSink;
use crate::types::Frame;
use crate::{CodecError, Result};

/// Create a connected sink/stream pair with room for `capacity` frames.
///
/// When the buffer is full the codec waits for the consumer, so frame
/// generation slows down with it.
pub fn frame_channel(capacity: usize) -> (ChannelSink, FrameStream) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (ChannelSink { tx }, FrameStream::new(ReceiverStream::new(rx)))
}

/// Sink half of [`frame_channel`]
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::Sender<Frame>,
}

#[async_trait::async_trait]
impl FrameSink for ChannelSink {
    async fn write_frame(&mut self, frame: Frame) -> Result<()> {
        self.tx.send(frame).await.map_err(|_| {
            debug!("Frame receiver dropped");
            CodecError::sink_closed("frame stream receiver dropped")
        })
    }
}

pin_project! {
    /// Stream half of [`frame_channel`]
    ///
    /// Keeps running totals of what it has yielded so consumers can compare
    /// the produced rate against the requested target.
    pub struct FrameStream {
        #[pin]
        inner: ReceiverStream<Frame>,
        frames_received: u64,
        bytes_received: u64,
        media_duration: Duration,
    }
}

impl FrameStream {
    fn new(inner: ReceiverStream<Frame>) -> Self {
        Self { inner, frames_received: 0, bytes_received: 0, media_duration: Duration::ZERO }
    }

    pub fn frames_received(&self) -> u64 {
        self.frames_received
    }

    pub fn bytes_received(&self) -> u64 {
        self.bytes_received
    }

    /// Sum of the durations of all yielded frames
    pub fn media_duration(&self) -> Duration {
        self.media_duration
    }

    /// Bits received per second of media time, `None` before any media time elapsed
    pub fn average_bitrate_bps(&self) -> Option<f64> {
        let secs = self.media_duration.as_secs_f64();
        (secs > 0.0).then(|| self.bytes_received as f64 * 8.0 / secs)
    }
}

impl Stream for FrameStream {
    type Item = Frame;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.project();

        match this.inner.poll_next(cx) {
            Poll::Ready(Some(frame)) => {
                *this.frames_received += 1;
                *this.bytes_received += frame.len() as u64;
                *this.media_duration += frame.duration;
                Poll::Ready(Some(frame))
            }
            other => other,
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}
