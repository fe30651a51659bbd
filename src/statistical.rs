//! Statistical codec and its scheduling loop

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, sleep};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use crate::codec::Codec;
use crate::generator::{BitrateState, FrameGenerator};
use crate::sink::FrameSink;
use crate::{CodecConfig, CodecError, CodecOption, Result};

/// Bitrate requests buffered between the caller and the loop
pub const UPDATE_QUEUE_CAPACITY: usize = 64;

/// Synthetic encoder emitting statistically realistic frames
///
/// Frames are paced in real time: each one is written to the sink, then the
/// loop sleeps for that frame's duration before generating the next. After an
/// accepted bitrate change the codec emits a transient burst, and changes
/// closer together than the reaction latency are dropped.
///
/// All bitrate state is owned by the loop task. [`set_target_bitrate`]
/// only enqueues a request; [`target_bitrate`] reads a locked mirror of the
/// current value.
///
/// [`set_target_bitrate`]: StatisticalCodec::set_target_bitrate
/// [`target_bitrate`]: StatisticalCodec::target_bitrate
///
/// # Example
///
/// ```rust,no_run
/// use syncodec::{CodecOption, StatisticalCodec, frame_channel};
/// use futures::StreamExt;
///
/// #[tokio::main]
/// async fn main() -> syncodec::Result<()> {
///     let (sink, mut frames) = frame_channel(64);
///     let codec = StatisticalCodec::with_options(sink, [CodecOption::FramesPerSecond(25)])?;
///     let task = codec.spawn()?;
///
///     codec.set_target_bitrate(2_000_000);
///     while let Some(frame) = frames.next().await {
///         println!("{} bytes for {:?}", frame.len(), frame.duration);
///         if frames.frames_received() == 100 {
///             break;
///         }
///     }
///
///     codec.close()?;
///     task.await.expect("codec task panicked")?;
///     Ok(())
/// }
/// ```
pub struct StatisticalCodec<S: FrameSink> {
    config: CodecConfig,

    /// Mirror of the loop's current target for synchronous reads
    target_bitrate: Arc<Mutex<u64>>,

    /// Bitrate update requests into the loop
    updates: mpsc::Sender<u64>,

    /// Loop state until the codec is started
    pending: Mutex<Option<SchedulingLoop<S>>>,

    cancel: CancellationToken,
    closed: AtomicBool,
}

impl<S: FrameSink> StatisticalCodec<S> {
    /// Create a codec from a validated configuration.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::InvalidConfig`] if the configuration violates an
    /// invariant (e.g. zero frame rate).
    pub fn new(sink: S, config: CodecConfig) -> Result<Self> {
        config.validate()?;

        let target_bitrate = Arc::new(Mutex::new(config.target_bitrate_bps));
        let (updates_tx, updates_rx) = mpsc::channel(UPDATE_QUEUE_CAPACITY);
        let cancel = CancellationToken::new();

        let scheduling_loop = SchedulingLoop {
            generator: FrameGenerator::from_config(&config),
            state: BitrateState::new(config.target_bitrate_bps),
            config: config.clone(),
            sink,
            updates: updates_rx,
            target_bitrate: Arc::clone(&target_bitrate),
            cancel: cancel.clone(),
        };

        debug!(
            target_bitrate_bps = config.target_bitrate_bps,
            fps = config.frames_per_second,
            "Statistical codec created"
        );

        Ok(Self {
            config,
            target_bitrate,
            updates: updates_tx,
            pending: Mutex::new(Some(scheduling_loop)),
            cancel,
            closed: AtomicBool::new(false),
        })
    }

    /// Create a codec from the defaults plus named options.
    pub fn with_options<I>(sink: S, options: I) -> Result<Self>
    where
        I: IntoIterator<Item = CodecOption>,
    {
        Self::new(sink, CodecConfig::with_options(options)?)
    }

    /// Configuration this codec was built with
    pub fn config(&self) -> &CodecConfig {
        &self.config
    }

    /// Run the scheduling loop on the current task until [`close`](Self::close).
    ///
    /// # Errors
    ///
    /// - [`CodecError::AlreadyStarted`] if the loop was started before
    /// - [`CodecError::AlreadyClosed`] if the codec was closed before starting
    /// - [`CodecError::SinkClosed`] if the sink stops accepting frames
    pub async fn start(&self) -> Result<()> {
        self.take_loop()?.run().await
    }

    /// Run the scheduling loop as a separate tokio task.
    ///
    /// The returned handle completes after [`close`](Self::close), when the
    /// codec is dropped, or when the sink fails.
    pub fn spawn(&self) -> Result<JoinHandle<Result<()>>> {
        let scheduling_loop = self.take_loop()?;
        Ok(tokio::spawn(scheduling_loop.run()))
    }

    /// Signal the loop to stop.
    ///
    /// The loop exits at its next wake-up; a frame already being written
    /// completes first and any remaining burst frames are abandoned.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::AlreadyClosed`] on every call after the first.
    pub fn close(&self) -> Result<()> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Err(CodecError::AlreadyClosed);
        }
        debug!("Closing statistical codec");
        self.cancel.cancel();
        // A loop that never started releases its update queue here
        self.pending.lock().unwrap_or_else(PoisonError::into_inner).take();
        Ok(())
    }

    /// Current target bitrate in bits per second
    pub fn target_bitrate(&self) -> u64 {
        *self.target_bitrate.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Request a new target bitrate.
    ///
    /// Safe to call from any thread and never blocks. The request is dropped
    /// without notice if it arrives within the reaction latency of the last
    /// accepted change, if [`UPDATE_QUEUE_CAPACITY`] requests are already
    /// waiting, or after the codec is closed.
    pub fn set_target_bitrate(&self, bps: u64) {
        if let Err(e) = self.updates.try_send(bps) {
            trace!("Bitrate request {} not queued: {}", bps, e);
        }
    }

    fn take_loop(&self) -> Result<SchedulingLoop<S>> {
        if self.closed.load(Ordering::Acquire) {
            return Err(CodecError::AlreadyClosed);
        }
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .ok_or(CodecError::AlreadyStarted)
    }
}

#[async_trait::async_trait]
impl<S: FrameSink> Codec for StatisticalCodec<S> {
    async fn start(&self) -> Result<()> {
        StatisticalCodec::start(self).await
    }

    fn close(&self) -> Result<()> {
        StatisticalCodec::close(self)
    }

    fn target_bitrate(&self) -> u64 {
        StatisticalCodec::target_bitrate(self)
    }

    fn set_target_bitrate(&self, bps: u64) {
        StatisticalCodec::set_target_bitrate(self, bps)
    }
}

impl<S: FrameSink> Drop for StatisticalCodec<S> {
    fn drop(&mut self) {
        // Stop a spawned loop along with its handle
        self.cancel.cancel();
    }
}

/// Everything the loop task owns
struct SchedulingLoop<S> {
    config: CodecConfig,
    generator: FrameGenerator,
    state: BitrateState,
    sink: S,
    updates: mpsc::Receiver<u64>,
    target_bitrate: Arc<Mutex<u64>>,
    cancel: CancellationToken,
}

impl<S: FrameSink> SchedulingLoop<S> {
    async fn run(mut self) -> Result<()> {
        info!(
            "Scheduling loop started (target={} bps, {} fps)",
            self.state.target_bitrate_bps(),
            self.config.frames_per_second
        );

        // First frame is staggered by the reference interval
        let timer = sleep(self.config.reference_frame_interval);
        tokio::pin!(timer);
        let mut frames_emitted = 0u64;

        let result = loop {
            tokio::select! {
                biased;

                _ = self.cancel.cancelled() => {
                    debug!("Scheduling loop cancelled");
                    break Ok(());
                }

                () = &mut timer => {
                    // Requests that arrived before this tick apply to its frame
                    self.drain_updates();

                    let frame = self.generator.next_frame(&mut self.state);
                    let duration = frame.duration;
                    frames_emitted += 1;

                    trace!("Frame {}: {} bytes, {:?}", frames_emitted, frame.len(), duration);

                    if let Err(e) = self.sink.write_frame(frame).await {
                        warn!("Frame sink failed, stopping: {}", e);
                        break Err(e);
                    }

                    timer.as_mut().reset(Instant::now() + duration);
                }

                Some(bps) = self.updates.recv() => {
                    self.apply_update(bps);
                }
            }
        };

        info!("Scheduling loop ended (emitted {} frames)", frames_emitted);
        result
    }

    fn drain_updates(&mut self) {
        for _ in 0..UPDATE_QUEUE_CAPACITY {
            match self.updates.try_recv() {
                Ok(bps) => self.apply_update(bps),
                Err(_) => break,
            }
        }
    }

    fn apply_update(&mut self, bps: u64) {
        if !self.state.try_update(bps, Instant::now(), &self.config) {
            return;
        }

        let accepted = self.state.target_bitrate_bps();
        *self.target_bitrate.lock().unwrap_or_else(PoisonError::into_inner) = accepted;
        debug!(
            requested_bps = bps,
            accepted_bps = accepted,
            burst_frames = self.state.remaining_burst_frames(),
            "Target bitrate updated"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Frame;
    use std::time::Duration;

    fn recording_codec(
        options: impl IntoIterator<Item = CodecOption>,
    ) -> (StatisticalCodec<impl FrameSink>, Arc<Mutex<Vec<Frame>>>) {
        let frames = Arc::new(Mutex::new(Vec::new()));
        let sink_frames = Arc::clone(&frames);
        let sink = move |frame: Frame| sink_frames.lock().unwrap().push(frame);
        let codec = StatisticalCodec::with_options(sink, options).expect("valid options");
        (codec, frames)
    }

    #[test]
    fn invalid_options_prevent_construction() {
        let result = StatisticalCodec::with_options(|_: Frame| {}, [CodecOption::FramesPerSecond(0)]);
        assert!(matches!(result, Err(CodecError::InvalidConfig { .. })));
    }

    #[test]
    fn initial_target_is_readable_before_start() {
        let (codec, _) = recording_codec([CodecOption::TargetBitrate(1_500_000)]);
        assert_eq!(codec.target_bitrate(), 1_500_000);
        assert_eq!(codec.config().target_bitrate_bps, 1_500_000);
    }

    #[test]
    fn close_twice_is_an_error() {
        let (codec, _) = recording_codec([]);
        codec.close().expect("first close succeeds");
        assert!(matches!(codec.close(), Err(CodecError::AlreadyClosed)));
    }

    #[test]
    fn update_queue_is_bounded_and_released_on_close() {
        let (codec, _) = recording_codec([]);

        for bps in 0..(UPDATE_QUEUE_CAPACITY as u64 * 4) {
            codec.set_target_bitrate(bps);
        }
        assert_eq!(codec.updates.capacity(), 0);

        codec.close().unwrap();
        assert!(codec.pending.lock().unwrap().is_none());
        assert!(codec.updates.is_closed());

        // Requests after close are discarded rather than queued
        codec.set_target_bitrate(1_000_000);
        assert_eq!(codec.target_bitrate(), crate::config::DEFAULT_TARGET_BITRATE_BPS);
    }

    #[tokio::test(start_paused = true)]
    async fn start_twice_is_rejected() {
        let (codec, _) = recording_codec([]);
        let handle = codec.spawn().expect("first start succeeds");

        assert!(matches!(codec.start().await, Err(CodecError::AlreadyStarted)));

        codec.close().unwrap();
        handle.await.unwrap().unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn start_after_close_is_rejected() {
        let (codec, frames) = recording_codec([]);
        codec.close().unwrap();

        assert!(matches!(codec.start().await, Err(CodecError::AlreadyClosed)));
        assert!(frames.lock().unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn first_frame_waits_for_reference_interval() {
        let (codec, frames) = recording_codec([
            CodecOption::ReferenceFrameInterval(Duration::from_millis(50)),
            CodecOption::SizeNoiseScale(0.0),
            CodecOption::DurationNoiseScale(0.0),
        ]);
        let handle = codec.spawn().unwrap();

        tokio::time::sleep(Duration::from_millis(49)).await;
        assert!(frames.lock().unwrap().is_empty());

        tokio::time::sleep(Duration::from_millis(2)).await;
        assert_eq!(frames.lock().unwrap().len(), 1);

        codec.close().unwrap();
        handle.await.unwrap().unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_the_codec_stops_the_loop() {
        let (codec, _) = recording_codec([]);
        let handle = codec.spawn().unwrap();
        drop(codec);

        tokio::time::timeout(Duration::from_millis(10), handle)
            .await
            .expect("loop should exit after drop")
            .unwrap()
            .unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn codec_trait_object_is_usable() {
        let (codec, _) = recording_codec([CodecOption::TargetBitrate(1_000_000)]);
        let codec: Arc<dyn Codec> = Arc::new(codec);

        let runner = Arc::clone(&codec);
        let handle = tokio::spawn(async move { runner.start().await });

        codec.set_target_bitrate(3_000_000);
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(codec.target_bitrate(), 3_000_000);

        codec.close().unwrap();
        handle.await.unwrap().unwrap();
    }
}
