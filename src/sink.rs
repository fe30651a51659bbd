//! Sink trait for generated frames

use crate::Result;
use crate::types::Frame;

/// Consumer of generated frames
///
/// The scheduling loop calls [`write_frame`](FrameSink::write_frame) once per
/// frame, in generation order, from its own task. Frame generation waits for
/// the write to finish, so a sink that never completes stalls the codec.
///
/// Returning an error stops the loop; the error is returned from `start`.
#[async_trait::async_trait]
pub trait FrameSink: Send + 'static {
    /// Accept one frame
    async fn write_frame(&mut self, frame: Frame) -> Result<()>;
}

/// Plain closures are sinks that never fail
#[async_trait::async_trait]
impl<F> FrameSink for F
where
    F: FnMut(Frame) + Send + 'static,
{
    async fn write_frame(&mut self, frame: Frame) -> Result<()> {
        self(frame);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    #[tokio::test]
    async fn closures_receive_frames_in_order() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_clone = Arc::clone(&seen);
        let mut sink = move |frame: Frame| seen_clone.lock().unwrap().push(frame.len());

        for size in [3usize, 1, 2] {
            sink.write_frame(Frame::new(size, Duration::from_millis(1)))
                .await
                .expect("closure sinks never fail");
        }

        assert_eq!(*seen.lock().unwrap(), vec![3, 1, 2]);
    }
}
