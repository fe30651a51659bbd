//! Codec trait for rate-controlled frame sources

use crate::Result;

/// Rate-controlled frame source
///
/// Abstracts over encoders that a congestion controller can steer. The
/// trait is deliberately small: run the source, stop it, and read or request
/// the target bitrate.
#[async_trait::async_trait]
pub trait Codec: Send + Sync {
    /// Run the codec until it is closed
    ///
    /// Returns:
    /// - `Ok(())` - Closed normally
    /// - `Err(e)` - The codec could not run or its sink failed
    async fn start(&self) -> Result<()>;

    /// Signal shutdown
    fn close(&self) -> Result<()>;

    /// Current target bitrate in bits per second
    fn target_bitrate(&self) -> u64;

    /// Request a new target bitrate in bits per second
    ///
    /// The request may be dropped by the codec; poll
    /// [`target_bitrate`](Codec::target_bitrate) to observe the outcome.
    fn set_target_bitrate(&self, bps: u64);
}
