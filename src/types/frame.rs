//! Synthetic frame type

use std::sync::Arc;
use std::time::Duration;

/// One fabricated video frame
///
/// The content is zero filler; only its length carries meaning. Frames are
/// created fresh on every generation step and handed to the sink by value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Opaque filler of the computed frame size (zero-copy via Arc)
    pub content: Arc<[u8]>,

    /// Wall-clock interval this frame occupies
    pub duration: Duration,
}

impl Frame {
    /// Create a frame of `size` zero bytes
    pub fn new(size: usize, duration: Duration) -> Self {
        Self { content: std::iter::repeat_n(0u8, size).collect(), duration }
    }

    /// Frame size in bytes
    pub fn len(&self) -> usize {
        self.content.len()
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }

    /// Frame size in bits
    pub fn size_bits(&self) -> u64 {
        self.content.len() as u64 * 8
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_reports_size() {
        let frame = Frame::new(4_166, Duration::from_millis(33));
        assert_eq!(frame.len(), 4_166);
        assert_eq!(frame.size_bits(), 33_328);
        assert!(!frame.is_empty());
        assert!(frame.content.iter().all(|&b| b == 0));
    }

    #[test]
    fn empty_and_large_frames() {
        let empty = Frame::new(0, Duration::ZERO);
        assert!(empty.is_empty());
        assert_eq!(empty.size_bits(), 0);

        let large = Frame::new(150_000, Duration::from_millis(33));
        assert_eq!(large.len(), 150_000);
        assert!(large.content.iter().all(|&b| b == 0));

        // Clones share the allocation
        let copy = large.clone();
        assert!(Arc::ptr_eq(&copy.content, &large.content));
    }
}
