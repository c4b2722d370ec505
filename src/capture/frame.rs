//! Frame type representing a captured image with metadata.

use chrono::{DateTime, Utc};
use std::time::Instant;

/// Bytes per pixel of the packed RGB8 layout every backend produces.
pub const BYTES_PER_PIXEL: usize = 3;

/// Dimensions of the frames a device session produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameFormat {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl FrameFormat {
    /// Creates a format of the given size.
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

/// A single captured frame from the camera.
///
/// Frames are immutable once produced and are shared downstream as
/// `Arc<Frame>`, so every subscriber sees the same pixel buffer.
pub struct Frame {
    /// Packed RGB8 pixel data, row-major.
    pixels: Vec<u8>,
    /// Frame width in pixels.
    width: u32,
    /// Frame height in pixels.
    height: u32,
    /// Monotonic capture instant, used for rate limiting.
    timestamp: Instant,
    /// Wall-clock capture time, used for logging.
    captured_at: DateTime<Utc>,
    /// Monotonic sequence number within the producing device.
    sequence: u64,
}

impl Frame {
    /// Creates a new frame stamped with the current time.
    pub fn new(pixels: Vec<u8>, width: u32, height: u32, sequence: u64) -> Self {
        Self::with_timestamp(pixels, width, height, sequence, Instant::now())
    }

    /// Creates a new frame with an explicit capture instant.
    pub fn with_timestamp(
        pixels: Vec<u8>,
        width: u32,
        height: u32,
        sequence: u64,
        timestamp: Instant,
    ) -> Self {
        Self {
            pixels,
            width,
            height,
            timestamp,
            captured_at: Utc::now(),
            sequence,
        }
    }

    /// Returns a reference to the raw pixel data.
    #[inline]
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// Returns the frame width.
    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Returns the frame height.
    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Dimensions of this frame.
    #[inline]
    pub fn format(&self) -> FrameFormat {
        FrameFormat::new(self.width, self.height)
    }

    /// Returns the monotonic capture instant.
    #[inline]
    pub fn timestamp(&self) -> Instant {
        self.timestamp
    }

    /// Returns the wall-clock capture time.
    #[inline]
    pub fn captured_at(&self) -> DateTime<Utc> {
        self.captured_at
    }

    /// Returns the sequence number.
    #[inline]
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    /// Returns the total number of pixels (width * height).
    #[inline]
    pub fn pixel_count(&self) -> usize {
        (self.width as usize) * (self.height as usize)
    }

    /// Validates that the pixel buffer size matches dimensions.
    pub fn is_valid(&self) -> bool {
        self.width > 0 && self.height > 0 && self.pixels.len() == self.pixel_count() * BYTES_PER_PIXEL
    }
}

impl std::fmt::Debug for Frame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Frame")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("sequence", &self.sequence)
            .field("captured_at", &self.captured_at)
            .field("pixel_bytes", &self.pixels.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_creation() {
        let pixels = vec![0u8; 640 * 480 * BYTES_PER_PIXEL];
        let frame = Frame::new(pixels, 640, 480, 1);

        assert_eq!(frame.width(), 640);
        assert_eq!(frame.height(), 480);
        assert_eq!(frame.sequence(), 1);
        assert_eq!(frame.format(), FrameFormat::new(640, 480));
        assert!(frame.is_valid());
    }

    #[test]
    fn test_frame_invalid_size() {
        let pixels = vec![0u8; 640 * 480]; // Missing colour channels
        let frame = Frame::new(pixels, 640, 480, 1);

        assert!(!frame.is_valid());
    }

    #[test]
    fn test_explicit_timestamp_is_kept() {
        let at = Instant::now();
        let frame = Frame::with_timestamp(vec![0u8; 3], 1, 1, 7, at);
        assert_eq!(frame.timestamp(), at);
        assert_eq!(frame.sequence(), 7);
    }
}
