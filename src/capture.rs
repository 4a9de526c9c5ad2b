//! Still-frame capture from a video device.
//!
//! A [`FrameSource`] turns a [`Device`] into a single encoded still image.
//! [`FfmpegCapture`] is the production implementation; it shells out to
//! FFmpeg's V4L2 input and asks for exactly one frame.

mod errors;
mod ffmpeg;

use async_trait::async_trait;

use crate::devices::Device;

pub use errors::CaptureError;
pub use ffmpeg::{FfmpegCapture, DEFAULT_FFMPEG, DEFAULT_INPUT_FORMAT, DEFAULT_QUALITY};

/// One captured still image, as encoded bytes (JPEG in practice).
///
/// A frame is never empty. It is not `Clone` and the uploader consumes it,
/// so a frame cannot be sent twice.
///
/// ```compile_fail
/// use connect_cam::capture::Frame;
///
/// let frame = Frame::new(vec![0xFF, 0xD8]).unwrap();
/// let copy = frame.clone();
/// ```
#[derive(Debug, PartialEq, Eq)]
pub struct Frame {
    bytes: Vec<u8>,
}

impl Frame {
    /// Wrap encoded image bytes. Returns `None` for an empty buffer.
    pub fn new(bytes: Vec<u8>) -> Option<Self> {
        if bytes.is_empty() {
            None
        } else {
            Some(Self { bytes })
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}

/// Something that can grab one still frame from a device.
#[async_trait]
pub trait FrameSource: Send + Sync {
    /// Capture a single frame. No retry is attempted.
    async fn capture(&self, device: &Device) -> Result<Frame, CaptureError>;
}
