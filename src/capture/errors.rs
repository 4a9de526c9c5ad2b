//! Error type for frame capture.

use thiserror::Error;

/// A capture attempt that produced no usable frame.
///
/// Busy or missing devices, launch failures, non-zero exits and empty output
/// are all reported through this one type; `reason` carries the detail for
/// diagnostics only.
#[derive(Debug, Clone, Error)]
#[error("Failed to capture from {device}: {reason}")]
pub struct CaptureError {
    pub device: String,
    pub reason: String,
}

impl CaptureError {
    pub fn new(device: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            device: device.into(),
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capture_error_display() {
        let err = CaptureError::new("/dev/video0", "Device or resource busy");
        let msg = err.to_string();
        assert!(msg.contains("/dev/video0"));
        assert!(msg.contains("Device or resource busy"));
    }
}
