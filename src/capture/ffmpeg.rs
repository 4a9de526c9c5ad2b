//! FFmpeg-backed single-shot capture.

use std::io::ErrorKind;
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;

use super::{CaptureError, Frame, FrameSource};
use crate::devices::Device;

/// Default FFmpeg executable, resolved through `PATH`.
pub const DEFAULT_FFMPEG: &str = "ffmpeg";

/// Pixel/container format requested from the V4L2 device.
pub const DEFAULT_INPUT_FORMAT: &str = "mjpeg";

/// JPEG quality scale passed to `-q:v` (2 = best, 31 = worst).
pub const DEFAULT_QUALITY: u8 = 5;

/// Captures one JPEG frame by running FFmpeg against a V4L2 device.
#[derive(Debug, Clone)]
pub struct FfmpegCapture {
    program: String,
    input_format: String,
    quality: u8,
}

impl Default for FfmpegCapture {
    fn default() -> Self {
        Self {
            program: DEFAULT_FFMPEG.to_string(),
            input_format: DEFAULT_INPUT_FORMAT.to_string(),
            quality: DEFAULT_QUALITY,
        }
    }
}

impl FfmpegCapture {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a different FFmpeg executable.
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    pub fn with_input_format(mut self, input_format: impl Into<String>) -> Self {
        self.input_format = input_format.into();
        self
    }

    pub fn with_quality(mut self, quality: u8) -> Self {
        self.quality = quality;
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    /// Build the FFmpeg arguments for a one-frame capture written to stdout.
    pub fn args(&self, device: &Device) -> Vec<String> {
        vec![
            "-hide_banner".to_string(),
            "-loglevel".to_string(),
            "error".to_string(),
            "-f".to_string(),
            "v4l2".to_string(),
            "-input_format".to_string(),
            self.input_format.clone(),
            "-i".to_string(),
            device.path().to_string(),
            "-vframes".to_string(),
            "1".to_string(),
            "-q:v".to_string(),
            self.quality.to_string(),
            "-f".to_string(),
            "image2".to_string(),
            "-c:v".to_string(),
            "mjpeg".to_string(),
            "pipe:1".to_string(),
        ]
    }
}

#[async_trait]
impl FrameSource for FfmpegCapture {
    async fn capture(&self, device: &Device) -> Result<Frame, CaptureError> {
        let output = Command::new(&self.program)
            .args(self.args(device))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| {
                if e.kind() == ErrorKind::NotFound {
                    CaptureError::new(
                        device.path(),
                        format!(
                            "{} not found. Install FFmpeg with your package manager (e.g. apt install ffmpeg)",
                            self.program
                        ),
                    )
                } else {
                    CaptureError::new(device.path(), format!("failed to run {}: {}", self.program, e))
                }
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let detail = last_line(&stderr).unwrap_or("no diagnostic output");
            return Err(CaptureError::new(
                device.path(),
                format!("{} exited with {}: {}", self.program, output.status, detail),
            ));
        }

        Frame::new(output.stdout).ok_or_else(|| {
            CaptureError::new(device.path(), format!("{} produced no image data", self.program))
        })
    }
}

/// Last non-blank line of FFmpeg's stderr; that is where it reports the cause.
fn last_line(text: &str) -> Option<&str> {
    text.lines().rev().map(str::trim).find(|l| !l.is_empty())
}
