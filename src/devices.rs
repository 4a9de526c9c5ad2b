//! V4L2 device discovery.
//!
//! This module provides functions for listing and parsing video capture devices
//! exposed by the kernel as `/dev/video<N>` nodes.

use std::fmt;
use std::path::{Path, PathBuf};

use async_trait::async_trait;

/// Default directory scanned for video device nodes.
pub const DEFAULT_DEVICE_DIR: &str = "/dev";

/// File name prefix of V4L2 capture nodes.
const VIDEO_PREFIX: &str = "video";

/// A capture-capable device, identified by its filesystem path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Device {
    path: String,
}

impl Device {
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }

    /// The device path, e.g. `/dev/video0`.
    pub fn path(&self) -> &str {
        &self.path
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path)
    }
}

/// Something that can enumerate capture devices.
///
/// Enumeration never fails: a source that cannot be read reports no devices.
#[async_trait]
pub trait DeviceSource: Send + Sync {
    async fn list_devices(&self) -> Vec<Device>;
}

/// Lists `video<N>` nodes in a device directory.
#[derive(Debug, Clone)]
pub struct V4l2Devices {
    dir: PathBuf,
}

impl Default for V4l2Devices {
    fn default() -> Self {
        Self::new(DEFAULT_DEVICE_DIR)
    }
}

impl V4l2Devices {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

#[async_trait]
impl DeviceSource for V4l2Devices {
    async fn list_devices(&self) -> Vec<Device> {
        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) => {
                log::debug!("Cannot read device directory {}: {}", self.dir.display(), e);
                return Vec::new();
            }
        };

        let mut found: Vec<(u32, PathBuf)> = Vec::new();
        loop {
            match entries.next_entry().await {
                Ok(Some(entry)) => {
                    let name = entry.file_name();
                    if let Some(number) = name.to_str().and_then(parse_video_number) {
                        found.push((number, entry.path()));
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    log::debug!("Device enumeration stopped early: {}", e);
                    break;
                }
            }
        }

        sort_devices(found)
    }
}

/// Parse the device number out of a node name like `video2`.
///
/// Returns `None` for anything that is not `video` followed by digits.
pub fn parse_video_number(name: &str) -> Option<u32> {
    let digits = name.strip_prefix(VIDEO_PREFIX)?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

/// Order devices by ascending device number so `video10` follows `video9`.
fn sort_devices(mut found: Vec<(u32, PathBuf)>) -> Vec<Device> {
    found.sort_by_key(|(number, _)| *number);
    found
        .into_iter()
        .map(|(_, path)| Device::new(path.to_string_lossy().into_owned()))
        .collect()
}

/// Print the device list to stdout.
pub fn print_devices(devices: &[Device]) {
    println!("Video Devices:");
    if devices.is_empty() {
        println!("  (none found)");
    } else {
        for (index, device) in devices.iter().enumerate() {
            println!("  [{}] {}", index, device);
        }
    }
}
