//! Camera metadata advertised to Prusa Connect.
//!
//! The registration payload describes the selected device. Driver, trigger
//! scheme and resolution are informational: the agent does not enforce them
//! on capture.

use serde::{Deserialize, Serialize};

use crate::devices::Device;

/// Display name used when the config file does not set one.
pub const DEFAULT_CAMERA_NAME: &str = "Prusa Pi Camera";

/// Camera resolution advertised at registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Resolution {
    /// Full HD (1920x1080), the advertised default.
    pub const FULL_HD: Resolution = Resolution {
        width: 1920,
        height: 1080,
    };
}

impl Default for Resolution {
    fn default() -> Self {
        Self::FULL_HD
    }
}

/// Capture driver reported to the remote service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Driver {
    #[default]
    #[serde(rename = "V4L2")]
    V4l2,
}

/// Snapshot cadence reported to the remote service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TriggerScheme {
    #[default]
    ThirtySec,
}

/// Descriptive record for the selected camera.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CameraConfig {
    pub name: String,
    pub path: String,
    pub driver: Driver,
    pub trigger_scheme: TriggerScheme,
    pub resolution: Resolution,
}

impl CameraConfig {
    /// Build the default record for a device.
    pub fn for_device(device: &Device) -> Self {
        Self {
            name: DEFAULT_CAMERA_NAME.to_string(),
            path: device.path().to_string(),
            driver: Driver::default(),
            trigger_scheme: TriggerScheme::default(),
            resolution: Resolution::default(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_resolution(mut self, resolution: Resolution) -> Self {
        self.resolution = resolution;
        self
    }
}

/// Request body for `PUT /c/info`.
#[derive(Debug, Serialize)]
pub(crate) struct CameraInfoRequest<'a> {
    pub config: &'a CameraConfig,
}
