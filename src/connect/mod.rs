//! Prusa Connect camera API integration.
//!
//! This module uploads snapshots and registers camera metadata with the
//! Prusa Connect service. Both calls are single attempts: failures are
//! returned to the caller, which logs them and moves on.

mod client;

use async_trait::async_trait;

use crate::camera::CameraConfig;
use crate::capture::Frame;

pub use client::{
    ConnectClient, ConnectError, Credentials, CONNECT_API_BASE_URL, CONNECT_TOKEN_ENV,
    DEFAULT_FINGERPRINT,
};

/// The two remote operations the agent depends on.
#[async_trait]
pub trait ConnectApi: Send + Sync {
    /// Upload one snapshot. The frame is consumed whether or not the upload succeeds.
    async fn upload_snapshot(&self, frame: Frame) -> Result<(), ConnectError>;

    /// Register or update the camera's metadata. Safe to repeat.
    async fn update_camera_info(&self, config: &CameraConfig) -> Result<(), ConnectError>;
}
