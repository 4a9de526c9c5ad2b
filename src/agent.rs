//! Snapshot agent: camera selection, registration and the capture loop.
//!
//! Startup runs `Discovering → Selecting → Registering` once and either
//! aborts or hands back a [`RunningAgent`] in the `Looping` state. The loop
//! is strictly serialized: a cycle is awaited to completion before the next
//! tick is taken, so two cycles are never in flight at once. A cycle that
//! outlasts the interval pushes the schedule back instead of overlapping.

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};
use tokio::time::MissedTickBehavior;

use crate::camera::{CameraConfig, Resolution, DEFAULT_CAMERA_NAME};
use crate::capture::FrameSource;
use crate::connect::ConnectApi;
use crate::devices::{Device, DeviceSource};

/// Default seconds between cycles.
pub const DEFAULT_INTERVAL_SECS: u64 = 30;

/// Shortest allowed interval in seconds.
pub const MIN_INTERVAL_SECS: u64 = 1;

/// Clamp a requested interval to at least [`MIN_INTERVAL_SECS`].
pub fn floor_interval(secs: i64) -> u64 {
    secs.max(MIN_INTERVAL_SECS as i64) as u64
}

/// Parse an interval argument in whole seconds. Zero and negative values floor to 1.
pub fn parse_interval(s: &str) -> Result<u64, String> {
    let secs: i64 = s
        .trim()
        .parse()
        .map_err(|_| format!("'{}' is not a whole number of seconds", s))?;
    Ok(floor_interval(secs))
}

/// Parse a zero-based camera index argument.
pub fn parse_camera_index(s: &str) -> Result<usize, String> {
    s.trim()
        .parse()
        .map_err(|_| format!("Invalid camera index: {}", s))
}

/// Startup lifecycle, reported through debug logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AgentState {
    Discovering,
    Selecting,
    Registering,
    Looping,
    Aborted,
}

/// Unrecoverable startup failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AgentError {
    #[error("No video devices found")]
    NoDevices,

    #[error("Invalid camera index: {index} ({available} camera(s) available, indices 0-{})", last_index(.available))]
    InvalidCameraIndex { index: usize, available: usize },
}

fn last_index(available: &usize) -> usize {
    available.saturating_sub(1)
}

/// Pick the camera to use.
///
/// An explicit index must be in range; otherwise the first device wins.
pub fn select_device(devices: &[Device], index: Option<usize>) -> Result<Device, AgentError> {
    if devices.is_empty() {
        return Err(AgentError::NoDevices);
    }
    let index = index.unwrap_or(0);
    devices
        .get(index)
        .cloned()
        .ok_or(AgentError::InvalidCameraIndex {
            index,
            available: devices.len(),
        })
}

/// Outcome of one capture+upload cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleResult {
    /// 1-based cycle number.
    pub cycle: u64,
    pub ok: bool,
    /// When the cycle started.
    pub timestamp: DateTime<Utc>,
}

impl CycleResult {
    pub fn marker(&self) -> &'static str {
        if self.ok {
            "[OK]"
        } else {
            "[FAIL]"
        }
    }
}

impl fmt::Display for CycleResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {}",
            self.marker(),
            self.timestamp.to_rfc3339_opts(SecondsFormat::Millis, true)
        )
    }
}

/// Agent before startup has run.
pub struct Agent<D, F, C> {
    devices: D,
    frames: F,
    connect: C,
    camera_name: String,
    resolution: Resolution,
    state: AgentState,
}

impl<D, F, C> Agent<D, F, C>
where
    D: DeviceSource,
    F: FrameSource,
    C: ConnectApi,
{
    pub fn new(devices: D, frames: F, connect: C) -> Self {
        Self {
            devices,
            frames,
            connect,
            camera_name: DEFAULT_CAMERA_NAME.to_string(),
            resolution: Resolution::default(),
            state: AgentState::Discovering,
        }
    }

    /// Display name sent at registration.
    pub fn with_camera_name(mut self, name: impl Into<String>) -> Self {
        self.camera_name = name.into();
        self
    }

    /// Resolution advertised at registration.
    pub fn with_resolution(mut self, resolution: Resolution) -> Self {
        self.resolution = resolution;
        self
    }

    fn enter(&mut self, state: AgentState) {
        log::debug!("Agent state: {:?} -> {:?}", self.state, state);
        self.state = state;
    }

    /// Discover, select and register a camera.
    ///
    /// Registration failures are logged and do not stop startup.
    ///
    /// # Errors
    ///
    /// Returns `AgentError::NoDevices` if discovery finds nothing, or
    /// `AgentError::InvalidCameraIndex` if `index` is out of range. No
    /// remote call is made in either case.
    pub async fn start(mut self, index: Option<usize>) -> Result<RunningAgent<F, C>, AgentError> {
        self.enter(AgentState::Discovering);
        let devices = self.devices.list_devices().await;
        if devices.is_empty() {
            self.enter(AgentState::Aborted);
            return Err(AgentError::NoDevices);
        }

        log::info!("Found {} camera(s):", devices.len());
        for (i, device) in devices.iter().enumerate() {
            log::info!("  [{}] {}", i, device);
        }

        self.enter(AgentState::Selecting);
        let device = match select_device(&devices, index) {
            Ok(device) => device,
            Err(e) => {
                self.enter(AgentState::Aborted);
                return Err(e);
            }
        };
        log::info!("Using camera: {}", device);

        self.enter(AgentState::Registering);
        let camera = CameraConfig::for_device(&device)
            .with_name(self.camera_name.clone())
            .with_resolution(self.resolution);
        match self.connect.update_camera_info(&camera).await {
            Ok(()) => log::info!("Camera initialized"),
            Err(e) => log::warn!("Failed to update camera info: {}", e),
        }

        self.enter(AgentState::Looping);
        Ok(RunningAgent {
            device,
            camera,
            frames: self.frames,
            connect: self.connect,
        })
    }
}

/// Agent in the `Looping` state, bound to one device for its lifetime.
pub struct RunningAgent<F, C> {
    device: Device,
    camera: CameraConfig,
    frames: F,
    connect: C,
}

impl<F, C> RunningAgent<F, C>
where
    F: FrameSource,
    C: ConnectApi,
{
    pub fn device(&self) -> &Device {
        &self.device
    }

    /// Metadata that was sent at registration.
    pub fn camera(&self) -> &CameraConfig {
        &self.camera
    }

    /// Capture one frame and upload it.
    ///
    /// A capture failure skips the upload. Errors are logged here and only
    /// the outcome is returned.
    pub async fn run_cycle(&self, cycle: u64) -> CycleResult {
        let timestamp = Utc::now();

        let ok = match self.frames.capture(&self.device).await {
            Ok(frame) => match self.connect.upload_snapshot(frame).await {
                Ok(()) => true,
                Err(e) => {
                    log::error!("Upload failed: {}", e);
                    false
                }
            },
            Err(e) => {
                log::error!("{}", e);
                false
            }
        };

        CycleResult {
            cycle,
            ok,
            timestamp,
        }
    }

    /// Run cycles every `period`, starting immediately.
    ///
    /// Runs `limit` cycles, or forever when `limit` is `None`. Each result is
    /// passed to `on_cycle` in order. Returns the number of cycles run.
    pub async fn run<O>(&self, period: Duration, limit: Option<u64>, mut on_cycle: O) -> u64
    where
        O: FnMut(&CycleResult),
    {
        let period = period.max(Duration::from_secs(MIN_INTERVAL_SECS));
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut completed = 0u64;
        while limit.map_or(true, |limit| completed < limit) {
            ticker.tick().await;
            let result = self.run_cycle(completed + 1).await;
            on_cycle(&result);
            completed += 1;
        }
        completed
    }
}
