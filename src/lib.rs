//! connect-cam library crate.
//!
//! Periodically captures a still image from a local V4L2 camera and uploads
//! it to Prusa Connect. The modules are exposed for integration testing.

pub mod agent;
pub mod camera;
pub mod capture;
pub mod config;
pub mod connect;
pub mod devices;
