//! flashcam - camera app core with flash, torch and front screen flash
//!
//! The crate models the part of a camera app that has real state: which
//! flash mode is active on which sensor, when the screen has to stand in for
//! a flash, and which OS permissions each action needs. Everything that
//! touches the platform goes through the traits in [`device`].
//!
//! # Features
//!
//! - **Flash state machine**: off/auto/on/torch per sensor with forced
//!   transitions on flip, recording and front-facing capture
//! - **Screen flash**: white overlay plus full brightness derived from state
//! - **Permission gate**: ask once, remember denials, one prompt in flight
//! - **Transient displays**: debounced QR link banner and ratio overlay
//!
//! # Example
//!
//! ```no_run
//! use flashcam::device::simulated::SimulatedRig;
//! use flashcam::{AppConfig, AppEvent, CameraApp};
//!
//! #[tokio::main]
//! async fn main() -> flashcam::Result<()> {
//!     let rig = SimulatedRig::new();
//!     let mut app = CameraApp::new(rig.devices(), &AppConfig::default());
//!     app.start().await?;
//!
//!     app.dispatch(AppEvent::ToggleFlash).await?;
//!     app.dispatch(AppEvent::TakePhoto).await?;
//!     println!("saved {:?}", app.last_media());
//!     Ok(())
//! }
//! ```

#![warn(missing_docs, rust_2024_compatibility)]

pub mod app;
pub mod config;
pub mod device;
pub mod display;
pub mod error;
pub mod flash;
pub mod logging;
pub mod permission;
pub mod qr;
pub mod ratio;

// Re-exports for convenience
pub use error::{Error, Result};

pub use app::{AppEvent, AppSnapshot, CameraApp, Readiness};
pub use config::{AppConfig, CameraOptions, DisplayOptions, LogRotation, LoggingOptions};
pub use device::Devices;
pub use display::Debounced;
pub use flash::{CameraFacing, CapturePlan, FlashController, FlashSetting, ScreenFlash};
pub use permission::{PermissionGate, PermissionKind, PermissionState};
pub use qr::{QrDecoder, QrPayload};
pub use ratio::{RatioSelector, SwipeDirection};
