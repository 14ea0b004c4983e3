//! Platform collaborators driven by the camera core
//!
//! Everything that touches the operating system (camera hardware, the
//! media library, screen brightness, permission prompts) sits behind one of
//! the traits below. The controller owns a [`Devices`] bundle and never
//! reaches for ambient globals.

pub mod simulated;

use crate::error::Result;
use crate::flash::CameraFacing;
use crate::permission::PermissionKind;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Flash mode understood by the camera hardware
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HardwareFlashMode {
    /// LED stays dark
    #[default]
    Off,
    /// Driver decides per shot
    Auto,
    /// LED fires with the shutter
    On,
    /// LED lit continuously
    Torch,
}

/// Orientation applied to a rendered preview snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mirror {
    /// Keep the frame as rendered
    None,
    /// Flip left-to-right
    Horizontal,
}

impl Mirror {
    /// The front preview is shown mirrored, so snapshots taken from it are
    /// flipped back to true orientation.
    pub fn for_facing(facing: CameraFacing) -> Self {
        match facing {
            CameraFacing::Front => Mirror::Horizontal,
            CameraFacing::Back => Mirror::None,
        }
    }
}

/// OS-reported status of a permission
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PermissionStatus {
    /// Already allowed
    Granted,
    /// Refused by the user
    Denied,
    /// Never asked
    Undetermined,
}

/// Native camera handle
#[async_trait]
pub trait CameraDevice: Send + Sync {
    /// Fire the hardware shutter and return the uri of the captured image.
    async fn take_picture(&self) -> Result<String>;

    /// Begin recording video.
    async fn start_recording(&self) -> Result<()>;

    /// Finish the current recording and return the uri of the clip.
    async fn stop_recording(&self) -> Result<String>;

    /// Drive the hardware flash LED.
    async fn set_flash_mode(&self, mode: HardwareFlashMode) -> Result<()>;

    /// Switch the active sensor.
    async fn set_facing(&self, facing: CameraFacing) -> Result<()>;

    /// Ordered aspect ratios supported by the active sensor (e.g. `"4:3"`).
    async fn supported_ratios(&self) -> Result<Vec<String>>;

    /// Apply an aspect ratio previously reported by [`supported_ratios`](Self::supported_ratios).
    async fn set_ratio(&self, ratio: &str) -> Result<()>;
}

/// Persistent photo/video storage
#[async_trait]
pub trait MediaLibrary: Send + Sync {
    /// Copy a temporary capture into the library, returning the persisted uri.
    async fn save(&self, uri: &str) -> Result<String>;

    /// Render a still for a persisted video, returning the image uri.
    async fn video_thumbnail(&self, uri: &str) -> Result<String>;
}

/// Grabs the rendered preview, overlays included
#[async_trait]
pub trait PreviewCapture: Send + Sync {
    /// Capture the on-screen preview as an image and return its uri.
    async fn capture_rendered_frame(&self, mirror: Mirror) -> Result<String>;
}

/// Display brightness driver
#[async_trait]
pub trait BrightnessControl: Send + Sync {
    /// Set the screen brightness in `0.0..=1.0`.
    async fn set_level(&self, level: f32) -> Result<()>;

    /// Hand brightness back to the OS.
    async fn reset_to_system_managed(&self) -> Result<()>;
}

/// Hands links to the system browser
#[async_trait]
pub trait LinkOpener: Send + Sync {
    /// Open `url` outside the app.
    async fn open(&self, url: &str) -> Result<()>;
}

/// OS permission prompts
#[async_trait]
pub trait PermissionProvider: Send + Sync {
    /// Current status without prompting.
    async fn query_status(&self, kind: PermissionKind) -> Result<PermissionStatus>;

    /// Show the OS prompt and return the user's answer.
    async fn request(&self, kind: PermissionKind) -> Result<PermissionStatus>;
}

/// User-visible notices raised by the permission flow
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Explain why a permission is needed. Resolves once the user acknowledges.
    async fn present_rationale(&self, kind: PermissionKind);

    /// Tell the user a capability is denied and must be enabled in settings.
    fn permission_denied(&self, kind: PermissionKind);
}

/// Collaborator handles owned by the controller
#[derive(Clone)]
pub struct Devices {
    /// Camera hardware
    pub camera: Arc<dyn CameraDevice>,
    /// Media library
    pub media: Arc<dyn MediaLibrary>,
    /// Preview snapshot path
    pub preview: Arc<dyn PreviewCapture>,
    /// Screen brightness
    pub brightness: Arc<dyn BrightnessControl>,
    /// Permission prompts
    pub permissions: Arc<dyn PermissionProvider>,
    /// Notices
    pub notifier: Arc<dyn Notifier>,
    /// Browser
    pub links: Arc<dyn LinkOpener>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_front_snapshots_are_mirrored() {
        assert_eq!(Mirror::for_facing(CameraFacing::Front), Mirror::Horizontal);
        assert_eq!(Mirror::for_facing(CameraFacing::Back), Mirror::None);
    }
}
