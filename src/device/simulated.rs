//! In-memory collaborators for replay and tests
//!
//! Every simulated device appends to a shared [`CallLog`] so callers can
//! assert on the exact order of side effects (e.g. brightness boost before
//! the shutter, reset after it).

use super::{
    BrightnessControl, CameraDevice, Devices, HardwareFlashMode, LinkOpener, MediaLibrary, Mirror,
    Notifier, PermissionProvider, PermissionStatus, PreviewCapture,
};
use crate::error::{Error, Result};
use crate::flash::CameraFacing;
use crate::permission::PermissionKind;
use async_trait::async_trait;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

/// One side effect observed by a simulated device
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "call", rename_all = "snake_case")]
pub enum DeviceCall {
    /// `CameraDevice::take_picture`
    TakePicture,
    /// `CameraDevice::start_recording`
    StartRecording,
    /// `CameraDevice::stop_recording`
    StopRecording,
    /// `CameraDevice::set_flash_mode`
    SetFlashMode {
        /// Requested mode
        mode: HardwareFlashMode,
    },
    /// `CameraDevice::set_facing`
    SetFacing {
        /// Requested sensor
        facing: CameraFacing,
    },
    /// `CameraDevice::set_ratio`
    SetRatio {
        /// Requested ratio
        ratio: String,
    },
    /// `PreviewCapture::capture_rendered_frame`
    PreviewFrame {
        /// Requested orientation
        mirror: Mirror,
    },
    /// `MediaLibrary::save`
    Save {
        /// Source uri
        uri: String,
    },
    /// `MediaLibrary::video_thumbnail`
    Thumbnail {
        /// Video uri
        uri: String,
    },
    /// `LinkOpener::open`
    OpenLink {
        /// Opened url
        url: String,
    },
    /// `BrightnessControl::set_level`
    SetBrightness {
        /// Requested level
        level: f32,
    },
    /// `BrightnessControl::reset_to_system_managed`
    ResetBrightness,
    /// `PermissionProvider::query_status`
    QueryPermission {
        /// Queried kind
        kind: PermissionKind,
    },
    /// `PermissionProvider::request`
    RequestPermission {
        /// Requested kind
        kind: PermissionKind,
    },
    /// `Notifier::present_rationale`
    Rationale {
        /// Explained kind
        kind: PermissionKind,
    },
    /// `Notifier::permission_denied`
    DeniedNotice {
        /// Denied kind
        kind: PermissionKind,
    },
}

/// Shared, ordered journal of device calls
#[derive(Debug, Clone, Default)]
pub struct CallLog {
    calls: Arc<Mutex<Vec<DeviceCall>>>,
}

impl CallLog {
    fn push(&self, call: DeviceCall) {
        tracing::trace!(?call, "simulated device call");
        self.calls.lock().expect("call log mutex poisoned").push(call);
    }

    /// Copy of every call recorded so far.
    pub fn calls(&self) -> Vec<DeviceCall> {
        self.calls.lock().expect("call log mutex poisoned").clone()
    }

    /// Number of recorded calls equal to `call`.
    pub fn count(&self, call: &DeviceCall) -> usize {
        self.calls
            .lock()
            .expect("call log mutex poisoned")
            .iter()
            .filter(|c| *c == call)
            .count()
    }

    /// Whether any brightness call was recorded.
    pub fn touched_brightness(&self) -> bool {
        self.calls
            .lock()
            .expect("call log mutex poisoned")
            .iter()
            .any(|c| matches!(c, DeviceCall::SetBrightness { .. } | DeviceCall::ResetBrightness))
    }

    /// Forget everything recorded so far.
    pub fn clear(&self) {
        self.calls.lock().expect("call log mutex poisoned").clear();
    }
}

/// Simulated camera sensor
pub struct SimCamera {
    log: CallLog,
    ratios: Mutex<Vec<String>>,
    shots: AtomicU32,
    clips: AtomicU32,
    fail_capture: AtomicBool,
    fail_configure: AtomicBool,
}

impl SimCamera {
    fn new(log: CallLog) -> Self {
        Self {
            log,
            ratios: Mutex::new(vec!["4:3".to_string(), "16:9".to_string(), "1:1".to_string()]),
            shots: AtomicU32::new(0),
            clips: AtomicU32::new(0),
            fail_capture: AtomicBool::new(false),
            fail_configure: AtomicBool::new(false),
        }
    }

    /// Replace the ratios reported by `supported_ratios`.
    pub fn set_ratios(&self, ratios: &[&str]) {
        *self.ratios.lock().expect("camera mutex poisoned") =
            ratios.iter().map(|r| r.to_string()).collect();
    }

    /// Make pictures and recordings fail until reset.
    pub fn fail_captures(&self, fail: bool) {
        self.fail_capture.store(fail, Ordering::SeqCst);
    }

    /// Make sensor switches and flash mode changes fail until reset.
    pub fn fail_configuration(&self, fail: bool) {
        self.fail_configure.store(fail, Ordering::SeqCst);
    }

    fn check_configure(&self, what: &str) -> Result<()> {
        if self.fail_configure.load(Ordering::SeqCst) {
            return Err(Error::Unavailable(format!("simulated {what} failure")));
        }
        Ok(())
    }

    fn check_failure(&self, what: &str) -> Result<()> {
        if self.fail_capture.load(Ordering::SeqCst) {
            return Err(Error::CaptureFailed(format!("simulated {what} failure")));
        }
        Ok(())
    }
}

#[async_trait]
impl CameraDevice for SimCamera {
    async fn take_picture(&self) -> Result<String> {
        self.log.push(DeviceCall::TakePicture);
        tokio::task::yield_now().await;
        self.check_failure("shutter")?;
        let n = self.shots.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(format!("sim://camera/photo-{n}.jpg"))
    }

    async fn start_recording(&self) -> Result<()> {
        self.log.push(DeviceCall::StartRecording);
        self.check_failure("recording")
    }

    async fn stop_recording(&self) -> Result<String> {
        self.log.push(DeviceCall::StopRecording);
        self.check_failure("recording")?;
        let n = self.clips.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(format!("sim://camera/clip-{n}.mp4"))
    }

    async fn set_flash_mode(&self, mode: HardwareFlashMode) -> Result<()> {
        self.log.push(DeviceCall::SetFlashMode { mode });
        self.check_configure("flash mode")
    }

    async fn set_facing(&self, facing: CameraFacing) -> Result<()> {
        self.log.push(DeviceCall::SetFacing { facing });
        self.check_configure("sensor switch")
    }

    async fn supported_ratios(&self) -> Result<Vec<String>> {
        Ok(self.ratios.lock().expect("camera mutex poisoned").clone())
    }

    async fn set_ratio(&self, ratio: &str) -> Result<()> {
        self.log.push(DeviceCall::SetRatio {
            ratio: ratio.to_string(),
        });
        Ok(())
    }
}

/// Simulated media library
pub struct SimMediaLibrary {
    log: CallLog,
    saved: Mutex<Vec<String>>,
}

impl SimMediaLibrary {
    /// Persisted uris in save order.
    pub fn saved(&self) -> Vec<String> {
        self.saved.lock().expect("media mutex poisoned").clone()
    }
}

#[async_trait]
impl MediaLibrary for SimMediaLibrary {
    async fn save(&self, uri: &str) -> Result<String> {
        self.log.push(DeviceCall::Save {
            uri: uri.to_string(),
        });
        let mut saved = self.saved.lock().expect("media mutex poisoned");
        let name = uri.rsplit('/').next().unwrap_or(uri);
        let persisted = format!("sim://library/{}/{name}", saved.len() + 1);
        saved.push(persisted.clone());
        Ok(persisted)
    }

    async fn video_thumbnail(&self, uri: &str) -> Result<String> {
        self.log.push(DeviceCall::Thumbnail {
            uri: uri.to_string(),
        });
        let name = uri.rsplit('/').next().unwrap_or(uri);
        let stem = name.rsplit_once('.').map_or(name, |(stem, _)| stem);
        Ok(format!("sim://thumbnails/{stem}.jpg"))
    }
}

/// Simulated preview grabber
pub struct SimPreview {
    log: CallLog,
    frames: AtomicU32,
}

#[async_trait]
impl PreviewCapture for SimPreview {
    async fn capture_rendered_frame(&self, mirror: Mirror) -> Result<String> {
        self.log.push(DeviceCall::PreviewFrame { mirror });
        let n = self.frames.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(format!("sim://preview/frame-{n}.jpg"))
    }
}

/// Simulated display brightness
pub struct SimBrightness {
    log: CallLog,
    available: AtomicBool,
    level: Mutex<Option<f32>>,
}

impl SimBrightness {
    /// Pretend the platform has no brightness API.
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Level forced by the app, `None` while system-managed.
    pub fn level(&self) -> Option<f32> {
        *self.level.lock().expect("brightness mutex poisoned")
    }

    fn check_available(&self) -> Result<()> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(Error::Unavailable("brightness API".to_string()))
        }
    }
}

#[async_trait]
impl BrightnessControl for SimBrightness {
    async fn set_level(&self, level: f32) -> Result<()> {
        self.check_available()?;
        self.log.push(DeviceCall::SetBrightness { level });
        *self.level.lock().expect("brightness mutex poisoned") = Some(level.clamp(0.0, 1.0));
        Ok(())
    }

    async fn reset_to_system_managed(&self) -> Result<()> {
        self.check_available()?;
        self.log.push(DeviceCall::ResetBrightness);
        *self.level.lock().expect("brightness mutex poisoned") = None;
        Ok(())
    }
}

#[derive(Debug, Clone, Copy)]
struct PermissionScript {
    status: PermissionStatus,
    answer: PermissionStatus,
}

impl Default for PermissionScript {
    fn default() -> Self {
        Self {
            status: PermissionStatus::Undetermined,
            answer: PermissionStatus::Granted,
        }
    }
}

/// Simulated OS permission prompts
///
/// Every kind starts undetermined and is granted when requested unless
/// configured otherwise.
pub struct SimPermissions {
    log: CallLog,
    scripts: Mutex<HashMap<PermissionKind, PermissionScript>>,
    broken: AtomicBool,
    failing_requests: AtomicBool,
}

impl SimPermissions {
    /// Status returned by `query_status` before any prompt.
    pub fn set_status(&self, kind: PermissionKind, status: PermissionStatus) {
        self.scripts
            .lock()
            .expect("permission mutex poisoned")
            .entry(kind)
            .or_default()
            .status = status;
    }

    /// Answer the user gives to the prompt for `kind`.
    pub fn set_answer(&self, kind: PermissionKind, answer: PermissionStatus) {
        self.scripts
            .lock()
            .expect("permission mutex poisoned")
            .entry(kind)
            .or_default()
            .answer = answer;
    }

    /// Shortcut for a user who refuses the prompt.
    pub fn deny(&self, kind: PermissionKind) {
        self.set_answer(kind, PermissionStatus::Denied);
    }

    /// Make every call fail as if the permission service were missing.
    pub fn set_broken(&self, broken: bool) {
        self.broken.store(broken, Ordering::SeqCst);
    }

    /// Make prompts fail after they were shown; status queries keep working.
    pub fn fail_requests(&self, fail: bool) {
        self.failing_requests.store(fail, Ordering::SeqCst);
    }

    fn script(&self, kind: PermissionKind) -> PermissionScript {
        self.scripts
            .lock()
            .expect("permission mutex poisoned")
            .get(&kind)
            .copied()
            .unwrap_or_default()
    }

    fn check_broken(&self) -> Result<()> {
        if self.broken.load(Ordering::SeqCst) {
            return Err(Error::Unavailable("permission service".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl PermissionProvider for SimPermissions {
    async fn query_status(&self, kind: PermissionKind) -> Result<PermissionStatus> {
        self.log.push(DeviceCall::QueryPermission { kind });
        self.check_broken()?;
        Ok(self.script(kind).status)
    }

    async fn request(&self, kind: PermissionKind) -> Result<PermissionStatus> {
        self.log.push(DeviceCall::RequestPermission { kind });
        // The OS prompt is modal; give other tasks a chance to pile up behind it.
        tokio::task::yield_now().await;
        self.check_broken()?;
        if self.failing_requests.load(Ordering::SeqCst) {
            return Err(Error::Unavailable("permission prompt".to_string()));
        }
        let answer = self.script(kind).answer;
        if answer == PermissionStatus::Granted {
            self.set_status(kind, PermissionStatus::Granted);
        }
        Ok(answer)
    }
}

/// Simulated notice surface; rationales are acknowledged immediately.
pub struct SimNotifier {
    log: CallLog,
}

impl SimNotifier {
    /// Denial notices shown for `kind`.
    pub fn denials(&self, kind: PermissionKind) -> usize {
        self.log.count(&DeviceCall::DeniedNotice { kind })
    }

    /// Rationales shown for `kind`.
    pub fn rationales(&self, kind: PermissionKind) -> usize {
        self.log.count(&DeviceCall::Rationale { kind })
    }
}

#[async_trait]
impl Notifier for SimNotifier {
    async fn present_rationale(&self, kind: PermissionKind) {
        self.log.push(DeviceCall::Rationale { kind });
    }

    fn permission_denied(&self, kind: PermissionKind) {
        self.log.push(DeviceCall::DeniedNotice { kind });
    }
}

/// Simulated browser
pub struct SimLinks {
    log: CallLog,
}

impl SimLinks {
    /// Urls opened so far, in order.
    pub fn opened(&self) -> Vec<String> {
        self.log
            .calls()
            .into_iter()
            .filter_map(|call| match call {
                DeviceCall::OpenLink { url } => Some(url),
                _ => None,
            })
            .collect()
    }
}

#[async_trait]
impl LinkOpener for SimLinks {
    async fn open(&self, url: &str) -> Result<()> {
        self.log.push(DeviceCall::OpenLink {
            url: url.to_string(),
        });
        Ok(())
    }
}

/// A full set of simulated collaborators sharing one call log
#[derive(Clone)]
pub struct SimulatedRig {
    /// Shared journal
    pub log: CallLog,
    /// Camera
    pub camera: Arc<SimCamera>,
    /// Media library
    pub media: Arc<SimMediaLibrary>,
    /// Preview grabber
    pub preview: Arc<SimPreview>,
    /// Brightness
    pub brightness: Arc<SimBrightness>,
    /// Permission prompts
    pub permissions: Arc<SimPermissions>,
    /// Notices
    pub notifier: Arc<SimNotifier>,
    /// Browser
    pub links: Arc<SimLinks>,
}

impl SimulatedRig {
    /// Build a rig where everything works and every prompt is granted.
    pub fn new() -> Self {
        let log = CallLog::default();
        Self {
            camera: Arc::new(SimCamera::new(log.clone())),
            media: Arc::new(SimMediaLibrary {
                log: log.clone(),
                saved: Mutex::new(Vec::new()),
            }),
            preview: Arc::new(SimPreview {
                log: log.clone(),
                frames: AtomicU32::new(0),
            }),
            brightness: Arc::new(SimBrightness {
                log: log.clone(),
                available: AtomicBool::new(true),
                level: Mutex::new(None),
            }),
            permissions: Arc::new(SimPermissions {
                log: log.clone(),
                scripts: Mutex::new(HashMap::new()),
                broken: AtomicBool::new(false),
                failing_requests: AtomicBool::new(false),
            }),
            notifier: Arc::new(SimNotifier { log: log.clone() }),
            links: Arc::new(SimLinks { log: log.clone() }),
            log,
        }
    }

    /// Collaborator bundle backed by this rig.
    pub fn devices(&self) -> Devices {
        Devices {
            camera: self.camera.clone(),
            media: self.media.clone(),
            preview: self.preview.clone(),
            brightness: self.brightness.clone(),
            permissions: self.permissions.clone(),
            notifier: self.notifier.clone(),
            links: self.links.clone(),
        }
    }
}

impl Default for SimulatedRig {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_media_library_numbers_saves() {
        let rig = SimulatedRig::new();
        let first = rig.media.save("sim://camera/photo-1.jpg").await.unwrap();
        let second = rig.media.save("sim://camera/clip-1.mp4").await.unwrap();
        assert_eq!(first, "sim://library/1/photo-1.jpg");
        assert_eq!(second, "sim://library/2/clip-1.mp4");
    }

    #[tokio::test]
    async fn test_video_thumbnail_is_named_after_clip() {
        let rig = SimulatedRig::new();
        let thumb = rig
            .media
            .video_thumbnail("sim://library/1/clip-1.mp4")
            .await
            .unwrap();
        assert_eq!(thumb, "sim://thumbnails/clip-1.jpg");
    }

    #[tokio::test]
    async fn test_granted_prompt_updates_os_status() {
        let rig = SimulatedRig::new();
        let kind = PermissionKind::Camera;
        assert_eq!(
            rig.permissions.query_status(kind).await.unwrap(),
            PermissionStatus::Undetermined
        );
        rig.permissions.request(kind).await.unwrap();
        assert_eq!(
            rig.permissions.query_status(kind).await.unwrap(),
            PermissionStatus::Granted
        );
    }

    #[tokio::test]
    async fn test_missing_brightness_api_reports_unavailable() {
        let rig = SimulatedRig::new();
        rig.brightness.set_available(false);
        let err = rig.brightness.set_level(1.0).await.unwrap_err();
        assert!(matches!(err, Error::Unavailable(_)));
        assert!(!rig.log.touched_brightness());
    }
}
