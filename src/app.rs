//! The camera controller
//!
//! [`CameraApp`] owns the permission gate, the flash state machine, the
//! transient displays and the collaborator handles. UI events arrive one at
//! a time through [`CameraApp::dispatch`]; every failure is logged and
//! reported back without taking the controller down.

use crate::config::AppConfig;
use crate::device::{Devices, Mirror};
use crate::display::Debounced;
use crate::error::{Error, Result};
use crate::flash::{
    BrightnessTarget, CameraFacing, CapturePlan, FlashController, FlashIcon, FlashOutputs,
    FlashSetting, ScreenFlash,
};
use crate::permission::{PermissionGate, PermissionKind, PermissionState};
use crate::qr::{QrDecoder, QrPayload};
use crate::ratio::{RatioSelector, SwipeDirection};
use image::DynamicImage;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Permissions required before anything can be captured
const STARTUP_PERMISSIONS: [PermissionKind; 2] =
    [PermissionKind::Camera, PermissionKind::MediaLibrary];

/// A discrete UI event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppEvent {
    /// The camera finished initialising and can report capabilities
    CameraReady,
    /// Flash button tapped
    ToggleFlash,
    /// Torch button tapped
    ToggleTorch,
    /// Flip button tapped
    Flip,
    /// Shutter button tapped
    TakePhoto,
    /// Record button tapped
    StartRecording,
    /// Stop button tapped
    StopRecording,
    /// Horizontal swipe over the preview
    Swipe(SwipeDirection),
    /// The camera reported a barcode
    BarcodeScanned(String),
    /// QR link banner tapped
    OpenLink,
}

impl FromStr for AppEvent {
    type Err = Error;

    fn from_str(line: &str) -> Result<Self> {
        let line = line.trim();
        let (head, rest) = line
            .split_once(char::is_whitespace)
            .map(|(h, r)| (h, r.trim()))
            .unwrap_or((line, ""));

        let event = match head.to_ascii_lowercase().as_str() {
            "ready" | "camera-ready" => AppEvent::CameraReady,
            "flash" | "toggle-flash" => AppEvent::ToggleFlash,
            "torch" | "toggle-torch" => AppEvent::ToggleTorch,
            "flip" => AppEvent::Flip,
            "photo" | "capture" => AppEvent::TakePhoto,
            "record" => AppEvent::StartRecording,
            "stop" => AppEvent::StopRecording,
            "swipe-left" => AppEvent::Swipe(SwipeDirection::Left),
            "swipe-right" => AppEvent::Swipe(SwipeDirection::Right),
            "open-link" | "tap-link" => AppEvent::OpenLink,
            "qr" | "barcode" if !rest.is_empty() => AppEvent::BarcodeScanned(rest.to_string()),
            _ => return Err(Error::InvalidEvent(line.to_string())),
        };
        Ok(event)
    }
}

impl fmt::Display for AppEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppEvent::CameraReady => f.write_str("ready"),
            AppEvent::ToggleFlash => f.write_str("flash"),
            AppEvent::ToggleTorch => f.write_str("torch"),
            AppEvent::Flip => f.write_str("flip"),
            AppEvent::TakePhoto => f.write_str("photo"),
            AppEvent::StartRecording => f.write_str("record"),
            AppEvent::StopRecording => f.write_str("stop"),
            AppEvent::Swipe(SwipeDirection::Left) => f.write_str("swipe-left"),
            AppEvent::Swipe(SwipeDirection::Right) => f.write_str("swipe-right"),
            AppEvent::BarcodeScanned(data) => write!(f, "qr {data}"),
            AppEvent::OpenLink => f.write_str("open-link"),
        }
    }
}

/// Whether the startup permissions allow capturing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "permission", rename_all = "lowercase")]
pub enum Readiness {
    /// `start` has not run yet
    Pending,
    /// Camera and media library are usable
    Ready,
    /// A startup permission was refused
    Blocked(PermissionKind),
}

/// Serializable view of everything the UI renders
#[derive(Debug, Clone, Serialize)]
pub struct AppSnapshot {
    /// Startup permission outcome
    pub readiness: Readiness,
    /// Active sensor
    pub facing: CameraFacing,
    /// Logical flash setting
    pub flash: FlashSetting,
    /// Flash button glyph
    pub flash_icon: FlashIcon,
    /// Whether the torch button is shown
    pub torch_control_visible: bool,
    /// Overlay and brightness of the front flash
    pub screen_flash: ScreenFlash,
    /// Video in progress
    pub recording: bool,
    /// Active aspect ratio
    pub ratio: Option<String>,
    /// Ratio name currently flashed on screen
    pub ratio_overlay: Option<String>,
    /// QR link banner text
    pub barcode_link: Option<String>,
    /// Most recently persisted photo or video
    pub last_media: Option<String>,
    /// Gate state per capability
    pub permissions: BTreeMap<&'static str, PermissionState>,
}

/// Camera controller
pub struct CameraApp {
    devices: Devices,
    gate: Arc<PermissionGate>,
    flash: FlashController,
    ratios: RatioSelector,
    preferred_ratio: Option<String>,
    barcode_link: Debounced<String>,
    ratio_overlay: Debounced<String>,
    decoder: QrDecoder,
    readiness: Readiness,
    recording: bool,
    last_media: Option<String>,
    brightness_available: bool,
}

impl CameraApp {
    /// Build a controller over `devices`. Nothing touches the devices until
    /// [`start`](Self::start).
    pub fn new(devices: Devices, config: &AppConfig) -> Self {
        let gate = Arc::new(PermissionGate::new(
            devices.permissions.clone(),
            devices.notifier.clone(),
        ));
        Self {
            flash: FlashController::new(config.camera.facing)
                .with_overlay_opacity(config.display.screen_flash_opacity),
            ratios: RatioSelector::new(),
            preferred_ratio: config.camera.preferred_ratio.clone(),
            barcode_link: Debounced::new(config.display.link_display()),
            ratio_overlay: Debounced::new(config.display.ratio_overlay()),
            decoder: QrDecoder::new(),
            readiness: Readiness::Pending,
            recording: false,
            last_media: None,
            brightness_available: true,
            devices,
            gate,
        }
    }

    /// Shared handle to the permission gate
    pub fn gate(&self) -> Arc<PermissionGate> {
        Arc::clone(&self.gate)
    }

    /// Flash state machine
    pub fn flash(&self) -> &FlashController {
        &self.flash
    }

    /// Startup permission outcome
    pub fn readiness(&self) -> Readiness {
        self.readiness
    }

    /// Video in progress
    pub fn is_recording(&self) -> bool {
        self.recording
    }

    /// Most recently persisted photo or video
    pub fn last_media(&self) -> Option<&str> {
        self.last_media.as_deref()
    }

    /// Active aspect ratio
    pub fn ratio(&self) -> Option<&str> {
        self.ratios.current()
    }

    /// QR link currently shown
    pub fn barcode_link(&self) -> Option<String> {
        self.barcode_link.get()
    }

    /// Ratio name currently shown
    pub fn ratio_overlay(&self) -> Option<String> {
        self.ratio_overlay.get()
    }

    /// Ask for camera and media-library access and push the initial sensor
    /// and flash state to the camera.
    ///
    /// If the camera rejects the initial state the error is returned and the
    /// controller stays [`Readiness::Pending`]; calling `start` again retries
    /// without prompting.
    pub async fn start(&mut self) -> Result<Readiness> {
        match self.gate.ensure_all(&STARTUP_PERMISSIONS).await {
            Ok(()) => {
                // Capture stays refused until the camera took the initial state.
                let facing = self.flash.facing();
                self.devices.camera.set_facing(facing).await?;
                self.devices
                    .camera
                    .set_flash_mode(self.flash.hardware_mode())
                    .await?;
                self.readiness = Readiness::Ready;
                info!(%facing, "camera started");
            }
            Err(Error::PermissionDenied(kind)) => {
                warn!(permission = %kind, "camera blocked");
                self.readiness = Readiness::Blocked(kind);
            }
            Err(err) => return Err(err),
        }
        Ok(self.readiness)
    }

    /// Apply one UI event. Errors are logged here and handed back; none of
    /// them leave the controller unusable.
    pub async fn dispatch(&mut self, event: AppEvent) -> Result<()> {
        debug!(%event, "dispatching event");
        let outcome = match event.clone() {
            AppEvent::CameraReady => self.camera_ready().await,
            AppEvent::ToggleFlash => self.toggle_flash().await.map(|_| ()),
            AppEvent::ToggleTorch => self.toggle_torch().await.map(|_| ()),
            AppEvent::Flip => self.flip().await.map(|_| ()),
            AppEvent::TakePhoto => self.take_photo().await.map(|_| ()),
            AppEvent::StartRecording => self.start_recording().await,
            AppEvent::StopRecording => self.stop_recording().await.map(|_| ()),
            AppEvent::Swipe(direction) => self.swipe(direction).await.map(|_| ()),
            AppEvent::BarcodeScanned(data) => {
                self.barcode_scanned(data);
                Ok(())
            }
            AppEvent::OpenLink => self.open_link().await.map(|_| ()),
        };
        if let Err(err) = &outcome {
            warn!(%event, error = %err, "event failed");
        }
        outcome
    }

    /// Load the supported ratios once and apply the preferred one.
    pub async fn camera_ready(&mut self) -> Result<()> {
        if self.ratios.is_loaded() {
            return Ok(());
        }
        let supported = self.devices.camera.supported_ratios().await?;
        let selected = self
            .ratios
            .load(supported, self.preferred_ratio.as_deref())
            .map(str::to_string);
        if let Some(ratio) = selected {
            info!(%ratio, available = self.ratios.ratios().len(), "camera ratios loaded");
            self.devices.camera.set_ratio(&ratio).await?;
        }
        Ok(())
    }

    /// Flash button
    pub async fn toggle_flash(&mut self) -> Result<FlashSetting> {
        let before = self.flash.outputs();
        let setting = self.flash.toggle(&self.gate).await;
        self.sync_flash(before).await;
        Ok(setting)
    }

    /// Torch button
    pub async fn toggle_torch(&mut self) -> Result<FlashSetting> {
        let before = self.flash.outputs();
        let setting = self.flash.toggle_torch();
        self.sync_flash(before).await;
        Ok(setting)
    }

    /// Switch sensors. A recording in progress is stopped and saved first.
    pub async fn flip(&mut self) -> Result<CameraFacing> {
        if self.recording {
            if let Err(err) = self.stop_recording().await {
                warn!(error = %err, "failed to finish recording before flip");
            }
            self.recording = false;
        }

        let before = self.flash.outputs();
        let facing = self.flash.flip();
        if let Err(err) = self.devices.camera.set_facing(facing).await {
            warn!(%facing, error = %err, "camera did not switch sensor");
        }
        self.sync_flash(before).await;
        Ok(facing)
    }

    /// Take a photo the way the current flash state calls for and persist it.
    pub async fn take_photo(&mut self) -> Result<String> {
        self.require_ready()?;
        let plan = self.flash.capture_plan(self.recording);
        debug!(?plan, "taking photo");

        let uri = match plan {
            CapturePlan::Shutter => self.devices.camera.take_picture().await?,
            CapturePlan::PreviewSnapshot { mirror } => self.preview_snapshot(mirror).await?,
            CapturePlan::FrontPulse => {
                let before = self.flash.outputs();
                self.flash.begin_front_pulse();
                self.sync_flash(before).await;

                let shot = self.devices.camera.take_picture().await;

                let before = self.flash.outputs();
                self.flash.end_front_pulse();
                self.sync_flash(before).await;
                shot?
            }
        };
        self.persist(&uri).await
    }

    /// Begin recording video. Needs microphone access; an "on" flash turns
    /// into a torch once the camera is rolling.
    pub async fn start_recording(&mut self) -> Result<()> {
        self.require_ready()?;
        if self.recording {
            debug!("already recording");
            return Ok(());
        }
        if !self.gate.ensure(PermissionKind::Microphone).await {
            return Err(Error::PermissionDenied(PermissionKind::Microphone));
        }

        self.devices.camera.start_recording().await?;
        self.recording = true;
        info!("recording started");

        let before = self.flash.outputs();
        self.flash.recording_started();
        self.sync_flash(before).await;
        Ok(())
    }

    /// Stop recording and persist the clip. Returns `None` when nothing was
    /// recording. The flash setting is left as it is.
    ///
    /// The last-media preview shows a still of the clip; if no still can be
    /// rendered it falls back to the clip itself.
    pub async fn stop_recording(&mut self) -> Result<Option<String>> {
        if !self.recording {
            return Ok(None);
        }
        let clip = self.devices.camera.stop_recording().await?;
        self.recording = false;
        info!("recording stopped");

        let saved = self.persist(&clip).await?;
        match self.devices.media.video_thumbnail(&saved).await {
            Ok(thumbnail) => self.last_media = Some(thumbnail),
            Err(err) => warn!(clip = %saved, error = %err, "no thumbnail for clip"),
        }
        Ok(Some(saved))
    }

    /// Cycle the aspect ratio and flash its name on screen.
    pub async fn swipe(&mut self, direction: SwipeDirection) -> Result<Option<String>> {
        let Some(ratio) = self.ratios.step(direction).map(str::to_string) else {
            debug!(?direction, "ratios not known yet, ignoring swipe");
            return Ok(None);
        };
        self.devices.camera.set_ratio(&ratio).await?;
        self.ratio_overlay.set(ratio.clone());
        Ok(Some(ratio))
    }

    /// Show barcode data reported by the camera.
    ///
    /// # Panics
    ///
    /// Starts the banner timer with `tokio::spawn`, so it panics when called
    /// outside a Tokio runtime.
    pub fn barcode_scanned(&mut self, data: String) {
        debug!(length = data.len(), "barcode scanned");
        self.barcode_link.set(data);
    }

    /// Decode a QR code from a captured frame and show it like a native
    /// barcode report.
    ///
    /// # Panics
    ///
    /// Same as [`barcode_scanned`](Self::barcode_scanned) when a text code is
    /// found outside a Tokio runtime.
    pub fn scan_frame(&mut self, frame: &DynamicImage) -> Result<QrPayload> {
        let payload = self.decoder.decode(frame)?;
        match payload.as_str() {
            Some(text) => self.barcode_scanned(text.to_string()),
            None => debug!("QR payload is not text, not displayed"),
        }
        Ok(payload)
    }

    /// Open the banner in the browser. Only http(s) links are opened;
    /// returns the opened url, or `None` when there was nothing to open.
    pub async fn open_link(&mut self) -> Result<Option<String>> {
        let Some(text) = self.barcode_link.get() else {
            debug!("no link shown");
            return Ok(None);
        };
        let payload = QrPayload::from_bytes(text.into_bytes());
        let Some(url) = payload.link() else {
            debug!("banner is not a link, not opening");
            return Ok(None);
        };
        self.devices.links.open(url).await?;
        info!(%url, "link opened");
        Ok(Some(url.to_string()))
    }

    /// Serializable view of the controller
    pub async fn snapshot(&self) -> AppSnapshot {
        let mut permissions = BTreeMap::new();
        for kind in PermissionKind::ALL {
            permissions.insert(kind.as_str(), self.gate.state(kind).await);
        }
        AppSnapshot {
            readiness: self.readiness,
            facing: self.flash.facing(),
            flash: self.flash.setting(),
            flash_icon: self.flash.setting().icon(),
            torch_control_visible: self.flash.torch_control_visible(),
            screen_flash: self.flash.screen_flash(),
            recording: self.recording,
            ratio: self.ratios.current().map(str::to_string),
            ratio_overlay: self.ratio_overlay.get(),
            barcode_link: self.barcode_link.get(),
            last_media: self.last_media.clone(),
            permissions,
        }
    }

    fn require_ready(&self) -> Result<()> {
        match self.readiness {
            Readiness::Ready => Ok(()),
            Readiness::Blocked(kind) => Err(Error::PermissionDenied(kind)),
            Readiness::Pending => Err(Error::Unavailable("camera not started".to_string())),
        }
    }

    async fn preview_snapshot(&self, mirror: Mirror) -> Result<String> {
        self.devices.preview.capture_rendered_frame(mirror).await
    }

    async fn persist(&mut self, uri: &str) -> Result<String> {
        let saved = self.devices.media.save(uri).await?;
        info!(source = uri, saved = %saved, "media saved");
        self.last_media = Some(saved.clone());
        Ok(saved)
    }

    /// Push whatever changed between `before` and the current flash state
    /// to the camera and the display.
    async fn sync_flash(&mut self, before: FlashOutputs) {
        let after = self.flash.outputs();

        if before.hardware != after.hardware {
            if let Err(err) = self.devices.camera.set_flash_mode(after.hardware).await {
                warn!(mode = ?after.hardware, error = %err, "failed to set flash mode");
            }
        }

        if before.screen.brightness != after.screen.brightness {
            self.apply_brightness(after.screen.brightness).await;
        }
    }

    async fn apply_brightness(&mut self, target: BrightnessTarget) {
        if !self.brightness_available {
            return;
        }
        let result = match target {
            BrightnessTarget::Max => self.devices.brightness.set_level(1.0).await,
            BrightnessTarget::SystemManaged => {
                self.devices.brightness.reset_to_system_managed().await
            }
        };
        match result {
            Ok(()) => debug!(?target, "brightness applied"),
            Err(Error::Unavailable(what)) => {
                warn!(%what, "brightness control unavailable, front flash will not brighten the screen");
                self.brightness_available = false;
            }
            Err(err) => warn!(?target, error = %err, "failed to apply brightness"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_events() {
        assert_eq!("flash".parse::<AppEvent>().unwrap(), AppEvent::ToggleFlash);
        assert_eq!(" Torch ".parse::<AppEvent>().unwrap(), AppEvent::ToggleTorch);
        assert_eq!(
            "swipe-right".parse::<AppEvent>().unwrap(),
            AppEvent::Swipe(SwipeDirection::Right)
        );
        assert_eq!(
            "qr https://example.com/a b".parse::<AppEvent>().unwrap(),
            AppEvent::BarcodeScanned("https://example.com/a b".to_string())
        );
        assert!(matches!(
            "qr".parse::<AppEvent>(),
            Err(Error::InvalidEvent(_))
        ));
        assert!(matches!(
            "zoom".parse::<AppEvent>(),
            Err(Error::InvalidEvent(_))
        ));
    }

    #[test]
    fn test_event_display_parses_back() {
        for event in [
            AppEvent::CameraReady,
            AppEvent::Flip,
            AppEvent::TakePhoto,
            AppEvent::StopRecording,
            AppEvent::Swipe(SwipeDirection::Left),
            AppEvent::BarcodeScanned("hello".to_string()),
            AppEvent::OpenLink,
        ] {
            assert_eq!(event.to_string().parse::<AppEvent>().unwrap(), event);
        }
    }
}
