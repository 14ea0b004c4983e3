//! Flash, torch and front "screen flash" state machine
//!
//! The controller only tracks two facts: which sensor is active and the
//! logical [`FlashSetting`]. Everything observable (hardware LED mode, the
//! white overlay, forced screen brightness, the icon) is derived from that
//! pair so the effects can never drift out of sync with the state.

use crate::device::{HardwareFlashMode, Mirror};
use crate::permission::{PermissionGate, PermissionKind};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, info};

/// Default opacity of the white overlay used as a front flash
pub const DEFAULT_OVERLAY_OPACITY: f32 = 0.9;

/// Active camera sensor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CameraFacing {
    /// Rear sensor with a hardware LED
    #[default]
    Back,
    /// Selfie sensor without a flash
    Front,
}

impl CameraFacing {
    /// The other sensor
    pub fn flipped(self) -> Self {
        match self {
            CameraFacing::Back => CameraFacing::Front,
            CameraFacing::Front => CameraFacing::Back,
        }
    }

    /// Canonical string representation for configuration files
    pub fn as_str(self) -> &'static str {
        match self {
            CameraFacing::Back => "back",
            CameraFacing::Front => "front",
        }
    }

    /// Parse from a user-provided string (case-insensitive)
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "back" | "rear" => Some(CameraFacing::Back),
            "front" | "selfie" => Some(CameraFacing::Front),
            _ => None,
        }
    }
}

impl fmt::Display for CameraFacing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Logical flash mode, independent of how it is realised
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlashSetting {
    /// No flash
    #[default]
    Off,
    /// Fire when the scene is dark
    Auto,
    /// Fire on every shot
    On,
    /// Continuous light
    Torch,
}

impl FlashSetting {
    /// Icon shown on the flash button
    pub fn icon(self) -> FlashIcon {
        match self {
            FlashSetting::Off => FlashIcon {
                name: "flash-off",
                color: "#ffffff",
            },
            FlashSetting::Auto => FlashIcon {
                name: "flash-auto",
                color: "#ffd469",
            },
            FlashSetting::On | FlashSetting::Torch => FlashIcon {
                name: "flash-on",
                color: "#ffd469",
            },
        }
    }

    /// Canonical string representation
    pub fn as_str(self) -> &'static str {
        match self {
            FlashSetting::Off => "off",
            FlashSetting::Auto => "auto",
            FlashSetting::On => "on",
            FlashSetting::Torch => "torch",
        }
    }
}

impl fmt::Display for FlashSetting {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Flash button glyph and tint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FlashIcon {
    /// Glyph name
    pub name: &'static str,
    /// Tint as `#rrggbb`
    pub color: &'static str,
}

/// Who controls screen brightness
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BrightnessTarget {
    /// The OS
    SystemManaged,
    /// Forced to full
    Max,
}

/// Screen-side effects of the current flash state
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScreenFlash {
    /// Opacity of the white layer over the preview, if shown
    pub overlay_opacity: Option<f32>,
    /// Brightness the display should be driven to
    pub brightness: BrightnessTarget,
}

impl ScreenFlash {
    /// Whether the front flash is lit
    pub fn is_lit(&self) -> bool {
        self.brightness == BrightnessTarget::Max
    }
}

/// Everything the flash state drives outside the controller
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FlashOutputs {
    /// Camera LED mode
    pub hardware: HardwareFlashMode,
    /// Overlay and brightness
    pub screen: ScreenFlash,
}

/// How a photo request should be fulfilled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CapturePlan {
    /// Native shutter
    Shutter,
    /// Native shutter with the screen flash lit for the duration of the shot
    FrontPulse,
    /// Grab the rendered preview instead of firing the shutter
    PreviewSnapshot {
        /// Orientation fix applied to the grabbed frame
        mirror: Mirror,
    },
}

/// Flash state machine for the active sensor
#[derive(Debug, Clone)]
pub struct FlashController {
    facing: CameraFacing,
    setting: FlashSetting,
    overlay_opacity: f32,
}

impl FlashController {
    /// Controller for `facing` with the flash off.
    pub fn new(facing: CameraFacing) -> Self {
        Self {
            facing,
            setting: FlashSetting::Off,
            overlay_opacity: DEFAULT_OVERLAY_OPACITY,
        }
    }

    /// Override the front-flash overlay opacity (clamped to `0.0..=1.0`).
    pub fn with_overlay_opacity(mut self, opacity: f32) -> Self {
        self.overlay_opacity = opacity.clamp(0.0, 1.0);
        self
    }

    /// Active sensor
    pub fn facing(&self) -> CameraFacing {
        self.facing
    }

    /// Current logical setting
    pub fn setting(&self) -> FlashSetting {
        self.setting
    }

    /// The torch button is only offered once the flash is on.
    pub fn torch_control_visible(&self) -> bool {
        matches!(self.setting, FlashSetting::On | FlashSetting::Torch)
    }

    /// LED mode for the camera. The front sensor has no LED.
    pub fn hardware_mode(&self) -> HardwareFlashMode {
        match (self.facing, self.setting) {
            (CameraFacing::Front, _) => HardwareFlashMode::Off,
            (CameraFacing::Back, FlashSetting::Off) => HardwareFlashMode::Off,
            (CameraFacing::Back, FlashSetting::Auto) => HardwareFlashMode::Auto,
            (CameraFacing::Back, FlashSetting::On) => HardwareFlashMode::On,
            (CameraFacing::Back, FlashSetting::Torch) => HardwareFlashMode::Torch,
        }
    }

    /// Overlay and brightness implied by the current state.
    pub fn screen_flash(&self) -> ScreenFlash {
        if self.facing == CameraFacing::Front && self.setting == FlashSetting::Torch {
            ScreenFlash {
                overlay_opacity: Some(self.overlay_opacity),
                brightness: BrightnessTarget::Max,
            }
        } else {
            ScreenFlash {
                overlay_opacity: None,
                brightness: BrightnessTarget::SystemManaged,
            }
        }
    }

    /// Snapshot of every derived effect, for diffing around a transition.
    pub fn outputs(&self) -> FlashOutputs {
        FlashOutputs {
            hardware: self.hardware_mode(),
            screen: self.screen_flash(),
        }
    }

    /// Handle a tap on the flash button.
    ///
    /// Back cycles off, auto, on. Front only knows off and on, and turning it
    /// on needs the brightness permission; when that is refused the setting
    /// stays put (the gate has already told the user).
    pub async fn toggle(&mut self, gate: &PermissionGate) -> FlashSetting {
        let next = next_manual(self.facing, self.setting);
        if self.facing == CameraFacing::Front
            && next == FlashSetting::On
            && !gate.ensure(PermissionKind::Brightness).await
        {
            debug!("front flash needs brightness access, leaving flash off");
            return self.setting;
        }
        self.set(next, "toggle");
        self.setting
    }

    /// Handle a tap on the torch button: on and torch swap, anything else is ignored.
    pub fn toggle_torch(&mut self) -> FlashSetting {
        match self.setting {
            FlashSetting::On => self.set(FlashSetting::Torch, "torch toggle"),
            FlashSetting::Torch => self.set(FlashSetting::On, "torch toggle"),
            FlashSetting::Off | FlashSetting::Auto => {
                debug!(setting = %self.setting, "torch control hidden, ignoring");
            }
        }
        self.setting
    }

    /// Switch sensors. The two sensors' flashes are not interchangeable, so
    /// the flash always goes off.
    pub fn flip(&mut self) -> CameraFacing {
        self.facing = self.facing.flipped();
        self.set(FlashSetting::Off, "camera flip");
        self.facing
    }

    /// Video needs continuous light; a plain "on" is promoted to torch.
    pub fn recording_started(&mut self) -> FlashSetting {
        if self.setting == FlashSetting::On {
            self.set(FlashSetting::Torch, "recording started");
        }
        self.setting
    }

    /// Decide how a photo is taken in the current state.
    ///
    /// While recording the shutter belongs to the video, so the preview is
    /// grabbed instead and no front pulse fires. A continuously lit back
    /// LED also goes through the preview.
    pub fn capture_plan(&self, recording: bool) -> CapturePlan {
        let snapshot = CapturePlan::PreviewSnapshot {
            mirror: Mirror::for_facing(self.facing),
        };
        if recording {
            return snapshot;
        }
        match (self.facing, self.setting) {
            (CameraFacing::Back, FlashSetting::Torch) => snapshot,
            (CameraFacing::Front, FlashSetting::On) => CapturePlan::FrontPulse,
            _ => CapturePlan::Shutter,
        }
    }

    /// Light the screen flash for a front shot. Returns whether it was lit.
    pub fn begin_front_pulse(&mut self) -> bool {
        if self.facing == CameraFacing::Front && self.setting == FlashSetting::On {
            self.set(FlashSetting::Torch, "front pulse");
            true
        } else {
            false
        }
    }

    /// Put the screen flash back once the shot resolves.
    pub fn end_front_pulse(&mut self) {
        if self.facing == CameraFacing::Front && self.setting == FlashSetting::Torch {
            self.set(FlashSetting::On, "front pulse done");
        }
    }

    fn set(&mut self, next: FlashSetting, cause: &'static str) {
        if next != self.setting {
            info!(
                facing = %self.facing,
                from = %self.setting,
                to = %next,
                cause,
                "flash setting changed"
            );
            self.setting = next;
        }
    }
}

impl Default for FlashController {
    fn default() -> Self {
        Self::new(CameraFacing::Back)
    }
}

fn next_manual(facing: CameraFacing, setting: FlashSetting) -> FlashSetting {
    match (facing, setting) {
        (CameraFacing::Back, FlashSetting::Off) => FlashSetting::Auto,
        (CameraFacing::Back, FlashSetting::Auto) => FlashSetting::On,
        (CameraFacing::Back, FlashSetting::On | FlashSetting::Torch) => FlashSetting::Off,
        (CameraFacing::Front, FlashSetting::Off) => FlashSetting::On,
        (CameraFacing::Front, _) => FlashSetting::Off,
    }
}
