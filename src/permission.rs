//! Permission gating for camera, microphone, media library and brightness
//!
//! Each capability is asked for at most once per process. A denial sticks
//! until the process restarts (the user has to change it in OS settings),
//! and callers racing on the same capability share a single prompt.

use crate::device::{Notifier, PermissionProvider, PermissionStatus};
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Capabilities guarded by the OS
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PermissionKind {
    /// Camera sensor access
    Camera,
    /// Audio capture for video recording
    Microphone,
    /// Saving photos and videos
    MediaLibrary,
    /// Driving screen brightness for the front flash
    Brightness,
}

impl PermissionKind {
    /// Every kind, in a stable order.
    pub const ALL: [PermissionKind; 4] = [
        PermissionKind::Camera,
        PermissionKind::Microphone,
        PermissionKind::MediaLibrary,
        PermissionKind::Brightness,
    ];

    fn index(self) -> usize {
        match self {
            PermissionKind::Camera => 0,
            PermissionKind::Microphone => 1,
            PermissionKind::MediaLibrary => 2,
            PermissionKind::Brightness => 3,
        }
    }

    /// Canonical identifier used in config and logs
    pub fn as_str(self) -> &'static str {
        match self {
            PermissionKind::Camera => "camera",
            PermissionKind::Microphone => "microphone",
            PermissionKind::MediaLibrary => "media_library",
            PermissionKind::Brightness => "brightness",
        }
    }

    /// Parse from a user-provided string (case-insensitive)
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "camera" => Some(PermissionKind::Camera),
            "microphone" | "mic" | "audio" => Some(PermissionKind::Microphone),
            "media_library" | "media-library" | "media" => Some(PermissionKind::MediaLibrary),
            "brightness" => Some(PermissionKind::Brightness),
            _ => None,
        }
    }
}

impl fmt::Display for PermissionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the gate knows about a capability
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PermissionState {
    /// Not asked yet in this process
    #[default]
    Unknown,
    /// Usable
    Granted,
    /// Refused; only an OS settings change (and a restart) resets it
    Denied,
}

#[derive(Default)]
struct Slot {
    state: Mutex<PermissionState>,
    // Bumped when an OS round-trip errors. Callers that queued behind that
    // round-trip compare it against the value they saw before locking.
    failures: AtomicU64,
}

/// Single-flight permission cache in front of the OS prompts
pub struct PermissionGate {
    provider: Arc<dyn PermissionProvider>,
    notifier: Arc<dyn Notifier>,
    // Indexed by `PermissionKind::index`. Holding a slot's lock across the
    // OS round-trip is what serializes callers of the same kind.
    slots: [Slot; 4],
}

impl PermissionGate {
    /// Create a gate with every capability in [`PermissionState::Unknown`].
    pub fn new(provider: Arc<dyn PermissionProvider>, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            provider,
            notifier,
            slots: Default::default(),
        }
    }

    /// Current state of `kind`. Waits if a request for it is in flight.
    pub async fn state(&self, kind: PermissionKind) -> PermissionState {
        *self.slots[kind.index()].state.lock().await
    }

    /// Return whether `kind` is usable, prompting the user at most once.
    ///
    /// Never fails: a refusal or an OS error surfaces a denial notice and
    /// yields `false`. OS errors leave the state `Unknown` so a later call
    /// can try again; callers that were already waiting on the failed
    /// round-trip share its `false` instead of asking again.
    pub async fn ensure(&self, kind: PermissionKind) -> bool {
        let slot = &self.slots[kind.index()];
        let seen_failures = slot.failures.load(Ordering::Acquire);
        let mut state = slot.state.lock().await;
        match *state {
            PermissionState::Granted => return true,
            PermissionState::Denied => {
                debug!(permission = %kind, "permission previously denied");
                self.notifier.permission_denied(kind);
                return false;
            }
            PermissionState::Unknown => {}
        }
        if slot.failures.load(Ordering::Acquire) != seen_failures {
            debug!(permission = %kind, "permission check failed while waiting");
            self.notifier.permission_denied(kind);
            return false;
        }

        match self.resolve(kind).await {
            Ok(true) => {
                info!(permission = %kind, "permission granted");
                *state = PermissionState::Granted;
                true
            }
            Ok(false) => {
                warn!(permission = %kind, "permission denied");
                *state = PermissionState::Denied;
                self.notifier.permission_denied(kind);
                false
            }
            Err(err) => {
                warn!(permission = %kind, error = %err, "permission check failed");
                slot.failures.fetch_add(1, Ordering::AcqRel);
                self.notifier.permission_denied(kind);
                false
            }
        }
    }

    /// Ensure each kind in order, stopping at the first one refused.
    pub async fn ensure_all(&self, kinds: &[PermissionKind]) -> Result<()> {
        for &kind in kinds {
            if !self.ensure(kind).await {
                return Err(Error::PermissionDenied(kind));
            }
        }
        Ok(())
    }

    async fn resolve(&self, kind: PermissionKind) -> Result<bool> {
        if self.provider.query_status(kind).await? == PermissionStatus::Granted {
            debug!(permission = %kind, "already granted at OS level");
            return Ok(true);
        }

        self.notifier.present_rationale(kind).await;
        let answer = self.provider.request(kind).await?;
        Ok(answer == PermissionStatus::Granted)
    }
}
