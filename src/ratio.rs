//! Aspect-ratio cycling driven by horizontal swipes

use serde::{Deserialize, Serialize};

/// Horizontal swipe over the preview
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SwipeDirection {
    /// Advance to the next ratio
    Left,
    /// Go back to the previous ratio
    Right,
}

/// Ordered list of supported ratios and the active one
///
/// Empty until the camera reports its capabilities; swipes before then are
/// ignored.
#[derive(Debug, Clone, Default)]
pub struct RatioSelector {
    ratios: Vec<String>,
    active: Option<usize>,
}

impl RatioSelector {
    /// Selector with no known ratios
    pub fn new() -> Self {
        Self::default()
    }

    /// Install the device-reported ratios and select `preferred` when
    /// supported, otherwise the first one.
    pub fn load(&mut self, ratios: Vec<String>, preferred: Option<&str>) -> Option<&str> {
        self.active = if ratios.is_empty() {
            None
        } else {
            preferred
                .and_then(|want| ratios.iter().position(|r| r == want))
                .or(Some(0))
        };
        self.ratios = ratios;
        self.current()
    }

    /// Whether the camera has reported its ratios
    pub fn is_loaded(&self) -> bool {
        self.active.is_some()
    }

    /// Active ratio
    pub fn current(&self) -> Option<&str> {
        self.active.map(|i| self.ratios[i].as_str())
    }

    /// Index of the active ratio
    pub fn active_index(&self) -> Option<usize> {
        self.active
    }

    /// Supported ratios in device order
    pub fn ratios(&self) -> &[String] {
        &self.ratios
    }

    /// Move one step in the swipe direction, wrapping at both ends.
    pub fn step(&mut self, direction: SwipeDirection) -> Option<&str> {
        let current = self.active?;
        let len = self.ratios.len();
        let next = match direction {
            SwipeDirection::Left => (current + 1) % len,
            SwipeDirection::Right => (current + len - 1) % len,
        };
        self.active = Some(next);
        self.current()
    }
}
