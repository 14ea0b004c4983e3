//! Transient on-screen messages

use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;

/// A value that clears itself a fixed delay after it was last set.
///
/// Setting a new value cancels the pending clear, so a stream of updates
/// (e.g. the same QR code reported every frame) keeps the value visible.
pub struct Debounced<T> {
    slot: Arc<Mutex<Slot<T>>>,
    delay: Duration,
}

struct Slot<T> {
    value: Option<T>,
    generation: u64,
    pending: Option<JoinHandle<()>>,
}

impl<T: Clone + Send + 'static> Debounced<T> {
    /// Empty display that clears `delay` after each set.
    pub fn new(delay: Duration) -> Self {
        Self {
            slot: Arc::new(Mutex::new(Slot {
                value: None,
                generation: 0,
                pending: None,
            })),
            delay,
        }
    }

    /// Show `value` and restart the clear timer.
    ///
    /// # Panics
    ///
    /// The timer is a spawned task, so this panics outside a Tokio runtime.
    pub fn set(&self, value: T) {
        let mut slot = self.slot.lock().expect("debounce mutex poisoned");
        if let Some(pending) = slot.pending.take() {
            pending.abort();
        }
        slot.generation = slot.generation.wrapping_add(1);
        slot.value = Some(value);

        let generation = slot.generation;
        let delay = self.delay;
        let shared = Arc::clone(&self.slot);
        slot.pending = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let mut slot = shared.lock().expect("debounce mutex poisoned");
            // A newer set may have raced the abort.
            if slot.generation == generation {
                slot.value = None;
                slot.pending = None;
            }
        }));
    }

    /// Currently displayed value
    pub fn get(&self) -> Option<T> {
        self.slot.lock().expect("debounce mutex poisoned").value.clone()
    }

    /// Hide immediately and drop the pending timer.
    pub fn clear(&self) {
        let mut slot = self.slot.lock().expect("debounce mutex poisoned");
        if let Some(pending) = slot.pending.take() {
            pending.abort();
        }
        slot.generation = slot.generation.wrapping_add(1);
        slot.value = None;
    }

    /// Delay between the last set and the clear
    pub fn delay(&self) -> Duration {
        self.delay
    }
}

impl<T> Drop for Debounced<T> {
    fn drop(&mut self) {
        if let Ok(mut slot) = self.slot.lock() {
            if let Some(pending) = slot.pending.take() {
                pending.abort();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_value_clears_after_delay() {
        let link = Debounced::new(Duration::from_millis(1000));
        link.set("https://example.com".to_string());

        tokio::time::sleep(Duration::from_millis(999)).await;
        assert_eq!(link.get().as_deref(), Some("https://example.com"));

        tokio::time::sleep(Duration::from_millis(2)).await;
        assert_eq!(link.get(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_new_set_restarts_timer() {
        let overlay = Debounced::new(Duration::from_millis(1000));
        overlay.set("4:3");
        tokio::time::sleep(Duration::from_millis(600)).await;
        overlay.set("16:9");

        tokio::time::sleep(Duration::from_millis(600)).await;
        assert_eq!(overlay.get(), Some("16:9"));

        tokio::time::sleep(Duration::from_millis(401)).await;
        assert_eq!(overlay.get(), None);
    }

    #[test]
    #[should_panic]
    fn test_set_outside_runtime_panics() {
        let link = Debounced::new(Duration::from_millis(1000));
        link.set("https://example.com".to_string());
    }

    #[tokio::test(start_paused = true)]
    async fn test_clear_cancels_pending() {
        let overlay = Debounced::new(Duration::from_millis(100));
        overlay.set(1u32);
        overlay.clear();
        assert_eq!(overlay.get(), None);

        overlay.set(2u32);
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(overlay.get(), Some(2));
    }
}
