//! Per-request payload exchange cell.
//!
//! The engine's own retrieval writes a payload here; the loader reads it
//! once and clears it. Each load operation gets a fresh slot, so a stale
//! payload can never leak into a later call.

use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

/// Single-value exchange cell: write-once by the producer, read-once-and-
/// cleared by the consumer.
#[derive(Clone, Default)]
pub struct HandoffSlot {
    payload: Arc<Mutex<Option<String>>>,
    arrived: Arc<Notify>,
}

impl HandoffSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Producer side: deposit the retrieved payload and wake the waiter.
    pub fn put(&self, payload: String) {
        *self.payload.lock().unwrap_or_else(|p| p.into_inner()) = Some(payload);
        self.arrived.notify_one();
    }

    /// Consumer side: take the payload, leaving the slot empty.
    pub fn take(&self) -> Option<String> {
        self.payload
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .take()
    }

    /// Wait until a payload lands, then take it.
    pub async fn wait_take(&self) -> String {
        loop {
            if let Some(payload) = self.take() {
                return payload;
            }
            self.arrived.notified().await;
        }
    }

    pub fn clear(&self) {
        self.take();
    }

    pub fn is_empty(&self) -> bool {
        self.payload
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_take_clears() {
        let slot = HandoffSlot::new();
        assert!(slot.is_empty());
        slot.put("payload".into());
        assert!(!slot.is_empty());
        assert_eq!(slot.take().as_deref(), Some("payload"));
        assert!(slot.is_empty());
        assert_eq!(slot.take(), None);
    }

    #[tokio::test]
    async fn test_wait_take_sees_later_put() {
        let slot = HandoffSlot::new();
        let producer = slot.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            producer.put("late".into());
        });
        assert_eq!(slot.wait_take().await, "late");
        assert!(slot.is_empty());
    }

    #[tokio::test]
    async fn test_wait_take_sees_earlier_put() {
        let slot = HandoffSlot::new();
        slot.put("early".into());
        assert_eq!(slot.wait_take().await, "early");
    }
}
