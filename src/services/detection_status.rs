//! Process-wide detection status slot.
//!
//! Holds the last `{detected, timestamp, room}` report posted to the
//! dashboard. There is exactly one slot (not one per room); it lives only in
//! process memory and starts over from the default on every restart. Writes
//! are last-write-wins.

use std::sync::{PoisonError, RwLock};

use crate::models::{DetectionStatus, DetectionStatusPatch};

fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// The single shared detection status record.
#[derive(Debug)]
pub struct DetectionStatusSlot {
    default_room: String,
    current: RwLock<DetectionStatus>,
}

impl DetectionStatusSlot {
    /// Creates the slot in its startup state: nothing detected in `default_room`.
    pub fn new(default_room: impl Into<String>) -> Self {
        let default_room = default_room.into();
        let current = RwLock::new(Self::initial(&default_room));
        Self {
            default_room,
            current,
        }
    }

    fn initial(room: &str) -> DetectionStatus {
        DetectionStatus {
            detected: false,
            timestamp: now_millis(),
            room: room.to_string(),
        }
    }

    /// Current record.
    pub fn get(&self) -> DetectionStatus {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Applies `patch` and returns the new record.
    ///
    /// A missing timestamp is replaced by the time of the update.
    pub fn update(&self, patch: DetectionStatusPatch) -> DetectionStatus {
        let mut current = self.current.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(detected) = patch.detected {
            current.detected = detected;
        }
        if let Some(room) = patch.room {
            current.room = room;
        }
        current.timestamp = patch.timestamp.unwrap_or_else(now_millis);
        current.clone()
    }

    /// Puts the slot back into its startup state.
    pub fn reset(&self) -> DetectionStatus {
        let mut current = self.current.write().unwrap_or_else(PoisonError::into_inner);
        *current = Self::initial(&self.default_room);
        current.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slot_starts_with_default_room() {
        let slot = DetectionStatusSlot::new("kitchen");
        let status = slot.get();
        assert!(!status.detected);
        assert_eq!(status.room, "kitchen");
        assert!(status.timestamp > 0);
    }

    #[test]
    fn test_update_merges_fields() {
        let slot = DetectionStatusSlot::new("kitchen");
        slot.update(DetectionStatusPatch {
            detected: Some(true),
            timestamp: Some(42),
            room: Some("bedroom".to_string()),
        });

        let partial = slot.update(DetectionStatusPatch {
            detected: Some(false),
            timestamp: Some(43),
            room: None,
        });
        assert_eq!(
            partial,
            DetectionStatus {
                detected: false,
                timestamp: 43,
                room: "bedroom".to_string()
            }
        );
    }

    #[test]
    fn test_update_defaults_timestamp_to_now() {
        let slot = DetectionStatusSlot::new("kitchen");
        let before = now_millis();
        let status = slot.update(DetectionStatusPatch {
            detected: Some(true),
            ..DetectionStatusPatch::default()
        });
        assert!(status.timestamp >= before);
    }

    #[test]
    fn test_reset_restores_default() {
        let slot = DetectionStatusSlot::new("kitchen");
        slot.update(DetectionStatusPatch {
            detected: Some(true),
            timestamp: Some(1),
            room: Some("garage".to_string()),
        });
        let status = slot.reset();
        assert!(!status.detected);
        assert_eq!(status.room, "kitchen");
    }
}
