//! Detection outcomes and the shared detection status record.

use serde::{Deserialize, Serialize};

/// Outcome of one detection trigger.
///
/// Transient: each trigger replaces the previous result and it never
/// touches trap statuses on its own.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetectionResult {
    /// Whether the detection service produced a verdict.
    pub success: bool,
    /// Verdict text on success, failure reason otherwise.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Whether a mouse or rat was seen, when the service reports it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mouse_detected: Option<bool>,
    /// Port the detection service answered on.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    /// Completion time (RFC 3339).
    pub completed_at: String,
}

impl DetectionResult {
    /// Creates a successful result.
    pub fn success(message: Option<String>, mouse_detected: Option<bool>, port: u16) -> Self {
        Self {
            success: true,
            message,
            mouse_detected,
            port: Some(port),
            completed_at: chrono::Utc::now().to_rfc3339(),
        }
    }

    /// Creates a failed result carrying `message`.
    pub fn failure(message: impl Into<String>, port: Option<u16>) -> Self {
        Self {
            success: false,
            message: Some(message.into()),
            mouse_detected: None,
            port,
            completed_at: chrono::Utc::now().to_rfc3339(),
        }
    }

    /// Whether this result confirms a sighting.
    pub fn confirms_sighting(&self) -> bool {
        self.success && self.mouse_detected == Some(true)
    }
}

/// Last detection reported to the dashboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetectionStatus {
    /// Whether something was detected.
    pub detected: bool,
    /// Report time in milliseconds since the Unix epoch.
    pub timestamp: i64,
    /// Room the report refers to.
    pub room: String,
}

/// Partial update for [`DetectionStatus`]; absent fields keep their value.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DetectionStatusPatch {
    /// New detection flag.
    pub detected: Option<bool>,
    /// New timestamp; defaults to the time of the update.
    pub timestamp: Option<i64>,
    /// New room.
    pub room: Option<String>,
}
