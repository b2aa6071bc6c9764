//! Detection trigger bookkeeping.
//!
//! A trigger moves through `idle -> in flight -> idle` and leaves behind the
//! last [`DetectionResult`]. Starting a trigger clears the previous result.
//! Keypress triggers are refused while a detection is outstanding; clicks
//! always start a new cycle. When several detections overlap, the last one
//! to resolve wins.

use std::sync::{Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::error::{RelayError, TriggerError};
use crate::models::DetectionResult;
use crate::relay::RelayAnswer;

/// What started a detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TriggerSource {
    /// The detect button.
    #[default]
    Click,
    /// The designated shortcut key.
    Keypress,
}

/// Trigger state as seen by the renderer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TriggerSnapshot {
    /// Whether a detection is outstanding (busy indicator).
    pub in_flight: bool,
    /// Number of outstanding detections.
    pub pending: usize,
    /// Last resolved result; `None` while any detection is in flight or
    /// before the first run.
    pub result: Option<DetectionResult>,
    /// Ticket of the most recently started detection.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ticket: Option<Uuid>,
    /// Start time of the most recent detection (RFC 3339).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<String>,
}

#[derive(Debug, Default)]
struct TriggerState {
    pending: usize,
    result: Option<DetectionResult>,
    ticket: Option<Uuid>,
    started_at: Option<String>,
}

impl TriggerState {
    fn settled_result(&self) -> Option<DetectionResult> {
        if self.pending > 0 {
            None
        } else {
            self.result.clone()
        }
    }
}

/// Tracks in-flight detections and the last result.
#[derive(Debug, Default)]
pub struct DetectionTrigger {
    state: Mutex<TriggerState>,
}

impl DetectionTrigger {
    /// Creates an idle trigger with no result.
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, TriggerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Enters the in-flight state and returns a ticket for the new cycle.
    ///
    /// # Errors
    ///
    /// [`TriggerError::DetectionInFlight`] for a keypress while a detection
    /// is outstanding.
    pub fn begin(&self, source: TriggerSource) -> Result<Uuid, TriggerError> {
        let mut state = self.state();
        if source == TriggerSource::Keypress && state.pending > 0 {
            return Err(TriggerError::DetectionInFlight);
        }

        let ticket = Uuid::new_v4();
        state.pending += 1;
        state.result = None;
        state.ticket = Some(ticket);
        state.started_at = Some(chrono::Utc::now().to_rfc3339());
        Ok(ticket)
    }

    /// Folds a resolved detection into the state.
    ///
    /// Every completion overwrites the result; the busy flag clears once
    /// all outstanding detections resolved.
    pub fn complete(&self, result: DetectionResult) {
        let mut state = self.state();
        state.pending = state.pending.saturating_sub(1);
        state.result = Some(result);
    }

    /// Whether a detection is outstanding.
    pub fn in_flight(&self) -> bool {
        self.state().pending > 0
    }

    /// Last resolved result, withheld while a detection is outstanding.
    pub fn result(&self) -> Option<DetectionResult> {
        self.state().settled_result()
    }

    /// Current state for rendering.
    pub fn snapshot(&self) -> TriggerSnapshot {
        let state = self.state();
        TriggerSnapshot {
            in_flight: state.pending > 0,
            pending: state.pending,
            result: state.settled_result(),
            ticket: state.ticket,
            started_at: state.started_at.clone(),
        }
    }
}

/// Turns a relay answer (or failure) into a detection result.
///
/// Only a JSON object with `status == "success"` counts as success; its
/// `result` string and optional `detected` flag are carried over. Anything
/// else becomes a failure with a short, displayable message.
pub fn interpret(answer: Result<RelayAnswer, RelayError>) -> DetectionResult {
    let answer = match answer {
        Ok(answer) => answer,
        Err(err) => return DetectionResult::failure(err.to_string(), None),
    };

    let port = Some(answer.port);
    let Some(body) = answer.body.as_object() else {
        return DetectionResult::failure(
            "Malformed detection response: expected a JSON object",
            port,
        );
    };

    match body.get("status").and_then(Value::as_str) {
        Some("success") => DetectionResult::success(
            body.get("result").and_then(Value::as_str).map(str::to_string),
            body.get("detected").and_then(Value::as_bool),
            answer.port,
        ),
        Some(_) => {
            let message = body
                .get("error")
                .and_then(Value::as_str)
                .map_or_else(
                    || format!("Detection failed (HTTP {})", answer.http_status),
                    |e| format!("Detection failed: {e}"),
                );
            DetectionResult::failure(message, port)
        }
        None => DetectionResult::failure(
            "Malformed detection response: missing status field",
            port,
        ),
    }
}
