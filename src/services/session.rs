//! Dashboard session: trap state, detection trigger and reconciliation.
//!
//! A session owns the trap state store and the detection trigger. The two
//! are kept apart; detection results only reach trap statuses through
//! [`DashboardSession::reconcile`], and only when the configured policy
//! asks for it.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use anyhow::Context;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::config::{Config, ReconcilePolicy};
use crate::error::TriggerError;
use crate::models::{DetectionResult, TransitionScheme};
use crate::relay::DetectorRelay;
use crate::services::detection_status::DetectionStatusSlot;
use crate::services::registry::TrapRegistry;
use crate::services::store::{StoreSnapshot, TrapStateStore};
use crate::services::trigger::{interpret, DetectionTrigger, TriggerSource};

/// State of one dashboard.
pub struct DashboardSession {
    store: Mutex<TrapStateStore>,
    trigger: DetectionTrigger,
    relay: DetectorRelay,
    detection_status: Arc<DetectionStatusSlot>,
    reconcile: ReconcilePolicy,
}

impl DashboardSession {
    /// Creates a session from explicit parts.
    pub fn new(
        registry: Arc<TrapRegistry>,
        scheme: TransitionScheme,
        reconcile: ReconcilePolicy,
        relay: DetectorRelay,
        detection_status: Arc<DetectionStatusSlot>,
    ) -> Self {
        Self {
            store: Mutex::new(TrapStateStore::initialize(registry, scheme)),
            trigger: DetectionTrigger::new(),
            relay,
            detection_status,
            reconcile,
        }
    }

    /// Creates a session from configuration.
    pub fn from_config(
        config: &Config,
        relay: DetectorRelay,
        detection_status: Arc<DetectionStatusSlot>,
    ) -> anyhow::Result<Self> {
        let registry =
            TrapRegistry::new(config.trap_records()).context("Failed to build trap registry")?;

        info!(
            traps = registry.len(),
            scheme = config.dashboard.transition_scheme.as_str(),
            "dashboard session ready"
        );

        Ok(Self::new(
            Arc::new(registry),
            config.dashboard.transition_scheme,
            config.dashboard.reconcile,
            relay,
            detection_status,
        ))
    }

    /// Locks the trap state store.
    ///
    /// The guard must not be held across an `.await`.
    pub fn store(&self) -> MutexGuard<'_, TrapStateStore> {
        self.store.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Ordered view of the store.
    pub fn snapshot(&self) -> StoreSnapshot {
        self.store().snapshot()
    }

    /// Detection trigger state.
    pub fn trigger(&self) -> &DetectionTrigger {
        &self.trigger
    }

    /// Relay to the detection service.
    pub fn relay(&self) -> &DetectorRelay {
        &self.relay
    }

    /// Shared detection status slot.
    pub fn detection_status(&self) -> &DetectionStatusSlot {
        &self.detection_status
    }

    /// Starts a detection without waiting for it.
    ///
    /// The request runs on the tokio runtime; its result is folded into
    /// the trigger state exactly once, then reconciled. The returned handle
    /// resolves to the same result.
    pub fn trigger_detection(
        self: &Arc<Self>,
        source: TriggerSource,
    ) -> Result<JoinHandle<DetectionResult>, TriggerError> {
        self.trigger.begin(source)?;
        info!(?source, "detection triggered");

        let session = Arc::clone(self);
        Ok(tokio::spawn(async move {
            let result = interpret(session.relay.detect().await);
            if !result.success {
                warn!(
                    reason = result.message.as_deref().unwrap_or_default(),
                    "detection failed"
                );
            }
            // Trap statuses are updated before the trigger reports settled.
            session.reconcile(&result);
            session.trigger.complete(result.clone());
            result
        }))
    }

    /// Applies the reconciliation policy to `result`.
    ///
    /// With [`ReconcilePolicy::AlertRoom`], a confirmed sighting raises the
    /// trap named by the detection status room to the alert status.
    /// Returns the id of the trap that changed.
    pub fn reconcile(&self, result: &DetectionResult) -> Option<String> {
        if self.reconcile != ReconcilePolicy::AlertRoom || !result.confirms_sighting() {
            return None;
        }

        let room = self.detection_status.get().room;
        match self.store().raise_alert(&room) {
            Ok(status) => {
                info!(room = %room, %status, "detection reconciled into trap status");
                Some(room)
            }
            Err(err) => {
                warn!(room = %room, "cannot reconcile detection: {err}");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DetectionStatusPatch, Position, Trap, TrapStatus};
    use crate::relay::{AttemptOutcome, EndpointPlan, MockTransport};
    use serde_json::json;
    use tokio::sync::Notify;

    fn session_with(transport: MockTransport, reconcile: ReconcilePolicy) -> Arc<DashboardSession> {
        let registry = TrapRegistry::new(vec![
            Trap::new("kitchen", "Kitchen", Position::new(20.0, 20.0)),
            Trap::new("bedroom", "Bedroom", Position::new(70.0, 70.0)),
        ])
        .unwrap();
        let relay = DetectorRelay::new(Arc::new(transport), EndpointPlan::default());
        Arc::new(DashboardSession::new(
            Arc::new(registry),
            TransitionScheme::Binary,
            reconcile,
            relay,
            Arc::new(DetectionStatusSlot::new("kitchen")),
        ))
    }

    fn sighting() -> AttemptOutcome {
        AttemptOutcome::Answered {
            status: 200,
            body: json!({"status": "success", "result": "MOUSE/RAT DETECTED", "detected": true}),
        }
    }

    #[tokio::test]
    async fn test_trigger_reports_in_flight_until_resolved() {
        let gate = Arc::new(Notify::new());
        let session = session_with(
            MockTransport::new().respond(5001, sighting()).gated(gate.clone()),
            ReconcilePolicy::Off,
        );

        let handle = session.trigger_detection(TriggerSource::Keypress).unwrap();
        assert!(session.trigger().in_flight());
        assert!(session.trigger().result().is_none());
        assert_eq!(
            session.trigger_detection(TriggerSource::Keypress).unwrap_err(),
            TriggerError::DetectionInFlight
        );

        gate.notify_one();
        let result = handle.await.unwrap();

        assert!(result.success);
        assert!(!session.trigger().in_flight());
        assert_eq!(session.trigger().result(), Some(result));
    }

    #[tokio::test]
    async fn test_trigger_failure_is_stored_not_raised() {
        let session = session_with(MockTransport::new(), ReconcilePolicy::Off);

        let result = session
            .trigger_detection(TriggerSource::Click)
            .unwrap()
            .await
            .unwrap();

        assert!(!result.success);
        assert!(result.message.unwrap().contains("any port"));
        assert!(!session.trigger().in_flight());
    }

    #[tokio::test]
    async fn test_detection_does_not_touch_traps_when_reconcile_off() {
        let session = session_with(MockTransport::new().respond(5001, sighting()), ReconcilePolicy::Off);

        session
            .trigger_detection(TriggerSource::Click)
            .unwrap()
            .await
            .unwrap();

        assert_eq!(session.store().get("kitchen").unwrap(), TrapStatus::Inactive);
    }

    #[tokio::test]
    async fn test_alert_room_reconciliation() {
        let session = session_with(
            MockTransport::new().respond(5001, sighting()),
            ReconcilePolicy::AlertRoom,
        );
        session.detection_status().update(DetectionStatusPatch {
            room: Some("bedroom".to_string()),
            ..DetectionStatusPatch::default()
        });

        session
            .trigger_detection(TriggerSource::Click)
            .unwrap()
            .await
            .unwrap();

        let store = session.store();
        assert_eq!(store.get("bedroom").unwrap(), TrapStatus::Active);
        assert_eq!(store.get("kitchen").unwrap(), TrapStatus::Inactive);
        assert!(store.selected().is_none());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_settled_trigger_implies_reconciled_traps() {
        let session = session_with(
            MockTransport::new().respond(5001, sighting()),
            ReconcilePolicy::AlertRoom,
        );

        let _handle = session.trigger_detection(TriggerSource::Click).unwrap();

        // Observe completion through the trigger only, not the join handle.
        while session.trigger().in_flight() {
            tokio::task::yield_now().await;
        }

        assert!(session.trigger().result().unwrap().success);
        assert_eq!(session.store().get("kitchen").unwrap(), TrapStatus::Active);
    }

    #[test]
    fn test_reconcile_ignores_unknown_room_and_misses() {
        let session = session_with(MockTransport::new(), ReconcilePolicy::AlertRoom);

        let miss = DetectionResult::success(Some("NO MOUSE/RAT".into()), Some(false), 5001);
        assert!(session.reconcile(&miss).is_none());

        session.detection_status().update(DetectionStatusPatch {
            room: Some("attic".to_string()),
            ..DetectionStatusPatch::default()
        });
        let hit = DetectionResult::success(None, Some(true), 5001);
        assert!(session.reconcile(&hit).is_none());
        assert_eq!(session.store().counts()[&TrapStatus::Inactive], 2);
    }
}
