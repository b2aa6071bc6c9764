//! Shared test fixtures for web API and relay tests.
#![allow(dead_code)] // Not every test binary uses every fixture

use std::sync::Arc;

use serde_json::{json, Value};
use tokio::net::TcpListener;

use trapwatch::config::{Config, ReconcilePolicy, TrapConfig};
use trapwatch::models::TransitionScheme;
use trapwatch::relay::{AttemptOutcome, DetectorRelay, EndpointPlan, MockTransport};
use trapwatch::web::AppState;

/// Two-room configuration used by the kitchen/bedroom scenarios.
pub fn two_room_config(scheme: TransitionScheme) -> Config {
    let mut config = Config::new();
    config.dashboard.transition_scheme = scheme;
    config.traps = vec![
        TrapConfig {
            id: "kitchen".to_string(),
            display_name: "Kitchen".to_string(),
            x: 25.0,
            y: 30.0,
        },
        TrapConfig {
            id: "bedroom".to_string(),
            display_name: "Bedroom".to_string(),
            x: 70.0,
            y: 70.0,
        },
    ];
    config
}

/// Builds app state whose relay replays `transport`.
pub fn mock_state(config: &Config, transport: MockTransport) -> (AppState, Arc<MockTransport>) {
    let transport = Arc::new(transport);
    let relay = DetectorRelay::new(transport.clone(), EndpointPlan::from_config(&config.detector));
    let state = AppState::with_relay(config, relay).expect("Failed to create app state");
    (state, transport)
}

/// Binary-scheme state with every detector port refusing.
pub fn offline_state() -> AppState {
    mock_state(&two_room_config(TransitionScheme::Binary), MockTransport::new()).0
}

/// Same as [`two_room_config`] with alert-room reconciliation enabled.
pub fn reconciling_config() -> Config {
    let mut config = two_room_config(TransitionScheme::Binary);
    config.dashboard.reconcile = ReconcilePolicy::AlertRoom;
    config
}

/// Body the detection service returns for a sighting.
pub fn sighting_body() -> Value {
    json!({"detected": true, "result": "MOUSE/RAT DETECTED", "status": "success"})
}

/// Scripted answer carrying [`sighting_body`].
pub fn sighting() -> AttemptOutcome {
    AttemptOutcome::Answered {
        status: 200,
        body: sighting_body(),
    }
}

/// Returns a local port with nothing listening on it.
pub async fn closed_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind probe listener");
    let port = listener.local_addr().expect("No local addr").port();
    drop(listener);
    port
}
