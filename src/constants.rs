//! Application-wide constants.
//!
//! This module defines constants used throughout the application,
//! including the application name and the detection service defaults.

/// The display name of the application (human-readable, with proper capitalization).
pub const APP_NAME: &str = "TrapWatch";

/// Directory name used under the platform config directory.
pub const CONFIG_DIR_NAME: &str = "TrapWatch";

/// Host the detection service listens on.
pub const DEFAULT_DETECTOR_HOST: &str = "127.0.0.1";

/// Ports the detection service may be bound to, in trial order.
///
/// 5000 is frequently taken by the macOS AirPlay receiver, so the service
/// prefers 5001 and falls back through the rest.
pub const DEFAULT_CANDIDATE_PORTS: [u16; 4] = [5001, 5000, 5002, 8000];

/// Upper bound on a liveness check, in milliseconds.
pub const DEFAULT_HEALTH_TIMEOUT_MS: u64 = 5_000;

/// Upper bound on a single detect attempt, in milliseconds.
pub const DEFAULT_DETECT_TIMEOUT_MS: u64 = 30_000;

/// Maximum number of characters of a raw body quoted in diagnostics.
pub const DEFAULT_SNIPPET_LEN: usize = 200;

/// Room reported by the detection status slot until something is posted.
pub const DEFAULT_DETECTION_ROOM: &str = "kitchen";

/// Message shown when the detection service refuses the liveness check.
pub const SERVICE_NOT_RUNNING_MESSAGE: &str =
    "Detection service is not running. Start it with: python mouse_detector.py --background";
