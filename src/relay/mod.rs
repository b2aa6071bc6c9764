//! Relay to the external detection service.
//!
//! The service is a separate local process whose port is not fixed, so the
//! relay walks an ordered list of candidate ports. All network failures are
//! caught here and turned into structured replies; nothing propagates to
//! the web layer as a fault.
//!
//! # Operations
//!
//! - [`DetectorRelay::check_health`] - `GET /health` on the primary port
//! - [`DetectorRelay::detect`] - `POST /detect`, port trial
//! - [`DetectorRelay::capture`] - `GET /capture`, port trial

pub mod decision;
pub mod transport;

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::DetectorConfig;
use crate::constants::SERVICE_NOT_RUNNING_MESSAGE;
use crate::error::RelayError;

pub use decision::{decide, AttemptOutcome, PortDecision};
pub use transport::{DetectorTransport, HttpTransport, MockTransport, Probe, ProbeMethod};

/// Candidate endpoints and their time bounds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointPlan {
    /// Ports to try, in order. The first one serves liveness checks.
    pub candidate_ports: Vec<u16>,
    /// Bound on a liveness check.
    pub health_timeout: Duration,
    /// Bound on each detect attempt.
    pub detect_timeout: Duration,
    /// Characters of raw body quoted in diagnostics.
    pub snippet_len: usize,
}

impl EndpointPlan {
    /// Builds the plan from the detector configuration.
    pub fn from_config(config: &DetectorConfig) -> Self {
        Self {
            candidate_ports: config.candidate_ports.clone(),
            health_timeout: config.health_timeout(),
            detect_timeout: config.detect_timeout(),
            snippet_len: config.snippet_len,
        }
    }

    /// Port used for liveness checks.
    pub fn primary_port(&self) -> u16 {
        self.candidate_ports.first().copied().unwrap_or_default()
    }
}

impl Default for EndpointPlan {
    fn default() -> Self {
        Self::from_config(&DetectorConfig::default())
    }
}

/// `ok` or `error` in a [`HealthReply`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthState {
    /// The service answered.
    Ok,
    /// The service did not answer usefully.
    Error,
}

/// Normalized liveness check result.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HealthReply {
    /// Overall state.
    pub status: HealthState,
    /// Whether the detection service is up.
    pub running: bool,
    /// Explanation when not running.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Payload returned by the service.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detector: Option<Value>,
    /// Camera state, when the service reports it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub camera_active: Option<bool>,
    /// Port that was checked.
    pub port: u16,
}

impl HealthReply {
    fn down(port: u16, message: String) -> Self {
        Self {
            status: HealthState::Error,
            running: false,
            message: Some(message),
            detector: None,
            camera_active: None,
            port,
        }
    }
}

/// Summary of one port attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PortAttempt {
    /// Port attempted.
    pub port: u16,
    /// Outcome label (`refused`, `timeout`, `answered`, ...).
    pub outcome: &'static str,
    /// Failure description, if the attempt failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// First usable answer of a port trial.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RelayAnswer {
    /// Port that answered.
    pub port: u16,
    /// HTTP status of the answer.
    pub http_status: u16,
    /// Decoded body, passed through untouched.
    pub body: Value,
    /// Every attempt made, including the final one.
    pub attempts: Vec<PortAttempt>,
}

/// Forwards liveness, detect and capture requests to the detection service.
#[derive(Clone)]
pub struct DetectorRelay {
    transport: Arc<dyn DetectorTransport>,
    plan: EndpointPlan,
}

impl DetectorRelay {
    /// Creates a relay over `transport`.
    pub fn new(transport: Arc<dyn DetectorTransport>, plan: EndpointPlan) -> Self {
        Self { transport, plan }
    }

    /// Creates an HTTP relay from configuration.
    pub fn from_config(config: &DetectorConfig) -> anyhow::Result<Self> {
        let transport = HttpTransport::new(config.host.clone())?;
        Ok(Self::new(Arc::new(transport), EndpointPlan::from_config(config)))
    }

    /// Endpoint plan in use.
    pub fn plan(&self) -> &EndpointPlan {
        &self.plan
    }

    /// Checks whether the detection service is up.
    ///
    /// Refusals, timeouts and fetch failures share one fixed message; an
    /// empty or non-JSON body yields a diagnostic with a body snippet.
    pub async fn check_health(&self) -> HealthReply {
        let port = self.plan.primary_port();
        let probe = Probe {
            method: ProbeMethod::Get,
            path: "/health",
            port,
            timeout: self.plan.health_timeout,
        };

        let outcome = self.transport.fetch(&probe).await;
        debug!(port, outcome = outcome.label(), "detector health check");

        match outcome {
            AttemptOutcome::Answered { body, .. } => HealthReply {
                status: HealthState::Ok,
                running: true,
                message: None,
                camera_active: body.get("camera").and_then(Value::as_bool),
                detector: Some(body),
                port,
            },
            unreached if !unreached.reached_service() => {
                HealthReply::down(port, SERVICE_NOT_RUNNING_MESSAGE.to_string())
            }
            malformed => {
                let detail = malformed
                    .to_error(port, duration_ms(self.plan.health_timeout), self.plan.snippet_len)
                    .map(|e| e.to_string())
                    .unwrap_or_default();
                HealthReply::down(
                    port,
                    format!("Detection service answered but is not healthy: {detail}"),
                )
            }
        }
    }

    /// Asks the detection service to run one detection.
    ///
    /// Each candidate port gets its own attempt bounded by the detect
    /// timeout. The first JSON answer is returned as-is, even when it
    /// reports an upstream error.
    pub async fn detect(&self) -> Result<RelayAnswer, RelayError> {
        self.first_answer(ProbeMethod::Post, "/detect", self.plan.detect_timeout)
            .await
    }

    /// Fetches a camera frame (`{image, status}`) from the detection service.
    pub async fn capture(&self) -> Result<RelayAnswer, RelayError> {
        self.first_answer(ProbeMethod::Get, "/capture", self.plan.health_timeout)
            .await
    }

    async fn first_answer(
        &self,
        method: ProbeMethod,
        path: &'static str,
        timeout: Duration,
    ) -> Result<RelayAnswer, RelayError> {
        let timeout_ms = duration_ms(timeout);
        let mut attempts = Vec::with_capacity(self.plan.candidate_ports.len());
        let mut last_error = None;

        for &port in &self.plan.candidate_ports {
            let probe = Probe {
                method,
                path,
                port,
                timeout,
            };
            let outcome = self.transport.fetch(&probe).await;
            let error = outcome.to_error(port, timeout_ms, self.plan.snippet_len);
            debug!(port, path, outcome = outcome.label(), "detector attempt");

            attempts.push(PortAttempt {
                port,
                outcome: outcome.label(),
                error: error.as_ref().map(ToString::to_string),
            });

            match (decide(&outcome), outcome) {
                (PortDecision::Terminate, AttemptOutcome::Answered { status, body }) => {
                    return Ok(RelayAnswer {
                        port,
                        http_status: status,
                        body,
                        attempts,
                    });
                }
                _ => last_error = error.map(|e| e.to_string()),
            }
        }

        let err = RelayError::ServiceUnreachable {
            ports: self.plan.candidate_ports.clone(),
            last_error,
        };
        warn!(path, "{err}");
        Err(err)
    }
}

fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
