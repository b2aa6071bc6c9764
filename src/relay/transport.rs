//! Transports that carry relay requests to the detection service.
//!
//! [`HttpTransport`] talks to the real service with `reqwest`;
//! [`MockTransport`] replays scripted outcomes per port for tests.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use tokio::sync::Notify;

use crate::relay::decision::AttemptOutcome;

/// HTTP method of a probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeMethod {
    /// `GET`, no body.
    Get,
    /// `POST` with a JSON content type and an empty body.
    Post,
}

/// One request to one candidate port.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Probe {
    /// HTTP method.
    pub method: ProbeMethod,
    /// Request path, e.g. `/detect`.
    pub path: &'static str,
    /// Target port.
    pub port: u16,
    /// Bound on the whole request, body included.
    pub timeout: Duration,
}

/// Carries a probe to the detection service.
#[async_trait]
pub trait DetectorTransport: Send + Sync {
    /// Performs `probe` and classifies the result. Never fails; every
    /// failure is expressed as an [`AttemptOutcome`].
    async fn fetch(&self, probe: &Probe) -> AttemptOutcome;
}

/// Transport backed by a shared `reqwest` client.
pub struct HttpTransport {
    client: Client,
    host: String,
}

impl HttpTransport {
    /// Creates a transport targeting `host`.
    pub fn new(host: impl Into<String>) -> anyhow::Result<Self> {
        let client = Client::builder().build()?;
        Ok(Self {
            client,
            host: host.into(),
        })
    }

    fn url(&self, probe: &Probe) -> String {
        format!("http://{}:{}{}", self.host, probe.port, probe.path)
    }
}

fn classify_error(err: &reqwest::Error) -> AttemptOutcome {
    if err.is_timeout() {
        AttemptOutcome::TimedOut
    } else if err.is_connect() {
        AttemptOutcome::Refused(err.to_string())
    } else {
        AttemptOutcome::FetchFailed(err.to_string())
    }
}

#[async_trait]
impl DetectorTransport for HttpTransport {
    async fn fetch(&self, probe: &Probe) -> AttemptOutcome {
        let url = self.url(probe);
        let request = match probe.method {
            ProbeMethod::Get => self.client.get(&url),
            ProbeMethod::Post => self
                .client
                .post(&url)
                .header(CONTENT_TYPE, "application/json")
                .body(""),
        };

        let response = match request.timeout(probe.timeout).send().await {
            Ok(response) => response,
            Err(err) => return classify_error(&err),
        };

        let status = response.status().as_u16();
        match response.text().await {
            Ok(raw) => AttemptOutcome::from_body(status, &raw),
            Err(err) => classify_error(&err),
        }
    }
}

/// Scripted transport for tests.
///
/// Ports without a scripted outcome behave as if nothing listens on them.
/// Every probe is recorded, so tests can assert which ports were tried.
#[derive(Default)]
pub struct MockTransport {
    outcomes: HashMap<u16, AttemptOutcome>,
    calls: Mutex<Vec<Probe>>,
    gate: Option<Arc<Notify>>,
}

impl MockTransport {
    /// Creates a transport where every port refuses.
    pub fn new() -> Self {
        Self::default()
    }

    /// Scripts the outcome for `port`.
    #[must_use]
    pub fn respond(mut self, port: u16, outcome: AttemptOutcome) -> Self {
        self.outcomes.insert(port, outcome);
        self
    }

    /// Holds every probe until `gate` is notified once per probe.
    #[must_use]
    pub fn gated(mut self, gate: Arc<Notify>) -> Self {
        self.gate = Some(gate);
        self
    }

    /// Probes seen so far, in order.
    pub fn calls(&self) -> Vec<Probe> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    /// Ports probed so far, in order.
    pub fn ports_tried(&self) -> Vec<u16> {
        self.calls().iter().map(|p| p.port).collect()
    }
}

#[async_trait]
impl DetectorTransport for MockTransport {
    async fn fetch(&self, probe: &Probe) -> AttemptOutcome {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(probe.clone());
        }
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        self.outcomes.get(&probe.port).cloned().unwrap_or_else(|| {
            AttemptOutcome::Refused(format!("connection refused (port {})", probe.port))
        })
    }
}
