//! Classification of single port attempts.
//!
//! Every request to the detection service ends in one [`AttemptOutcome`].
//! [`decide`] turns that outcome into the port-trial step, independent of
//! any networking, so the policy can be tested with scripted outcomes.

use serde_json::Value;

use crate::error::RelayError;

/// What one request to one port produced.
#[derive(Debug, Clone, PartialEq)]
pub enum AttemptOutcome {
    /// Nothing is listening on the port.
    Refused(String),
    /// The request exceeded its time bound.
    TimedOut,
    /// Any other failure before a response body was read.
    FetchFailed(String),
    /// The service answered with an empty body.
    Empty {
        /// HTTP status code.
        status: u16,
    },
    /// The service answered with a body that is not JSON.
    Unparseable {
        /// HTTP status code.
        status: u16,
        /// Raw body as received.
        body: String,
    },
    /// The service answered with JSON.
    Answered {
        /// HTTP status code.
        status: u16,
        /// Decoded body.
        body: Value,
    },
}

impl AttemptOutcome {
    /// Classifies a received response body.
    pub fn from_body(status: u16, raw: &str) -> Self {
        if raw.trim().is_empty() {
            return Self::Empty { status };
        }
        match serde_json::from_str::<Value>(raw) {
            Ok(body) => Self::Answered { status, body },
            Err(_) => Self::Unparseable {
                status,
                body: raw.to_string(),
            },
        }
    }

    /// Whether the service was reached at all.
    pub fn reached_service(&self) -> bool {
        matches!(
            self,
            Self::Empty { .. } | Self::Unparseable { .. } | Self::Answered { .. }
        )
    }

    /// Converts a failed attempt into the matching error.
    ///
    /// Returns `None` for [`AttemptOutcome::Answered`].
    pub fn to_error(&self, port: u16, timeout_ms: u64, snippet_len: usize) -> Option<RelayError> {
        match self {
            Self::Answered { .. } => None,
            Self::TimedOut => Some(RelayError::Timeout { port, timeout_ms }),
            Self::Refused(reason) | Self::FetchFailed(reason) => Some(RelayError::Connection {
                port,
                reason: reason.clone(),
            }),
            Self::Empty { status } => Some(RelayError::MalformedResponse {
                port,
                http_status: *status,
                snippet: String::new(),
            }),
            Self::Unparseable { status, body } => Some(RelayError::MalformedResponse {
                port,
                http_status: *status,
                snippet: snippet(body, snippet_len),
            }),
        }
    }

    /// Short label for logs and attempt summaries.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Refused(_) => "refused",
            Self::TimedOut => "timeout",
            Self::FetchFailed(_) => "fetch_failed",
            Self::Empty { .. } => "empty",
            Self::Unparseable { .. } => "unparseable",
            Self::Answered { .. } => "answered",
        }
    }
}

/// Next step of the port trial.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortDecision {
    /// Move on to the next candidate port.
    TryNext,
    /// Stop; this answer is final even if it reports an upstream error.
    Terminate,
}

/// Decides whether the port trial continues after `outcome`.
pub fn decide(outcome: &AttemptOutcome) -> PortDecision {
    match outcome {
        AttemptOutcome::Answered { .. } => PortDecision::Terminate,
        AttemptOutcome::Refused(_)
        | AttemptOutcome::TimedOut
        | AttemptOutcome::FetchFailed(_)
        | AttemptOutcome::Empty { .. }
        | AttemptOutcome::Unparseable { .. } => PortDecision::TryNext,
    }
}

/// Truncates `raw` to at most `max_chars` characters, marking the cut.
pub fn snippet(raw: &str, max_chars: usize) -> String {
    let trimmed = raw.trim();
    if trimmed.chars().count() <= max_chars {
        return trimmed.to_string();
    }
    let mut out: String = trimmed.chars().take(max_chars).collect();
    out.push_str("...");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_reached_service() {
        assert!(!AttemptOutcome::Refused("refused".into()).reached_service());
        assert!(!AttemptOutcome::TimedOut.reached_service());
        assert!(!AttemptOutcome::FetchFailed("reset".into()).reached_service());
        assert!(AttemptOutcome::Empty { status: 200 }.reached_service());
        assert!(AttemptOutcome::from_body(200, "<html>").reached_service());
    }

    #[test]
    fn test_from_body_classification() {
        assert_eq!(
            AttemptOutcome::from_body(200, "  \n"),
            AttemptOutcome::Empty { status: 200 }
        );
        assert_eq!(
            AttemptOutcome::from_body(200, "<html>AirPlay</html>"),
            AttemptOutcome::Unparseable {
                status: 200,
                body: "<html>AirPlay</html>".to_string()
            }
        );
        assert_eq!(
            AttemptOutcome::from_body(500, r#"{"status":"error","error":"camera"}"#),
            AttemptOutcome::Answered {
                status: 500,
                body: json!({"status": "error", "error": "camera"})
            }
        );
    }

    #[test]
    fn test_only_answers_terminate() {
        let continuing = [
            AttemptOutcome::Refused("connection refused".into()),
            AttemptOutcome::TimedOut,
            AttemptOutcome::FetchFailed("reset".into()),
            AttemptOutcome::Empty { status: 200 },
            AttemptOutcome::Unparseable {
                status: 403,
                body: "Forbidden".into(),
            },
        ];
        for outcome in &continuing {
            assert_eq!(decide(outcome), PortDecision::TryNext, "{outcome:?}");
        }

        let upstream_error = AttemptOutcome::Answered {
            status: 500,
            body: json!({"status": "error"}),
        };
        assert_eq!(decide(&upstream_error), PortDecision::Terminate);
    }

    #[test]
    fn test_snippet_truncates_on_char_boundary() {
        assert_eq!(snippet("short", 10), "short");
        assert_eq!(snippet("ééééé", 3), "ééé...");
    }

    #[test]
    fn test_to_error_quotes_snippet() {
        let outcome = AttemptOutcome::Unparseable {
            status: 200,
            body: "x".repeat(500),
        };
        match outcome.to_error(5000, 30_000, 200) {
            Some(RelayError::MalformedResponse { snippet, port, .. }) => {
                assert_eq!(port, 5000);
                assert_eq!(snippet.len(), 203);
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(AttemptOutcome::Answered {
            status: 200,
            body: json!({})
        }
        .to_error(5000, 30_000, 200)
        .is_none());
    }
}
