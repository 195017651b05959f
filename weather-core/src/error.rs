use thiserror::Error;

/// Why a gateway call produced no data.
///
/// Payloads are plain strings so the error can be cloned into
/// [`CoordinatorState`](crate::coordinator::CoordinatorState) snapshots.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// The request never produced a response (DNS, TLS, connection reset...).
    #[error("network error: {0}")]
    Network(String),

    /// The provider answered with a non-2xx status.
    #[error("weather provider returned status {status}: {body}")]
    Status { status: u16, body: String },

    /// The body could not be read or did not match the expected JSON shape.
    #[error("could not decode weather provider response: {0}")]
    Decode(String),
}

impl FetchError {
    pub fn network(err: impl std::fmt::Display) -> Self {
        Self::Network(err.to_string())
    }

    pub fn status(status: u16, body: &str) -> Self {
        Self::Status { status, body: truncate_body(body) }
    }

    pub fn decode(err: impl std::fmt::Display) -> Self {
        Self::Decode(err.to_string())
    }

    /// Short message suitable for showing to an end user.
    pub fn user_message(&self) -> String {
        match self {
            FetchError::Network(_) => {
                "Unable to reach the weather service. Check your internet connection.".to_string()
            }
            FetchError::Status { status: 400, .. } => "No matching location found.".to_string(),
            FetchError::Status { status: 401 | 403, .. } => {
                "The weather service rejected the API key. Run `weather configure`.".to_string()
            }
            FetchError::Status { status, .. } => {
                format!("The weather service failed with status {status}.")
            }
            FetchError::Decode(_) => "The weather service sent an unexpected response.".to_string(),
        }
    }
}

pub(crate) fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    if body.len() <= MAX {
        return body.to_string();
    }
    let mut end = MAX;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &body[..end])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_error_truncates_long_bodies() {
        let body = "x".repeat(500);
        let FetchError::Status { status, body } = FetchError::status(502, &body) else {
            panic!("expected status error");
        };
        assert_eq!(status, 502);
        assert_eq!(body.len(), 203);
        assert!(body.ends_with("..."));
    }

    #[test]
    fn truncation_respects_char_boundaries() {
        let body = "é".repeat(150);
        let truncated = truncate_body(&body);
        assert!(truncated.ends_with("..."));
        assert!(truncated.len() <= 203);
    }

    #[test]
    fn user_messages_by_kind() {
        assert!(FetchError::network("reset").user_message().contains("internet connection"));
        assert!(FetchError::status(401, "").user_message().contains("weather configure"));
        assert!(FetchError::status(400, "").user_message().contains("No matching location"));
        assert!(FetchError::status(503, "").user_message().contains("503"));
        assert!(FetchError::decode("eof").user_message().contains("unexpected response"));
    }

    #[test]
    fn display_includes_status_and_body() {
        let err = FetchError::status(404, "not here");
        assert_eq!(err.to_string(), "weather provider returned status 404: not here");
    }
}
