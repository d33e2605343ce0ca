/// Unified error types for the Relay system.
use thiserror::Error;

/// Errors raised while fetching, unpacking and scanning an archive bundle.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("{0}")]
    Validation(String),

    #[error("Failed to fetch bundle: {message}")]
    Fetch {
        status: Option<u16>,
        message: String,
    },

    #[error("Failed to unpack bundle: {0}")]
    Unpack(String),

    #[error("No .webm files found in archive")]
    NotFound,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ExtractError {
    /// HTTP status the request boundary should answer with.
    pub fn status_code(&self) -> u16 {
        match self {
            ExtractError::Validation(_) => 400,
            ExtractError::NotFound => 404,
            ExtractError::Fetch { .. } | ExtractError::Unpack(_) | ExtractError::Io(_) => 500,
        }
    }
}

impl From<walkdir::Error> for ExtractError {
    fn from(err: walkdir::Error) -> Self {
        ExtractError::Io(err.into())
    }
}

/// Errors returned by the upstream video platform REST API.
#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("[{status}] {message}")]
    Http { status: u16, message: String },

    #[error("Request failed: {0}")]
    Transport(String),

    #[error("Unexpected response: {0}")]
    Decode(String),

    #[error("Failed to sign request: {0}")]
    Auth(String),
}

impl UpstreamError {
    /// Upstream HTTP status, when the platform answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            UpstreamError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Human-readable detail without the status prefix.
    pub fn detail(&self) -> String {
        match self {
            UpstreamError::Http { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }

    /// Build from a non-success response body, preferring the platform's `message` field.
    pub fn from_response(status: u16, body: &str) -> Self {
        let message = serde_json::from_str::<serde_json::Value>(body)
            .ok()
            .and_then(|v| v.get("message").and_then(|m| m.as_str()).map(String::from))
            .unwrap_or_else(|| {
                if body.trim().is_empty() {
                    format!("HTTP {}", status)
                } else {
                    body.trim().to_string()
                }
            });
        UpstreamError::Http { status, message }
    }
}

impl From<reqwest::Error> for UpstreamError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            UpstreamError::Decode(err.to_string())
        } else {
            UpstreamError::Transport(err.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_status_codes() {
        assert_eq!(ExtractError::Validation("Archive URL is required".into()).status_code(), 400);
        assert_eq!(ExtractError::NotFound.status_code(), 404);
        assert_eq!(ExtractError::Unpack("bad header".into()).status_code(), 500);
        assert_eq!(
            ExtractError::Fetch { status: Some(403), message: "forbidden".into() }.status_code(),
            500
        );
    }

    #[test]
    fn test_upstream_message_from_json_body() {
        let err = UpstreamError::from_response(404, r#"{"code":404,"message":"Render not found"}"#);
        assert!(err.is_not_found());
        assert_eq!(err.to_string(), "[404] Render not found");
        assert_eq!(err.detail(), "Render not found");
    }

    #[test]
    fn test_upstream_message_from_plain_body() {
        let err = UpstreamError::from_response(502, "");
        assert_eq!(err.status(), Some(502));
        assert_eq!(err.to_string(), "[502] HTTP 502");
    }
}
