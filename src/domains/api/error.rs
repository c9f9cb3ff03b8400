//! Failure taxonomy for authenticated Apple Music requests.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type for pipeline operations.
pub type ApiResult<T> = std::result::Result<T, ApiError>;

/// One record of an upstream `{ "errors": [...] }` body.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorDetail {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub detail: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub code: String,
}

/// Upstream error body.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ErrorResponse {
    #[serde(default)]
    pub errors: Vec<ErrorDetail>,
}

/// Errors surfaced by the request pipeline and credential lifecycle.
///
/// Rate limiting is not represented here: it is absorbed by the retry loop
/// and only escalates to [`ApiError::Api`] with status 429 once the retry
/// budget is spent.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Missing or invalid credentials/settings. Raised before any network call.
    #[error("{0}")]
    Configuration(String),

    /// Service or user credential rejected, or user credential missing.
    #[error("{0}")]
    Authentication(String),

    /// Any other non-success upstream status.
    #[error("{message}")]
    Api {
        status: u16,
        message: String,
        errors: Vec<ErrorDetail>,
    },

    /// The transport primitive could not complete the exchange.
    #[error("Request failed: {0}")]
    Transport(String),

    /// A success body could not be decoded into the expected type.
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl ApiError {
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    pub fn authentication(msg: impl Into<String>) -> Self {
        Self::Authentication(msg.into())
    }

    /// An upstream failure without a structured body.
    pub fn status(status: u16) -> Self {
        Self::Api {
            status,
            message: format!("HTTP {status}"),
            errors: Vec::new(),
        }
    }

    /// An upstream failure carrying the parsed detail list.
    ///
    /// The message is taken from the first record's `detail`.
    pub fn with_details(status: u16, errors: Vec<ErrorDetail>) -> Self {
        let message = errors
            .first()
            .map(|e| e.detail.clone())
            .filter(|d| !d.is_empty())
            .unwrap_or_else(|| format!("HTTP {status}"));
        Self::Api {
            status,
            message,
            errors,
        }
    }

    /// Upstream status code, if this is an [`ApiError::Api`].
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_authentication(&self) -> bool {
        matches!(self, Self::Authentication(_))
    }

    /// Render the error for a tool result.
    pub fn render(&self) -> String {
        match self {
            Self::Configuration(msg) => format!("Configuration Error: {msg}"),
            Self::Authentication(msg) => format!("Authentication Error: {msg}"),
            Self::Api {
                status,
                message,
                errors,
            } => {
                let mut out = format!("Apple Music API Error ({status}): {message}");
                if !errors.is_empty() {
                    out.push_str("\nDetails:");
                    for e in errors {
                        out.push_str(&format!("\n  - {}: {}", e.title, e.detail));
                    }
                }
                out
            }
            other => format!("Error: {other}"),
        }
    }
}

impl From<jsonwebtoken::errors::Error> for ApiError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        Self::Configuration(format!("Failed to sign developer token: {err}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detail(title: &str, detail: &str) -> ErrorDetail {
        ErrorDetail {
            id: "1".into(),
            title: title.into(),
            detail: detail.into(),
            status: "404".into(),
            code: "X".into(),
        }
    }

    #[test]
    fn test_with_details_uses_first_detail_as_message() {
        let err = ApiError::with_details(404, vec![detail("T", "D"), detail("T2", "D2")]);
        assert_eq!(err.status_code(), Some(404));
        assert_eq!(err.to_string(), "D");
    }

    #[test]
    fn test_with_details_falls_back_to_status() {
        let err = ApiError::with_details(500, vec![detail("T", "")]);
        assert_eq!(err.to_string(), "HTTP 500");
    }

    #[test]
    fn test_render_api_error_lists_details() {
        let err = ApiError::with_details(404, vec![detail("Not Found", "No such playlist")]);
        let rendered = err.render();
        assert!(rendered.starts_with("Apple Music API Error (404): No such playlist"));
        assert!(rendered.contains("  - Not Found: No such playlist"));
    }

    #[test]
    fn test_render_authentication() {
        let err = ApiError::authentication("token expired");
        assert_eq!(err.render(), "Authentication Error: token expired");
        assert!(err.is_authentication());
        assert_eq!(err.status_code(), None);
    }

    #[test]
    fn test_error_response_tolerates_missing_fields() {
        let body: ErrorResponse =
            serde_json::from_str(r#"{"errors":[{"title":"T","status":"400"}]}"#).unwrap();
        assert_eq!(body.errors.len(), 1);
        assert_eq!(body.errors[0].detail, "");
    }
}
