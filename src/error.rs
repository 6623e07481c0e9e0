//! Unified application error model and HTTP mapping.
//! Every stage of the retrieval pipeline fails fast with one of these
//! variants; the `IntoResponse` impl turns it into the terminal response.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    /// Missing or unparseable path segments.
    #[error("{0}")]
    MalformedRequest(String),
    /// Caller-supplied identifier failed the tagged-format check.
    #[error("Invalid attachment id")]
    InvalidIdentifier,
    /// Organization shortcode did not resolve.
    #[error("Invalid org")]
    InvalidOrg,
    /// Object absent or filename mismatch; the two are deliberately
    /// indistinguishable in the response.
    #[error("Attachment {0} not found")]
    NotFound(String),
    /// Private object requested without a principal.
    #[error("Unauthorized")]
    Unauthenticated,
    /// Principal present but not a member of the owning org.
    #[error("Unauthorized")]
    Unauthorized,
    /// Signing or fetch failure against the object store. The detail string
    /// is logged, never sent to the caller.
    #[error("upstream storage failure")]
    Upstream(String),
    #[error("internal server error")]
    Internal(String),
}

impl AppError {
    pub fn code_str(&self) -> &'static str {
        match self {
            AppError::MalformedRequest(_) => "malformed_request",
            AppError::InvalidIdentifier => "invalid_attachment_id",
            AppError::InvalidOrg => "invalid_org",
            AppError::NotFound(_) => "not_found",
            AppError::Unauthenticated => "unauthenticated",
            AppError::Unauthorized => "unauthorized",
            AppError::Upstream(_) => "upstream_error",
            AppError::Internal(_) => "internal_error",
        }
    }

    /// Map to HTTP status code.
    pub fn http_status(&self) -> StatusCode {
        match self {
            AppError::MalformedRequest(_) => StatusCode::BAD_REQUEST,
            AppError::InvalidIdentifier => StatusCode::BAD_REQUEST,
            AppError::InvalidOrg => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Unauthenticated => StatusCode::UNAUTHORIZED,
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::Upstream(_) => StatusCode::BAD_GATEWAY,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match &self {
            AppError::Upstream(detail) | AppError::Internal(detail) => {
                tracing::error!(code = self.code_str(), detail = %detail, "request failed");
            }
            other => {
                tracing::debug!(code = other.code_str(), "request denied");
            }
        }
        (self.http_status(), self.to_string()).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_status_mapping() {
        assert_eq!(
            AppError::MalformedRequest("Missing required parameters".into()).http_status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(AppError::InvalidIdentifier.http_status(), StatusCode::BAD_REQUEST);
        assert_eq!(AppError::InvalidOrg.http_status(), StatusCode::BAD_REQUEST);
        assert_eq!(AppError::NotFound("a.pdf".into()).http_status(), StatusCode::NOT_FOUND);
        assert_eq!(AppError::Unauthenticated.http_status(), StatusCode::UNAUTHORIZED);
        assert_eq!(AppError::Unauthorized.http_status(), StatusCode::UNAUTHORIZED);
        assert_eq!(AppError::Upstream("boom".into()).http_status(), StatusCode::BAD_GATEWAY);
        assert_eq!(AppError::Internal("x".into()).http_status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn not_found_body_echoes_requested_filename_only() {
        let e = AppError::NotFound("invoice.pdf".into());
        assert_eq!(e.to_string(), "Attachment invoice.pdf not found");
    }

    #[test]
    fn upstream_detail_never_reaches_the_body() {
        let e = AppError::Upstream("https://signed.example/secret?X-Amz-Signature=abc".into());
        assert_eq!(e.to_string(), "upstream storage failure");
    }

    #[test]
    fn anonymous_and_non_member_share_a_body() {
        assert_eq!(AppError::Unauthenticated.to_string(), AppError::Unauthorized.to_string());
    }
}
