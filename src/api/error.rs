use crate::utils::error::CleanError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

/// JSON error body `{"detail": "..."}` with a status code.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiError {
    pub status: StatusCode,
    pub detail: String,
}

impl ApiError {
    pub fn new(status: StatusCode, detail: impl Into<String>) -> Self {
        Self {
            status,
            detail: detail.into(),
        }
    }

    pub fn bad_request(detail: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, detail)
    }

    pub fn not_found() -> Self {
        Self::new(StatusCode::NOT_FOUND, "Token expired or not found")
    }

    pub fn unsupported_file() -> Self {
        Self::bad_request("Only CSV or XLSX allowed")
    }

    pub fn too_large(max_bytes: usize) -> Self {
        Self::new(
            StatusCode::PAYLOAD_TOO_LARGE,
            format!("File too large (max {}MB)", max_bytes / (1024 * 1024)),
        )
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            tracing::error!(status = %self.status, detail = %self.detail, "Request failed");
        } else {
            tracing::warn!(status = %self.status, detail = %self.detail, "Request rejected");
        }
        (self.status, Json(json!({ "detail": self.detail }))).into_response()
    }
}

impl From<CleanError> for ApiError {
    fn from(e: CleanError) -> Self {
        match e {
            CleanError::UnsupportedFile { .. } => Self::unsupported_file(),
            CleanError::EmptyInput => Self::bad_request(e.to_string()),
            CleanError::PayloadTooLarge { max, .. } => Self::too_large(max),
            CleanError::ArtifactNotFound { .. } => Self::not_found(),
            CleanError::CsvError(_) | CleanError::WorkbookReadError(_) => {
                Self::bad_request(format!("Failed to read file: {}", e))
            }
            CleanError::InvalidConfigValueError { .. } | CleanError::MissingConfigError { .. } => {
                Self::bad_request(e.to_string())
            }
            CleanError::WorkbookWriteError(_) | CleanError::IoError(_) => Self::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to write cleaned file: {}", e),
            ),
            other => Self::new(StatusCode::INTERNAL_SERVER_ERROR, other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_mapping() {
        assert_eq!(
            ApiError::from(CleanError::ArtifactNotFound {
                token: "x".to_string()
            }),
            ApiError::not_found()
        );
        assert_eq!(
            ApiError::from(CleanError::UnsupportedFile {
                file_name: "a.pdf".to_string()
            })
            .detail,
            "Only CSV or XLSX allowed"
        );
        assert_eq!(
            ApiError::from(CleanError::PayloadTooLarge {
                size: 60 * 1024 * 1024,
                max: 50 * 1024 * 1024
            }),
            ApiError::new(StatusCode::PAYLOAD_TOO_LARGE, "File too large (max 50MB)")
        );
        assert_eq!(
            ApiError::from(CleanError::processing("boom")).status,
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
