//! API error type and its HTTP response conversion.

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

use flowrelay_core::{DispatchError, MapError};

/// Errors returned by API handlers.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("invalid request: {message}")]
    BadRequest { message: String },

    #[error("unsupported mapping type: {0}")]
    UnsupportedMapping(String),

    #[error("no valid records to dispatch")]
    EmptyInput,

    #[error("dispatch interrupted: {message}")]
    Unavailable { message: String },

    #[error("ERP endpoint is not configured")]
    NotConfigured,
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest {
            message: message.into(),
        }
    }

    fn parts(&self) -> (StatusCode, &'static str) {
        match self {
            Self::BadRequest { .. } => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            Self::UnsupportedMapping(_) => (StatusCode::BAD_REQUEST, "UNSUPPORTED_MAPPING"),
            Self::EmptyInput => (StatusCode::BAD_REQUEST, "EMPTY_INPUT"),
            Self::Unavailable { .. } => (StatusCode::SERVICE_UNAVAILABLE, "UNAVAILABLE"),
            Self::NotConfigured => (StatusCode::SERVICE_UNAVAILABLE, "NOT_CONFIGURED"),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = self.parts();
        let body = json!({
            "success": false,
            "error": {
                "code": code,
                "message": self.to_string(),
            }
        });
        (status, Json(body)).into_response()
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::bad_request(rejection.body_text())
    }
}

impl From<MapError> for ApiError {
    fn from(err: MapError) -> Self {
        match err {
            MapError::UnsupportedMappingKind(name) => Self::UnsupportedMapping(name),
        }
    }
}

impl From<DispatchError> for ApiError {
    fn from(err: DispatchError) -> Self {
        match err {
            DispatchError::EmptyInput => Self::EmptyInput,
            DispatchError::InvalidOptions(message) => Self::BadRequest { message },
            cancelled @ DispatchError::Cancelled { .. } => Self::Unavailable {
                message: cancelled.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping() {
        assert_eq!(ApiError::from(DispatchError::EmptyInput).parts().0, StatusCode::BAD_REQUEST);
        assert_eq!(
            ApiError::from(DispatchError::Cancelled { completed: 2 }).parts().0,
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            ApiError::from(MapError::UnsupportedMappingKind("x".into())).parts().1,
            "UNSUPPORTED_MAPPING"
        );
    }
}
