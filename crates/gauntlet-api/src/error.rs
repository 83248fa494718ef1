//! Gauntlet API error types.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use gauntlet_core::error::DomainError;
use serde::Serialize;
use thiserror::Error;

/// Startup errors for the API server.
#[derive(Debug, Error)]
pub enum AppError {
    /// A required environment variable is missing or invalid.
    #[error("configuration error: {0}")]
    Config(String),

    /// The boss table could not be loaded or a store failed at shutdown.
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// Network binding or I/O error.
    #[error("server error: {0}")]
    Server(#[from] std::io::Error),
}

/// JSON body returned for error responses.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    /// Machine-readable error code.
    pub error: &'static str,
    /// Human-readable error message.
    pub message: String,
}

/// HTTP-layer wrapper around `DomainError` that implements `IntoResponse`.
#[derive(Debug)]
pub struct ApiError(pub DomainError);

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        Self(err)
    }
}

impl ApiError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match &self.0 {
            DomainError::InvalidDamage(_) => (StatusCode::BAD_REQUEST, "invalid_damage"),
            DomainError::InvalidEventDate(_) => (StatusCode::BAD_REQUEST, "invalid_event_date"),
            DomainError::Validation(_) => (StatusCode::BAD_REQUEST, "validation_error"),
            DomainError::NotAMember(_) => (StatusCode::FORBIDDEN, "not_a_member"),
            DomainError::UnknownEvent(_) => (StatusCode::NOT_FOUND, "unknown_event"),
            DomainError::NoActiveEvent => (StatusCode::CONFLICT, "no_active_event"),
            DomainError::DuplicateEvent(_) => (StatusCode::CONFLICT, "duplicate_event"),
            DomainError::StaleRound { .. } => (StatusCode::CONFLICT, "stale_round"),
            DomainError::OverkillRejected { .. } => {
                (StatusCode::UNPROCESSABLE_ENTITY, "overkill_rejected")
            }
            DomainError::Config(_) => (StatusCode::INTERNAL_SERVER_ERROR, "config_error"),
            DomainError::Infrastructure(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "infrastructure_error")
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code) = self.status_and_code();

        let body = ErrorBody {
            error: error_code,
            message: self.0.to_string(),
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use gauntlet_core::ids::{EventDate, MemberId};

    fn status_of(err: DomainError) -> StatusCode {
        let response = ApiError(err).into_response();
        response.status()
    }

    #[test]
    fn test_input_errors_map_to_400() {
        assert_eq!(
            status_of(DomainError::InvalidDamage("-1".into())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(DomainError::InvalidEventDate("2026-13-01".into())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(DomainError::Validation("bad input".into())),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn test_not_a_member_maps_to_403() {
        assert_eq!(
            status_of(DomainError::NotAMember(MemberId::new("stranger"))),
            StatusCode::FORBIDDEN
        );
    }

    #[test]
    fn test_unknown_event_maps_to_404() {
        let date = EventDate::parse("2026-03-25").unwrap();
        assert_eq!(status_of(DomainError::UnknownEvent(date)), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_state_conflicts_map_to_409() {
        let date = EventDate::parse("2026-03-25").unwrap();
        assert_eq!(status_of(DomainError::NoActiveEvent), StatusCode::CONFLICT);
        assert_eq!(status_of(DomainError::DuplicateEvent(date)), StatusCode::CONFLICT);
        assert_eq!(
            status_of(DomainError::StaleRound {
                declared: 2,
                current: 3,
            }),
            StatusCode::CONFLICT
        );
    }

    #[test]
    fn test_overkill_maps_to_422() {
        assert_eq!(
            status_of(DomainError::OverkillRejected {
                damage: 10,
                remaining: 5,
            }),
            StatusCode::UNPROCESSABLE_ENTITY
        );
    }

    #[test]
    fn test_faults_map_to_500() {
        assert_eq!(
            status_of(DomainError::Config("missing tier".into())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            status_of(DomainError::Infrastructure("db down".into())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
