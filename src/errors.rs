// src/errors.rs
use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TryOnError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Throttling persisted through every retry attempt.
    #[error("Rate limit exceeded. Please try again later.")]
    RateLimitExceeded { cause: String },

    #[error("Generation service error: {0}")]
    Upstream(String),

    #[error("Image processing error: {0}")]
    ImageProcessing(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Session not found: {0}")]
    SessionNotFound(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// How a failure is presented to the person using the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UserFacingKind {
    Configuration,
    Throttling,
    Quota,
    Generic,
}

impl TryOnError {
    pub fn user_facing_kind(&self) -> UserFacingKind {
        match self {
            TryOnError::Configuration(_) => UserFacingKind::Configuration,
            TryOnError::RateLimitExceeded { cause } => {
                if cause.to_lowercase().contains("quota") {
                    UserFacingKind::Quota
                } else {
                    UserFacingKind::Throttling
                }
            }
            _ => UserFacingKind::Generic,
        }
    }

    fn user_message(&self) -> String {
        match self.user_facing_kind() {
            UserFacingKind::Throttling => {
                "Rate limit exceeded. Please wait a moment and try again.".to_string()
            }
            UserFacingKind::Quota => "API quota exceeded. Please check your API plan.".to_string(),
            UserFacingKind::Configuration | UserFacingKind::Generic => self.to_string(),
        }
    }
}

impl ResponseError for TryOnError {
    fn status_code(&self) -> StatusCode {
        match self {
            TryOnError::Configuration(_) | TryOnError::Serialization(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            TryOnError::RateLimitExceeded { .. } => StatusCode::TOO_MANY_REQUESTS,
            TryOnError::Upstream(_) => StatusCode::SERVICE_UNAVAILABLE,
            TryOnError::ImageProcessing(_) | TryOnError::Validation(_) => StatusCode::BAD_REQUEST,
            TryOnError::SessionNotFound(_) | TryOnError::NotFound(_) => StatusCode::NOT_FOUND,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let label = match self {
            TryOnError::Configuration(_) => "Configuration error",
            TryOnError::RateLimitExceeded { .. } => "Rate limited",
            TryOnError::Upstream(_) => "AI service error",
            TryOnError::ImageProcessing(_) => "Image processing error",
            TryOnError::Validation(_) => "Validation error",
            TryOnError::SessionNotFound(_) => "Session not found",
            TryOnError::NotFound(_) => "Not found",
            TryOnError::Serialization(_) => "Data processing error",
        };

        HttpResponse::build(self.status_code()).json(serde_json::json!({
            "error": label,
            "kind": self.user_facing_kind(),
            "message": self.user_message()
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quota_cause_is_reported_as_quota() {
        let err = TryOnError::RateLimitExceeded {
            cause: "Generation service error: Gemini error 429: check your Quota".to_string(),
        };
        assert_eq!(err.user_facing_kind(), UserFacingKind::Quota);
        assert_eq!(err.status_code(), StatusCode::TOO_MANY_REQUESTS);
    }

    #[test]
    fn plain_rate_limit_is_throttling() {
        let err = TryOnError::RateLimitExceeded {
            cause: "429 Too Many Requests".to_string(),
        };
        assert_eq!(err.user_facing_kind(), UserFacingKind::Throttling);
        assert!(err.user_message().contains("wait a moment"));
    }

    #[test]
    fn other_errors_are_generic() {
        assert_eq!(
            TryOnError::Upstream("connection reset".into()).user_facing_kind(),
            UserFacingKind::Generic
        );
        assert_eq!(
            TryOnError::Configuration("missing".into()).user_facing_kind(),
            UserFacingKind::Configuration
        );
        assert_eq!(
            TryOnError::SessionNotFound("abc".into()).status_code(),
            StatusCode::NOT_FOUND
        );
    }
}
