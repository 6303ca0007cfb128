use axum::http::StatusCode;
use thiserror::Error;
use uuid::Uuid;

use crate::error::{ErrorMessage, HttpError};

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("Property {0} not found")]
    PropertyNotFound(Uuid),

    #[error("Agent profile not found for user {0}")]
    AgentProfileNotFound(Uuid),

    #[error("User {0} is not allowed to modify this {1}")]
    NotOwner(Uuid, &'static str),

    #[error("{field}: {message}")]
    Validation { field: &'static str, message: String },

    #[error("Could not assign a unique slug for \"{0}\"")]
    SlugExhausted(String),

    #[error("File storage error: {0}")]
    Storage(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl ServiceError {
    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        ServiceError::Validation {
            field,
            message: message.into(),
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ServiceError::NotFound(_)
            | ServiceError::PropertyNotFound(_)
            | ServiceError::AgentProfileNotFound(_) => StatusCode::NOT_FOUND,

            ServiceError::NotOwner(_, _) => StatusCode::FORBIDDEN,

            ServiceError::Validation { .. } | ServiceError::SlugExhausted(_) => {
                StatusCode::BAD_REQUEST
            }

            ServiceError::Storage(_) | ServiceError::Database(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl From<ServiceError> for HttpError {
    fn from(error: ServiceError) -> Self {
        match error {
            ServiceError::NotFound(_)
            | ServiceError::PropertyNotFound(_)
            | ServiceError::AgentProfileNotFound(_) => HttpError::not_found(error.to_string()),

            ServiceError::NotOwner(_, _) => {
                HttpError::forbidden(ErrorMessage::PermissionDenied.to_string())
            }

            ServiceError::Validation { field, message } => HttpError::field(field, message),

            ServiceError::SlugExhausted(_) => HttpError::field("slug", error.to_string()),

            ServiceError::Database(err) => HttpError::from_db(err),

            ServiceError::Storage(_) => {
                tracing::error!("{}", error);
                HttpError::server_error(ErrorMessage::ServerError.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ownership_failures_are_forbidden_not_not_found() {
        let err = ServiceError::NotOwner(Uuid::new_v4(), "property");
        assert_eq!(err.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(HttpError::from(err).status, StatusCode::FORBIDDEN);
    }

    #[test]
    fn validation_keeps_the_field() {
        let http: HttpError = ServiceError::validation("area_id", "Unknown area").into();
        assert_eq!(http.status, StatusCode::BAD_REQUEST);
        assert_eq!(http.errors.unwrap()["area_id"][0], "Unknown area");
    }

    #[test]
    fn slug_exhaustion_is_a_slug_field_error() {
        let http: HttpError = ServiceError::SlugExhausted("villa-bastos".to_string()).into();
        assert_eq!(http.status, StatusCode::BAD_REQUEST);
        assert!(http.errors.unwrap().get("slug").is_some());
    }
}
