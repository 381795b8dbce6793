use thiserror::Error;
use uuid::Uuid;

use shared_models::error::AppError;

use crate::models::RequestStatus;

#[derive(Error, Debug)]
pub enum ConsultationError {
    #[error("You already have a pending request with doctor {doctor_id}")]
    DuplicateRequest { doctor_id: Uuid },

    #[error("Failed to send consultation request: {0}")]
    SubmissionFailure(String),

    #[error("Failed to load consultation data: {0}")]
    FetchFailure(String),

    #[error("Chat with doctor {0} is locked until a consultation request is accepted")]
    ChatLocked(Uuid),

    #[error("Doctor not found: {0}")]
    DoctorNotFound(Uuid),

    #[error("Consultation request not found: {0}")]
    RequestNotFound(Uuid),

    #[error("Notification not found: {0}")]
    NotificationNotFound(Uuid),

    #[error("Invalid request status transition from {from} to {to}")]
    InvalidTransition { from: RequestStatus, to: RequestStatus },

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("No consultation session for patient {0}")]
    SessionNotFound(Uuid),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Database error: {0}")]
    Database(String),
}

impl From<ConsultationError> for AppError {
    fn from(error: ConsultationError) -> Self {
        let message = error.to_string();
        match error {
            ConsultationError::DuplicateRequest { .. } => AppError::Conflict(message),
            ConsultationError::Validation(_) => AppError::ValidationError(message),
            ConsultationError::DoctorNotFound(_)
            | ConsultationError::RequestNotFound(_)
            | ConsultationError::NotificationNotFound(_)
            | ConsultationError::SessionNotFound(_) => AppError::NotFound(message),
            ConsultationError::InvalidTransition { .. } => AppError::Conflict(message),
            ConsultationError::ChatLocked(_) | ConsultationError::Forbidden(_) => {
                AppError::Forbidden(message)
            }
            ConsultationError::SubmissionFailure(_) | ConsultationError::FetchFailure(_) => {
                AppError::ExternalService(message)
            }
            ConsultationError::Database(_) => AppError::Database(message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    #[test]
    fn test_status_mapping() {
        let id = Uuid::new_v4();
        let cases = vec![
            (ConsultationError::DuplicateRequest { doctor_id: id }, StatusCode::CONFLICT),
            (ConsultationError::Validation("too long".into()), StatusCode::BAD_REQUEST),
            (ConsultationError::RequestNotFound(id), StatusCode::NOT_FOUND),
            (ConsultationError::ChatLocked(id), StatusCode::FORBIDDEN),
            (ConsultationError::SubmissionFailure("timeout".into()), StatusCode::BAD_GATEWAY),
            (ConsultationError::FetchFailure("timeout".into()), StatusCode::BAD_GATEWAY),
            (ConsultationError::Database("boom".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];

        for (error, expected) in cases {
            assert_eq!(AppError::from(error).status_code(), expected);
        }
    }
}
