use std::fmt;

use axum::{http::StatusCode, response::IntoResponse, Json};
use serde::{Deserialize, Serialize};

use crate::db::DbError;

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub status: String,
    pub message: String,
}

impl fmt::Display for ErrorResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.status, self.message)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ErrorMessage {
    EmptyPassword,
    ExceededMaxPasswordLength(usize),
    InvalidHashFormat,
    HashingError,
    InvalidToken,
    ServerError,
    WrongCredentials,
    EmailExist,
    EmailNotVerified,
    UserNoLongerExist,
    TokenNotProvided,
    PermissionDenied,
    UserNotAuthenticated,
    InvalidSignupRole,
    PendingSignupNotFound,
    SignupExpired,
    OtpExpired,
    InvalidOtp,
    OtpResendTooSoon,
    VerificationEmailFailed,
    ProfileIncomplete,
    InterviewerProfileNotFound,
    InterviewerNotApproved,
    InterviewerUnavailable,
    SlotUnavailable,
    NoInterviewerAvailable,
    SlotNotFound,
    InvalidTimeRange,
    TimeInPast,
    SessionNotFound,
    SessionTypeMismatch,
    SessionCancelled,
    FeedbackAlreadyExists,
    FeedbackNotFound,
    InterviewerNotFound,
    NoFileProvided,
    UnsupportedResumeType,
    UnsupportedIdCardType,
    FileTooLarge,
    ResumeNotFound,
}

impl ErrorMessage {
    pub fn to_str(&self) -> String {
        match self {
            ErrorMessage::ServerError => "Server Error. Please try again later".to_string(),
            ErrorMessage::WrongCredentials => "Email or password is wrong".to_string(),
            ErrorMessage::EmailExist => "A user with this email already exists".to_string(),
            ErrorMessage::EmailNotVerified => {
                "Please verify your email before logging in".to_string()
            }
            ErrorMessage::UserNoLongerExist => {
                "User belonging to this token no longer exists".to_string()
            }
            ErrorMessage::EmptyPassword => "Password cannot be empty".to_string(),
            ErrorMessage::HashingError => "Error while hashing password".to_string(),
            ErrorMessage::InvalidHashFormat => "Invalid password hash format".to_string(),
            ErrorMessage::ExceededMaxPasswordLength(max_length) => {
                format!("Password must not be more than {} characters", max_length)
            }
            ErrorMessage::InvalidToken => "Authentication token is invalid or expired".to_string(),
            ErrorMessage::TokenNotProvided => {
                "You are not logged in, please provide a token".to_string()
            }
            ErrorMessage::PermissionDenied => {
                "You are not allowed to perform this action".to_string()
            }
            ErrorMessage::UserNotAuthenticated => {
                "Authentication required. Please log in.".to_string()
            }
            ErrorMessage::InvalidSignupRole => {
                "Role must be either STUDENT or INTERVIEWER".to_string()
            }
            ErrorMessage::PendingSignupNotFound => {
                "No pending signup found for this email. Please sign up first.".to_string()
            }
            ErrorMessage::SignupExpired => {
                "This signup has expired. Please sign up again.".to_string()
            }
            ErrorMessage::OtpExpired => {
                "Verification code has expired. Please request a new one.".to_string()
            }
            ErrorMessage::InvalidOtp => "Invalid verification code".to_string(),
            ErrorMessage::OtpResendTooSoon => {
                "Please wait at least 1 minute before requesting a new code".to_string()
            }
            ErrorMessage::VerificationEmailFailed => {
                "Failed to send verification email. Please try again.".to_string()
            }
            ErrorMessage::ProfileIncomplete => "Please complete your profile first".to_string(),
            ErrorMessage::InterviewerProfileNotFound => {
                "Interviewer profile not found".to_string()
            }
            ErrorMessage::InterviewerNotApproved => {
                "Your profile must be approved before managing availability".to_string()
            }
            ErrorMessage::InterviewerUnavailable => {
                "Interviewer is not available for guidance sessions".to_string()
            }
            ErrorMessage::SlotUnavailable => "Selected time slot is not available".to_string(),
            ErrorMessage::NoInterviewerAvailable => {
                "No interviewer is available for this role, difficulty and time".to_string()
            }
            ErrorMessage::SlotNotFound => "Slot not found or already booked".to_string(),
            ErrorMessage::InvalidTimeRange => "End time must be after start time".to_string(),
            ErrorMessage::TimeInPast => "Scheduled time must be in the future".to_string(),
            ErrorMessage::SessionNotFound => "Session not found".to_string(),
            ErrorMessage::SessionTypeMismatch => {
                "Feedback type does not match the session type".to_string()
            }
            ErrorMessage::SessionCancelled => {
                "Feedback cannot be submitted for a cancelled session".to_string()
            }
            ErrorMessage::FeedbackAlreadyExists => {
                "Feedback has already been submitted for this session".to_string()
            }
            ErrorMessage::FeedbackNotFound => "Feedback not found".to_string(),
            ErrorMessage::InterviewerNotFound => "Interviewer not found".to_string(),
            ErrorMessage::NoFileProvided => "No file provided".to_string(),
            ErrorMessage::UnsupportedResumeType => {
                "Resume must be one of the accepted document types".to_string()
            }
            ErrorMessage::UnsupportedIdCardType => {
                "ID card must be a PDF, JPG, PNG or WEBP file".to_string()
            }
            ErrorMessage::FileTooLarge => "File must be under 5MB".to_string(),
            ErrorMessage::ResumeNotFound => "No resume found".to_string(),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ErrorMessage::ServerError
            | ErrorMessage::HashingError
            | ErrorMessage::InvalidHashFormat
            | ErrorMessage::VerificationEmailFailed => StatusCode::INTERNAL_SERVER_ERROR,
            ErrorMessage::InvalidToken
            | ErrorMessage::TokenNotProvided
            | ErrorMessage::UserNoLongerExist
            | ErrorMessage::UserNotAuthenticated => StatusCode::UNAUTHORIZED,
            ErrorMessage::PermissionDenied
            | ErrorMessage::EmailNotVerified
            | ErrorMessage::InterviewerNotApproved => StatusCode::FORBIDDEN,
            ErrorMessage::PendingSignupNotFound
            | ErrorMessage::InterviewerProfileNotFound
            | ErrorMessage::SlotNotFound
            | ErrorMessage::SessionNotFound
            | ErrorMessage::FeedbackNotFound
            | ErrorMessage::InterviewerNotFound
            | ErrorMessage::ResumeNotFound => StatusCode::NOT_FOUND,
            ErrorMessage::EmailExist
            | ErrorMessage::SlotUnavailable
            | ErrorMessage::FeedbackAlreadyExists => StatusCode::CONFLICT,
            ErrorMessage::OtpResendTooSoon => StatusCode::TOO_MANY_REQUESTS,
            _ => StatusCode::BAD_REQUEST,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppError {
    pub message: String,
    pub status: StatusCode,
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "HttpError: message: {}, status: {}",
            self.message, self.status
        )
    }
}

impl std::error::Error for AppError {}

impl AppError {
    pub fn new(message: impl Into<String>, status: StatusCode) -> Self {
        AppError {
            message: message.into(),
            status,
        }
    }

    /// Logs the cause and answers with the generic 500 message.
    pub fn server_error(cause: impl fmt::Display) -> Self {
        tracing::error!(error = %cause, "request failed");
        ErrorMessage::ServerError.into()
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        AppError::new(message, StatusCode::BAD_REQUEST)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        AppError::new(message, StatusCode::NOT_FOUND)
    }

    pub fn unique_constraint_violation(message: impl Into<String>) -> Self {
        AppError::new(message, StatusCode::CONFLICT)
    }

    pub fn is(&self, message: ErrorMessage) -> bool {
        self.status == message.status() && self.message == message.to_str()
    }
}

impl From<ErrorMessage> for AppError {
    fn from(message: ErrorMessage) -> Self {
        AppError::new(message.to_str(), message.status())
    }
}

impl From<DbError> for AppError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound => AppError::not_found("Record not found"),
            DbError::SlotUnavailable => ErrorMessage::SlotUnavailable.into(),
            DbError::InterviewerBusy => ErrorMessage::NoInterviewerAvailable.into(),
            DbError::FeedbackExists => ErrorMessage::FeedbackAlreadyExists.into(),
            DbError::Duplicate(what) => {
                AppError::unique_constraint_violation(format!("Duplicate {what}"))
            }
            DbError::Sqlx(e) => AppError::server_error(e),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let status = if self.status.is_server_error() {
            "error"
        } else {
            "fail"
        };
        (
            self.status,
            Json(ErrorResponse {
                status: status.to_string(),
                message: self.message,
            }),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn domain_conflicts_map_to_409() {
        let err: AppError = DbError::SlotUnavailable.into();
        assert_eq!(err.status, StatusCode::CONFLICT);
        assert!(err.is(ErrorMessage::SlotUnavailable));

        let err: AppError = DbError::FeedbackExists.into();
        assert!(err.is(ErrorMessage::FeedbackAlreadyExists));
    }

    #[test]
    fn database_failures_hide_their_cause() {
        let err: AppError = DbError::Sqlx(sqlx::Error::PoolTimedOut).into();
        assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.message, ErrorMessage::ServerError.to_str());
    }

    #[test]
    fn resend_cooldown_is_rate_limited() {
        assert_eq!(
            ErrorMessage::OtpResendTooSoon.status(),
            StatusCode::TOO_MANY_REQUESTS
        );
    }
}
