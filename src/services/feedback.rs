use tracing::info;
use uuid::Uuid;

use crate::{
    db::{FeedbackFields, NewFeedback, Store},
    error::{AppError, ErrorMessage},
    models::{Feedback, InterviewerProfile, SessionStatus, User, UserRole},
};

pub const MIN_RATING: i32 = 1;
pub const MAX_RATING: i32 = 5;

fn require_text(field: &str, value: &str) -> Result<(), AppError> {
    if value.trim().is_empty() {
        return Err(AppError::bad_request(format!("{field} is required")));
    }
    Ok(())
}

fn require_rating(field: &str, value: i32) -> Result<(), AppError> {
    if !(MIN_RATING..=MAX_RATING).contains(&value) {
        return Err(AppError::bad_request(format!(
            "{field} must be between {MIN_RATING} and {MAX_RATING}"
        )));
    }
    Ok(())
}

pub fn validate_fields(fields: &FeedbackFields) -> Result<(), AppError> {
    match fields {
        FeedbackFields::Guidance {
            summary,
            strengths,
            recommendations,
            action_items,
        } => {
            require_text("summary", summary)?;
            require_text("strengths", strengths)?;
            require_text("recommendations", recommendations)?;
            require_text("actionItems", action_items)
        }
        FeedbackFields::Interview {
            summary,
            technical_depth,
            problem_solving,
            communication,
            confidence,
            overall_comments,
            ..
        } => {
            require_text("summary", summary)?;
            require_rating("technicalDepth", *technical_depth)?;
            require_rating("problemSolving", *problem_solving)?;
            require_rating("communication", *communication)?;
            require_rating("confidence", *confidence)?;
            require_text("overallComments", overall_comments)
        }
    }
}

/// Records the interviewer's feedback and completes the session.
///
/// A session accepts feedback once. A retry after success fails with
/// `FeedbackAlreadyExists` and changes nothing.
pub async fn submit_feedback(
    store: &dyn Store,
    interviewer: &InterviewerProfile,
    session_id: Uuid,
    fields: FeedbackFields,
) -> Result<Feedback, AppError> {
    let session = store
        .get_session(session_id)
        .await?
        .filter(|s| s.interviewer_id == interviewer.id)
        .ok_or(ErrorMessage::SessionNotFound)?;

    if session.session_type != fields.session_type() {
        return Err(ErrorMessage::SessionTypeMismatch.into());
    }
    if session.status == SessionStatus::Cancelled {
        return Err(ErrorMessage::SessionCancelled.into());
    }
    validate_fields(&fields)?;

    let feedback = store
        .complete_with_feedback(NewFeedback {
            session_id: session.id,
            interviewer_id: interviewer.id,
            fields,
        })
        .await?;

    info!(session_id = %session.id, interviewer_id = %interviewer.id, "feedback submitted");
    Ok(feedback)
}

/// Feedback is visible to the session's student, its interviewer and admins.
/// Everyone else is told the session does not exist.
pub async fn view_feedback(
    store: &dyn Store,
    viewer: &User,
    session_id: Uuid,
) -> Result<Feedback, AppError> {
    let session = store
        .get_session(session_id)
        .await?
        .ok_or(ErrorMessage::SessionNotFound)?;

    let allowed = match viewer.role {
        UserRole::Admin => true,
        UserRole::Student => store
            .get_student_profile(viewer.id)
            .await?
            .is_some_and(|p| p.id == session.student_id),
        UserRole::Interviewer => store
            .get_interviewer_profile(viewer.id)
            .await?
            .is_some_and(|p| p.id == session.interviewer_id),
    };
    if !allowed {
        return Err(ErrorMessage::SessionNotFound.into());
    }

    store
        .get_feedback(session.id)
        .await?
        .ok_or_else(|| ErrorMessage::FeedbackNotFound.into())
}
