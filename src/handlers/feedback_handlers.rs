use std::sync::Arc;

use axum::{http::StatusCode, response::IntoResponse, routing::get, Extension, Json, Router};

use crate::{
    dtos::{DataResponse, FeedbackQuery, SubmitFeedbackDto},
    error::{AppError, ErrorMessage},
    extractors::{AppJson, AppQuery},
    middleware::{ensure_role, CurrentUser},
    models::UserRole,
    services::feedback,
    AppState,
};

pub fn feedback_handler() -> Router {
    Router::new().route("/", get(get_feedback).post(submit_feedback))
}

async fn submit_feedback(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(current): Extension<CurrentUser>,
    AppJson(body): AppJson<SubmitFeedbackDto>,
) -> Result<impl IntoResponse, AppError> {
    ensure_role(&current.user, &[UserRole::Interviewer])?;

    let interviewer = app_state
        .db_client
        .get_interviewer_profile(current.user.id)
        .await?
        .ok_or(ErrorMessage::InterviewerProfileNotFound)?;

    let saved = feedback::submit_feedback(
        app_state.db_client.as_ref(),
        &interviewer,
        body.session_id,
        body.details.into(),
    )
    .await?;

    Ok((StatusCode::CREATED, Json(DataResponse::success(saved))))
}

async fn get_feedback(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(current): Extension<CurrentUser>,
    AppQuery(query): AppQuery<FeedbackQuery>,
) -> Result<impl IntoResponse, AppError> {
    let found =
        feedback::view_feedback(app_state.db_client.as_ref(), &current.user, query.session_id)
            .await?;

    Ok(Json(DataResponse::success(found)))
}
