use std::sync::Arc;

use axum::{
    extract::Multipart,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Extension, Json, Router,
};
use chrono::Utc;
use tracing::info;
use validator::Validate;

use crate::{
    dtos::{
        BookGuidanceDto, BookInterviewDto, BookingData, DataResponse, FilterUserDto,
        GuidanceInterviewer, InterviewerSummary, ResumeData, SessionView, StudentProfileData,
        StudentProfileDto,
    },
    error::{AppError, ErrorMessage},
    extractors::AppJson,
    handlers::read_file_part,
    middleware::CurrentUser,
    models::{InterviewerStatus, SessionType, StudentProfile},
    services::booking::{self, GuidanceRequest, InterviewRequest},
    uploads::{self, UploadKind},
    AppState,
};

pub fn student_handler() -> Router {
    Router::new()
        .route("/profile", get(get_profile).post(save_profile))
        .route("/upload-resume", post(upload_resume).delete(delete_resume))
        .route("/sessions", get(list_sessions))
        .route("/interviewers", get(list_guidance_interviewers))
        .route("/book/guidance", post(book_guidance))
        .route("/book/interview", post(book_interview))
}

async fn require_profile(
    app_state: &AppState,
    current: &CurrentUser,
) -> Result<StudentProfile, AppError> {
    app_state
        .db_client
        .get_student_profile(current.user.id)
        .await?
        .ok_or_else(|| ErrorMessage::ProfileIncomplete.into())
}

async fn get_profile(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(current): Extension<CurrentUser>,
) -> Result<impl IntoResponse, AppError> {
    let profile = app_state
        .db_client
        .get_student_profile(current.user.id)
        .await?;

    Ok(Json(DataResponse::success(StudentProfileData {
        user: FilterUserDto::filter_user(&current.user),
        profile,
    })))
}

async fn save_profile(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(current): Extension<CurrentUser>,
    AppJson(body): AppJson<StudentProfileDto>,
) -> Result<impl IntoResponse, AppError> {
    body.validate()
        .map_err(|e| AppError::bad_request(e.to_string()))?;

    let profile = app_state
        .db_client
        .upsert_student_profile(current.user.id, body.into())
        .await?;

    Ok(Json(DataResponse::success(StudentProfileData {
        user: FilterUserDto::filter_user(&current.user),
        profile: Some(profile),
    })))
}

async fn upload_resume(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(current): Extension<CurrentUser>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    let profile = require_profile(&app_state, &current).await?;

    let mut file = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::bad_request(e.body_text()))?
    {
        if field.name() == Some("file") || field.name() == Some("resume") {
            file = Some(read_file_part(field).await?);
            break;
        }
    }
    let file = file.ok_or(ErrorMessage::NoFileProvided)?;

    let url = uploads::save(
        &app_state.env.upload_dir,
        UploadKind::StudentResume,
        current.user.id,
        &file,
    )
    .await?;

    let recorded = app_state
        .db_client
        .set_student_resume(current.user.id, Some(&url))
        .await;
    let updated =
        uploads::discard_on_error(&app_state.env.upload_dir, &[url.as_str()], recorded).await?;

    if let Some(previous) = profile.resume_url {
        uploads::remove(&app_state.env.upload_dir, &previous).await?;
    }

    Ok(Json(DataResponse::success(ResumeData {
        resume_url: updated.resume_url,
    })))
}

async fn delete_resume(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(current): Extension<CurrentUser>,
) -> Result<impl IntoResponse, AppError> {
    let profile = require_profile(&app_state, &current).await?;
    let resume_url = profile.resume_url.ok_or(ErrorMessage::ResumeNotFound)?;

    app_state
        .db_client
        .set_student_resume(current.user.id, None)
        .await?;
    uploads::remove(&app_state.env.upload_dir, &resume_url).await?;

    info!(user_id = %current.user.id, "resume deleted");
    Ok(Json(DataResponse::success(ResumeData { resume_url: None })))
}

async fn list_sessions(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(current): Extension<CurrentUser>,
) -> Result<impl IntoResponse, AppError> {
    let Some(profile) = app_state
        .db_client
        .get_student_profile(current.user.id)
        .await?
    else {
        return Ok(Json(DataResponse::success(Vec::<SessionView>::new())));
    };

    let sessions = app_state.db_client.list_student_sessions(profile.id).await?;

    let mut views = Vec::with_capacity(sessions.len());
    for session in sessions {
        let interviewer = app_state
            .db_client
            .get_interviewer_profile_by_id(session.interviewer_id)
            .await?;
        let feedback = app_state.db_client.get_feedback(session.id).await?;
        views.push(SessionView {
            interviewer: interviewer.as_ref().map(InterviewerSummary::from),
            student: None,
            feedback,
            session,
        });
    }

    Ok(Json(DataResponse::success(views)))
}

/// Approved interviewers offering guidance, with their upcoming free slots.
async fn list_guidance_interviewers(
    Extension(app_state): Extension<Arc<AppState>>,
) -> Result<impl IntoResponse, AppError> {
    let now = Utc::now();
    let profiles = app_state
        .db_client
        .list_interviewers(Some(InterviewerStatus::Approved))
        .await?;

    let mut directory = Vec::new();
    for profile in profiles
        .into_iter()
        .filter(|p| p.offers(SessionType::Guidance))
    {
        let available_slots = app_state.db_client.list_open_slots(profile.id, now).await?;
        directory.push(GuidanceInterviewer {
            interviewer: InterviewerSummary::from(&profile),
            education: profile.education,
            roles_supported: profile.roles_supported,
            available_slots,
        });
    }

    Ok(Json(DataResponse::success(directory)))
}

async fn book_guidance(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(current): Extension<CurrentUser>,
    AppJson(body): AppJson<BookGuidanceDto>,
) -> Result<impl IntoResponse, AppError> {
    body.validate()
        .map_err(|e| AppError::bad_request(e.to_string()))?;
    let student = require_profile(&app_state, &current).await?;

    let booking = booking::book_guidance(
        app_state.db_client.as_ref(),
        &student,
        GuidanceRequest {
            interviewer_id: body.interviewer_id,
            topic: body.topic,
            duration_minutes: body.duration_minutes,
            scheduled_time: body.scheduled_time,
        },
        Utc::now(),
    )
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(DataResponse::success(BookingData {
            interviewer: InterviewerSummary::from(&booking.interviewer),
            session: booking.session,
        })),
    ))
}

async fn book_interview(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(current): Extension<CurrentUser>,
    AppJson(body): AppJson<BookInterviewDto>,
) -> Result<impl IntoResponse, AppError> {
    body.validate()
        .map_err(|e| AppError::bad_request(e.to_string()))?;
    let student = require_profile(&app_state, &current).await?;

    let booking = booking::book_interview(
        app_state.db_client.as_ref(),
        app_state.env.assignment_policy,
        &student,
        InterviewRequest {
            role: body.role,
            difficulty: body.difficulty,
            interview_type: body.interview_type,
            duration_minutes: body.duration_minutes,
            scheduled_time: body.scheduled_time,
        },
        Utc::now(),
    )
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(DataResponse::success(BookingData {
            interviewer: InterviewerSummary::from(&booking.interviewer),
            session: booking.session,
        })),
    ))
}
