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
        CreateSlotDto, DataResponse, DocumentsData, FilterUserDto, InterviewerProfileData,
        InterviewerProfileDto, Response, SessionView, SlotQuery, StudentSummary,
    },
    error::{AppError, ErrorMessage},
    extractors::{AppJson, AppQuery},
    handlers::read_file_part,
    middleware::CurrentUser,
    models::{AvailabilitySlot, InterviewerProfile},
    uploads::{self, UploadKind},
    AppState,
};

pub fn interviewer_handler() -> Router {
    Router::new()
        .route("/profile", get(get_profile).post(save_profile))
        .route("/upload-documents", post(upload_documents))
        .route("/sessions", get(list_sessions))
        .route(
            "/availability",
            get(list_availability)
                .post(create_availability)
                .delete(delete_availability),
        )
}

async fn find_profile(
    app_state: &AppState,
    current: &CurrentUser,
) -> Result<Option<InterviewerProfile>, AppError> {
    Ok(app_state
        .db_client
        .get_interviewer_profile(current.user.id)
        .await?)
}

async fn get_profile(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(current): Extension<CurrentUser>,
) -> Result<impl IntoResponse, AppError> {
    let profile = find_profile(&app_state, &current).await?;

    Ok(Json(DataResponse::success(InterviewerProfileData {
        user: FilterUserDto::filter_user(&current.user),
        profile,
    })))
}

async fn save_profile(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(current): Extension<CurrentUser>,
    AppJson(body): AppJson<InterviewerProfileDto>,
) -> Result<impl IntoResponse, AppError> {
    body.validate()
        .map_err(|e| AppError::bad_request(e.to_string()))?;

    let profile = app_state
        .db_client
        .upsert_interviewer_profile(current.user.id, body.into())
        .await?;

    info!(profile_id = %profile.id, status = ?profile.status, "interviewer profile saved");
    Ok(Json(DataResponse::success(InterviewerProfileData {
        user: FilterUserDto::filter_user(&current.user),
        profile: Some(profile),
    })))
}

/// Accepts a `resume` part, an `idCard` part, or both.
async fn upload_documents(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(current): Extension<CurrentUser>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    let profile = find_profile(&app_state, &current)
        .await?
        .ok_or(ErrorMessage::InterviewerProfileNotFound)?;

    let mut resume = None;
    let mut id_card = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::bad_request(e.body_text()))?
    {
        match field.name() {
            Some("resume") => resume = Some(read_file_part(field).await?),
            Some("idCard") => id_card = Some(read_file_part(field).await?),
            _ => {}
        }
    }
    if resume.is_none() && id_card.is_none() {
        return Err(ErrorMessage::NoFileProvided.into());
    }

    // Validate both before writing either.
    if let Some(file) = &resume {
        uploads::validate(UploadKind::InterviewerResume, file)?;
    }
    if let Some(file) = &id_card {
        uploads::validate(UploadKind::IdCard, file)?;
    }

    let root = &app_state.env.upload_dir;
    let resume_url = match &resume {
        Some(file) => {
            Some(uploads::save(root, UploadKind::InterviewerResume, current.user.id, file).await?)
        }
        None => None,
    };
    let id_card_url = match &id_card {
        Some(file) => {
            let saved = uploads::save(root, UploadKind::IdCard, current.user.id, file).await;
            let written: Vec<&str> = resume_url.as_deref().into_iter().collect();
            Some(uploads::discard_on_error(root, &written, saved).await?)
        }
        None => None,
    };

    let recorded = app_state
        .db_client
        .set_interviewer_documents(current.user.id, resume_url.as_deref(), id_card_url.as_deref())
        .await;
    let written: Vec<&str> = [resume_url.as_deref(), id_card_url.as_deref()]
        .into_iter()
        .flatten()
        .collect();
    let updated = uploads::discard_on_error(root, &written, recorded).await?;

    if resume_url.is_some() {
        if let Some(previous) = &profile.resume_url {
            uploads::remove(root, previous).await?;
        }
    }
    if id_card_url.is_some() {
        if let Some(previous) = &profile.id_card_url {
            uploads::remove(root, previous).await?;
        }
    }

    Ok(Json(DataResponse::success(DocumentsData {
        resume_url: updated.resume_url,
        id_card_url: updated.id_card_url,
    })))
}

async fn list_sessions(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(current): Extension<CurrentUser>,
) -> Result<impl IntoResponse, AppError> {
    let Some(profile) = find_profile(&app_state, &current).await? else {
        return Ok(Json(DataResponse::success(Vec::<SessionView>::new())));
    };

    let sessions = app_state
        .db_client
        .list_interviewer_sessions(profile.id)
        .await?;

    let mut views = Vec::with_capacity(sessions.len());
    for session in sessions {
        let student = app_state
            .db_client
            .get_student_profile_by_id(session.student_id)
            .await?;
        let feedback = app_state.db_client.get_feedback(session.id).await?;
        views.push(SessionView {
            interviewer: None,
            student: student.as_ref().map(StudentSummary::from),
            feedback,
            session,
        });
    }

    Ok(Json(DataResponse::success(views)))
}

async fn list_availability(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(current): Extension<CurrentUser>,
) -> Result<impl IntoResponse, AppError> {
    let slots = match find_profile(&app_state, &current).await? {
        Some(profile) => app_state.db_client.list_slots(profile.id).await?,
        None => Vec::<AvailabilitySlot>::new(),
    };

    Ok(Json(DataResponse::success(slots)))
}

async fn create_availability(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(current): Extension<CurrentUser>,
    AppJson(body): AppJson<CreateSlotDto>,
) -> Result<impl IntoResponse, AppError> {
    let profile = find_profile(&app_state, &current)
        .await?
        .filter(InterviewerProfile::is_approved)
        .ok_or(ErrorMessage::InterviewerNotApproved)?;

    if body.end_time <= body.start_time {
        return Err(ErrorMessage::InvalidTimeRange.into());
    }
    if body.start_time <= Utc::now() {
        return Err(ErrorMessage::TimeInPast.into());
    }

    let slot = app_state
        .db_client
        .create_slot(profile.id, body.start_time, body.end_time)
        .await?;

    info!(slot_id = %slot.id, interviewer_id = %profile.id, "availability slot created");
    Ok((StatusCode::CREATED, Json(DataResponse::success(slot))))
}

async fn delete_availability(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(current): Extension<CurrentUser>,
    AppQuery(query): AppQuery<SlotQuery>,
) -> Result<impl IntoResponse, AppError> {
    let profile = find_profile(&app_state, &current)
        .await?
        .filter(InterviewerProfile::is_approved)
        .ok_or(ErrorMessage::InterviewerNotApproved)?;

    if !app_state
        .db_client
        .delete_free_slot(query.id, profile.id)
        .await?
    {
        return Err(ErrorMessage::SlotNotFound.into());
    }

    info!(slot_id = %query.id, interviewer_id = %profile.id, "availability slot deleted");
    Ok(Json(Response {
        status: "success",
        message: "Slot deleted".to_string(),
    }))
}
