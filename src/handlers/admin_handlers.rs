use std::sync::Arc;

use axum::{response::IntoResponse, routing::get, Extension, Json, Router};
use chrono::Utc;
use tracing::info;

use crate::{
    db::DbError,
    dtos::{
        AdminInterviewerView, AnalyticsData, DataResponse, InterviewerListQuery,
        InterviewerSummary, SessionView, StudentSummary, TopInterviewer,
        UpdateInterviewerStatusDto,
    },
    error::{AppError, ErrorMessage},
    extractors::{AppJson, AppQuery},
    middleware::CurrentUser,
    models::{InterviewerStatus, SessionStatus},
    AppState,
};

const RECENT_SESSIONS: i64 = 10;
const TOP_INTERVIEWERS: usize = 5;

pub fn admin_handler() -> Router {
    Router::new()
        .route(
            "/interviewers",
            get(list_interviewers).patch(update_interviewer_status),
        )
        .route("/analytics", get(analytics))
}

async fn list_interviewers(
    Extension(app_state): Extension<Arc<AppState>>,
    AppQuery(query): AppQuery<InterviewerListQuery>,
) -> Result<impl IntoResponse, AppError> {
    let now = Utc::now();
    let profiles = app_state.db_client.list_interviewers(query.status).await?;

    let mut views = Vec::with_capacity(profiles.len());
    for profile in profiles {
        let email = app_state
            .db_client
            .get_user(Some(profile.user_id), None)
            .await?
            .map(|user| user.email);
        let upcoming_sessions = app_state
            .db_client
            .count_upcoming_sessions(profile.id, now)
            .await?;
        views.push(AdminInterviewerView {
            profile,
            email,
            upcoming_sessions,
        });
    }

    Ok(Json(DataResponse::success(views)))
}

async fn update_interviewer_status(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(current): Extension<CurrentUser>,
    AppJson(body): AppJson<UpdateInterviewerStatusDto>,
) -> Result<impl IntoResponse, AppError> {
    let profile = app_state
        .db_client
        .set_interviewer_status(body.interviewer_id, body.status)
        .await
        .map_err(|e| match e {
            DbError::NotFound => AppError::from(ErrorMessage::InterviewerNotFound),
            other => other.into(),
        })?;

    info!(
        admin_id = %current.user.id,
        interviewer_id = %profile.id,
        status = ?profile.status,
        "interviewer status changed"
    );
    Ok(Json(DataResponse::success(profile)))
}

async fn analytics(
    Extension(app_state): Extension<Arc<AppState>>,
) -> Result<impl IntoResponse, AppError> {
    let db = &app_state.db_client;
    let stats = db.platform_stats().await?;

    let mut recent_sessions = Vec::new();
    for session in db.recent_sessions(RECENT_SESSIONS).await? {
        let student = db.get_student_profile_by_id(session.student_id).await?;
        let interviewer = db
            .get_interviewer_profile_by_id(session.interviewer_id)
            .await?;
        recent_sessions.push(SessionView {
            interviewer: interviewer.as_ref().map(InterviewerSummary::from),
            student: student.as_ref().map(StudentSummary::from),
            feedback: None,
            session,
        });
    }

    let mut top_interviewers = Vec::new();
    for profile in db
        .list_interviewers(Some(InterviewerStatus::Approved))
        .await?
    {
        let completed_sessions = db
            .count_sessions(profile.id, SessionStatus::Completed)
            .await?;
        top_interviewers.push(TopInterviewer {
            id: profile.id,
            name: profile.name,
            completed_sessions,
        });
    }
    top_interviewers.sort_by(|a, b| b.completed_sessions.cmp(&a.completed_sessions));
    top_interviewers.truncate(TOP_INTERVIEWERS);

    Ok(Json(DataResponse::success(AnalyticsData {
        analytics: stats,
        recent_sessions,
        top_interviewers,
    })))
}
