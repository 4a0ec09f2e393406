//! Session booking.
//!
//! Guidance sessions consume an existing availability slot chosen by the
//! student. Interview sessions are assigned to an interviewer picked by the
//! platform; they never touch availability slots.

use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use tracing::{debug, info};
use uuid::Uuid;

use crate::{
    db::{DbError, NewSession, Store},
    error::{AppError, ErrorMessage},
    models::{
        DifficultyLevel, InterviewType, InterviewerProfile, InterviewerStatus, Session,
        SessionStatus, SessionType, StudentProfile,
    },
};

/// Order in which matching interviewers are offered an interview.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AssignmentPolicy {
    /// Fewest scheduled sessions first, then earliest joined.
    #[default]
    LeastLoaded,
    /// Earliest joined first.
    EarliestJoined,
}

impl FromStr for AssignmentPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "least-loaded" => Ok(AssignmentPolicy::LeastLoaded),
            "earliest-joined" => Ok(AssignmentPolicy::EarliestJoined),
            other => Err(format!(
                "unknown assignment policy `{other}`, expected least-loaded or earliest-joined"
            )),
        }
    }
}

impl fmt::Display for AssignmentPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssignmentPolicy::LeastLoaded => f.write_str("least-loaded"),
            AssignmentPolicy::EarliestJoined => f.write_str("earliest-joined"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Candidate {
    pub profile: InterviewerProfile,
    pub scheduled_sessions: i64,
}

pub fn rank_candidates(mut candidates: Vec<Candidate>, policy: AssignmentPolicy) -> Vec<Candidate> {
    candidates.sort_by(|a, b| {
        let joined = a
            .profile
            .created_at
            .cmp(&b.profile.created_at)
            .then_with(|| a.profile.id.cmp(&b.profile.id));
        match policy {
            AssignmentPolicy::LeastLoaded => a
                .scheduled_sessions
                .cmp(&b.scheduled_sessions)
                .then(joined),
            AssignmentPolicy::EarliestJoined => joined,
        }
    });
    candidates
}

#[derive(Debug, Clone)]
pub struct GuidanceRequest {
    pub interviewer_id: Uuid,
    pub topic: String,
    pub duration_minutes: i32,
    pub scheduled_time: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct InterviewRequest {
    pub role: String,
    pub difficulty: DifficultyLevel,
    pub interview_type: InterviewType,
    pub duration_minutes: i32,
    pub scheduled_time: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct Booking {
    pub session: Session,
    pub interviewer: InterviewerProfile,
}

pub async fn book_guidance(
    store: &dyn Store,
    student: &StudentProfile,
    request: GuidanceRequest,
    now: DateTime<Utc>,
) -> Result<Booking, AppError> {
    if request.scheduled_time <= now {
        return Err(ErrorMessage::TimeInPast.into());
    }

    let interviewer = store
        .get_interviewer_profile_by_id(request.interviewer_id)
        .await?
        .filter(|p| p.is_approved() && p.offers(SessionType::Guidance))
        .ok_or(ErrorMessage::InterviewerUnavailable)?;

    let session = store
        .book_slot(NewSession {
            student_id: student.id,
            interviewer_id: interviewer.id,
            session_type: SessionType::Guidance,
            topic: Some(request.topic),
            role: None,
            difficulty: None,
            interview_type: None,
            duration_minutes: request.duration_minutes,
            scheduled_time: request.scheduled_time,
        })
        .await?;

    info!(
        session_id = %session.id,
        interviewer_id = %interviewer.id,
        student_id = %student.id,
        "guidance session booked"
    );
    Ok(Booking {
        session,
        interviewer,
    })
}

pub async fn book_interview(
    store: &dyn Store,
    policy: AssignmentPolicy,
    student: &StudentProfile,
    request: InterviewRequest,
    now: DateTime<Utc>,
) -> Result<Booking, AppError> {
    if request.scheduled_time <= now {
        return Err(ErrorMessage::TimeInPast.into());
    }

    let start = request.scheduled_time;
    let end = start + chrono::Duration::minutes(i64::from(request.duration_minutes));

    let mut candidates = Vec::new();
    for profile in store
        .list_interviewers(Some(InterviewerStatus::Approved))
        .await?
    {
        if !profile.offers(SessionType::Interview)
            || !profile.supports_role(&request.role)
            || !profile.supports_difficulty(request.difficulty)
        {
            continue;
        }
        if store.has_overlapping_session(profile.id, start, end).await? {
            continue;
        }
        let scheduled_sessions = store
            .count_sessions(profile.id, SessionStatus::Scheduled)
            .await?;
        candidates.push(Candidate {
            profile,
            scheduled_sessions,
        });
    }

    for candidate in rank_candidates(candidates, policy) {
        let attempt = store
            .create_session_if_free(NewSession {
                student_id: student.id,
                interviewer_id: candidate.profile.id,
                session_type: SessionType::Interview,
                topic: None,
                role: Some(request.role.trim().to_string()),
                difficulty: Some(request.difficulty),
                interview_type: Some(request.interview_type),
                duration_minutes: request.duration_minutes,
                scheduled_time: start,
            })
            .await;

        match attempt {
            Ok(session) => {
                info!(
                    session_id = %session.id,
                    interviewer_id = %candidate.profile.id,
                    student_id = %student.id,
                    %policy,
                    "interview session assigned"
                );
                return Ok(Booking {
                    session,
                    interviewer: candidate.profile,
                });
            }
            Err(DbError::InterviewerBusy) => {
                debug!(interviewer_id = %candidate.profile.id, "candidate became busy, trying next");
            }
            Err(e) => return Err(e.into()),
        }
    }

    Err(ErrorMessage::NoInterviewerAvailable.into())
}
