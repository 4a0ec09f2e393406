//! Persistence layer.
//!
//! Handlers only see the `*Ext` traits. `DbClient` implements them over
//! PostgreSQL, `MemoryStore` over process memory. The two atomic units of
//! the booking core (`book_slot`, `complete_with_feedback`) and the
//! interview insert (`create_session_if_free`) each commit all of their
//! writes or none.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::models::{
    AvailabilitySlot, DifficultyLevel, Feedback, HiringRecommendation, InterviewType,
    InterviewerProfile, InterviewerStatus, PendingUser, PlatformStats, Session, SessionStatus,
    SessionType, StudentProfile, User, UserRole,
};

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::DbClient;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("record not found")]
    NotFound,

    #[error("slot is not available")]
    SlotUnavailable,

    #[error("interviewer already has a session at this time")]
    InterviewerBusy,

    #[error("feedback already exists for this session")]
    FeedbackExists,

    #[error("duplicate {0}")]
    Duplicate(&'static str),

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

#[derive(Debug, Clone)]
pub struct NewPendingUser {
    pub email: String,
    pub password: String,
    pub role: UserRole,
    pub otp: String,
    pub otp_sent_at: DateTime<Utc>,
    pub otp_expires_at: DateTime<Utc>,
    pub account_expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default)]
pub struct StudentProfileInput {
    pub name: String,
    pub college: Option<String>,
    pub branch: Option<String>,
    pub graduation_year: Option<i32>,
    pub target_role: Option<String>,
    pub experience_level: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct InterviewerProfileInput {
    pub name: String,
    pub education: Option<String>,
    pub companies: Vec<String>,
    pub years_of_experience: Option<i32>,
    pub roles_supported: Vec<String>,
    pub difficulty_levels: Vec<DifficultyLevel>,
    pub session_types_offered: Vec<SessionType>,
    pub linkedin_url: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewSession {
    pub student_id: Uuid,
    pub interviewer_id: Uuid,
    pub session_type: SessionType,
    pub topic: Option<String>,
    pub role: Option<String>,
    pub difficulty: Option<DifficultyLevel>,
    pub interview_type: Option<InterviewType>,
    pub duration_minutes: i32,
    pub scheduled_time: DateTime<Utc>,
}

impl NewSession {
    pub fn end_time(&self) -> DateTime<Utc> {
        self.scheduled_time + chrono::Duration::minutes(i64::from(self.duration_minutes))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FeedbackFields {
    Guidance {
        summary: String,
        strengths: String,
        recommendations: String,
        action_items: String,
    },
    Interview {
        summary: String,
        technical_depth: i32,
        problem_solving: i32,
        communication: i32,
        confidence: i32,
        overall_comments: String,
        hiring_recommendation: HiringRecommendation,
    },
}

impl FeedbackFields {
    pub fn session_type(&self) -> SessionType {
        match self {
            FeedbackFields::Guidance { .. } => SessionType::Guidance,
            FeedbackFields::Interview { .. } => SessionType::Interview,
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewFeedback {
    pub session_id: Uuid,
    pub interviewer_id: Uuid,
    pub fields: FeedbackFields,
}

impl NewFeedback {
    pub(crate) fn into_record(self, id: Uuid, created_at: DateTime<Utc>) -> Feedback {
        let mut feedback = Feedback {
            id,
            session_id: self.session_id,
            interviewer_id: self.interviewer_id,
            summary: String::new(),
            strengths: None,
            recommendations: None,
            action_items: None,
            technical_depth: None,
            problem_solving: None,
            communication: None,
            confidence: None,
            overall_comments: None,
            hiring_recommendation: None,
            created_at,
        };
        match self.fields {
            FeedbackFields::Guidance {
                summary,
                strengths,
                recommendations,
                action_items,
            } => {
                feedback.summary = summary;
                feedback.strengths = Some(strengths);
                feedback.recommendations = Some(recommendations);
                feedback.action_items = Some(action_items);
            }
            FeedbackFields::Interview {
                summary,
                technical_depth,
                problem_solving,
                communication,
                confidence,
                overall_comments,
                hiring_recommendation,
            } => {
                feedback.summary = summary;
                feedback.technical_depth = Some(technical_depth);
                feedback.problem_solving = Some(problem_solving);
                feedback.communication = Some(communication);
                feedback.confidence = Some(confidence);
                feedback.overall_comments = Some(overall_comments);
                feedback.hiring_recommendation = Some(hiring_recommendation);
            }
        }
        feedback
    }
}

#[async_trait]
pub trait UserExt {
    async fn get_user(
        &self,
        user_id: Option<Uuid>,
        email: Option<&str>,
    ) -> Result<Option<User>, DbError>;

    async fn get_pending_user(&self, email: &str) -> Result<Option<PendingUser>, DbError>;

    /// Inserts or replaces the pending signup for `pending.email`.
    async fn save_pending_user(&self, pending: NewPendingUser) -> Result<PendingUser, DbError>;

    async fn refresh_pending_otp(
        &self,
        email: &str,
        otp: &str,
        sent_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Result<(), DbError>;

    async fn delete_pending_user(&self, email: &str) -> Result<(), DbError>;

    /// Turns the pending signup into a `User` and removes it, atomically.
    async fn activate_pending_user(&self, email: &str) -> Result<User, DbError>;
}

#[async_trait]
pub trait ProfileExt {
    async fn get_student_profile(&self, user_id: Uuid) -> Result<Option<StudentProfile>, DbError>;

    async fn get_student_profile_by_id(
        &self,
        profile_id: Uuid,
    ) -> Result<Option<StudentProfile>, DbError>;

    async fn upsert_student_profile(
        &self,
        user_id: Uuid,
        input: StudentProfileInput,
    ) -> Result<StudentProfile, DbError>;

    async fn set_student_resume(
        &self,
        user_id: Uuid,
        resume_url: Option<&str>,
    ) -> Result<StudentProfile, DbError>;

    async fn get_interviewer_profile(
        &self,
        user_id: Uuid,
    ) -> Result<Option<InterviewerProfile>, DbError>;

    async fn get_interviewer_profile_by_id(
        &self,
        profile_id: Uuid,
    ) -> Result<Option<InterviewerProfile>, DbError>;

    /// Creates the profile as PENDING or updates it; never touches `status`.
    async fn upsert_interviewer_profile(
        &self,
        user_id: Uuid,
        input: InterviewerProfileInput,
    ) -> Result<InterviewerProfile, DbError>;

    /// Only the documents given as `Some` are replaced.
    async fn set_interviewer_documents(
        &self,
        user_id: Uuid,
        resume_url: Option<&str>,
        id_card_url: Option<&str>,
    ) -> Result<InterviewerProfile, DbError>;

    /// Newest profiles first.
    async fn list_interviewers(
        &self,
        status: Option<InterviewerStatus>,
    ) -> Result<Vec<InterviewerProfile>, DbError>;

    async fn set_interviewer_status(
        &self,
        profile_id: Uuid,
        status: InterviewerStatus,
    ) -> Result<InterviewerProfile, DbError>;
}

#[async_trait]
pub trait SlotExt {
    /// All slots of an interviewer, earliest first.
    async fn list_slots(&self, interviewer_id: Uuid) -> Result<Vec<AvailabilitySlot>, DbError>;

    /// Free slots starting at or after `from`, earliest first.
    async fn list_open_slots(
        &self,
        interviewer_id: Uuid,
        from: DateTime<Utc>,
    ) -> Result<Vec<AvailabilitySlot>, DbError>;

    async fn create_slot(
        &self,
        interviewer_id: Uuid,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
    ) -> Result<AvailabilitySlot, DbError>;

    /// Removes the slot only if the interviewer owns it and it is still free.
    async fn delete_free_slot(&self, slot_id: Uuid, interviewer_id: Uuid)
        -> Result<bool, DbError>;
}

#[async_trait]
pub trait SessionExt {
    /// Consumes the free slot starting at `session.scheduled_time` and
    /// inserts the session. Fails with `SlotUnavailable` when no such slot
    /// is free or the interviewer is already occupied at that time.
    async fn book_slot(&self, session: NewSession) -> Result<Session, DbError>;

    /// Inserts the session unless the interviewer already holds an
    /// overlapping one, in which case `InterviewerBusy` is returned.
    async fn create_session_if_free(&self, session: NewSession) -> Result<Session, DbError>;

    async fn get_session(&self, session_id: Uuid) -> Result<Option<Session>, DbError>;

    /// Newest scheduled time first.
    async fn list_student_sessions(&self, student_id: Uuid) -> Result<Vec<Session>, DbError>;

    /// Newest scheduled time first.
    async fn list_interviewer_sessions(
        &self,
        interviewer_id: Uuid,
    ) -> Result<Vec<Session>, DbError>;

    async fn recent_sessions(&self, limit: i64) -> Result<Vec<Session>, DbError>;

    async fn count_sessions(
        &self,
        interviewer_id: Uuid,
        status: SessionStatus,
    ) -> Result<i64, DbError>;

    async fn count_upcoming_sessions(
        &self,
        interviewer_id: Uuid,
        from: DateTime<Utc>,
    ) -> Result<i64, DbError>;

    async fn has_overlapping_session(
        &self,
        interviewer_id: Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<bool, DbError>;

    /// Inserts the feedback and marks the session COMPLETED in one unit.
    async fn complete_with_feedback(&self, feedback: NewFeedback) -> Result<Feedback, DbError>;

    async fn get_feedback(&self, session_id: Uuid) -> Result<Option<Feedback>, DbError>;

    async fn platform_stats(&self) -> Result<PlatformStats, DbError>;
}

pub trait Store: UserExt + ProfileExt + SlotExt + SessionExt + Send + Sync {}

impl<T> Store for T where T: UserExt + ProfileExt + SlotExt + SessionExt + Send + Sync {}
