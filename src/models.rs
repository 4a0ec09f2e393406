use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, sqlx::Type)]
#[sqlx(type_name = "user_role", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum UserRole {
    Student,
    Interviewer,
    Admin,
}

impl UserRole {
    pub fn to_str(&self) -> &str {
        match self {
            UserRole::Student => "STUDENT",
            UserRole::Interviewer => "INTERVIEWER",
            UserRole::Admin => "ADMIN",
        }
    }

    /// Landing page the frontend sends a user of this role to.
    pub fn dashboard_path(&self) -> &'static str {
        match self {
            UserRole::Student => "/student/dashboard",
            UserRole::Interviewer => "/interviewer/dashboard",
            UserRole::Admin => "/admin/dashboard",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, sqlx::Type)]
#[sqlx(type_name = "auth_provider", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum AuthProvider {
    Email,
    Google,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, sqlx::Type)]
#[sqlx(type_name = "interviewer_status", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum InterviewerStatus {
    Pending,
    Approved,
    Rejected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, sqlx::Type)]
#[sqlx(type_name = "session_type", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum SessionType {
    Guidance,
    Interview,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, sqlx::Type)]
#[sqlx(type_name = "session_status", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum SessionStatus {
    Scheduled,
    Completed,
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, sqlx::Type)]
#[sqlx(type_name = "difficulty_level", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum DifficultyLevel {
    Easy,
    Medium,
    Hard,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, sqlx::Type)]
#[sqlx(type_name = "interview_type", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum InterviewType {
    Technical,
    Hr,
    Mixed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, sqlx::Type)]
#[sqlx(type_name = "hiring_recommendation", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HiringRecommendation {
    StrongHire,
    Hire,
    WeakHire,
    NoHire,
}

#[derive(Debug, Clone, Deserialize, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub role: UserRole,
    pub provider: AuthProvider,
    #[serde(skip_serializing)]
    pub password: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A signup that has not confirmed its email address yet.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PendingUser {
    pub id: Uuid,
    pub email: String,
    pub password: String,
    pub role: UserRole,
    pub otp: String,
    pub otp_sent_at: DateTime<Utc>,
    pub otp_expires_at: DateTime<Utc>,
    pub account_expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct StudentProfile {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub college: Option<String>,
    pub branch: Option<String>,
    pub graduation_year: Option<i32>,
    pub target_role: Option<String>,
    pub experience_level: Option<String>,
    pub resume_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct InterviewerProfile {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub education: Option<String>,
    pub companies: Vec<String>,
    pub years_of_experience: Option<i32>,
    pub roles_supported: Vec<String>,
    pub difficulty_levels: Vec<DifficultyLevel>,
    pub session_types_offered: Vec<SessionType>,
    pub linkedin_url: Option<String>,
    pub resume_url: Option<String>,
    pub id_card_url: Option<String>,
    pub status: InterviewerStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl InterviewerProfile {
    pub fn is_approved(&self) -> bool {
        self.status == InterviewerStatus::Approved
    }

    pub fn offers(&self, session_type: SessionType) -> bool {
        self.session_types_offered.contains(&session_type)
    }

    pub fn supports_role(&self, role: &str) -> bool {
        let role = role.trim();
        self.roles_supported
            .iter()
            .any(|supported| supported.trim().eq_ignore_ascii_case(role))
    }

    pub fn supports_difficulty(&self, difficulty: DifficultyLevel) -> bool {
        self.difficulty_levels.contains(&difficulty)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct AvailabilitySlot {
    pub id: Uuid,
    pub interviewer_id: Uuid,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub is_booked: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub id: Uuid,
    pub student_id: Uuid,
    pub interviewer_id: Uuid,
    pub session_type: SessionType,
    pub topic: Option<String>,
    pub role: Option<String>,
    pub difficulty: Option<DifficultyLevel>,
    pub interview_type: Option<InterviewType>,
    pub duration_minutes: i32,
    pub scheduled_time: DateTime<Utc>,
    pub status: SessionStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Session {
    pub fn end_time(&self) -> DateTime<Utc> {
        self.scheduled_time + chrono::Duration::minutes(i64::from(self.duration_minutes))
    }

    /// True when this session occupies any part of `[start, end)`.
    pub fn overlaps(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        self.status != SessionStatus::Cancelled && self.scheduled_time < end && self.end_time() > start
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Feedback {
    pub id: Uuid,
    pub session_id: Uuid,
    pub interviewer_id: Uuid,
    pub summary: String,
    pub strengths: Option<String>,
    pub recommendations: Option<String>,
    pub action_items: Option<String>,
    pub technical_depth: Option<i32>,
    pub problem_solving: Option<i32>,
    pub communication: Option<i32>,
    pub confidence: Option<i32>,
    pub overall_comments: Option<String>,
    pub hiring_recommendation: Option<HiringRecommendation>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct PlatformStats {
    pub total_students: i64,
    pub total_interviewers: i64,
    pub pending_interviewers: i64,
    pub approved_interviewers: i64,
    pub total_sessions: i64,
    pub completed_sessions: i64,
    pub scheduled_sessions: i64,
    pub guidance_sessions: i64,
    pub interview_sessions: i64,
}
