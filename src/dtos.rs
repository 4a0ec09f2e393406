use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::{
    db::{FeedbackFields, InterviewerProfileInput, StudentProfileInput},
    models::{
        AuthProvider, AvailabilitySlot, DifficultyLevel, Feedback, HiringRecommendation,
        InterviewType, InterviewerProfile, InterviewerStatus, PlatformStats, Session, SessionType,
        StudentProfile, User, UserRole,
    },
};

/// Free-text fields are stored trimmed, so length checks see the trimmed value.
fn trimmed<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    String::deserialize(deserializer).map(|value| value.trim().to_string())
}

// ---------- auth ----------

#[derive(Validate, Debug, Default, Clone, Serialize, Deserialize)]
pub struct SignupUserDto {
    #[validate(
        length(min = 1, message = "Email is required"),
        email(message = "Email is invalid")
    )]
    pub email: String,

    #[validate(length(
        min = 1,
        max = 64,
        message = "Password is required and must not exceed 64 characters"
    ))]
    pub password: String,

    #[validate(length(min = 1, message = "Role is required"))]
    pub role: String,
}

#[derive(Validate, Debug, Default, Clone, Serialize, Deserialize)]
pub struct VerifyOtpDto {
    #[validate(email(message = "Email is invalid"))]
    pub email: String,

    #[validate(length(min = 1, message = "Verification code is required"))]
    pub otp: String,
}

#[derive(Validate, Debug, Default, Clone, Serialize, Deserialize)]
pub struct ResendOtpDto {
    #[validate(email(message = "Email is invalid"))]
    pub email: String,
}

#[derive(Validate, Debug, Default, Clone, Serialize, Deserialize)]
pub struct LoginUserDto {
    #[validate(
        length(min = 1, message = "Email is required"),
        email(message = "Email is invalid")
    )]
    pub email: String,

    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterUserDto {
    pub id: String,
    pub email: String,
    pub role: UserRole,
    pub provider: AuthProvider,
    pub created_at: DateTime<Utc>,
}

impl FilterUserDto {
    pub fn filter_user(user: &User) -> Self {
        FilterUserDto {
            id: user.id.to_string(),
            email: user.email.to_owned(),
            role: user.role,
            provider: user.provider,
            created_at: user.created_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UserData {
    pub user: FilterUserDto,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UserResponseDto {
    pub status: String,
    pub data: UserData,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserLoginResponseDto {
    pub status: String,
    pub token: String,
    pub user: FilterUserDto,
    pub dashboard_path: String,
}

#[derive(Serialize, Deserialize)]
pub struct Response {
    pub status: &'static str,
    pub message: String,
}

/// `{"status":"success","data":...}` envelope for everything else.
#[derive(Debug, Serialize)]
pub struct DataResponse<T> {
    pub status: &'static str,
    pub data: T,
}

impl<T> DataResponse<T> {
    pub fn success(data: T) -> Self {
        DataResponse {
            status: "success",
            data,
        }
    }
}

// ---------- profiles ----------

#[derive(Validate, Debug, Default, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentProfileDto {
    #[serde(deserialize_with = "trimmed")]
    #[validate(length(min = 1, max = 100, message = "Name is required"))]
    pub name: String,
    pub college: Option<String>,
    pub branch: Option<String>,
    #[validate(range(min = 1950, max = 2100, message = "Graduation year is invalid"))]
    pub graduation_year: Option<i32>,
    pub target_role: Option<String>,
    pub experience_level: Option<String>,
}

impl From<StudentProfileDto> for StudentProfileInput {
    fn from(dto: StudentProfileDto) -> Self {
        StudentProfileInput {
            name: dto.name,
            college: dto.college,
            branch: dto.branch,
            graduation_year: dto.graduation_year,
            target_role: dto.target_role,
            experience_level: dto.experience_level,
        }
    }
}

#[derive(Validate, Debug, Default, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InterviewerProfileDto {
    #[serde(deserialize_with = "trimmed")]
    #[validate(length(min = 1, max = 100, message = "Name is required"))]
    pub name: String,
    pub education: Option<String>,
    #[serde(default)]
    pub companies: Vec<String>,
    #[validate(range(min = 0, max = 60, message = "Years of experience is invalid"))]
    pub years_of_experience: Option<i32>,
    #[serde(default)]
    pub roles_supported: Vec<String>,
    #[serde(default)]
    pub difficulty_levels: Vec<DifficultyLevel>,
    #[serde(default)]
    pub session_types_offered: Vec<SessionType>,
    #[validate(url(message = "LinkedIn URL is invalid"))]
    pub linkedin_url: Option<String>,
}

fn clean_list(values: Vec<String>) -> Vec<String> {
    values
        .into_iter()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .collect()
}

fn dedup<T: PartialEq>(values: Vec<T>) -> Vec<T> {
    let mut unique = Vec::with_capacity(values.len());
    for value in values {
        if !unique.contains(&value) {
            unique.push(value);
        }
    }
    unique
}

impl From<InterviewerProfileDto> for InterviewerProfileInput {
    fn from(dto: InterviewerProfileDto) -> Self {
        InterviewerProfileInput {
            name: dto.name,
            education: dto.education,
            companies: clean_list(dto.companies),
            years_of_experience: dto.years_of_experience,
            roles_supported: clean_list(dto.roles_supported),
            difficulty_levels: dedup(dto.difficulty_levels),
            session_types_offered: dedup(dto.session_types_offered),
            linkedin_url: dto.linkedin_url.filter(|url| !url.trim().is_empty()),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentProfileData {
    pub user: FilterUserDto,
    pub profile: Option<StudentProfile>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InterviewerProfileData {
    pub user: FilterUserDto,
    pub profile: Option<InterviewerProfile>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResumeData {
    pub resume_url: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentsData {
    pub resume_url: Option<String>,
    pub id_card_url: Option<String>,
}

// ---------- booking ----------

#[derive(Validate, Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookGuidanceDto {
    pub interviewer_id: Uuid,
    #[serde(deserialize_with = "trimmed")]
    #[validate(length(min = 1, max = 200, message = "Topic is required"))]
    pub topic: String,
    #[validate(range(
        min = 15,
        max = 240,
        message = "Duration must be between 15 and 240 minutes"
    ))]
    pub duration_minutes: i32,
    pub scheduled_time: DateTime<Utc>,
}

#[derive(Validate, Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookInterviewDto {
    #[serde(deserialize_with = "trimmed")]
    #[validate(length(min = 1, max = 100, message = "Role is required"))]
    pub role: String,
    pub difficulty: DifficultyLevel,
    pub interview_type: InterviewType,
    #[validate(range(
        min = 15,
        max = 240,
        message = "Duration must be between 15 and 240 minutes"
    ))]
    pub duration_minutes: i32,
    pub scheduled_time: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InterviewerSummary {
    pub id: Uuid,
    pub name: String,
    pub companies: Vec<String>,
    pub years_of_experience: Option<i32>,
    pub linkedin_url: Option<String>,
}

impl From<&InterviewerProfile> for InterviewerSummary {
    fn from(profile: &InterviewerProfile) -> Self {
        InterviewerSummary {
            id: profile.id,
            name: profile.name.clone(),
            companies: profile.companies.clone(),
            years_of_experience: profile.years_of_experience,
            linkedin_url: profile.linkedin_url.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentSummary {
    pub id: Uuid,
    pub name: String,
    pub college: Option<String>,
    pub target_role: Option<String>,
    pub resume_url: Option<String>,
}

impl From<&StudentProfile> for StudentSummary {
    fn from(profile: &StudentProfile) -> Self {
        StudentSummary {
            id: profile.id,
            name: profile.name.clone(),
            college: profile.college.clone(),
            target_role: profile.target_role.clone(),
            resume_url: profile.resume_url.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingData {
    pub session: Session,
    pub interviewer: InterviewerSummary,
}

/// A session together with the other party and any feedback.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionView {
    #[serde(flatten)]
    pub session: Session,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interviewer: Option<InterviewerSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub student: Option<StudentSummary>,
    pub feedback: Option<Feedback>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GuidanceInterviewer {
    #[serde(flatten)]
    pub interviewer: InterviewerSummary,
    pub education: Option<String>,
    pub roles_supported: Vec<String>,
    pub available_slots: Vec<AvailabilitySlot>,
}

// ---------- availability ----------

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSlotDto {
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SlotQuery {
    pub id: Uuid,
}

// ---------- feedback ----------

#[derive(Debug, Clone, Deserialize)]
#[serde(
    tag = "sessionType",
    rename_all = "UPPERCASE",
    rename_all_fields = "camelCase"
)]
pub enum FeedbackDetailsDto {
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

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitFeedbackDto {
    pub session_id: Uuid,
    #[serde(flatten)]
    pub details: FeedbackDetailsDto,
}

impl From<FeedbackDetailsDto> for FeedbackFields {
    fn from(dto: FeedbackDetailsDto) -> Self {
        match dto {
            FeedbackDetailsDto::Guidance {
                summary,
                strengths,
                recommendations,
                action_items,
            } => FeedbackFields::Guidance {
                summary,
                strengths,
                recommendations,
                action_items,
            },
            FeedbackDetailsDto::Interview {
                summary,
                technical_depth,
                problem_solving,
                communication,
                confidence,
                overall_comments,
                hiring_recommendation,
            } => FeedbackFields::Interview {
                summary,
                technical_depth,
                problem_solving,
                communication,
                confidence,
                overall_comments,
                hiring_recommendation,
            },
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackQuery {
    pub session_id: Uuid,
}

// ---------- admin ----------

#[derive(Debug, Clone, Default, Deserialize)]
pub struct InterviewerListQuery {
    pub status: Option<InterviewerStatus>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateInterviewerStatusDto {
    pub interviewer_id: Uuid,
    pub status: InterviewerStatus,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminInterviewerView {
    #[serde(flatten)]
    pub profile: InterviewerProfile,
    pub email: Option<String>,
    pub upcoming_sessions: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TopInterviewer {
    pub id: Uuid,
    pub name: String,
    pub completed_sessions: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsData {
    pub analytics: PlatformStats,
    pub recent_sessions: Vec<SessionView>,
    pub top_interviewers: Vec<TopInterviewer>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serde_json::json;

    use crate::utils::password::MAX_PASSWORD_LENGTH;

    #[test]
    fn feedback_payload_is_tagged_by_session_type() {
        let session_id = Uuid::new_v4();
        let dto: SubmitFeedbackDto = serde_json::from_value(json!({
            "sessionId": session_id,
            "sessionType": "INTERVIEW",
            "summary": "Good",
            "technicalDepth": 4,
            "problemSolving": 3,
            "communication": 5,
            "confidence": 2,
            "overallComments": "Keep going",
            "hiringRecommendation": "WEAK_HIRE"
        }))
        .unwrap();

        assert_eq!(dto.session_id, session_id);
        let fields: FeedbackFields = dto.details.into();
        assert_eq!(fields.session_type(), SessionType::Interview);
    }

    #[test]
    fn guidance_payload_requires_every_field() {
        let result = serde_json::from_value::<SubmitFeedbackDto>(json!({
            "sessionId": Uuid::new_v4(),
            "sessionType": "GUIDANCE",
            "summary": "Good",
            "strengths": "Curious"
        }));
        assert!(result.is_err());
    }

    #[test]
    fn signup_dto_validation() {
        let ok = SignupUserDto {
            email: "lee@example.com".to_string(),
            password: "hunter2".to_string(),
            role: "STUDENT".to_string(),
        };
        assert!(ok.validate().is_ok());

        let bad = SignupUserDto {
            email: "not-an-email".to_string(),
            password: "x".repeat(MAX_PASSWORD_LENGTH + 1),
            ..ok
        };
        let errors = bad.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("email"));
        assert!(errors.field_errors().contains_key("password"));
    }

    #[test]
    fn interviewer_lists_are_cleaned() {
        let input: InterviewerProfileInput = InterviewerProfileDto {
            name: "Quinn".to_string(),
            roles_supported: vec![" SRE ".to_string(), "".to_string()],
            difficulty_levels: vec![DifficultyLevel::Easy, DifficultyLevel::Easy],
            ..Default::default()
        }
        .into();

        assert_eq!(input.name, "Quinn");
        assert_eq!(input.roles_supported, vec!["SRE".to_string()]);
        assert_eq!(input.difficulty_levels, vec![DifficultyLevel::Easy]);
    }

    #[rstest]
    #[case::padded("  Quinn  ", Some("Quinn"))]
    #[case::blank("   ", None)]
    #[case::empty("", None)]
    fn profile_names_are_trimmed_before_validation(
        #[case] raw: &str,
        #[case] expected: Option<&str>,
    ) {
        let dto: StudentProfileDto = serde_json::from_value(json!({ "name": raw })).unwrap();
        match expected {
            Some(name) => {
                assert!(dto.validate().is_ok());
                assert_eq!(StudentProfileInput::from(dto).name, name);
            }
            None => assert!(dto.validate().is_err()),
        }
    }

    #[test]
    fn blank_guidance_topic_is_rejected() {
        let dto: BookGuidanceDto = serde_json::from_value(json!({
            "interviewerId": Uuid::new_v4(),
            "topic": " \t ",
            "durationMinutes": 30,
            "scheduledTime": "2030-01-01T10:00:00Z"
        }))
        .unwrap();

        assert_eq!(dto.topic, "");
        assert!(dto.validate().unwrap_err().field_errors().contains_key("topic"));
    }
}
