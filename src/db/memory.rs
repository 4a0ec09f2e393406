use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use uuid::Uuid;

use super::{
    DbError, InterviewerProfileInput, NewFeedback, NewPendingUser, NewSession, ProfileExt,
    SessionExt, SlotExt, StudentProfileInput, UserExt,
};
use crate::models::{
    AuthProvider, AvailabilitySlot, Feedback, InterviewerProfile, InterviewerStatus,
    PendingUser, PlatformStats, Session, SessionStatus, SessionType, StudentProfile, User,
};

#[derive(Debug, Default)]
struct Tables {
    users: Vec<User>,
    pending_users: Vec<PendingUser>,
    student_profiles: Vec<StudentProfile>,
    interviewer_profiles: Vec<InterviewerProfile>,
    slots: Vec<AvailabilitySlot>,
    sessions: Vec<Session>,
    feedback: Vec<Feedback>,
}

impl Tables {
    fn interviewer_busy(
        &self,
        interviewer_id: Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> bool {
        self.sessions
            .iter()
            .any(|s| s.interviewer_id == interviewer_id && s.overlaps(start, end))
    }

    fn insert_session(&mut self, session: NewSession) -> Session {
        let now = Utc::now();
        let created = Session {
            id: Uuid::new_v4(),
            student_id: session.student_id,
            interviewer_id: session.interviewer_id,
            session_type: session.session_type,
            topic: session.topic,
            role: session.role,
            difficulty: session.difficulty,
            interview_type: session.interview_type,
            duration_minutes: session.duration_minutes,
            scheduled_time: session.scheduled_time,
            status: SessionStatus::Scheduled,
            created_at: now,
            updated_at: now,
        };
        self.sessions.push(created.clone());
        created
    }
}

/// Process-local store. Every method runs under a single lock, so the
/// multi-row operations are atomic with respect to each other.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserExt for MemoryStore {
    async fn get_user(
        &self,
        user_id: Option<Uuid>,
        email: Option<&str>,
    ) -> Result<Option<User>, DbError> {
        let tables = self.tables.lock();
        let user = match (user_id, email) {
            (Some(id), _) => tables.users.iter().find(|u| u.id == id),
            (None, Some(email)) => tables.users.iter().find(|u| u.email == email),
            (None, None) => None,
        };
        Ok(user.cloned())
    }

    async fn get_pending_user(&self, email: &str) -> Result<Option<PendingUser>, DbError> {
        let tables = self.tables.lock();
        Ok(tables
            .pending_users
            .iter()
            .find(|p| p.email == email)
            .cloned())
    }

    async fn save_pending_user(&self, pending: NewPendingUser) -> Result<PendingUser, DbError> {
        let mut tables = self.tables.lock();
        let (id, created_at) = tables
            .pending_users
            .iter()
            .find(|p| p.email == pending.email)
            .map(|p| (p.id, p.created_at))
            .unwrap_or_else(|| (Uuid::new_v4(), Utc::now()));

        let saved = PendingUser {
            id,
            email: pending.email,
            password: pending.password,
            role: pending.role,
            otp: pending.otp,
            otp_sent_at: pending.otp_sent_at,
            otp_expires_at: pending.otp_expires_at,
            account_expires_at: pending.account_expires_at,
            created_at,
        };
        tables.pending_users.retain(|p| p.email != saved.email);
        tables.pending_users.push(saved.clone());
        Ok(saved)
    }

    async fn refresh_pending_otp(
        &self,
        email: &str,
        otp: &str,
        sent_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Result<(), DbError> {
        let mut tables = self.tables.lock();
        let pending = tables
            .pending_users
            .iter_mut()
            .find(|p| p.email == email)
            .ok_or(DbError::NotFound)?;

        pending.otp = otp.to_string();
        pending.otp_sent_at = sent_at;
        pending.otp_expires_at = expires_at;
        Ok(())
    }

    async fn delete_pending_user(&self, email: &str) -> Result<(), DbError> {
        self.tables.lock().pending_users.retain(|p| p.email != email);
        Ok(())
    }

    async fn activate_pending_user(&self, email: &str) -> Result<User, DbError> {
        let mut tables = self.tables.lock();
        let pending = tables
            .pending_users
            .iter()
            .find(|p| p.email == email)
            .cloned()
            .ok_or(DbError::NotFound)?;

        if tables.users.iter().any(|u| u.email == pending.email) {
            return Err(DbError::Duplicate("email"));
        }

        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            email: pending.email,
            role: pending.role,
            provider: AuthProvider::Email,
            password: pending.password,
            created_at: now,
            updated_at: now,
        };
        tables.users.push(user.clone());
        tables.pending_users.retain(|p| p.id != pending.id);
        Ok(user)
    }
}

#[async_trait]
impl ProfileExt for MemoryStore {
    async fn get_student_profile(&self, user_id: Uuid) -> Result<Option<StudentProfile>, DbError> {
        let tables = self.tables.lock();
        Ok(tables
            .student_profiles
            .iter()
            .find(|p| p.user_id == user_id)
            .cloned())
    }

    async fn get_student_profile_by_id(
        &self,
        profile_id: Uuid,
    ) -> Result<Option<StudentProfile>, DbError> {
        let tables = self.tables.lock();
        Ok(tables
            .student_profiles
            .iter()
            .find(|p| p.id == profile_id)
            .cloned())
    }

    async fn upsert_student_profile(
        &self,
        user_id: Uuid,
        input: StudentProfileInput,
    ) -> Result<StudentProfile, DbError> {
        let mut tables = self.tables.lock();
        let now = Utc::now();

        if let Some(profile) = tables
            .student_profiles
            .iter_mut()
            .find(|p| p.user_id == user_id)
        {
            profile.name = input.name;
            profile.college = input.college;
            profile.branch = input.branch;
            profile.graduation_year = input.graduation_year;
            profile.target_role = input.target_role;
            profile.experience_level = input.experience_level;
            profile.updated_at = now;
            return Ok(profile.clone());
        }

        let profile = StudentProfile {
            id: Uuid::new_v4(),
            user_id,
            name: input.name,
            college: input.college,
            branch: input.branch,
            graduation_year: input.graduation_year,
            target_role: input.target_role,
            experience_level: input.experience_level,
            resume_url: None,
            created_at: now,
            updated_at: now,
        };
        tables.student_profiles.push(profile.clone());
        Ok(profile)
    }

    async fn set_student_resume(
        &self,
        user_id: Uuid,
        resume_url: Option<&str>,
    ) -> Result<StudentProfile, DbError> {
        let mut tables = self.tables.lock();
        let profile = tables
            .student_profiles
            .iter_mut()
            .find(|p| p.user_id == user_id)
            .ok_or(DbError::NotFound)?;

        profile.resume_url = resume_url.map(str::to_string);
        profile.updated_at = Utc::now();
        Ok(profile.clone())
    }

    async fn get_interviewer_profile(
        &self,
        user_id: Uuid,
    ) -> Result<Option<InterviewerProfile>, DbError> {
        let tables = self.tables.lock();
        Ok(tables
            .interviewer_profiles
            .iter()
            .find(|p| p.user_id == user_id)
            .cloned())
    }

    async fn get_interviewer_profile_by_id(
        &self,
        profile_id: Uuid,
    ) -> Result<Option<InterviewerProfile>, DbError> {
        let tables = self.tables.lock();
        Ok(tables
            .interviewer_profiles
            .iter()
            .find(|p| p.id == profile_id)
            .cloned())
    }

    async fn upsert_interviewer_profile(
        &self,
        user_id: Uuid,
        input: InterviewerProfileInput,
    ) -> Result<InterviewerProfile, DbError> {
        let mut tables = self.tables.lock();
        let now = Utc::now();

        if let Some(profile) = tables
            .interviewer_profiles
            .iter_mut()
            .find(|p| p.user_id == user_id)
        {
            profile.name = input.name;
            profile.education = input.education;
            profile.companies = input.companies;
            profile.years_of_experience = input.years_of_experience;
            profile.roles_supported = input.roles_supported;
            profile.difficulty_levels = input.difficulty_levels;
            profile.session_types_offered = input.session_types_offered;
            profile.linkedin_url = input.linkedin_url;
            profile.updated_at = now;
            return Ok(profile.clone());
        }

        let profile = InterviewerProfile {
            id: Uuid::new_v4(),
            user_id,
            name: input.name,
            education: input.education,
            companies: input.companies,
            years_of_experience: input.years_of_experience,
            roles_supported: input.roles_supported,
            difficulty_levels: input.difficulty_levels,
            session_types_offered: input.session_types_offered,
            linkedin_url: input.linkedin_url,
            resume_url: None,
            id_card_url: None,
            status: InterviewerStatus::Pending,
            created_at: now,
            updated_at: now,
        };
        tables.interviewer_profiles.push(profile.clone());
        Ok(profile)
    }

    async fn set_interviewer_documents(
        &self,
        user_id: Uuid,
        resume_url: Option<&str>,
        id_card_url: Option<&str>,
    ) -> Result<InterviewerProfile, DbError> {
        let mut tables = self.tables.lock();
        let profile = tables
            .interviewer_profiles
            .iter_mut()
            .find(|p| p.user_id == user_id)
            .ok_or(DbError::NotFound)?;

        if let Some(url) = resume_url {
            profile.resume_url = Some(url.to_string());
        }
        if let Some(url) = id_card_url {
            profile.id_card_url = Some(url.to_string());
        }
        profile.updated_at = Utc::now();
        Ok(profile.clone())
    }

    async fn list_interviewers(
        &self,
        status: Option<InterviewerStatus>,
    ) -> Result<Vec<InterviewerProfile>, DbError> {
        let tables = self.tables.lock();
        let mut profiles: Vec<InterviewerProfile> = tables
            .interviewer_profiles
            .iter()
            .filter(|p| status.map_or(true, |s| p.status == s))
            .cloned()
            .collect();
        profiles.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(profiles)
    }

    async fn set_interviewer_status(
        &self,
        profile_id: Uuid,
        status: InterviewerStatus,
    ) -> Result<InterviewerProfile, DbError> {
        let mut tables = self.tables.lock();
        let profile = tables
            .interviewer_profiles
            .iter_mut()
            .find(|p| p.id == profile_id)
            .ok_or(DbError::NotFound)?;

        profile.status = status;
        profile.updated_at = Utc::now();
        Ok(profile.clone())
    }
}

#[async_trait]
impl SlotExt for MemoryStore {
    async fn list_slots(&self, interviewer_id: Uuid) -> Result<Vec<AvailabilitySlot>, DbError> {
        let tables = self.tables.lock();
        let mut slots: Vec<AvailabilitySlot> = tables
            .slots
            .iter()
            .filter(|s| s.interviewer_id == interviewer_id)
            .cloned()
            .collect();
        slots.sort_by_key(|s| s.start_time);
        Ok(slots)
    }

    async fn list_open_slots(
        &self,
        interviewer_id: Uuid,
        from: DateTime<Utc>,
    ) -> Result<Vec<AvailabilitySlot>, DbError> {
        let tables = self.tables.lock();
        let mut slots: Vec<AvailabilitySlot> = tables
            .slots
            .iter()
            .filter(|s| s.interviewer_id == interviewer_id && !s.is_booked && s.start_time >= from)
            .cloned()
            .collect();
        slots.sort_by_key(|s| s.start_time);
        Ok(slots)
    }

    async fn create_slot(
        &self,
        interviewer_id: Uuid,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
    ) -> Result<AvailabilitySlot, DbError> {
        let mut tables = self.tables.lock();
        if !tables.interviewer_profiles.iter().any(|p| p.id == interviewer_id) {
            return Err(DbError::NotFound);
        }

        let slot = AvailabilitySlot {
            id: Uuid::new_v4(),
            interviewer_id,
            start_time,
            end_time,
            is_booked: false,
            created_at: Utc::now(),
        };
        tables.slots.push(slot.clone());
        Ok(slot)
    }

    async fn delete_free_slot(
        &self,
        slot_id: Uuid,
        interviewer_id: Uuid,
    ) -> Result<bool, DbError> {
        let mut tables = self.tables.lock();
        let before = tables.slots.len();
        tables
            .slots
            .retain(|s| !(s.id == slot_id && s.interviewer_id == interviewer_id && !s.is_booked));
        Ok(tables.slots.len() < before)
    }
}

#[async_trait]
impl SessionExt for MemoryStore {
    async fn book_slot(&self, session: NewSession) -> Result<Session, DbError> {
        let mut tables = self.tables.lock();

        if tables.interviewer_busy(session.interviewer_id, session.scheduled_time, session.end_time()) {
            return Err(DbError::SlotUnavailable);
        }

        let slot = tables
            .slots
            .iter_mut()
            .filter(|s| {
                s.interviewer_id == session.interviewer_id
                    && s.start_time == session.scheduled_time
                    && !s.is_booked
            })
            .min_by_key(|s| s.created_at)
            .ok_or(DbError::SlotUnavailable)?;
        slot.is_booked = true;

        Ok(tables.insert_session(session))
    }

    async fn create_session_if_free(&self, session: NewSession) -> Result<Session, DbError> {
        let mut tables = self.tables.lock();

        if tables.interviewer_busy(session.interviewer_id, session.scheduled_time, session.end_time()) {
            return Err(DbError::InterviewerBusy);
        }

        Ok(tables.insert_session(session))
    }

    async fn get_session(&self, session_id: Uuid) -> Result<Option<Session>, DbError> {
        let tables = self.tables.lock();
        Ok(tables.sessions.iter().find(|s| s.id == session_id).cloned())
    }

    async fn list_student_sessions(&self, student_id: Uuid) -> Result<Vec<Session>, DbError> {
        let tables = self.tables.lock();
        let mut sessions: Vec<Session> = tables
            .sessions
            .iter()
            .filter(|s| s.student_id == student_id)
            .cloned()
            .collect();
        sessions.sort_by(|a, b| b.scheduled_time.cmp(&a.scheduled_time));
        Ok(sessions)
    }

    async fn list_interviewer_sessions(
        &self,
        interviewer_id: Uuid,
    ) -> Result<Vec<Session>, DbError> {
        let tables = self.tables.lock();
        let mut sessions: Vec<Session> = tables
            .sessions
            .iter()
            .filter(|s| s.interviewer_id == interviewer_id)
            .cloned()
            .collect();
        sessions.sort_by(|a, b| b.scheduled_time.cmp(&a.scheduled_time));
        Ok(sessions)
    }

    async fn recent_sessions(&self, limit: i64) -> Result<Vec<Session>, DbError> {
        let tables = self.tables.lock();
        let mut sessions = tables.sessions.clone();
        sessions.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        sessions.truncate(usize::try_from(limit).unwrap_or(0));
        Ok(sessions)
    }

    async fn count_sessions(
        &self,
        interviewer_id: Uuid,
        status: SessionStatus,
    ) -> Result<i64, DbError> {
        let tables = self.tables.lock();
        let count = tables
            .sessions
            .iter()
            .filter(|s| s.interviewer_id == interviewer_id && s.status == status)
            .count();
        Ok(count as i64)
    }

    async fn count_upcoming_sessions(
        &self,
        interviewer_id: Uuid,
        from: DateTime<Utc>,
    ) -> Result<i64, DbError> {
        let tables = self.tables.lock();
        let count = tables
            .sessions
            .iter()
            .filter(|s| {
                s.interviewer_id == interviewer_id
                    && s.status == SessionStatus::Scheduled
                    && s.scheduled_time >= from
            })
            .count();
        Ok(count as i64)
    }

    async fn has_overlapping_session(
        &self,
        interviewer_id: Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<bool, DbError> {
        Ok(self.tables.lock().interviewer_busy(interviewer_id, start, end))
    }

    async fn complete_with_feedback(&self, feedback: NewFeedback) -> Result<Feedback, DbError> {
        let mut tables = self.tables.lock();

        if tables.feedback.iter().any(|f| f.session_id == feedback.session_id) {
            return Err(DbError::FeedbackExists);
        }

        let session = tables
            .sessions
            .iter_mut()
            .find(|s| s.id == feedback.session_id)
            .ok_or(DbError::NotFound)?;
        session.status = SessionStatus::Completed;
        session.updated_at = Utc::now();

        let record = feedback.into_record(Uuid::new_v4(), Utc::now());
        tables.feedback.push(record.clone());
        Ok(record)
    }

    async fn get_feedback(&self, session_id: Uuid) -> Result<Option<Feedback>, DbError> {
        let tables = self.tables.lock();
        Ok(tables
            .feedback
            .iter()
            .find(|f| f.session_id == session_id)
            .cloned())
    }

    async fn platform_stats(&self) -> Result<PlatformStats, DbError> {
        let tables = self.tables.lock();
        let interviewers_with = |status: InterviewerStatus| {
            tables
                .interviewer_profiles
                .iter()
                .filter(|p| p.status == status)
                .count() as i64
        };
        let sessions_with =
            |status: SessionStatus| tables.sessions.iter().filter(|s| s.status == status).count() as i64;
        let sessions_of = |kind: SessionType| {
            tables
                .sessions
                .iter()
                .filter(|s| s.session_type == kind)
                .count() as i64
        };

        Ok(PlatformStats {
            total_students: tables.student_profiles.len() as i64,
            total_interviewers: tables.interviewer_profiles.len() as i64,
            pending_interviewers: interviewers_with(InterviewerStatus::Pending),
            approved_interviewers: interviewers_with(InterviewerStatus::Approved),
            total_sessions: tables.sessions.len() as i64,
            completed_sessions: sessions_with(SessionStatus::Completed),
            scheduled_sessions: sessions_with(SessionStatus::Scheduled),
            guidance_sessions: sessions_of(SessionType::Guidance),
            interview_sessions: sessions_of(SessionType::Interview),
        })
    }
}
