use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use super::{
    DbError, InterviewerProfileInput, NewFeedback, NewPendingUser, NewSession,
    ProfileExt, SessionExt, SlotExt, StudentProfileInput, UserExt,
};
use crate::models::{
    AvailabilitySlot, Feedback, InterviewerProfile, InterviewerStatus, PendingUser,
    PlatformStats, Session, SessionStatus, StudentProfile, User,
};

#[derive(Debug, Clone)]
pub struct DbClient {
    pub pool: PgPool,
}

impl DbClient {
    pub fn new(pool: PgPool) -> Self {
        DbClient { pool }
    }
}

fn unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db_err) if db_err.is_unique_violation())
}

/// Serializes bookings per interviewer and reports whether `[start, end)`
/// is already taken by a non-cancelled session.
async fn lock_and_check_overlap(
    tx: &mut Transaction<'_, Postgres>,
    interviewer_id: Uuid,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Result<bool, DbError> {
    sqlx::query("SELECT id FROM interviewer_profiles WHERE id = $1 FOR UPDATE")
        .bind(interviewer_id)
        .fetch_optional(&mut **tx)
        .await?
        .ok_or(DbError::NotFound)?;

    let busy: bool = sqlx::query_scalar(
        r#"
        SELECT EXISTS (
            SELECT 1 FROM sessions
            WHERE interviewer_id = $1
              AND status <> 'CANCELLED'
              AND scheduled_time < $3
              AND scheduled_time + make_interval(mins => duration_minutes) > $2
        )
        "#,
    )
    .bind(interviewer_id)
    .bind(start)
    .bind(end)
    .fetch_one(&mut **tx)
    .await?;

    Ok(busy)
}

async fn insert_session(
    tx: &mut Transaction<'_, Postgres>,
    session: &NewSession,
) -> Result<Session, DbError> {
    let created = sqlx::query_as::<_, Session>(
        r#"
        INSERT INTO sessions
            (student_id, interviewer_id, session_type, topic, role, difficulty,
             interview_type, duration_minutes, scheduled_time)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        RETURNING *
        "#,
    )
    .bind(session.student_id)
    .bind(session.interviewer_id)
    .bind(session.session_type)
    .bind(&session.topic)
    .bind(&session.role)
    .bind(session.difficulty)
    .bind(session.interview_type)
    .bind(session.duration_minutes)
    .bind(session.scheduled_time)
    .fetch_one(&mut **tx)
    .await?;

    Ok(created)
}

#[async_trait]
impl UserExt for DbClient {
    async fn get_user(
        &self,
        user_id: Option<Uuid>,
        email: Option<&str>,
    ) -> Result<Option<User>, DbError> {
        let user = if let Some(user_id) = user_id {
            sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
                .bind(user_id)
                .fetch_optional(&self.pool)
                .await?
        } else if let Some(email) = email {
            sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = $1")
                .bind(email)
                .fetch_optional(&self.pool)
                .await?
        } else {
            None
        };

        Ok(user)
    }

    async fn get_pending_user(&self, email: &str) -> Result<Option<PendingUser>, DbError> {
        let pending = sqlx::query_as::<_, PendingUser>("SELECT * FROM pending_users WHERE email = $1")
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;

        Ok(pending)
    }

    async fn save_pending_user(&self, pending: NewPendingUser) -> Result<PendingUser, DbError> {
        let saved = sqlx::query_as::<_, PendingUser>(
            r#"
            INSERT INTO pending_users
                (email, password, role, otp, otp_sent_at, otp_expires_at, account_expires_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (email) DO UPDATE SET
                password = EXCLUDED.password,
                role = EXCLUDED.role,
                otp = EXCLUDED.otp,
                otp_sent_at = EXCLUDED.otp_sent_at,
                otp_expires_at = EXCLUDED.otp_expires_at,
                account_expires_at = EXCLUDED.account_expires_at
            RETURNING *
            "#,
        )
        .bind(&pending.email)
        .bind(&pending.password)
        .bind(pending.role)
        .bind(&pending.otp)
        .bind(pending.otp_sent_at)
        .bind(pending.otp_expires_at)
        .bind(pending.account_expires_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(saved)
    }

    async fn refresh_pending_otp(
        &self,
        email: &str,
        otp: &str,
        sent_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Result<(), DbError> {
        let result = sqlx::query(
            "UPDATE pending_users SET otp = $1, otp_sent_at = $2, otp_expires_at = $3 WHERE email = $4",
        )
        .bind(otp)
        .bind(sent_at)
        .bind(expires_at)
        .bind(email)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::NotFound);
        }
        Ok(())
    }

    async fn delete_pending_user(&self, email: &str) -> Result<(), DbError> {
        sqlx::query("DELETE FROM pending_users WHERE email = $1")
            .bind(email)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn activate_pending_user(&self, email: &str) -> Result<User, DbError> {
        let mut tx = self.pool.begin().await?;

        let pending = sqlx::query_as::<_, PendingUser>(
            "SELECT * FROM pending_users WHERE email = $1 FOR UPDATE",
        )
        .bind(email)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(DbError::NotFound)?;

        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (email, password, role, provider)
            VALUES ($1, $2, $3, 'EMAIL')
            RETURNING *
            "#,
        )
        .bind(&pending.email)
        .bind(&pending.password)
        .bind(pending.role)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            if unique_violation(&e) {
                DbError::Duplicate("email")
            } else {
                DbError::Sqlx(e)
            }
        })?;

        sqlx::query("DELETE FROM pending_users WHERE id = $1")
            .bind(pending.id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(user)
    }
}

#[async_trait]
impl ProfileExt for DbClient {
    async fn get_student_profile(&self, user_id: Uuid) -> Result<Option<StudentProfile>, DbError> {
        let profile =
            sqlx::query_as::<_, StudentProfile>("SELECT * FROM student_profiles WHERE user_id = $1")
                .bind(user_id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(profile)
    }

    async fn get_student_profile_by_id(
        &self,
        profile_id: Uuid,
    ) -> Result<Option<StudentProfile>, DbError> {
        let profile =
            sqlx::query_as::<_, StudentProfile>("SELECT * FROM student_profiles WHERE id = $1")
                .bind(profile_id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(profile)
    }

    async fn upsert_student_profile(
        &self,
        user_id: Uuid,
        input: StudentProfileInput,
    ) -> Result<StudentProfile, DbError> {
        let profile = sqlx::query_as::<_, StudentProfile>(
            r#"
            INSERT INTO student_profiles
                (user_id, name, college, branch, graduation_year, target_role, experience_level)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (user_id) DO UPDATE SET
                name = EXCLUDED.name,
                college = EXCLUDED.college,
                branch = EXCLUDED.branch,
                graduation_year = EXCLUDED.graduation_year,
                target_role = EXCLUDED.target_role,
                experience_level = EXCLUDED.experience_level,
                updated_at = NOW()
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(&input.name)
        .bind(&input.college)
        .bind(&input.branch)
        .bind(input.graduation_year)
        .bind(&input.target_role)
        .bind(&input.experience_level)
        .fetch_one(&self.pool)
        .await?;

        Ok(profile)
    }

    async fn set_student_resume(
        &self,
        user_id: Uuid,
        resume_url: Option<&str>,
    ) -> Result<StudentProfile, DbError> {
        sqlx::query_as::<_, StudentProfile>(
            "UPDATE student_profiles SET resume_url = $1, updated_at = NOW() WHERE user_id = $2 RETURNING *",
        )
        .bind(resume_url)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(DbError::NotFound)
    }

    async fn get_interviewer_profile(
        &self,
        user_id: Uuid,
    ) -> Result<Option<InterviewerProfile>, DbError> {
        let profile = sqlx::query_as::<_, InterviewerProfile>(
            "SELECT * FROM interviewer_profiles WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(profile)
    }

    async fn get_interviewer_profile_by_id(
        &self,
        profile_id: Uuid,
    ) -> Result<Option<InterviewerProfile>, DbError> {
        let profile =
            sqlx::query_as::<_, InterviewerProfile>("SELECT * FROM interviewer_profiles WHERE id = $1")
                .bind(profile_id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(profile)
    }

    async fn upsert_interviewer_profile(
        &self,
        user_id: Uuid,
        input: InterviewerProfileInput,
    ) -> Result<InterviewerProfile, DbError> {
        let profile = sqlx::query_as::<_, InterviewerProfile>(
            r#"
            INSERT INTO interviewer_profiles
                (user_id, name, education, companies, years_of_experience, roles_supported,
                 difficulty_levels, session_types_offered, linkedin_url)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ON CONFLICT (user_id) DO UPDATE SET
                name = EXCLUDED.name,
                education = EXCLUDED.education,
                companies = EXCLUDED.companies,
                years_of_experience = EXCLUDED.years_of_experience,
                roles_supported = EXCLUDED.roles_supported,
                difficulty_levels = EXCLUDED.difficulty_levels,
                session_types_offered = EXCLUDED.session_types_offered,
                linkedin_url = EXCLUDED.linkedin_url,
                updated_at = NOW()
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(&input.name)
        .bind(&input.education)
        .bind(&input.companies)
        .bind(input.years_of_experience)
        .bind(&input.roles_supported)
        .bind(&input.difficulty_levels)
        .bind(&input.session_types_offered)
        .bind(&input.linkedin_url)
        .fetch_one(&self.pool)
        .await?;

        Ok(profile)
    }

    async fn set_interviewer_documents(
        &self,
        user_id: Uuid,
        resume_url: Option<&str>,
        id_card_url: Option<&str>,
    ) -> Result<InterviewerProfile, DbError> {
        sqlx::query_as::<_, InterviewerProfile>(
            r#"
            UPDATE interviewer_profiles SET
                resume_url = COALESCE($1, resume_url),
                id_card_url = COALESCE($2, id_card_url),
                updated_at = NOW()
            WHERE user_id = $3
            RETURNING *
            "#,
        )
        .bind(resume_url)
        .bind(id_card_url)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(DbError::NotFound)
    }

    async fn list_interviewers(
        &self,
        status: Option<InterviewerStatus>,
    ) -> Result<Vec<InterviewerProfile>, DbError> {
        let profiles = sqlx::query_as::<_, InterviewerProfile>(
            r#"
            SELECT * FROM interviewer_profiles
            WHERE ($1::interviewer_status IS NULL OR status = $1)
            ORDER BY created_at DESC
            "#,
        )
        .bind(status)
        .fetch_all(&self.pool)
        .await?;

        Ok(profiles)
    }

    async fn set_interviewer_status(
        &self,
        profile_id: Uuid,
        status: InterviewerStatus,
    ) -> Result<InterviewerProfile, DbError> {
        sqlx::query_as::<_, InterviewerProfile>(
            "UPDATE interviewer_profiles SET status = $1, updated_at = NOW() WHERE id = $2 RETURNING *",
        )
        .bind(status)
        .bind(profile_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(DbError::NotFound)
    }
}

#[async_trait]
impl SlotExt for DbClient {
    async fn list_slots(&self, interviewer_id: Uuid) -> Result<Vec<AvailabilitySlot>, DbError> {
        let slots = sqlx::query_as::<_, AvailabilitySlot>(
            "SELECT * FROM availability_slots WHERE interviewer_id = $1 ORDER BY start_time ASC",
        )
        .bind(interviewer_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(slots)
    }

    async fn list_open_slots(
        &self,
        interviewer_id: Uuid,
        from: DateTime<Utc>,
    ) -> Result<Vec<AvailabilitySlot>, DbError> {
        let slots = sqlx::query_as::<_, AvailabilitySlot>(
            r#"
            SELECT * FROM availability_slots
            WHERE interviewer_id = $1 AND is_booked = FALSE AND start_time >= $2
            ORDER BY start_time ASC
            "#,
        )
        .bind(interviewer_id)
        .bind(from)
        .fetch_all(&self.pool)
        .await?;

        Ok(slots)
    }

    async fn create_slot(
        &self,
        interviewer_id: Uuid,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
    ) -> Result<AvailabilitySlot, DbError> {
        let slot = sqlx::query_as::<_, AvailabilitySlot>(
            r#"
            INSERT INTO availability_slots (interviewer_id, start_time, end_time)
            VALUES ($1, $2, $3)
            RETURNING *
            "#,
        )
        .bind(interviewer_id)
        .bind(start_time)
        .bind(end_time)
        .fetch_one(&self.pool)
        .await?;

        Ok(slot)
    }

    async fn delete_free_slot(
        &self,
        slot_id: Uuid,
        interviewer_id: Uuid,
    ) -> Result<bool, DbError> {
        let result = sqlx::query(
            "DELETE FROM availability_slots WHERE id = $1 AND interviewer_id = $2 AND is_booked = FALSE",
        )
        .bind(slot_id)
        .bind(interviewer_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl SessionExt for DbClient {
    async fn book_slot(&self, session: NewSession) -> Result<Session, DbError> {
        let mut tx = self.pool.begin().await?;

        if lock_and_check_overlap(
            &mut tx,
            session.interviewer_id,
            session.scheduled_time,
            session.end_time(),
        )
        .await?
        {
            return Err(DbError::SlotUnavailable);
        }

        // The row lock makes a concurrent booker re-read is_booked after we commit.
        let slot_id: Option<Uuid> = sqlx::query_scalar(
            r#"
            UPDATE availability_slots SET is_booked = TRUE
            WHERE id = (
                SELECT id FROM availability_slots
                WHERE interviewer_id = $1 AND start_time = $2 AND is_booked = FALSE
                ORDER BY created_at
                LIMIT 1
                FOR UPDATE
            )
            AND is_booked = FALSE
            RETURNING id
            "#,
        )
        .bind(session.interviewer_id)
        .bind(session.scheduled_time)
        .fetch_optional(&mut *tx)
        .await?;

        if slot_id.is_none() {
            return Err(DbError::SlotUnavailable);
        }

        let created = insert_session(&mut tx, &session).await?;
        tx.commit().await?;

        Ok(created)
    }

    async fn create_session_if_free(&self, session: NewSession) -> Result<Session, DbError> {
        let mut tx = self.pool.begin().await?;

        if lock_and_check_overlap(
            &mut tx,
            session.interviewer_id,
            session.scheduled_time,
            session.end_time(),
        )
        .await?
        {
            return Err(DbError::InterviewerBusy);
        }

        let created = insert_session(&mut tx, &session).await?;
        tx.commit().await?;

        Ok(created)
    }

    async fn get_session(&self, session_id: Uuid) -> Result<Option<Session>, DbError> {
        let session = sqlx::query_as::<_, Session>("SELECT * FROM sessions WHERE id = $1")
            .bind(session_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(session)
    }

    async fn list_student_sessions(&self, student_id: Uuid) -> Result<Vec<Session>, DbError> {
        let sessions = sqlx::query_as::<_, Session>(
            "SELECT * FROM sessions WHERE student_id = $1 ORDER BY scheduled_time DESC",
        )
        .bind(student_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(sessions)
    }

    async fn list_interviewer_sessions(
        &self,
        interviewer_id: Uuid,
    ) -> Result<Vec<Session>, DbError> {
        let sessions = sqlx::query_as::<_, Session>(
            "SELECT * FROM sessions WHERE interviewer_id = $1 ORDER BY scheduled_time DESC",
        )
        .bind(interviewer_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(sessions)
    }

    async fn recent_sessions(&self, limit: i64) -> Result<Vec<Session>, DbError> {
        let sessions =
            sqlx::query_as::<_, Session>("SELECT * FROM sessions ORDER BY created_at DESC LIMIT $1")
                .bind(limit)
                .fetch_all(&self.pool)
                .await?;

        Ok(sessions)
    }

    async fn count_sessions(
        &self,
        interviewer_id: Uuid,
        status: SessionStatus,
    ) -> Result<i64, DbError> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM sessions WHERE interviewer_id = $1 AND status = $2",
        )
        .bind(interviewer_id)
        .bind(status)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }

    async fn count_upcoming_sessions(
        &self,
        interviewer_id: Uuid,
        from: DateTime<Utc>,
    ) -> Result<i64, DbError> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM sessions
            WHERE interviewer_id = $1 AND status = 'SCHEDULED' AND scheduled_time >= $2
            "#,
        )
        .bind(interviewer_id)
        .bind(from)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }

    async fn has_overlapping_session(
        &self,
        interviewer_id: Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<bool, DbError> {
        let busy: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM sessions
                WHERE interviewer_id = $1
                  AND status <> 'CANCELLED'
                  AND scheduled_time < $3
                  AND scheduled_time + make_interval(mins => duration_minutes) > $2
            )
            "#,
        )
        .bind(interviewer_id)
        .bind(start)
        .bind(end)
        .fetch_one(&self.pool)
        .await?;

        Ok(busy)
    }

    async fn complete_with_feedback(&self, feedback: NewFeedback) -> Result<Feedback, DbError> {
        let record = feedback.into_record(Uuid::nil(), Utc::now());
        let mut tx = self.pool.begin().await?;

        let created = sqlx::query_as::<_, Feedback>(
            r#"
            INSERT INTO feedback
                (session_id, interviewer_id, summary, strengths, recommendations, action_items,
                 technical_depth, problem_solving, communication, confidence, overall_comments,
                 hiring_recommendation)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            RETURNING *
            "#,
        )
        .bind(record.session_id)
        .bind(record.interviewer_id)
        .bind(&record.summary)
        .bind(&record.strengths)
        .bind(&record.recommendations)
        .bind(&record.action_items)
        .bind(record.technical_depth)
        .bind(record.problem_solving)
        .bind(record.communication)
        .bind(record.confidence)
        .bind(&record.overall_comments)
        .bind(record.hiring_recommendation)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            if unique_violation(&e) {
                DbError::FeedbackExists
            } else {
                DbError::Sqlx(e)
            }
        })?;

        let updated = sqlx::query(
            "UPDATE sessions SET status = 'COMPLETED', updated_at = NOW() WHERE id = $1",
        )
        .bind(record.session_id)
        .execute(&mut *tx)
        .await?;

        if updated.rows_affected() == 0 {
            return Err(DbError::NotFound);
        }

        tx.commit().await?;
        Ok(created)
    }

    async fn get_feedback(&self, session_id: Uuid) -> Result<Option<Feedback>, DbError> {
        let feedback = sqlx::query_as::<_, Feedback>("SELECT * FROM feedback WHERE session_id = $1")
            .bind(session_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(feedback)
    }

    async fn platform_stats(&self) -> Result<PlatformStats, DbError> {
        let stats = sqlx::query_as::<_, PlatformStats>(
            r#"
            SELECT
                (SELECT COUNT(*) FROM student_profiles) AS total_students,
                (SELECT COUNT(*) FROM interviewer_profiles) AS total_interviewers,
                (SELECT COUNT(*) FROM interviewer_profiles WHERE status = 'PENDING') AS pending_interviewers,
                (SELECT COUNT(*) FROM interviewer_profiles WHERE status = 'APPROVED') AS approved_interviewers,
                (SELECT COUNT(*) FROM sessions) AS total_sessions,
                (SELECT COUNT(*) FROM sessions WHERE status = 'COMPLETED') AS completed_sessions,
                (SELECT COUNT(*) FROM sessions WHERE status = 'SCHEDULED') AS scheduled_sessions,
                (SELECT COUNT(*) FROM sessions WHERE session_type = 'GUIDANCE') AS guidance_sessions,
                (SELECT COUNT(*) FROM sessions WHERE session_type = 'INTERVIEW') AS interview_sessions
            "#,
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;
    use crate::{
        db::FeedbackFields,
        models::{HiringRecommendation, SessionType, UserRole},
    };

    async fn user(db: &DbClient, email: &str, role: UserRole) -> User {
        let now = Utc::now();
        db.save_pending_user(NewPendingUser {
            email: email.to_string(),
            password: "hash".to_string(),
            role,
            otp: "123456".to_string(),
            otp_sent_at: now,
            otp_expires_at: now + Duration::minutes(10),
            account_expires_at: now + Duration::hours(24),
        })
        .await
        .unwrap();
        db.activate_pending_user(email).await.unwrap()
    }

    async fn student(db: &DbClient, email: &str) -> StudentProfile {
        let user = user(db, email, UserRole::Student).await;
        db.upsert_student_profile(
            user.id,
            StudentProfileInput {
                name: "Quinn".to_string(),
                ..Default::default()
            },
        )
        .await
        .unwrap()
    }

    async fn approved_interviewer(db: &DbClient) -> InterviewerProfile {
        let user = user(db, "mentor@example.com", UserRole::Interviewer).await;
        let profile = db
            .upsert_interviewer_profile(
                user.id,
                InterviewerProfileInput {
                    name: "Rowan".to_string(),
                    session_types_offered: vec![SessionType::Guidance, SessionType::Interview],
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        db.set_interviewer_status(profile.id, InterviewerStatus::Approved)
            .await
            .unwrap()
    }

    fn session(
        student_id: Uuid,
        interviewer_id: Uuid,
        session_type: SessionType,
        at: DateTime<Utc>,
    ) -> NewSession {
        NewSession {
            student_id,
            interviewer_id,
            session_type,
            topic: Some("Career switch".to_string()),
            role: None,
            difficulty: None,
            interview_type: None,
            duration_minutes: 30,
            scheduled_time: at,
        }
    }

    #[sqlx::test]
    #[ignore = "needs a Postgres DATABASE_URL"]
    async fn concurrent_bookers_get_one_slot(pool: PgPool) {
        let db = DbClient::new(pool);
        let interviewer = approved_interviewer(&db).await;
        let start = Utc::now() + Duration::days(1);
        db.create_slot(interviewer.id, start, start + Duration::hours(1))
            .await
            .unwrap();

        let mut attempts = tokio::task::JoinSet::new();
        for i in 0..8 {
            let db = db.clone();
            let booker = student(&db, &format!("student{i}@example.com")).await;
            let request = session(booker.id, interviewer.id, SessionType::Guidance, start);
            attempts.spawn(async move { db.book_slot(request).await });
        }

        let mut booked = 0;
        while let Some(result) = attempts.join_next().await {
            match result.unwrap() {
                Ok(_) => booked += 1,
                Err(DbError::SlotUnavailable) => {}
                Err(other) => panic!("unexpected error: {other}"),
            }
        }

        assert_eq!(booked, 1);
        assert_eq!(db.list_interviewer_sessions(interviewer.id).await.unwrap().len(), 1);
        assert!(db.list_slots(interviewer.id).await.unwrap()[0].is_booked);
    }

    #[sqlx::test]
    #[ignore = "needs a Postgres DATABASE_URL"]
    async fn feedback_is_stored_once(pool: PgPool) {
        let db = DbClient::new(pool);
        let interviewer = approved_interviewer(&db).await;
        let booker = student(&db, "candidate@example.com").await;
        let created = db
            .create_session_if_free(session(
                booker.id,
                interviewer.id,
                SessionType::Interview,
                Utc::now() + Duration::hours(3),
            ))
            .await
            .unwrap();

        let feedback = |depth| NewFeedback {
            session_id: created.id,
            interviewer_id: interviewer.id,
            fields: FeedbackFields::Interview {
                summary: "Clear reasoning".to_string(),
                technical_depth: depth,
                problem_solving: 4,
                communication: 4,
                confidence: 3,
                overall_comments: "Practice trade-offs".to_string(),
                hiring_recommendation: HiringRecommendation::Hire,
            },
        };

        let (first, second) = tokio::join!(
            db.complete_with_feedback(feedback(4)),
            db.complete_with_feedback(feedback(2)),
        );
        let stored = match (first, second) {
            (Ok(stored), Err(DbError::FeedbackExists))
            | (Err(DbError::FeedbackExists), Ok(stored)) => stored,
            other => panic!("expected exactly one write, got {other:?}"),
        };

        let session = db.get_session(created.id).await.unwrap().unwrap();
        assert_eq!(session.status, SessionStatus::Completed);
        let saved = db.get_feedback(created.id).await.unwrap().unwrap();
        assert_eq!(saved.technical_depth, stored.technical_depth);
    }
}
