//! One-time verification codes for pending signups.

use chrono::{DateTime, Duration, Utc};
use rand::Rng;

use crate::{error::ErrorMessage, models::PendingUser};

pub const OTP_TTL_MINUTES: i64 = 10;
pub const RESEND_COOLDOWN_SECONDS: i64 = 60;
pub const PENDING_ACCOUNT_TTL_HOURS: i64 = 24;

/// Six decimal digits, never starting with zero.
pub fn generate_otp() -> String {
    rand::thread_rng().gen_range(100_000..1_000_000).to_string()
}

pub fn otp_expiry(sent_at: DateTime<Utc>) -> DateTime<Utc> {
    sent_at + Duration::minutes(OTP_TTL_MINUTES)
}

pub fn account_expiry(created_at: DateTime<Utc>) -> DateTime<Utc> {
    created_at + Duration::hours(PENDING_ACCOUNT_TTL_HOURS)
}

/// Best-effort gate: two concurrent resends can both pass before either
/// write lands.
pub fn can_resend(last_sent_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    now - last_sent_at >= Duration::seconds(RESEND_COOLDOWN_SECONDS)
}

pub fn verify(pending: &PendingUser, submitted: &str, now: DateTime<Utc>) -> Result<(), ErrorMessage> {
    if now > pending.account_expires_at {
        return Err(ErrorMessage::SignupExpired);
    }
    if now > pending.otp_expires_at {
        return Err(ErrorMessage::OtpExpired);
    }
    if pending.otp != submitted.trim() {
        return Err(ErrorMessage::InvalidOtp);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::UserRole;
    use rstest::rstest;
    use uuid::Uuid;

    fn pending(sent_at: DateTime<Utc>) -> PendingUser {
        PendingUser {
            id: Uuid::new_v4(),
            email: "lee@example.com".to_string(),
            password: "hash".to_string(),
            role: UserRole::Student,
            otp: "482913".to_string(),
            otp_sent_at: sent_at,
            otp_expires_at: otp_expiry(sent_at),
            account_expires_at: account_expiry(sent_at),
            created_at: sent_at,
        }
    }

    #[test]
    fn generated_codes_have_six_digits() {
        for _ in 0..100 {
            let otp = generate_otp();
            assert_eq!(otp.len(), 6);
            assert!(otp.chars().all(|c| c.is_ascii_digit()));
        }
    }

    #[rstest]
    #[case(0, "482913", Ok(()))]
    #[case(9, " 482913 ", Ok(()))]
    #[case(9, "000000", Err(ErrorMessage::InvalidOtp))]
    #[case(11, "482913", Err(ErrorMessage::OtpExpired))]
    #[case(60 * 25, "482913", Err(ErrorMessage::SignupExpired))]
    fn verification_rules(
        #[case] minutes_later: i64,
        #[case] submitted: &str,
        #[case] expected: Result<(), ErrorMessage>,
    ) {
        let sent_at = Utc::now();
        let now = sent_at + Duration::minutes(minutes_later);
        assert_eq!(verify(&pending(sent_at), submitted, now), expected);
    }

    #[rstest]
    #[case(0, false)]
    #[case(59, false)]
    #[case(60, true)]
    #[case(600, true)]
    fn resend_cooldown(#[case] seconds_later: i64, #[case] allowed: bool) {
        let sent_at = Utc::now();
        assert_eq!(can_resend(sent_at, sent_at + Duration::seconds(seconds_later)), allowed);
    }
}
