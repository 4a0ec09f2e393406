use std::sync::Arc;

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Extension, Json, Router,
};
use axum_extra::extract::cookie::{Cookie, SameSite};
use chrono::Utc;
use tracing::{info, warn};
use validator::Validate;

use crate::{
    db::{DbError, NewPendingUser},
    dtos::{
        FilterUserDto, LoginUserDto, ResendOtpDto, Response, SignupUserDto, UserData,
        UserLoginResponseDto, UserResponseDto, VerifyOtpDto,
    },
    error::{AppError, ErrorMessage},
    extractors::AppJson,
    mail,
    middleware::{auth, CurrentUser, TOKEN_COOKIE},
    models::{User, UserRole},
    utils::{otp, password, token},
    AppState,
};

pub fn auth_handler() -> Router {
    Router::new()
        .route("/signup", post(signup))
        .route("/verify-otp", post(verify_otp))
        .route("/resend-otp", post(resend_otp))
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/me", get(me).layer(axum::middleware::from_fn(auth)))
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn parse_signup_role(role: &str) -> Result<UserRole, AppError> {
    match role.trim().to_ascii_uppercase().as_str() {
        "STUDENT" => Ok(UserRole::Student),
        "INTERVIEWER" => Ok(UserRole::Interviewer),
        _ => Err(ErrorMessage::InvalidSignupRole.into()),
    }
}

fn session_cookie(app_state: &AppState, value: String, max_age: time::Duration) -> Cookie<'static> {
    Cookie::build((TOKEN_COOKIE, value))
        .path("/")
        .max_age(max_age)
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(app_state.env.cookie_secure)
        .build()
}

/// Issues a token for `user` and answers with it in both the body and the cookie.
fn logged_in_response(app_state: &AppState, user: &User) -> Result<impl IntoResponse, AppError> {
    let token = token::create_token(
        user,
        app_state.env.jwt_secret.as_bytes(),
        app_state.env.jwt_maxage,
    )
    .map_err(AppError::server_error)?;

    let cookie = session_cookie(
        app_state,
        token.clone(),
        time::Duration::minutes(app_state.env.jwt_maxage),
    );
    let cookie = HeaderValue::from_str(&cookie.to_string()).map_err(AppError::server_error)?;

    let body = Json(UserLoginResponseDto {
        status: "success".to_string(),
        token,
        user: FilterUserDto::filter_user(user),
        dashboard_path: user.role.dashboard_path().to_string(),
    });

    Ok(([(header::SET_COOKIE, cookie)], body))
}

async fn send_verification(app_state: &AppState, email: &str, code: &str) -> Result<(), AppError> {
    let message = mail::verification_email(&app_state.env.mail.app_name, email, code);
    app_state.mailer.send(message).await.map_err(|e| {
        tracing::error!(error = %e, %email, "failed to send verification email");
        AppError::from(ErrorMessage::VerificationEmailFailed)
    })
}

async fn signup(
    Extension(app_state): Extension<Arc<AppState>>,
    AppJson(body): AppJson<SignupUserDto>,
) -> Result<impl IntoResponse, AppError> {
    body.validate()
        .map_err(|e| AppError::bad_request(e.to_string()))?;

    let email = normalize_email(&body.email);
    let mut role = parse_signup_role(&body.role)?;

    if app_state.db_client.get_user(None, Some(&email)).await?.is_some() {
        return Err(ErrorMessage::EmailExist.into());
    }

    let now = Utc::now();
    // Repeated signups share the resend cooldown of the pending record.
    if let Some(pending) = app_state.db_client.get_pending_user(&email).await? {
        if now <= pending.account_expires_at && !otp::can_resend(pending.otp_sent_at, now) {
            return Err(ErrorMessage::OtpResendTooSoon.into());
        }
    }

    if app_state.env.is_admin_email(&email) {
        warn!(%email, requested = role.to_str(), "signup promoted to ADMIN via ADMIN_EMAILS");
        role = UserRole::Admin;
    }

    let hash_pwd = password::hash(&body.password)?;
    let code = otp::generate_otp();

    app_state
        .db_client
        .save_pending_user(NewPendingUser {
            email: email.clone(),
            password: hash_pwd,
            role,
            otp: code.clone(),
            otp_sent_at: now,
            otp_expires_at: otp::otp_expiry(now),
            account_expires_at: otp::account_expiry(now),
        })
        .await?;

    send_verification(&app_state, &email, &code).await?;

    info!(%email, role = role.to_str(), "pending signup created");
    Ok((
        StatusCode::CREATED,
        Json(Response {
            status: "success",
            message: "Verification code sent to your email. Please verify to complete signup."
                .to_string(),
        }),
    ))
}

async fn verify_otp(
    Extension(app_state): Extension<Arc<AppState>>,
    AppJson(body): AppJson<VerifyOtpDto>,
) -> Result<impl IntoResponse, AppError> {
    body.validate()
        .map_err(|e| AppError::bad_request(e.to_string()))?;

    let email = normalize_email(&body.email);
    let pending = app_state
        .db_client
        .get_pending_user(&email)
        .await?
        .ok_or(ErrorMessage::PendingSignupNotFound)?;

    if let Err(reason) = otp::verify(&pending, &body.otp, Utc::now()) {
        if reason == ErrorMessage::SignupExpired {
            app_state.db_client.delete_pending_user(&email).await?;
            info!(%email, "expired pending signup removed");
        }
        return Err(reason.into());
    }

    let user = app_state
        .db_client
        .activate_pending_user(&email)
        .await
        .map_err(|e| match e {
            DbError::Duplicate(_) => AppError::from(ErrorMessage::EmailExist),
            DbError::NotFound => AppError::from(ErrorMessage::PendingSignupNotFound),
            other => other.into(),
        })?;

    info!(user_id = %user.id, role = user.role.to_str(), "email verified, account created");

    let welcome = mail::welcome_email(&app_state.env.mail.app_name, &user.email);
    if let Err(e) = app_state.mailer.send(welcome).await {
        warn!(error = %e, user_id = %user.id, "failed to send welcome email");
    }

    logged_in_response(&app_state, &user)
}

async fn resend_otp(
    Extension(app_state): Extension<Arc<AppState>>,
    AppJson(body): AppJson<ResendOtpDto>,
) -> Result<impl IntoResponse, AppError> {
    body.validate()
        .map_err(|e| AppError::bad_request(e.to_string()))?;

    let email = normalize_email(&body.email);
    let pending = app_state
        .db_client
        .get_pending_user(&email)
        .await?
        .ok_or(ErrorMessage::PendingSignupNotFound)?;

    let now = Utc::now();
    if now > pending.account_expires_at {
        app_state.db_client.delete_pending_user(&email).await?;
        return Err(ErrorMessage::SignupExpired.into());
    }
    if !otp::can_resend(pending.otp_sent_at, now) {
        return Err(ErrorMessage::OtpResendTooSoon.into());
    }

    let code = otp::generate_otp();
    app_state
        .db_client
        .refresh_pending_otp(&email, &code, now, otp::otp_expiry(now))
        .await?;

    send_verification(&app_state, &email, &code).await?;

    Ok(Json(Response {
        status: "success",
        message: "A new verification code has been sent to your email".to_string(),
    }))
}

async fn login(
    Extension(app_state): Extension<Arc<AppState>>,
    AppJson(body): AppJson<LoginUserDto>,
) -> Result<impl IntoResponse, AppError> {
    body.validate()
        .map_err(|e| AppError::bad_request(e.to_string()))?;

    let email = normalize_email(&body.email);
    let user = app_state.db_client.get_user(None, Some(&email)).await?;

    let Some(user) = user else {
        if app_state.db_client.get_pending_user(&email).await?.is_some() {
            return Err(ErrorMessage::EmailNotVerified.into());
        }
        warn!(%email, "login for unknown email");
        return Err(ErrorMessage::WrongCredentials.into());
    };

    let password_matched = password::compare(&body.password, &user.password)
        .map_err(|_| AppError::from(ErrorMessage::WrongCredentials))?;

    if !password_matched {
        warn!(user_id = %user.id, "login with wrong password");
        return Err(ErrorMessage::WrongCredentials.into());
    }

    info!(user_id = %user.id, role = user.role.to_str(), "user logged in");
    logged_in_response(&app_state, &user)
}

async fn logout(
    Extension(app_state): Extension<Arc<AppState>>,
) -> Result<impl IntoResponse, AppError> {
    let cookie = session_cookie(&app_state, String::new(), time::Duration::ZERO);
    let cookie = HeaderValue::from_str(&cookie.to_string()).map_err(AppError::server_error)?;

    Ok((
        [(header::SET_COOKIE, cookie)],
        Json(Response {
            status: "success",
            message: "Logged out".to_string(),
        }),
    ))
}

async fn me(Extension(current): Extension<CurrentUser>) -> impl IntoResponse {
    Json(UserResponseDto {
        status: "success".to_string(),
        data: UserData {
            user: FilterUserDto::filter_user(&current.user),
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("student", Some(UserRole::Student))]
    #[case(" INTERVIEWER ", Some(UserRole::Interviewer))]
    #[case("ADMIN", None)]
    #[case("", None)]
    fn signup_roles(#[case] raw: &str, #[case] expected: Option<UserRole>) {
        assert_eq!(parse_signup_role(raw).ok(), expected);
    }

    #[test]
    fn emails_are_normalized() {
        assert_eq!(normalize_email("  Sam@Example.COM "), "sam@example.com");
    }
}
