use std::sync::Arc;

use axum::{
    extract::Request,
    http::{header, HeaderMap},
    middleware::Next,
    response::IntoResponse,
    Extension,
};
use axum_extra::extract::cookie::CookieJar;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::{
    error::{AppError, ErrorMessage},
    models::{User, UserRole},
    utils::token,
    AppState,
};

pub const TOKEN_COOKIE: &str = "token";

/// The authenticated caller, inserted into request extensions by [`auth`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrentUser {
    pub user: User,
}

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(|token| token.trim().to_owned())
        .filter(|token| !token.is_empty())
}

pub async fn auth(
    cookie_jar: CookieJar,
    Extension(app_state): Extension<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Result<impl IntoResponse, AppError> {
    let token = cookie_jar
        .get(TOKEN_COOKIE)
        .map(|cookie| cookie.value().to_string())
        .or_else(|| bearer_token(req.headers()))
        .ok_or(ErrorMessage::TokenNotProvided)?;

    let claims = token::decode_token(token, app_state.env.jwt_secret.as_bytes())?;
    let user_id = claims.user_id()?;

    let user = app_state
        .db_client
        .get_user(Some(user_id), None)
        .await?
        .ok_or(ErrorMessage::UserNoLongerExist)?;

    req.extensions_mut().insert(CurrentUser { user });

    Ok(next.run(req).await)
}

pub fn ensure_role(user: &User, allowed: &[UserRole]) -> Result<(), AppError> {
    if allowed.contains(&user.role) {
        return Ok(());
    }
    warn!(user_id = %user.id, role = user.role.to_str(), "role not permitted for route");
    Err(ErrorMessage::PermissionDenied.into())
}

/// Must run after [`auth`].
pub async fn role_check(
    req: Request,
    next: Next,
    required_roles: Vec<UserRole>,
) -> Result<impl IntoResponse, AppError> {
    let user = req
        .extensions()
        .get::<CurrentUser>()
        .ok_or(ErrorMessage::UserNotAuthenticated)?;

    ensure_role(&user.user, &required_roles)?;

    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn bearer_header_is_parsed() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer abc.def"));
        assert_eq!(bearer_token(&headers).as_deref(), Some("abc.def"));

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic xyz"));
        assert_eq!(bearer_token(&headers), None);
    }
}
