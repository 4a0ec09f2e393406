use std::{env, fmt::Display, path::PathBuf, str::FromStr};

use thiserror::Error;
use tracing::{info, warn};

use crate::services::booking::AssignmentPolicy;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("environment variable {0} is required")]
    Missing(&'static str),

    #[error("invalid value for {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MailBackend {
    Log,
    Smtp,
}

impl FromStr for MailBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "log" => Ok(MailBackend::Log),
            "smtp" => Ok(MailBackend::Smtp),
            other => Err(format!("unknown mail backend `{other}`")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct MailConfig {
    pub backend: MailBackend,
    pub app_name: String,
    pub smtp_host: String,
    pub smtp_port: u16,
    pub smtp_user: Option<String>,
    pub smtp_password: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub database_url: Option<String>,
    pub jwt_secret: String,
    /// Token and cookie lifetime in minutes.
    pub jwt_maxage: i64,
    pub cookie_secure: bool,
    /// Origin allowed to call the API with credentials.
    pub frontend_origin: String,
    /// Signups from these addresses become ADMIN accounts.
    pub admin_emails: Vec<String>,
    pub upload_dir: PathBuf,
    pub assignment_policy: AssignmentPolicy,
    pub mail: MailConfig,
}

impl Config {
    pub fn init() -> Result<Config, ConfigError> {
        let jwt_secret = var("JWT_SECRET").ok_or(ConfigError::Missing("JWT_SECRET"))?;

        let mail = MailConfig {
            backend: try_load("MAIL_BACKEND", "log")?,
            app_name: try_load("APP_NAME", "InterviewPrep Live")?,
            smtp_host: try_load("SMTP_HOST", "smtp.gmail.com")?,
            smtp_port: try_load("SMTP_PORT", "587")?,
            smtp_user: var("SMTP_USER"),
            smtp_password: var("SMTP_PASSWORD"),
        };

        Ok(Config {
            port: try_load("PORT", "8000")?,
            database_url: var("DATABASE_URL"),
            jwt_secret,
            jwt_maxage: try_load("JWT_MAXAGE", "10080")?,
            cookie_secure: try_load("COOKIE_SECURE", "false")?,
            frontend_origin: try_load("FRONTEND_ORIGIN", "http://localhost:3000")?,
            admin_emails: parse_email_list(&var("ADMIN_EMAILS").unwrap_or_default()),
            upload_dir: try_load("UPLOAD_DIR", "public/uploads")?,
            assignment_policy: try_load("ASSIGNMENT_POLICY", "least-loaded")?,
            mail,
        })
    }

    pub fn is_admin_email(&self, email: &str) -> bool {
        self.admin_emails.iter().any(|admin| admin == email)
    }
}

pub fn parse_email_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|email| email.trim().to_lowercase())
        .filter(|email| !email.is_empty())
        .collect()
}

fn var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn try_load<T: FromStr>(key: &'static str, default: &str) -> Result<T, ConfigError>
where
    T::Err: Display,
{
    var(key)
        .unwrap_or_else(|| {
            info!("{key} not set, using default: {default}");
            default.to_string()
        })
        .parse()
        .map_err(|e: T::Err| {
            warn!("Invalid {key} value: {e}");
            ConfigError::Invalid {
                key,
                reason: e.to_string(),
            }
        })
}
