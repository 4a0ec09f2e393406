//! Resume and id card storage on the local filesystem.
//!
//! Files live under `UPLOAD_DIR` and are served back at `/uploads/...`.

use std::path::{Component, Path, PathBuf};

use axum::body::Bytes;
use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::{AppError, ErrorMessage};

pub const MAX_UPLOAD_BYTES: usize = 5 * 1024 * 1024;
pub const PUBLIC_PREFIX: &str = "/uploads";

const PDF: &str = "application/pdf";
const DOC: &str = "application/msword";
const DOCX: &str = "application/vnd.openxmlformats-officedocument.wordprocessingml.document";
const JPEG: &str = "image/jpeg";
const PNG: &str = "image/png";
const WEBP: &str = "image/webp";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadKind {
    StudentResume,
    InterviewerResume,
    IdCard,
}

impl UploadKind {
    pub fn allowed_types(&self) -> &'static [&'static str] {
        match self {
            UploadKind::StudentResume => &[PDF, DOC, DOCX],
            UploadKind::InterviewerResume => &[PDF, DOC, DOCX, JPEG, PNG, WEBP],
            UploadKind::IdCard => &[PDF, JPEG, PNG, WEBP],
        }
    }

    fn subdir(&self) -> &'static str {
        match self {
            UploadKind::StudentResume => "resumes",
            UploadKind::InterviewerResume | UploadKind::IdCard => "interviewer-docs",
        }
    }

    fn prefix(&self) -> &'static str {
        match self {
            UploadKind::StudentResume | UploadKind::InterviewerResume => "resume",
            UploadKind::IdCard => "idcard",
        }
    }

    fn type_error(&self) -> ErrorMessage {
        match self {
            UploadKind::IdCard => ErrorMessage::UnsupportedIdCardType,
            _ => ErrorMessage::UnsupportedResumeType,
        }
    }
}

/// A file part taken from a multipart request.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub bytes: Bytes,
}

pub fn validate(kind: UploadKind, file: &UploadedFile) -> Result<(), AppError> {
    let content_type = file.content_type.as_deref().unwrap_or_default();
    if !kind.allowed_types().contains(&content_type) {
        return Err(kind.type_error().into());
    }
    if file.bytes.len() > MAX_UPLOAD_BYTES {
        return Err(ErrorMessage::FileTooLarge.into());
    }
    Ok(())
}

/// Extension of the client's file name, lower-cased, with the dot.
fn extension(file_name: Option<&str>) -> String {
    file_name
        .and_then(|name| Path::new(name).extension())
        .and_then(|ext| ext.to_str())
        .filter(|ext| ext.len() <= 8 && ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .map(|ext| format!(".{}", ext.to_ascii_lowercase()))
        .unwrap_or_default()
}

/// Validates and writes the file, returning its public URL.
pub async fn save(
    root: &Path,
    kind: UploadKind,
    user_id: Uuid,
    file: &UploadedFile,
) -> Result<String, AppError> {
    validate(kind, file)?;

    let dir = root.join(kind.subdir());
    tokio::fs::create_dir_all(&dir)
        .await
        .map_err(AppError::server_error)?;

    let file_name = format!(
        "{}_{}_{}{}",
        kind.prefix(),
        user_id,
        Utc::now().timestamp_millis(),
        extension(file.file_name.as_deref())
    );
    tokio::fs::write(dir.join(&file_name), &file.bytes)
        .await
        .map_err(AppError::server_error)?;

    let url = format!("{PUBLIC_PREFIX}/{}/{file_name}", kind.subdir());
    info!(%user_id, %url, bytes = file.bytes.len(), "file uploaded");
    Ok(url)
}

/// Maps a public URL back to its location under `root`. URLs outside the
/// upload area or containing `..` resolve to nothing.
fn resolve(root: &Path, url: &str) -> Option<PathBuf> {
    let relative = Path::new(url.strip_prefix(PUBLIC_PREFIX)?.trim_start_matches('/'));
    if relative.as_os_str().is_empty()
        || !relative
            .components()
            .all(|c| matches!(c, Component::Normal(_)))
    {
        return None;
    }
    Some(root.join(relative))
}

/// Deletes a previously saved file. A file that is already gone is not an error.
pub async fn remove(root: &Path, url: &str) -> Result<(), AppError> {
    let Some(path) = resolve(root, url) else {
        warn!(%url, "refusing to delete file outside the upload directory");
        return Ok(());
    };

    match tokio::fs::remove_file(&path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(AppError::server_error(e)),
    }
}

/// Passes `outcome` through, deleting the just-saved `urls` when it failed.
pub async fn discard_on_error<T, E>(
    root: &Path,
    urls: &[&str],
    outcome: Result<T, E>,
) -> Result<T, E> {
    if outcome.is_err() {
        for url in urls {
            if let Err(e) = remove(root, url).await {
                warn!(%url, error = %e, "failed to clean up unreferenced upload");
            }
        }
    }
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn file(content_type: &str, len: usize) -> UploadedFile {
        UploadedFile {
            file_name: Some("CV.Final.PDF".to_string()),
            content_type: Some(content_type.to_string()),
            bytes: Bytes::from(vec![0u8; len]),
        }
    }

    #[rstest]
    #[case(UploadKind::StudentResume, PDF, true)]
    #[case(UploadKind::StudentResume, DOCX, true)]
    #[case(UploadKind::StudentResume, PNG, false)]
    #[case(UploadKind::InterviewerResume, WEBP, true)]
    #[case(UploadKind::IdCard, JPEG, true)]
    #[case(UploadKind::IdCard, DOC, false)]
    fn accepted_types(#[case] kind: UploadKind, #[case] content_type: &str, #[case] ok: bool) {
        assert_eq!(validate(kind, &file(content_type, 10)).is_ok(), ok);
    }

    #[test]
    fn size_limit_is_inclusive() {
        assert!(validate(UploadKind::StudentResume, &file(PDF, MAX_UPLOAD_BYTES)).is_ok());
        let err = validate(UploadKind::StudentResume, &file(PDF, MAX_UPLOAD_BYTES + 1)).unwrap_err();
        assert!(err.is(ErrorMessage::FileTooLarge));
    }

    #[test]
    fn extension_is_sanitized() {
        assert_eq!(extension(Some("CV.Final.PDF")), ".pdf");
        assert_eq!(extension(Some("noext")), "");
        assert_eq!(extension(Some("evil.p/h")), "");
        assert_eq!(extension(None), "");
    }

    #[test]
    fn traversal_urls_do_not_resolve() {
        let root = Path::new("/srv/uploads");
        assert_eq!(
            resolve(root, "/uploads/resumes/resume_1.pdf"),
            Some(root.join("resumes/resume_1.pdf"))
        );
        assert_eq!(resolve(root, "/uploads/../etc/passwd"), None);
        assert_eq!(resolve(root, "/static/resume.pdf"), None);
    }

    #[tokio::test]
    async fn save_then_remove() {
        let dir = tempfile::tempdir().unwrap();
        let user_id = Uuid::new_v4();

        let url = save(dir.path(), UploadKind::IdCard, user_id, &file(PNG, 3))
            .await
            .unwrap();
        assert!(url.starts_with(&format!("/uploads/interviewer-docs/idcard_{user_id}_")));
        assert!(url.ends_with(".pdf"));

        let path = resolve(dir.path(), &url).unwrap();
        assert!(path.exists());
        remove(dir.path(), &url).await.unwrap();
        assert!(!path.exists());
        remove(dir.path(), &url).await.unwrap();
    }

    #[tokio::test]
    async fn failed_record_discards_new_file() {
        let dir = tempfile::tempdir().unwrap();
        let url = save(dir.path(), UploadKind::StudentResume, Uuid::new_v4(), &file(PDF, 3))
            .await
            .unwrap();
        let path = resolve(dir.path(), &url).unwrap();

        let kept = discard_on_error(dir.path(), &[url.as_str()], Ok::<_, AppError>(())).await;
        assert!(kept.is_ok());
        assert!(path.exists());

        let failed: Result<(), AppError> =
            discard_on_error(dir.path(), &[url.as_str()], Err(ErrorMessage::ServerError.into())).await;
        assert!(failed.unwrap_err().is(ErrorMessage::ServerError));
        assert!(!path.exists());
    }
}
