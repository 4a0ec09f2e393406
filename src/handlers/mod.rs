use axum::extract::multipart::Field;

use crate::{error::AppError, uploads::UploadedFile};

pub mod admin_handlers;
pub mod auth_handlers;
pub mod feedback_handlers;
pub mod interviewer_handlers;
pub mod student_handlers;

pub(crate) async fn read_file_part(field: Field<'_>) -> Result<UploadedFile, AppError> {
    let file_name = field.file_name().map(str::to_string);
    let content_type = field.content_type().map(str::to_string);
    let bytes = field
        .bytes()
        .await
        .map_err(|e| AppError::new(e.body_text(), e.status()))?;

    Ok(UploadedFile {
        file_name,
        content_type,
        bytes,
    })
}
