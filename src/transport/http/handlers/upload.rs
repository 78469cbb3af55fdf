use crate::app::marketplace::ServiceError;
use crate::domain::ImageUpload;
use crate::transport::http::handlers::common::{message_response, success_response};
use crate::transport::http::types::{ApiResponse, AppState, DeleteImageQuery, UploadForm};
use axum::extract::multipart::{MultipartError, MultipartRejection};
use axum::extract::{Multipart, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;

const FILE_FIELD: &str = "file";

#[utoipa::path(
    post,
    path = "/upload",
    request_body(content = UploadForm, content_type = "multipart/form-data"),
    responses(
        (status = 201, description = "Image stored", body = ApiResponse),
        (status = 400, description = "No file, wrong type or too large", body = ApiResponse),
        (status = 500, description = "Store failure", body = ApiResponse)
    )
)]
pub async fn upload_image_handler(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> impl IntoResponse {
    let multipart = match multipart {
        Ok(m) => m,
        Err(e) => return ServiceError::InvalidForm(e.body_text()).into_response(),
    };
    let upload = match read_file_field(multipart).await {
        Ok(upload) => upload,
        Err(e) => return e.into_response(),
    };
    match state.service.upload_image(upload).await {
        Ok(stored) => success_response(
            StatusCode::CREATED,
            &stored,
            Some("Image uploaded successfully"),
            None,
        ),
        Err(e) => e.into_response(),
    }
}

/// First `file` field of the form; other fields are skipped.
async fn read_file_field(mut multipart: Multipart) -> Result<Option<ImageUpload>, ServiceError> {
    while let Some(field) = multipart.next_field().await.map_err(form_error)? {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }
        let file_name = field.file_name().unwrap_or_default().to_string();
        let content_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();
        let bytes = field.bytes().await.map_err(form_error)?;
        return Ok(Some(ImageUpload {
            file_name,
            content_type,
            bytes: bytes.to_vec(),
        }));
    }
    Ok(None)
}

fn form_error(err: MultipartError) -> ServiceError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ServiceError::FileTooLarge
    } else {
        ServiceError::InvalidForm(err.body_text())
    }
}

#[utoipa::path(
    delete,
    path = "/upload",
    params(DeleteImageQuery),
    responses(
        (status = 200, description = "Image deleted", body = ApiResponse),
        (status = 400, description = "fileName missing", body = ApiResponse),
        (status = 500, description = "Store failure", body = ApiResponse)
    )
)]
pub async fn delete_image_handler(
    State(state): State<AppState>,
    Query(query): Query<DeleteImageQuery>,
) -> impl IntoResponse {
    match state.service.delete_image(query.file_name.as_deref()).await {
        Ok(()) => message_response(StatusCode::OK, "Image deleted successfully"),
        Err(e) => e.into_response(),
    }
}
