//! Photo upload, deletion and original download

use axum::{
    Extension, Json, Router,
    extract::{DefaultBodyLimit, Multipart, Path, State},
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::{delete, get, post},
};
use common::error::{ApiError, ApiResult};
use serde_json::json;

use auth::{AuthUser, middleware::auth_middleware};
use media::is_allowed_image_type;

use super::{multipart_error, read_field};
use crate::{lifecycle::UploadFile, state::AppState};

/// Multipart field carrying the photos
const PHOTOS_FIELD: &str = "photos";

/// Room for multipart boundaries and part headers on top of the files
const MULTIPART_OVERHEAD: usize = 1024 * 1024;

pub fn routes(state: &AppState) -> Router<AppState> {
    let limits = state.lifecycle.limits();
    let body_limit =
        limits.max_file_size as usize * limits.max_files_per_upload + MULTIPART_OVERHEAD;

    Router::new()
        .route("/albums/:album_id/photos", post(upload_photos))
        .route("/albums/:album_id/photos/:photo_id", delete(delete_photo))
        .route(
            "/albums/:album_id/photos/:photo_id/original",
            get(original_download),
        )
        .layer(DefaultBodyLimit::max(body_limit))
        .route_layer(middleware::from_fn_with_state(
            state.jwt_service.clone(),
            auth_middleware,
        ))
}

async fn upload_photos(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(album_id): Path<i64>,
    mut multipart: Multipart,
) -> ApiResult<impl IntoResponse> {
    let limits = state.lifecycle.limits();
    let mut files = Vec::new();

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() != Some(PHOTOS_FIELD) {
            continue;
        }

        if files.len() >= limits.max_files_per_upload {
            return Err(ApiError::PayloadTooLarge(format!(
                "At most {} photos can be uploaded at once",
                limits.max_files_per_upload
            )));
        }

        let content_type = field
            .content_type()
            .unwrap_or_default()
            .to_ascii_lowercase();
        if !is_allowed_image_type(&content_type) {
            return Err(ApiError::Validation(
                "Unsupported file type, upload JPG, PNG, GIF, WebP or HEIC images".to_string(),
            ));
        }

        let file_name = field.file_name().unwrap_or("photo.jpg").to_string();
        let data = read_field(field, limits.max_file_size).await?;

        files.push(UploadFile {
            file_name,
            content_type,
            data,
        });
    }

    if files.is_empty() {
        return Err(ApiError::Validation("No photos provided".to_string()));
    }

    let outcome = state
        .lifecycle
        .upload_photos(user.id, album_id, files)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": format!("Uploaded {} photos", outcome.uploaded.len()),
            "photos": outcome.uploaded,
            "failed": outcome.failed,
        })),
    ))
}

async fn delete_photo(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path((album_id, photo_id)): Path<(i64, i64)>,
) -> ApiResult<impl IntoResponse> {
    state
        .lifecycle
        .delete_photo(user.id, album_id, photo_id)
        .await?;

    Ok(Json(json!({ "message": "Photo deleted" })))
}

async fn original_download(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path((album_id, photo_id)): Path<(i64, i64)>,
) -> ApiResult<impl IntoResponse> {
    let link = state
        .lifecycle
        .original_download(user.id, album_id, photo_id)
        .await?;

    Ok(Json(link))
}
