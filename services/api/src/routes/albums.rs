//! Album management endpoints

use std::io::Cursor;

use axum::{
    Extension, Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::{get, post},
};
use base64::{Engine, engine::general_purpose::STANDARD};
use common::error::{ApiError, ApiResult};
use image::{DynamicImage, ImageFormat, Luma};
use qrcode::QrCode;
use serde_json::json;
use tracing::error;

use auth::{AuthUser, middleware::auth_middleware};

use crate::{
    models::{CreateAlbumRequest, PageQuery, Pagination, UpdateAlbumRequest},
    state::AppState,
};

/// Edge length of the rendered QR code in pixels
const QR_CODE_SIZE: u32 = 512;

pub fn routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/albums", post(create_album).get(list_albums))
        .route(
            "/albums/:album_id",
            get(get_album).put(update_album).delete(delete_album),
        )
        .route("/albums/:album_id/qrcode", get(album_qrcode))
        .route_layer(middleware::from_fn_with_state(
            state.jwt_service.clone(),
            auth_middleware,
        ))
}

async fn create_album(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(payload): Json<CreateAlbumRequest>,
) -> ApiResult<impl IntoResponse> {
    let album = state.lifecycle.create_album(user.id, payload).await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Album created",
            "album": album,
        })),
    ))
}

async fn list_albums(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Query(query): Query<PageQuery>,
) -> ApiResult<impl IntoResponse> {
    let (albums, total) = state.lifecycle.list_albums(user.id, &query).await?;

    Ok(Json(json!({
        "albums": albums,
        "pagination": Pagination::new(&query, total),
    })))
}

async fn get_album(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(album_id): Path<i64>,
) -> ApiResult<impl IntoResponse> {
    let detail = state.lifecycle.album_detail(&user, album_id).await?;
    Ok(Json(detail))
}

async fn update_album(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(album_id): Path<i64>,
    Json(payload): Json<UpdateAlbumRequest>,
) -> ApiResult<impl IntoResponse> {
    let album = state
        .lifecycle
        .update_album(user.id, album_id, payload)
        .await?;

    Ok(Json(json!({
        "message": "Album updated",
        "album": album,
    })))
}

async fn delete_album(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(album_id): Path<i64>,
) -> ApiResult<impl IntoResponse> {
    state.lifecycle.delete_album(user.id, album_id).await?;
    Ok(Json(json!({ "message": "Album deleted" })))
}

/// Share link of an album rendered as a PNG QR code
async fn album_qrcode(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(album_id): Path<i64>,
) -> ApiResult<impl IntoResponse> {
    let share_url = state.lifecycle.share_link(user.id, album_id).await?;

    let qr_code = qr_data_url(&share_url).map_err(|e| {
        error!("Failed to render QR code for album {}: {}", album_id, e);
        ApiError::Internal
    })?;

    Ok(Json(json!({
        "qrCode": qr_code,
        "shareUrl": share_url,
    })))
}

fn qr_data_url(text: &str) -> anyhow::Result<String> {
    let code = QrCode::new(text.as_bytes())?;
    let image = code
        .render::<Luma<u8>>()
        .min_dimensions(QR_CODE_SIZE, QR_CODE_SIZE)
        .build();

    let mut png = Vec::new();
    DynamicImage::ImageLuma8(image).write_to(&mut Cursor::new(&mut png), ImageFormat::Png)?;

    Ok(format!("data:image/png;base64,{}", STANDARD.encode(png)))
}
