//! Share-code endpoints, no authentication

use std::net::SocketAddr;

use axum::{
    Json, Router,
    extract::{ConnectInfo, Path, State},
    http::HeaderMap,
    response::IntoResponse,
    routing::get,
};
use axum_extra::{TypedHeader, headers::UserAgent};
use common::error::ApiResult;

use super::access_info;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/s/:share_code", get(view_album))
        .route("/s/:share_code/photos/:photo_id/download", get(download_photo))
}

async fn view_album(
    State(state): State<AppState>,
    Path(share_code): Path<String>,
    headers: HeaderMap,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    user_agent: Option<TypedHeader<UserAgent>>,
) -> ApiResult<impl IntoResponse> {
    let access = access_info(&headers, connect_info.map(|ConnectInfo(addr)| addr), user_agent);
    let shared = state.lifecycle.view_shared(&share_code, &access).await?;

    Ok(Json(shared))
}

async fn download_photo(
    State(state): State<AppState>,
    Path((share_code, photo_id)): Path<(String, i64)>,
    headers: HeaderMap,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    user_agent: Option<TypedHeader<UserAgent>>,
) -> ApiResult<impl IntoResponse> {
    let access = access_info(&headers, connect_info.map(|ConnectInfo(addr)| addr), user_agent);
    let link = state
        .lifecycle
        .download_shared(&share_code, photo_id, &access)
        .await?;

    Ok(Json(link))
}
