//! Admin dashboard endpoints

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    middleware,
    response::IntoResponse,
    routing::{delete, get},
};
use chrono::Utc;
use common::error::{ApiError, ApiResult};
use serde_json::json;
use tracing::{error, info};

use auth::middleware::{auth_middleware, require_admin};

use crate::{
    models::{AdminAlbum, AdminAlbumQuery, PageQuery, Pagination},
    state::AppState,
};

/// Access log entries returned per album
const LOG_LIMIT: i64 = 100;

pub fn routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/admin/stats", get(stats))
        .route("/admin/users", get(list_photographers))
        .route("/admin/users/:user_id/albums", get(user_albums))
        .route("/admin/albums", get(list_albums))
        .route("/admin/albums/:album_id", delete(delete_album))
        .route("/admin/albums/:album_id/logs", get(album_logs))
        .route_layer(middleware::from_fn(require_admin))
        .route_layer(middleware::from_fn_with_state(
            state.jwt_service.clone(),
            auth_middleware,
        ))
}

fn internal(context: &'static str) -> impl FnOnce(anyhow::Error) -> ApiError {
    move |e| {
        error!("{}: {}", context, e);
        ApiError::Internal
    }
}

async fn stats(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    let stats = state
        .admin_repository
        .stats(Utc::now())
        .await
        .map_err(internal("Failed to load dashboard stats"))?;

    Ok(Json(json!({ "stats": stats })))
}

async fn list_photographers(
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> ApiResult<impl IntoResponse> {
    let (users, total) = state
        .admin_repository
        .photographers(query.limit(), query.offset())
        .await
        .map_err(internal("Failed to list photographers"))?;

    Ok(Json(json!({
        "users": users,
        "pagination": Pagination::new(&query, total),
    })))
}

async fn user_albums(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
    Query(query): Query<PageQuery>,
) -> ApiResult<impl IntoResponse> {
    let (albums, total) = state
        .album_repository
        .list_by_user(user_id, query.limit(), query.offset())
        .await
        .map_err(internal("Failed to list user albums"))?;

    let now = Utc::now();
    let albums: Vec<_> = albums
        .into_iter()
        .map(|album| state.lifecycle.response(album, now))
        .collect();

    Ok(Json(json!({
        "albums": albums,
        "pagination": Pagination::new(&query, total),
    })))
}

async fn list_albums(
    State(state): State<AppState>,
    Query(query): Query<AdminAlbumQuery>,
) -> ApiResult<impl IntoResponse> {
    let page = query.page_query();
    let (rows, total) = state
        .admin_repository
        .albums_with_owner(query.status(), page.limit(), page.offset())
        .await
        .map_err(internal("Failed to list albums"))?;

    let now = Utc::now();
    let albums: Vec<AdminAlbum> = rows
        .into_iter()
        .map(|(album, user_name, user_email)| AdminAlbum {
            album: state.lifecycle.response(album, now),
            user_name,
            user_email,
        })
        .collect();

    Ok(Json(json!({
        "albums": albums,
        "pagination": Pagination::new(&page, total),
    })))
}

async fn album_logs(
    State(state): State<AppState>,
    Path(album_id): Path<i64>,
) -> ApiResult<impl IntoResponse> {
    let logs = state
        .access_log_repository
        .latest_by_album(album_id, LOG_LIMIT)
        .await
        .map_err(internal("Failed to load access logs"))?;

    Ok(Json(json!({ "logs": logs })))
}

async fn delete_album(
    State(state): State<AppState>,
    Path(album_id): Path<i64>,
) -> ApiResult<impl IntoResponse> {
    state.lifecycle.delete_album_as_admin(album_id).await?;

    info!("Album {} removed by administrator", album_id);
    Ok(Json(json!({ "message": "Album deleted" })))
}
