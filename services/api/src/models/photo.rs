//! Photo models

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Photo row
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Photo {
    pub id: i64,
    pub album_id: i64,
    pub user_id: i64,
    pub original_name: String,
    pub original_url: String,
    pub thumbnail_url: String,
    #[serde(skip)]
    pub storage_key: String,
    #[serde(skip)]
    pub thumbnail_storage_key: String,
    pub file_size: i64,
    pub width: i32,
    pub height: i32,
    pub mime_type: String,
    pub download_count: i32,
    pub sort_order: i32,
    pub created_at: DateTime<Utc>,
}

/// Photo insertion payload, written once both objects are stored
#[derive(Debug, Clone)]
pub struct NewPhoto {
    pub album_id: i64,
    pub user_id: i64,
    pub original_name: String,
    pub original_url: String,
    pub thumbnail_url: String,
    pub storage_key: String,
    pub thumbnail_storage_key: String,
    pub file_size: i64,
    pub width: i32,
    pub height: i32,
    pub mime_type: String,
    pub sort_order: i32,
}

/// Photo as shown on a public share page
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicPhoto {
    pub id: i64,
    pub thumbnail_url: String,
    pub width: i32,
    pub height: i32,
}

impl From<Photo> for PublicPhoto {
    fn from(photo: Photo) -> Self {
        Self {
            id: photo.id,
            thumbnail_url: photo.thumbnail_url,
            width: photo.width,
            height: photo.height,
        }
    }
}
