//! Album models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Album row
#[derive(Debug, Clone)]
pub struct Album {
    pub id: i64,
    pub user_id: i64,
    pub title: String,
    pub share_code: String,
    pub description: Option<String>,
    pub cover_url: Option<String>,
    pub photo_count: i32,
    pub view_count: i32,
    pub download_count: i32,
    pub expires_at: DateTime<Utc>,
    pub is_expired: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Album {
    /// Expired by flag or by timestamp; the flag may lag behind the clock
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.is_expired || self.expires_at <= now
    }

    pub fn share_url(&self, frontend_url: &str) -> String {
        format!("{}/s/{}", frontend_url, self.share_code)
    }
}

/// Album insertion payload
#[derive(Debug, Clone)]
pub struct NewAlbum {
    pub user_id: i64,
    pub title: String,
    pub share_code: String,
    pub description: Option<String>,
    pub expires_at: DateTime<Utc>,
}

/// Fields to change on an album; `None` leaves the column untouched
#[derive(Debug, Clone, Default)]
pub struct AlbumChanges {
    pub title: Option<String>,
    pub description: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAlbumRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub expires_in_hours: Option<i64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateAlbumRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub expires_in_hours: Option<i64>,
}

/// Album as returned to its owner
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AlbumResponse {
    pub id: i64,
    pub user_id: i64,
    pub title: String,
    pub share_code: String,
    pub share_url: String,
    pub description: Option<String>,
    pub cover_url: Option<String>,
    pub photo_count: i32,
    pub view_count: i32,
    pub download_count: i32,
    pub expires_at: DateTime<Utc>,
    pub is_expired: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl AlbumResponse {
    pub fn new(album: Album, frontend_url: &str, now: DateTime<Utc>) -> Self {
        Self {
            share_url: album.share_url(frontend_url),
            is_expired: album.is_expired_at(now),
            id: album.id,
            user_id: album.user_id,
            title: album.title,
            share_code: album.share_code,
            description: album.description,
            cover_url: album.cover_url,
            photo_count: album.photo_count,
            view_count: album.view_count,
            download_count: album.download_count,
            expires_at: album.expires_at,
            created_at: album.created_at,
            updated_at: album.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn album(expires_at: DateTime<Utc>, is_expired: bool) -> Album {
        let now = Utc::now();
        Album {
            id: 1,
            user_id: 1,
            title: "Wedding".to_string(),
            share_code: "0123456789abcdef".to_string(),
            description: None,
            cover_url: None,
            photo_count: 0,
            view_count: 0,
            download_count: 0,
            expires_at,
            is_expired,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_expiry_checks_flag_and_timestamp() {
        let now = Utc::now();

        assert!(!album(now + Duration::hours(1), false).is_expired_at(now));
        assert!(album(now + Duration::hours(1), true).is_expired_at(now));
        assert!(album(now, false).is_expired_at(now));
        assert!(album(now - Duration::seconds(1), false).is_expired_at(now));
    }

    #[test]
    fn test_response_carries_share_url() {
        let now = Utc::now();
        let response = AlbumResponse::new(album(now - Duration::hours(1), false), "https://pic.example", now);

        assert_eq!(response.share_url, "https://pic.example/s/0123456789abcdef");
        assert!(response.is_expired);
    }
}
