//! Admin dashboard models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{AlbumResponse, PageQuery};

/// Aggregate usage figures
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    /// Photographer accounts
    pub total_users: i64,
    pub total_albums: i64,
    pub active_albums: i64,
    pub total_photos: i64,
    pub total_views: i64,
    pub total_downloads: i64,
    /// Albums created in the last 7 days
    pub recent_albums: i64,
    /// Photographers registered in the last 7 days
    pub recent_users: i64,
}

/// Photographer with usage totals
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PhotographerSummary {
    pub id: i64,
    pub email: String,
    pub name: String,
    pub email_verified: bool,
    pub created_at: DateTime<Utc>,
    pub album_count: i64,
    pub total_photos: i64,
    pub total_views: i64,
    pub total_downloads: i64,
}

/// Album joined with its owner
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminAlbum {
    #[serde(flatten)]
    pub album: AlbumResponse,
    pub user_name: String,
    pub user_email: String,
}

/// Album status filter for the admin listing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlbumStatus {
    Active,
    Expired,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AdminAlbumQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    /// `active` or `expired`; anything else lists every album
    pub status: Option<String>,
}

impl AdminAlbumQuery {
    pub fn status(&self) -> Option<AlbumStatus> {
        match self.status.as_deref() {
            Some("active") => Some(AlbumStatus::Active),
            Some("expired") => Some(AlbumStatus::Expired),
            _ => None,
        }
    }

    pub fn page_query(&self) -> PageQuery {
        PageQuery {
            page: self.page,
            limit: self.limit,
        }
    }
}
