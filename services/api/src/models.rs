//! API models for request and response payloads

use serde::{Deserialize, Serialize};

pub mod access_log;
pub mod admin;
pub mod album;
pub mod photo;

pub use access_log::{AccessAction, AccessInfo, AccessLog};
pub use admin::{AdminAlbum, AdminAlbumQuery, DashboardStats, PhotographerSummary};
pub use album::{Album, AlbumChanges, AlbumResponse, CreateAlbumRequest, NewAlbum, UpdateAlbumRequest};
pub use photo::{NewPhoto, Photo, PublicPhoto};

const DEFAULT_LIMIT: i64 = 20;
const MAX_LIMIT: i64 = 100;

/// Query parameters for paginated listings
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PageQuery {
    /// Page number (1-based)
    pub page: Option<i64>,
    /// Number of items per page
    pub limit: Option<i64>,
}

impl PageQuery {
    /// Page clamped to at least 1
    pub fn page(&self) -> i64 {
        self.page.unwrap_or(1).max(1)
    }

    /// Limit, falling back to the default outside `1..=100`
    pub fn limit(&self) -> i64 {
        match self.limit {
            Some(limit) if (1..=MAX_LIMIT).contains(&limit) => limit,
            _ => DEFAULT_LIMIT,
        }
    }

    pub fn offset(&self) -> i64 {
        (self.page() - 1) * self.limit()
    }
}

/// Pagination block of a listing response
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub page: i64,
    pub limit: i64,
    pub total: i64,
    pub total_pages: i64,
}

impl Pagination {
    pub fn new(query: &PageQuery, total: i64) -> Self {
        let limit = query.limit();
        Self {
            page: query.page(),
            limit,
            total,
            total_pages: (total + limit - 1) / limit,
        }
    }
}
