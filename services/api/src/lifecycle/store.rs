//! Persistence seam of the album lifecycle

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::models::{AccessAction, AccessInfo, Album, AlbumChanges, NewAlbum, NewPhoto, Photo};
use crate::repositories::{AccessLogRepository, AlbumRepository, PhotoRepository};

/// Album, photo and access-log persistence used by the lifecycle and the cleanup job
#[async_trait]
pub trait AlbumStore: Send + Sync {
    async fn count_active_albums(&self, user_id: i64, now: DateTime<Utc>) -> Result<i64>;

    async fn insert_album(&self, album: &NewAlbum) -> Result<Album>;

    async fn list_albums(&self, user_id: i64, limit: i64, offset: i64) -> Result<(Vec<Album>, i64)>;

    async fn find_album(&self, album_id: i64) -> Result<Option<Album>>;

    async fn find_album_by_share_code(&self, share_code: &str) -> Result<Option<Album>>;

    async fn update_album(
        &self,
        album_id: i64,
        changes: &AlbumChanges,
        now: DateTime<Utc>,
    ) -> Result<Option<Album>>;

    /// Delete the album row; photos and access logs cascade
    async fn delete_album(&self, album_id: i64) -> Result<bool>;

    async fn adjust_photo_count(&self, album_id: i64, delta: i32) -> Result<()>;

    async fn set_cover_if_missing(&self, album_id: i64, cover_url: &str) -> Result<()>;

    async fn increment_view_count(&self, album_id: i64) -> Result<()>;

    /// Bump both the photo and the album download counters
    async fn increment_download_counts(&self, album_id: i64, photo_id: i64) -> Result<()>;

    async fn record_access(
        &self,
        album_id: i64,
        action: AccessAction,
        photo_id: Option<i64>,
        access: &AccessInfo,
    ) -> Result<()>;

    async fn owner_name(&self, user_id: i64) -> Result<Option<String>>;

    async fn list_photos(&self, album_id: i64) -> Result<Vec<Photo>>;

    async fn find_photo(&self, album_id: i64, photo_id: i64) -> Result<Option<Photo>>;

    async fn insert_photo(&self, photo: &NewPhoto) -> Result<Photo>;

    async fn delete_photo(&self, photo_id: i64) -> Result<bool>;

    /// Original and thumbnail keys of every photo in the album
    async fn album_storage_keys(&self, album_id: i64) -> Result<Vec<String>>;

    /// Flag albums whose expiry has passed; returns how many changed
    async fn mark_expired(&self, now: DateTime<Utc>) -> Result<u64>;

    /// Flagged albums that expired at or before `cutoff`, oldest first
    async fn purge_candidates(&self, cutoff: DateTime<Utc>) -> Result<Vec<Album>>;
}

/// [`AlbumStore`] over the PostgreSQL repositories
#[derive(Clone)]
pub struct PgAlbumStore {
    albums: AlbumRepository,
    photos: PhotoRepository,
    access_logs: AccessLogRepository,
}

impl PgAlbumStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            albums: AlbumRepository::new(pool.clone()),
            photos: PhotoRepository::new(pool.clone()),
            access_logs: AccessLogRepository::new(pool),
        }
    }
}

#[async_trait]
impl AlbumStore for PgAlbumStore {
    async fn count_active_albums(&self, user_id: i64, now: DateTime<Utc>) -> Result<i64> {
        self.albums.count_active_by_user(user_id, now).await
    }

    async fn insert_album(&self, album: &NewAlbum) -> Result<Album> {
        self.albums.create(album).await
    }

    async fn list_albums(&self, user_id: i64, limit: i64, offset: i64) -> Result<(Vec<Album>, i64)> {
        self.albums.list_by_user(user_id, limit, offset).await
    }

    async fn find_album(&self, album_id: i64) -> Result<Option<Album>> {
        self.albums.find_by_id(album_id).await
    }

    async fn find_album_by_share_code(&self, share_code: &str) -> Result<Option<Album>> {
        self.albums.find_by_share_code(share_code).await
    }

    async fn update_album(
        &self,
        album_id: i64,
        changes: &AlbumChanges,
        now: DateTime<Utc>,
    ) -> Result<Option<Album>> {
        self.albums.update(album_id, changes, now).await
    }

    async fn delete_album(&self, album_id: i64) -> Result<bool> {
        self.albums.delete(album_id).await
    }

    async fn adjust_photo_count(&self, album_id: i64, delta: i32) -> Result<()> {
        self.albums.adjust_photo_count(album_id, delta).await
    }

    async fn set_cover_if_missing(&self, album_id: i64, cover_url: &str) -> Result<()> {
        self.albums.set_cover_if_missing(album_id, cover_url).await
    }

    async fn increment_view_count(&self, album_id: i64) -> Result<()> {
        self.albums.increment_view_count(album_id).await
    }

    async fn increment_download_counts(&self, album_id: i64, photo_id: i64) -> Result<()> {
        self.photos.increment_download_count(photo_id).await?;
        self.albums.increment_download_count(album_id).await
    }

    async fn record_access(
        &self,
        album_id: i64,
        action: AccessAction,
        photo_id: Option<i64>,
        access: &AccessInfo,
    ) -> Result<()> {
        self.access_logs
            .record(album_id, action, photo_id, access)
            .await
    }

    async fn owner_name(&self, user_id: i64) -> Result<Option<String>> {
        self.albums.owner_name(user_id).await
    }

    async fn list_photos(&self, album_id: i64) -> Result<Vec<Photo>> {
        self.photos.list_by_album(album_id).await
    }

    async fn find_photo(&self, album_id: i64, photo_id: i64) -> Result<Option<Photo>> {
        self.photos.find_in_album(album_id, photo_id).await
    }

    async fn insert_photo(&self, photo: &NewPhoto) -> Result<Photo> {
        self.photos.create(photo).await
    }

    async fn delete_photo(&self, photo_id: i64) -> Result<bool> {
        self.photos.delete(photo_id).await
    }

    async fn album_storage_keys(&self, album_id: i64) -> Result<Vec<String>> {
        self.photos.storage_keys_by_album(album_id).await
    }

    async fn mark_expired(&self, now: DateTime<Utc>) -> Result<u64> {
        self.albums.mark_expired(now).await
    }

    async fn purge_candidates(&self, cutoff: DateTime<Utc>) -> Result<Vec<Album>> {
        self.albums.expired_before(cutoff).await
    }
}
