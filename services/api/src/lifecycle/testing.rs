//! In-memory collaborators for lifecycle and cleanup tests

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration as StdDuration;

use anyhow::{Result, bail};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use media::{ObjectStorage, Thumbnail, ThumbnailGenerator};

use super::AlbumStore;
use crate::models::{AccessAction, AccessInfo, Album, AlbumChanges, NewAlbum, NewPhoto, Photo};

#[derive(Default)]
struct Tables {
    next_id: i64,
    albums: Vec<Album>,
    photos: Vec<Photo>,
    logs: Vec<(i64, AccessAction, Option<i64>)>,
}

impl Tables {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn album_mut(&mut self, album_id: i64) -> Option<&mut Album> {
        self.albums.iter_mut().find(|album| album.id == album_id)
    }
}

/// [`AlbumStore`] over vectors, with cascading album deletes
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn album(&self, album_id: i64) -> Option<Album> {
        let tables = self.tables.lock().unwrap();
        tables.albums.iter().find(|a| a.id == album_id).cloned()
    }

    pub fn album_count(&self) -> usize {
        self.tables.lock().unwrap().albums.len()
    }

    pub fn photos(&self, album_id: i64) -> Vec<Photo> {
        let tables = self.tables.lock().unwrap();
        tables
            .photos
            .iter()
            .filter(|p| p.album_id == album_id)
            .cloned()
            .collect()
    }

    pub fn logs(&self, album_id: i64) -> Vec<(AccessAction, Option<i64>)> {
        let tables = self.tables.lock().unwrap();
        tables
            .logs
            .iter()
            .filter(|(id, _, _)| *id == album_id)
            .map(|(_, action, photo_id)| (*action, *photo_id))
            .collect()
    }

    /// Overwrite an album's expiry fields directly
    pub fn set_expiry(&self, album_id: i64, expires_at: DateTime<Utc>, is_expired: bool) {
        let mut tables = self.tables.lock().unwrap();
        if let Some(album) = tables.album_mut(album_id) {
            album.expires_at = expires_at;
            album.is_expired = is_expired;
        }
    }
}

#[async_trait]
impl AlbumStore for MemoryStore {
    async fn count_active_albums(&self, user_id: i64, now: DateTime<Utc>) -> Result<i64> {
        let tables = self.tables.lock().unwrap();
        Ok(tables
            .albums
            .iter()
            .filter(|a| a.user_id == user_id && !a.is_expired && a.expires_at > now)
            .count() as i64)
    }

    async fn insert_album(&self, album: &NewAlbum) -> Result<Album> {
        let mut tables = self.tables.lock().unwrap();
        let now = Utc::now();
        let album = Album {
            id: tables.next_id(),
            user_id: album.user_id,
            title: album.title.clone(),
            share_code: album.share_code.clone(),
            description: album.description.clone(),
            cover_url: None,
            photo_count: 0,
            view_count: 0,
            download_count: 0,
            expires_at: album.expires_at,
            is_expired: false,
            created_at: now,
            updated_at: now,
        };
        tables.albums.push(album.clone());
        Ok(album)
    }

    async fn list_albums(&self, user_id: i64, limit: i64, offset: i64) -> Result<(Vec<Album>, i64)> {
        let tables = self.tables.lock().unwrap();
        let mut albums: Vec<Album> = tables
            .albums
            .iter()
            .filter(|a| a.user_id == user_id)
            .cloned()
            .collect();
        albums.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        let total = albums.len() as i64;
        let page = albums
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .collect();
        Ok((page, total))
    }

    async fn find_album(&self, album_id: i64) -> Result<Option<Album>> {
        Ok(self.album(album_id))
    }

    async fn find_album_by_share_code(&self, share_code: &str) -> Result<Option<Album>> {
        let tables = self.tables.lock().unwrap();
        Ok(tables
            .albums
            .iter()
            .find(|a| a.share_code == share_code)
            .cloned())
    }

    async fn update_album(
        &self,
        album_id: i64,
        changes: &AlbumChanges,
        now: DateTime<Utc>,
    ) -> Result<Option<Album>> {
        let mut tables = self.tables.lock().unwrap();
        let Some(album) = tables.album_mut(album_id) else {
            return Ok(None);
        };
        if let Some(title) = &changes.title {
            album.title = title.clone();
        }
        if let Some(description) = &changes.description {
            album.description = Some(description.clone());
        }
        if let Some(expires_at) = changes.expires_at {
            album.expires_at = expires_at;
            album.is_expired = expires_at <= now;
        }
        album.updated_at = now;
        Ok(Some(album.clone()))
    }

    async fn delete_album(&self, album_id: i64) -> Result<bool> {
        let mut tables = self.tables.lock().unwrap();
        let before = tables.albums.len();
        tables.albums.retain(|a| a.id != album_id);
        tables.photos.retain(|p| p.album_id != album_id);
        tables.logs.retain(|(id, _, _)| *id != album_id);
        Ok(tables.albums.len() < before)
    }

    async fn adjust_photo_count(&self, album_id: i64, delta: i32) -> Result<()> {
        let mut tables = self.tables.lock().unwrap();
        if let Some(album) = tables.album_mut(album_id) {
            album.photo_count = (album.photo_count + delta).max(0);
        }
        Ok(())
    }

    async fn set_cover_if_missing(&self, album_id: i64, cover_url: &str) -> Result<()> {
        let mut tables = self.tables.lock().unwrap();
        if let Some(album) = tables.album_mut(album_id) {
            album.cover_url.get_or_insert_with(|| cover_url.to_string());
        }
        Ok(())
    }

    async fn increment_view_count(&self, album_id: i64) -> Result<()> {
        let mut tables = self.tables.lock().unwrap();
        if let Some(album) = tables.album_mut(album_id) {
            album.view_count += 1;
        }
        Ok(())
    }

    async fn increment_download_counts(&self, album_id: i64, photo_id: i64) -> Result<()> {
        let mut tables = self.tables.lock().unwrap();
        if let Some(photo) = tables.photos.iter_mut().find(|p| p.id == photo_id) {
            photo.download_count += 1;
        }
        if let Some(album) = tables.album_mut(album_id) {
            album.download_count += 1;
        }
        Ok(())
    }

    async fn record_access(
        &self,
        album_id: i64,
        action: AccessAction,
        photo_id: Option<i64>,
        _access: &AccessInfo,
    ) -> Result<()> {
        let mut tables = self.tables.lock().unwrap();
        tables.logs.push((album_id, action, photo_id));
        Ok(())
    }

    async fn owner_name(&self, user_id: i64) -> Result<Option<String>> {
        Ok(Some(format!("Photographer {}", user_id)))
    }

    async fn list_photos(&self, album_id: i64) -> Result<Vec<Photo>> {
        let mut photos = self.photos(album_id);
        photos.sort_by_key(|p| (p.sort_order, p.created_at));
        Ok(photos)
    }

    async fn find_photo(&self, album_id: i64, photo_id: i64) -> Result<Option<Photo>> {
        let tables = self.tables.lock().unwrap();
        Ok(tables
            .photos
            .iter()
            .find(|p| p.id == photo_id && p.album_id == album_id)
            .cloned())
    }

    async fn insert_photo(&self, photo: &NewPhoto) -> Result<Photo> {
        let mut tables = self.tables.lock().unwrap();
        let photo = Photo {
            id: tables.next_id(),
            album_id: photo.album_id,
            user_id: photo.user_id,
            original_name: photo.original_name.clone(),
            original_url: photo.original_url.clone(),
            thumbnail_url: photo.thumbnail_url.clone(),
            storage_key: photo.storage_key.clone(),
            thumbnail_storage_key: photo.thumbnail_storage_key.clone(),
            file_size: photo.file_size,
            width: photo.width,
            height: photo.height,
            mime_type: photo.mime_type.clone(),
            download_count: 0,
            sort_order: photo.sort_order,
            created_at: Utc::now(),
        };
        tables.photos.push(photo.clone());
        Ok(photo)
    }

    async fn delete_photo(&self, photo_id: i64) -> Result<bool> {
        let mut tables = self.tables.lock().unwrap();
        let before = tables.photos.len();
        tables.photos.retain(|p| p.id != photo_id);
        Ok(tables.photos.len() < before)
    }

    async fn album_storage_keys(&self, album_id: i64) -> Result<Vec<String>> {
        Ok(self
            .photos(album_id)
            .into_iter()
            .flat_map(|p| [p.storage_key, p.thumbnail_storage_key])
            .collect())
    }

    async fn mark_expired(&self, now: DateTime<Utc>) -> Result<u64> {
        let mut tables = self.tables.lock().unwrap();
        let mut marked = 0;
        for album in tables
            .albums
            .iter_mut()
            .filter(|a| !a.is_expired && a.expires_at <= now)
        {
            album.is_expired = true;
            marked += 1;
        }
        Ok(marked)
    }

    async fn purge_candidates(&self, cutoff: DateTime<Utc>) -> Result<Vec<Album>> {
        let tables = self.tables.lock().unwrap();
        let mut albums: Vec<Album> = tables
            .albums
            .iter()
            .filter(|a| a.is_expired && a.expires_at <= cutoff)
            .cloned()
            .collect();
        albums.sort_by_key(|a| a.expires_at);
        Ok(albums)
    }
}

/// Object storage that records calls and can be told to fail
#[derive(Default)]
pub struct RecordingStorage {
    pub stored: Mutex<Vec<String>>,
    pub deleted: Mutex<Vec<String>>,
    pub fail_deletes: AtomicBool,
    pub fail_thumbnail_puts: AtomicBool,
    pub fail_signing: AtomicBool,
}

impl RecordingStorage {
    pub fn stored(&self) -> Vec<String> {
        self.stored.lock().unwrap().clone()
    }

    pub fn deleted(&self) -> Vec<String> {
        self.deleted.lock().unwrap().clone()
    }
}

#[async_trait]
impl ObjectStorage for RecordingStorage {
    async fn put_object(&self, key: &str, _body: Vec<u8>, _content_type: &str) -> Result<String> {
        let is_thumbnail = key.rsplit('/').next().is_some_and(|name| name.starts_with("thumb_"));
        if is_thumbnail && self.fail_thumbnail_puts.load(Ordering::SeqCst) {
            bail!("thumbnail upload rejected");
        }
        self.stored.lock().unwrap().push(key.to_string());
        Ok(self.public_url(key))
    }

    async fn delete_objects(&self, keys: &[String]) -> Result<()> {
        if self.fail_deletes.load(Ordering::SeqCst) {
            bail!("bucket unavailable");
        }
        self.deleted.lock().unwrap().extend_from_slice(keys);
        Ok(())
    }

    fn public_url(&self, key: &str) -> String {
        format!("https://cdn.test/{}", key)
    }

    async fn presigned_url(&self, key: &str, _expires_in: StdDuration) -> Result<String> {
        if self.fail_signing.load(Ordering::SeqCst) {
            bail!("signing unavailable");
        }
        Ok(format!("https://cdn.test/{}?signature=abc", key))
    }
}

/// Thumbnailer that rejects payloads equal to `b"corrupt"`
pub struct FakeThumbnailer;

impl ThumbnailGenerator for FakeThumbnailer {
    fn generate(&self, data: &[u8]) -> Result<Thumbnail> {
        if data == b"corrupt" {
            bail!("unsupported image format");
        }
        Ok(Thumbnail {
            jpeg: vec![0xFF, 0xD8, 0xFF],
            original_width: 1200,
            original_height: 800,
        })
    }
}
