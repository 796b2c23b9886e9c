//! Album lifecycle
//!
//! Business rules for albums and their photos: per-user album quota,
//! per-album photo quota, expiry, photo ingestion, deletion and public
//! access through share codes. Persistence, object storage and thumbnail
//! rendering are reached only through [`AlbumStore`], [`ObjectStorage`] and
//! [`ThumbnailGenerator`].
//!
//! Expiry is checked against both the `is_expired` flag and `expires_at`,
//! since the flag is only set by the hourly cleanup sweep.

mod store;
#[cfg(test)]
pub(crate) mod testing;

pub use store::{AlbumStore, PgAlbumStore};

use std::sync::Arc;
use std::time::Duration as StdDuration;

use anyhow::Context;
use auth::{AuthUser, tokens::random_hex};
use chrono::{DateTime, Duration, Utc};
use common::config::UploadConfig;
use media::{ObjectStorage, PhotoKeys, ThumbnailGenerator};
use serde::Serialize;
use thiserror::Error;
use tracing::{error, info, warn};

use crate::models::{
    AccessAction, AccessInfo, Album, AlbumChanges, AlbumResponse, CreateAlbumRequest, NewAlbum,
    NewPhoto, PageQuery, Photo, PublicPhoto, UpdateAlbumRequest,
};

/// Expiry applied when the request gives none
const DEFAULT_EXPIRY_HOURS: i64 = 24;

/// Upper bound on a requested expiry (ten years)
const MAX_EXPIRY_HOURS: i64 = 24 * 365 * 10;

/// Random bytes in a share code (16 hex chars)
const SHARE_CODE_BYTES: usize = 8;

/// Lifetime of presigned download URLs
const DOWNLOAD_URL_TTL: StdDuration = StdDuration::from_secs(60 * 60);

#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("{0} not found")]
    NotFound(&'static str),

    /// Owner tried to modify an expired album
    #[error("Album has expired")]
    Expired,

    /// Public access to an expired album
    #[error("Album has expired")]
    Gone,

    #[error("You can have at most {0} active albums")]
    QuotaExceeded(i64),

    #[error("An album can hold at most {0} photos")]
    PhotoLimitReached(i64),

    #[error(
        "An album can hold at most {max} photos: it has {current}, so at most {remaining} more can be uploaded"
    )]
    PhotoQuotaExceeded { max: i64, current: i64, remaining: i64 },

    #[error("No changes requested")]
    NoChangeRequested,

    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

pub type LifecycleResult<T> = Result<T, LifecycleError>;

/// One file of an upload batch
#[derive(Debug, Clone)]
pub struct UploadFile {
    pub file_name: String,
    pub content_type: String,
    pub data: Vec<u8>,
}

/// Result of an upload batch
#[derive(Debug, Clone)]
pub struct UploadOutcome {
    pub uploaded: Vec<Photo>,
    pub failed: usize,
}

/// Album with all of its photos, for the owner or an admin
#[derive(Debug, Clone, Serialize)]
pub struct AlbumDetail {
    pub album: AlbumResponse,
    pub photos: Vec<Photo>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SharedAlbumInfo {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub photographer_name: String,
    pub photo_count: i32,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

/// Public share page payload
#[derive(Debug, Clone, Serialize)]
pub struct SharedAlbum {
    pub album: SharedAlbumInfo,
    pub photos: Vec<PublicPhoto>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadLink {
    pub download_url: String,
    pub file_name: String,
}

/// Album lifecycle manager
#[derive(Clone)]
pub struct AlbumLifecycle {
    store: Arc<dyn AlbumStore>,
    storage: Arc<dyn ObjectStorage>,
    thumbnailer: Arc<dyn ThumbnailGenerator>,
    limits: UploadConfig,
    frontend_url: String,
}

impl AlbumLifecycle {
    pub fn new(
        store: Arc<dyn AlbumStore>,
        storage: Arc<dyn ObjectStorage>,
        thumbnailer: Arc<dyn ThumbnailGenerator>,
        limits: UploadConfig,
        frontend_url: impl Into<String>,
    ) -> Self {
        Self {
            store,
            storage,
            thumbnailer,
            limits,
            frontend_url: frontend_url.into(),
        }
    }

    pub fn limits(&self) -> &UploadConfig {
        &self.limits
    }

    pub fn response(&self, album: Album, now: DateTime<Utc>) -> AlbumResponse {
        AlbumResponse::new(album, &self.frontend_url, now)
    }

    /// Create an album for `owner_id`, subject to the active album quota
    pub async fn create_album(
        &self,
        owner_id: i64,
        request: CreateAlbumRequest,
    ) -> LifecycleResult<AlbumResponse> {
        let now = Utc::now();

        let max = self.limits.max_albums_per_user;
        let active = self.store.count_active_albums(owner_id, now).await?;
        if active >= max {
            return Err(LifecycleError::QuotaExceeded(max));
        }

        let title = non_blank(request.title)
            .unwrap_or_else(|| now.format("%Y-%m-%d %H:%M").to_string());
        let hours = request
            .expires_in_hours
            .filter(|hours| *hours > 0)
            .unwrap_or(DEFAULT_EXPIRY_HOURS);

        let album = self
            .store
            .insert_album(&NewAlbum {
                user_id: owner_id,
                title,
                share_code: random_hex(SHARE_CODE_BYTES),
                description: request.description,
                expires_at: expiry_after(now, hours),
            })
            .await?;

        info!(
            "User {} created album {} expiring at {}",
            owner_id, album.id, album.expires_at
        );
        Ok(self.response(album, now))
    }

    /// The owner's albums, newest first, with the total count
    pub async fn list_albums(
        &self,
        owner_id: i64,
        page: &PageQuery,
    ) -> LifecycleResult<(Vec<AlbumResponse>, i64)> {
        let now = Utc::now();
        let (albums, total) = self
            .store
            .list_albums(owner_id, page.limit(), page.offset())
            .await?;

        let albums = albums
            .into_iter()
            .map(|album| self.response(album, now))
            .collect();

        Ok((albums, total))
    }

    /// Album and photos, visible to the owner and to admins
    pub async fn album_detail(
        &self,
        caller: &AuthUser,
        album_id: i64,
    ) -> LifecycleResult<AlbumDetail> {
        let album = self
            .store
            .find_album(album_id)
            .await?
            .filter(|album| album.user_id == caller.id || caller.is_admin())
            .ok_or(LifecycleError::NotFound("Album"))?;

        let photos = self.store.list_photos(album.id).await?;

        Ok(AlbumDetail {
            album: self.response(album, Utc::now()),
            photos,
        })
    }

    pub async fn update_album(
        &self,
        owner_id: i64,
        album_id: i64,
        request: UpdateAlbumRequest,
    ) -> LifecycleResult<AlbumResponse> {
        let album = self.owned_album(owner_id, album_id).await?;
        let now = Utc::now();

        let changes = AlbumChanges {
            title: non_blank(request.title),
            description: request.description,
            // Zero or negative hours expire the album right away
            expires_at: request
                .expires_in_hours
                .map(|hours| expiry_after(now, hours.max(0))),
        };

        if changes.title.is_none() && changes.description.is_none() && changes.expires_at.is_none()
        {
            return Err(LifecycleError::NoChangeRequested);
        }

        let album = self
            .store
            .update_album(album.id, &changes, now)
            .await?
            .ok_or(LifecycleError::NotFound("Album"))?;

        info!("User {} updated album {}", owner_id, album.id);
        Ok(self.response(album, now))
    }

    pub async fn delete_album(&self, owner_id: i64, album_id: i64) -> LifecycleResult<()> {
        let album = self.owned_album(owner_id, album_id).await?;
        self.remove_album(&album).await?;

        info!("User {} deleted album {}", owner_id, album.id);
        Ok(())
    }

    /// Administrative delete of any album
    pub async fn delete_album_as_admin(&self, album_id: i64) -> LifecycleResult<()> {
        let album = self
            .store
            .find_album(album_id)
            .await?
            .ok_or(LifecycleError::NotFound("Album"))?;
        self.remove_album(&album).await?;

        info!("Admin deleted album {} of user {}", album.id, album.user_id);
        Ok(())
    }

    /// Public share URL of an owned album
    pub async fn share_link(&self, owner_id: i64, album_id: i64) -> LifecycleResult<String> {
        let album = self.owned_album(owner_id, album_id).await?;
        Ok(album.share_url(&self.frontend_url))
    }

    /// Store a batch of photos in an owned, unexpired album
    ///
    /// The quota is checked up front for the whole batch. Files are then
    /// processed one by one; a failing file is counted and skipped.
    pub async fn upload_photos(
        &self,
        owner_id: i64,
        album_id: i64,
        files: Vec<UploadFile>,
    ) -> LifecycleResult<UploadOutcome> {
        let album = self.owned_album(owner_id, album_id).await?;

        if album.is_expired_at(Utc::now()) {
            return Err(LifecycleError::Expired);
        }

        let max = self.limits.max_photos_per_album;
        let current = i64::from(album.photo_count);
        if current >= max {
            return Err(LifecycleError::PhotoLimitReached(max));
        }
        if current + files.len() as i64 > max {
            return Err(LifecycleError::PhotoQuotaExceeded {
                max,
                current,
                remaining: max - current,
            });
        }

        let mut uploaded = Vec::with_capacity(files.len());
        let mut failed = 0;

        for (index, file) in files.into_iter().enumerate() {
            let file_name = file.file_name.clone();
            let sort_order = album.photo_count + index as i32;

            match self.store_photo(&album, file, sort_order).await {
                Ok(photo) => uploaded.push(photo),
                Err(e) => {
                    warn!(
                        "Failed to upload {} to album {}: {:#}",
                        file_name, album.id, e
                    );
                    failed += 1;
                }
            }
        }

        if let Some(first) = uploaded.first() {
            if let Err(e) = self
                .store
                .adjust_photo_count(album.id, uploaded.len() as i32)
                .await
            {
                error!("Failed to update photo count of album {}: {}", album.id, e);
            }

            if album.cover_url.is_none() {
                if let Err(e) = self
                    .store
                    .set_cover_if_missing(album.id, &first.thumbnail_url)
                    .await
                {
                    error!("Failed to set cover of album {}: {}", album.id, e);
                }
            }
        }

        info!(
            "Uploaded {} photos to album {} ({} failed)",
            uploaded.len(),
            album.id,
            failed
        );
        Ok(UploadOutcome { uploaded, failed })
    }

    /// Thumbnail, store both objects, then write the row
    async fn store_photo(
        &self,
        album: &Album,
        file: UploadFile,
        sort_order: i32,
    ) -> anyhow::Result<Photo> {
        let UploadFile {
            file_name,
            content_type,
            data,
        } = file;

        let thumbnailer = Arc::clone(&self.thumbnailer);
        let (data, thumbnail) = tokio::task::spawn_blocking(move || {
            let thumbnail = thumbnailer.generate(&data);
            (data, thumbnail)
        })
        .await
        .context("Thumbnail task failed")?;
        let thumbnail = thumbnail?;

        let keys = PhotoKeys::new(album.user_id, album.id, &file_name);
        let file_size = data.len() as i64;

        let original_url = self
            .storage
            .put_object(&keys.original, data, &content_type)
            .await?;

        let thumbnail_url = match self
            .storage
            .put_object(&keys.thumbnail, thumbnail.jpeg, "image/jpeg")
            .await
        {
            Ok(url) => url,
            Err(e) => {
                self.discard_objects(vec![keys.original]).await;
                return Err(e);
            }
        };

        let photo = NewPhoto {
            album_id: album.id,
            user_id: album.user_id,
            original_name: file_name,
            original_url,
            thumbnail_url,
            storage_key: keys.original.clone(),
            thumbnail_storage_key: keys.thumbnail.clone(),
            file_size,
            width: thumbnail.original_width as i32,
            height: thumbnail.original_height as i32,
            mime_type: content_type,
            sort_order,
        };

        match self.store.insert_photo(&photo).await {
            Ok(photo) => Ok(photo),
            Err(e) => {
                self.discard_objects(vec![keys.original, keys.thumbnail])
                    .await;
                Err(e)
            }
        }
    }

    pub async fn delete_photo(
        &self,
        owner_id: i64,
        album_id: i64,
        photo_id: i64,
    ) -> LifecycleResult<()> {
        let photo = self.owned_photo(owner_id, album_id, photo_id).await?;

        self.discard_objects(vec![
            photo.storage_key.clone(),
            photo.thumbnail_storage_key.clone(),
        ])
        .await;

        if self.store.delete_photo(photo.id).await? {
            self.store.adjust_photo_count(photo.album_id, -1).await?;
        }

        info!("User {} deleted photo {} from album {}", owner_id, photo.id, photo.album_id);
        Ok(())
    }

    /// Download link for the owner's original file
    pub async fn original_download(
        &self,
        owner_id: i64,
        album_id: i64,
        photo_id: i64,
    ) -> LifecycleResult<DownloadLink> {
        let photo = self.owned_photo(owner_id, album_id, photo_id).await?;
        Ok(self.download_link(photo).await)
    }

    /// Public view of a shared album; counts the view
    pub async fn view_shared(
        &self,
        share_code: &str,
        access: &AccessInfo,
    ) -> LifecycleResult<SharedAlbum> {
        let album = self.shared_album(share_code).await?;

        let photographer_name = match self.store.owner_name(album.user_id).await {
            Ok(name) => name.unwrap_or_default(),
            Err(e) => {
                error!("Failed to load owner of album {}: {}", album.id, e);
                String::new()
            }
        };
        let photos = self.store.list_photos(album.id).await?;

        if let Err(e) = self.store.increment_view_count(album.id).await {
            error!("Failed to count view of album {}: {}", album.id, e);
        }
        if let Err(e) = self
            .store
            .record_access(album.id, AccessAction::View, None, access)
            .await
        {
            error!("Failed to log view of album {}: {}", album.id, e);
        }

        Ok(SharedAlbum {
            album: SharedAlbumInfo {
                id: album.id,
                title: album.title,
                description: album.description,
                photographer_name,
                photo_count: album.photo_count,
                expires_at: album.expires_at,
                created_at: album.created_at,
            },
            photos: photos.into_iter().map(PublicPhoto::from).collect(),
        })
    }

    /// Public download of one photo of a shared album; counts the download
    pub async fn download_shared(
        &self,
        share_code: &str,
        photo_id: i64,
        access: &AccessInfo,
    ) -> LifecycleResult<DownloadLink> {
        let album = self.shared_album(share_code).await?;
        let photo = self
            .store
            .find_photo(album.id, photo_id)
            .await?
            .ok_or(LifecycleError::NotFound("Photo"))?;

        if let Err(e) = self.store.increment_download_counts(album.id, photo.id).await {
            error!("Failed to count download of photo {}: {}", photo.id, e);
        }
        if let Err(e) = self
            .store
            .record_access(album.id, AccessAction::Download, Some(photo.id), access)
            .await
        {
            error!("Failed to log download of photo {}: {}", photo.id, e);
        }

        Ok(self.download_link(photo).await)
    }

    async fn owned_album(&self, owner_id: i64, album_id: i64) -> LifecycleResult<Album> {
        self.store
            .find_album(album_id)
            .await?
            .filter(|album| album.user_id == owner_id)
            .ok_or(LifecycleError::NotFound("Album"))
    }

    async fn owned_photo(
        &self,
        owner_id: i64,
        album_id: i64,
        photo_id: i64,
    ) -> LifecycleResult<Photo> {
        let album = self.owned_album(owner_id, album_id).await?;
        self.store
            .find_photo(album.id, photo_id)
            .await?
            .filter(|photo| photo.user_id == owner_id)
            .ok_or(LifecycleError::NotFound("Photo"))
    }

    /// Unexpired album behind a share code
    async fn shared_album(&self, share_code: &str) -> LifecycleResult<Album> {
        let album = self
            .store
            .find_album_by_share_code(share_code)
            .await?
            .ok_or(LifecycleError::NotFound("Album"))?;

        if album.is_expired_at(Utc::now()) {
            return Err(LifecycleError::Gone);
        }

        Ok(album)
    }

    /// Delete stored files, then the row; storage failures do not block the delete
    async fn remove_album(&self, album: &Album) -> LifecycleResult<()> {
        let keys = self.store.album_storage_keys(album.id).await?;
        self.discard_objects(keys).await;
        self.store.delete_album(album.id).await?;
        Ok(())
    }

    async fn discard_objects(&self, keys: Vec<String>) {
        if keys.is_empty() {
            return;
        }
        if let Err(e) = self.storage.delete_objects(&keys).await {
            warn!("Failed to delete {} stored objects: {:#}", keys.len(), e);
        }
    }

    /// Presigned GET URL, falling back to the public URL
    async fn download_link(&self, photo: Photo) -> DownloadLink {
        let download_url = match self
            .storage
            .presigned_url(&photo.storage_key, DOWNLOAD_URL_TTL)
            .await
        {
            Ok(url) => url,
            Err(e) => {
                warn!("Failed to sign download of photo {}: {:#}", photo.id, e);
                photo.original_url
            }
        };

        DownloadLink {
            download_url,
            file_name: photo.original_name,
        }
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn expiry_after(now: DateTime<Utc>, hours: i64) -> DateTime<Utc> {
    now + Duration::hours(hours.min(MAX_EXPIRY_HOURS))
}
