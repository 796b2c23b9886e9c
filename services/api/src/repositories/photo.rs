//! Photo repository for database operations

use anyhow::Result;
use sqlx::{PgPool, Row, postgres::PgRow};

use crate::models::{NewPhoto, Photo};

const PHOTO_COLUMNS: &str = "id, album_id, user_id, original_name, original_url, thumbnail_url, \
     storage_key, thumbnail_storage_key, file_size, width, height, mime_type, download_count, \
     sort_order, created_at";

fn photo_from_row(row: &PgRow) -> Photo {
    Photo {
        id: row.get("id"),
        album_id: row.get("album_id"),
        user_id: row.get("user_id"),
        original_name: row.get("original_name"),
        original_url: row.get("original_url"),
        thumbnail_url: row.get("thumbnail_url"),
        storage_key: row.get("storage_key"),
        thumbnail_storage_key: row.get("thumbnail_storage_key"),
        file_size: row.get("file_size"),
        width: row.get("width"),
        height: row.get("height"),
        mime_type: row.get("mime_type"),
        download_count: row.get("download_count"),
        sort_order: row.get("sort_order"),
        created_at: row.get("created_at"),
    }
}

/// Photo repository for database operations
#[derive(Clone)]
pub struct PhotoRepository {
    pool: PgPool,
}

impl PhotoRepository {
    /// Create a new photo repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, photo: &NewPhoto) -> Result<Photo> {
        let row = sqlx::query(&format!(
            r#"
            INSERT INTO photos (album_id, user_id, original_name, original_url, thumbnail_url,
                                storage_key, thumbnail_storage_key, file_size, width, height,
                                mime_type, sort_order)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            RETURNING {PHOTO_COLUMNS}
            "#
        ))
        .bind(photo.album_id)
        .bind(photo.user_id)
        .bind(&photo.original_name)
        .bind(&photo.original_url)
        .bind(&photo.thumbnail_url)
        .bind(&photo.storage_key)
        .bind(&photo.thumbnail_storage_key)
        .bind(photo.file_size)
        .bind(photo.width)
        .bind(photo.height)
        .bind(&photo.mime_type)
        .bind(photo.sort_order)
        .fetch_one(&self.pool)
        .await?;

        Ok(photo_from_row(&row))
    }

    /// Photos of an album in display order
    pub async fn list_by_album(&self, album_id: i64) -> Result<Vec<Photo>> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {PHOTO_COLUMNS}
            FROM photos
            WHERE album_id = $1
            ORDER BY sort_order ASC, created_at ASC
            "#
        ))
        .bind(album_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(photo_from_row).collect())
    }

    /// A photo, only if it belongs to the given album
    pub async fn find_in_album(&self, album_id: i64, photo_id: i64) -> Result<Option<Photo>> {
        let row = sqlx::query(&format!(
            "SELECT {PHOTO_COLUMNS} FROM photos WHERE id = $1 AND album_id = $2"
        ))
        .bind(photo_id)
        .bind(album_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(photo_from_row))
    }

    /// Original and thumbnail keys of every photo in an album
    pub async fn storage_keys_by_album(&self, album_id: i64) -> Result<Vec<String>> {
        let rows = sqlx::query(
            "SELECT storage_key, thumbnail_storage_key FROM photos WHERE album_id = $1",
        )
        .bind(album_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .flat_map(|row| {
                [
                    row.get::<String, _>("storage_key"),
                    row.get::<String, _>("thumbnail_storage_key"),
                ]
            })
            .collect())
    }

    pub async fn delete(&self, photo_id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM photos WHERE id = $1")
            .bind(photo_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn increment_download_count(&self, photo_id: i64) -> Result<()> {
        sqlx::query("UPDATE photos SET download_count = download_count + 1 WHERE id = $1")
            .bind(photo_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}
