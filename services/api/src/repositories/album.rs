//! Album repository for database operations

use anyhow::Result;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row, postgres::PgRow};

use crate::models::{Album, AlbumChanges, NewAlbum};

pub(crate) const ALBUM_COLUMNS: &str = "id, user_id, title, share_code, description, cover_url, \
     photo_count, view_count, download_count, expires_at, is_expired, created_at, updated_at";

pub(crate) fn album_from_row(row: &PgRow) -> Album {
    Album {
        id: row.get("id"),
        user_id: row.get("user_id"),
        title: row.get("title"),
        share_code: row.get("share_code"),
        description: row.get("description"),
        cover_url: row.get("cover_url"),
        photo_count: row.get("photo_count"),
        view_count: row.get("view_count"),
        download_count: row.get("download_count"),
        expires_at: row.get("expires_at"),
        is_expired: row.get("is_expired"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

/// Album repository for database operations
#[derive(Clone)]
pub struct AlbumRepository {
    pool: PgPool,
}

impl AlbumRepository {
    /// Create a new album repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, album: &NewAlbum) -> Result<Album> {
        let row = sqlx::query(&format!(
            r#"
            INSERT INTO albums (user_id, title, share_code, description, expires_at)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {ALBUM_COLUMNS}
            "#
        ))
        .bind(album.user_id)
        .bind(&album.title)
        .bind(&album.share_code)
        .bind(&album.description)
        .bind(album.expires_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(album_from_row(&row))
    }

    pub async fn find_by_id(&self, id: i64) -> Result<Option<Album>> {
        let row = sqlx::query(&format!("SELECT {ALBUM_COLUMNS} FROM albums WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.as_ref().map(album_from_row))
    }

    pub async fn find_by_share_code(&self, share_code: &str) -> Result<Option<Album>> {
        let row = sqlx::query(&format!(
            "SELECT {ALBUM_COLUMNS} FROM albums WHERE share_code = $1"
        ))
        .bind(share_code)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(album_from_row))
    }

    /// A user's albums, newest first, with the total count
    pub async fn list_by_user(
        &self,
        user_id: i64,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<Album>, i64)> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {ALBUM_COLUMNS}
            FROM albums
            WHERE user_id = $1
            ORDER BY created_at DESC
            LIMIT $2 OFFSET $3
            "#
        ))
        .bind(user_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM albums WHERE user_id = $1")
            .bind(user_id)
            .fetch_one(&self.pool)
            .await?;

        Ok((rows.iter().map(album_from_row).collect(), total))
    }

    /// Albums that count against the per-user quota at `now`
    pub async fn count_active_by_user(&self, user_id: i64, now: DateTime<Utc>) -> Result<i64> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM albums
            WHERE user_id = $1 AND is_expired = FALSE AND expires_at > $2
            "#,
        )
        .bind(user_id)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }

    /// Apply the given changes; a new expiry also re-derives the expired flag
    pub async fn update(
        &self,
        id: i64,
        changes: &AlbumChanges,
        now: DateTime<Utc>,
    ) -> Result<Option<Album>> {
        let row = sqlx::query(&format!(
            r#"
            UPDATE albums
            SET title = COALESCE($1, title),
                description = COALESCE($2, description),
                expires_at = COALESCE($3, expires_at),
                is_expired = CASE WHEN $3::timestamptz IS NULL THEN is_expired ELSE $3 <= $4 END,
                updated_at = NOW()
            WHERE id = $5
            RETURNING {ALBUM_COLUMNS}
            "#
        ))
        .bind(&changes.title)
        .bind(&changes.description)
        .bind(changes.expires_at)
        .bind(now)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(album_from_row))
    }

    /// Delete an album; photos and access logs go with it
    pub async fn delete(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM albums WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Add `delta` to the photo counter, never going below zero
    pub async fn adjust_photo_count(&self, id: i64, delta: i32) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE albums
            SET photo_count = GREATEST(photo_count + $1, 0), updated_at = NOW()
            WHERE id = $2
            "#,
        )
        .bind(delta)
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn set_cover_if_missing(&self, id: i64, cover_url: &str) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE albums SET cover_url = $1, updated_at = NOW()
            WHERE id = $2 AND cover_url IS NULL
            "#,
        )
        .bind(cover_url)
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn increment_view_count(&self, id: i64) -> Result<()> {
        sqlx::query("UPDATE albums SET view_count = view_count + 1 WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    pub async fn increment_download_count(&self, id: i64) -> Result<()> {
        sqlx::query("UPDATE albums SET download_count = download_count + 1 WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Flag every album whose expiry has passed; returns the number flagged
    pub async fn mark_expired(&self, now: DateTime<Utc>) -> Result<u64> {
        let result = sqlx::query(
            r#"
            UPDATE albums
            SET is_expired = TRUE, updated_at = NOW()
            WHERE is_expired = FALSE AND expires_at <= $1
            "#,
        )
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    /// Flagged albums that expired at or before `cutoff`, oldest first
    pub async fn expired_before(&self, cutoff: DateTime<Utc>) -> Result<Vec<Album>> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {ALBUM_COLUMNS}
            FROM albums
            WHERE is_expired = TRUE AND expires_at <= $1
            ORDER BY expires_at ASC
            "#
        ))
        .bind(cutoff)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(album_from_row).collect())
    }

    pub async fn owner_name(&self, user_id: i64) -> Result<Option<String>> {
        let name: Option<String> = sqlx::query_scalar("SELECT name FROM users WHERE id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(name)
    }
}
