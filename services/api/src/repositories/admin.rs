//! Admin dashboard queries

use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use sqlx::{PgPool, Row};

use super::album::album_from_row;
use crate::models::{Album, DashboardStats, PhotographerSummary, admin::AlbumStatus};

/// Window for the "recent" dashboard figures
const RECENT_DAYS: i64 = 7;

/// Album together with its owner's name and email
pub type AlbumWithOwner = (Album, String, String);

/// Admin repository for cross-user queries
#[derive(Clone)]
pub struct AdminRepository {
    pool: PgPool,
}

impl AdminRepository {
    /// Create a new admin repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn stats(&self, now: DateTime<Utc>) -> Result<DashboardStats> {
        let since = now - Duration::days(RECENT_DAYS);

        let row = sqlx::query(
            r#"
            SELECT
                (SELECT COUNT(*) FROM users WHERE role = 'photographer') AS total_users,
                (SELECT COUNT(*) FROM albums) AS total_albums,
                (SELECT COUNT(*) FROM albums
                    WHERE is_expired = FALSE AND expires_at > $1) AS active_albums,
                (SELECT COUNT(*) FROM photos) AS total_photos,
                (SELECT COALESCE(SUM(view_count), 0)::BIGINT FROM albums) AS total_views,
                (SELECT COALESCE(SUM(download_count), 0)::BIGINT FROM albums) AS total_downloads,
                (SELECT COUNT(*) FROM albums WHERE created_at > $2) AS recent_albums,
                (SELECT COUNT(*) FROM users
                    WHERE role = 'photographer' AND created_at > $2) AS recent_users
            "#,
        )
        .bind(now)
        .bind(since)
        .fetch_one(&self.pool)
        .await?;

        Ok(DashboardStats {
            total_users: row.get("total_users"),
            total_albums: row.get("total_albums"),
            active_albums: row.get("active_albums"),
            total_photos: row.get("total_photos"),
            total_views: row.get("total_views"),
            total_downloads: row.get("total_downloads"),
            recent_albums: row.get("recent_albums"),
            recent_users: row.get("recent_users"),
        })
    }

    /// Photographers with their album totals, newest first
    pub async fn photographers(
        &self,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<PhotographerSummary>, i64)> {
        let total: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE role = 'photographer'")
                .fetch_one(&self.pool)
                .await?;

        let rows = sqlx::query(
            r#"
            SELECT u.id, u.email, u.name, u.email_verified, u.created_at,
                   COUNT(DISTINCT a.id) AS album_count,
                   COALESCE(SUM(a.photo_count), 0)::BIGINT AS total_photos,
                   COALESCE(SUM(a.view_count), 0)::BIGINT AS total_views,
                   COALESCE(SUM(a.download_count), 0)::BIGINT AS total_downloads
            FROM users u
            LEFT JOIN albums a ON u.id = a.user_id
            WHERE u.role = 'photographer'
            GROUP BY u.id
            ORDER BY u.created_at DESC
            LIMIT $1 OFFSET $2
            "#,
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        let users = rows
            .into_iter()
            .map(|row| PhotographerSummary {
                id: row.get("id"),
                email: row.get("email"),
                name: row.get("name"),
                email_verified: row.get("email_verified"),
                created_at: row.get("created_at"),
                album_count: row.get("album_count"),
                total_photos: row.get("total_photos"),
                total_views: row.get("total_views"),
                total_downloads: row.get("total_downloads"),
            })
            .collect();

        Ok((users, total))
    }

    /// Every album joined with its owner, optionally filtered by status
    pub async fn albums_with_owner(
        &self,
        status: Option<AlbumStatus>,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<AlbumWithOwner>, i64)> {
        let filter = match status {
            Some(AlbumStatus::Active) => "WHERE a.is_expired = FALSE AND a.expires_at > NOW()",
            Some(AlbumStatus::Expired) => "WHERE a.is_expired = TRUE OR a.expires_at <= NOW()",
            None => "",
        };

        let total: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM albums a {filter}"))
            .fetch_one(&self.pool)
            .await?;

        let rows = sqlx::query(&format!(
            r#"
            SELECT a.id, a.user_id, a.title, a.share_code, a.description, a.cover_url,
                   a.photo_count, a.view_count, a.download_count, a.expires_at, a.is_expired,
                   a.created_at, a.updated_at,
                   u.name AS user_name, u.email AS user_email
            FROM albums a
            JOIN users u ON a.user_id = u.id
            {filter}
            ORDER BY a.created_at DESC
            LIMIT $1 OFFSET $2
            "#
        ))
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        let albums = rows
            .iter()
            .map(|row| {
                (
                    album_from_row(row),
                    row.get("user_name"),
                    row.get("user_email"),
                )
            })
            .collect();

        Ok((albums, total))
    }
}
