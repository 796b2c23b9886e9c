//! Access log repository for database operations

use anyhow::Result;
use sqlx::{PgPool, Row};

use crate::models::{AccessAction, AccessInfo, AccessLog};

/// Access log repository for database operations
#[derive(Clone)]
pub struct AccessLogRepository {
    pool: PgPool,
}

impl AccessLogRepository {
    /// Create a new access log repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn record(
        &self,
        album_id: i64,
        action: AccessAction,
        photo_id: Option<i64>,
        access: &AccessInfo,
    ) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO album_access_logs (album_id, ip_address, user_agent, action, photo_id)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(album_id)
        .bind(&access.ip_address)
        .bind(&access.user_agent)
        .bind(action.as_str())
        .bind(photo_id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Most recent entries for an album
    pub async fn latest_by_album(&self, album_id: i64, limit: i64) -> Result<Vec<AccessLog>> {
        let rows = sqlx::query(
            r#"
            SELECT id, album_id, ip_address, user_agent, action, photo_id, created_at
            FROM album_access_logs
            WHERE album_id = $1
            ORDER BY created_at DESC, id DESC
            LIMIT $2
            "#,
        )
        .bind(album_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        let logs = rows
            .into_iter()
            .map(|row| AccessLog {
                id: row.get("id"),
                album_id: row.get("album_id"),
                ip_address: row.get("ip_address"),
                user_agent: row.get("user_agent"),
                action: row.get("action"),
                photo_id: row.get("photo_id"),
                created_at: row.get("created_at"),
            })
            .collect();

        Ok(logs)
    }
}
