//! User repository for database operations

use anyhow::Result;
use chrono::{DateTime, Utc};
use common::config::AdminConfig;
use sqlx::{PgPool, Row, postgres::PgRow};
use tracing::info;

use crate::models::{NewUser, Role, User};
use crate::password::hash_password;

const USER_COLUMNS: &str = "id, email, password_hash, name, role, email_verified, avatar_url, created_at, updated_at";

/// User repository
#[derive(Clone)]
pub struct UserRepository {
    pool: PgPool,
}

fn user_from_row(row: &PgRow) -> Result<User> {
    let role: String = row.get("role");

    Ok(User {
        id: row.get("id"),
        email: row.get("email"),
        password_hash: row.get("password_hash"),
        name: row.get("name"),
        role: role.parse().map_err(|e: String| anyhow::anyhow!(e))?,
        email_verified: row.get("email_verified"),
        avatar_url: row.get("avatar_url"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

impl UserRepository {
    /// Create a new user repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create a new user
    pub async fn create(&self, new_user: &NewUser) -> Result<User> {
        info!("Creating new user: {}", new_user.email);

        let row = sqlx::query(&format!(
            r#"
            INSERT INTO users (email, password_hash, name, role, email_verified,
                               verification_token, verification_expires)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(&new_user.email)
        .bind(&new_user.password_hash)
        .bind(&new_user.name)
        .bind(new_user.role.as_str())
        .bind(new_user.email_verified)
        .bind(&new_user.verification_token)
        .bind(new_user.verification_expires)
        .fetch_one(&self.pool)
        .await?;

        user_from_row(&row)
    }

    /// Find a user by email
    pub async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        let row = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1"))
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(user_from_row).transpose()
    }

    /// Find a user by ID
    pub async fn find_by_id(&self, id: i64) -> Result<Option<User>> {
        let row = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(user_from_row).transpose()
    }

    pub async fn email_exists(&self, email: &str) -> Result<bool> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE email = $1)")
            .bind(email)
            .fetch_one(&self.pool)
            .await?;

        Ok(exists)
    }

    /// Mark the account holding a live verification token as verified
    ///
    /// Returns `false` when the token is unknown or expired.
    pub async fn verify_email(&self, token: &str) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET email_verified = TRUE, verification_token = NULL,
                verification_expires = NULL, updated_at = NOW()
            WHERE verification_token = $1
              AND (verification_expires IS NULL OR verification_expires > NOW())
            "#,
        )
        .bind(token)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn set_verification_token(
        &self,
        user_id: i64,
        token: &str,
        expires: DateTime<Utc>,
    ) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE users
            SET verification_token = $1, verification_expires = $2, updated_at = NOW()
            WHERE id = $3
            "#,
        )
        .bind(token)
        .bind(expires)
        .bind(user_id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn set_reset_token(
        &self,
        user_id: i64,
        token: &str,
        expires: DateTime<Utc>,
    ) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE users
            SET reset_token = $1, reset_expires = $2, updated_at = NOW()
            WHERE id = $3
            "#,
        )
        .bind(token)
        .bind(expires)
        .bind(user_id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Replace the password of the account holding a live reset token
    ///
    /// Returns `false` when the token is unknown or expired.
    pub async fn reset_password(&self, token: &str, password_hash: &str) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET password_hash = $1, reset_token = NULL, reset_expires = NULL, updated_at = NOW()
            WHERE reset_token = $2 AND reset_expires > NOW()
            "#,
        )
        .bind(password_hash)
        .bind(token)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn update_password(&self, user_id: i64, password_hash: &str) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE users
            SET password_hash = $1, reset_token = NULL, reset_expires = NULL, updated_at = NOW()
            WHERE id = $2
            "#,
        )
        .bind(password_hash)
        .bind(user_id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn update_name(&self, user_id: i64, name: &str) -> Result<Option<User>> {
        let row = sqlx::query(&format!(
            r#"
            UPDATE users SET name = $1, updated_at = NOW()
            WHERE id = $2
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(name)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(user_from_row).transpose()
    }

    /// Create the configured admin account if it does not exist yet
    ///
    /// Returns `true` when an account was created.
    pub async fn ensure_admin(&self, admin: &AdminConfig) -> Result<bool> {
        if self.email_exists(&admin.email).await? {
            return Ok(false);
        }

        let password_hash = hash_password(&admin.password)?;
        self.create(&NewUser {
            email: admin.email.clone(),
            password_hash,
            name: admin.name.clone(),
            role: Role::Admin,
            email_verified: true,
            verification_token: None,
            verification_expires: None,
        })
        .await?;

        info!("Seeded admin account {}", admin.email);
        Ok(true)
    }
}
