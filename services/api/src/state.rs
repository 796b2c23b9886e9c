//! Application state shared across handlers

use std::sync::Arc;

use auth::{JwtService, Mailer, rate_limiter::RateLimiterConfig};
use common::config::AppConfig;
use media::ObjectStorage;
use sqlx::PgPool;

use crate::{
    lifecycle::AlbumLifecycle,
    repositories::{AccessLogRepository, AdminRepository, AlbumRepository},
};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub db_pool: PgPool,
    pub config: Arc<AppConfig>,
    pub lifecycle: AlbumLifecycle,
    pub album_repository: AlbumRepository,
    pub admin_repository: AdminRepository,
    pub access_log_repository: AccessLogRepository,
    /// Feedback attachments go straight to storage
    pub storage: Arc<dyn ObjectStorage>,
    pub mailer: Arc<dyn Mailer>,
    pub jwt_service: JwtService,
    /// General API limit, applied to everything but the health check
    pub rate_limit: RateLimiterConfig,
}
