use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod cleanup;
mod error;
mod lifecycle;
mod models;
mod repositories;
mod routes;
mod state;

use auth::{
    AuthState, JwtService, Mailer, SmtpMailer,
    rate_limiter::RateLimiterConfig,
    repositories::UserRepository,
};
use common::{
    config::AppConfig,
    database::{health_check, init_pool, run_migrations},
};
use media::{ImageThumbnailer, ObjectStorage, S3Storage, ThumbnailGenerator};
use tokio::net::TcpListener;

use crate::{
    cleanup::CleanupScheduler,
    lifecycle::{AlbumLifecycle, AlbumStore, PgAlbumStore},
    repositories::{AccessLogRepository, AdminRepository, AlbumRepository},
    state::AppState,
};

#[tokio::main]
async fn main() -> Result<()> {
    let config = Arc::new(AppConfig::from_env()?);

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Starting PicShare API in {} mode", config.server.env);

    // Initialize database connection pool
    let pool = init_pool(&config.database).await?;

    // Check database connectivity
    if health_check(&pool).await {
        info!("Database connection successful");
    } else {
        anyhow::bail!("Failed to connect to database");
    }

    run_migrations(&pool).await?;
    info!("Database migrations applied");

    // External services
    let storage: Arc<dyn ObjectStorage> = Arc::new(S3Storage::from_config(&config.storage).await);
    let thumbnailer: Arc<dyn ThumbnailGenerator> = Arc::new(ImageThumbnailer::new(
        config.upload.thumbnail_width,
        config.upload.thumbnail_quality,
    ));
    let mailer: Arc<dyn Mailer> = Arc::new(SmtpMailer::new(&config.email, &config.frontend.url)?);

    // Seed the administrator account
    let user_repository = UserRepository::new(pool.clone());
    match user_repository.ensure_admin(&config.admin).await {
        Ok(true) => info!("Created admin account {}", config.admin.email),
        Ok(false) => {}
        Err(e) => warn!("Failed to seed admin account: {:#}", e),
    }

    let store: Arc<dyn AlbumStore> = Arc::new(PgAlbumStore::new(pool.clone()));
    let lifecycle = AlbumLifecycle::new(
        store.clone(),
        storage.clone(),
        thumbnailer,
        config.upload.clone(),
        config.frontend.url.clone(),
    );

    // Expired album cleanup: one sweep now, then hourly
    let cleanup = CleanupScheduler::new(store, storage.clone());
    cleanup.run_once().await;
    let mut scheduler = cleanup.start().await?;

    let jwt_service = JwtService::new(&config.jwt);

    let auth_state = AuthState {
        user_repository,
        jwt_service: jwt_service.clone(),
        mailer: mailer.clone(),
        rate_limit: RateLimiterConfig::auth(),
    };

    let app_state = AppState {
        db_pool: pool.clone(),
        config: config.clone(),
        lifecycle,
        album_repository: AlbumRepository::new(pool.clone()),
        admin_repository: AdminRepository::new(pool.clone()),
        access_log_repository: AccessLogRepository::new(pool),
        storage,
        mailer,
        jwt_service,
        rate_limit: RateLimiterConfig::api(),
    };

    // Start the web server
    let app = routes::create_router(app_state, auth_state)?;

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    let listener = TcpListener::bind(addr).await?;
    info!("PicShare API listening on {}", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    info!("Shutting down cleanup scheduler");
    scheduler.shutdown().await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
