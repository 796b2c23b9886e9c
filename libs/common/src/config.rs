//! Application configuration
//!
//! Every setting is read from the process environment through the `config`
//! crate, layered over documented defaults, and then split into per-concern
//! structs that the services receive at startup.
//!
//! # Environment Variables
//! - `PORT` (default: 3000), `NODE_ENV` (default: development)
//! - `DATABASE_URL` or `DB_HOST`/`DB_PORT`/`DB_USER`/`DB_PASSWORD`/`DB_NAME`
//! - `DATABASE_MAX_CONNECTIONS` (default: 10)
//! - `OSS_REGION`, `OSS_ACCESS_KEY_ID`, `OSS_ACCESS_KEY_SECRET`, `OSS_BUCKET`,
//!   `OSS_ENDPOINT`, `OSS_PUBLIC_URL`
//! - `JWT_SECRET` (default: dev-secret)
//! - `SMTP_HOST`, `SMTP_PORT` (default: 465), `SMTP_USER`, `SMTP_PASS`, `FEEDBACK_EMAIL`
//! - `FRONTEND_URL` (default: http://localhost:5173)
//! - `ADMIN_EMAIL`, `ADMIN_PASSWORD`, `ADMIN_NAME`
//! - `MAX_FILE_SIZE`, `MAX_FILES_PER_UPLOAD`, `MAX_PHOTOS_PER_ALBUM`,
//!   `MAX_ALBUMS_PER_USER`, `THUMBNAIL_WIDTH`, `THUMBNAIL_QUALITY`

use config::{Config, ConfigError, Environment};
use serde::Deserialize;

use crate::database::DatabaseConfig;

/// Flat view of the environment, one field per variable
#[derive(Debug, Deserialize)]
struct Settings {
    port: u16,
    node_env: String,
    database_url: String,
    database_max_connections: u32,
    db_host: String,
    db_port: u16,
    db_user: String,
    db_password: String,
    db_name: String,
    oss_region: String,
    oss_access_key_id: String,
    oss_access_key_secret: String,
    oss_bucket: String,
    oss_endpoint: String,
    oss_public_url: String,
    jwt_secret: String,
    smtp_host: String,
    smtp_port: u16,
    smtp_user: String,
    smtp_pass: String,
    feedback_email: String,
    frontend_url: String,
    admin_email: String,
    admin_password: String,
    admin_name: String,
    max_file_size: u64,
    max_files_per_upload: usize,
    max_photos_per_album: i64,
    max_albums_per_user: i64,
    thumbnail_width: u32,
    thumbnail_quality: u8,
}

/// HTTP server settings
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
    pub env: String,
}

impl ServerConfig {
    pub fn is_production(&self) -> bool {
        self.env == "production"
    }
}

/// Object storage settings for an S3-compatible bucket
#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub region: String,
    pub access_key_id: String,
    pub access_key_secret: String,
    pub bucket: String,
    /// Custom endpoint, empty for the provider default
    pub endpoint: String,
    /// Base URL objects are publicly served from, empty to derive it from bucket and region
    pub public_url: String,
}

/// Token signing settings
#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub secret: String,
    /// Token lifetime in seconds (7 days)
    pub expiry_seconds: i64,
}

/// SMTP settings; mail is skipped when host, user or password is missing
#[derive(Debug, Clone)]
pub struct EmailConfig {
    pub smtp_host: String,
    pub smtp_port: u16,
    pub smtp_user: String,
    pub smtp_pass: String,
    pub feedback_email: String,
}

impl EmailConfig {
    pub fn is_configured(&self) -> bool {
        !self.smtp_host.is_empty() && !self.smtp_user.is_empty() && !self.smtp_pass.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct FrontendConfig {
    pub url: String,
}

/// Credentials of the admin account seeded at startup
#[derive(Debug, Clone)]
pub struct AdminConfig {
    pub email: String,
    pub password: String,
    pub name: String,
}

/// Upload and quota limits
#[derive(Debug, Clone)]
pub struct UploadConfig {
    /// Maximum size of a single uploaded file in bytes
    pub max_file_size: u64,
    pub max_files_per_upload: usize,
    pub max_photos_per_album: i64,
    pub max_albums_per_user: i64,
    pub thumbnail_width: u32,
    pub thumbnail_quality: u8,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            max_file_size: 50 * 1024 * 1024,
            max_files_per_upload: 20,
            max_photos_per_album: 50,
            max_albums_per_user: 10,
            thumbnail_width: 800,
            thumbnail_quality: 75,
        }
    }
}

/// Complete application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub storage: StorageConfig,
    pub jwt: JwtConfig,
    pub email: EmailConfig,
    pub frontend: FrontendConfig,
    pub admin: AdminConfig,
    pub upload: UploadConfig,
}

impl AppConfig {
    /// Load the configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let upload = UploadConfig::default();

        let settings: Settings = Config::builder()
            .set_default("port", 3000)?
            .set_default("node_env", "development")?
            .set_default("database_url", "")?
            .set_default("database_max_connections", 10)?
            .set_default("db_host", "localhost")?
            .set_default("db_port", 5432)?
            .set_default("db_user", "postgres")?
            .set_default("db_password", "")?
            .set_default("db_name", "picshare")?
            .set_default("oss_region", "")?
            .set_default("oss_access_key_id", "")?
            .set_default("oss_access_key_secret", "")?
            .set_default("oss_bucket", "")?
            .set_default("oss_endpoint", "")?
            .set_default("oss_public_url", "")?
            .set_default("jwt_secret", "dev-secret")?
            .set_default("smtp_host", "")?
            .set_default("smtp_port", 465)?
            .set_default("smtp_user", "")?
            .set_default("smtp_pass", "")?
            .set_default("feedback_email", "")?
            .set_default("frontend_url", "http://localhost:5173")?
            .set_default("admin_email", "admin@picshare.com.cn")?
            .set_default("admin_password", "Admin123456!")?
            .set_default("admin_name", "Administrator")?
            .set_default("max_file_size", upload.max_file_size as i64)?
            .set_default("max_files_per_upload", upload.max_files_per_upload as i64)?
            .set_default("max_photos_per_album", upload.max_photos_per_album)?
            .set_default("max_albums_per_user", upload.max_albums_per_user)?
            .set_default("thumbnail_width", upload.thumbnail_width as i64)?
            .set_default("thumbnail_quality", upload.thumbnail_quality as i64)?
            .add_source(Environment::default().try_parsing(true))
            .build()?
            .try_deserialize()?;

        Self::from_settings(settings)
    }

    fn from_settings(s: Settings) -> Result<Self, ConfigError> {
        let server = ServerConfig {
            port: s.port,
            env: s.node_env,
        };

        if server.is_production() && s.database_url.is_empty() && s.db_password.is_empty() {
            return Err(ConfigError::Message(
                "DB_PASSWORD or DATABASE_URL must be set in production".to_string(),
            ));
        }

        let database_url = if s.database_url.is_empty() {
            format!(
                "postgresql://{}:{}@{}:{}/{}",
                s.db_user, s.db_password, s.db_host, s.db_port, s.db_name
            )
        } else {
            s.database_url
        };

        Ok(Self {
            server,
            database: DatabaseConfig {
                database_url,
                max_connections: s.database_max_connections,
            },
            storage: StorageConfig {
                region: s.oss_region,
                access_key_id: s.oss_access_key_id,
                access_key_secret: s.oss_access_key_secret,
                bucket: s.oss_bucket,
                endpoint: s.oss_endpoint,
                public_url: s.oss_public_url.trim_end_matches('/').to_string(),
            },
            jwt: JwtConfig {
                secret: s.jwt_secret,
                expiry_seconds: 7 * 24 * 60 * 60,
            },
            email: EmailConfig {
                smtp_host: s.smtp_host,
                smtp_port: s.smtp_port,
                smtp_user: s.smtp_user,
                smtp_pass: s.smtp_pass,
                feedback_email: s.feedback_email,
            },
            frontend: FrontendConfig {
                url: s.frontend_url.trim_end_matches('/').to_string(),
            },
            admin: AdminConfig {
                email: s.admin_email,
                password: s.admin_password,
                name: s.admin_name,
            },
            upload: UploadConfig {
                max_file_size: s.max_file_size,
                max_files_per_upload: s.max_files_per_upload,
                max_photos_per_album: s.max_photos_per_album,
                max_albums_per_user: s.max_albums_per_user,
                thumbnail_width: s.thumbnail_width,
                thumbnail_quality: s.thumbnail_quality,
            },
        })
    }
}
