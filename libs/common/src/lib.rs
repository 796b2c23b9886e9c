//! Common library for the PicShare backend
//!
//! This crate provides shared functionality used across the services:
//! configuration loading, database connectivity and migrations, and the
//! error types handlers report through.
//!
//! ```rust,no_run
//! use common::config::AppConfig;
//! use common::database::{health_check, init_pool, run_migrations};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = AppConfig::from_env()?;
//!     let pool = init_pool(&config.database).await?;
//!     run_migrations(&pool).await?;
//!     println!("Database health check: {}", health_check(&pool).await);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod database;
pub mod error;
