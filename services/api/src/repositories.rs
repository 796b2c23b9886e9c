//! Repositories for database operations

pub mod access_log;
pub mod admin;
pub mod album;
pub mod photo;

#[cfg(test)]
pub(crate) mod fixtures;

pub use access_log::AccessLogRepository;
pub use admin::AdminRepository;
pub use album::AlbumRepository;
pub use photo::PhotoRepository;
