//! Media handling for PicShare
//!
//! Object storage access and thumbnail generation. Both are exposed as
//! traits so the album lifecycle can be exercised without a bucket.

pub mod storage;
pub mod thumbnail_generator;

pub use storage::{ObjectStorage, PhotoKeys, S3Storage};
pub use thumbnail_generator::{ImageThumbnailer, Thumbnail, ThumbnailGenerator};

/// Content types accepted for photo uploads
pub const ALLOWED_IMAGE_TYPES: &[&str] = &[
    "image/jpeg",
    "image/jpg",
    "image/png",
    "image/gif",
    "image/webp",
    "image/heic",
    "image/heif",
];

pub fn is_allowed_image_type(content_type: &str) -> bool {
    ALLOWED_IMAGE_TYPES.contains(&content_type.to_ascii_lowercase().as_str())
}
