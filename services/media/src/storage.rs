//! Object storage gateway
//!
//! Photos, thumbnails and feedback attachments are stored in an
//! S3-compatible bucket under opaque string keys. Callers depend on the
//! [`ObjectStorage`] trait; [`S3Storage`] is the production implementation.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region};
use aws_sdk_s3::{
    Client,
    config::Credentials,
    presigning::PresigningConfig,
    primitives::ByteStream,
    types::{Delete, ObjectIdentifier},
};
use common::config::StorageConfig;
use tracing::{info, warn};
use uuid::Uuid;

/// Maximum number of keys accepted by one batch delete request
const DELETE_BATCH_SIZE: usize = 1000;

/// Put/delete/sign operations against the bucket
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    /// Store `body` under `key` and return its public URL
    async fn put_object(&self, key: &str, body: Vec<u8>, content_type: &str) -> Result<String>;

    /// Delete every key, in batches
    async fn delete_objects(&self, keys: &[String]) -> Result<()>;

    /// Public URL an object is served from
    fn public_url(&self, key: &str) -> String;

    /// Time-limited GET URL for an object
    async fn presigned_url(&self, key: &str, expires_in: Duration) -> Result<String>;
}

/// Storage gateway backed by `aws-sdk-s3`
#[derive(Clone)]
pub struct S3Storage {
    client: Client,
    bucket: String,
    region: String,
    public_base_url: String,
}

impl S3Storage {
    pub fn new(client: Client, config: &StorageConfig) -> Self {
        Self {
            client,
            bucket: config.bucket.clone(),
            region: config.region.clone(),
            public_base_url: config.public_url.clone(),
        }
    }

    /// Build an S3 client from the storage configuration
    ///
    /// Static credentials are used when an access key is configured, the
    /// default provider chain otherwise.
    pub async fn from_config(config: &StorageConfig) -> Self {
        let mut loader = aws_config::defaults(BehaviorVersion::latest());

        if !config.region.is_empty() {
            loader = loader.region(Region::new(config.region.clone()));
        }
        if !config.access_key_id.is_empty() {
            loader = loader.credentials_provider(Credentials::new(
                config.access_key_id.clone(),
                config.access_key_secret.clone(),
                None,
                None,
                "picshare",
            ));
        }
        if !config.endpoint.is_empty() {
            loader = loader.endpoint_url(normalize_endpoint(&config.endpoint));
        }

        let sdk_config = loader.load().await;
        let client = Client::new(&sdk_config);

        info!(bucket = %config.bucket, "Object storage client initialized");
        Self::new(client, config)
    }
}

#[async_trait]
impl ObjectStorage for S3Storage {
    async fn put_object(&self, key: &str, body: Vec<u8>, content_type: &str) -> Result<String> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(ByteStream::from(body))
            .content_type(content_type)
            .cache_control("max-age=31536000")
            .send()
            .await
            .with_context(|| format!("Failed to upload object {}", key))?;

        Ok(self.public_url(key))
    }

    async fn delete_objects(&self, keys: &[String]) -> Result<()> {
        for batch in keys.chunks(DELETE_BATCH_SIZE) {
            let objects = batch
                .iter()
                .map(|key| ObjectIdentifier::builder().key(key).build())
                .collect::<Result<Vec<_>, _>>()?;

            let delete = Delete::builder().set_objects(Some(objects)).quiet(true).build()?;

            let output = self
                .client
                .delete_objects()
                .bucket(&self.bucket)
                .delete(delete)
                .send()
                .await
                .context("Failed to delete objects")?;

            let errors = output.errors();
            if !errors.is_empty() {
                for e in errors {
                    warn!(
                        key = e.key().unwrap_or_default(),
                        "Object delete failed: {}",
                        e.message().unwrap_or_default()
                    );
                }
                anyhow::bail!("{} of {} objects could not be deleted", errors.len(), batch.len());
            }
        }

        Ok(())
    }

    fn public_url(&self, key: &str) -> String {
        if self.public_base_url.is_empty() {
            format!("https://{}.{}.aliyuncs.com/{}", self.bucket, self.region, key)
        } else {
            format!("{}/{}", self.public_base_url, key)
        }
    }

    async fn presigned_url(&self, key: &str, expires_in: Duration) -> Result<String> {
        let presigned = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .presigned(PresigningConfig::expires_in(expires_in)?)
            .await
            .with_context(|| format!("Failed to sign object {}", key))?;

        Ok(presigned.uri().to_string())
    }
}

fn normalize_endpoint(endpoint: &str) -> String {
    if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
        endpoint.to_string()
    } else {
        format!("https://{}", endpoint)
    }
}

/// Longest extension kept in a storage key
const MAX_EXTENSION_LEN: usize = 10;

/// Lowercased extension of `file_name`, with `jpeg` mapped to `jpg`
///
/// Missing, overlong or non-alphanumeric extensions also become `jpg`, so a
/// client file name can never add path segments to a key.
pub fn file_extension(file_name: &str) -> String {
    let ext = file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();

    let valid = !ext.is_empty()
        && ext.len() <= MAX_EXTENSION_LEN
        && ext.chars().all(|c| c.is_ascii_alphanumeric());

    match ext.as_str() {
        "jpeg" => "jpg".to_string(),
        _ if valid => ext,
        _ => "jpg".to_string(),
    }
}

/// Storage keys of one uploaded photo
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhotoKeys {
    pub original: String,
    pub thumbnail: String,
}

impl PhotoKeys {
    /// `photos/{user}/{album}/{id}.{ext}` and `photos/{user}/{album}/thumb_{id}.jpg`
    pub fn new(user_id: i64, album_id: i64, file_name: &str) -> Self {
        let file_id = Uuid::new_v4();
        let ext = file_extension(file_name);

        Self {
            original: format!("photos/{}/{}/{}.{}", user_id, album_id, file_id, ext),
            thumbnail: format!("photos/{}/{}/thumb_{}.jpg", user_id, album_id, file_id),
        }
    }
}

/// `feedback/{id}.{ext}`
pub fn feedback_key(file_name: &str) -> String {
    format!("feedback/{}.{}", Uuid::new_v4(), file_extension(file_name))
}
