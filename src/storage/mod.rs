//! Object storage
//!
//! The pipeline reads originals through the [`ObjectStore`] trait:
//! - [`S3ObjectStore`] for S3 and S3-compatible endpoints
//! - [`MemoryObjectStore`] for tests and local files

use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region};
use aws_sdk_s3::Client as S3Client;
use bytes::Bytes;
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::debug;

use crate::config::ServiceConfig;

/// Storage failures
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Object not found: {bucket}/{key}")]
    NotFound { bucket: String, key: String },

    #[error("Storage backend error: {0}")]
    Backend(String),
}

impl StorageError {
    pub fn to_http_status(&self) -> u16 {
        match self {
            StorageError::NotFound { .. } => 404,
            StorageError::Backend(_) => 502,
        }
    }
}

/// An object body plus the headers the pipeline needs
#[derive(Debug, Clone, PartialEq)]
pub struct StoredObject {
    pub body: Bytes,
    pub content_type: Option<String>,
    pub content_length: u64,
}

impl StoredObject {
    pub fn new(body: impl Into<Bytes>, content_type: Option<String>) -> Self {
        let body = body.into();
        Self {
            content_length: body.len() as u64,
            body,
            content_type,
        }
    }
}

/// Read access to originals
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Bucket the store reads from
    fn bucket(&self) -> &str;

    async fn get(&self, key: &str) -> Result<StoredObject, StorageError>;
}

/// S3-backed store
pub struct S3ObjectStore {
    client: S3Client,
    bucket: String,
}

impl S3ObjectStore {
    pub fn new(client: S3Client, bucket: impl Into<String>) -> Self {
        Self {
            client,
            bucket: bucket.into(),
        }
    }

    /// Build a client from the ambient AWS configuration, honouring the
    /// configured region and endpoint
    pub async fn from_config(config: &ServiceConfig) -> Self {
        let mut loader = aws_config::defaults(BehaviorVersion::latest());
        if let Some(region) = &config.region {
            loader = loader.region(Region::new(region.clone()));
        }
        if let Some(endpoint) = &config.endpoint {
            loader = loader.endpoint_url(endpoint);
        }
        let sdk_config = loader.load().await;

        let s3_config = aws_sdk_s3::config::Builder::from(&sdk_config)
            .force_path_style(config.endpoint.is_some())
            .build();

        Self::new(S3Client::from_conf(s3_config), config.source_bucket.clone())
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    fn bucket(&self) -> &str {
        &self.bucket
    }

    async fn get(&self, key: &str) -> Result<StoredObject, StorageError> {
        debug!(bucket = %self.bucket, key = %key, "Fetching object");

        let response = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| {
                if e.as_service_error().map_or(false, |err| err.is_no_such_key()) {
                    StorageError::NotFound {
                        bucket: self.bucket.clone(),
                        key: key.to_string(),
                    }
                } else {
                    StorageError::Backend(format!("S3 fetch failed: {e}"))
                }
            })?;

        let content_type = response.content_type().map(str::to_string);
        let bytes = response
            .body
            .collect()
            .await
            .map_err(|e| StorageError::Backend(format!("Failed to read S3 body: {e}")))?;

        Ok(StoredObject::new(bytes.into_bytes(), content_type))
    }
}

/// In-memory store
#[derive(Default)]
pub struct MemoryObjectStore {
    bucket: String,
    objects: RwLock<HashMap<String, StoredObject>>,
}

impl MemoryObjectStore {
    pub fn new(bucket: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            objects: RwLock::new(HashMap::new()),
        }
    }

    pub async fn insert(
        &self,
        key: impl Into<String>,
        body: impl Into<Bytes>,
        content_type: Option<&str>,
    ) {
        let object = StoredObject::new(body, content_type.map(str::to_string));
        self.objects.write().await.insert(key.into(), object);
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    fn bucket(&self) -> &str {
        &self.bucket
    }

    async fn get(&self, key: &str) -> Result<StoredObject, StorageError> {
        self.objects
            .read()
            .await
            .get(key)
            .cloned()
            .ok_or_else(|| StorageError::NotFound {
                bucket: self.bucket.clone(),
                key: key.to_string(),
            })
    }
}
