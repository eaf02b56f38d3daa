//! Object storage for generated images and videos.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("object storage is not configured")]
    Disabled,

    #[error("upload request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("upload rejected ({status}): {body}")]
    Rejected { status: u16, body: String },
}

/// Uploads an object and returns its public URL.
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    async fn upload(&self, key: &str, content_type: &str, data: Vec<u8>)
        -> Result<String, StorageError>;
}

/// Storage used when no endpoint is configured; every upload is refused.
pub struct DisabledStorage;

#[async_trait]
impl ObjectStorage for DisabledStorage {
    async fn upload(
        &self,
        _key: &str,
        _content_type: &str,
        _data: Vec<u8>,
    ) -> Result<String, StorageError> {
        Err(StorageError::Disabled)
    }
}

/// Bucket storage reached with plain HTTP `PUT {endpoint}/{bucket}/{key}`.
pub struct HttpObjectStorage {
    client: reqwest::Client,
    endpoint: String,
    bucket: String,
}

impl HttpObjectStorage {
    pub fn new(endpoint: &str, bucket: &str, timeout: Duration) -> Result<Self, StorageError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            bucket: bucket.trim_matches('/').to_string(),
        })
    }

    /// Public URL of an object.
    pub fn object_url(&self, key: &str) -> String {
        format!("{}/{}/{}", self.endpoint, self.bucket, key.trim_start_matches('/'))
    }
}

#[async_trait]
impl ObjectStorage for HttpObjectStorage {
    async fn upload(
        &self,
        key: &str,
        content_type: &str,
        data: Vec<u8>,
    ) -> Result<String, StorageError> {
        let url = self.object_url(key);
        let response = self
            .client
            .put(&url)
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .body(data)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(StorageError::Rejected {
                status: status.as_u16(),
                body,
            });
        }
        Ok(url)
    }
}

/// Select the storage variant: HTTP when both endpoint and bucket are set,
/// disabled otherwise.
pub fn build_storage(
    endpoint: Option<&str>,
    bucket: Option<&str>,
) -> Result<Arc<dyn ObjectStorage>, StorageError> {
    match (endpoint, bucket) {
        (Some(endpoint), Some(bucket)) => {
            tracing::info!(endpoint, bucket, "Object storage enabled");
            Ok(Arc::new(HttpObjectStorage::new(
                endpoint,
                bucket,
                Duration::from_secs(60),
            )?))
        }
        _ => {
            tracing::warn!("Object storage not configured, inline media will not be uploaded");
            Ok(Arc::new(DisabledStorage))
        }
    }
}
