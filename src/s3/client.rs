//! AWS S3 client wrapper

use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region};
use aws_sdk_s3::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use std::path::Path;
use thiserror::Error;

use crate::s3::credentials::ResolvedCredentials;
use crate::s3::types::{ListPage, ObjectKey};
use crate::transfer::ObjectStore;

/// Page size used when draining a full listing.
const LIST_PAGE_SIZE: i32 = 1000;

/// Enumeration failure; aborts the whole listing.
#[derive(Debug, Error)]
pub enum ListError {
    #[error("access denied listing bucket '{bucket}'")]
    AccessDenied { bucket: String },

    #[error("bucket '{bucket}' not found")]
    BucketNotFound { bucket: String },

    #[error("listing failed: {0}")]
    Other(String),
}

/// Per-object failure; recorded against the item, never fatal to a batch.
#[derive(Debug, Error)]
pub enum ObjectError {
    #[error("object '{key}' not found")]
    NotFound { key: String },

    #[error("access denied for object '{key}'")]
    AccessDenied { key: String },

    #[error("{0}")]
    Other(String),
}

/// Connection overrides, used by tests to point at a local MinIO endpoint.
#[derive(Debug, Clone, Default)]
pub struct S3ClientConfig {
    pub endpoint_url: Option<String>,
    pub force_path_style: bool,
    pub region: Option<String>,
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
}

/// S3 client wrapper with the operations the transfer engine needs.
#[derive(Clone)]
pub struct S3Client {
    client: Client,
    region: String,
}

impl S3Client {
    pub(crate) fn new(client: Client, region: String) -> Self {
        Self { client, region }
    }

    /// Build a client directly from resolved credentials.
    pub fn from_resolved(creds: &ResolvedCredentials) -> Self {
        let provider = aws_sdk_s3::config::Credentials::new(
            creds.access_key_id.clone(),
            creds.secret_access_key.clone(),
            creds.session_token.clone(),
            creds.expiry.map(|e| e.into()),
            "resolved-credentials",
        );

        let config = aws_sdk_s3::config::Builder::new()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new(creds.region.clone()))
            .credentials_provider(provider)
            .build();

        Self::new(Client::from_conf(config), creds.region.clone())
    }

    /// Build a client from explicit connection settings. Intended for
    /// non-AWS endpoints such as MinIO.
    pub fn with_config(config: S3ClientConfig) -> Self {
        let region = config.region.unwrap_or_else(|| "us-east-1".to_string());

        let mut builder = aws_sdk_s3::config::Builder::new()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new(region.clone()));

        if let (Some(key_id), Some(secret)) = (config.access_key_id, config.secret_access_key) {
            builder = builder.credentials_provider(aws_sdk_s3::config::Credentials::new(
                key_id, secret, None, None, "explicit-config",
            ));
        }

        if let Some(endpoint) = config.endpoint_url {
            builder = builder.endpoint_url(endpoint);
        }

        if config.force_path_style {
            builder = builder.force_path_style(true);
        }

        Self::new(Client::from_conf(builder.build()), region)
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    /// Fetch one page of a prefix-scoped listing. Directory markers are
    /// filtered out; the store's lexicographic key order is preserved.
    pub async fn list_page(
        &self,
        bucket: &str,
        prefix: &str,
        continuation_token: Option<&str>,
        max_keys: i32,
    ) -> Result<ListPage, ListError> {
        let mut request = self
            .client
            .list_objects_v2()
            .bucket(bucket)
            .prefix(prefix)
            .max_keys(max_keys);

        if let Some(token) = continuation_token {
            request = request.continuation_token(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| map_list_error(bucket, e))?;

        let keys = response
            .contents()
            .iter()
            .filter_map(|obj| obj.key())
            .map(ObjectKey::from)
            .filter(|key| !key.is_directory_marker())
            .collect();

        Ok(ListPage {
            keys,
            is_truncated: response.is_truncated().unwrap_or(false),
            next_token: response.next_continuation_token().map(|s| s.to_string()),
        })
    }

    /// Drain a paginated listing into a flat key sequence, following
    /// continuation tokens until exhausted. A page failure aborts the scan.
    pub async fn list_keys(&self, bucket: &str, prefix: &str) -> Result<Vec<ObjectKey>, ListError> {
        let mut keys = Vec::new();
        let mut token: Option<String> = None;

        loop {
            let page = self
                .list_page(bucket, prefix, token.as_deref(), LIST_PAGE_SIZE)
                .await?;
            keys.extend(page.keys);

            match (page.is_truncated, page.next_token) {
                (true, Some(next)) => token = Some(next),
                _ => break,
            }
        }

        tracing::debug!(bucket, prefix, count = keys.len(), "listed keys");
        Ok(keys)
    }

    /// Fetch a whole object into a local file, truncating any existing file
    /// at the destination.
    pub async fn fetch_object(
        &self,
        bucket: &str,
        key: &ObjectKey,
        dest: &Path,
    ) -> Result<(), ObjectError> {
        let response = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key.as_str())
            .send()
            .await
            .map_err(|e| map_object_error(key, e))?;

        let data = response
            .body
            .collect()
            .await
            .map_err(|e| ObjectError::Other(format!("failed to read object body: {e}")))?;

        tokio::fs::write(dest, data.into_bytes())
            .await
            .map_err(|e| ObjectError::Other(format!("failed to write '{}': {e}", dest.display())))?;

        Ok(())
    }

    /// Stream a local file's contents to the store under the given key.
    pub async fn put_object(
        &self,
        bucket: &str,
        key: &ObjectKey,
        source: &Path,
    ) -> Result<(), ObjectError> {
        let body = ByteStream::from_path(source).await.map_err(|e| {
            ObjectError::Other(format!("failed to read '{}': {e}", source.display()))
        })?;

        self.client
            .put_object()
            .bucket(bucket)
            .key(key.as_str())
            .body(body)
            .send()
            .await
            .map_err(|e| map_object_error(key, e))?;

        Ok(())
    }
}

#[async_trait]
impl ObjectStore for S3Client {
    async fn list_keys(&self, bucket: &str, prefix: &str) -> Result<Vec<ObjectKey>, ListError> {
        S3Client::list_keys(self, bucket, prefix).await
    }

    async fn fetch_object(
        &self,
        bucket: &str,
        key: &ObjectKey,
        dest: &Path,
    ) -> Result<(), ObjectError> {
        S3Client::fetch_object(self, bucket, key, dest).await
    }

    async fn put_object(
        &self,
        bucket: &str,
        key: &ObjectKey,
        source: &Path,
    ) -> Result<(), ObjectError> {
        S3Client::put_object(self, bucket, key, source).await
    }
}

fn map_list_error<E, R>(bucket: &str, err: SdkError<E, R>) -> ListError
where
    E: ProvideErrorMetadata + std::error::Error + Send + Sync + 'static,
    R: std::fmt::Debug + Send + Sync + 'static,
{
    classify_list_error(bucket, err.code(), format!("{}", DisplayErrorContext(&err)))
}

fn map_object_error<E, R>(key: &ObjectKey, err: SdkError<E, R>) -> ObjectError
where
    E: ProvideErrorMetadata + std::error::Error + Send + Sync + 'static,
    R: std::fmt::Debug + Send + Sync + 'static,
{
    classify_object_error(key, err.code(), format!("{}", DisplayErrorContext(&err)))
}

/// Map a listing failure's service code to a typed error.
fn classify_list_error(bucket: &str, code: Option<&str>, detail: String) -> ListError {
    match code {
        Some("AccessDenied") => ListError::AccessDenied {
            bucket: bucket.to_string(),
        },
        Some("NoSuchBucket") => ListError::BucketNotFound {
            bucket: bucket.to_string(),
        },
        _ => ListError::Other(detail),
    }
}

/// Map a per-object failure's service code to a typed error.
fn classify_object_error(key: &ObjectKey, code: Option<&str>, detail: String) -> ObjectError {
    match code {
        Some("NoSuchKey") | Some("NotFound") => ObjectError::NotFound {
            key: key.to_string(),
        },
        Some("AccessDenied") => ObjectError::AccessDenied {
            key: key.to_string(),
        },
        _ => ObjectError::Other(detail),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_list_error_access_denied() {
        let err = classify_list_error("secrets", Some("AccessDenied"), "detail".to_string());
        assert!(matches!(err, ListError::AccessDenied { ref bucket } if bucket == "secrets"));
    }

    #[test]
    fn test_classify_list_error_no_such_bucket() {
        let err = classify_list_error("gone", Some("NoSuchBucket"), "detail".to_string());
        assert!(matches!(err, ListError::BucketNotFound { ref bucket } if bucket == "gone"));
    }

    #[test]
    fn test_classify_list_error_unknown_code_keeps_detail() {
        let err = classify_list_error(
            "bucket",
            Some("SlowDown"),
            "service is busy".to_string(),
        );
        assert!(matches!(err, ListError::Other(ref msg) if msg == "service is busy"));

        let err = classify_list_error("bucket", None, "connection reset".to_string());
        assert!(matches!(err, ListError::Other(ref msg) if msg == "connection reset"));
    }

    #[test]
    fn test_classify_object_error_not_found() {
        let key = ObjectKey::from("a/b.txt");
        for code in ["NoSuchKey", "NotFound"] {
            let err = classify_object_error(&key, Some(code), "detail".to_string());
            assert!(matches!(err, ObjectError::NotFound { ref key } if key == "a/b.txt"));
        }
    }

    #[test]
    fn test_classify_object_error_access_denied() {
        let key = ObjectKey::from("locked.bin");
        let err = classify_object_error(&key, Some("AccessDenied"), "detail".to_string());
        assert!(matches!(err, ObjectError::AccessDenied { ref key } if key == "locked.bin"));
    }

    #[test]
    fn test_classify_object_error_unknown_code_keeps_detail() {
        let key = ObjectKey::from("x.txt");
        let err = classify_object_error(&key, None, "timed out".to_string());
        assert!(matches!(err, ObjectError::Other(ref msg) if msg == "timed out"));
    }
}
