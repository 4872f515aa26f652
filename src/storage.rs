//! # Storage Abstraction Module
//!
//! Unified interface for fetching bytes from the places climate data lives:
//! the local filesystem, Amazon S3 buckets (the usual home of CMIP archive
//! mirrors) and plain HTTP(S) endpoints (catalog indices are typically
//! published as a CSV behind a fixed URL).
//!
//! The backend is chosen from the path pattern:
//!
//! - `s3://bucket/key` → [`S3Storage`]
//! - `http://…` / `https://…` → [`HttpStorage`] (read-only)
//! - anything else → [`LocalStorage`]
//!
//! ```rust,no_run
//! use summerdays::storage::{StorageBackend, StorageFactory};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let storage = StorageFactory::from_path("https://example.org/catalog.csv").await?;
//!     let bytes = storage.read("https://example.org/catalog.csv").await?;
//!     println!("catalog is {} bytes", bytes.len());
//!     Ok(())
//! }
//! ```

use aws_config::BehaviorVersion;
use aws_sdk_s3::Client as S3Client;
use std::path::Path;
use thiserror::Error;
use tokio::fs;

/// Errors that can occur during storage operations
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("AWS S3 GetObject error: {0}")]
    S3GetObject(
        #[from] aws_sdk_s3::error::SdkError<aws_sdk_s3::operation::get_object::GetObjectError>,
    ),

    #[error("AWS S3 PutObject error: {0}")]
    S3PutObject(
        #[from] aws_sdk_s3::error::SdkError<aws_sdk_s3::operation::put_object::PutObjectError>,
    ),

    #[error("AWS S3 HeadObject error: {0}")]
    S3HeadObject(
        #[from] aws_sdk_s3::error::SdkError<aws_sdk_s3::operation::head_object::HeadObjectError>,
    ),

    #[error("AWS ByteStream error: {0}")]
    ByteStream(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP status {status} for {url}")]
    HttpStatus { status: u16, url: String },

    #[error("Invalid S3 path format: {0}")]
    InvalidS3Path(String),

    #[error("Path not found: {0}")]
    PathNotFound(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Writes are not supported for {0}")]
    WriteUnsupported(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait defining the interface for storage backends.
///
/// All operations are async so remote and local backends share one seam.
#[async_trait::async_trait]
pub trait StorageBackend: Send + Sync {
    /// Reads the entire contents of a file or object.
    async fn read(&self, path: &str) -> StorageResult<Vec<u8>>;

    /// Writes data, creating the target if it doesn't exist.
    ///
    /// Read-only backends return [`StorageError::WriteUnsupported`].
    async fn write(&self, path: &str, data: &[u8]) -> StorageResult<()>;

    /// Checks whether something exists at the given path.
    async fn exists(&self, path: &str) -> StorageResult<bool>;
}

/// Local filesystem backend using tokio's async file operations.
#[derive(Debug, Clone)]
pub struct LocalStorage;

#[async_trait::async_trait]
impl StorageBackend for LocalStorage {
    async fn read(&self, path: &str) -> StorageResult<Vec<u8>> {
        match fs::read(path).await {
            Ok(data) => Ok(data),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StorageError::PathNotFound(path.to_string()))
            }
            Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
                Err(StorageError::PermissionDenied(path.to_string()))
            }
            Err(e) => Err(StorageError::Io(e)),
        }
    }

    async fn write(&self, path: &str, data: &[u8]) -> StorageResult<()> {
        if let Some(parent) = Path::new(path).parent() {
            fs::create_dir_all(parent).await.map_err(StorageError::Io)?;
        }

        match fs::write(path, data).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
                Err(StorageError::PermissionDenied(path.to_string()))
            }
            Err(e) => Err(StorageError::Io(e)),
        }
    }

    async fn exists(&self, path: &str) -> StorageResult<bool> {
        match fs::metadata(path).await {
            Ok(_) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(StorageError::Io(e)),
        }
    }
}

/// Amazon S3 backend.
///
/// Credentials come from the environment, the AWS credentials file or IAM
/// roles, resolved by the SDK's default chain.
#[derive(Debug, Clone)]
pub struct S3Storage {
    client: S3Client,
}

impl S3Storage {
    /// Creates an S3 backend with the default AWS configuration.
    pub async fn new() -> StorageResult<Self> {
        let config = aws_config::defaults(BehaviorVersion::latest()).load().await;
        let client = S3Client::new(&config);

        Ok(S3Storage { client })
    }

    /// Creates an S3 backend from an explicit SDK configuration.
    pub fn from_config(config: &aws_config::SdkConfig) -> Self {
        let client = S3Client::new(config);
        S3Storage { client }
    }

    /// Splits `s3://bucket/key` into its bucket and key components.
    fn parse_s3_path(s3_path: &str) -> StorageResult<(String, String)> {
        if !s3_path.starts_with("s3://") {
            return Err(StorageError::InvalidS3Path(format!(
                "S3 path must start with 's3://': {}",
                s3_path
            )));
        }

        let path_without_scheme = &s3_path[5..];
        let parts: Vec<&str> = path_without_scheme.splitn(2, '/').collect();

        if parts.len() != 2 || parts[0].is_empty() || parts[1].is_empty() {
            return Err(StorageError::InvalidS3Path(format!(
                "Invalid S3 path format. Expected 's3://bucket/key': {}",
                s3_path
            )));
        }

        Ok((parts[0].to_string(), parts[1].to_string()))
    }
}

#[async_trait::async_trait]
impl StorageBackend for S3Storage {
    async fn read(&self, path: &str) -> StorageResult<Vec<u8>> {
        let (bucket, key) = Self::parse_s3_path(path)?;

        let response = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| match &e {
                aws_sdk_s3::error::SdkError::ServiceError(service_err)
                    if service_err.err().is_no_such_key() =>
                {
                    StorageError::PathNotFound(path.to_string())
                }
                _ => StorageError::S3GetObject(e),
            })?;

        let data = response
            .body
            .collect()
            .await
            .map_err(|e| StorageError::ByteStream(e.to_string()))?
            .into_bytes()
            .to_vec();

        Ok(data)
    }

    async fn write(&self, path: &str, data: &[u8]) -> StorageResult<()> {
        let (bucket, key) = Self::parse_s3_path(path)?;

        self.client
            .put_object()
            .bucket(bucket)
            .key(key)
            .body(aws_sdk_s3::primitives::ByteStream::from(data.to_vec()))
            .send()
            .await
            .map_err(StorageError::S3PutObject)?;

        Ok(())
    }

    async fn exists(&self, path: &str) -> StorageResult<bool> {
        let (bucket, key) = Self::parse_s3_path(path)?;

        match self
            .client
            .head_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
        {
            Ok(_) => Ok(true),
            Err(aws_sdk_s3::error::SdkError::ServiceError(service_err))
                if service_err.err().is_not_found() =>
            {
                Ok(false)
            }
            Err(e) => Err(StorageError::S3HeadObject(e)),
        }
    }
}

/// HTTP(S) backend for published catalogs and data mirrors. Read-only.
#[derive(Debug, Clone)]
pub struct HttpStorage {
    client: reqwest::Client,
}

impl HttpStorage {
    pub fn new() -> Self {
        let client = reqwest::Client::builder()
            .user_agent(concat!("summerdays/", env!("CARGO_PKG_VERSION")))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        HttpStorage { client }
    }
}

impl Default for HttpStorage {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl StorageBackend for HttpStorage {
    async fn read(&self, path: &str) -> StorageResult<Vec<u8>> {
        let response = self.client.get(path).send().await?;
        let status = response.status();

        if status == reqwest::StatusCode::NOT_FOUND || status == reqwest::StatusCode::GONE {
            return Err(StorageError::PathNotFound(path.to_string()));
        }
        if !status.is_success() {
            return Err(StorageError::HttpStatus {
                status: status.as_u16(),
                url: path.to_string(),
            });
        }

        Ok(response.bytes().await?.to_vec())
    }

    async fn write(&self, path: &str, _data: &[u8]) -> StorageResult<()> {
        Err(StorageError::WriteUnsupported(path.to_string()))
    }

    async fn exists(&self, path: &str) -> StorageResult<bool> {
        let response = self.client.head(path).send().await?;
        let status = response.status();

        if status.is_success() {
            Ok(true)
        } else if status == reqwest::StatusCode::NOT_FOUND || status == reqwest::StatusCode::GONE {
            Ok(false)
        } else {
            Err(StorageError::HttpStatus {
                status: status.as_u16(),
                url: path.to_string(),
            })
        }
    }
}

/// Storage backend enumeration.
#[derive(Debug)]
pub enum Storage {
    Local(LocalStorage),
    S3(S3Storage),
    Http(HttpStorage),
}

#[async_trait::async_trait]
impl StorageBackend for Storage {
    async fn read(&self, path: &str) -> StorageResult<Vec<u8>> {
        match self {
            Storage::Local(storage) => storage.read(path).await,
            Storage::S3(storage) => storage.read(path).await,
            Storage::Http(storage) => storage.read(path).await,
        }
    }

    async fn write(&self, path: &str, data: &[u8]) -> StorageResult<()> {
        match self {
            Storage::Local(storage) => storage.write(path, data).await,
            Storage::S3(storage) => storage.write(path, data).await,
            Storage::Http(storage) => storage.write(path, data).await,
        }
    }

    async fn exists(&self, path: &str) -> StorageResult<bool> {
        match self {
            Storage::Local(storage) => storage.exists(path).await,
            Storage::S3(storage) => storage.exists(path).await,
            Storage::Http(storage) => storage.exists(path).await,
        }
    }
}

/// Factory for creating storage backends based on path patterns.
pub struct StorageFactory;

impl StorageFactory {
    /// Creates the backend matching the path scheme.
    pub async fn from_path(path: &str) -> StorageResult<Storage> {
        if Self::is_s3_path(path) {
            let s3_storage = S3Storage::new().await?;
            Ok(Storage::S3(s3_storage))
        } else if Self::is_http_path(path) {
            Ok(Storage::Http(HttpStorage::new()))
        } else {
            Ok(Storage::Local(LocalStorage))
        }
    }

    pub fn is_s3_path(path: &str) -> bool {
        path.starts_with("s3://")
    }

    pub fn is_http_path(path: &str) -> bool {
        path.starts_with("http://") || path.starts_with("https://")
    }

    /// True when the path refers to something that must be staged locally
    /// before it can be opened with the NetCDF library.
    pub fn is_remote_path(path: &str) -> bool {
        Self::is_s3_path(path) || Self::is_http_path(path)
    }
}
