//! Durable image storage. Every upload is a single attempt; callers decide whether to retry.

use async_trait::async_trait;
use aws_config::retry::RetryConfig;
use aws_config::{BehaviorVersion, Region};
use aws_sdk_s3::config::Credentials;
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::primitives::ByteStream;
use bytes::Bytes;
use reqwest::Client;
use thiserror::Error;
use tracing::{debug, info};
use uuid::Uuid;

use crate::imaging::source::{decode_data_uri, ImageSource};

const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";
const CACHE_CONTROL: &str = "public, max-age=31536000, immutable";
const S3_REGION: &str = "us-east-1";

/// Constructs an S3 client configured for MinIO (local) or AWS (production).
///
/// SDK retries are disabled: a failed `put_object` surfaces after one request.
pub async fn build_s3_client(
    endpoint: &str,
    access_key_id: &str,
    secret_access_key: &str,
) -> aws_sdk_s3::Client {
    let credentials = Credentials::new(
        access_key_id,
        secret_access_key,
        None,
        None,
        "studio-static",
    );

    let sdk_config = aws_config::defaults(BehaviorVersion::latest())
        .region(Region::new(S3_REGION))
        .credentials_provider(credentials)
        .endpoint_url(endpoint)
        .retry_config(RetryConfig::disabled())
        .load()
        .await;

    // MinIO serves buckets by path rather than by subdomain.
    let s3_config = aws_sdk_s3::config::Builder::from(&sdk_config)
        .force_path_style(true)
        .build();

    aws_sdk_s3::Client::from_conf(s3_config)
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("failed to fetch upload source {url}: {source}")]
    Fetch {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("upload source is a malformed data URI")]
    InvalidDataUri,

    #[error("refusing to upload an empty payload")]
    EmptyPayload,

    #[error("upload of {key} failed: {message}")]
    Upload { key: String, message: String },
}

/// Directives applied to one upload.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UploadOptions {
    /// Logical namespace the object is stored under.
    pub folder: String,
    /// Falls back to the data URI's declared type, then to `application/octet-stream`.
    pub content_type: Option<String>,
    /// Encoding quality recorded with the object (0-100).
    pub quality: Option<u8>,
    /// Free-form transformation directive recorded with the object.
    pub transformation: Option<String>,
}

impl UploadOptions {
    pub fn in_folder(folder: impl Into<String>) -> Self {
        Self {
            folder: folder.into(),
            ..Self::default()
        }
    }

    pub fn content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    pub fn quality(mut self, quality: u8) -> Self {
        self.quality = Some(quality.min(100));
        self
    }

    pub fn transformation(mut self, transformation: impl Into<String>) -> Self {
        self.transformation = Some(transformation.into());
        self
    }
}

/// Object storage returning a durable, publicly resolvable URL per upload.
#[async_trait]
pub trait StorageGateway: Send + Sync {
    async fn upload(
        &self,
        payload: ImageSource,
        options: &UploadOptions,
    ) -> Result<String, StorageError>;
}

#[derive(Clone)]
pub struct S3StorageGateway {
    s3: aws_sdk_s3::Client,
    bucket: String,
    public_base_url: String,
    http: Client,
}

impl S3StorageGateway {
    pub fn new(
        s3: aws_sdk_s3::Client,
        bucket: String,
        public_base_url: &str,
        http: Client,
    ) -> Self {
        Self {
            s3,
            bucket,
            public_base_url: public_base_url.trim().trim_end_matches('/').to_string(),
            http,
        }
    }

    /// Resolves the payload to bytes plus the mime type it declared, if any.
    async fn resolve(&self, payload: ImageSource) -> Result<(Bytes, Option<String>), StorageError> {
        match payload {
            ImageSource::Bytes(bytes) => Ok((bytes, None)),
            ImageSource::Url(url) if url.starts_with("data:") => {
                let (mime, bytes) = decode_data_uri(&url).ok_or(StorageError::InvalidDataUri)?;
                Ok((Bytes::from(bytes), Some(mime)))
            }
            ImageSource::Url(url) => {
                debug!("Fetching upload source {url}");
                let response = match self
                    .http
                    .get(&url)
                    .send()
                    .await
                    .and_then(|r| r.error_for_status())
                {
                    Ok(r) => r,
                    Err(source) => return Err(StorageError::Fetch { url, source }),
                };
                let mime = response
                    .headers()
                    .get(reqwest::header::CONTENT_TYPE)
                    .and_then(|v| v.to_str().ok())
                    .map(str::to_string);
                let bytes = response
                    .bytes()
                    .await
                    .map_err(|source| StorageError::Fetch { url, source })?;
                Ok((bytes, mime))
            }
        }
    }
}

#[async_trait]
impl StorageGateway for S3StorageGateway {
    async fn upload(
        &self,
        payload: ImageSource,
        options: &UploadOptions,
    ) -> Result<String, StorageError> {
        let (bytes, declared) = self.resolve(payload).await?;
        if bytes.is_empty() {
            return Err(StorageError::EmptyPayload);
        }

        let content_type = options
            .content_type
            .clone()
            .or(declared)
            .unwrap_or_else(|| DEFAULT_CONTENT_TYPE.to_string());
        let key = object_key(&options.folder, Uuid::new_v4(), &content_type);
        let size = bytes.len();

        let mut put = self
            .s3
            .put_object()
            .bucket(&self.bucket)
            .key(&key)
            .content_type(&content_type)
            .cache_control(CACHE_CONTROL)
            .body(ByteStream::from(bytes));
        if let Some(quality) = options.quality {
            put = put.metadata("quality", quality.to_string());
        }
        if let Some(transformation) = &options.transformation {
            put = put.metadata("transformation", transformation);
        }

        put.send().await.map_err(|e| StorageError::Upload {
            key: key.clone(),
            message: DisplayErrorContext(&e).to_string(),
        })?;

        info!("Uploaded {size} bytes to s3://{}/{}", self.bucket, key);
        Ok(public_url(&self.public_base_url, &key))
    }
}

/// `<folder>/<id>.<ext>`, with empty path segments removed from the folder.
pub fn object_key(folder: &str, id: Uuid, content_type: &str) -> String {
    let folder = folder
        .split('/')
        .filter(|segment| !segment.trim().is_empty())
        .collect::<Vec<_>>()
        .join("/");
    let file = format!("{id}.{}", extension_for(content_type));
    if folder.is_empty() {
        file
    } else {
        format!("{folder}/{file}")
    }
}

pub fn public_url(base: &str, key: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), key)
}

fn extension_for(content_type: &str) -> &'static str {
    let essence = content_type.split(';').next().unwrap_or_default().trim();
    match essence.to_ascii_lowercase().as_str() {
        "image/png" => "png",
        "image/jpeg" | "image/jpg" => "jpg",
        "image/webp" => "webp",
        "image/gif" => "gif",
        _ => "bin",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{CannedResponse, RecordedRequest, StubServer};
    use axum::http::{Method, StatusCode};

    const PUBLIC_BASE: &str = "https://cdn.example.com/studio";

    async fn gateway_for(server: &StubServer) -> S3StorageGateway {
        let s3 = build_s3_client(&server.base_url, "test", "test").await;
        S3StorageGateway::new(s3, "studio".into(), PUBLIC_BASE, Client::new())
    }

    fn accept_all(_: &RecordedRequest) -> CannedResponse {
        CannedResponse::new(StatusCode::OK, "application/xml", "")
    }

    #[test]
    fn test_object_key_layout() {
        let id = Uuid::nil();
        assert_eq!(
            object_key("portrait-studio", id, "image/png"),
            format!("portrait-studio/{id}.png")
        );
        assert_eq!(
            object_key("/portrait-studio//originals/", id, "image/jpeg"),
            format!("portrait-studio/originals/{id}.jpg")
        );
        assert_eq!(object_key("", id, "image/webp"), format!("{id}.webp"));
    }

    #[test]
    fn test_extension_ignores_parameters_and_case() {
        assert_eq!(extension_for("IMAGE/PNG; charset=binary"), "png");
        assert_eq!(extension_for("application/pdf"), "bin");
    }

    #[test]
    fn test_public_url_joins_without_double_slash() {
        assert_eq!(
            public_url("https://cdn.example.com/", "a/b.png"),
            "https://cdn.example.com/a/b.png"
        );
    }

    #[test]
    fn test_upload_options_builder() {
        let options = UploadOptions::in_folder("portrait-studio")
            .content_type("image/png")
            .quality(150)
            .transformation("sharpen");
        assert_eq!(options.folder, "portrait-studio");
        assert_eq!(options.content_type.as_deref(), Some("image/png"));
        assert_eq!(options.quality, Some(100));
        assert_eq!(options.transformation.as_deref(), Some("sharpen"));
    }

    #[tokio::test]
    async fn test_upload_puts_object_with_metadata() {
        let server = StubServer::start(accept_all).await;
        let gateway = gateway_for(&server).await;

        let options = UploadOptions::in_folder("portrait-studio")
            .content_type("image/png")
            .quality(90)
            .transformation("sharpen");
        let url = gateway
            .upload(ImageSource::Bytes(Bytes::from_static(b"png")), &options)
            .await
            .unwrap();

        let requests = server.requests();
        assert_eq!(requests.len(), 1);
        let put = &requests[0];
        assert_eq!(put.method, Method::PUT);
        assert!(put.path.starts_with("/studio/portrait-studio/"));
        assert!(put.path.ends_with(".png"));
        assert_eq!(put.header("content-type"), Some("image/png"));
        assert_eq!(put.header("cache-control"), Some(CACHE_CONTROL));
        assert_eq!(put.header("x-amz-meta-quality"), Some("90"));
        assert_eq!(put.header("x-amz-meta-transformation"), Some("sharpen"));

        let key = put.path.trim_start_matches("/studio/");
        assert_eq!(url, format!("{PUBLIC_BASE}/{key}"));
    }

    #[tokio::test]
    async fn test_upload_makes_a_single_attempt_on_server_error() {
        let server = StubServer::start(|_| {
            CannedResponse::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                "application/xml",
                "<Error><Code>InternalError</Code><Message>boom</Message></Error>",
            )
        })
        .await;
        let gateway = gateway_for(&server).await;

        let result = gateway
            .upload(
                ImageSource::Bytes(Bytes::from_static(b"png")),
                &UploadOptions::in_folder("portrait-studio").content_type("image/png"),
            )
            .await;

        assert!(matches!(result, Err(StorageError::Upload { .. })));
        assert_eq!(server.hits(), 1);
    }

    #[tokio::test]
    async fn test_data_uri_declares_content_type() {
        let server = StubServer::start(accept_all).await;
        let gateway = gateway_for(&server).await;

        let url = gateway
            .upload(
                ImageSource::Url("data:image/webp;base64,UklGRg==".into()),
                &UploadOptions::in_folder("portrait-studio"),
            )
            .await
            .unwrap();

        let put = &server.requests()[0];
        assert_eq!(put.header("content-type"), Some("image/webp"));
        assert!(put.path.ends_with(".webp"));
        assert!(url.ends_with(".webp"));
    }

    #[tokio::test]
    async fn test_remote_source_is_fetched_then_uploaded() {
        let server = StubServer::start(|request| {
            if request.method == Method::GET {
                CannedResponse::new(StatusCode::OK, "image/png", b"remote-png".to_vec())
            } else {
                CannedResponse::new(StatusCode::OK, "application/xml", "")
            }
        })
        .await;
        let gateway = gateway_for(&server).await;

        let source = format!("{}/outputs/portrait.png", server.base_url);
        gateway
            .upload(
                ImageSource::Url(source),
                &UploadOptions::in_folder("portrait-studio"),
            )
            .await
            .unwrap();

        let requests = server.requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].method, Method::GET);
        assert_eq!(requests[0].path, "/outputs/portrait.png");
        assert_eq!(requests[1].method, Method::PUT);
        assert_eq!(requests[1].header("content-type"), Some("image/png"));
        assert!(requests[1].path.ends_with(".png"));
    }

    #[tokio::test]
    async fn test_failed_fetch_surfaces_source_url() {
        let server = StubServer::start(|_| {
            CannedResponse::new(StatusCode::NOT_FOUND, "text/plain", "missing")
        })
        .await;
        let gateway = gateway_for(&server).await;

        let source = format!("{}/outputs/gone.png", server.base_url);
        let err = gateway
            .upload(
                ImageSource::Url(source.clone()),
                &UploadOptions::in_folder("portrait-studio"),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, StorageError::Fetch { ref url, .. } if *url == source));
        assert_eq!(server.hits(), 1);
    }

    #[tokio::test]
    async fn test_empty_payload_is_rejected_before_upload() {
        let server = StubServer::start(accept_all).await;
        let gateway = gateway_for(&server).await;

        let err = gateway
            .upload(
                ImageSource::Bytes(Bytes::new()),
                &UploadOptions::in_folder("portrait-studio"),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, StorageError::EmptyPayload));
        assert_eq!(server.hits(), 0);
    }

    #[tokio::test]
    async fn test_malformed_data_uri_is_rejected() {
        let server = StubServer::start(accept_all).await;
        let gateway = gateway_for(&server).await;

        let err = gateway
            .upload(
                ImageSource::Url("data:image/png,not-base64".into()),
                &UploadOptions::in_folder("portrait-studio"),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, StorageError::InvalidDataUri));
        assert_eq!(server.hits(), 0);
    }
}
