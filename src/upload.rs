use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, StatusCode, Url};
use std::fmt;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

use crate::config::Upload as UploadCfg;

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("could not read photo bytes: {0}")]
    Read(#[from] std::io::Error),
    #[error("upload transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("upload rejected with status {status}: {body}")]
    Status { status: StatusCode, body: String },
    #[error("invalid upload endpoint: {0}")]
    Endpoint(String),
}

/// One photo handed to the upload service.
#[derive(Clone, PartialEq, Eq)]
pub struct UploadRequest {
    /// Event slug the photo belongs to.
    pub namespace: String,
    pub file_name: String,
    pub content_type: &'static str,
    pub bytes: Vec<u8>,
}

impl fmt::Debug for UploadRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UploadRequest")
            .field("namespace", &self.namespace)
            .field("file_name", &self.file_name)
            .field("content_type", &self.content_type)
            .field("len", &self.bytes.len())
            .finish()
    }
}

/// The external service that persists photo bytes.
#[async_trait]
pub trait Uploader: Send + Sync {
    async fn upload(&self, request: UploadRequest) -> Result<(), UploadError>;
}

/// Posts photos as multipart forms to `{endpoint}/events/{namespace}/photos`.
#[derive(Clone)]
pub struct HttpUploader {
    http: Client,
    endpoint: Url,
    token: Option<String>,
}

impl fmt::Debug for HttpUploader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpUploader")
            .field("endpoint", &self.endpoint)
            .finish_non_exhaustive()
    }
}

impl HttpUploader {
    pub fn new(endpoint: Url, token: Option<String>, timeout: Duration) -> Result<Self, UploadError> {
        let http = Client::builder()
            .user_agent(concat!("photo-review/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()?;
        Ok(Self {
            http,
            endpoint,
            token,
        })
    }

    pub fn from_config(cfg: &UploadCfg) -> Result<Self, UploadError> {
        let endpoint =
            Url::parse(&cfg.endpoint).map_err(|e| UploadError::Endpoint(e.to_string()))?;
        Self::new(
            endpoint,
            cfg.token.clone(),
            Duration::from_secs(cfg.timeout_secs),
        )
    }

    pub fn photos_url(&self, namespace: &str) -> Result<Url, UploadError> {
        let mut base = self.endpoint.clone();
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        base.join(&format!("events/{}/photos", namespace))
            .map_err(|e| UploadError::Endpoint(e.to_string()))
    }

    pub fn build_request(&self, request: UploadRequest) -> Result<reqwest::Request, UploadError> {
        let url = self.photos_url(&request.namespace)?;
        let part = Part::bytes(request.bytes)
            .file_name(request.file_name.clone())
            .mime_str(request.content_type)?;
        let form = Form::new()
            .text("name", request.file_name)
            .part("file", part);
        let mut builder = self.http.post(url).multipart(form);
        if let Some(token) = &self.token {
            builder = builder.bearer_auth(token);
        }
        Ok(builder.build()?)
    }
}

#[async_trait]
impl Uploader for HttpUploader {
    async fn upload(&self, request: UploadRequest) -> Result<(), UploadError> {
        let file_name = request.file_name.clone();
        let req = self.build_request(request)?;
        info!(url = %req.url(), file = %file_name, "uploading photo");
        let res = self.http.execute(req).await?;
        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            warn!(%status, file = %file_name, "upload rejected");
            return Err(UploadError::Status { status, body });
        }
        info!(file = %file_name, "upload stored");
        Ok(())
    }
}

/// Content type for a destination file name, by extension.
pub fn content_type_for(file_name: &str) -> &'static str {
    let ext = Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());
    match ext.as_deref() {
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("webp") => "image/webp",
        Some("heic") => "image/heic",
        Some("gif") => "image/gif",
        _ => "application/octet-stream",
    }
}
