//! Image upload pipeline: local pre-checks and preview, then a single
//! asynchronous transfer to the image host whose outcome is reported back as
//! an [`UploadResolution`].

use std::{path::Path, sync::Arc, time::Duration};

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use reqwest::{multipart, Client};
use shared::{error::ServiceErrorBody, protocol::ImageUploadResponse};
use tokio::{sync::mpsc, task::JoinHandle};
use tracing::{debug, info, warn};
use url::Url;

use crate::{draft::DraftId, error::UploadError};

pub const DEFAULT_MAX_IMAGE_BYTES: u64 = 10 * 1024 * 1024;
pub const DEFAULT_UPLOAD_TIMEOUT: Duration = Duration::from_secs(60);
const CLOUDINARY_API_BASE: &str = "https://api.cloudinary.com/v1_1/";

/// A locally selected image file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageFile {
    pub file_name: String,
    pub mime_type: String,
    pub bytes: Arc<[u8]>,
}

impl ImageFile {
    /// Without an explicit MIME type the type is guessed from the file name.
    pub fn new(file_name: impl Into<String>, mime_type: Option<String>, bytes: Vec<u8>) -> Self {
        let file_name = file_name.into();
        let mime_type = mime_type.unwrap_or_else(|| {
            mime_guess::from_path(&file_name)
                .first_or_octet_stream()
                .essence_str()
                .to_string()
        });
        Self {
            file_name,
            mime_type,
            bytes: bytes.into(),
        }
    }

    pub async fn from_path(path: &Path) -> Result<Self, UploadError> {
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|err| UploadError::Read(format!("{}: {err}", path.display())))?;
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "image".to_string());
        Ok(Self::new(file_name, None, bytes))
    }

    pub fn len(&self) -> u64 {
        self.bytes.len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Display-only preview built from the raw file, available before any
/// network round trip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImagePreview {
    pub data_url: String,
}

impl ImagePreview {
    pub fn from_file(file: &ImageFile) -> Self {
        Self {
            data_url: format!("data:{};base64,{}", file.mime_type, STANDARD.encode(&file.bytes)),
        }
    }
}

/// Identifies one upload attempt of one draft. A resolution is only applied
/// while its ticket is still the draft's pending ticket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UploadTicket {
    pub draft: DraftId,
    pub attempt: u64,
}

#[derive(Debug)]
pub struct UploadResolution {
    pub ticket: UploadTicket,
    pub result: Result<String, UploadError>,
}

#[async_trait]
pub trait ImageHost: Send + Sync {
    /// Transmits the file and returns its public URL.
    async fn upload(&self, file: &ImageFile) -> Result<String, UploadError>;
}

pub struct MissingImageHost;

#[async_trait]
impl ImageHost for MissingImageHost {
    async fn upload(&self, _file: &ImageFile) -> Result<String, UploadError> {
        Err(UploadError::NotConfigured)
    }
}

/// Cloudinary-compatible unsigned upload endpoint.
pub struct CloudinaryImageHost {
    http: Client,
    endpoint: Url,
    upload_preset: Option<String>,
}

impl CloudinaryImageHost {
    pub fn new(http: Client, endpoint: Url, upload_preset: Option<String>) -> Self {
        Self {
            http,
            endpoint,
            upload_preset,
        }
    }

    pub fn for_cloud(
        http: Client,
        cloud_name: &str,
        upload_preset: Option<String>,
    ) -> Result<Self, url::ParseError> {
        let endpoint =
            Url::parse(CLOUDINARY_API_BASE)?.join(&format!("{cloud_name}/image/upload"))?;
        Ok(Self::new(http, endpoint, upload_preset))
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

#[async_trait]
impl ImageHost for CloudinaryImageHost {
    #[tracing::instrument(skip(self, file), fields(file = %file.file_name, size = file.len()))]
    async fn upload(&self, file: &ImageFile) -> Result<String, UploadError> {
        let part = multipart::Part::bytes(file.bytes.to_vec())
            .file_name(file.file_name.clone())
            .mime_str(&file.mime_type)?;
        let mut form = multipart::Form::new().part("file", part);
        if let Some(preset) = &self.upload_preset {
            form = form.text("upload_preset", preset.clone());
        }

        let response = self
            .http
            .post(self.endpoint.clone())
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            return Err(UploadError::Rejected {
                status: status.as_u16(),
                message: ServiceErrorBody::message_from_text(&text),
            });
        }

        serde_json::from_str::<ImageUploadResponse>(&text)
            .ok()
            .and_then(|body| body.secure_url)
            .filter(|url| !url.trim().is_empty())
            .ok_or_else(|| UploadError::MalformedResponse(text.chars().take(200).collect()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadLimits {
    pub max_bytes: u64,
    pub timeout: Duration,
}

impl Default for UploadLimits {
    fn default() -> Self {
        Self {
            max_bytes: DEFAULT_MAX_IMAGE_BYTES,
            timeout: DEFAULT_UPLOAD_TIMEOUT,
        }
    }
}

#[derive(Clone)]
pub struct ImageUploadPipeline {
    host: Arc<dyn ImageHost>,
    limits: UploadLimits,
    resolutions: mpsc::UnboundedSender<UploadResolution>,
}

impl ImageUploadPipeline {
    /// Returns the pipeline and the receiving end on which every started
    /// upload reports exactly one resolution.
    pub fn new(
        host: Arc<dyn ImageHost>,
        limits: UploadLimits,
    ) -> (Self, mpsc::UnboundedReceiver<UploadResolution>) {
        let (resolutions, rx) = mpsc::unbounded_channel();
        (
            Self {
                host,
                limits,
                resolutions,
            },
            rx,
        )
    }

    pub fn limits(&self) -> UploadLimits {
        self.limits
    }

    /// Checks that need no network: non-empty, an image type, within the size
    /// limit.
    pub fn precheck(&self, file: &ImageFile) -> Result<(), UploadError> {
        if file.is_empty() {
            return Err(UploadError::Empty);
        }
        if !file.mime_type.starts_with("image/") {
            return Err(UploadError::UnsupportedType(file.mime_type.clone()));
        }
        if file.len() > self.limits.max_bytes {
            return Err(UploadError::TooLarge {
                size: file.len(),
                limit: self.limits.max_bytes,
            });
        }
        Ok(())
    }

    pub async fn upload(&self, file: &ImageFile) -> Result<String, UploadError> {
        self.precheck(file)?;
        match tokio::time::timeout(self.limits.timeout, self.host.upload(file)).await {
            Ok(result) => result,
            Err(_) => Err(UploadError::TimedOut(self.limits.timeout)),
        }
    }

    /// Runs [`Self::upload`] in the background and reports the outcome under
    /// `ticket`. Aborting the returned handle drops the attempt silently.
    ///
    /// Panics when called outside a tokio runtime.
    pub fn start(&self, ticket: UploadTicket, file: ImageFile) -> JoinHandle<()> {
        let pipeline = self.clone();
        debug!(attempt = ticket.attempt, file = %file.file_name, "image upload started");
        tokio::spawn(async move {
            let result = pipeline.upload(&file).await;
            match &result {
                Ok(url) => info!(attempt = ticket.attempt, %url, "image upload finished"),
                Err(err) => warn!(attempt = ticket.attempt, "image upload failed: {err}"),
            }
            if pipeline
                .resolutions
                .send(UploadResolution { ticket, result })
                .is_err()
            {
                debug!(attempt = ticket.attempt, "upload resolution dropped: view closed");
            }
        })
    }
}

#[cfg(test)]
#[path = "tests/upload_tests.rs"]
mod tests;
