use std::{
    fs,
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};

use anyhow::{bail, Context};
use client_core::{
    upload::{DEFAULT_MAX_IMAGE_BYTES, DEFAULT_UPLOAD_TIMEOUT},
    AnonymousSession, CloudinaryImageHost, Credentials, ImageHost, MissingImageHost,
    SessionProvider, StaticSession, UploadLimits, DEFAULT_API_URL,
};
use serde::Deserialize;
use url::Url;

pub const DEFAULT_CONFIG_FILE: &str = "cms.toml";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub api_url: String,
    pub token: Option<String>,
    pub cookie: Option<String>,
    pub cloudinary_cloud: Option<String>,
    pub upload_preset: Option<String>,
    /// Full upload URL; takes precedence over `cloudinary_cloud`.
    pub upload_url: Option<String>,
    pub max_image_bytes: u64,
    pub upload_timeout_secs: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.into(),
            token: None,
            cookie: None,
            cloudinary_cloud: None,
            upload_preset: None,
            upload_url: None,
            max_image_bytes: DEFAULT_MAX_IMAGE_BYTES,
            upload_timeout_secs: DEFAULT_UPLOAD_TIMEOUT.as_secs(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct FileSettings {
    api_url: Option<String>,
    token: Option<String>,
    cookie: Option<String>,
    cloudinary_cloud: Option<String>,
    upload_preset: Option<String>,
    upload_url: Option<String>,
    max_image_bytes: Option<u64>,
    upload_timeout_secs: Option<u64>,
}

/// Defaults, then the config file, then the environment. An explicit
/// `path` must exist; the default `cms.toml` is optional.
pub fn load_settings(path: Option<&Path>) -> anyhow::Result<Settings> {
    load_settings_with(path, |key| std::env::var(key).ok())
}

pub(crate) fn load_settings_with(
    path: Option<&Path>,
    env: impl Fn(&str) -> Option<String>,
) -> anyhow::Result<Settings> {
    let mut settings = Settings::default();

    let (file, required) = match path {
        Some(path) => (path.to_path_buf(), true),
        None => (PathBuf::from(DEFAULT_CONFIG_FILE), false),
    };
    match fs::read_to_string(&file) {
        Ok(raw) => {
            let file_cfg: FileSettings = toml::from_str(&raw)
                .with_context(|| format!("failed to parse config file '{}'", file.display()))?;
            settings.apply_file(file_cfg);
        }
        Err(err) if required => {
            return Err(err)
                .with_context(|| format!("failed to read config file '{}'", file.display()));
        }
        Err(_) => {}
    }

    let var = |short: &str, long: &str| env(long).or_else(|| env(short));
    if let Some(v) = var("CMS_API_URL", "APP__API_URL") {
        settings.api_url = v;
    }
    if let Some(v) = var("CMS_TOKEN", "APP__TOKEN") {
        settings.token = Some(v);
    }
    if let Some(v) = var("CMS_COOKIE", "APP__COOKIE") {
        settings.cookie = Some(v);
    }
    if let Some(v) = var("CLOUDINARY_CLOUD_NAME", "APP__CLOUDINARY_CLOUD") {
        settings.cloudinary_cloud = Some(v);
    }
    if let Some(v) = var("CLOUDINARY_UPLOAD_PRESET", "APP__UPLOAD_PRESET") {
        settings.upload_preset = Some(v);
    }
    if let Some(v) = var("CMS_UPLOAD_URL", "APP__UPLOAD_URL") {
        settings.upload_url = Some(v);
    }
    if let Some(v) = var("CMS_MAX_IMAGE_BYTES", "APP__MAX_IMAGE_BYTES") {
        if let Ok(parsed) = v.parse::<u64>() {
            settings.max_image_bytes = parsed;
        }
    }
    if let Some(v) = var("CMS_UPLOAD_TIMEOUT_SECS", "APP__UPLOAD_TIMEOUT_SECS") {
        if let Ok(parsed) = v.parse::<u64>() {
            settings.upload_timeout_secs = parsed;
        }
    }

    Ok(settings)
}

impl Settings {
    fn apply_file(&mut self, file: FileSettings) {
        if let Some(v) = file.api_url {
            self.api_url = v;
        }
        self.token = file.token.or(self.token.take());
        self.cookie = file.cookie.or(self.cookie.take());
        self.cloudinary_cloud = file.cloudinary_cloud.or(self.cloudinary_cloud.take());
        self.upload_preset = file.upload_preset.or(self.upload_preset.take());
        self.upload_url = file.upload_url.or(self.upload_url.take());
        if let Some(v) = file.max_image_bytes {
            self.max_image_bytes = v;
        }
        if let Some(v) = file.upload_timeout_secs {
            self.upload_timeout_secs = v;
        }
    }

    pub fn api_base(&self) -> anyhow::Result<Url> {
        let url = Url::parse(self.api_url.trim())
            .with_context(|| format!("invalid api url '{}'", self.api_url))?;
        if url.cannot_be_a_base() {
            bail!("api url '{}' cannot be used as a base", self.api_url);
        }
        Ok(url)
    }

    /// A bearer token wins over a cookie when both are configured.
    pub fn credentials(&self) -> Option<Credentials> {
        let non_empty = |value: &Option<String>| {
            value
                .as_deref()
                .map(str::trim)
                .filter(|value| !value.is_empty())
                .map(str::to_string)
        };
        non_empty(&self.token)
            .map(Credentials::Bearer)
            .or_else(|| non_empty(&self.cookie).map(Credentials::Cookie))
    }

    pub fn session(&self) -> Arc<dyn SessionProvider> {
        match self.credentials() {
            Some(credentials) => Arc::new(StaticSession::new(credentials)),
            None => Arc::new(AnonymousSession),
        }
    }

    pub fn upload_limits(&self) -> UploadLimits {
        UploadLimits {
            max_bytes: self.max_image_bytes,
            timeout: Duration::from_secs(self.upload_timeout_secs.max(1)),
        }
    }

    pub fn image_host(&self, http: reqwest::Client) -> anyhow::Result<Arc<dyn ImageHost>> {
        if let Some(raw) = &self.upload_url {
            let endpoint =
                Url::parse(raw).with_context(|| format!("invalid upload url '{raw}'"))?;
            return Ok(Arc::new(CloudinaryImageHost::new(
                http,
                endpoint,
                self.upload_preset.clone(),
            )));
        }
        match &self.cloudinary_cloud {
            Some(cloud) => {
                let host = CloudinaryImageHost::for_cloud(http, cloud, self.upload_preset.clone())
                    .with_context(|| format!("invalid cloudinary cloud name '{cloud}'"))?;
                Ok(Arc::new(host))
            }
            None => Ok(Arc::new(MissingImageHost)),
        }
    }
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
