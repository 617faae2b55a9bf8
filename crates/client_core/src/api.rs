//! Content API client. Every content type lives under `/{type}`; the profile
//! collection is a singleton written with `POST /about`.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde_json::Value;
use shared::{
    domain::{ContentKind, EntityId},
    error::ServiceErrorBody,
    protocol::ContentRecord,
};
use tracing::debug;
use url::Url;

use crate::{entity::Entity, error::ApiClientError, session::SessionProvider};

pub const DEFAULT_API_URL: &str = "http://localhost:5000/api";

#[async_trait]
pub trait ContentApi: Send + Sync {
    async fn list(
        &self,
        kind: ContentKind,
        include_unpublished: bool,
    ) -> Result<Vec<Entity>, ApiClientError>;

    /// Persists a new entity and returns the server's copy.
    async fn create(&self, entity: &Entity) -> Result<Entity, ApiClientError>;

    async fn update(&self, id: &EntityId, entity: &Entity) -> Result<Entity, ApiClientError>;

    async fn delete(&self, kind: ContentKind, id: &EntityId) -> Result<(), ApiClientError>;
}

/// Turns non-2xx responses into [`ApiClientError::Status`] carrying the
/// server's `message`.
#[async_trait]
pub(crate) trait ResponseExt {
    async fn map_api_error(self) -> Result<Response, ApiClientError>;
}

#[async_trait]
impl ResponseExt for Response {
    async fn map_api_error(self) -> Result<Response, ApiClientError> {
        let status = self.status();
        if status.is_success() {
            return Ok(self);
        }
        let text = self.text().await.unwrap_or_default();
        let mut message = ServiceErrorBody::message_from_text(&text);
        if message.is_empty() {
            message = status.canonical_reason().unwrap_or("request failed").to_string();
        }
        Err(ApiClientError::Status {
            status: status.as_u16(),
            message,
        })
    }
}

#[async_trait]
impl ResponseExt for Result<Response, reqwest::Error> {
    async fn map_api_error(self) -> Result<Response, ApiClientError> {
        match self {
            Ok(response) => response.map_api_error().await,
            Err(err) => Err(ApiClientError::Transport(err)),
        }
    }
}

/// Relative joins only work below a base ending in `/`.
pub(crate) fn normalize_base(mut base: Url) -> Url {
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }
    base
}

pub(crate) fn endpoint(base: &Url, path: &str) -> Result<Url, ApiClientError> {
    Ok(base.join(path)?)
}

pub struct HttpContentApi {
    http: Client,
    base: Url,
    session: Arc<dyn SessionProvider>,
}

impl HttpContentApi {
    pub fn new(http: Client, base: Url, session: Arc<dyn SessionProvider>) -> Self {
        Self {
            http,
            base: normalize_base(base),
            session,
        }
    }

    pub fn base(&self) -> &Url {
        &self.base
    }

    fn collection_url(&self, kind: ContentKind) -> Result<Url, ApiClientError> {
        endpoint(&self.base, kind.path())
    }

    fn item_url(&self, kind: ContentKind, id: &EntityId) -> Result<Url, ApiClientError> {
        let mut url = self.collection_url(kind)?;
        url.path_segments_mut()
            .map_err(|_| ApiClientError::InvalidUrl(self.base.to_string()))?
            .push(id.as_str());
        Ok(url)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match self.session.credentials() {
            Some(credentials) => credentials.apply(request),
            None => request,
        }
    }

    async fn read_entity(kind: ContentKind, response: Response) -> Result<Entity, ApiClientError> {
        let value: Value = response.json().await?;
        let record = ContentRecord::decode(kind, value)
            .map_err(|err| ApiClientError::Decode(format!("{kind}: {err}")))?;
        Ok(Entity::from_record(record))
    }

    async fn write(
        &self,
        request: RequestBuilder,
        entity: &Entity,
    ) -> Result<Entity, ApiClientError> {
        let response = self
            .authorize(request)
            .json(&entity.to_request_record())
            .send()
            .await
            .map_api_error()
            .await?;
        Self::read_entity(entity.kind(), response).await
    }
}

#[async_trait]
impl ContentApi for HttpContentApi {
    #[tracing::instrument(skip(self))]
    async fn list(
        &self,
        kind: ContentKind,
        include_unpublished: bool,
    ) -> Result<Vec<Entity>, ApiClientError> {
        let mut request = self.http.get(self.collection_url(kind)?);
        if include_unpublished && !kind.is_singleton() {
            request = request.query(&[("all", "true")]);
        }
        let value: Value = self
            .authorize(request)
            .send()
            .await
            .map_api_error()
            .await?
            .json()
            .await?;
        let records = ContentRecord::decode_list(kind, value)
            .map_err(|err| ApiClientError::Decode(format!("{kind} list: {err}")))?;
        debug!(%kind, count = records.len(), "listed content");
        Ok(records.into_iter().map(Entity::from_record).collect())
    }

    #[tracing::instrument(skip_all, fields(kind = %entity.kind()))]
    async fn create(&self, entity: &Entity) -> Result<Entity, ApiClientError> {
        let url = self.collection_url(entity.kind())?;
        self.write(self.http.post(url), entity).await
    }

    #[tracing::instrument(skip(self, entity), fields(kind = %entity.kind()))]
    async fn update(&self, id: &EntityId, entity: &Entity) -> Result<Entity, ApiClientError> {
        let kind = entity.kind();
        if kind.is_singleton() {
            return self.write(self.http.post(self.collection_url(kind)?), entity).await;
        }
        let url = self.item_url(kind, id)?;
        self.write(self.http.put(url), entity).await
    }

    #[tracing::instrument(skip(self))]
    async fn delete(&self, kind: ContentKind, id: &EntityId) -> Result<(), ApiClientError> {
        if kind.is_singleton() {
            return Err(ApiClientError::Unsupported(format!(
                "the {kind} cannot be deleted"
            )));
        }
        self.authorize(self.http.delete(self.item_url(kind, id)?))
            .send()
            .await
            .map_api_error()
            .await?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "tests/api_tests.rs"]
mod tests;
