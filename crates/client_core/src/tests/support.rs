//! Fakes for the injected collaborators, shared by the unit tests.

use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicBool, AtomicU64, Ordering},
        Arc,
    },
};

use async_trait::async_trait;
use shared::domain::{ContentKind, EntityId};
use tokio::sync::{mpsc, oneshot, Mutex};

use crate::{
    api::ContentApi,
    entity::Entity,
    error::{ApiClientError, UploadError},
    upload::{ImageFile, ImageHost, ImageUploadPipeline, UploadLimits, UploadResolution},
};

pub(crate) fn png(name: &str, size: usize) -> ImageFile {
    ImageFile::new(name, Some("image/png".to_string()), vec![0x89; size])
}

/// Image host whose uploads block until the test releases them, keyed by
/// file name.
#[derive(Default)]
pub(crate) struct GatedImageHost {
    gates: Mutex<HashMap<String, oneshot::Receiver<Result<String, String>>>>,
    uploads: AtomicU64,
}

impl GatedImageHost {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Registers `file_name`; the upload resolves with whatever is sent.
    pub(crate) async fn gate(&self, file_name: &str) -> oneshot::Sender<Result<String, String>> {
        let (tx, rx) = oneshot::channel();
        self.gates.lock().await.insert(file_name.to_string(), rx);
        tx
    }

    pub(crate) fn upload_count(&self) -> u64 {
        self.uploads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ImageHost for GatedImageHost {
    async fn upload(&self, file: &ImageFile) -> Result<String, UploadError> {
        self.uploads.fetch_add(1, Ordering::SeqCst);
        let gate = self.gates.lock().await.remove(&file.file_name);
        let Some(gate) = gate else {
            return Err(UploadError::Rejected {
                status: 400,
                message: format!("unexpected upload of {}", file.file_name),
            });
        };
        match gate.await {
            Ok(Ok(url)) => Ok(url),
            Ok(Err(message)) => Err(UploadError::Rejected {
                status: 502,
                message,
            }),
            Err(_) => Err(UploadError::MalformedResponse("gate dropped".to_string())),
        }
    }
}

pub(crate) fn pipeline(
    host: Arc<dyn ImageHost>,
) -> (ImageUploadPipeline, mpsc::UnboundedReceiver<UploadResolution>) {
    ImageUploadPipeline::new(host, UploadLimits::default())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum ApiCall {
    List(ContentKind, bool),
    Create(Entity),
    Update(EntityId, Entity),
    Delete(ContentKind, EntityId),
}

/// In-memory content API recording every call.
#[derive(Default)]
pub(crate) struct FakeContentApi {
    pub(crate) calls: Mutex<Vec<ApiCall>>,
    pub(crate) listing: Mutex<Vec<Entity>>,
    pub(crate) fail_with: Mutex<Option<(u16, String)>>,
    /// When set, the server answers saves with this slug instead of the
    /// submitted one.
    pub(crate) server_slug: Mutex<Option<String>>,
    stall_next_save: AtomicBool,
    next_id: AtomicU64,
}

impl FakeContentApi {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub(crate) async fn fail_next(&self, status: u16, message: &str) {
        *self.fail_with.lock().await = Some((status, message.to_string()));
    }

    /// The next create or update never answers.
    pub(crate) fn stall_next_save(&self) {
        self.stall_next_save.store(true, Ordering::SeqCst);
    }

    async fn check_stall(&self) {
        if self.stall_next_save.swap(false, Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
    }

    pub(crate) async fn calls(&self) -> Vec<ApiCall> {
        self.calls.lock().await.clone()
    }

    async fn check_failure(&self) -> Result<(), ApiClientError> {
        match self.fail_with.lock().await.take() {
            Some((status, message)) => Err(ApiClientError::Status { status, message }),
            None => Ok(()),
        }
    }

    async fn persisted(&self, id: EntityId, entity: &Entity) -> Entity {
        let mut stored = entity.clone();
        stored.id = Some(id);
        if let Some(slug) = self.server_slug.lock().await.clone() {
            stored.slug = slug;
        }
        stored
    }
}

#[async_trait]
impl ContentApi for FakeContentApi {
    async fn list(
        &self,
        kind: ContentKind,
        include_unpublished: bool,
    ) -> Result<Vec<Entity>, ApiClientError> {
        self.calls
            .lock()
            .await
            .push(ApiCall::List(kind, include_unpublished));
        self.check_failure().await?;
        Ok(self.listing.lock().await.clone())
    }

    async fn create(&self, entity: &Entity) -> Result<Entity, ApiClientError> {
        self.calls.lock().await.push(ApiCall::Create(entity.clone()));
        self.check_stall().await;
        self.check_failure().await?;
        let id = EntityId::new(format!(
            "generated-{}",
            self.next_id.fetch_add(1, Ordering::SeqCst) + 1
        ));
        Ok(self.persisted(id, entity).await)
    }

    async fn update(&self, id: &EntityId, entity: &Entity) -> Result<Entity, ApiClientError> {
        self.calls
            .lock()
            .await
            .push(ApiCall::Update(id.clone(), entity.clone()));
        self.check_stall().await;
        self.check_failure().await?;
        Ok(self.persisted(id.clone(), entity).await)
    }

    async fn delete(&self, kind: ContentKind, id: &EntityId) -> Result<(), ApiClientError> {
        self.calls
            .lock()
            .await
            .push(ApiCall::Delete(kind, id.clone()));
        self.check_failure().await
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct RecordedRequest {
    pub(crate) method: String,
    pub(crate) path: String,
    pub(crate) query: Option<String>,
    pub(crate) authorization: Option<String>,
    pub(crate) cookie: Option<String>,
    pub(crate) body: serde_json::Value,
}

#[derive(Debug, Clone)]
pub(crate) struct ScriptedResponse {
    pub(crate) status: u16,
    pub(crate) body: serde_json::Value,
    pub(crate) set_cookie: Option<String>,
}

impl ScriptedResponse {
    pub(crate) fn ok(body: serde_json::Value) -> Self {
        Self::status(200, body)
    }

    pub(crate) fn status(status: u16, body: serde_json::Value) -> Self {
        Self {
            status,
            body,
            set_cookie: None,
        }
    }
}

/// HTTP server answering every request with the next scripted response and
/// recording what it was sent.
#[derive(Clone, Default)]
pub(crate) struct ScriptedServer {
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
    responses: Arc<Mutex<std::collections::VecDeque<ScriptedResponse>>>,
}

impl ScriptedServer {
    /// Starts the server and returns it with its `/api` base URL.
    pub(crate) async fn start(responses: Vec<ScriptedResponse>) -> (Self, url::Url) {
        std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
        let server = Self {
            requests: Arc::default(),
            responses: Arc::new(Mutex::new(responses.into())),
        };
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind");
        let addr = listener.local_addr().expect("addr");
        let app = axum::Router::new()
            .fallback(respond)
            .with_state(server.clone());
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });
        let base = url::Url::parse(&format!("http://{addr}/api")).expect("base url");
        (server, base)
    }

    pub(crate) async fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().await.clone()
    }
}

async fn respond(
    axum::extract::State(server): axum::extract::State<ScriptedServer>,
    method: axum::http::Method,
    uri: axum::http::Uri,
    headers: axum::http::HeaderMap,
    body: axum::body::Bytes,
) -> axum::response::Response {
    use axum::response::IntoResponse;

    let header = |name: axum::http::header::HeaderName| {
        headers
            .get(name)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string)
    };
    server.requests.lock().await.push(RecordedRequest {
        method: method.to_string(),
        path: uri.path().to_string(),
        query: uri.query().map(str::to_string),
        authorization: header(axum::http::header::AUTHORIZATION),
        cookie: header(axum::http::header::COOKIE),
        body: serde_json::from_slice(&body).unwrap_or(serde_json::Value::Null),
    });

    let scripted = server
        .responses
        .lock()
        .await
        .pop_front()
        .unwrap_or_else(|| {
            ScriptedResponse::status(500, serde_json::json!({ "message": "unscripted" }))
        });
    let status = axum::http::StatusCode::from_u16(scripted.status).expect("status");
    let mut response = (status, axum::Json(scripted.body)).into_response();
    if let Some(cookie) = scripted.set_cookie {
        response.headers_mut().insert(
            axum::http::header::SET_COOKIE,
            cookie.parse().expect("cookie header"),
        );
    }
    response
}
