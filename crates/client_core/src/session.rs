//! Operator credentials. The library never reads them from ambient storage;
//! callers inject a [`SessionProvider`].

use reqwest::{header, Client, RequestBuilder};
use serde_json::Value;
use shared::protocol::{LoginRequest, LoginResponse, OperatorSummary};
use tracing::{info, warn};
use url::Url;

use crate::{
    api::{endpoint, normalize_base, ResponseExt},
    error::ApiClientError,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Credentials {
    Bearer(String),
    /// A raw `name=value` cookie pair as issued by the auth endpoint.
    Cookie(String),
}

impl Credentials {
    pub(crate) fn apply(&self, request: RequestBuilder) -> RequestBuilder {
        match self {
            Credentials::Bearer(token) => request.bearer_auth(token),
            Credentials::Cookie(cookie) => request.header(header::COOKIE, cookie),
        }
    }
}

pub trait SessionProvider: Send + Sync {
    fn credentials(&self) -> Option<Credentials>;
}

/// Sends no credentials; only public reads will succeed.
pub struct AnonymousSession;

impl SessionProvider for AnonymousSession {
    fn credentials(&self) -> Option<Credentials> {
        None
    }
}

pub struct StaticSession {
    credentials: Credentials,
}

impl StaticSession {
    pub fn new(credentials: Credentials) -> Self {
        Self { credentials }
    }
}

impl SessionProvider for StaticSession {
    fn credentials(&self) -> Option<Credentials> {
        Some(self.credentials.clone())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginSession {
    pub credentials: Credentials,
    pub operator: Option<OperatorSummary>,
}

/// Client for the `/auth` endpoints next to the content API.
pub struct AuthClient {
    http: Client,
    base: Url,
}

impl AuthClient {
    pub fn new(http: Client, base: Url) -> Self {
        Self {
            http,
            base: normalize_base(base),
        }
    }

    /// Exchanges email and password for credentials. A session cookie wins
    /// over a token in the body.
    #[tracing::instrument(skip(self, password))]
    pub async fn login(&self, email: &str, password: &str) -> Result<LoginSession, ApiClientError> {
        let response = self
            .http
            .post(endpoint(&self.base, "auth/login")?)
            .json(&LoginRequest {
                email: email.to_string(),
                password: password.to_string(),
            })
            .send()
            .await
            .map_api_error()
            .await?;

        let cookie = session_cookie(response.headers());
        let body: LoginResponse = response.json().await.unwrap_or_default();
        let credentials = match (cookie, body.token) {
            (Some(cookie), _) => Credentials::Cookie(cookie),
            (None, Some(token)) if !token.is_empty() => Credentials::Bearer(token),
            _ => {
                warn!("login succeeded without a cookie or token");
                return Err(ApiClientError::Decode(
                    "login response carried no credentials".to_string(),
                ));
            }
        };
        info!(email, "logged in");
        Ok(LoginSession {
            credentials,
            operator: body.user,
        })
    }

    #[tracing::instrument(skip_all)]
    pub async fn logout(&self, credentials: &Credentials) -> Result<(), ApiClientError> {
        credentials
            .apply(self.http.post(endpoint(&self.base, "auth/logout")?))
            .send()
            .await
            .map_api_error()
            .await?;
        info!("logged out");
        Ok(())
    }

    /// The operator the credentials belong to; `401` when they are stale.
    #[tracing::instrument(skip_all)]
    pub async fn me(&self, credentials: &Credentials) -> Result<OperatorSummary, ApiClientError> {
        let value: Value = credentials
            .apply(self.http.get(endpoint(&self.base, "auth/me")?))
            .send()
            .await
            .map_api_error()
            .await?
            .json()
            .await?;
        let value = match value {
            Value::Object(mut map) if map.contains_key("user") => {
                map.remove("user").unwrap_or(Value::Null)
            }
            other => other,
        };
        serde_json::from_value(value).map_err(|err| ApiClientError::Decode(err.to_string()))
    }
}

fn session_cookie(headers: &header::HeaderMap) -> Option<String> {
    headers
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .filter_map(|value| value.split(';').next())
        .map(str::trim)
        .find(|pair| pair.split_once('=').is_some_and(|(_, v)| !v.is_empty()))
        .map(str::to_string)
}

#[cfg(test)]
#[path = "tests/session_tests.rs"]
mod tests;
