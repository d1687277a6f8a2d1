//! Authenticated fetch wrapper.
//!
//! `AuthFetch::fetch` attaches the bearer credential, signals 401 responses on
//! the `UnauthorizedBridge`, and never fails: a transport error comes back as a
//! synthetic 500 response. Callers branch on `status()` / `ok()` and read the
//! body themselves.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use reqwest::header::{self, HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, Method, StatusCode};
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, warn};

use crate::auth::{Credential, CredentialStore, SessionProvider, UnauthorizedBridge};

use super::ApiError;

/// `error` message carried by the synthetic response for transport failures
pub const NETWORK_ERROR_MESSAGE: &str = "Network error";

/// Method, headers and body for one request. Defaults to a bodiless GET.
#[derive(Debug, Clone)]
pub struct FetchOptions {
    method: Method,
    headers: HeaderMap,
    body: Option<String>,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self::new(Method::GET)
    }
}

impl FetchOptions {
    pub fn new(method: Method) -> Self {
        Self {
            method,
            headers: HeaderMap::new(),
            body: None,
        }
    }

    pub fn get() -> Self {
        Self::new(Method::GET)
    }

    pub fn post() -> Self {
        Self::new(Method::POST)
    }

    pub fn put() -> Self {
        Self::new(Method::PUT)
    }

    pub fn delete() -> Self {
        Self::new(Method::DELETE)
    }

    /// Set a header. Caller headers override the computed ones.
    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    pub fn headers(mut self, headers: HeaderMap) -> Self {
        self.headers.extend(headers);
        self
    }

    pub fn body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn json<B: Serialize + ?Sized>(self, body: &B) -> Result<Self, serde_json::Error> {
        Ok(self.body(serde_json::to_string(body)?))
    }

    pub fn method(&self) -> &Method {
        &self.method
    }
}

enum Body {
    Upstream(reqwest::Response),
    Synthetic { headers: HeaderMap, body: String },
}

/// Response returned by `AuthFetch::fetch`, either from the server or
/// fabricated after a transport failure.
pub struct FetchResponse {
    status: StatusCode,
    body: Body,
}

impl FetchResponse {
    fn upstream(response: reqwest::Response) -> Self {
        Self {
            status: response.status(),
            body: Body::Upstream(response),
        }
    }

    /// Status 500 with a JSON body `{"error": "Network error"}`
    pub fn network_error() -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            body: Body::Synthetic {
                headers,
                body: serde_json::json!({ "error": NETWORK_ERROR_MESSAGE }).to_string(),
            },
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn ok(&self) -> bool {
        self.status.is_success()
    }

    /// True when no response was received and this one was fabricated
    pub fn is_synthetic(&self) -> bool {
        matches!(self.body, Body::Synthetic { .. })
    }

    pub fn headers(&self) -> &HeaderMap {
        match &self.body {
            Body::Upstream(response) => response.headers(),
            Body::Synthetic { headers, .. } => headers,
        }
    }

    pub async fn text(self) -> Result<String, ApiError> {
        match self.body {
            Body::Upstream(response) => Ok(response.text().await?),
            Body::Synthetic { body, .. } => Ok(body),
        }
    }

    pub async fn json<T: DeserializeOwned>(self) -> Result<T, ApiError> {
        let text = self.text().await?;
        serde_json::from_str(&text).map_err(|e| ApiError::InvalidResponse(format!("Failed to parse JSON: {}", e)))
    }

    /// Pass successful responses through; turn anything else into an `ApiError`.
    pub async fn error_for_status(self) -> Result<Self, ApiError> {
        if self.ok() {
            return Ok(self);
        }
        let status = self.status;
        let body = self.text().await.unwrap_or_default();
        Err(ApiError::from_status(status, &body))
    }
}

impl fmt::Debug for FetchResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FetchResponse")
            .field("status", &self.status)
            .field("synthetic", &self.is_synthetic())
            .finish()
    }
}

/// HTTP client that resolves and attaches the bearer credential on every call.
///
/// Clone is cheap - the reqwest client, store and bridge are all shared.
#[derive(Clone)]
pub struct AuthFetch {
    client: Client,
    base_url: String,
    store: CredentialStore,
    session: Arc<dyn SessionProvider>,
    bridge: UnauthorizedBridge,
}

impl AuthFetch {
    /// Build a wrapper over a fresh reqwest client. `timeout` of `None` keeps
    /// the transport default.
    pub fn new(
        base_url: impl Into<String>,
        store: CredentialStore,
        session: Arc<dyn SessionProvider>,
        bridge: UnauthorizedBridge,
        timeout: Option<Duration>,
    ) -> Result<Self, ApiError> {
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self::with_client(builder.build()?, base_url, store, session, bridge))
    }

    pub fn with_client(
        client: Client,
        base_url: impl Into<String>,
        store: CredentialStore,
        session: Arc<dyn SessionProvider>,
        bridge: UnauthorizedBridge,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            store,
            session,
            bridge,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    pub fn store(&self) -> &CredentialStore {
        &self.store
    }

    pub fn session(&self) -> &Arc<dyn SessionProvider> {
        &self.session
    }

    pub fn bridge(&self) -> &UnauthorizedBridge {
        &self.bridge
    }

    /// Absolute URLs pass through; anything else is a path under `base_url`.
    pub fn resolve_url(&self, url: &str) -> String {
        if url.starts_with("http://") || url.starts_with("https://") {
            return url.to_string();
        }
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            url.trim_start_matches('/')
        )
    }

    /// Credential store first, then the session provider.
    pub async fn resolve_credential(&self) -> Option<Credential> {
        if let Some(credential) = self.store.get() {
            return Some(credential);
        }
        let token = self.session.token().await.filter(|t| !t.is_empty())?;
        debug!("Using session token, credential store is empty");
        Some(Credential::from(token))
    }

    fn build_headers(credential: Option<&Credential>, overrides: HeaderMap) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));

        if let Some(credential) = credential {
            match HeaderValue::from_str(&credential.bearer()) {
                Ok(mut value) => {
                    value.set_sensitive(true);
                    headers.insert(header::AUTHORIZATION, value);
                }
                Err(_) => warn!("Credential is not a valid header value, sending request without it"),
            }
        }

        // Replaces computed values for any header the caller set
        headers.extend(overrides);
        headers
    }

    /// Send one request. Never fails; see the module docs.
    pub async fn fetch(&self, url: &str, options: FetchOptions) -> FetchResponse {
        let url = self.resolve_url(url);
        let credential = self.resolve_credential().await;
        let FetchOptions { method, headers, body } = options;

        debug!(method = %method, url = %url, authenticated = credential.is_some(), "Sending request");

        let mut request = self
            .client
            .request(method, &url)
            .headers(Self::build_headers(credential.as_ref(), headers));
        if let Some(body) = body {
            request = request.body(body);
        }

        match request.send().await {
            Ok(response) => {
                let status = response.status();
                if status == StatusCode::UNAUTHORIZED {
                    warn!(url = %url, "Request unauthorized, signalling session expiry");
                    self.bridge.publish();
                } else {
                    debug!(url = %url, status = status.as_u16(), "Response received");
                }
                FetchResponse::upstream(response)
            }
            Err(e) => {
                warn!(url = %url, error = %e, "Request failed before a response arrived");
                FetchResponse::network_error()
            }
        }
    }

    pub async fn get(&self, url: &str) -> FetchResponse {
        self.fetch(url, FetchOptions::get()).await
    }
}
