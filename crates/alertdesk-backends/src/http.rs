//! Thin JSON client shared by every adapter.

use std::time::Duration;

use reqwest::{Method, RequestBuilder, Response};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::config::Auth;
use crate::error::{BackendError, Result};

/// Longest response body kept in a status error.
const MAX_ERROR_BODY: usize = 512;

/// A JSON client bound to one backend base URL.
#[derive(Debug, Clone)]
pub struct ApiClient {
    backend: String,
    base_url: String,
    auth: Auth,
    client: reqwest::Client,
}

impl ApiClient {
    /// Creates a client for `base_url`.
    ///
    /// # Errors
    ///
    /// Returns `BackendError::Config` if the URL does not parse or the HTTP
    /// client cannot be built.
    pub fn new(
        backend: impl Into<String>,
        base_url: &str,
        auth: Auth,
        timeout: Duration,
    ) -> Result<Self> {
        let backend = backend.into();
        url::Url::parse(base_url)
            .map_err(|e| BackendError::Config(format!("{backend}: invalid URL: {e}")))?;

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| BackendError::Config(format!("{backend}: {e}")))?;

        Ok(Self {
            backend,
            base_url: base_url.trim_end_matches('/').to_string(),
            auth,
            client,
        })
    }

    /// Backend name used in errors and logs.
    #[must_use]
    pub fn backend(&self) -> &str {
        &self.backend
    }

    /// Base URL without a trailing slash.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Absolute URL for a path (which may carry a query string).
    #[must_use]
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let builder = self.client.request(method, self.url(path));
        match &self.auth {
            Auth::None => builder,
            Auth::Basic { username, password } => builder.basic_auth(username, Some(password)),
            Auth::Bearer { token } => builder.bearer_auth(token),
        }
    }

    /// `GET path` and decode the JSON body.
    ///
    /// # Errors
    ///
    /// Returns a transport, status or decode error.
    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let response = self.send(self.request(Method::GET, path), "GET", path).await?;
        self.decode(response).await
    }

    /// `POST path` with a JSON body and decode the JSON response.
    ///
    /// # Errors
    ///
    /// Returns a transport, status or decode error.
    pub async fn post_json<B, T>(&self, path: &str, body: &B) -> Result<T>
    where
        B: Serialize + Sync,
        T: DeserializeOwned,
    {
        let request = self.request(Method::POST, path).json(body);
        let response = self.send(request, "POST", path).await?;
        self.decode(response).await
    }

    /// `DELETE path`, ignoring the body of a successful response.
    ///
    /// # Errors
    ///
    /// Returns a transport or status error.
    pub async fn delete(&self, path: &str) -> Result<()> {
        self.send(self.request(Method::DELETE, path), "DELETE", path)
            .await
            .map(|_| ())
    }

    async fn send(&self, request: RequestBuilder, method: &str, path: &str) -> Result<Response> {
        debug!(backend = %self.backend, method, path, "backend request");

        let response = request.send().await.map_err(|e| BackendError::Transport {
            backend: self.backend.clone(),
            message: e.to_string(),
        })?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let mut body = response.text().await.unwrap_or_default();
        if body.len() > MAX_ERROR_BODY {
            let mut cut = MAX_ERROR_BODY;
            while !body.is_char_boundary(cut) {
                cut -= 1;
            }
            body.truncate(cut);
        }
        debug!(backend = %self.backend, method, path, status = status.as_u16(), "backend error status");

        Err(BackendError::Status {
            backend: self.backend.clone(),
            status: status.as_u16(),
            body: body.trim().to_string(),
        })
    }

    async fn decode<T: DeserializeOwned>(&self, response: Response) -> Result<T> {
        let body = response.text().await.map_err(|e| BackendError::Transport {
            backend: self.backend.clone(),
            message: e.to_string(),
        })?;
        serde_json::from_str(&body).map_err(|e| BackendError::Decode {
            backend: self.backend.clone(),
            message: e.to_string(),
        })
    }
}
