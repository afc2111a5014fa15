//! `reqwest` transport for the account API.
//!
//! ERROR HANDLING
//! ==============
//! Connection failures become [`ApiError::Transport`]. Non-success statuses
//! are decoded once into [`ErrorBody`] and returned as [`ApiError::Rejected`].

#[cfg(test)]
#[path = "http_test.rs"]
mod http_test;

use std::time::Duration;

use async_trait::async_trait;
use session::api::{self, AccountApi, CURRENT_USER_PATH, LOGIN_PATH, REGISTER_PATH};
use session::storage::stored_token;
use session::{ApiError, ErrorBody, LoginRequest, LoginResponse, RegisterRequest, SessionStorage, UserProfile};

const REQUEST_TIMEOUT_SECS: u64 = 30;
const CONNECT_TIMEOUT_SECS: u64 = 10;

// =============================================================================
// CLIENT
// =============================================================================

pub struct HttpAccountApi<S> {
    http: reqwest::Client,
    base_url: String,
    storage: S,
}

impl<S: SessionStorage> HttpAccountApi<S> {
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built (TLS backend).
    pub fn new(base_url: impl Into<String>, storage: S) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .build()?;
        Ok(Self { http, base_url: base_url.into(), storage })
    }

    fn url(&self, path: &str) -> String {
        api::endpoint(&self.base_url, path)
    }

    /// Attach the stored bearer token, if any.
    fn authorized(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match stored_token(&self.storage) {
            Some(token) => request.header(reqwest::header::AUTHORIZATION, api::bearer(&token)),
            None => request,
        }
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<reqwest::Response, ApiError> {
        let response = request.send().await.map_err(|e| ApiError::Transport(e.to_string()))?;
        ensure_ok(response).await
    }
}

async fn ensure_ok(response: reqwest::Response) -> Result<reqwest::Response, ApiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let bytes = response.bytes().await.unwrap_or_default();
    Err(ApiError::Rejected { status: status.as_u16(), body: ErrorBody::from_bytes(&bytes) })
}

async fn decode<T: serde::de::DeserializeOwned>(response: reqwest::Response) -> Result<T, ApiError> {
    let bytes = response.bytes().await.map_err(|e| ApiError::Transport(e.to_string()))?;
    serde_json::from_slice(&bytes).map_err(|e| ApiError::Decode(e.to_string()))
}

#[async_trait(?Send)]
impl<S: SessionStorage> AccountApi for HttpAccountApi<S> {
    async fn login(&self, request: &LoginRequest) -> Result<LoginResponse, ApiError> {
        let response = self.send(self.http.post(self.url(LOGIN_PATH)).json(request)).await?;
        decode(response).await
    }

    async fn register(&self, request: &RegisterRequest) -> Result<(), ApiError> {
        self.send(self.http.post(self.url(REGISTER_PATH)).json(request)).await?;
        Ok(())
    }

    async fn current_user(&self) -> Result<UserProfile, ApiError> {
        let response = self.send(self.authorized(self.http.get(self.url(CURRENT_USER_PATH)))).await?;
        decode(response).await
    }
}
