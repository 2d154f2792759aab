//! Typed HTTP client for the school data API
//!
//! Plain request/response CRUD calls with bearer-token auth. Real-time
//! invalidation of anything fetched through here arrives separately via
//! `maestro-realtime`.

use crate::{ApiError, ApiResult, TokenStore};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;

/// HTTP client for the remote data API
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    tokens: Arc<TokenStore>,
}

impl ApiClient {
    /// Create a client for the given base URL
    ///
    /// # Errors
    /// Returns an error if the base URL is empty.
    pub fn new(base_url: impl Into<String>, tokens: Arc<TokenStore>) -> ApiResult<Self> {
        let base_url = base_url.into();
        if base_url.is_empty() {
            return Err(ApiError::InvalidBaseUrl(base_url));
        }

        Ok(Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            tokens,
        })
    }

    /// The token store this client authenticates with
    #[must_use]
    pub fn tokens(&self) -> Arc<TokenStore> {
        self.tokens.clone()
    }

    /// GET a JSON resource
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> ApiResult<T> {
        let request = self.http.get(self.url(path));
        let response = self.authorize(request).send().await?;
        Self::decode(path, response).await
    }

    /// POST a JSON body, returning the created resource
    pub async fn post<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> ApiResult<T> {
        let request = self.http.post(self.url(path)).json(body);
        let response = self.authorize(request).send().await?;
        Self::decode(path, response).await
    }

    /// PUT a JSON body, returning the updated resource
    pub async fn put<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> ApiResult<T> {
        let request = self.http.put(self.url(path)).json(body);
        let response = self.authorize(request).send().await?;
        Self::decode(path, response).await
    }

    /// DELETE a resource
    pub async fn delete(&self, path: &str) -> ApiResult<()> {
        let request = self.http.delete(self.url(path));
        let response = self.authorize(request).send().await?;
        let status = response.status();

        if status == StatusCode::UNAUTHORIZED {
            return Err(ApiError::Unauthorized);
        }
        if !status.is_success() {
            return Err(ApiError::Status {
                status,
                path: path.to_string(),
            });
        }
        Ok(())
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self.tokens.token() {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn decode<T: DeserializeOwned>(
        path: &str,
        response: reqwest::Response,
    ) -> ApiResult<T> {
        let status = response.status();

        if status == StatusCode::UNAUTHORIZED {
            tracing::warn!(path = %path, "API request unauthorized");
            return Err(ApiError::Unauthorized);
        }
        if !status.is_success() {
            tracing::warn!(path = %path, status = %status, "API request failed");
            return Err(ApiError::Status {
                status,
                path: path.to_string(),
            });
        }

        Ok(response.json().await?)
    }
}
