//! API Module
//!
//! HTTP communication with the car rental backend. Every request carries the
//! persisted token as a raw `Authorization` header when one exists.

use async_trait::async_trait;
use reqwest::header::AUTHORIZATION;
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::Config;
use crate::models::{CarsResponse, ErrorResponse, UserDataResponse};
use crate::storage::SecureStorage;

pub const USER_DATA_PATH: &str = "/api/user/data";
pub const CARS_PATH: &str = "/api/user/cars";

/// The backend calls the provider depends on
#[async_trait]
pub trait RentalApi: Send + Sync {
    /// `GET /api/user/data`
    async fn fetch_user_data(&self) -> Result<UserDataResponse, ApiError>;

    /// `GET /api/user/cars`
    async fn fetch_cars(&self) -> Result<CarsResponse, ApiError>;

    /// Any other call against the API, with the same header injection.
    ///
    /// `path` must be absolute on the configured host (`/api/...`). A JSON
    /// body is sent when given; an empty response body reads as `null`.
    async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> Result<Value, ApiError>;

    /// Header used when no token is persisted; `None` removes it.
    fn set_default_authorization(&self, token: Option<String>);
}

/// API client for the car rental backend
#[derive(Debug)]
pub struct ApiClient {
    base_url: String,
    client: reqwest::Client,
    storage: Arc<SecureStorage>,
    default_authorization: Mutex<Option<String>>,
}

impl ApiClient {
    /// Create a new API client
    pub fn new(
        base_url: &str,
        timeout: Duration,
        storage: Arc<SecureStorage>,
    ) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ApiError::Network(e.to_string()))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
            storage,
            default_authorization: Mutex::new(None),
        })
    }

    pub fn from_config(config: &Config, storage: Arc<SecureStorage>) -> Result<Self, ApiError> {
        Self::new(&config.api_base_url, config.request_timeout, storage)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Header value for the next request: the stored token wins over the default.
    ///
    /// Reads the storage's in-memory copy, never the disk.
    fn authorization(&self) -> Option<String> {
        self.storage.token().or_else(|| {
            self.default_authorization
                .lock()
                .ok()
                .and_then(|header| header.clone())
        })
    }

    /// Send `method path` with the Authorization header and check the status
    async fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<reqwest::Response, ApiError> {
        // Only paths on the configured host, so the token never leaves it
        if !path.starts_with('/') || path.starts_with("//") {
            return Err(ApiError::InvalidPath(path.to_string()));
        }

        let url = format!("{}{}", self.base_url, path);
        debug!("{} {}", method, url);

        let mut request = self.client.request(method.clone(), &url);
        if let Some(token) = self.authorization() {
            request = request.header(AUTHORIZATION, token);
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request
            .send()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error: ErrorResponse = response.json().await.unwrap_or_default();
            warn!("{} {} failed with status {}", method, path, status);
            return Err(ApiError::Server {
                status: status.as_u16(),
                message: error.message,
            });
        }

        Ok(response)
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.send(Method::GET, path, None)
            .await?
            .json::<T>()
            .await
            .map_err(|e| ApiError::Parse(e.to_string()))
    }
}

#[async_trait]
impl RentalApi for ApiClient {
    async fn fetch_user_data(&self) -> Result<UserDataResponse, ApiError> {
        self.get(USER_DATA_PATH).await
    }

    async fn fetch_cars(&self) -> Result<CarsResponse, ApiError> {
        self.get(CARS_PATH).await
    }

    async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> Result<Value, ApiError> {
        let response = self.send(method, path, body.as_ref()).await?;
        let bytes = response
            .bytes()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;

        // Empty bodies (204 and friends) come back as null
        if bytes.is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_slice(&bytes).map_err(|e| ApiError::Parse(e.to_string()))
    }

    fn set_default_authorization(&self, token: Option<String>) {
        if let Ok(mut header) = self.default_authorization.lock() {
            *header = token.filter(|t| !t.is_empty());
        }
    }
}

/// API errors
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Server error ({status}): {}", .message.as_deref().unwrap_or("no message"))]
    Server { status: u16, message: Option<String> },

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Invalid API path: {0:?}")]
    InvalidPath(String),
}

impl ApiError {
    /// Message the server attached to the failure, if it sent one
    pub fn server_message(&self) -> Option<&str> {
        match self {
            ApiError::Server { message, .. } => message.as_deref().filter(|m| !m.is_empty()),
            _ => None,
        }
    }
}
