//! Tauri Commands Module
//!
//! IPC commands exposed to the frontend. Each one forwards to the injected
//! [`AppProvider`]; failures surface as toasts, never as command errors.

use reqwest::Method;
use serde::Serialize;
use serde_json::Value;
use tauri::{command, State};
use tracing::debug;

use crate::api::ApiError;
use crate::models::{Car, User};
use crate::provider::{AppContextValue, AppProvider};

/// Error payload returned to the webview by [`api_request`]
#[derive(Debug, Serialize)]
pub struct RequestFailure {
    pub status: Option<u16>,
    pub message: String,
}

impl From<ApiError> for RequestFailure {
    fn from(e: ApiError) -> Self {
        let status = match &e {
            ApiError::Server { status, .. } => Some(*status),
            _ => None,
        };
        let message = e
            .server_message()
            .map(str::to_owned)
            .unwrap_or_else(|| e.to_string());
        Self { status, message }
    }
}

/// Current context value, for the first render
#[command]
pub fn get_app_context(state: State<'_, AppProvider>) -> AppContextValue {
    debug!("Getting app context");
    state.snapshot()
}

#[command]
pub async fn fetch_user(state: State<'_, AppProvider>) -> Result<(), String> {
    state.fetch_user().await;
    Ok(())
}

#[command]
pub async fn fetch_cars(state: State<'_, AppProvider>) -> Result<(), String> {
    state.fetch_cars().await;
    Ok(())
}

/// Logout and clear the stored token
#[command]
pub fn logout(state: State<'_, AppProvider>) {
    state.logout();
}

/// Adopt the token returned by the login form
#[command]
pub async fn login(token: String, state: State<'_, AppProvider>) -> Result<(), String> {
    state.login(token).await;
    Ok(())
}

#[command]
pub async fn set_token(token: Option<String>, state: State<'_, AppProvider>) -> Result<(), String> {
    state.set_token(token).await;
    Ok(())
}

#[command]
pub fn set_user(user: Option<User>, state: State<'_, AppProvider>) {
    state.set_user(user);
}

#[command]
pub fn set_is_owner(is_owner: bool, state: State<'_, AppProvider>) {
    state.set_is_owner(is_owner);
}

#[command]
pub fn set_show_login(show: bool, state: State<'_, AppProvider>) {
    state.set_show_login(show);
}

#[command]
pub fn set_pickup_date(date: String, state: State<'_, AppProvider>) {
    state.set_pickup_date(date);
}

#[command]
pub fn set_return_date(date: String, state: State<'_, AppProvider>) {
    state.set_return_date(date);
}

#[command]
pub fn set_cars(cars: Vec<Car>, state: State<'_, AppProvider>) {
    state.set_cars(cars);
}

#[command]
pub fn navigate(path: String, state: State<'_, AppProvider>) {
    state.navigate(&path);
}

/// Any other API call, through the shared client and its token injection
#[command]
pub async fn api_request(
    method: String,
    path: String,
    body: Option<Value>,
    state: State<'_, AppProvider>,
) -> Result<Value, RequestFailure> {
    let method = Method::from_bytes(method.to_ascii_uppercase().as_bytes()).map_err(|_| {
        RequestFailure {
            status: None,
            message: format!("Unsupported method: {}", method),
        }
    })?;

    state
        .api_request(method, &path, body)
        .await
        .map_err(RequestFailure::from)
}
