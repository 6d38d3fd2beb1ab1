//! Frontend Bridge
//!
//! What the provider needs from whatever renders the UI: toasts, navigation
//! and a hook to publish fresh state.

use serde::Serialize;

use crate::provider::AppContextValue;

/// Event names the webview listens on
pub const TOAST_EVENT: &str = "toast";
pub const NAVIGATE_EVENT: &str = "navigate";
pub const STATE_EVENT: &str = "app-state";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ToastKind {
    Success,
    Error,
}

/// A user-facing notification
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Toast {
    pub kind: ToastKind,
    pub message: String,
}

impl Toast {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            kind: ToastKind::Success,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            kind: ToastKind::Error,
            message: message.into(),
        }
    }
}

/// Sink for everything the provider shows or does to the UI
pub trait Frontend: Send + Sync {
    fn toast(&self, toast: Toast);

    /// Route the UI to `path`
    fn navigate(&self, path: &str);

    /// Called after every state mutation with the new context value
    fn state_changed(&self, value: &AppContextValue);
}
