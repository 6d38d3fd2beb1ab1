//! Webview Bridge
//!
//! Delivers toasts, navigation and state updates to the webview as Tauri
//! events.

use serde::Serialize;
use tauri::{AppHandle, Emitter};
use tracing::warn;

use crate::frontend::{Frontend, Toast, NAVIGATE_EVENT, STATE_EVENT, TOAST_EVENT};
use crate::provider::AppContextValue;

/// [`Frontend`] that emits to every webview window
pub struct WebviewFrontend {
    app: AppHandle,
}

impl WebviewFrontend {
    pub fn new(app: AppHandle) -> Self {
        Self { app }
    }

    fn emit<S: Serialize + Clone>(&self, event: &str, payload: S) {
        if let Err(e) = self.app.emit(event, payload) {
            warn!("Failed to emit {} event: {}", event, e);
        }
    }
}

impl Frontend for WebviewFrontend {
    fn toast(&self, toast: Toast) {
        self.emit(TOAST_EVENT, toast);
    }

    fn navigate(&self, path: &str) {
        self.emit(NAVIGATE_EVENT, path);
    }

    fn state_changed(&self, value: &AppContextValue) {
        self.emit(STATE_EVENT, value);
    }
}
