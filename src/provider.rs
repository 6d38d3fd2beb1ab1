//! App State Provider
//!
//! Owns session, vehicle and search state, runs the two startup fetches and
//! hands everything to the UI through [`AppContextValue`] snapshots.
//!
//! Fetch failures never escape: they are logged and turned into toasts.
//! There is no retry and no cancellation, so when fetches overlap the last
//! one to finish wins.

use reqwest::Method;
use serde::Serialize;
use serde_json::Value;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, error, info, warn};

use crate::api::{ApiError, RentalApi};
use crate::frontend::{Frontend, Toast};
use crate::models::{Car, CarsResponse, SearchFilters, User, UserDataResponse};
use crate::session::SessionState;
use crate::storage::SecureStorage;

/// Where the UI is sent when the user payload is missing
pub const ROOT_ROUTE: &str = "/";

const FETCH_USER_FAILED: &str = "Failed to fetch user";
const FETCH_USER_ERROR: &str = "Error fetching user";
const NO_CARS_FOUND: &str = "No cars found";
const FETCH_CARS_ERROR: &str = "Error fetching cars";
const LOGGED_OUT: &str = "You have been logged out";

/// Everything the UI reads from the provider
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppContextValue {
    pub currency: String,
    pub token: Option<String>,
    pub user: Option<User>,
    pub is_owner: bool,
    pub show_login: bool,
    pub cars: Vec<Car>,
    pub pickup_date: String,
    pub return_date: String,
    pub rental_days: Option<i64>,
}

#[derive(Debug, Default)]
struct ProviderState {
    session: SessionState,
    show_login: bool,
    cars: Vec<Car>,
    filters: SearchFilters,
}

/// Shared application state, injected into every command
pub struct AppProvider {
    api: Arc<dyn RentalApi>,
    frontend: Arc<dyn Frontend>,
    storage: Arc<SecureStorage>,
    currency: String,
    state: Mutex<ProviderState>,
}

impl AppProvider {
    pub fn new(
        api: Arc<dyn RentalApi>,
        frontend: Arc<dyn Frontend>,
        storage: Arc<SecureStorage>,
        currency: impl Into<String>,
    ) -> Self {
        Self {
            api,
            frontend,
            storage,
            currency: currency.into(),
            state: Mutex::new(ProviderState::default()),
        }
    }

    /// Adopt the persisted token, if any, and load the car list.
    ///
    /// The user fetch triggered by the token and the car fetch run
    /// concurrently.
    pub async fn initialize(&self) {
        info!("Initializing app state");
        let stored = self.storage.token();

        let adopt_stored = async {
            match stored {
                Some(token) => {
                    debug!("Found stored token");
                    self.set_token(Some(token)).await;
                }
                None => debug!("No stored token found"),
            }
        };

        tokio::join!(adopt_stored, self.fetch_cars());
    }

    /// Replace the in-memory token and fire [`Self::on_token_changed`] if it changed
    pub async fn set_token(&self, token: Option<String>) {
        let changed = self.update(|state| state.session.set_token(token));
        if changed {
            let current = self.token();
            self.on_token_changed(current.as_deref()).await;
        }
    }

    /// Fetch the user whenever a token appears or changes.
    ///
    /// Losing the token does nothing here; [`Self::logout`] clears the user.
    pub async fn on_token_changed(&self, token: Option<&str>) {
        if token.is_some() {
            debug!("Token changed, fetching user");
            self.fetch_user().await;
        }
    }

    /// Load the current user from the API
    pub async fn fetch_user(&self) {
        match self.api.fetch_user_data().await {
            Ok(UserDataResponse {
                user: Some(user), ..
            }) => {
                let applied = self.update(|state| {
                    if !state.session.is_authenticated() {
                        return false;
                    }
                    state.session.set_user(Some(user));
                    true
                });
                if !applied {
                    debug!("Session ended before user data arrived, discarding");
                }
            }
            Ok(response) => {
                warn!("User data response carried no user");
                self.frontend
                    .toast(Toast::error(message_or(response.message, FETCH_USER_FAILED)));
                self.frontend.navigate(ROOT_ROUTE);
            }
            Err(e) => {
                error!("Failed to fetch user: {}", e);
                self.frontend
                    .toast(Toast::error(e.server_message().unwrap_or(FETCH_USER_ERROR)));
            }
        }
    }

    /// Load the car list, replacing it only on success
    pub async fn fetch_cars(&self) {
        match self.api.fetch_cars().await {
            Ok(CarsResponse {
                cars: Some(cars), ..
            }) => {
                info!("Loaded {} cars", cars.len());
                self.update(|state| state.cars = cars);
            }
            Ok(response) => {
                warn!("Cars response carried no car list");
                self.frontend
                    .toast(Toast::error(message_or(response.message, NO_CARS_FOUND)));
            }
            Err(e) => {
                error!("Failed to fetch cars: {}", e);
                self.frontend
                    .toast(Toast::error(e.server_message().unwrap_or(FETCH_CARS_ERROR)));
            }
        }
    }

    /// Forget the session locally. The server is not told.
    pub fn logout(&self) {
        info!("Logging out");

        // Delete stored token
        if let Err(e) = self.storage.clear_token() {
            warn!("Failed to delete stored token: {}", e);
        }

        // Clear session and drop the default header
        self.update(|state| state.session.clear());
        self.api.set_default_authorization(None);

        self.frontend.toast(Toast::success(LOGGED_OUT));
    }

    /// Persist a token obtained by the login flow and adopt it
    pub async fn login(&self, token: String) {
        if token.is_empty() {
            warn!("Ignoring login with an empty token");
            return;
        }

        // Persist token
        if let Err(e) = self.storage.save_token(&token) {
            error!("Failed to save token: {}", e);
        }
        self.api.set_default_authorization(Some(token.clone()));
        self.update(|state| state.show_login = false);

        self.set_token(Some(token)).await;
    }

    /// Make any other API call through the shared client.
    ///
    /// Unlike the fetches above, the error goes back to the caller: the
    /// component making the call decides what to show.
    pub async fn api_request(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> Result<Value, ApiError> {
        let result = self.api.request(method.clone(), path, body).await;
        if let Err(e) = &result {
            warn!("{} {} failed: {}", method, path, e);
        }
        result
    }

    /// Set or clear the user; a user without a session is refused
    pub fn set_user(&self, user: Option<User>) {
        self.update(|state| {
            if user.is_some() && !state.session.is_authenticated() {
                warn!("Refusing to set a user without a session");
                return;
            }
            state.session.set_user(user);
        });
    }

    pub fn set_is_owner(&self, is_owner: bool) {
        self.update(|state| state.session.set_is_owner(is_owner));
    }

    pub fn set_show_login(&self, show: bool) {
        self.update(|state| state.show_login = show);
    }

    pub fn set_pickup_date(&self, date: String) {
        self.update(|state| state.filters.pickup_date = date);
    }

    pub fn set_return_date(&self, date: String) {
        self.update(|state| state.filters.return_date = date);
    }

    pub fn set_cars(&self, cars: Vec<Car>) {
        self.update(|state| state.cars = cars);
    }

    pub fn navigate(&self, path: &str) {
        self.frontend.navigate(path);
    }

    pub fn currency(&self) -> &str {
        &self.currency
    }

    pub fn token(&self) -> Option<String> {
        self.lock().session.token().map(str::to_owned)
    }

    pub fn user(&self) -> Option<User> {
        self.lock().session.user().cloned()
    }

    pub fn is_owner(&self) -> bool {
        self.lock().session.is_owner()
    }

    pub fn show_login(&self) -> bool {
        self.lock().show_login
    }

    pub fn cars(&self) -> Vec<Car> {
        self.lock().cars.clone()
    }

    pub fn search_filters(&self) -> SearchFilters {
        self.lock().filters.clone()
    }

    pub fn snapshot(&self) -> AppContextValue {
        let state = self.lock();
        self.context_value(&state)
    }

    fn context_value(&self, state: &ProviderState) -> AppContextValue {
        AppContextValue {
            currency: self.currency.clone(),
            token: state.session.token().map(str::to_owned),
            user: state.session.user().cloned(),
            is_owner: state.session.is_owner(),
            show_login: state.show_login,
            cars: state.cars.clone(),
            pickup_date: state.filters.pickup_date.clone(),
            return_date: state.filters.return_date.clone(),
            rental_days: state.filters.rental_days(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, ProviderState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Mutate state, then publish the result once the lock is released
    fn update<R>(&self, mutate: impl FnOnce(&mut ProviderState) -> R) -> R {
        let (result, value) = {
            let mut state = self.lock();
            let result = mutate(&mut state);
            (result, self.context_value(&state))
        };
        self.frontend.state_changed(&value);
        result
    }
}

fn message_or(message: Option<String>, fallback: &str) -> String {
    message
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| fallback.to_string())
}
