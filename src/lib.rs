//! Car Rental Desktop Library
//!
//! Client state for the car rental desktop app: session, vehicles and
//! search filters, plus the API client and storage behind them.

pub mod api;
pub mod config;
pub mod frontend;
pub mod logging;
pub mod models;
pub mod provider;
pub mod session;
pub mod storage;

#[cfg(feature = "desktop")]
pub mod commands;
#[cfg(feature = "desktop")]
pub mod webview;

pub use provider::{AppContextValue, AppProvider};
