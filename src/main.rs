//! Car Rental Desktop - Main Entry Point
//!
//! Hosts the webview and wires the app state provider into it.

#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]

use anyhow::Context;
use std::sync::Arc;
use tauri::Manager;
use tracing::info;

use car_rental_lib::{
    api::ApiClient, commands, config::Config, logging, storage::SecureStorage,
    webview::WebviewFrontend, AppProvider,
};

fn main() -> anyhow::Result<()> {
    // Initialize logging
    logging::init();
    info!("Car Rental Desktop starting...");

    // Environment first, then .env
    let config = Config::load().context("invalid configuration")?;

    // Token storage and the shared HTTP client
    let storage = Arc::new(match &config.data_dir {
        Some(dir) => SecureStorage::with_dir(dir),
        None => SecureStorage::new(),
    });
    let api = Arc::new(
        ApiClient::from_config(&config, storage.clone()).context("failed to create HTTP client")?,
    );
    info!("Using API at {}", api.base_url());

    let currency = config.currency;

    // The provider needs the app handle, so it is built in setup
    tauri::Builder::default()
        .plugin(tauri_plugin_shell::init())
        .setup(move |app| {
            let frontend = Arc::new(WebviewFrontend::new(app.handle().clone()));
            app.manage(AppProvider::new(api, frontend, storage, currency));

            // Startup fetches run in the background
            let handle = app.handle().clone();
            tauri::async_runtime::spawn(async move {
                handle.state::<AppProvider>().initialize().await;
            });

            info!("Application setup complete");
            Ok(())
        })
        .invoke_handler(tauri::generate_handler![
            commands::get_app_context,
            commands::fetch_user,
            commands::fetch_cars,
            commands::logout,
            commands::login,
            commands::set_token,
            commands::set_user,
            commands::set_is_owner,
            commands::set_show_login,
            commands::set_pickup_date,
            commands::set_return_date,
            commands::set_cars,
            commands::navigate,
            commands::api_request,
        ])
        .run(tauri::generate_context!())
        .context("error running Car Rental")?;

    Ok(())
}
