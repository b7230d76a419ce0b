// src/main.rs
mod api;
mod config;
mod geometry;
mod model;
mod optimizer;
mod types;

use config::AppConfig;
use log::{error, info};

#[tokio::main]
async fn main() {
    let dotenv_outcome = dotenvy::dotenv();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if let Err(err) = dotenv_outcome {
        if !matches!(err, dotenvy::Error::Io(ref io_err) if io_err.kind() == std::io::ErrorKind::NotFound)
        {
            log::warn!("⚠️ Could not load .env: {}", err);
        }
    }

    let app_config = AppConfig::from_env();
    let api_config = app_config.api.clone();
    let estimator_settings = app_config.estimator.clone();

    info!("🚀 Load estimation service starting...");
    if let Err(err) = api::start_api_server(api_config, estimator_settings).await {
        error!("❌ API server terminated with an error: {err}");
        std::process::exit(1);
    }
}
