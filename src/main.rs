mod auth;
mod config;
mod cooldown;
mod forms;
mod guard;
mod render;
mod routes;
mod state;
mod supabase;

use std::sync::Arc;

#[tokio::main]
async fn main() {
    // A missing .env file is fine; real environment variables win either way.
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt::init();

    let config = match config::AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "configuration error");
            std::process::exit(1);
        }
    };

    let api = supabase::GoTrueApi::new(&config.supabase_url, &config.supabase_anon_key, config.request_timeout_secs)
        .expect("failed to build identity provider client");
    tracing::info!(provider = %config.supabase_url, site = %config.site_url, "identity provider configured");

    let port = config.port;
    let state = state::AppState::new(config, Arc::new(api));

    let app = routes::app(state);
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{port}"))
        .await
        .expect("failed to bind");

    tracing::info!(%port, "forma listening");
    axum::serve(listener, app).await.expect("server failed");
}
