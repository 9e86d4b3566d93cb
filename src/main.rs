mod app;
mod auth;
mod config;
mod error;
mod home;
mod responses;
mod state;
mod users;

use crate::{config::AppConfig, state::AppState, users::seed::seed_users};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let env_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "users_api=debug,axum=info,tower_http=info".to_string());
    let json_logs = std::env::var("LOG_FORMAT")
        .map(|v| v == "json")
        .unwrap_or(false);

    if json_logs {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    }

    let config = AppConfig::from_env()?;
    let state = AppState::init(config).await?;

    if state.config.seed_users {
        let created = seed_users(state.users.as_ref()).await?;
        tracing::info!(created, "seed finished");
    }

    let addr = state.config.bind_addr();
    app::serve(app::build_app(state), &addr).await
}
