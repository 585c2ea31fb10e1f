mod app;
mod audit;
mod auth;
mod config;
mod error;
mod extract;
mod mailer;
mod named;
mod roles;
mod seed;
mod state;
mod store;
mod tokens;
mod users;

#[cfg(test)]
mod testing;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let env_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "starter=debug,axum=info,tower_http=info".to_string());
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

    let state = state::AppState::init().await?;

    let data = seed::load_initial_data(state.store.as_ref(), &state.config).await?;
    tracing::info!(
        permissions = data.permissions.len(),
        roles = data.roles.len(),
        admin = data.admin.is_some(),
        "initial data loaded"
    );

    let addr = state.config.listen_addr()?;
    let app = app::build_app(state);
    app::serve(app, addr).await
}
