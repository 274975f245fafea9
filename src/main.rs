use axum::Router;
use dotenvy::dotenv;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

use booking_server::auth::TokenService;
use booking_server::clock::SystemClock;
use booking_server::config::Config;
use booking_server::repository;
use booking_server::routes::{create_routes, RouterOptions};
use booking_server::state::AppState;

#[tokio::main]
async fn main() {
    dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,sqlx=warn")),
        )
        .init();

    let config = Config::from_env().expect("Invalid configuration");

    let pool = repository::connect(&config.database_url, config.database_max_connections)
        .await
        .expect("Failed to connect to database");

    tracing::info!("Database ready, migrations applied");

    let tokens = TokenService::new(&config.jwt_secret, config.token_ttl);
    let state = AppState::new(pool, tokens, Arc::new(SystemClock))
        .with_patch_policy(config.patch_policy);

    let options = RouterOptions {
        cors_allowed_origins: config.cors_allowed_origins.clone(),
        include_hsts: config.production,
    };
    let app: Router = create_routes(state, &options);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("Server running at http://{}", addr);

    let listener = TcpListener::bind(addr)
        .await
        .expect("Failed to bind address");

    axum::serve(listener, app).await.expect("Server failed");
}
