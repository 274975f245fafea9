use axum::{
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

use crate::config::{create_cors_layer, with_security_headers};
use crate::handlers::{events, health_check, users};
use crate::state::AppState;

#[derive(Debug, Clone, Default)]
pub struct RouterOptions {
    pub cors_allowed_origins: Option<String>,
    pub include_hsts: bool,
}

pub fn create_routes(state: AppState, options: &RouterOptions) -> Router {
    let router = Router::new()
        .route("/health", get(health_check))
        .route("/signup", post(users::signup))
        .route("/login", post(users::login))
        .route(
            "/events",
            get(events::list_events).post(events::create_event),
        )
        .route(
            "/events/:id",
            get(events::get_event)
                .put(events::update_event)
                .delete(events::delete_event),
        )
        .route(
            "/events/:id/registration",
            post(events::register_for_event).delete(events::cancel_registration),
        )
        .with_state(state);

    with_security_headers(router, options.include_hsts)
        .layer(create_cors_layer(options.cors_allowed_origins.as_deref()))
        .layer(TraceLayer::new_for_http())
}
