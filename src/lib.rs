pub mod config;
pub mod db;
pub mod errors;
pub mod models;
pub mod relay;
pub mod routes;

use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::{HeaderName, Method};
use axum::routing::{any, get};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::db::message_repository::MessageRepository;
use crate::relay::GroqClient;
use crate::routes::relay_routes::chat_handler;
use crate::routes::store_routes::{insert_message_handler, list_messages_handler};

pub fn relay_router(provider: GroqClient) -> Router {
    Router::new()
        .route("/functions/v1/chat", any(chat_handler))
        .with_state(provider)
}

pub fn store_router(repo: MessageRepository) -> Router {
    Router::new()
        .route(
            "/rest/v1/messages",
            get(list_messages_handler).post(insert_message_handler),
        )
        .with_state(repo)
}

/// Permissive cross-origin policy for browser callers of every route.
pub fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([
            AUTHORIZATION,
            HeaderName::from_static("x-client-info"),
            HeaderName::from_static("apikey"),
            CONTENT_TYPE,
        ])
}

/// Full application router. Store routes are only present with a database.
pub fn app(provider: GroqClient, repo: Option<MessageRepository>) -> Router {
    let mut router = relay_router(provider);
    if let Some(repo) = repo {
        router = router.merge(store_router(repo));
    }
    router.layer(cors_layer()).layer(TraceLayer::new_for_http())
}
