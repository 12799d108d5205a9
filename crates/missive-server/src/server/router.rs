use crate::server::service::handler::{
    create_message, delete_message, get_message, health, list_messages, update_message,
};
use crate::server::service::state::AppState;
use axum::Router;
use axum::routing::get;
use missive::MessageStore;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;

/// Builds the route table over `state`.
///
/// With `request_log` set, every request gets an `info` span and one
/// response line with status and latency.
pub fn router<S>(state: AppState<S>, request_log: bool) -> Router
where
    S: MessageStore + Send + Sync + 'static,
{
    let app = Router::new()
        .route("/messages", get(list_messages::<S>).post(create_message::<S>))
        .route(
            "/messages/{id}",
            get(get_message)
                .put(update_message::<S>)
                .delete(delete_message::<S>),
        )
        .route("/health", get(health))
        .with_state(state)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any)
                .expose_headers(Any),
        );

    if request_log {
        app.layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
    } else {
        app
    }
}
