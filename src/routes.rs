use axum::{
    http::Method,
    routing::{delete, get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route(
            "/polls",
            post(handlers::create_poll).get(handlers::list_polls),
        )
        .route(
            "/polls/{id}",
            get(handlers::get_poll)
                .patch(handlers::update_poll)
                .delete(handlers::delete_poll),
        )
        .route("/polls/{id}/votes", get(handlers::get_poll_votes))
        .route("/polls/{id}/reconcile", post(handlers::reconcile_poll))
        .route("/votes", post(handlers::cast_vote))
        .route("/votes/{id}", delete(handlers::delete_vote))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_headers(Any)
                .allow_methods([
                    Method::GET,
                    Method::POST,
                    Method::PATCH,
                    Method::DELETE,
                    Method::OPTIONS,
                ]),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
