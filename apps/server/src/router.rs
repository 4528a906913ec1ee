use crate::handlers;
use crate::state::AppState;
use axum::Router;
use axum::routing::get;
use tower_http::trace::TraceLayer;

pub(crate) fn init(state: AppState) -> Router {
    Router::new()
        .route(
            "/",
            get(handlers::usage).post(handlers::create_generated).put(handlers::replace_generated),
        )
        .route(
            "/{id}",
            get(handlers::fetch)
                .put(handlers::replace)
                .post(handlers::create)
                .delete(handlers::remove),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
