use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::middleware::from_fn_with_state;
use axum::routing::{get, post};
use tower_http::trace::TraceLayer;

use crate::state::AppState;
use crate::{handlers, middleware};

pub fn build_router(app_state: AppState, body_limit_bytes: usize) -> Router {
    let contact_routes = Router::new()
        .route(
            "/contacts",
            post(handlers::contacts::create_contact_handler),
        )
        .route(
            "/contacts/batch",
            post(handlers::contacts::batch_contacts_handler),
        )
        .route(
            "/contacts/{id}",
            get(handlers::contacts::get_contact_handler)
                .patch(handlers::contacts::update_contact_handler)
                .delete(handlers::contacts::delete_contact_handler),
        )
        .route_layer(from_fn_with_state(
            app_state.clone(),
            middleware::require_actor,
        ));

    Router::new()
        .route("/health", get(handlers::health::health_handler))
        .merge(contact_routes)
        .layer(DefaultBodyLimit::max(body_limit_bytes))
        .layer(TraceLayer::new_for_http())
        .with_state(app_state)
}

#[cfg(test)]
mod tests;
