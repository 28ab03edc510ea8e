use crate::{AppState, handlers};
use axum::{Router, routing::get};

/// Website Router Module
///
/// The collection and single-resource routes. Each method router answers
/// OPTIONS itself and sends unsupported methods to `method_not_allowed`,
/// which authenticates before replying 405.
pub fn website_routes() -> Router<AppState> {
    Router::new()
        // GET/POST /websites
        .route(
            "/websites",
            get(handlers::list_websites)
                .post(handlers::create_website)
                .options(handlers::preflight)
                .fallback(handlers::method_not_allowed),
        )
        // GET/PUT/DELETE /websites/{id}
        // Malformed ids are answered like unknown ones (404).
        .route(
            "/websites/{id}",
            get(handlers::get_website)
                .put(handlers::update_website)
                .delete(handlers::delete_website)
                .options(handlers::preflight)
                .fallback(handlers::method_not_allowed),
        )
}
