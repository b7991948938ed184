//! Management router: segments, subscribers, subscriber tags and invitations.

use axum::middleware;
use axum::routing::{get, post, put};
use axum::Router;

use crate::auth;
use crate::handlers::{self, ManagementState};

/// Build the management router. Every route sits behind the bearer token
/// middleware. Returns a Router that should be merged into the main app.
pub fn management_router(state: ManagementState) -> Router {
    Router::new()
        // Segments
        .route("/segments", get(handlers::list_segments).post(handlers::store_segment))
        .route("/segments/create", get(handlers::create_segment_form))
        .route(
            "/segments/:id",
            put(handlers::update_segment)
                .delete(handlers::destroy_segment)
                .post(handlers::segment_form_action),
        )
        .route("/segments/:id/edit", get(handlers::edit_segment_form))
        // Subscribers
        .route("/subscribers", get(handlers::list_subscribers).post(handlers::store_subscriber))
        .route(
            "/subscribers/:id",
            get(handlers::show_subscriber).delete(handlers::destroy_subscriber),
        )
        .route(
            "/subscribers/:id/tags",
            get(handlers::list_subscriber_tags)
                .post(handlers::store_subscriber_tags)
                .put(handlers::update_subscriber_tags)
                .delete(handlers::destroy_subscriber_tags),
        )
        // Invitations
        .route(
            "/workspaces/invitations",
            get(handlers::list_invitations).post(handlers::store_invitation),
        )
        .route(
            "/workspaces/invitations/:id",
            post(handlers::destroy_invitation).delete(handlers::destroy_invitation),
        )
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::auth_middleware,
        ))
        .with_state(state)
}
