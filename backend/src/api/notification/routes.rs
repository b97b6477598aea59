//! Defines the HTTP routes for the caller's inbox and notification stream.
//!
//! Every route acts on the session user's own notifications.

use super::handlers::*;
use crate::auth::middleware::session_auth;
use crate::state::AppState;
use axum::{
    Router, middleware,
    routing::{get, patch},
};

pub fn notification_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(list_notifications).post(send_notification))
        .route("/unread", get(list_unread))
        .route("/unread-count", get(unread_count))
        .route("/read-all", patch(mark_all_read))
        .route("/{id}/read", patch(mark_read))
        .route("/stream", get(stream_notifications))
        .layer(middleware::from_fn_with_state(state, session_auth))
}
