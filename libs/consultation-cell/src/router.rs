// libs/consultation-cell/src/router.rs
use axum::{
    middleware,
    routing::{delete, get, post, put},
    Router,
};

use shared_utils::extractor::auth_middleware;

use crate::handlers;
use crate::state::ConsultationCellState;

pub fn consultation_routes(state: ConsultationCellState) -> Router {
    // All consultation operations require authentication
    let protected_routes = Router::new()
        // Patient session
        .route("/session", post(handlers::mount_session).delete(handlers::unmount_session))
        .route("/session/query", put(handlers::set_search_query))
        .route("/session/doctors", get(handlers::get_session_doctors))
        .route("/session/doctors/reload", post(handlers::reload_session_doctors))
        .route("/session/form", delete(handlers::close_consultation_form))

        // Discovery and requests
        .route("/doctors", get(handlers::list_consultation_doctors))
        .route("/doctors/{doctor_id}/request", post(handlers::request_consultation))
        .route("/requests", post(handlers::submit_consultation_request))

        // Notifications, chat and toasts
        .route("/notifications", get(handlers::get_notifications))
        .route("/notifications/{notification_id}/open", post(handlers::open_notification))
        .route("/chat/{doctor_id}", get(handlers::open_chat))
        .route("/toasts", get(handlers::drain_toasts))

        // Doctor inbox
        .route("/doctor/requests", get(handlers::list_doctor_requests))
        .route("/doctor/requests/{request_id}/respond", post(handlers::respond_to_request))

        .layer(middleware::from_fn_with_state(state.config.clone(), auth_middleware));

    Router::new()
        .merge(protected_routes)
        .with_state(state)
}
