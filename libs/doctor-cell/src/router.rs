use std::sync::Arc;

use axum::{
    Router,
    routing::get,
};

use shared_config::AppConfig;

use crate::handlers;
use crate::services::DoctorDirectory;

#[derive(Clone)]
pub struct DoctorCellState {
    pub config: Arc<AppConfig>,
    pub directory: Arc<dyn DoctorDirectory>,
}

pub fn doctor_routes(state: DoctorCellState) -> Router {
    // Directory reads are public; the anon key stands in for a user token.
    Router::new()
        .route("/", get(handlers::list_doctors_public))
        .route("/search", get(handlers::search_doctors_public))
        .with_state(state)
}
