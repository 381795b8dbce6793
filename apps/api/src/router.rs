use std::sync::Arc;

use axum::{
    Router,
    routing::get,
};

use consultation_cell::{consultation_routes, ConsultationCellState, ConsultationServices};
use doctor_cell::{doctor_routes, DoctorCellState};
use shared_config::AppConfig;

pub fn create_router(config: Arc<AppConfig>) -> Router {
    let services = ConsultationServices::from_config(&config);

    let doctor_state = DoctorCellState {
        config: config.clone(),
        directory: services.directory.clone(),
    };
    let consultation_state = ConsultationCellState::new(config, services);

    Router::new()
        .route("/", get(|| async { "Neuvia consultation API is running!" }))
        .nest("/doctors", doctor_routes(doctor_state))
        .nest("/consultations", consultation_routes(consultation_state))
}
