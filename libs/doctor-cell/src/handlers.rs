use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};

use shared_models::error::AppError;

use crate::models::{DirectoryError, DoctorQuery};
use crate::router::DoctorCellState;
use crate::services::DoctorFilterEngine;

#[derive(Debug, Deserialize)]
pub struct DoctorSearchQuery {
    pub q: String,
}

impl From<DirectoryError> for AppError {
    fn from(error: DirectoryError) -> Self {
        match error {
            DirectoryError::Unavailable(msg) => AppError::ExternalService(msg),
        }
    }
}

/// Full listing, optionally narrowed by the same filters the patient
/// dashboard uses.
#[axum::debug_handler]
pub async fn list_doctors_public(
    State(state): State<DoctorCellState>,
    Query(query): Query<DoctorQuery>,
) -> Result<Json<Value>, AppError> {
    let token = state.config.supabase_anon_key.as_str();

    let doctors = state.directory.fetch_doctors(token).await?;
    let doctors = DoctorFilterEngine::new(state.directory.clone())
        .apply(&doctors, &query, token)
        .await?;

    Ok(Json(json!({
        "doctors": doctors,
        "total": doctors.len()
    })))
}

#[axum::debug_handler]
pub async fn search_doctors_public(
    State(state): State<DoctorCellState>,
    Query(query): Query<DoctorSearchQuery>,
) -> Result<Json<Value>, AppError> {
    if query.q.trim().is_empty() {
        return Err(AppError::BadRequest("Search text is required".to_string()));
    }

    let doctors = state.directory
        .search_doctors(&query.q, &state.config.supabase_anon_key)
        .await?;

    Ok(Json(json!({
        "doctors": doctors,
        "total": doctors.len()
    })))
}
