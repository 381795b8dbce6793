// libs/consultation-cell/src/handlers.rs
use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    Json,
};
use axum_extra::TypedHeader;
use headers::{authorization::Bearer, Authorization};
use serde_json::{json, Value};
use tracing::debug;
use uuid::Uuid;

use doctor_cell::models::DoctorQuery;
use shared_models::auth::User;
use shared_models::error::AppError;

use crate::error::ConsultationError;
use crate::models::{NewConsultationRequest, RespondToRequest};
use crate::state::ConsultationCellState;

fn caller_id(user: &User) -> Result<Uuid, AppError> {
    user.uuid().map_err(AppError::Auth)
}

/// Patient dashboards are keyed on the caller's id; doctors have their own inbox.
fn require_patient(user: &User) -> Result<Uuid, AppError> {
    if user.is_doctor() {
        return Err(ConsultationError::Forbidden("Doctors cannot open a patient consultation session".to_string()).into());
    }
    caller_id(user)
}

fn require_doctor(user: &User) -> Result<Uuid, AppError> {
    if !user.is_doctor() {
        return Err(ConsultationError::Forbidden("Only doctors can manage consultation requests".to_string()).into());
    }
    caller_id(user)
}

// ==============================================================================
// SESSION
// ==============================================================================

#[axum::debug_handler]
pub async fn mount_session(
    State(state): State<ConsultationCellState>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let patient_id = require_patient(&user)?;

    let session = state.sessions.mount(patient_id, auth.token()).await;
    let workflow = session.workflow();

    Ok(Json(json!({
        "patient_id": patient_id,
        "doctors": session.listings().await,
        "notifications": workflow.notifications().await,
        "toasts": workflow.drain_toasts().await,
        "polling": session.is_polling()
    })))
}

#[axum::debug_handler]
pub async fn unmount_session(
    State(state): State<ConsultationCellState>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let patient_id = require_patient(&user)?;
    state.sessions.unmount(patient_id).await?;

    Ok(Json(json!({
        "success": true
    })))
}

// ==============================================================================
// DOCTOR DISCOVERY
// ==============================================================================

/// Immediate filter over the session's doctor list with row states.
#[axum::debug_handler]
pub async fn list_consultation_doctors(
    State(state): State<ConsultationCellState>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Query(query): Query<DoctorQuery>,
) -> Result<Json<Value>, AppError> {
    let patient_id = require_patient(&user)?;
    let session = state.sessions.get_or_mount(patient_id, auth.token()).await;

    let doctors = session.filter_now(&query, auth.token()).await?;

    Ok(Json(json!({
        "doctors": doctors,
        "total": doctors.len(),
        "loading": session.workflow().is_loading_doctors().await
    })))
}

#[axum::debug_handler]
pub async fn set_search_query(
    State(state): State<ConsultationCellState>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(query): Json<DoctorQuery>,
) -> Result<Json<Value>, AppError> {
    let patient_id = require_patient(&user)?;
    let session = state.sessions.get_or_mount(patient_id, auth.token()).await;

    debug!("Patient {} updated doctor search query", patient_id);
    session.set_query(query);

    Ok(Json(json!({
        "query": session.query()
    })))
}

/// Re-reads the directory and the patient's requests, e.g. after a failed load.
#[axum::debug_handler]
pub async fn reload_session_doctors(
    State(state): State<ConsultationCellState>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let patient_id = require_patient(&user)?;
    let session = state.sessions.get_or_mount(patient_id, auth.token()).await;

    session.reload_doctors().await?;
    let doctors = session.listings().await;

    Ok(Json(json!({
        "doctors": doctors,
        "total": doctors.len()
    })))
}

/// Latest debounced result. Requires a mounted session.
#[axum::debug_handler]
pub async fn get_session_doctors(
    State(state): State<ConsultationCellState>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let patient_id = require_patient(&user)?;
    let session = state.sessions.get(patient_id).await?;
    let doctors = session.listings().await;

    Ok(Json(json!({
        "doctors": doctors,
        "total": doctors.len(),
        "query": session.query(),
        "form": session.workflow().open_form().await
    })))
}

// ==============================================================================
// REQUESTS
// ==============================================================================

#[axum::debug_handler]
pub async fn request_consultation(
    State(state): State<ConsultationCellState>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(doctor_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let patient_id = require_patient(&user)?;
    let session = state.sessions.get_or_mount(patient_id, auth.token()).await;

    let form = session.workflow().request_consultation(doctor_id).await?;

    Ok(Json(json!({
        "form": form
    })))
}

#[axum::debug_handler]
pub async fn close_consultation_form(
    State(state): State<ConsultationCellState>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let patient_id = require_patient(&user)?;
    let session = state.sessions.get(patient_id).await?;

    session.workflow().close_form().await;

    Ok(Json(json!({
        "success": true
    })))
}

#[axum::debug_handler]
pub async fn submit_consultation_request(
    State(state): State<ConsultationCellState>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<NewConsultationRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let patient_id = require_patient(&user)?;
    let session = state.sessions.get_or_mount(patient_id, auth.token()).await;

    let request_id = session.workflow().submit_consultation_request(request).await?;

    Ok((StatusCode::CREATED, Json(json!({
        "success": true,
        "request_id": request_id
    }))))
}

// ==============================================================================
// NOTIFICATIONS & CHAT
// ==============================================================================

#[axum::debug_handler]
pub async fn get_notifications(
    State(state): State<ConsultationCellState>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let patient_id = require_patient(&user)?;
    let session = state.sessions.get_or_mount(patient_id, auth.token()).await;

    let snapshot = session.workflow().refresh_notifications().await?;

    Ok(Json(json!({
        "notifications": snapshot.notifications,
        "unread_count": snapshot.unread_count
    })))
}

#[axum::debug_handler]
pub async fn open_notification(
    State(state): State<ConsultationCellState>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(notification_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let patient_id = require_patient(&user)?;
    let session = state.sessions.get_or_mount(patient_id, auth.token()).await;

    let chat = session.workflow().open_notification(notification_id).await?;

    Ok(Json(json!({
        "chat": chat
    })))
}

#[axum::debug_handler]
pub async fn open_chat(
    State(state): State<ConsultationCellState>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(doctor_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let patient_id = require_patient(&user)?;
    let session = state.sessions.get_or_mount(patient_id, auth.token()).await;

    let route = session.workflow().open_chat(doctor_id).await?;

    Ok(Json(json!(route)))
}

#[axum::debug_handler]
pub async fn drain_toasts(
    State(state): State<ConsultationCellState>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let patient_id = require_patient(&user)?;
    let session = state.sessions.get(patient_id).await?;

    Ok(Json(json!({
        "toasts": session.workflow().drain_toasts().await
    })))
}

// ==============================================================================
// DOCTOR SIDE
// ==============================================================================

#[axum::debug_handler]
pub async fn list_doctor_requests(
    State(state): State<ConsultationCellState>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let doctor_id = require_doctor(&user)?;

    let requests = state.services.ledger
        .list_doctor_requests(doctor_id, auth.token())
        .await?;

    Ok(Json(json!({
        "requests": requests,
        "total": requests.len()
    })))
}

#[axum::debug_handler]
pub async fn respond_to_request(
    State(state): State<ConsultationCellState>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(request_id): Path<Uuid>,
    Json(body): Json<RespondToRequest>,
) -> Result<Json<Value>, AppError> {
    let doctor_id = require_doctor(&user)?;

    let request = state.services.ledger
        .respond_to_request(request_id, doctor_id, body.decision, auth.token())
        .await?;

    Ok(Json(json!({
        "success": true,
        "request": request
    })))
}
