// libs/consultation-cell/src/services/lifecycle.rs
use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::ConsultationError;
use crate::models::{
    ConsultationRequest, DoctorRowState, Notification, NotificationType, RequestStatus,
};

pub struct RequestLifecycleService;

impl RequestLifecycleService {
    pub fn new() -> Self {
        Self
    }

    /// Validate that a status transition is allowed
    pub fn validate_status_transition(
        &self,
        current_status: RequestStatus,
        new_status: RequestStatus,
    ) -> Result<(), ConsultationError> {
        debug!("Validating request transition from {} to {}", current_status, new_status);

        if !self.get_valid_transitions(current_status).contains(&new_status) {
            warn!("Invalid request transition attempted: {} -> {}", current_status, new_status);
            return Err(ConsultationError::InvalidTransition {
                from: current_status,
                to: new_status,
            });
        }

        info!("Request transition validated: {} -> {}", current_status, new_status);
        Ok(())
    }

    pub fn get_valid_transitions(&self, current_status: RequestStatus) -> Vec<RequestStatus> {
        match current_status {
            RequestStatus::Pending => vec![RequestStatus::Accepted, RequestStatus::Rejected],
            // Terminal states
            RequestStatus::Accepted => vec![],
            RequestStatus::Rejected => vec![],
        }
    }

    /// Applies a validated transition, stamping `responded_at`.
    pub fn apply_transition(
        &self,
        request: &mut ConsultationRequest,
        new_status: RequestStatus,
        at: DateTime<Utc>,
    ) -> Result<(), ConsultationError> {
        self.validate_status_transition(request.status, new_status)?;
        request.status = new_status;
        request.responded_at = Some(at);
        Ok(())
    }
}

impl Default for RequestLifecycleService {
    fn default() -> Self {
        Self::new()
    }
}

/// The notification a patient receives once a doctor answers. `None` while
/// the request is still pending.
pub fn decision_notification(request: &ConsultationRequest, at: DateTime<Utc>) -> Option<Notification> {
    let (notification_type, title, message) = match request.status {
        RequestStatus::Pending => return None,
        RequestStatus::Accepted => (
            NotificationType::ConsultationAccepted,
            "Consultation Request Accepted",
            "Your consultation request has been accepted. You can now chat with your doctor.",
        ),
        RequestStatus::Rejected => (
            NotificationType::ConsultationRejected,
            "Consultation Request Declined",
            "Your consultation request was declined. You can send a request to another doctor.",
        ),
    };

    Some(Notification {
        id: Uuid::new_v4(),
        recipient_patient_id: request.patient_id,
        notification_type,
        doctor_id: Some(request.doctor_id),
        request_id: Some(request.id),
        title: title.to_string(),
        message: message.to_string(),
        read: false,
        created_at: at,
        read_at: None,
    })
}

/// Doctor id to the most recent live request the patient holds with them.
pub fn live_requests_by_doctor(requests: &[ConsultationRequest]) -> HashMap<Uuid, Uuid> {
    let mut latest: HashMap<Uuid, &ConsultationRequest> = HashMap::new();

    for request in requests.iter().filter(|r| r.status.is_live()) {
        latest
            .entry(request.doctor_id)
            .and_modify(|current| {
                if request.requested_at > current.requested_at {
                    *current = request;
                }
            })
            .or_insert(request);
    }

    latest.into_iter().map(|(doctor_id, request)| (doctor_id, request.id)).collect()
}

/// Doctors the patient may chat with: an accepted request or any acceptance
/// notification, read or not.
pub fn chat_unlocked_doctors(
    requests: &[ConsultationRequest],
    notifications: &[Notification],
) -> HashSet<Uuid> {
    requests
        .iter()
        .filter(|r| r.status == RequestStatus::Accepted)
        .map(|r| r.doctor_id)
        .chain(
            notifications
                .iter()
                .filter(|n| n.is_acceptance())
                .filter_map(|n| n.doctor_id),
        )
        .collect()
}

pub fn row_state(
    doctor_id: Uuid,
    requested: &HashMap<Uuid, Uuid>,
    chat_unlocked: &HashSet<Uuid>,
) -> DoctorRowState {
    if chat_unlocked.contains(&doctor_id) {
        DoctorRowState::ChatUnlocked
    } else if requested.contains_key(&doctor_id) {
        DoctorRowState::Requested
    } else {
        DoctorRowState::None
    }
}
