// libs/consultation-cell/src/services/in_memory.rs
use std::collections::HashSet;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::ConsultationError;
use crate::models::{ConsultationRequest, Decision, NewConsultationRequest, Notification, RequestStatus};
use crate::services::feed::NotificationFeed;
use crate::services::ledger::RequestLedger;
use crate::services::lifecycle::{decision_notification, RequestLifecycleService};

#[derive(Default)]
struct StoreState {
    requests: Vec<ConsultationRequest>,
    notifications: Vec<Notification>,
}

/// Process-local ledger and feed behind a single lock, so a doctor's answer
/// and its notification land together.
pub struct InMemoryConsultationStore {
    state: RwLock<StoreState>,
    lifecycle: RequestLifecycleService,
}

impl InMemoryConsultationStore {
    pub fn new() -> Self {
        Self {
            state: RwLock::new(StoreState::default()),
            lifecycle: RequestLifecycleService::new(),
        }
    }

    /// Inserts a request as-is, bypassing the lifecycle. Used to seed state.
    pub async fn insert_request(&self, request: ConsultationRequest) {
        self.state.write().await.requests.push(request);
    }

    pub async fn insert_notification(&self, notification: Notification) {
        self.state.write().await.notifications.push(notification);
    }

    pub async fn requests(&self) -> Vec<ConsultationRequest> {
        self.state.read().await.requests.clone()
    }

    pub async fn notifications(&self) -> Vec<Notification> {
        self.state.read().await.notifications.clone()
    }
}

impl Default for InMemoryConsultationStore {
    fn default() -> Self {
        Self::new()
    }
}

fn newest_first<T, F>(mut items: Vec<T>, key: F) -> Vec<T>
where
    F: Fn(&T) -> chrono::DateTime<Utc>,
{
    items.sort_by_key(|item| std::cmp::Reverse(key(item)));
    items
}

#[async_trait]
impl RequestLedger for InMemoryConsultationStore {
    async fn has_live_request(
        &self,
        patient_id: Uuid,
        doctor_id: Uuid,
        _auth_token: &str,
    ) -> Result<bool, ConsultationError> {
        let state = self.state.read().await;
        Ok(state.requests.iter().any(|r| {
            r.patient_id == patient_id && r.doctor_id == doctor_id && r.status.is_live()
        }))
    }

    async fn create_request(
        &self,
        patient_id: Uuid,
        data: &NewConsultationRequest,
        _auth_token: &str,
    ) -> Result<Uuid, ConsultationError> {
        let request = ConsultationRequest {
            id: Uuid::new_v4(),
            patient_id,
            doctor_id: data.doctor_id,
            request_type: data.request_type,
            urgency: data.urgency,
            preferred_mode: data.preferred_mode,
            message: data.message.clone(),
            status: RequestStatus::Pending,
            requested_at: Utc::now(),
            responded_at: None,
        };
        let id = request.id;

        self.state.write().await.requests.push(request);
        debug!("Stored consultation request {} for doctor {}", id, data.doctor_id);
        Ok(id)
    }

    async fn list_patient_requests(
        &self,
        patient_id: Uuid,
        _auth_token: &str,
    ) -> Result<Vec<ConsultationRequest>, ConsultationError> {
        let state = self.state.read().await;
        let requests = state.requests.iter()
            .filter(|r| r.patient_id == patient_id)
            .cloned()
            .collect();
        Ok(newest_first(requests, |r| r.requested_at))
    }

    async fn list_doctor_requests(
        &self,
        doctor_id: Uuid,
        _auth_token: &str,
    ) -> Result<Vec<ConsultationRequest>, ConsultationError> {
        let state = self.state.read().await;
        let requests = state.requests.iter()
            .filter(|r| r.doctor_id == doctor_id)
            .cloned()
            .collect();
        Ok(newest_first(requests, |r| r.requested_at))
    }

    async fn respond_to_request(
        &self,
        request_id: Uuid,
        doctor_id: Uuid,
        decision: Decision,
        _auth_token: &str,
    ) -> Result<ConsultationRequest, ConsultationError> {
        let now = Utc::now();
        let mut state = self.state.write().await;

        let request = state.requests.iter_mut()
            .find(|r| r.id == request_id && r.doctor_id == doctor_id)
            .ok_or(ConsultationError::RequestNotFound(request_id))?;

        self.lifecycle.apply_transition(request, decision.target_status(), now)?;
        let updated = request.clone();

        if let Some(notification) = decision_notification(&updated, now) {
            state.notifications.push(notification);
        }

        info!("Doctor {} answered request {}: {}", doctor_id, request_id, updated.status);
        Ok(updated)
    }
}

#[async_trait]
impl NotificationFeed for InMemoryConsultationStore {
    async fn fetch_patient_notifications(
        &self,
        patient_id: Uuid,
        _auth_token: &str,
    ) -> Result<Vec<Notification>, ConsultationError> {
        let state = self.state.read().await;
        let notifications = state.notifications.iter()
            .filter(|n| n.recipient_patient_id == patient_id)
            .cloned()
            .collect();
        Ok(newest_first(notifications, |n| n.created_at))
    }

    async fn mark_notification_as_read(
        &self,
        notification_id: Uuid,
        _auth_token: &str,
    ) -> Result<(), ConsultationError> {
        let mut state = self.state.write().await;
        let notification = state.notifications.iter_mut()
            .find(|n| n.id == notification_id)
            .ok_or(ConsultationError::NotificationNotFound(notification_id))?;

        notification.mark_read(Utc::now());
        Ok(())
    }

    async fn check_for_request_updates(
        &self,
        patient_id: Uuid,
        _auth_token: &str,
    ) -> Result<usize, ConsultationError> {
        let now = Utc::now();
        let mut state = self.state.write().await;

        let notified: HashSet<Uuid> = state.notifications.iter()
            .filter_map(|n| n.request_id)
            .collect();

        let missing: Vec<Notification> = state.requests.iter()
            .filter(|r| r.patient_id == patient_id && !notified.contains(&r.id))
            .filter_map(|r| decision_notification(r, now))
            .collect();

        let written = missing.len();
        state.notifications.extend(missing);

        if written > 0 {
            info!("Request sweep wrote {} notifications for patient {}", written, patient_id);
        }
        Ok(written)
    }
}
