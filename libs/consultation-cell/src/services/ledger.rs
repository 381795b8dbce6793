// libs/consultation-cell/src/services/ledger.rs
use async_trait::async_trait;
use chrono::Utc;
use reqwest::Method;
use serde_json::{json, Value};
use tracing::{debug, info, warn};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;

use crate::error::ConsultationError;
use crate::models::{ConsultationRequest, Decision, NewConsultationRequest, RequestStatus};
use crate::services::lifecycle::RequestLifecycleService;

/// Store of consultation requests. Requests are never deleted.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RequestLedger: Send + Sync {
    /// True when the patient holds a pending or accepted request with the doctor.
    async fn has_live_request(
        &self,
        patient_id: Uuid,
        doctor_id: Uuid,
        auth_token: &str,
    ) -> Result<bool, ConsultationError>;

    async fn create_request(
        &self,
        patient_id: Uuid,
        data: &NewConsultationRequest,
        auth_token: &str,
    ) -> Result<Uuid, ConsultationError>;

    async fn list_patient_requests(
        &self,
        patient_id: Uuid,
        auth_token: &str,
    ) -> Result<Vec<ConsultationRequest>, ConsultationError>;

    /// A doctor's inbox, newest first.
    async fn list_doctor_requests(
        &self,
        doctor_id: Uuid,
        auth_token: &str,
    ) -> Result<Vec<ConsultationRequest>, ConsultationError>;

    /// Moves a pending request to accepted or rejected and writes the
    /// patient's notification in the same write.
    async fn respond_to_request(
        &self,
        request_id: Uuid,
        doctor_id: Uuid,
        decision: Decision,
        auth_token: &str,
    ) -> Result<ConsultationRequest, ConsultationError>;
}

pub struct SupabaseRequestLedger {
    supabase: SupabaseClient,
    lifecycle: RequestLifecycleService,
}

impl SupabaseRequestLedger {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
            lifecycle: RequestLifecycleService::new(),
        }
    }

    async fn fetch_requests(&self, path: &str, auth_token: &str) -> Result<Vec<ConsultationRequest>, ConsultationError> {
        let rows: Vec<Value> = self.supabase.request(
            Method::GET,
            path,
            Some(auth_token),
            None,
        ).await.map_err(|e| ConsultationError::Database(e.to_string()))?;

        let mut requests = Vec::with_capacity(rows.len());
        for row in rows {
            match serde_json::from_value::<ConsultationRequest>(row) {
                Ok(request) => requests.push(request),
                Err(e) => warn!("Skipping malformed consultation request: {}", e),
            }
        }

        Ok(requests)
    }
}

#[async_trait]
impl RequestLedger for SupabaseRequestLedger {
    async fn has_live_request(
        &self,
        patient_id: Uuid,
        doctor_id: Uuid,
        auth_token: &str,
    ) -> Result<bool, ConsultationError> {
        debug!("Checking for live request from patient {} to doctor {}", patient_id, doctor_id);

        let path = format!(
            "/rest/v1/consultation_requests?select=id&patient_id=eq.{}&doctor_id=eq.{}&status=in.(pending,accepted)&limit=1",
            patient_id, doctor_id
        );

        let rows: Vec<Value> = self.supabase.request(
            Method::GET,
            &path,
            Some(auth_token),
            None,
        ).await.map_err(|e| ConsultationError::Database(e.to_string()))?;

        Ok(!rows.is_empty())
    }

    async fn create_request(
        &self,
        patient_id: Uuid,
        data: &NewConsultationRequest,
        auth_token: &str,
    ) -> Result<Uuid, ConsultationError> {
        debug!("Creating consultation request from patient {} to doctor {}", patient_id, data.doctor_id);

        let body = json!({
            "patient_id": patient_id,
            "doctor_id": data.doctor_id,
            "request_type": data.request_type,
            "urgency": data.urgency,
            "preferred_mode": data.preferred_mode,
            "message": data.message,
            "status": RequestStatus::Pending,
            "requested_at": Utc::now().to_rfc3339(),
        });

        let created: Vec<ConsultationRequest> = self.supabase.request_with_headers(
            Method::POST,
            "/rest/v1/consultation_requests",
            Some(auth_token),
            Some(body),
            Some(SupabaseClient::return_representation()),
        ).await.map_err(|e| ConsultationError::Database(e.to_string()))?;

        let request = created.into_iter().next().ok_or_else(|| {
            ConsultationError::Database("Insert returned no consultation request".to_string())
        })?;

        info!("Consultation request {} created for doctor {}", request.id, request.doctor_id);
        Ok(request.id)
    }

    async fn list_patient_requests(
        &self,
        patient_id: Uuid,
        auth_token: &str,
    ) -> Result<Vec<ConsultationRequest>, ConsultationError> {
        let path = format!(
            "/rest/v1/consultation_requests?patient_id=eq.{}&order=requested_at.desc",
            patient_id
        );
        self.fetch_requests(&path, auth_token).await
    }

    async fn list_doctor_requests(
        &self,
        doctor_id: Uuid,
        auth_token: &str,
    ) -> Result<Vec<ConsultationRequest>, ConsultationError> {
        let path = format!(
            "/rest/v1/consultation_requests?doctor_id=eq.{}&order=requested_at.desc",
            doctor_id
        );
        self.fetch_requests(&path, auth_token).await
    }

    async fn respond_to_request(
        &self,
        request_id: Uuid,
        doctor_id: Uuid,
        decision: Decision,
        auth_token: &str,
    ) -> Result<ConsultationRequest, ConsultationError> {
        let path = format!(
            "/rest/v1/consultation_requests?id=eq.{}&doctor_id=eq.{}",
            request_id, doctor_id
        );
        let current = self.fetch_requests(&path, auth_token).await?
            .into_iter()
            .next()
            .ok_or(ConsultationError::RequestNotFound(request_id))?;

        let new_status = decision.target_status();
        self.lifecycle.validate_status_transition(current.status, new_status)?;

        // The function updates the row and inserts the notification in one
        // transaction, guarded by `status = 'pending'`.
        let updated: Vec<ConsultationRequest> = self.supabase.rpc(
            "respond_to_consultation_request",
            Some(auth_token),
            json!({
                "p_request_id": request_id,
                "p_doctor_id": doctor_id,
                "p_status": new_status,
            }),
        ).await.map_err(|e| ConsultationError::Database(e.to_string()))?;

        let updated = updated.into_iter().next().ok_or(ConsultationError::InvalidTransition {
            from: RequestStatus::Pending,
            to: new_status,
        })?;

        info!("Doctor {} answered request {}: {}", doctor_id, request_id, updated.status);
        Ok(updated)
    }
}
