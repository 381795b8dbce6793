// libs/consultation-cell/src/services/feed.rs
use async_trait::async_trait;
use chrono::Utc;
use reqwest::Method;
use serde_json::{json, Value};
use tracing::{debug, warn};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;

use crate::error::ConsultationError;
use crate::models::Notification;

/// Patient-facing notification store, read by polling.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait NotificationFeed: Send + Sync {
    /// Newest first.
    async fn fetch_patient_notifications(
        &self,
        patient_id: Uuid,
        auth_token: &str,
    ) -> Result<Vec<Notification>, ConsultationError>;

    async fn mark_notification_as_read(
        &self,
        notification_id: Uuid,
        auth_token: &str,
    ) -> Result<(), ConsultationError>;

    /// Consistency sweep: writes the decision notification for any answered
    /// request that lacks one. Returns how many were written.
    async fn check_for_request_updates(
        &self,
        patient_id: Uuid,
        auth_token: &str,
    ) -> Result<usize, ConsultationError>;
}

pub struct SupabaseNotificationFeed {
    supabase: SupabaseClient,
}

impl SupabaseNotificationFeed {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }
}

#[async_trait]
impl NotificationFeed for SupabaseNotificationFeed {
    async fn fetch_patient_notifications(
        &self,
        patient_id: Uuid,
        auth_token: &str,
    ) -> Result<Vec<Notification>, ConsultationError> {
        let path = format!(
            "/rest/v1/notifications?recipient_patient_id=eq.{}&order=created_at.desc",
            patient_id
        );

        let rows: Vec<Value> = self.supabase.request(
            Method::GET,
            &path,
            Some(auth_token),
            None,
        ).await.map_err(|e| ConsultationError::Database(e.to_string()))?;

        let mut notifications = Vec::with_capacity(rows.len());
        for row in rows {
            match serde_json::from_value::<Notification>(row) {
                Ok(notification) => notifications.push(notification),
                Err(e) => warn!("Skipping malformed notification: {}", e),
            }
        }

        debug!("Fetched {} notifications for patient {}", notifications.len(), patient_id);
        Ok(notifications)
    }

    async fn mark_notification_as_read(
        &self,
        notification_id: Uuid,
        auth_token: &str,
    ) -> Result<(), ConsultationError> {
        let path = format!("/rest/v1/notifications?id=eq.{}", notification_id);

        let updated: Vec<Value> = self.supabase.request_with_headers(
            Method::PATCH,
            &path,
            Some(auth_token),
            Some(json!({
                "read": true,
                "read_at": Utc::now().to_rfc3339(),
            })),
            Some(SupabaseClient::return_representation()),
        ).await.map_err(|e| ConsultationError::Database(e.to_string()))?;

        if updated.is_empty() {
            return Err(ConsultationError::NotificationNotFound(notification_id));
        }

        debug!("Notification {} marked as read", notification_id);
        Ok(())
    }

    async fn check_for_request_updates(
        &self,
        patient_id: Uuid,
        auth_token: &str,
    ) -> Result<usize, ConsultationError> {
        let written: Value = self.supabase.rpc(
            "sync_consultation_notifications",
            Some(auth_token),
            json!({ "p_patient_id": patient_id }),
        ).await.map_err(|e| ConsultationError::Database(e.to_string()))?;

        let written = written.as_u64().unwrap_or(0) as usize;
        if written > 0 {
            debug!("Request sweep wrote {} notifications for patient {}", written, patient_id);
        }
        Ok(written)
    }
}
