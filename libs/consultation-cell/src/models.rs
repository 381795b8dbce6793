use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use doctor_cell::models::{ConsultationMode, DoctorProfile};

use crate::error::ConsultationError;

pub const MAX_MESSAGE_CHARS: usize = 2000;
pub const ACCEPTED_TOAST_DURATION_MS: u64 = 8000;
pub const DEFAULT_TOAST_DURATION_MS: u64 = 5000;
pub const TOAST_INBOX_CAPACITY: usize = 50;

// ==============================================================================
// CONSULTATION REQUESTS
// ==============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "kebab-case")]
pub enum RequestType {
    #[default]
    Consultation,
    FollowUp,
    SecondOpinion,
    Emergency,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum Urgency {
    Low,
    #[default]
    Medium,
    High,
    Emergency,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum RequestStatus {
    Pending,
    Accepted,
    Rejected,
}

impl RequestStatus {
    /// Pending and accepted requests block a new request to the same doctor.
    pub fn is_live(&self) -> bool {
        matches!(self, RequestStatus::Pending | RequestStatus::Accepted)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RequestStatus::Pending => "pending",
            RequestStatus::Accepted => "accepted",
            RequestStatus::Rejected => "rejected",
        }
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConsultationRequest {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub doctor_id: Uuid,
    #[serde(default)]
    pub request_type: RequestType,
    #[serde(default)]
    pub urgency: Urgency,
    #[serde(default)]
    pub preferred_mode: Option<ConsultationMode>,
    #[serde(default)]
    pub message: Option<String>,
    pub status: RequestStatus,
    pub requested_at: DateTime<Utc>,
    #[serde(default)]
    pub responded_at: Option<DateTime<Utc>>,
}

/// Submission payload for a new consultation request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewConsultationRequest {
    pub doctor_id: Uuid,
    #[serde(default)]
    pub request_type: RequestType,
    #[serde(default)]
    pub urgency: Urgency,
    #[serde(default)]
    pub preferred_mode: Option<ConsultationMode>,
    #[serde(default)]
    pub message: Option<String>,
}

impl NewConsultationRequest {
    /// Trims the message, drops it when blank and enforces the length cap.
    pub fn validated(mut self) -> Result<Self, ConsultationError> {
        self.message = self
            .message
            .map(|message| message.trim().to_string())
            .filter(|message| !message.is_empty());

        if let Some(message) = &self.message {
            if message.chars().count() > MAX_MESSAGE_CHARS {
                return Err(ConsultationError::Validation(format!(
                    "Message must be at most {} characters",
                    MAX_MESSAGE_CHARS
                )));
            }
        }

        Ok(self)
    }
}

/// Form opened by a successful `request_consultation`, prefilled with the
/// defaults the patient sees.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConsultationForm {
    pub doctor_id: Uuid,
    pub doctor_name: String,
    pub request_type: RequestType,
    pub urgency: Urgency,
    pub preferred_mode: Option<ConsultationMode>,
    pub message: Option<String>,
}

impl ConsultationForm {
    pub fn prefilled(doctor: &DoctorProfile) -> Self {
        Self {
            doctor_id: doctor.id,
            doctor_name: doctor.display_name(),
            request_type: RequestType::Consultation,
            urgency: Urgency::Medium,
            preferred_mode: None,
            message: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Decision {
    Accept,
    Reject,
}

impl Decision {
    pub fn target_status(&self) -> RequestStatus {
        match self {
            Decision::Accept => RequestStatus::Accepted,
            Decision::Reject => RequestStatus::Rejected,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct RespondToRequest {
    pub decision: Decision,
}

// ==============================================================================
// NOTIFICATIONS
// ==============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum NotificationType {
    ConsultationAccepted,
    ConsultationRejected,
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Notification {
    pub id: Uuid,
    pub recipient_patient_id: Uuid,
    #[serde(rename = "type")]
    pub notification_type: NotificationType,
    #[serde(default)]
    pub doctor_id: Option<Uuid>,
    #[serde(default)]
    pub request_id: Option<Uuid>,
    pub title: String,
    pub message: String,
    #[serde(default)]
    pub read: bool,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub read_at: Option<DateTime<Utc>>,
}

impl Notification {
    pub fn is_acceptance(&self) -> bool {
        self.notification_type == NotificationType::ConsultationAccepted
    }

    pub fn is_rejection(&self) -> bool {
        self.notification_type == NotificationType::ConsultationRejected
    }

    pub fn mark_read(&mut self, at: DateTime<Utc>) {
        self.read = true;
        self.read_at.get_or_insert(at);
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct NotificationSnapshot {
    pub notifications: Vec<Notification>,
    pub unread_count: usize,
}

// ==============================================================================
// PATIENT VIEW STATE
// ==============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum DoctorRowState {
    None,
    Requested,
    ChatUnlocked,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct DoctorListing {
    #[serde(flatten)]
    pub doctor: DoctorProfile,
    pub display_name: String,
    pub row_state: DoctorRowState,
    pub submitting: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatRoute {
    pub doctor_id: Uuid,
    pub path: String,
}

impl ChatRoute {
    pub fn for_doctor(doctor_id: Uuid) -> Self {
        Self {
            doctor_id,
            path: format!("/communication?chatId={}", doctor_id),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ToastVariant {
    #[default]
    Default,
    Destructive,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Toast {
    pub title: String,
    pub description: String,
    pub variant: ToastVariant,
    pub duration_ms: u64,
}

impl Toast {
    pub fn info(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            variant: ToastVariant::Default,
            duration_ms: DEFAULT_TOAST_DURATION_MS,
        }
    }

    pub fn error(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            variant: ToastVariant::Destructive,
            ..Self::info(title, description)
        }
    }

    pub fn with_duration(mut self, duration_ms: u64) -> Self {
        self.duration_ms = duration_ms;
        self
    }
}

/// Everything the workflow surfaces to a mounted patient session.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ConsultationEvent {
    Toast(Toast),
    RequestSubmitted { doctor_id: Uuid, request_id: Uuid },
    ChatUnlocked { doctor_id: Uuid },
    NotificationsUpdated { unread_count: usize },
}
