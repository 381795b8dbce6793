// libs/consultation-cell/src/services/workflow.rs
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use chrono::Utc;
use tokio::sync::{broadcast, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use doctor_cell::models::DoctorProfile;
use doctor_cell::services::DoctorDirectory;

use crate::error::ConsultationError;
use crate::models::{
    ChatRoute, ConsultationEvent, ConsultationForm, DoctorListing, NewConsultationRequest,
    Notification, NotificationSnapshot, NotificationType, Toast, ACCEPTED_TOAST_DURATION_MS,
    TOAST_INBOX_CAPACITY,
};
use crate::services::feed::NotificationFeed;
use crate::services::ledger::RequestLedger;
use crate::services::lifecycle::{chat_unlocked_doctors, live_requests_by_doctor, row_state};
use crate::state::ConsultationServices;

#[derive(Default)]
struct WorkflowState {
    auth_token: String,
    doctors: Vec<DoctorProfile>,
    /// Doctor id to the live request that put the doctor here.
    requested: HashMap<Uuid, Uuid>,
    chat_unlocked: HashSet<Uuid>,
    notifications: Vec<Notification>,
    seen_notification_ids: HashSet<Uuid>,
    submitting: HashSet<Uuid>,
    loading_doctors: bool,
    open_form: Option<ConsultationForm>,
    toasts: VecDeque<Toast>,
}

impl WorkflowState {
    fn doctor(&self, doctor_id: Uuid) -> Result<DoctorProfile, ConsultationError> {
        self.doctors
            .iter()
            .find(|d| d.id == doctor_id)
            .cloned()
            .ok_or(ConsultationError::DoctorNotFound(doctor_id))
    }

    /// Frees the doctor only when the rejection names the tracked request.
    /// A rejection without a request id cannot be told apart from one for an
    /// older request; the next load re-derives the set from the ledger.
    fn release_rejected(&mut self, doctor_id: Uuid, request_id: Option<Uuid>) {
        let Some(request_id) = request_id else {
            return;
        };
        if self.requested.get(&doctor_id) == Some(&request_id) {
            self.requested.remove(&doctor_id);
        }
    }
}

/// Per-patient consultation controller. Holds the view state the patient
/// dashboard renders and drives it from the ledger and the feed.
///
/// State is never locked across a store call. Once `shut_down` has run,
/// results that arrive late are dropped rather than applied.
pub struct ConsultationWorkflow {
    patient_id: Uuid,
    directory: Arc<dyn DoctorDirectory>,
    ledger: Arc<dyn RequestLedger>,
    feed: Arc<dyn NotificationFeed>,
    refetch_delay: Duration,
    state: RwLock<WorkflowState>,
    alive: AtomicBool,
    events: broadcast::Sender<ConsultationEvent>,
}

impl ConsultationWorkflow {
    pub fn new(
        patient_id: Uuid,
        auth_token: String,
        services: &ConsultationServices,
        refetch_delay: Duration,
    ) -> Self {
        let (events, _) = broadcast::channel(64);

        Self {
            patient_id,
            directory: services.directory.clone(),
            ledger: services.ledger.clone(),
            feed: services.feed.clone(),
            refetch_delay,
            state: RwLock::new(WorkflowState {
                auth_token,
                ..Default::default()
            }),
            alive: AtomicBool::new(true),
            events,
        }
    }

    pub fn patient_id(&self) -> Uuid {
        self.patient_id
    }

    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }

    pub fn shut_down(&self) {
        self.alive.store(false, Ordering::SeqCst);
        debug!("Consultation workflow for patient {} shut down", self.patient_id);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ConsultationEvent> {
        self.events.subscribe()
    }

    pub async fn set_auth_token(&self, auth_token: String) {
        self.state.write().await.auth_token = auth_token;
    }

    async fn auth_token(&self) -> String {
        self.state.read().await.auth_token.clone()
    }

    // ==========================================================================
    // DOCTOR LISTING
    // ==========================================================================

    /// Fetches doctors and the patient's requests together and rebuilds the
    /// requested and chat-unlocked sets from them. On failure the previous
    /// state stays as it was.
    pub async fn load_doctors(&self) -> Result<Vec<DoctorProfile>, ConsultationError> {
        let token = {
            let mut state = self.state.write().await;
            state.loading_doctors = true;
            state.auth_token.clone()
        };

        let (doctors, requests) = tokio::join!(
            self.directory.fetch_doctors(&token),
            self.ledger.list_patient_requests(self.patient_id, &token),
        );

        let mut guard = self.state.write().await;
        let state = &mut *guard;
        state.loading_doctors = false;

        if !self.is_alive() {
            debug!("Discarding doctor load for unmounted patient {}", self.patient_id);
            return Err(ConsultationError::SessionNotFound(self.patient_id));
        }

        let (doctors, requests) = match (doctors, requests) {
            (Ok(doctors), Ok(requests)) => (doctors, requests),
            (Err(e), _) => return Err(self.load_failed(state, e.to_string())),
            (_, Err(e)) => return Err(self.load_failed(state, e.to_string())),
        };

        state.requested = live_requests_by_doctor(&requests);
        state.chat_unlocked = chat_unlocked_doctors(&requests, &state.notifications);
        state.doctors = doctors.clone();

        info!(
            "Loaded {} doctors for patient {} ({} requested, {} chat unlocked)",
            doctors.len(),
            self.patient_id,
            state.requested.len(),
            state.chat_unlocked.len()
        );
        Ok(doctors)
    }

    fn load_failed(&self, state: &mut WorkflowState, reason: String) -> ConsultationError {
        warn!("Failed to load doctors for patient {}: {}", self.patient_id, reason);
        self.record_toast(state, Toast::error("Error", "Failed to load doctors. Please try again."));
        ConsultationError::FetchFailure(reason)
    }

    pub async fn doctors(&self) -> Vec<DoctorProfile> {
        self.state.read().await.doctors.clone()
    }

    pub async fn is_loading_doctors(&self) -> bool {
        self.state.read().await.loading_doctors
    }

    /// Rows as the patient sees them, in the order given.
    pub async fn doctor_listings(&self, doctors: &[DoctorProfile]) -> Vec<DoctorListing> {
        let state = self.state.read().await;

        doctors
            .iter()
            .map(|doctor| DoctorListing {
                doctor: doctor.clone(),
                display_name: doctor.display_name(),
                row_state: row_state(doctor.id, &state.requested, &state.chat_unlocked),
                submitting: state.submitting.contains(&doctor.id),
            })
            .collect()
    }

    pub async fn is_requested(&self, doctor_id: Uuid) -> bool {
        self.state.read().await.requested.contains_key(&doctor_id)
    }

    pub async fn is_chat_unlocked(&self, doctor_id: Uuid) -> bool {
        self.state.read().await.chat_unlocked.contains(&doctor_id)
    }

    pub async fn is_submitting(&self, doctor_id: Uuid) -> bool {
        self.state.read().await.submitting.contains(&doctor_id)
    }

    // ==========================================================================
    // REQUESTS
    // ==========================================================================

    /// Opens the request form for a doctor unless a live request already
    /// exists. The existence check and the later submission are separate
    /// round-trips; two clients can still both pass the check.
    pub async fn request_consultation(&self, doctor_id: Uuid) -> Result<ConsultationForm, ConsultationError> {
        let (token, doctor, already_requested) = {
            let state = self.state.read().await;
            let doctor = state.doctor(doctor_id)?;
            (state.auth_token.clone(), doctor, state.requested.contains_key(&doctor_id))
        };

        if already_requested {
            let mut state = self.state.write().await;
            return Err(self.duplicate_request(&mut state, &doctor));
        }

        let existing = self.ledger.has_live_request(self.patient_id, doctor_id, &token).await;

        let mut guard = self.state.write().await;
        let state = &mut *guard;

        if !self.is_alive() {
            return Err(ConsultationError::SessionNotFound(self.patient_id));
        }

        match existing {
            Ok(true) => Err(self.duplicate_request(state, &doctor)),
            Ok(false) => {
                let form = ConsultationForm::prefilled(&doctor);
                state.open_form = Some(form.clone());
                debug!("Opened consultation form for doctor {}", doctor_id);
                Ok(form)
            }
            Err(e) => {
                warn!("Existing request check failed for doctor {}: {}", doctor_id, e);
                self.record_toast(state, Toast::error("Error", "Could not check request status. Try again."));
                Err(ConsultationError::FetchFailure(e.to_string()))
            }
        }
    }

    fn duplicate_request(&self, state: &mut WorkflowState, doctor: &DoctorProfile) -> ConsultationError {
        debug!("Patient {} already has a live request with doctor {}", self.patient_id, doctor.id);
        self.record_toast(
            state,
            Toast::error(
                "Request Already Sent",
                format!("You already have a pending request with {}.", doctor.display_name()),
            ),
        );
        ConsultationError::DuplicateRequest { doctor_id: doctor.id }
    }

    pub async fn open_form(&self) -> Option<ConsultationForm> {
        self.state.read().await.open_form.clone()
    }

    pub async fn close_form(&self) {
        self.state.write().await.open_form = None;
    }

    /// Writes a pending request. A failed write leaves everything but the
    /// toast inbox untouched and keeps the form open.
    pub async fn submit_consultation_request(
        self: &Arc<Self>,
        data: NewConsultationRequest,
    ) -> Result<Uuid, ConsultationError> {
        let data = data.validated()?;
        let doctor_id = data.doctor_id;

        let (token, doctor_name) = {
            let mut guard = self.state.write().await;
            let state = &mut *guard;
            let doctor = state.doctor(doctor_id)?;

            if state.requested.contains_key(&doctor_id) {
                return Err(self.duplicate_request(state, &doctor));
            }
            if !state.submitting.insert(doctor_id) {
                return Err(ConsultationError::Validation(
                    "A request to this doctor is already being sent".to_string(),
                ));
            }

            (state.auth_token.clone(), doctor.display_name())
        };

        let result = self.ledger.create_request(self.patient_id, &data, &token).await;

        let mut guard = self.state.write().await;
        let state = &mut *guard;
        state.submitting.remove(&doctor_id);

        let request_id = match result {
            Ok(request_id) => request_id,
            Err(e) => {
                warn!("Consultation request to doctor {} failed: {}", doctor_id, e);
                self.record_toast(
                    state,
                    Toast::error("Request Failed", "Failed to send consultation request. Please try again."),
                );
                return Err(ConsultationError::SubmissionFailure(e.to_string()));
            }
        };

        if !self.is_alive() {
            debug!("Request {} stored after unmount, not applied", request_id);
            return Ok(request_id);
        }

        state.requested.insert(doctor_id, request_id);
        state.open_form = None;
        self.record_toast(
            state,
            Toast::info(
                "Request Sent Successfully",
                format!(
                    "Your consultation request has been sent to {}. You'll receive a response within 24 hours.",
                    doctor_name
                ),
            ),
        );
        self.emit(ConsultationEvent::RequestSubmitted { doctor_id, request_id });
        drop(guard);

        info!("Patient {} requested consultation {} with doctor {}", self.patient_id, request_id, doctor_id);
        self.schedule_notification_refetch();
        Ok(request_id)
    }

    fn schedule_notification_refetch(self: &Arc<Self>) {
        let workflow: Weak<Self> = Arc::downgrade(self);
        let delay = self.refetch_delay;

        tokio::spawn(async move {
            tokio::time::sleep(delay).await;

            let Some(workflow) = workflow.upgrade() else {
                return;
            };
            if !workflow.is_alive() {
                return;
            }
            if let Err(e) = workflow.refresh_notifications().await {
                warn!("Follow-up notification refresh failed: {}", e);
            }
        });
    }

    // ==========================================================================
    // NOTIFICATIONS
    // ==========================================================================

    /// Re-reads the feed and diffs it by notification id. Each acceptance
    /// seen for the first time while unread is toasted, marked read and
    /// unlocks chat exactly once.
    pub async fn refresh_notifications(&self) -> Result<NotificationSnapshot, ConsultationError> {
        let token = self.auth_token().await;

        let fetched = self.feed
            .fetch_patient_notifications(self.patient_id, &token)
            .await
            .map_err(|e| {
                warn!("Failed to load notifications for patient {}: {}", self.patient_id, e);
                ConsultationError::FetchFailure(e.to_string())
            })?;

        if !self.is_alive() {
            debug!("Discarding notifications for unmounted patient {}", self.patient_id);
            return Err(ConsultationError::SessionNotFound(self.patient_id));
        }

        let newly_accepted = {
            let mut guard = self.state.write().await;
            let state = &mut *guard;
            let mut newly_accepted = Vec::new();

            for notification in &fetched {
                if !state.seen_notification_ids.insert(notification.id) {
                    continue;
                }
                match notification.notification_type {
                    NotificationType::ConsultationAccepted if !notification.read => {
                        newly_accepted.push(notification.clone());
                    }
                    NotificationType::ConsultationRejected => {
                        if let Some(doctor_id) = notification.doctor_id {
                            state.release_rejected(doctor_id, notification.request_id);
                        }
                    }
                    _ => {}
                }
            }

            state.chat_unlocked.extend(
                fetched.iter().filter(|n| n.is_acceptance()).filter_map(|n| n.doctor_id),
            );
            state.notifications = fetched;
            newly_accepted
        };

        for notification in newly_accepted {
            let marked = self.feed.mark_notification_as_read(notification.id, &token).await;

            let mut guard = self.state.write().await;
            let state = &mut *guard;

            self.record_toast(
                state,
                Toast::info(notification.title.clone(), notification.message.clone())
                    .with_duration(ACCEPTED_TOAST_DURATION_MS),
            );
            if let Some(doctor_id) = notification.doctor_id {
                info!("Chat unlocked for patient {} with doctor {}", self.patient_id, doctor_id);
                self.emit(ConsultationEvent::ChatUnlocked { doctor_id });
            }

            match marked {
                Ok(()) => {
                    if let Some(local) = state.notifications.iter_mut().find(|n| n.id == notification.id) {
                        local.mark_read(Utc::now());
                    }
                }
                Err(e) => warn!("Failed to mark notification {} as read: {}", notification.id, e),
            }
        }

        let snapshot = self.notifications().await;
        self.emit(ConsultationEvent::NotificationsUpdated {
            unread_count: snapshot.unread_count,
        });
        Ok(snapshot)
    }

    pub async fn notifications(&self) -> NotificationSnapshot {
        let state = self.state.read().await;
        NotificationSnapshot {
            notifications: state.notifications.clone(),
            unread_count: state.notifications.iter().filter(|n| !n.read).count(),
        }
    }

    /// Click on a notification: mark it read and, for an acceptance, hand
    /// back the chat route.
    pub async fn open_notification(&self, notification_id: Uuid) -> Result<Option<ChatRoute>, ConsultationError> {
        let (token, notification) = {
            let state = self.state.read().await;
            let notification = state.notifications
                .iter()
                .find(|n| n.id == notification_id)
                .cloned()
                .ok_or(ConsultationError::NotificationNotFound(notification_id))?;
            (state.auth_token.clone(), notification)
        };

        if !notification.read {
            self.feed
                .mark_notification_as_read(notification_id, &token)
                .await
                .map_err(|e| ConsultationError::FetchFailure(e.to_string()))?;
        }

        let mut guard = self.state.write().await;
        let state = &mut *guard;

        if let Some(local) = state.notifications.iter_mut().find(|n| n.id == notification_id) {
            local.mark_read(Utc::now());
        }
        let unread_count = state.notifications.iter().filter(|n| !n.read).count();
        self.emit(ConsultationEvent::NotificationsUpdated { unread_count });

        match (notification.is_acceptance(), notification.doctor_id) {
            (true, Some(doctor_id)) => {
                state.chat_unlocked.insert(doctor_id);
                Ok(Some(ChatRoute::for_doctor(doctor_id)))
            }
            _ => Ok(None),
        }
    }

    /// Fire-and-forget consistency sweep on the feed.
    pub async fn spawn_request_sweep(&self) -> JoinHandle<()> {
        let feed = self.feed.clone();
        let patient_id = self.patient_id;
        let token = self.auth_token().await;

        tokio::spawn(async move {
            match feed.check_for_request_updates(patient_id, &token).await {
                Ok(written) => debug!("Request sweep for patient {} wrote {} notifications", patient_id, written),
                Err(e) => warn!("Request sweep for patient {} failed: {}", patient_id, e),
            }
        })
    }

    // ==========================================================================
    // CHAT
    // ==========================================================================

    pub async fn open_chat(&self, doctor_id: Uuid) -> Result<ChatRoute, ConsultationError> {
        if self.is_chat_unlocked(doctor_id).await {
            Ok(ChatRoute::for_doctor(doctor_id))
        } else {
            Err(ConsultationError::ChatLocked(doctor_id))
        }
    }

    // ==========================================================================
    // TOASTS
    // ==========================================================================

    pub async fn drain_toasts(&self) -> Vec<Toast> {
        self.state.write().await.toasts.drain(..).collect()
    }

    pub async fn record_search_failure(&self, reason: &str) {
        if !self.is_alive() {
            return;
        }
        warn!("Doctor search failed for patient {}: {}", self.patient_id, reason);
        let mut state = self.state.write().await;
        self.record_toast(&mut state, Toast::error("Search Error", "Failed to search doctors. Please try again."));
    }

    fn record_toast(&self, state: &mut WorkflowState, toast: Toast) {
        if state.toasts.len() == TOAST_INBOX_CAPACITY {
            state.toasts.pop_front();
        }
        state.toasts.push_back(toast.clone());
        self.emit(ConsultationEvent::Toast(toast));
    }

    fn emit(&self, event: ConsultationEvent) {
        // No subscribers is the normal case outside of tests.
        let _ = self.events.send(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    use doctor_cell::models::VerificationStatus;
    use doctor_cell::services::StaticDoctorDirectory;

    use crate::models::{RequestType, ToastVariant, Urgency};
    use crate::services::feed::MockNotificationFeed;
    use crate::services::ledger::MockRequestLedger;

    fn doctor(name: &str) -> DoctorProfile {
        DoctorProfile {
            id: Uuid::new_v4(),
            name: name.to_string(),
            clinic_name: None,
            clinic_address: None,
            specializations: vec!["Prenatal Care".to_string()],
            years_of_experience: 10,
            consultation_modes: vec![],
            consultation_fee: None,
            rating: Some(4.6),
            verification_status: VerificationStatus::Verified,
            languages: vec![],
            qualifications: vec![],
        }
    }

    fn workflow(
        doctors: Vec<DoctorProfile>,
        ledger: MockRequestLedger,
        feed: MockNotificationFeed,
    ) -> Arc<ConsultationWorkflow> {
        let services = ConsultationServices::new(
            Arc::new(StaticDoctorDirectory::new(doctors)),
            Arc::new(ledger),
            Arc::new(feed),
        );
        Arc::new(ConsultationWorkflow::new(
            Uuid::new_v4(),
            "patient-token".to_string(),
            &services,
            Duration::from_millis(1000),
        ))
    }

    fn accepted_notification(doctor_id: Uuid) -> Notification {
        Notification {
            id: Uuid::new_v4(),
            recipient_patient_id: Uuid::new_v4(),
            notification_type: NotificationType::ConsultationAccepted,
            doctor_id: Some(doctor_id),
            request_id: None,
            title: "Consultation Request Accepted".to_string(),
            message: "Dr. Asha Verma has accepted your consultation request.".to_string(),
            read: false,
            created_at: Utc::now(),
            read_at: None,
        }
    }

    #[tokio::test]
    async fn test_failed_existence_check_does_not_open_form() {
        let asha = doctor("Asha Verma");
        let mut ledger = MockRequestLedger::new();
        ledger.expect_list_patient_requests().returning(|_, _| Ok(vec![]));
        ledger
            .expect_has_live_request()
            .times(1)
            .returning(|_, _, _| Err(ConsultationError::Database("connection reset".into())));

        let workflow = workflow(vec![asha.clone()], ledger, MockNotificationFeed::new());
        workflow.load_doctors().await.unwrap();

        let result = workflow.request_consultation(asha.id).await;

        assert!(matches!(result, Err(ConsultationError::FetchFailure(_))));
        assert!(workflow.open_form().await.is_none());

        let toasts = workflow.drain_toasts().await;
        assert_eq!(toasts.len(), 1);
        assert_eq!(toasts[0].description, "Could not check request status. Try again.");
        assert_eq!(toasts[0].variant, ToastVariant::Destructive);
    }

    #[tokio::test]
    async fn test_ledger_hit_reports_duplicate_with_doctor_name() {
        let asha = doctor("Asha Verma");
        let mut ledger = MockRequestLedger::new();
        ledger.expect_list_patient_requests().returning(|_, _| Ok(vec![]));
        ledger.expect_has_live_request().returning(|_, _, _| Ok(true));

        let workflow = workflow(vec![asha.clone()], ledger, MockNotificationFeed::new());
        workflow.load_doctors().await.unwrap();

        let result = workflow.request_consultation(asha.id).await;

        assert!(matches!(result, Err(ConsultationError::DuplicateRequest { doctor_id }) if doctor_id == asha.id));
        let toasts = workflow.drain_toasts().await;
        assert_eq!(toasts[0].title, "Request Already Sent");
        assert_eq!(toasts[0].description, "You already have a pending request with Dr. Asha Verma.");
    }

    #[tokio::test]
    async fn test_failed_submission_keeps_form_open() {
        let asha = doctor("Asha Verma");
        let mut ledger = MockRequestLedger::new();
        ledger.expect_list_patient_requests().returning(|_, _| Ok(vec![]));
        ledger.expect_has_live_request().returning(|_, _, _| Ok(false));
        ledger
            .expect_create_request()
            .times(1)
            .returning(|_, _, _| Err(ConsultationError::Database("insert failed".into())));

        let workflow = workflow(vec![asha.clone()], ledger, MockNotificationFeed::new());
        workflow.load_doctors().await.unwrap();
        let form = workflow.request_consultation(asha.id).await.unwrap();
        assert_eq!(form.request_type, RequestType::Consultation);
        assert_eq!(form.urgency, Urgency::Medium);

        let result = workflow.submit_consultation_request(NewConsultationRequest {
            doctor_id: asha.id,
            request_type: form.request_type,
            urgency: form.urgency,
            preferred_mode: None,
            message: Some("Morning sickness".to_string()),
        }).await;

        assert!(matches!(result, Err(ConsultationError::SubmissionFailure(_))));
        assert_eq!(workflow.open_form().await, Some(form));
        assert!(!workflow.is_submitting(asha.id).await);
        assert!(!workflow.is_requested(asha.id).await);

        let toasts = workflow.drain_toasts().await;
        assert_eq!(toasts.last().unwrap().title, "Request Failed");
    }

    #[tokio::test]
    async fn test_failed_reload_keeps_previous_state() {
        let asha = doctor("Asha Verma");
        let calls = AtomicUsize::new(0);
        let mut ledger = MockRequestLedger::new();
        ledger.expect_list_patient_requests().returning(move |_, _| {
            if calls.fetch_add(1, Ordering::SeqCst) == 0 {
                Ok(vec![])
            } else {
                Err(ConsultationError::Database("timeout".into()))
            }
        });

        let workflow = workflow(vec![asha.clone()], ledger, MockNotificationFeed::new());
        workflow.load_doctors().await.unwrap();

        let result = workflow.load_doctors().await;

        assert!(matches!(result, Err(ConsultationError::FetchFailure(_))));
        assert_eq!(workflow.doctors().await, vec![asha]);
        assert!(!workflow.is_loading_doctors().await);
        assert_eq!(workflow.drain_toasts().await[0].description, "Failed to load doctors. Please try again.");
    }

    #[tokio::test]
    async fn test_acceptance_toasts_once_even_if_mark_read_fails() {
        let doctor_id = Uuid::new_v4();
        let notification = accepted_notification(doctor_id);
        let served = notification.clone();

        let mut feed = MockNotificationFeed::new();
        feed.expect_fetch_patient_notifications()
            .times(2)
            .returning(move |_, _| Ok(vec![served.clone()]));
        feed.expect_mark_notification_as_read()
            .times(1)
            .returning(|_, _| Err(ConsultationError::Database("write timeout".into())));

        let workflow = workflow(vec![], MockRequestLedger::new(), feed);

        let first = workflow.refresh_notifications().await.unwrap();
        let second = workflow.refresh_notifications().await.unwrap();

        assert_eq!(first.unread_count, 1);
        assert_eq!(second.unread_count, 1);
        assert!(workflow.is_chat_unlocked(doctor_id).await);

        let toasts = workflow.drain_toasts().await;
        assert_eq!(toasts.len(), 1);
        assert_eq!(toasts[0].title, notification.title);
        assert_eq!(toasts[0].duration_ms, ACCEPTED_TOAST_DURATION_MS);
    }

    #[tokio::test]
    async fn test_toast_inbox_is_bounded() {
        let workflow = workflow(vec![], MockRequestLedger::new(), MockNotificationFeed::new());

        {
            let mut state = workflow.state.write().await;
            for i in 0..(TOAST_INBOX_CAPACITY + 5) {
                workflow.record_toast(&mut state, Toast::info(format!("toast {}", i), ""));
            }
        }

        let toasts = workflow.drain_toasts().await;
        assert_eq!(toasts.len(), TOAST_INBOX_CAPACITY);
        assert_eq!(toasts[0].title, "toast 5");
        assert!(workflow.drain_toasts().await.is_empty());
    }
}
