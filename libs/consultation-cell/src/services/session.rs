// libs/consultation-cell/src/services/session.rs
use std::collections::HashMap;
use std::sync::{Arc, Weak};
use std::time::Duration;

use tokio::sync::{broadcast, RwLock};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};
use uuid::Uuid;

use doctor_cell::models::{DoctorProfile, DoctorQuery};
use doctor_cell::services::{DebouncedDoctorSearch, DoctorFilterEngine};
use shared_config::AppConfig;

use crate::error::ConsultationError;
use crate::models::DoctorListing;
use crate::services::poller::{NotificationPoller, PollerHandle};
use crate::services::workflow::ConsultationWorkflow;
use crate::state::ConsultationServices;

#[derive(Debug, Clone, Copy)]
pub struct SessionTimings {
    pub poll_interval: Duration,
    pub refetch_delay: Duration,
    pub search_debounce: Duration,
    pub idle_timeout: Duration,
}

impl SessionTimings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            poll_interval: config.poll_interval(),
            refetch_delay: config.refetch_delay(),
            search_debounce: config.search_debounce(),
            idle_timeout: config.session_idle_timeout(),
        }
    }
}

/// A mounted patient dashboard: the workflow plus the background tasks that
/// keep it fresh.
pub struct ConsultationSession {
    workflow: Arc<ConsultationWorkflow>,
    engine: Arc<DoctorFilterEngine>,
    search: DebouncedDoctorSearch,
    search_failures: JoinHandle<()>,
    poller: PollerHandle,
    last_active: RwLock<Instant>,
}

impl std::fmt::Debug for ConsultationSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConsultationSession").finish_non_exhaustive()
    }
}

impl ConsultationSession {
    /// Initial load of doctors and notifications, then polling and the
    /// debounced search. Load failures are tolerated; the poller keeps
    /// trying and the toast inbox carries the error.
    pub async fn mount(
        patient_id: Uuid,
        auth_token: String,
        services: &ConsultationServices,
        timings: SessionTimings,
    ) -> Self {
        let workflow = Arc::new(ConsultationWorkflow::new(
            patient_id,
            auth_token.clone(),
            services,
            timings.refetch_delay,
        ));

        if let Err(e) = workflow.load_doctors().await {
            warn!("Initial doctor load failed for patient {}: {}", patient_id, e);
        }
        if let Err(e) = workflow.refresh_notifications().await {
            warn!("Initial notification load failed for patient {}: {}", patient_id, e);
        }

        let engine = Arc::new(DoctorFilterEngine::new(services.directory.clone()));
        let search = DebouncedDoctorSearch::spawn(engine.clone(), timings.search_debounce, auth_token);
        search.set_doctors(workflow.doctors().await);
        let search_failures = forward_search_failures(search.failures(), workflow.clone());

        let poller = NotificationPoller::start(workflow.clone(), timings.poll_interval);

        info!("Consultation session mounted for patient {}", patient_id);
        Self {
            workflow,
            engine,
            search,
            search_failures,
            poller,
            last_active: RwLock::new(Instant::now()),
        }
    }

    pub fn workflow(&self) -> &Arc<ConsultationWorkflow> {
        &self.workflow
    }

    /// Keeps the stored token current for background work.
    pub async fn touch(&self, auth_token: &str) {
        self.workflow.set_auth_token(auth_token.to_string()).await;
        self.search.set_auth_token(auth_token.to_string());
        self.mark_active().await;
    }

    pub async fn mark_active(&self) {
        *self.last_active.write().await = Instant::now();
    }

    pub async fn idle_for(&self) -> Duration {
        self.last_active.read().await.elapsed()
    }

    /// Reloads the directory and republishes it to the debounced search.
    pub async fn reload_doctors(&self) -> Result<Vec<DoctorProfile>, ConsultationError> {
        let doctors = self.workflow.load_doctors().await?;
        self.search.set_doctors(doctors.clone());
        Ok(doctors)
    }

    pub fn set_query(&self, query: DoctorQuery) {
        self.search.set_query(query);
    }

    pub fn query(&self) -> DoctorQuery {
        self.search.query()
    }

    /// Latest debounced result with row states.
    pub async fn listings(&self) -> Vec<DoctorListing> {
        let doctors = self.search.latest();
        self.workflow.doctor_listings(&doctors).await
    }

    /// Filters right away, bypassing the debounce.
    pub async fn filter_now(&self, query: &DoctorQuery, auth_token: &str) -> Result<Vec<DoctorListing>, ConsultationError> {
        let doctors = self.workflow.doctors().await;
        let filtered = match self.engine.apply(&doctors, query, auth_token).await {
            Ok(filtered) => filtered,
            Err(e) => {
                self.workflow.record_search_failure(&e.to_string()).await;
                return Err(ConsultationError::FetchFailure(e.to_string()));
            }
        };
        Ok(self.workflow.doctor_listings(&filtered).await)
    }

    pub fn is_polling(&self) -> bool {
        self.poller.is_running()
    }

    pub fn unmount(&self) {
        self.poller.stop();
        self.search.stop();
        self.search_failures.abort();
        self.workflow.shut_down();
        info!("Consultation session unmounted for patient {}", self.workflow.patient_id());
    }
}

impl Drop for ConsultationSession {
    fn drop(&mut self) {
        self.search_failures.abort();
        self.workflow.shut_down();
    }
}

fn forward_search_failures(
    mut failures: broadcast::Receiver<String>,
    workflow: Arc<ConsultationWorkflow>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match failures.recv().await {
                Ok(reason) => workflow.record_search_failure(&reason).await,
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    debug!("Skipped {} search failures for patient {}", skipped, workflow.patient_id());
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    })
}

/// One live session per patient. Sessions nobody has touched for the idle
/// timeout are unmounted by `evict_idle`.
pub struct SessionRegistry {
    services: ConsultationServices,
    timings: SessionTimings,
    sessions: RwLock<HashMap<Uuid, Arc<ConsultationSession>>>,
}

impl SessionRegistry {
    pub fn new(services: ConsultationServices, config: &AppConfig) -> Self {
        Self::with_timings(services, SessionTimings::from_config(config))
    }

    pub fn with_timings(services: ConsultationServices, timings: SessionTimings) -> Self {
        Self {
            services,
            timings,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Mounts a fresh session, unmounting any previous one for the patient.
    pub async fn mount(&self, patient_id: Uuid, auth_token: &str) -> Arc<ConsultationSession> {
        let session = Arc::new(
            ConsultationSession::mount(patient_id, auth_token.to_string(), &self.services, self.timings).await,
        );

        let previous = self.sessions.write().await.insert(patient_id, session.clone());
        if let Some(previous) = previous {
            debug!("Replacing existing session for patient {}", patient_id);
            previous.unmount();
        }

        session
    }

    /// Looks up a session and counts the lookup as patient activity.
    pub async fn get(&self, patient_id: Uuid) -> Result<Arc<ConsultationSession>, ConsultationError> {
        let session = self.sessions
            .read()
            .await
            .get(&patient_id)
            .cloned()
            .ok_or(ConsultationError::SessionNotFound(patient_id))?;

        session.mark_active().await;
        Ok(session)
    }

    /// Existing session with a refreshed token, or a newly mounted one.
    pub async fn get_or_mount(&self, patient_id: Uuid, auth_token: &str) -> Arc<ConsultationSession> {
        match self.get(patient_id).await {
            Ok(session) => {
                session.touch(auth_token).await;
                session
            }
            Err(_) => self.mount(patient_id, auth_token).await,
        }
    }

    pub async fn unmount(&self, patient_id: Uuid) -> Result<(), ConsultationError> {
        let session = self.sessions
            .write()
            .await
            .remove(&patient_id)
            .ok_or(ConsultationError::SessionNotFound(patient_id))?;

        session.unmount();
        Ok(())
    }

    pub async fn active_sessions(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Unmounts every session idle for at least the timeout. Returns how
    /// many were removed.
    pub async fn evict_idle(&self) -> usize {
        let mut sessions = self.sessions.write().await;

        let mut idle = Vec::new();
        for (patient_id, session) in sessions.iter() {
            if session.idle_for().await >= self.timings.idle_timeout {
                idle.push(*patient_id);
            }
        }

        for patient_id in &idle {
            if let Some(session) = sessions.remove(patient_id) {
                info!("Evicting idle consultation session for patient {}", patient_id);
                session.unmount();
            }
        }

        idle.len()
    }

    /// Periodic `evict_idle`. The task ends once the registry is dropped.
    pub fn spawn_idle_sweep(registry: &Arc<Self>) -> JoinHandle<()> {
        let period = (registry.timings.idle_timeout / 2).max(Duration::from_secs(1));
        let registry: Weak<Self> = Arc::downgrade(registry);

        tokio::spawn(async move {
            let mut interval = interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                interval.tick().await;
                let Some(registry) = registry.upgrade() else {
                    break;
                };
                let evicted = registry.evict_idle().await;
                if evicted > 0 {
                    debug!("Idle sweep unmounted {} sessions", evicted);
                }
            }
        })
    }
}
