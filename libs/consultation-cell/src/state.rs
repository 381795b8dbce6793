use std::sync::Arc;

use tracing::info;

use doctor_cell::services::{DoctorDirectory, SupabaseDoctorDirectory};
use shared_config::{AppConfig, StoreBackend};

use crate::services::feed::{NotificationFeed, SupabaseNotificationFeed};
use crate::services::in_memory::InMemoryConsultationStore;
use crate::services::ledger::{RequestLedger, SupabaseRequestLedger};
use crate::services::session::SessionRegistry;

/// The three store seams a patient workflow talks to.
#[derive(Clone)]
pub struct ConsultationServices {
    pub directory: Arc<dyn DoctorDirectory>,
    pub ledger: Arc<dyn RequestLedger>,
    pub feed: Arc<dyn NotificationFeed>,
}

impl ConsultationServices {
    pub fn new(
        directory: Arc<dyn DoctorDirectory>,
        ledger: Arc<dyn RequestLedger>,
        feed: Arc<dyn NotificationFeed>,
    ) -> Self {
        Self { directory, ledger, feed }
    }

    /// Doctor profiles always come from Supabase; requests and notifications
    /// follow `STORE_BACKEND`.
    pub fn from_config(config: &AppConfig) -> Self {
        let directory: Arc<dyn DoctorDirectory> = Arc::new(SupabaseDoctorDirectory::new(config));

        match config.store_backend {
            StoreBackend::Supabase => {
                info!("Using Supabase consultation store");
                Self::new(
                    directory,
                    Arc::new(SupabaseRequestLedger::new(config)),
                    Arc::new(SupabaseNotificationFeed::new(config)),
                )
            }
            StoreBackend::Memory => {
                info!("Using in-memory consultation store");
                let store = Arc::new(InMemoryConsultationStore::new());
                Self::new(directory, store.clone(), store)
            }
        }
    }
}

#[derive(Clone)]
pub struct ConsultationCellState {
    pub config: Arc<AppConfig>,
    pub services: ConsultationServices,
    pub sessions: Arc<SessionRegistry>,
}

impl ConsultationCellState {
    pub fn new(config: Arc<AppConfig>, services: ConsultationServices) -> Self {
        let sessions = Arc::new(SessionRegistry::new(services.clone(), &config));
        SessionRegistry::spawn_idle_sweep(&sessions);
        Self {
            config,
            services,
            sessions,
        }
    }
}
