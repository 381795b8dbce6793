// libs/consultation-cell/src/services/poller.rs
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, instrument, warn};

use crate::services::workflow::ConsultationWorkflow;

/// Periodic notification refresh for one mounted patient session.
pub struct NotificationPoller;

impl NotificationPoller {
    /// The first tick fires one full period after start; mount has already
    /// done the initial load.
    pub fn start(workflow: Arc<ConsultationWorkflow>, period: Duration) -> PollerHandle {
        let task = tokio::spawn(async move {
            let mut interval = interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                interval.tick().await;
                if !workflow.is_alive() {
                    debug!("Workflow for patient {} gone, poller exiting", workflow.patient_id());
                    break;
                }
                poll_once(&workflow).await;
            }
        });

        PollerHandle { task }
    }
}

#[instrument(skip(workflow), fields(patient_id = %workflow.patient_id()))]
async fn poll_once(workflow: &ConsultationWorkflow) {
    workflow.spawn_request_sweep().await;

    match workflow.refresh_notifications().await {
        Ok(snapshot) => debug!("Poll tick: {} unread notifications", snapshot.unread_count),
        Err(e) => warn!("Poll tick failed, will retry next interval: {}", e),
    }
}

/// Owns the polling task; stopping or dropping the handle ends it.
pub struct PollerHandle {
    task: JoinHandle<()>,
}

impl PollerHandle {
    pub fn stop(&self) {
        self.task.abort();
    }

    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }
}

impl Drop for PollerHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}
