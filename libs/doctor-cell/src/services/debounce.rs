// libs/doctor-cell/src/services/debounce.rs
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::models::{DoctorProfile, DoctorQuery};
use crate::services::filter::DoctorFilterEngine;

type Results = Arc<Vec<DoctorProfile>>;

#[derive(Clone)]
struct SearchInput {
    doctors: Results,
    query: DoctorQuery,
    auth_token: String,
}

/// Recomputes the filtered doctor list only after the input has been quiet
/// for the debounce window. Results are published on a watch channel and
/// failed searches on a broadcast channel.
pub struct DebouncedDoctorSearch {
    input: watch::Sender<SearchInput>,
    output: Arc<watch::Sender<Results>>,
    failures: broadcast::Sender<String>,
    task: JoinHandle<()>,
}

impl DebouncedDoctorSearch {
    pub fn spawn(engine: Arc<DoctorFilterEngine>, debounce: Duration, auth_token: String) -> Self {
        let (input_tx, input_rx) = watch::channel(SearchInput {
            doctors: Arc::new(Vec::new()),
            query: DoctorQuery::default(),
            auth_token,
        });
        let output = Arc::new(watch::Sender::new(Arc::new(Vec::new())));
        let (failures, _) = broadcast::channel(16);

        let task = tokio::spawn(run(engine, input_rx, output.clone(), failures.clone(), debounce));

        Self {
            input: input_tx,
            output,
            failures,
            task,
        }
    }

    pub fn set_query(&self, query: DoctorQuery) {
        self.input.send_modify(|input| input.query = query);
    }

    /// Replaces the listing. With no active query the raw list is visible
    /// right away; otherwise it goes through the debounced pipeline.
    pub fn set_doctors(&self, doctors: Vec<DoctorProfile>) {
        let doctors = Arc::new(doctors);
        let mut publish_now = false;

        self.input.send_modify(|input| {
            publish_now = input.query.is_empty();
            input.doctors = doctors.clone();
        });

        if publish_now {
            self.output.send_replace(doctors);
        }
    }

    pub fn set_auth_token(&self, auth_token: String) {
        // A token refresh alone does not trigger a recompute.
        self.input.send_if_modified(|input| {
            input.auth_token = auth_token;
            false
        });
    }

    pub fn query(&self) -> DoctorQuery {
        self.input.borrow().query.clone()
    }

    pub fn results(&self) -> watch::Receiver<Results> {
        self.output.subscribe()
    }

    pub fn failures(&self) -> broadcast::Receiver<String> {
        self.failures.subscribe()
    }

    pub fn latest(&self) -> Results {
        self.output.borrow().clone()
    }

    pub fn stop(&self) {
        self.task.abort();
    }
}

impl Drop for DebouncedDoctorSearch {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn run(
    engine: Arc<DoctorFilterEngine>,
    mut input: watch::Receiver<SearchInput>,
    output: Arc<watch::Sender<Results>>,
    failures: broadcast::Sender<String>,
    debounce: Duration,
) {
    loop {
        if input.changed().await.is_err() {
            break;
        }

        // Every further change restarts the quiet window.
        loop {
            tokio::select! {
                changed = input.changed() => {
                    if changed.is_err() {
                        return;
                    }
                }
                _ = tokio::time::sleep(debounce) => break,
            }
        }

        let snapshot = input.borrow_and_update().clone();
        match engine.apply(&snapshot.doctors, &snapshot.query, &snapshot.auth_token).await {
            Ok(results) => {
                if input.has_changed().unwrap_or(false) {
                    debug!("Search input changed while filtering, discarding stale result");
                    continue;
                }
                debug!("Debounced search produced {} doctors", results.len());
                output.send_replace(Arc::new(results));
            }
            Err(e) => {
                warn!("Doctor search failed, keeping previous results: {}", e);
                // Nobody listening is fine.
                let _ = failures.send(e.to_string());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use tokio::time::Instant;
    use uuid::Uuid;

    use crate::models::{DirectoryError, VerificationStatus};
    use crate::services::directory::{DoctorDirectory, StaticDoctorDirectory};

    struct CountingDirectory {
        inner: StaticDoctorDirectory,
        searches: AtomicUsize,
        fail: bool,
    }

    #[async_trait]
    impl DoctorDirectory for CountingDirectory {
        async fn fetch_doctors(&self, token: &str) -> Result<Vec<DoctorProfile>, DirectoryError> {
            self.inner.fetch_doctors(token).await
        }

        async fn search_doctors(&self, text: &str, token: &str) -> Result<Vec<DoctorProfile>, DirectoryError> {
            self.searches.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(DirectoryError::Unavailable("search index offline".into()));
            }
            self.inner.search_doctors(text, token).await
        }
    }

    fn doctor(name: &str, rating: f32) -> DoctorProfile {
        DoctorProfile {
            id: Uuid::new_v4(),
            name: name.to_string(),
            clinic_name: None,
            clinic_address: None,
            specializations: vec![],
            years_of_experience: 5,
            consultation_modes: vec![],
            consultation_fee: None,
            rating: Some(rating),
            verification_status: VerificationStatus::Verified,
            languages: vec![],
            qualifications: vec![],
        }
    }

    fn setup(fail: bool) -> (Arc<CountingDirectory>, DebouncedDoctorSearch, Vec<DoctorProfile>) {
        let doctors = vec![doctor("Asha Verma", 4.2), doctor("Ravi Nair", 4.8)];
        let directory = Arc::new(CountingDirectory {
            inner: StaticDoctorDirectory::new(doctors.clone()),
            searches: AtomicUsize::new(0),
            fail,
        });
        let engine = Arc::new(DoctorFilterEngine::new(directory.clone()));
        let search = DebouncedDoctorSearch::spawn(engine, Duration::from_millis(300), "token".into());
        (directory, search, doctors)
    }

    fn text_query(text: &str) -> DoctorQuery {
        DoctorQuery { free_text: Some(text.to_string()), ..Default::default() }
    }

    #[tokio::test(start_paused = true)]
    async fn test_doctors_visible_immediately_without_query() {
        let (_, search, doctors) = setup(false);

        search.set_doctors(doctors.clone());

        assert_eq!(search.latest().as_slice(), doctors.as_slice());
    }

    #[tokio::test(start_paused = true)]
    async fn test_waits_for_quiet_window() {
        let (directory, search, doctors) = setup(false);
        search.set_doctors(doctors);
        let mut results = search.results();
        results.borrow_and_update();

        let start = Instant::now();
        search.set_query(text_query("asha"));

        let early = tokio::time::timeout(Duration::from_millis(299), results.changed()).await;
        assert!(early.is_err(), "result published before the debounce window");

        results.changed().await.unwrap();
        assert!(start.elapsed() >= Duration::from_millis(300));
        assert_eq!(results.borrow().len(), 1);
        assert_eq!(results.borrow()[0].name, "Asha Verma");
        assert_eq!(directory.searches.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rapid_input_collapses_to_last_query() {
        let (directory, search, doctors) = setup(false);
        search.set_doctors(doctors);
        let mut results = search.results();
        results.borrow_and_update();

        let start = Instant::now();
        for text in ["r", "ra", "rav"] {
            search.set_query(text_query(text));
            tokio::time::sleep(Duration::from_millis(100)).await;
        }

        results.changed().await.unwrap();
        assert!(start.elapsed() >= Duration::from_millis(500));
        assert_eq!(results.borrow()[0].name, "Ravi Nair");
        assert_eq!(directory.searches.load(Ordering::SeqCst), 1);
        assert_eq!(search.query(), text_query("rav"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_search_keeps_previous_results() {
        let (directory, search, doctors) = setup(true);
        search.set_doctors(doctors.clone());
        let mut failures = search.failures();

        search.set_query(text_query("asha"));
        tokio::time::sleep(Duration::from_millis(400)).await;

        assert_eq!(directory.searches.load(Ordering::SeqCst), 1);
        assert_eq!(search.latest().as_slice(), doctors.as_slice());

        let reason = failures.try_recv().unwrap();
        assert!(reason.contains("search index offline"));
        assert!(failures.try_recv().is_err());
    }
}
