// libs/doctor-cell/src/services/directory.rs
use async_trait::async_trait;
use reqwest::Method;
use serde_json::Value;
use tracing::{debug, warn};

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;

use crate::models::{DirectoryError, DoctorProfile};

/// Read-only source of doctor profiles.
#[async_trait]
pub trait DoctorDirectory: Send + Sync {
    async fn fetch_doctors(&self, auth_token: &str) -> Result<Vec<DoctorProfile>, DirectoryError>;

    /// Free-text search. The candidate set is whatever the backing store
    /// considers a match; callers intersect it with their own listing.
    async fn search_doctors(
        &self,
        text: &str,
        auth_token: &str,
    ) -> Result<Vec<DoctorProfile>, DirectoryError>;
}

pub struct SupabaseDoctorDirectory {
    supabase: SupabaseClient,
}

impl SupabaseDoctorDirectory {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    async fn load(&self, path: &str, auth_token: &str) -> Result<Vec<DoctorProfile>, DirectoryError> {
        let rows: Vec<Value> = self.supabase.request(
            Method::GET,
            path,
            Some(auth_token),
            None,
        ).await.map_err(|e| DirectoryError::Unavailable(e.to_string()))?;

        let mut doctors = Vec::with_capacity(rows.len());
        for row in rows {
            match serde_json::from_value::<DoctorProfile>(row) {
                Ok(doctor) => doctors.push(doctor),
                // One broken profile should not hide the whole directory.
                Err(e) => warn!("Skipping malformed doctor profile: {}", e),
            }
        }

        Ok(doctors)
    }
}

#[async_trait]
impl DoctorDirectory for SupabaseDoctorDirectory {
    async fn fetch_doctors(&self, auth_token: &str) -> Result<Vec<DoctorProfile>, DirectoryError> {
        debug!("Fetching doctor directory");

        let doctors = self.load("/rest/v1/doctor_profiles?select=*&order=name.asc", auth_token).await?;

        debug!("Fetched {} doctor profiles", doctors.len());
        Ok(doctors)
    }

    async fn search_doctors(
        &self,
        text: &str,
        auth_token: &str,
    ) -> Result<Vec<DoctorProfile>, DirectoryError> {
        let term = text.trim();
        debug!("Searching doctor directory for '{}'", term);

        // PostgREST reserves , ( ) inside or=() filters.
        let sanitized: String = term
            .chars()
            .filter(|c| !matches!(c, ',' | '(' | ')' | '*'))
            .collect();
        let pattern = urlencoding::encode(&format!("*{}*", sanitized)).into_owned();

        let path = format!(
            "/rest/v1/doctor_profiles?select=*&or=(name.ilike.{p},clinic_name.ilike.{p},clinic_address.ilike.{p},specializations_text.ilike.{p})",
            p = pattern
        );

        self.load(&path, auth_token).await
    }
}

/// Fixed in-process directory used by the memory store backend and tests.
pub struct StaticDoctorDirectory {
    doctors: Vec<DoctorProfile>,
}

impl StaticDoctorDirectory {
    pub fn new(doctors: Vec<DoctorProfile>) -> Self {
        Self { doctors }
    }
}

#[async_trait]
impl DoctorDirectory for StaticDoctorDirectory {
    async fn fetch_doctors(&self, _auth_token: &str) -> Result<Vec<DoctorProfile>, DirectoryError> {
        Ok(self.doctors.clone())
    }

    async fn search_doctors(
        &self,
        text: &str,
        _auth_token: &str,
    ) -> Result<Vec<DoctorProfile>, DirectoryError> {
        let needle = text.trim().to_lowercase();

        Ok(self.doctors.iter()
            .filter(|doctor| {
                doctor.name.to_lowercase().contains(&needle)
                    || doctor.clinic_name.as_deref().unwrap_or_default().to_lowercase().contains(&needle)
                    || doctor.clinic_address.as_deref().unwrap_or_default().to_lowercase().contains(&needle)
                    || doctor.specializations.iter().any(|s| s.to_lowercase().contains(&needle))
            })
            .cloned()
            .collect())
    }
}
