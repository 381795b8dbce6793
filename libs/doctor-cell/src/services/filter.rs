// libs/doctor-cell/src/services/filter.rs
use std::cmp::Ordering;
use std::collections::HashSet;
use std::sync::Arc;

use tracing::debug;
use uuid::Uuid;

use crate::models::{non_blank, DirectoryError, DoctorProfile, DoctorQuery};
use crate::services::directory::DoctorDirectory;

/// Two-phase doctor search: free text through the directory, then the
/// structured filters and ordering locally.
pub struct DoctorFilterEngine {
    directory: Arc<dyn DoctorDirectory>,
}

impl DoctorFilterEngine {
    pub fn new(directory: Arc<dyn DoctorDirectory>) -> Self {
        Self { directory }
    }

    pub async fn apply(
        &self,
        doctors: &[DoctorProfile],
        query: &DoctorQuery,
        auth_token: &str,
    ) -> Result<Vec<DoctorProfile>, DirectoryError> {
        if query.is_empty() {
            return Ok(doctors.to_vec());
        }

        let candidates = match query.text() {
            Some(text) => {
                let matches = self.directory.search_doctors(text, auth_token).await?;
                debug!("Text search '{}' returned {} candidates", text, matches.len());
                Some(matches.into_iter().map(|d| d.id).collect::<HashSet<Uuid>>())
            }
            None => None,
        };

        Ok(filter_and_sort(doctors, candidates.as_ref(), query))
    }
}

/// Pure part of the pipeline. `candidates` is the id set returned by the
/// text search, if one ran.
pub fn filter_and_sort(
    doctors: &[DoctorProfile],
    candidates: Option<&HashSet<Uuid>>,
    query: &DoctorQuery,
) -> Vec<DoctorProfile> {
    if query.is_empty() {
        return doctors.to_vec();
    }

    let mut results: Vec<DoctorProfile> = doctors
        .iter()
        .filter(|doctor| candidates.map(|ids| ids.contains(&doctor.id)).unwrap_or(true))
        .filter(|doctor| matches_filters(doctor, query))
        .cloned()
        .collect();

    sort_doctors(&mut results);
    results
}

pub fn matches_filters(doctor: &DoctorProfile, query: &DoctorQuery) -> bool {
    if let Some(min_experience) = query.min_experience {
        if doctor.years_of_experience < min_experience {
            return false;
        }
    }

    if let Some(location) = non_blank(&query.location) {
        let location = location.to_lowercase();
        let address_matches = doctor
            .clinic_address
            .as_deref()
            .map(|address| address.to_lowercase().contains(&location))
            .unwrap_or(false);
        if !address_matches {
            return false;
        }
    }

    if let Some(specialization) = non_blank(&query.specialization) {
        let specialization = specialization.to_lowercase();
        if !doctor
            .specializations
            .iter()
            .any(|spec| spec.to_lowercase().contains(&specialization))
        {
            return false;
        }
    }

    if let Some(status) = query.verification_status {
        if doctor.verification_status != status {
            return false;
        }
    }

    if let Some(mode) = query.consultation_mode {
        if !doctor.consultation_modes.contains(&mode) {
            return false;
        }
    }

    // Unrated doctors (no rating, or 0) are not held to the threshold.
    if let (Some(min_rating), Some(rating)) = (query.min_rating, doctor.rating) {
        if rating > 0.0 && rating < min_rating {
            return false;
        }
    }

    true
}

/// Verified doctors first, then by rating, highest first. `sort_by` is
/// stable, so ties keep their input order.
pub fn sort_doctors(doctors: &mut [DoctorProfile]) {
    doctors.sort_by(compare_doctors);
}

fn compare_doctors(a: &DoctorProfile, b: &DoctorProfile) -> Ordering {
    b.is_verified()
        .cmp(&a.is_verified())
        .then_with(|| {
            b.rating_or_zero()
                .partial_cmp(&a.rating_or_zero())
                .unwrap_or(Ordering::Equal)
        })
}
