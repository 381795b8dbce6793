use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum VerificationStatus {
    #[default]
    Unverified,
    Pending,
    Verified,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum ConsultationMode {
    Online,
    Phone,
    InPerson,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DoctorProfile {
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub clinic_name: Option<String>,
    #[serde(default)]
    pub clinic_address: Option<String>,
    #[serde(default)]
    pub specializations: Vec<String>,
    #[serde(default)]
    pub years_of_experience: i32,
    #[serde(default)]
    pub consultation_modes: Vec<ConsultationMode>,
    #[serde(default)]
    pub consultation_fee: Option<f64>,
    #[serde(default)]
    pub rating: Option<f32>,
    #[serde(default)]
    pub verification_status: VerificationStatus,
    #[serde(default)]
    pub languages: Vec<String>,
    #[serde(default)]
    pub qualifications: Vec<String>,
}

impl DoctorProfile {
    /// Name as shown to patients, "Dr." prefixed unless already present.
    pub fn display_name(&self) -> String {
        format_doctor_name(&self.name)
    }

    pub fn is_verified(&self) -> bool {
        self.verification_status == VerificationStatus::Verified
    }

    pub fn rating_or_zero(&self) -> f32 {
        self.rating.unwrap_or(0.0)
    }
}

pub fn format_doctor_name(name: &str) -> String {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return String::new();
    }
    if trimmed.to_lowercase().starts_with("dr.") {
        trimmed.to_string()
    } else {
        format!("Dr. {}", trimmed)
    }
}

/// Patient-side search and filter input. Every field is optional; an empty
/// query leaves the directory listing untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct DoctorQuery {
    #[serde(default)]
    pub free_text: Option<String>,
    #[serde(default)]
    pub min_experience: Option<i32>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub specialization: Option<String>,
    #[serde(default)]
    pub verification_status: Option<VerificationStatus>,
    #[serde(default)]
    pub consultation_mode: Option<ConsultationMode>,
    #[serde(default)]
    pub min_rating: Option<f32>,
}

impl DoctorQuery {
    pub fn text(&self) -> Option<&str> {
        non_blank(&self.free_text)
    }

    pub fn has_structured_filters(&self) -> bool {
        self.min_experience.is_some()
            || non_blank(&self.location).is_some()
            || non_blank(&self.specialization).is_some()
            || self.verification_status.is_some()
            || self.consultation_mode.is_some()
            || self.min_rating.is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.text().is_none() && !self.has_structured_filters()
    }
}

pub(crate) fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

#[derive(Debug, thiserror::Error)]
pub enum DirectoryError {
    #[error("Doctor directory unavailable: {0}")]
    Unavailable(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_format_doctor_name() {
        assert_eq!(format_doctor_name("Asha Verma"), "Dr. Asha Verma");
        assert_eq!(format_doctor_name("dr. Asha Verma"), "dr. Asha Verma");
        assert_eq!(format_doctor_name("DR. Ravi"), "DR. Ravi");
        assert_eq!(format_doctor_name("  "), "");
    }

    #[test]
    fn test_sparse_record_defaults() {
        let doctor: DoctorProfile = serde_json::from_value(json!({
            "id": Uuid::new_v4(),
            "name": "Meera Iyer"
        })).unwrap();

        assert_eq!(doctor.verification_status, VerificationStatus::Unverified);
        assert_eq!(doctor.years_of_experience, 0);
        assert_eq!(doctor.rating_or_zero(), 0.0);
        assert!(doctor.consultation_modes.is_empty());
    }

    #[test]
    fn test_mode_wire_names() {
        assert_eq!(serde_json::to_value(ConsultationMode::InPerson).unwrap(), json!("in-person"));
        assert_eq!(serde_json::to_value(VerificationStatus::Verified).unwrap(), json!("verified"));
    }

    #[test]
    fn test_blank_query_is_empty() {
        let query = DoctorQuery {
            free_text: Some("   ".to_string()),
            location: Some(String::new()),
            ..Default::default()
        };
        assert!(query.is_empty());

        let query = DoctorQuery { min_rating: Some(4.5), ..Default::default() };
        assert!(!query.is_empty());
    }
}
