use std::sync::Arc;
use chrono::{Duration, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use base64::{Engine as _, engine::general_purpose};
use serde_json::{json, Value};
use uuid::Uuid;

use shared_config::{AppConfig, StoreBackend};
use shared_models::auth::User;

pub struct TestConfig {
    pub jwt_secret: String,
    pub supabase_url: String,
    pub supabase_anon_key: String,
    pub store_backend: StoreBackend,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            jwt_secret: "test-secret-key-for-jwt-validation-must-be-long-enough".to_string(),
            supabase_url: "http://localhost:54321".to_string(),
            supabase_anon_key: "test-anon-key".to_string(),
            store_backend: StoreBackend::Supabase,
        }
    }
}

impl TestConfig {
    pub fn with_supabase_url(url: &str) -> Self {
        Self {
            supabase_url: url.to_string(),
            ..Self::default()
        }
    }

    pub fn in_memory() -> Self {
        Self {
            store_backend: StoreBackend::Memory,
            ..Self::default()
        }
    }

    pub fn to_app_config(&self) -> AppConfig {
        AppConfig {
            supabase_url: self.supabase_url.clone(),
            supabase_anon_key: self.supabase_anon_key.clone(),
            supabase_jwt_secret: self.jwt_secret.clone(),
            store_backend: self.store_backend,
            server_port: 3000,
            notification_poll_interval_secs: 30,
            notification_refetch_delay_ms: 1000,
            search_debounce_ms: 300,
            session_idle_timeout_secs: 300,
        }
    }

    pub fn to_arc(&self) -> Arc<AppConfig> {
        Arc::new(self.to_app_config())
    }
}

pub struct TestUser {
    pub id: String,
    pub email: String,
    pub role: String,
}

impl Default for TestUser {
    fn default() -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            email: "test@example.com".to_string(),
            role: "patient".to_string(),
        }
    }
}

impl TestUser {
    pub fn new(email: &str, role: &str) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            email: email.to_string(),
            role: role.to_string(),
        }
    }

    pub fn with_id(id: Uuid, email: &str, role: &str) -> Self {
        Self {
            id: id.to_string(),
            email: email.to_string(),
            role: role.to_string(),
        }
    }

    pub fn doctor(email: &str) -> Self {
        Self::new(email, "doctor")
    }

    pub fn patient(email: &str) -> Self {
        Self::new(email, "patient")
    }

    pub fn uuid(&self) -> Uuid {
        Uuid::parse_str(&self.id).expect("test users carry UUID ids")
    }

    pub fn to_user(&self) -> User {
        User {
            id: self.id.clone(),
            email: Some(self.email.clone()),
            role: Some(self.role.clone()),
            metadata: None,
            created_at: Some(Utc::now()),
        }
    }
}

pub struct JwtTestUtils;

impl JwtTestUtils {
    pub fn create_test_token(user: &TestUser, secret: &str, exp_hours: Option<i64>) -> String {
        let now = Utc::now();
        let exp = now + Duration::hours(exp_hours.unwrap_or(24));

        Self::sign(json!({
            "sub": user.id,
            "email": user.email,
            "role": user.role,
            "iat": now.timestamp(),
            "exp": exp.timestamp()
        }), secret)
    }

    /// Token shaped like Supabase issues them: generic `role`, app role in metadata.
    pub fn create_supabase_style_token(user: &TestUser, secret: &str) -> String {
        let now = Utc::now();

        Self::sign(json!({
            "sub": user.id,
            "email": user.email,
            "role": "authenticated",
            "aud": "authenticated",
            "user_metadata": { "role": user.role },
            "iat": now.timestamp(),
            "exp": (now + Duration::hours(1)).timestamp()
        }), secret)
    }

    pub fn create_expired_token(user: &TestUser, secret: &str) -> String {
        Self::create_test_token(user, secret, Some(-1))
    }

    pub fn create_invalid_signature_token(user: &TestUser) -> String {
        Self::create_test_token(user, "wrong-secret", Some(24))
    }

    pub fn create_malformed_token() -> String {
        "invalid.token.format".to_string()
    }

    fn sign(payload: Value, secret: &str) -> String {
        let header = json!({
            "alg": "HS256",
            "typ": "JWT"
        });

        let header_encoded = general_purpose::URL_SAFE_NO_PAD.encode(header.to_string());
        let payload_encoded = general_purpose::URL_SAFE_NO_PAD.encode(payload.to_string());

        let signing_input = format!("{}.{}", header_encoded, payload_encoded);

        let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes())
            .expect("HMAC can take key of any size");
        mac.update(signing_input.as_bytes());
        let signature = mac.finalize().into_bytes();
        let signature_encoded = general_purpose::URL_SAFE_NO_PAD.encode(signature);

        format!("{}.{}", signing_input, signature_encoded)
    }
}

/// Canned PostgREST rows for wiremock-backed tests.
pub struct MockSupabaseResponses;

impl MockSupabaseResponses {
    pub fn doctor_profile_response(
        doctor_id: &str,
        name: &str,
        rating: Option<f32>,
        verification_status: &str,
    ) -> Value {
        json!({
            "id": doctor_id,
            "name": name,
            "clinic_name": "Prakriti Ayurveda Clinic",
            "clinic_address": "12 MG Road, Pune",
            "specializations": ["Prenatal Care", "Panchakarma"],
            "years_of_experience": 12,
            "consultation_modes": ["online", "in-person"],
            "consultation_fee": 800.0,
            "rating": rating,
            "verification_status": verification_status,
            "languages": ["English", "Hindi"],
            "qualifications": ["BAMS"]
        })
    }

    pub fn consultation_request_response(
        request_id: &str,
        patient_id: &str,
        doctor_id: &str,
        status: &str,
    ) -> Value {
        json!({
            "id": request_id,
            "patient_id": patient_id,
            "doctor_id": doctor_id,
            "request_type": "consultation",
            "urgency": "medium",
            "preferred_mode": "online",
            "message": "Second trimester check-in",
            "status": status,
            "requested_at": "2024-06-01T09:00:00Z",
            "responded_at": if status == "pending" { Value::Null } else { json!("2024-06-01T10:00:00Z") }
        })
    }

    pub fn notification_response(
        notification_id: &str,
        patient_id: &str,
        doctor_id: Option<&str>,
        notification_type: &str,
        read: bool,
    ) -> Value {
        json!({
            "id": notification_id,
            "recipient_patient_id": patient_id,
            "type": notification_type,
            "doctor_id": doctor_id,
            "request_id": null,
            "title": "Consultation Request Accepted",
            "message": "Dr. Asha Verma has accepted your consultation request.",
            "read": read,
            "created_at": "2024-06-01T10:00:00Z",
            "read_at": if read { json!("2024-06-01T10:05:00Z") } else { Value::Null }
        })
    }

    pub fn error_response(message: &str, code: &str) -> Value {
        json!({
            "message": message,
            "code": code
        })
    }
}
