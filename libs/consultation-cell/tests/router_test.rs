// libs/consultation-cell/tests/router_test.rs
use std::sync::Arc;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

use consultation_cell::services::InMemoryConsultationStore;
use consultation_cell::{consultation_routes, ConsultationCellState, ConsultationServices};
use doctor_cell::models::{DoctorProfile, VerificationStatus};
use doctor_cell::services::StaticDoctorDirectory;
use shared_utils::test_utils::{JwtTestUtils, TestConfig, TestUser};

struct TestApp {
    app: Router,
    config: TestConfig,
    asha: DoctorProfile,
}

impl TestApp {
    fn new() -> Self {
        let config = TestConfig::in_memory();
        let asha = DoctorProfile {
            id: Uuid::new_v4(),
            name: "Asha Verma".to_string(),
            clinic_name: Some("Prakriti Ayurveda Clinic".to_string()),
            clinic_address: Some("12 MG Road, Pune".to_string()),
            specializations: vec!["Prenatal Care".to_string()],
            years_of_experience: 12,
            consultation_modes: vec![],
            consultation_fee: Some(800.0),
            rating: Some(4.8),
            verification_status: VerificationStatus::Verified,
            languages: vec![],
            qualifications: vec![],
        };

        let store = Arc::new(InMemoryConsultationStore::new());
        let services = ConsultationServices::new(
            Arc::new(StaticDoctorDirectory::new(vec![asha.clone()])),
            store.clone(),
            store,
        );
        let app = consultation_routes(ConsultationCellState::new(config.to_arc(), services));

        Self { app, config, asha }
    }

    fn token_for(&self, user: &TestUser) -> String {
        JwtTestUtils::create_test_token(user, &self.config.jwt_secret, None)
    }

    async fn send(&self, method: &str, uri: &str, token: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header("Authorization", format!("Bearer {}", token));
        }
        let body = match body {
            Some(body) => {
                builder = builder.header("Content-Type", "application/json");
                Body::from(body.to_string())
            }
            None => Body::empty(),
        };

        let response = self.app.clone().oneshot(builder.body(body).unwrap()).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };

        (status, json)
    }
}

#[tokio::test]
async fn test_requires_authentication() {
    let test_app = TestApp::new();

    let (status, body) = test_app.send("POST", "/session", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body["error"].is_string());

    let expired = JwtTestUtils::create_expired_token(&TestUser::patient("p@example.com"), &test_app.config.jwt_secret);
    let (status, _) = test_app.send("GET", "/notifications", Some(&expired), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_request_accept_chat_flow() {
    let test_app = TestApp::new();
    let asha_id = test_app.asha.id;
    let patient = test_app.token_for(&TestUser::patient("meera@example.com"));
    let doctor = test_app.token_for(&TestUser::with_id(asha_id, "asha@clinic.in", "doctor"));

    let (status, body) = test_app.send("POST", "/session", Some(&patient), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["doctors"].as_array().unwrap().len(), 1);
    assert_eq!(body["doctors"][0]["row_state"], "none");
    assert_eq!(body["polling"], true);

    let (status, body) = test_app.send("POST", &format!("/doctors/{}/request", asha_id), Some(&patient), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["form"]["urgency"], "medium");
    assert_eq!(body["form"]["request_type"], "consultation");
    assert_eq!(body["form"]["doctor_name"], "Dr. Asha Verma");

    let (status, body) = test_app.send(
        "POST",
        "/requests",
        Some(&patient),
        Some(json!({ "doctor_id": asha_id, "message": "Need diet advice" })),
    ).await;
    assert_eq!(status, StatusCode::CREATED);
    let request_id = body["request_id"].as_str().unwrap().to_string();

    let (status, _) = test_app.send("POST", &format!("/doctors/{}/request", asha_id), Some(&patient), None).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, body) = test_app.send("GET", "/doctors?min_rating=4.5", Some(&patient), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["doctors"][0]["row_state"], "requested");

    let (status, _) = test_app.send("GET", &format!("/chat/{}", asha_id), Some(&patient), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = test_app.send("GET", "/doctor/requests", Some(&doctor), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 1);
    assert_eq!(body["requests"][0]["status"], "pending");

    let (status, body) = test_app.send(
        "POST",
        &format!("/doctor/requests/{}/respond", request_id),
        Some(&doctor),
        Some(json!({ "decision": "accept" })),
    ).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["request"]["status"], "accepted");

    let (status, body) = test_app.send("GET", "/notifications", Some(&patient), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["notifications"].as_array().unwrap().len(), 1);
    assert_eq!(body["notifications"][0]["type"], "consultation_accepted");
    assert_eq!(body["unread_count"], 0);

    let (status, body) = test_app.send("GET", &format!("/chat/{}", asha_id), Some(&patient), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["path"], format!("/communication?chatId={}", asha_id));

    let (status, body) = test_app.send("GET", "/toasts", Some(&patient), None).await;
    assert_eq!(status, StatusCode::OK);
    let titles: Vec<&str> = body["toasts"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|t| t["title"].as_str())
        .collect();
    assert!(titles.contains(&"Request Sent Successfully"));
    assert!(titles.contains(&"Consultation Request Accepted"));

    let (status, _) = test_app.send("DELETE", "/session", Some(&patient), None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = test_app.send("DELETE", "/session", Some(&patient), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_doctor_routes_require_doctor_role() {
    let test_app = TestApp::new();
    let patient = test_app.token_for(&TestUser::patient("meera@example.com"));

    let (status, _) = test_app.send("GET", "/doctor/requests", Some(&patient), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let doctor = test_app.token_for(&TestUser::doctor("other@clinic.in"));
    let (status, _) = test_app.send(
        "POST",
        &format!("/doctor/requests/{}/respond", Uuid::new_v4()),
        Some(&doctor),
        Some(json!({ "decision": "reject" })),
    ).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_invalid_submission_and_missing_session() {
    let test_app = TestApp::new();
    let patient = test_app.token_for(&TestUser::patient("meera@example.com"));

    let (status, _) = test_app.send("GET", "/session/doctors", Some(&patient), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = test_app.send(
        "POST",
        "/requests",
        Some(&patient),
        Some(json!({ "doctor_id": test_app.asha.id, "message": "x".repeat(2001) })),
    ).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("2000"));

    let (status, _) = test_app.send("GET", &format!("/chat/{}", test_app.asha.id), Some(&patient), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = test_app.send("GET", "/session/doctors", Some(&patient), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 1);
}

#[tokio::test]
async fn test_patient_routes_reject_doctors() {
    let test_app = TestApp::new();
    let doctor = test_app.token_for(&TestUser::with_id(test_app.asha.id, "asha@clinic.in", "doctor"));

    let (status, _) = test_app.send("POST", "/session", Some(&doctor), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = test_app.send("GET", "/notifications", Some(&doctor), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = test_app.send(
        "POST",
        &format!("/doctors/{}/request", test_app.asha.id),
        Some(&doctor),
        None,
    ).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_form_can_be_closed_and_doctors_reloaded() {
    let test_app = TestApp::new();
    let patient = test_app.token_for(&TestUser::patient("meera@example.com"));

    let (status, _) = test_app.send("DELETE", "/session/form", Some(&patient), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = test_app.send("POST", "/session", Some(&patient), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = test_app.send("POST", &format!("/doctors/{}/request", test_app.asha.id), Some(&patient), None).await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = test_app.send("GET", "/session/doctors", Some(&patient), None).await;
    assert_eq!(body["form"]["doctor_id"], test_app.asha.id.to_string());

    let (status, _) = test_app.send("DELETE", "/session/form", Some(&patient), None).await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = test_app.send("GET", "/session/doctors", Some(&patient), None).await;
    assert!(body["form"].is_null());

    let (status, body) = test_app.send("POST", "/session/doctors/reload", Some(&patient), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 1);
    assert_eq!(body["doctors"][0]["row_state"], "none");
}
