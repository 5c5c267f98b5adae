use std::sync::Arc;
use chrono::{Duration, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use base64::{Engine as _, engine::general_purpose};
use serde_json::json;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::auth::User;

pub struct TestConfig {
    pub jwt_secret: String,
    pub supabase_url: String,
    pub supabase_anon_key: String,
    pub supabase_service_role_key: String,
    pub video_app_id: String,
    pub video_app_secret: String,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            jwt_secret: "test-secret-key-for-jwt-validation-must-be-long-enough".to_string(),
            supabase_url: "http://localhost:54321".to_string(),
            supabase_anon_key: "test-anon-key".to_string(),
            supabase_service_role_key: "test-service-role-key".to_string(),
            video_app_id: "test-video-app".to_string(),
            video_app_secret: "test-video-secret".to_string(),
        }
    }
}

impl TestConfig {
    pub fn to_app_config(&self) -> AppConfig {
        AppConfig {
            supabase_url: self.supabase_url.clone(),
            supabase_anon_key: self.supabase_anon_key.clone(),
            supabase_service_role_key: self.supabase_service_role_key.clone(),
            supabase_jwt_secret: self.jwt_secret.clone(),
            video_app_id: self.video_app_id.clone(),
            video_app_secret: self.video_app_secret.clone(),
            video_join_base_url: "https://meet.test.local/room".to_string(),
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

    pub fn doctor(email: &str) -> Self {
        Self::new(email, "doctor")
    }

    pub fn patient(email: &str) -> Self {
        Self::new(email, "patient")
    }

    pub fn admin(email: &str) -> Self {
        Self::new(email, "admin")
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

        let header = json!({
            "alg": "HS256",
            "typ": "JWT"
        });

        let payload = json!({
            "sub": user.id,
            "email": user.email,
            "role": user.role,
            "iat": now.timestamp(),
            "exp": exp.timestamp()
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

    pub fn create_expired_token(user: &TestUser, secret: &str) -> String {
        Self::create_test_token(user, secret, Some(-1))
    }

    pub fn create_invalid_signature_token(user: &TestUser) -> String {
        Self::create_test_token(user, "wrong-secret", Some(24))
    }

    pub fn create_malformed_token() -> String {
        "invalid.token.format".to_string()
    }
}

/// Canned store rows for wiremock-backed cell tests.
pub struct MockStoreResponses;

impl MockStoreResponses {
    pub fn application_row(doctor_id: &str, status: &str) -> serde_json::Value {
        json!({
            "id": doctor_id,
            "name": "Asha Rao",
            "email": "asha.rao@example.com",
            "specialty": "Cardiology",
            "experience": 9,
            "license_number": "APMC123456",
            "license_image_url": format!("http://localhost:54321/storage/v1/object/public/licenses/{}", doctor_id),
            "living_place": "Hyderabad",
            "languages": ["Telugu", "Hindi", "English"],
            "status": status
        })
    }

    pub fn user_row(id: &str, role: &str) -> serde_json::Value {
        json!({
            "id": id,
            "role": role
        })
    }

    pub fn appointment_row(patient_email: &str, doctor_id: &str, status: &str) -> serde_json::Value {
        json!({
            "id": Uuid::new_v4(),
            "patient_email": patient_email,
            "doctor_id": doctor_id,
            "patient_name": "Ravi Kumar",
            "patient_age": 34,
            "patient_place": "Guntur",
            "mode": "online",
            "date": "2031-06-10",
            "time": "10:00",
            "status": status,
            "location": null,
            "created_at": "2031-06-01T08:00:00Z"
        })
    }

    pub fn meeting_row(room_id: &str, doctor_email: &str, scheduled_time: chrono::DateTime<Utc>) -> serde_json::Value {
        json!({
            "id": Uuid::new_v4(),
            "room_id": room_id,
            "doctor_name": "Dr. Asha Rao",
            "patient_name": "Ravi Kumar",
            "doctor_email": doctor_email,
            "patient_email": "ravi@example.com",
            "date": scheduled_time.date_naive(),
            "time": scheduled_time.time().format("%H:%M").to_string(),
            "scheduled_time": scheduled_time,
            "created_at": scheduled_time - Duration::days(1)
        })
    }

    pub fn message_row(role: &str) -> serde_json::Value {
        json!({
            "id": Uuid::new_v4(),
            "name": "Ravi Kumar",
            "email": "ravi@example.com",
            "message": "How do I reschedule my appointment?",
            "role": role,
            "timestamp": "2031-06-01T08:00:00Z"
        })
    }
}
