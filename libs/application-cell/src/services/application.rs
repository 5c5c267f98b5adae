use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use reqwest::Method;
use serde_json::json;
use tracing::{debug, info};

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;
use shared_models::auth::User;

use crate::models::{
    ApplicationError, ApplicationStatus, DoctorApplication, SubmitApplicationRequest,
    ALLOWED_LICENSE_IMAGE_TYPES,
};

const LICENSE_BUCKET: &str = "licenses";

pub struct ApplicationService {
    supabase: SupabaseClient,
}

impl ApplicationService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    /// Submit (or re-submit) a credential application. Validation happens
    /// before any external call, so an invalid request writes nothing.
    pub async fn submit(
        &self,
        doctor: &User,
        request: SubmitApplicationRequest,
        auth_token: &str,
    ) -> Result<DoctorApplication, ApplicationError> {
        validate_submission(&request)?;

        let image_bytes = decode_license_image(&request.license_image.data)?;

        let object_key = license_object_key(&doctor.id, &request.license_image.content_type);
        self.supabase
            .upload_object(
                LICENSE_BUCKET,
                &object_key,
                image_bytes,
                &request.license_image.content_type,
                auth_token,
            )
            .await
            .map_err(|e| ApplicationError::UploadError(e.to_string()))?;

        let license_image_url = self.supabase.public_object_url(LICENSE_BUCKET, &object_key);

        let row = json!([{
            "id": doctor.id,
            "name": request.name.trim(),
            "email": request.email.trim(),
            "specialty": request.specialty.trim(),
            "experience": request.experience,
            "license_number": request.license_number.trim(),
            "license_image_url": license_image_url,
            "living_place": request.living_place.trim(),
            "languages": request.languages,
            "status": ApplicationStatus::Pending
        }]);

        let stored: Vec<DoctorApplication> = self
            .supabase
            .upsert_returning("/rest/v1/applications", Some(auth_token), row)
            .await
            .map_err(|e| ApplicationError::DatabaseError(e.to_string()))?;

        let application = stored
            .into_iter()
            .next()
            .ok_or_else(|| ApplicationError::DatabaseError("Upsert returned no row".to_string()))?;

        info!("Application submitted for doctor {}", doctor.id);
        Ok(application)
    }

    pub async fn list(&self, auth_token: &str) -> Result<Vec<DoctorApplication>, ApplicationError> {
        debug!("Listing all doctor applications");

        self.supabase
            .request(Method::GET, "/rest/v1/applications?order=name.asc", Some(auth_token), None)
            .await
            .map_err(|e| ApplicationError::DatabaseError(e.to_string()))
    }

    /// Admin decision. Idempotent overwrite: approving an already-approved
    /// application is a plain re-write, as is re-rejecting.
    pub async fn set_status(
        &self,
        id: &str,
        status: ApplicationStatus,
        auth_token: &str,
    ) -> Result<DoctorApplication, ApplicationError> {
        if status == ApplicationStatus::Pending {
            return Err(ApplicationError::InvalidStatus(
                "Status must be approved or rejected".to_string(),
            ));
        }

        let path = format!("/rest/v1/applications?id=eq.{}", id);
        let updated: Vec<DoctorApplication> = self
            .supabase
            .update_returning(&path, Some(auth_token), json!({ "status": status }))
            .await
            .map_err(|e| ApplicationError::DatabaseError(e.to_string()))?;

        let application = updated.into_iter().next().ok_or(ApplicationError::NotFound)?;

        info!("Application {} marked {}", id, status);
        Ok(application)
    }

    /// Reset the doctor's application to a blank pending record, wiping
    /// whatever the rejected submission contained. A fresh `submit` is
    /// expected to follow.
    pub async fn reapply(
        &self,
        doctor: &User,
        auth_token: &str,
    ) -> Result<DoctorApplication, ApplicationError> {
        let blank = json!([{
            "id": doctor.id,
            "name": "",
            "email": "",
            "specialty": "",
            "experience": 0,
            "license_number": "",
            "license_image_url": "",
            "living_place": "",
            "languages": [],
            "status": ApplicationStatus::Pending
        }]);

        let stored: Vec<DoctorApplication> = self
            .supabase
            .upsert_returning("/rest/v1/applications", Some(auth_token), blank)
            .await
            .map_err(|e| ApplicationError::DatabaseError(e.to_string()))?;

        let application = stored
            .into_iter()
            .next()
            .ok_or_else(|| ApplicationError::DatabaseError("Upsert returned no row".to_string()))?;

        info!("Application reset to pending for doctor {}", doctor.id);
        Ok(application)
    }

    /// The doctor's own application, if one has been submitted.
    pub async fn get_own(
        &self,
        doctor: &User,
        auth_token: &str,
    ) -> Result<Option<DoctorApplication>, ApplicationError> {
        let path = format!("/rest/v1/applications?id=eq.{}", doctor.id);
        let rows: Vec<DoctorApplication> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| ApplicationError::DatabaseError(e.to_string()))?;

        Ok(rows.into_iter().next())
    }
}

fn validate_submission(request: &SubmitApplicationRequest) -> Result<(), ApplicationError> {
    let required = [
        ("name", &request.name),
        ("email", &request.email),
        ("specialty", &request.specialty),
        ("license_number", &request.license_number),
        ("living_place", &request.living_place),
    ];

    for (field, value) in required {
        if value.trim().is_empty() {
            return Err(ApplicationError::ValidationError(format!(
                "Field '{}' must not be empty",
                field
            )));
        }
    }

    if request.experience < 0 {
        return Err(ApplicationError::ValidationError(
            "Experience must be a non-negative number of years".to_string(),
        ));
    }

    if request.languages.is_empty() || request.languages.iter().any(|l| l.trim().is_empty()) {
        return Err(ApplicationError::ValidationError(
            "At least one language must be provided".to_string(),
        ));
    }

    if !ALLOWED_LICENSE_IMAGE_TYPES.contains(&request.license_image.content_type.as_str()) {
        return Err(ApplicationError::ValidationError(
            "License image must be a JPEG, PNG or GIF".to_string(),
        ));
    }

    if request.license_image.data.trim().is_empty() {
        return Err(ApplicationError::ValidationError(
            "License image payload is empty".to_string(),
        ));
    }

    Ok(())
}

/// Accepts raw base64 or a full `data:` URL.
fn decode_license_image(data: &str) -> Result<Vec<u8>, ApplicationError> {
    let encoded = data.rsplit(',').next().unwrap_or(data);

    let bytes = BASE64
        .decode(encoded.trim())
        .map_err(|e| ApplicationError::ValidationError(format!("Invalid image encoding: {}", e)))?;

    if bytes.is_empty() {
        return Err(ApplicationError::ValidationError(
            "License image payload is empty".to_string(),
        ));
    }

    Ok(bytes)
}

fn license_object_key(doctor_id: &str, content_type: &str) -> String {
    let ext = match content_type {
        "image/png" => "png",
        "image/gif" => "gif",
        _ => "jpg",
    };
    format!("{}.{}", doctor_id, ext)
}
