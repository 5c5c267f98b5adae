use chrono::{DateTime, Utc};
use reqwest::Method;
use serde_json::{json, Value};
use tracing::{debug, info, warn};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;
use shared_models::auth::User;

use application_cell::models::DoctorApplication;

use crate::models::{
    Appointment, AppointmentDecisionRequest, AppointmentError, AppointmentMode,
    AppointmentStatus, AppointmentWithDoctor, ApprovedDoctor, RequestAppointmentRequest,
};

pub struct AppointmentBookingService {
    supabase: SupabaseClient,
}

impl AppointmentBookingService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    /// Approved applications joined with their account rows. A doctor whose
    /// account row cannot be fetched is still listed from the application
    /// alone; a failed collection query surfaces as an error.
    pub async fn list_approved_doctors(
        &self,
        auth_token: &str,
    ) -> Result<Vec<ApprovedDoctor>, AppointmentError> {
        debug!("Listing approved doctors");

        let applications: Vec<DoctorApplication> = self
            .supabase
            .request(
                Method::GET,
                "/rest/v1/applications?status=eq.approved&order=name.asc",
                Some(auth_token),
                None,
            )
            .await
            .map_err(|e| AppointmentError::DatabaseError(e.to_string()))?;

        let mut doctors = Vec::with_capacity(applications.len());
        for application in applications {
            let path = format!("/rest/v1/users?id=eq.{}", application.id);
            let account = match self
                .supabase
                .request::<Vec<Value>>(Method::GET, &path, Some(auth_token), None)
                .await
            {
                Ok(rows) => rows.into_iter().next().unwrap_or(Value::Null),
                Err(e) => {
                    warn!("Account join failed for doctor {}: {}", application.id, e);
                    Value::Null
                }
            };

            doctors.push(ApprovedDoctor { application, account });
        }

        Ok(doctors)
    }

    /// Create a booking request. Whatever status the client might claim,
    /// the stored record starts out pending.
    pub async fn request_appointment(
        &self,
        patient: &User,
        request: RequestAppointmentRequest,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError> {
        validate_request(&request, Utc::now())?;

        let patient_email = patient.email.clone().ok_or_else(|| {
            AppointmentError::ValidationError("Principal has no email address".to_string())
        })?;

        let row = json!([{
            "id": Uuid::new_v4(),
            "patient_email": patient_email,
            "doctor_id": request.doctor_id,
            "patient_name": request.patient_name,
            "patient_age": request.patient_age,
            "patient_place": request.patient_place,
            "mode": request.mode,
            "date": request.date,
            "time": request.time,
            "status": AppointmentStatus::Pending,
            "location": null,
            "created_at": Utc::now()
        }]);

        let stored: Vec<Appointment> = self
            .supabase
            .insert_returning("/rest/v1/appointments", Some(auth_token), row)
            .await
            .map_err(|e| AppointmentError::DatabaseError(e.to_string()))?;

        let appointment = stored.into_iter().next().ok_or_else(|| {
            AppointmentError::DatabaseError("Insert returned no row".to_string())
        })?;

        info!(
            "Appointment {} requested by {} with doctor {}",
            appointment.id, appointment.patient_email, appointment.doctor_id
        );
        Ok(appointment)
    }

    pub async fn list_for_doctor(
        &self,
        doctor: &User,
        auth_token: &str,
    ) -> Result<Vec<Appointment>, AppointmentError> {
        let path = format!(
            "/rest/v1/appointments?doctor_id=eq.{}&order=created_at.desc",
            doctor.id
        );
        self.supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| AppointmentError::DatabaseError(e.to_string()))
    }

    /// The patient's bookings, each enriched with the doctor's name from
    /// the application record.
    pub async fn list_for_patient(
        &self,
        patient: &User,
        auth_token: &str,
    ) -> Result<Vec<AppointmentWithDoctor>, AppointmentError> {
        let path = format!(
            "/rest/v1/appointments?patient_email=eq.{}&order=created_at.desc",
            patient.email_or_empty()
        );
        let appointments: Vec<Appointment> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| AppointmentError::DatabaseError(e.to_string()))?;

        let mut listed = Vec::with_capacity(appointments.len());
        for appointment in appointments {
            let path = format!("/rest/v1/applications?id=eq.{}", appointment.doctor_id);
            let doctor_name = match self
                .supabase
                .request::<Vec<DoctorApplication>>(Method::GET, &path, Some(auth_token), None)
                .await
            {
                Ok(rows) => rows
                    .into_iter()
                    .next()
                    .map(|a| a.name)
                    .unwrap_or_else(|| "N/A".to_string()),
                Err(e) => {
                    warn!("Doctor lookup failed for appointment {}: {}", appointment.id, e);
                    "N/A".to_string()
                }
            };

            listed.push(AppointmentWithDoctor {
                appointment,
                doctor_name,
            });
        }

        Ok(listed)
    }

    /// Approve or reject a pending appointment. The status write always
    /// goes through on its own; for an approved offline appointment the
    /// supplied coordinates are attached afterwards, best-effort.
    pub async fn decide(
        &self,
        doctor: &User,
        appointment_id: Uuid,
        decision: AppointmentDecisionRequest,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError> {
        if decision.status == AppointmentStatus::Pending {
            return Err(AppointmentError::InvalidDecision(
                "Decision must be approved or rejected".to_string(),
            ));
        }

        let appointment = self.get_appointment(appointment_id, auth_token).await?;

        if appointment.doctor_id != doctor.id {
            return Err(AppointmentError::Unauthorized);
        }

        if appointment.status != AppointmentStatus::Pending {
            return Err(AppointmentError::AlreadyDecided(appointment.status));
        }

        let path = format!("/rest/v1/appointments?id=eq.{}", appointment_id);
        let updated: Vec<Appointment> = self
            .supabase
            .update_returning(&path, Some(auth_token), json!({ "status": decision.status }))
            .await
            .map_err(|e| AppointmentError::DatabaseError(e.to_string()))?;

        let mut appointment = updated.into_iter().next().ok_or(AppointmentError::NotFound)?;

        info!("Appointment {} marked {}", appointment_id, decision.status);

        if decision.status == AppointmentStatus::Approved
            && appointment.mode == AppointmentMode::Offline
        {
            match decision.location {
                Some(location) => {
                    match self
                        .supabase
                        .update_returning::<Vec<Appointment>>(
                            &path,
                            Some(auth_token),
                            json!({ "location": location }),
                        )
                        .await
                    {
                        Ok(rows) => {
                            if let Some(with_location) = rows.into_iter().next() {
                                appointment = with_location;
                            }
                        }
                        Err(e) => {
                            // The approval already stands; only the pin is lost.
                            warn!(
                                "Location attach failed for appointment {}: {}",
                                appointment_id, e
                            );
                        }
                    }
                }
                None => {
                    warn!(
                        "Offline appointment {} approved without device coordinates",
                        appointment_id
                    );
                }
            }
        }

        Ok(appointment)
    }

    async fn get_appointment(
        &self,
        id: Uuid,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError> {
        let path = format!("/rest/v1/appointments?id=eq.{}", id);
        let rows: Vec<Appointment> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| AppointmentError::DatabaseError(e.to_string()))?;

        rows.into_iter().next().ok_or(AppointmentError::NotFound)
    }
}

/// Age and schedule checks, against an injected clock so the rules are
/// testable at fixed instants.
pub fn validate_request(
    request: &RequestAppointmentRequest,
    now: DateTime<Utc>,
) -> Result<(), AppointmentError> {
    if request.patient_age <= 0 {
        return Err(AppointmentError::ValidationError(
            "Age must be a positive number".to_string(),
        ));
    }

    for (field, value) in [
        ("patient_name", &request.patient_name),
        ("patient_place", &request.patient_place),
        ("doctor_id", &request.doctor_id),
    ] {
        if value.trim().is_empty() {
            return Err(AppointmentError::ValidationError(format!(
                "Field '{}' must not be empty",
                field
            )));
        }
    }

    let scheduled = request.date.and_time(request.time.to_naive_time()).and_utc();
    if scheduled <= now {
        return Err(AppointmentError::ValidationError(
            "Please select a future date".to_string(),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TimeSlot;
    use assert_matches::assert_matches;
    use chrono::{NaiveDate, TimeZone};

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2031, 6, 1, 12, 0, 0).unwrap()
    }

    fn valid_request() -> RequestAppointmentRequest {
        RequestAppointmentRequest {
            doctor_id: "doc-1".to_string(),
            patient_name: "Ravi Kumar".to_string(),
            patient_age: 34,
            patient_place: "Guntur".to_string(),
            mode: AppointmentMode::Online,
            date: NaiveDate::from_ymd_opt(2031, 6, 10).unwrap(),
            time: TimeSlot::TenAm,
        }
    }

    #[test]
    fn accepts_future_request() {
        assert!(validate_request(&valid_request(), fixed_now()).is_ok());
    }

    #[test]
    fn rejects_non_positive_age() {
        let mut request = valid_request();
        request.patient_age = 0;
        assert_matches!(
            validate_request(&request, fixed_now()),
            Err(AppointmentError::ValidationError(_))
        );

        request.patient_age = -3;
        assert_matches!(
            validate_request(&request, fixed_now()),
            Err(AppointmentError::ValidationError(_))
        );
    }

    #[test]
    fn rejects_past_date() {
        let mut request = valid_request();
        request.date = NaiveDate::from_ymd_opt(2031, 5, 20).unwrap();
        assert_matches!(
            validate_request(&request, fixed_now()),
            Err(AppointmentError::ValidationError(_))
        );
    }

    #[test]
    fn rejects_same_day_slot_already_past() {
        let mut request = valid_request();
        request.date = fixed_now().date_naive();
        request.time = TimeSlot::TenAm; // now is 12:00
        assert_matches!(
            validate_request(&request, fixed_now()),
            Err(AppointmentError::ValidationError(_))
        );
    }

    #[test]
    fn accepts_same_day_slot_still_ahead() {
        let mut request = valid_request();
        request.date = fixed_now().date_naive();
        request.time = TimeSlot::FourPm;
        assert!(validate_request(&request, fixed_now()).is_ok());
    }

    #[test]
    fn rejects_blank_names() {
        let mut request = valid_request();
        request.patient_name = "  ".to_string();
        assert_matches!(
            validate_request(&request, fixed_now()),
            Err(AppointmentError::ValidationError(_))
        );
    }

    #[test]
    fn slot_wire_format_round_trips() {
        let slot: TimeSlot = serde_json::from_str("\"13:00\"").unwrap();
        assert_eq!(slot, TimeSlot::OnePm);
        assert_eq!(serde_json::to_string(&slot).unwrap(), "\"13:00\"");
    }

    #[test]
    fn slot_outside_enumeration_fails() {
        assert!(serde_json::from_str::<TimeSlot>("\"13:30\"").is_err());
        assert!(serde_json::from_str::<TimeSlot>("\"08:00\"").is_err());
    }
}
