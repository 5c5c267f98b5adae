use chrono::Utc;
use reqwest::Method;
use serde_json::json;
use tracing::{debug, info, warn};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;
use shared_models::auth::User;

use crate::models::{
    CreateMeetingRequest, JoinDecision, Meeting, MeetingError, RescheduleMeetingRequest,
};
use crate::services::conflict::{
    check_create, check_reschedule, combine, create_race_conflict, is_expired,
    reschedule_race_conflict,
};
use crate::services::video::build_room_access;

pub struct MeetingSchedulerService {
    supabase: SupabaseClient,
    config: AppConfig,
}

impl MeetingSchedulerService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
            config: config.clone(),
        }
    }

    /// Meetings visible to the principal: doctors and patients see their
    /// own, admins see everything.
    pub async fn list_for_principal(
        &self,
        user: &User,
        auth_token: &str,
    ) -> Result<Vec<Meeting>, MeetingError> {
        let path = match user.role.as_deref() {
            Some("doctor") => format!(
                "/rest/v1/meetings?doctor_email=eq.{}&order=scheduled_time.asc",
                user.email_or_empty()
            ),
            Some("patient") => format!(
                "/rest/v1/meetings?patient_email=eq.{}&order=scheduled_time.asc",
                user.email_or_empty()
            ),
            _ => "/rest/v1/meetings?order=scheduled_time.asc".to_string(),
        };

        self.supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| MeetingError::DatabaseError(e.to_string()))
    }

    /// Schedule a meeting. Validation runs against a fresh read of the
    /// doctor's meetings; after the insert the scope is read again and
    /// the write rolled back if a concurrent earlier insert conflicts.
    pub async fn create(
        &self,
        doctor: &User,
        request: CreateMeetingRequest,
        auth_token: &str,
    ) -> Result<Meeting, MeetingError> {
        validate_create(&request)?;

        let now = Utc::now();
        let scheduled_time = combine(request.date, &request.time)?;
        if scheduled_time <= now {
            return Err(MeetingError::InvalidTime(
                "Please select a future time for the meeting".to_string(),
            ));
        }

        let doctor_email = doctor.email.clone().ok_or_else(|| {
            MeetingError::ValidationError("Principal has no email address".to_string())
        })?;

        let existing = self.doctor_meetings(&doctor_email, auth_token).await?;
        check_create(&existing, &request.room_id, scheduled_time, now)?;

        let row = json!([{
            "id": Uuid::new_v4(),
            "room_id": request.room_id,
            "doctor_name": request.doctor_name,
            "patient_name": request.patient_name,
            "doctor_email": doctor_email,
            "patient_email": request.patient_email,
            "date": request.date,
            "time": request.time.trim(),
            "scheduled_time": scheduled_time,
            "created_at": now
        }]);

        let stored: Vec<Meeting> = self
            .supabase
            .insert_returning("/rest/v1/meetings", Some(auth_token), row)
            .await
            .map_err(|e| MeetingError::DatabaseError(e.to_string()))?;

        let meeting = stored
            .into_iter()
            .next()
            .ok_or_else(|| MeetingError::DatabaseError("Insert returned no row".to_string()))?;

        // Close the check-then-act window: whoever wrote later yields.
        let scope = self.doctor_meetings(&meeting.doctor_email, auth_token).await?;
        if let Some(conflict) = create_race_conflict(&meeting, &scope, Utc::now()) {
            warn!(
                "Meeting {} lost the scheduling race for room {}; rolling back",
                meeting.id, meeting.room_id
            );
            let path = format!("/rest/v1/meetings?id=eq.{}", meeting.id);
            if let Err(e) = self.supabase.delete(&path, Some(auth_token)).await {
                warn!("Rollback of meeting {} failed: {}", meeting.id, e);
            }
            return Err(conflict);
        }

        info!(
            "Meeting {} scheduled in room {} at {}",
            meeting.id, meeting.room_id, meeting.scheduled_time
        );
        Ok(meeting)
    }

    /// Move a meeting. Spacing is re-checked against the other meetings
    /// sharing the room id; on a lost race the previous schedule is
    /// restored.
    pub async fn reschedule(
        &self,
        doctor: &User,
        meeting_id: Uuid,
        request: RescheduleMeetingRequest,
        auth_token: &str,
    ) -> Result<Meeting, MeetingError> {
        let meeting = self.get_meeting(meeting_id, auth_token).await?;

        if meeting.doctor_email != doctor.email_or_empty() {
            return Err(MeetingError::Unauthorized);
        }

        let now = Utc::now();
        let new_time = combine(request.date, &request.time)?;
        if new_time <= now {
            return Err(MeetingError::InvalidTime(
                "Please select a future date and time".to_string(),
            ));
        }

        let room_scope = self.room_meetings(&meeting.room_id, auth_token).await?;
        check_reschedule(&room_scope, meeting.id, &meeting.room_id, new_time, now)?;

        let path = format!("/rest/v1/meetings?id=eq.{}", meeting.id);
        let updated: Vec<Meeting> = self
            .supabase
            .update_returning(
                &path,
                Some(auth_token),
                json!({
                    "date": request.date,
                    "time": request.time.trim(),
                    "scheduled_time": new_time
                }),
            )
            .await
            .map_err(|e| MeetingError::DatabaseError(e.to_string()))?;

        let moved = updated.into_iter().next().ok_or(MeetingError::NotFound)?;

        let scope = self.room_meetings(&moved.room_id, auth_token).await?;
        if reschedule_race_conflict(&moved, &scope, Utc::now()) {
            warn!(
                "Reschedule of meeting {} lost the race in room {}; restoring previous slot",
                moved.id, moved.room_id
            );
            if let Err(e) = self
                .supabase
                .update_returning::<Vec<Meeting>>(
                    &path,
                    Some(auth_token),
                    json!({
                        "date": meeting.date,
                        "time": meeting.time,
                        "scheduled_time": meeting.scheduled_time
                    }),
                )
                .await
            {
                warn!("Restore of meeting {} failed: {}", moved.id, e);
            }
            return Err(MeetingError::SpacingViolation);
        }

        info!("Meeting {} rescheduled to {}", moved.id, moved.scheduled_time);
        Ok(moved)
    }

    /// The join gate. A meeting swept away between listing and joining
    /// surfaces as not-found; an early join is answered with the wait.
    pub async fn join(
        &self,
        user: &User,
        room_id: &str,
        auth_token: &str,
    ) -> Result<JoinDecision, MeetingError> {
        let meeting = self.get_by_room(user, room_id, auth_token).await?;

        let now = Utc::now();
        if now < meeting.scheduled_time {
            return Ok(JoinDecision::TooEarly {
                scheduled_time: meeting.scheduled_time,
                wait_seconds: (meeting.scheduled_time - now).num_seconds(),
            });
        }

        let access = build_room_access(&self.config, room_id, user)?;
        Ok(JoinDecision::Proceed { meeting, access })
    }

    /// Meeting metadata resolved by room id, straight from the store.
    pub async fn get_by_room(
        &self,
        user: &User,
        room_id: &str,
        auth_token: &str,
    ) -> Result<Meeting, MeetingError> {
        let path = format!("/rest/v1/meetings?room_id=eq.{}", room_id);
        let rows: Vec<Meeting> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| MeetingError::DatabaseError(e.to_string()))?;

        let now = Utc::now();
        let meeting = rows
            .into_iter()
            .find(|m| !is_expired(m, now))
            .ok_or(MeetingError::NotFound)?;

        let email = user.email_or_empty();
        let allowed = user.has_role("admin")
            || meeting.doctor_email == email
            || meeting.patient_email == email;
        if !allowed {
            return Err(MeetingError::Unauthorized);
        }

        Ok(meeting)
    }

    async fn get_meeting(&self, id: Uuid, auth_token: &str) -> Result<Meeting, MeetingError> {
        let path = format!("/rest/v1/meetings?id=eq.{}", id);
        let rows: Vec<Meeting> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| MeetingError::DatabaseError(e.to_string()))?;

        rows.into_iter().next().ok_or(MeetingError::NotFound)
    }

    async fn doctor_meetings(
        &self,
        doctor_email: &str,
        auth_token: &str,
    ) -> Result<Vec<Meeting>, MeetingError> {
        let path = format!("/rest/v1/meetings?doctor_email=eq.{}", doctor_email);
        self.supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| MeetingError::DatabaseError(e.to_string()))
    }

    async fn room_meetings(
        &self,
        room_id: &str,
        auth_token: &str,
    ) -> Result<Vec<Meeting>, MeetingError> {
        let path = format!("/rest/v1/meetings?room_id=eq.{}", room_id);
        self.supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| MeetingError::DatabaseError(e.to_string()))
    }
}

fn validate_create(request: &CreateMeetingRequest) -> Result<(), MeetingError> {
    for (field, value) in [
        ("room_id", &request.room_id),
        ("doctor_name", &request.doctor_name),
        ("patient_name", &request.patient_name),
        ("patient_email", &request.patient_email),
        ("time", &request.time),
    ] {
        if value.trim().is_empty() {
            return Err(MeetingError::ValidationError(format!(
                "Please fill in all fields: '{}' is empty",
                field
            )));
        }
    }

    debug!("Create request for room {} validated", request.room_id);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use chrono::NaiveDate;

    fn request() -> CreateMeetingRequest {
        CreateMeetingRequest {
            room_id: "room-1".to_string(),
            doctor_name: "Dr. Asha Rao".to_string(),
            patient_name: "Ravi Kumar".to_string(),
            patient_email: "ravi@example.com".to_string(),
            date: NaiveDate::from_ymd_opt(2031, 6, 10).unwrap(),
            time: "14:30".to_string(),
        }
    }

    #[test]
    fn accepts_complete_request() {
        assert!(validate_create(&request()).is_ok());
    }

    #[test]
    fn rejects_any_blank_field() {
        let mut r = request();
        r.room_id = "".to_string();
        assert_matches!(validate_create(&r), Err(MeetingError::ValidationError(_)));

        let mut r = request();
        r.patient_name = "   ".to_string();
        assert_matches!(validate_create(&r), Err(MeetingError::ValidationError(_)));
    }
}
