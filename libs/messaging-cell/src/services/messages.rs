use chrono::Utc;
use reqwest::Method;
use serde_json::json;
use tracing::{debug, info};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;
use shared_models::auth::User;

use crate::models::{ContactMessage, MessageFilter, MessagingError, SubmitMessageRequest};

pub struct MessagingService {
    supabase: SupabaseClient,
}

impl MessagingService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    pub async fn submit(
        &self,
        user: &User,
        request: SubmitMessageRequest,
        auth_token: &str,
    ) -> Result<ContactMessage, MessagingError> {
        for (field, value) in [
            ("name", &request.name),
            ("email", &request.email),
            ("message", &request.message),
        ] {
            if value.trim().is_empty() {
                return Err(MessagingError::ValidationError(format!(
                    "Please fill out all fields: '{}' is empty",
                    field
                )));
            }
        }

        let role = user.role.clone().ok_or_else(|| {
            MessagingError::ValidationError("Principal has no role".to_string())
        })?;

        let row = json!([{
            "id": Uuid::new_v4(),
            "name": request.name.trim(),
            "email": request.email.trim(),
            "message": request.message.trim(),
            "role": role,
            "timestamp": Utc::now()
        }]);

        let stored: Vec<ContactMessage> = self
            .supabase
            .insert_returning("/rest/v1/messages", Some(auth_token), row)
            .await
            .map_err(|e| MessagingError::DatabaseError(e.to_string()))?;

        let message = stored
            .into_iter()
            .next()
            .ok_or_else(|| MessagingError::DatabaseError("Insert returned no row".to_string()))?;

        info!("Contact message {} received from {}", message.id, message.email);
        Ok(message)
    }

    /// Full inbox, filtered in memory the way the admin page filters its
    /// subscription feed.
    pub async fn list(
        &self,
        filter: MessageFilter,
        auth_token: &str,
    ) -> Result<Vec<ContactMessage>, MessagingError> {
        debug!("Listing messages with filter {:?}", filter);

        let messages: Vec<ContactMessage> = self
            .supabase
            .request(
                Method::GET,
                "/rest/v1/messages?order=timestamp.desc",
                Some(auth_token),
                None,
            )
            .await
            .map_err(|e| MessagingError::DatabaseError(e.to_string()))?;

        Ok(messages
            .into_iter()
            .filter(|m| filter.matches(&m.role))
            .collect())
    }

    /// Idempotent: deleting an already-deleted message succeeds.
    pub async fn delete(&self, id: Uuid, auth_token: &str) -> Result<(), MessagingError> {
        let path = format!("/rest/v1/messages?id=eq.{}", id);
        self.supabase
            .delete(&path, Some(auth_token))
            .await
            .map_err(|e| MessagingError::DatabaseError(e.to_string()))?;

        info!("Message {} deleted", id);
        Ok(())
    }
}
