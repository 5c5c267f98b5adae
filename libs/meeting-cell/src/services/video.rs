use tracing::debug;

use shared_config::AppConfig;
use shared_models::auth::User;
use shared_utils::jwt::sign_payload;

use crate::models::{MeetingError, VideoRoomAccess};

/// Mint the signed room credential and shareable link the conferencing
/// widget consumes. The token binds app, room and participant identity;
/// the SDK side verifies it against the same app secret.
pub fn build_room_access(
    config: &AppConfig,
    room_id: &str,
    participant: &User,
) -> Result<VideoRoomAccess, MeetingError> {
    if !config.is_video_conferencing_configured() {
        return Err(MeetingError::VideoNotConfigured);
    }

    let identity = participant.email_or_empty();
    let payload = format!("{}:{}:{}", config.video_app_id, room_id, identity);
    let room_token = sign_payload(&payload, &config.video_app_secret)
        .map_err(MeetingError::DatabaseError)?;

    let join_url = format!("{}/{}", config.video_join_base_url.trim_end_matches('/'), room_id);

    debug!("Issued room token for {} in room {}", identity, room_id);

    Ok(VideoRoomAccess {
        room_id: room_id.to_string(),
        join_url,
        room_token,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_utils::test_utils::{TestConfig, TestUser};

    #[test]
    fn issues_deterministic_token_per_room_and_user() {
        let config = TestConfig::default().to_app_config();
        let user = TestUser::patient("ravi@example.com").to_user();

        let a = build_room_access(&config, "room-1", &user).unwrap();
        let b = build_room_access(&config, "room-1", &user).unwrap();
        let c = build_room_access(&config, "room-2", &user).unwrap();

        assert_eq!(a.room_token, b.room_token);
        assert_ne!(a.room_token, c.room_token);
        assert!(a.join_url.ends_with("/room-1"));
    }

    #[test]
    fn refuses_without_video_credentials() {
        let mut config = TestConfig::default().to_app_config();
        config.video_app_secret = String::new();
        let user = TestUser::patient("ravi@example.com").to_user();

        assert!(matches!(
            build_room_access(&config, "room-1", &user),
            Err(MeetingError::VideoNotConfigured)
        ));
    }
}
