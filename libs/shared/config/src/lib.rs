use std::env;
use tracing::warn;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub supabase_url: String,
    pub supabase_anon_key: String,
    pub supabase_service_role_key: String,
    pub supabase_jwt_secret: String,
    pub video_app_id: String,
    pub video_app_secret: String,
    pub video_join_base_url: String,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let config = Self {
            supabase_url: env::var("SUPABASE_URL")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_URL not set, using empty value");
                    String::new()
                }),
            supabase_anon_key: env::var("SUPABASE_ANON_PUBLIC_KEY")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_ANON_PUBLIC_KEY not set, using empty value");
                    String::new()
                }),
            supabase_service_role_key: env::var("SUPABASE_SERVICE_ROLE_KEY")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_SERVICE_ROLE_KEY not set, using empty value");
                    String::new()
                }),
            supabase_jwt_secret: env::var("SUPABASE_JWT_SECRET")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_JWT_SECRET not set, using empty value");
                    String::new()
                }),
            video_app_id: env::var("VIDEO_APP_ID")
                .unwrap_or_else(|_| {
                    warn!("VIDEO_APP_ID not set, using empty value");
                    String::new()
                }),
            video_app_secret: env::var("VIDEO_APP_SECRET")
                .unwrap_or_else(|_| {
                    warn!("VIDEO_APP_SECRET not set, using empty value");
                    String::new()
                }),
            video_join_base_url: env::var("VIDEO_JOIN_BASE_URL")
                .unwrap_or_else(|_| {
                    warn!("VIDEO_JOIN_BASE_URL not set, using default");
                    "https://meet.portal.local/room".to_string()
                }),
        };

        if !config.is_configured() {
            warn!("Application not fully configured - missing environment variables");
        }

        config
    }

    pub fn is_configured(&self) -> bool {
        !self.supabase_url.is_empty()
            && !self.supabase_anon_key.is_empty()
            && !self.supabase_jwt_secret.is_empty()
    }

    /// The expiry sweeper runs without a user session and needs the
    /// service-role credential.
    pub fn is_sweeper_configured(&self) -> bool {
        self.is_configured() && !self.supabase_service_role_key.is_empty()
    }

    pub fn is_video_conferencing_configured(&self) -> bool {
        !self.video_app_id.is_empty()
            && !self.video_app_secret.is_empty()
            && !self.video_join_base_url.is_empty()
    }
}
