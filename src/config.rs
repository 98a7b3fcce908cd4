use std::env;
use uuid::Uuid;

/// Settings read once from the environment at startup. The acting company
/// and the public base URL are configuration, not per-request state.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub company_id: Uuid,
    pub base_url: Option<String>,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let company_id = env::var("COMPANY_ID")
            .expect("COMPANY_ID must be set");
        let company_id = Uuid::parse_str(&company_id)
            .expect("COMPANY_ID must be a valid UUID");

        // When unset, the base URL is composed from the request headers instead
        let base_url = env::var("BASE_URL")
            .ok()
            .filter(|url| !url.trim().is_empty());

        Self {
            company_id,
            base_url,
        }
    }
}
