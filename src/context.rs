use axum::http::HeaderMap;

use crate::{
    config::AppConfig,
    database::Database,
    error::ReportError,
    models::Company,
};

/// Explicit per-request context for the report pipeline: the acting company
/// and the base URL used for links in the rendered document.
#[derive(Debug, Clone)]
pub struct ReportContext {
    pub company: Company,
    pub base_url: String,
}

impl ReportContext {
    pub async fn build(
        db: &Database,
        config: &AppConfig,
        headers: &HeaderMap,
    ) -> Result<Self, ReportError> {
        let company = sqlx::query_as::<_, Company>("SELECT * FROM companies WHERE id = $1")
            .bind(config.company_id)
            .fetch_optional(db)
            .await?
            .ok_or(ReportError::CompanyMissing(config.company_id))?;

        Ok(Self {
            company,
            base_url: base_url(config, headers),
        })
    }
}

/// The configured BASE_URL wins; otherwise the URL is composed from the
/// forwarded scheme and the Host header of the current request.
pub fn base_url(config: &AppConfig, headers: &HeaderMap) -> String {
    if let Some(url) = &config.base_url {
        return url.trim_end_matches('/').to_string();
    }

    let scheme = headers
        .get("x-forwarded-proto")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("http");
    let host = headers
        .get("host")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("localhost");

    format!("{}://{}", scheme, host)
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn config(base: Option<&str>) -> AppConfig {
        AppConfig {
            company_id: Uuid::nil(),
            base_url: base.map(str::to_string),
        }
    }

    #[test]
    fn configured_base_url_wins_and_is_trimmed() {
        let headers = HeaderMap::new();
        assert_eq!(
            base_url(&config(Some("https://erp.example.com/")), &headers),
            "https://erp.example.com"
        );
    }

    #[test]
    fn base_url_falls_back_to_request_headers() {
        let mut headers = HeaderMap::new();
        headers.insert("host", "erp.example.com:8443".parse().unwrap());
        headers.insert("x-forwarded-proto", "https".parse().unwrap());
        assert_eq!(
            base_url(&config(None), &headers),
            "https://erp.example.com:8443"
        );
    }

    #[test]
    fn base_url_defaults_without_headers() {
        let headers = HeaderMap::new();
        assert_eq!(base_url(&config(None), &headers), "http://localhost");
    }
}
