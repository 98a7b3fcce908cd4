use axum::http::StatusCode;
use thiserror::Error;
use uuid::Uuid;

/// Failures of the report pipeline. Handlers log these and translate them
/// into plain HTTP statuses via `status()`.
#[derive(Debug, Error)]
pub enum ReportError {
    #[error("no production location is configured")]
    ProductionLocationMissing,

    #[error("expected exactly one production location, found {0}")]
    ProductionLocationAmbiguous(usize),

    #[error("company {0} is not configured")]
    CompanyMissing(Uuid),

    #[error("product not found")]
    ProductNotFound,

    #[error("lot not found")]
    LotNotFound,

    #[error("from_date and to_date require each other")]
    HalfOpenDateRange,

    #[error("invalid {0} parameter")]
    InvalidParameter(&'static str),

    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

impl ReportError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::ProductNotFound | Self::LotNotFound => StatusCode::NOT_FOUND,
            Self::HalfOpenDateRange | Self::InvalidParameter(_) => StatusCode::BAD_REQUEST,
            Self::ProductionLocationMissing
            | Self::ProductionLocationAmbiguous(_)
            | Self::CompanyMissing(_)
            | Self::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}
