use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AnalyticsError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid report parameter: {0}")]
    InvalidInput(String),
}
