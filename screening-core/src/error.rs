use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Why a results page could not be read as a match or a clean result
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ClassificationError {
    #[error("Results page is empty")]
    EmptyContent,

    #[error("Platform reported an error: {0}")]
    PlatformError(String),

    #[error("Unexpected results layout: {0}")]
    UnexpectedLayout(String),

    #[error("Unparseable result count: {0}")]
    Unparseable(String),

    #[error("Search failed: {0}")]
    SearchFailed(String),
}

/// Per-record failures talking to the search platform
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SearchError {
    #[error("Navigation failed: {0}")]
    Navigation(String),

    #[error("Element not found: {0}")]
    ElementNotFound(String),

    #[error("Timed out after {0}s waiting for results")]
    Timeout(u64),

    #[error("Browser error: {0}")]
    Browser(String),

    #[error("Evidence capture failed: {0}")]
    Evidence(String),

    /// The browser process or its CDP connection is gone. Fatal to the run.
    #[error("Browser session lost: {0}")]
    SessionLost(String),
}

impl SearchError {
    pub fn is_fatal(&self) -> bool {
        matches!(self, SearchError::SessionLost(_))
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum StoreError {
    /// Connection lost or never established. Fatal to the run.
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// A single statement failed. The record is skipped.
    #[error("Store write failed: {0}")]
    Write(String),

    #[error("Store query failed: {0}")]
    Query(String),
}

impl StoreError {
    pub fn is_fatal(&self) -> bool {
        !matches!(self, StoreError::Write(_))
    }
}

#[derive(Error, Debug)]
pub enum ReportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Spreadsheet error: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SettingsError {
    #[error("Invalid selector `{selector}` for {field}")]
    InvalidSelector { field: &'static str, selector: String },

    #[error("Invalid setting: {0}")]
    Invalid(String),
}

/// Errors that abort a run
#[derive(Error, Debug)]
pub enum RunError {
    #[error("Persistence failure: {0}")]
    Store(#[from] StoreError),

    #[error("Browser session failure: {0}")]
    Driver(#[from] SearchError),

    #[error("Report generation failed: {0}")]
    Report(#[from] ReportError),

    #[error("Configuration error: {0}")]
    Settings(#[from] SettingsError),
}

pub type Result<T> = std::result::Result<T, RunError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_write_failures_are_recoverable() {
        assert!(!StoreError::Write("constraint".into()).is_fatal());
        assert!(StoreError::Unavailable("reset".into()).is_fatal());
        assert!(StoreError::Query("syntax".into()).is_fatal());
    }

    #[test]
    fn test_only_lost_session_ends_a_run() {
        assert!(SearchError::SessionLost("handler exited".into()).is_fatal());
        assert!(!SearchError::Browser("click failed".into()).is_fatal());
        assert!(!SearchError::Timeout(70).is_fatal());
        assert!(!SearchError::ElementNotFound("#btn".into()).is_fatal());
    }
}
