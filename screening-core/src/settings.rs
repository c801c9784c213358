//! Settings consumed by the screening core

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::SettingsError;
use crate::types::PersonStatus;

/// Core screening settings, built once at startup and passed by reference
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScreeningSettings {
    /// Upper bound for one query submission, including the results wait
    pub search_timeout_secs: u64,

    /// Directory receiving the run report
    pub reports_dir: PathBuf,

    /// Status codes written to the results table
    pub status_codes: StatusCodes,

    /// Structural selectors for the results page
    pub selectors: ClassifierSelectors,
}

impl Default for ScreeningSettings {
    fn default() -> Self {
        Self {
            search_timeout_secs: 70,
            reports_dir: PathBuf::from("reports"),
            status_codes: StatusCodes::default(),
            selectors: ClassifierSelectors::default(),
        }
    }
}

impl ScreeningSettings {
    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.search_timeout_secs == 0 {
            return Err(SettingsError::Invalid(
                "search_timeout_secs must be positive".to_string(),
            ));
        }
        self.status_codes.validate()?;
        self.selectors.validate()
    }
}

/// Storage codes per status
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StatusCodes {
    pub incomplete: String,
    pub missing_master_data: String,
    pub no_match: String,
    pub matched: String,
    pub search_error: String,
}

impl Default for StatusCodes {
    fn default() -> Self {
        Self {
            incomplete: "Información incompleta".to_string(),
            missing_master_data: "No cruza con maestra".to_string(),
            // Match and no-match share a code; the result count tells them apart
            no_match: "OK".to_string(),
            matched: "OK".to_string(),
            search_error: "NOK".to_string(),
        }
    }
}

impl StatusCodes {
    pub fn code(&self, status: PersonStatus) -> &str {
        match status {
            PersonStatus::Incomplete => &self.incomplete,
            PersonStatus::MissingMasterData => &self.missing_master_data,
            PersonStatus::SearchedNoMatch => &self.no_match,
            PersonStatus::SearchedMatch => &self.matched,
            PersonStatus::SearchError => &self.search_error,
        }
    }

    fn validate(&self) -> Result<(), SettingsError> {
        let blank = PersonStatus::FINAL
            .iter()
            .find(|s| self.code(**s).trim().is_empty());
        match blank {
            Some(status) => Err(SettingsError::Invalid(format!(
                "status code for '{}' is empty",
                status
            ))),
            None => Ok(()),
        }
    }
}

/// CSS selectors locating the structural parts of the results view
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierSelectors {
    /// Label carrying the hit count ("Lookup Results: N Found")
    pub results_label: String,
    /// Results grid; data rows are `tr` elements containing `td`
    pub results_table: String,
    /// Explicit empty-result indicator
    pub no_records: String,
    /// Platform-side error banner
    pub error_banner: String,
}

impl Default for ClassifierSelectors {
    fn default() -> Self {
        Self {
            results_label: "#ctl00_MainContent_lblResults".to_string(),
            results_table: "#gvSearchResults".to_string(),
            no_records: "#ctl00_MainContent_lblNoResults, .no-records".to_string(),
            error_banner: "#ctl00_MainContent_lblError, .error-message, .alert-danger".to_string(),
        }
    }
}

impl ClassifierSelectors {
    pub fn validate(&self) -> Result<(), SettingsError> {
        for (field, selector) in self.fields() {
            scraper::Selector::parse(selector).map_err(|_| SettingsError::InvalidSelector {
                field,
                selector: selector.to_string(),
            })?;
        }
        Ok(())
    }

    pub(crate) fn fields(&self) -> [(&'static str, &str); 4] {
        [
            ("results_label", self.results_label.as_str()),
            ("results_table", self.results_table.as_str()),
            ("no_records", self.no_records.as_str()),
            ("error_banner", self.error_banner.as_str()),
        ]
    }
}
