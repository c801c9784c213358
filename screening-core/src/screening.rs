use std::time::Duration;
use tokio::time::timeout;
use tracing::{error, info, warn};

use crate::classifier::ResultClassifier;
use crate::driver::SearchDriver;
use crate::error::{ClassificationError, Result, SearchError, SettingsError};
use crate::settings::{ScreeningSettings, StatusCodes};
use crate::store::{persist, PersonStore};
use crate::types::{PersonResult, SearchOutcome, SearchQuery, Verdict};

/// Runs sanctions searches for searchable persons, one at a time
pub struct Screener {
    classifier: ResultClassifier,
    search_timeout: Duration,
    codes: StatusCodes,
}

impl Screener {
    pub fn new(settings: &ScreeningSettings) -> std::result::Result<Self, SettingsError> {
        Ok(Self {
            classifier: ResultClassifier::new(&settings.selectors)?,
            search_timeout: Duration::from_secs(settings.search_timeout_secs),
            codes: settings.status_codes.clone(),
        })
    }

    /// Search one person. Record-level failures become an error verdict; only
    /// a lost browser session is returned as an error.
    pub async fn screen<D: SearchDriver>(
        &self,
        driver: &mut D,
        query: &SearchQuery,
    ) -> std::result::Result<SearchOutcome, SearchError> {
        let submitted = match timeout(self.search_timeout, driver.submit_query(query)).await {
            Ok(result) => result,
            Err(_) => Err(SearchError::Timeout(self.search_timeout.as_secs())),
        };

        let verdict = match submitted {
            Ok(content) => self.classifier.classify(&content),
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                error!(person_id = %query.person_id, name = %query.name, error = %e, "Search failed");
                Verdict::Error {
                    reason: ClassificationError::SearchFailed(e.to_string()),
                }
            }
        };

        let mut outcome = SearchOutcome::new(verdict);
        if outcome.verdict.requires_evidence() {
            let captured = match timeout(self.search_timeout, driver.capture_evidence(query.person_id)).await {
                Ok(result) => result,
                Err(_) => Err(SearchError::Evidence(format!(
                    "timed out after {}s",
                    self.search_timeout.as_secs()
                ))),
            };
            match captured {
                Ok(path) => {
                    info!(person_id = %query.person_id, path = %path.display(), "Evidence captured");
                    outcome.evidence = Some(path);
                }
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    error!(person_id = %query.person_id, error = %e, "Failed to capture evidence");
                }
            }
        }

        Ok(outcome)
    }

    /// Search every queued person and record each outcome as soon as it is known
    pub async fn screen_batch<S: PersonStore, D: SearchDriver>(
        &self,
        store: &mut S,
        driver: &mut D,
        queue: &[SearchQuery],
    ) -> Result<Vec<PersonResult>> {
        if queue.is_empty() {
            info!("Search queue is empty. No OFAC checks to perform.");
            return Ok(Vec::new());
        }

        let mut results = Vec::with_capacity(queue.len());
        for (index, query) in queue.iter().enumerate() {
            info!(
                person_id = %query.person_id,
                name = %query.name,
                position = index + 1,
                total = queue.len(),
                "Processing person"
            );

            let outcome = match self.screen(driver, query).await {
                Ok(outcome) => outcome,
                Err(e) => {
                    error!(
                        person_id = %query.person_id,
                        remaining = queue.len() - index,
                        error = %e,
                        "Browser session lost, stopping searches"
                    );
                    return Err(e.into());
                }
            };
            let mut result = PersonResult::searched(query, outcome);

            match result.hit_count() {
                Some(0) => info!(person_id = %query.person_id, "No match"),
                Some(hits) => warn!(person_id = %query.person_id, hits, "Sanctions list match"),
                None => {}
            }

            persist(store, &self.codes, &mut result).await?;
            results.push(result);
        }

        Ok(results)
    }
}
