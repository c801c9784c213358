//! Run sequencing and resource lifetime
//!
//! Opens the store, then the browser, runs one pass over the pending persons,
//! writes the report and releases both resources on every exit path.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::future::Future;
use tracing::{error, info, warn};

use crate::categorizer::categorize_all;
use crate::driver::SearchDriver;
use crate::error::{Result, SearchError, StoreError};
use crate::precheck::process_pre_checks;
use crate::report_generator::{ReportConfig, ReportGenerator, ReportMetadata, RunSummary};
use crate::screening::Screener;
use crate::settings::ScreeningSettings;
use crate::store::PersonStore;
use crate::types::{PersonId, PersonStatus};

#[derive(Debug)]
pub struct RunOutcome {
    pub summary: RunSummary,
    /// None when there was nothing to report
    pub report: Option<ReportMetadata>,
}

/// Execute one batch run.
///
/// `launch_driver` is only invoked once the store is open, so a store failure
/// never leaves a browser behind.
pub async fn run_batch<S, D, SF, DF, DFut>(
    settings: &ScreeningSettings,
    connect_store: SF,
    launch_driver: DF,
) -> Result<RunOutcome>
where
    S: PersonStore,
    D: SearchDriver,
    SF: Future<Output = std::result::Result<S, StoreError>>,
    DF: FnOnce() -> DFut,
    DFut: Future<Output = std::result::Result<D, SearchError>>,
{
    settings.validate()?;
    let screener = Screener::new(settings)?;
    let started_at = Utc::now();

    let mut store = match connect_store.await {
        Ok(store) => store,
        Err(e) => {
            error!(error = %e, "Could not connect to the database");
            return Err(e.into());
        }
    };
    info!("Database connection established");

    let mut driver = match launch_driver().await {
        Ok(driver) => driver,
        Err(e) => {
            error!(error = %e, "Could not start the browser session");
            store.close().await;
            return Err(e.into());
        }
    };
    info!("Browser session started");

    let outcome = run_pipeline(settings, &screener, &mut store, &mut driver, started_at).await;
    if let Err(e) = &outcome {
        error!(error = %e, "Run aborted");
    }

    if let Err(e) = driver.close().await {
        warn!(error = %e, "Browser session did not close cleanly");
    } else {
        info!("Browser session closed");
    }
    store.close().await;
    info!("Database connection closed");

    outcome
}

async fn run_pipeline<S: PersonStore, D: SearchDriver>(
    settings: &ScreeningSettings,
    screener: &Screener,
    store: &mut S,
    driver: &mut D,
    started_at: DateTime<Utc>,
) -> Result<RunOutcome> {
    let persons = store.fetch_pending().await?;
    if persons.is_empty() {
        info!("No persons found flagged for an OFAC check");
        return Ok(RunOutcome {
            summary: RunSummary::new(started_at, Vec::new()),
            report: None,
        });
    }
    info!(count = persons.len(), "Loaded pending persons");

    let batch = categorize_all(&persons);
    let mut results = process_pre_checks(store, &settings.status_codes, &batch).await?;
    results.extend(screener.screen_batch(store, driver, &batch.search_queue).await?);

    let mut order: HashMap<PersonId, usize> = HashMap::new();
    for (index, person) in persons.iter().enumerate() {
        order.entry(person.id).or_insert(index);
    }
    results.sort_by_key(|r| order.get(&r.person_id).copied().unwrap_or(usize::MAX));

    let summary = RunSummary::new(started_at, results);
    info!(
        total = summary.total(),
        matches = summary.count(PersonStatus::SearchedMatch),
        clean = summary.count(PersonStatus::SearchedNoMatch),
        errors = summary.count(PersonStatus::SearchError),
        incomplete = summary.count(PersonStatus::Incomplete),
        missing_master = summary.count(PersonStatus::MissingMasterData),
        "Run complete"
    );

    let generator = ReportGenerator::new(
        ReportConfig {
            output_dir: settings.reports_dir.clone(),
        },
        settings.status_codes.clone(),
    )?;
    let report = generator.generate(&summary)?;

    Ok(RunOutcome {
        summary,
        report: Some(report),
    })
}
