use anyhow::Context;
use ofac_agent::{logging, AgentConfig, ChromeSearchDriver, PgStore};
use screening_core::run_batch;
use tracing::{error, info};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    // Load configuration
    let config = AgentConfig::from_env().context("Failed to load configuration")?;
    config.validate().context("Invalid configuration")?;

    let _log_guard = logging::init(&config.logging).context("Failed to initialize logging")?;
    config.ensure_directories()?;

    info!("--- OFAC Background Check Automation Started ---");
    info!(
        search_url = %config.browser.search_url,
        reports_dir = %config.screening.reports_dir.display(),
        "Configuration loaded"
    );

    let outcome = run_batch(
        &config.screening,
        PgStore::connect(&config.database),
        || ChromeSearchDriver::launch(&config.browser),
    )
    .await;

    match outcome {
        Ok(outcome) => {
            let summary = &outcome.summary;
            if summary.unpersisted() > 0 {
                error!(count = summary.unpersisted(), "Some results could not be recorded");
            }
            match &outcome.report {
                Some(report) => info!(
                    path = %report.file_path.display(),
                    persons = report.person_count,
                    "Report generated"
                ),
                None => info!("No report generated"),
            }
            if summary.nothing_recorded() {
                error!("--- OFAC Background Check Automation Failed: no result was recorded ---");
                anyhow::bail!(
                    "none of the {} results could be written to the results table",
                    summary.total()
                );
            }
            info!("--- OFAC Background Check Automation Finished ---");
            Ok(())
        }
        Err(e) => {
            error!(error = %e, "--- OFAC Background Check Automation Failed ---");
            Err(e.into())
        }
    }
}
