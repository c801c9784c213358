use tracing::{info, warn};

use crate::categorizer::Categorized;
use crate::error::StoreError;
use crate::settings::StatusCodes;
use crate::store::{persist, PersonStore};
use crate::types::{PersonResult, PersonStatus};

/// Record a status for every person that cannot be searched
pub async fn process_pre_checks<S: PersonStore>(
    store: &mut S,
    codes: &StatusCodes,
    batch: &Categorized<'_>,
) -> Result<Vec<PersonResult>, StoreError> {
    let gaps = batch
        .incomplete
        .iter()
        .map(|(person, missing)| (*person, missing, PersonStatus::Incomplete))
        .chain(
            batch
                .missing_master
                .iter()
                .map(|(person, missing)| (*person, missing, PersonStatus::MissingMasterData)),
        );

    let mut results = Vec::with_capacity(batch.incomplete.len() + batch.missing_master.len());
    for (person, missing, status) in gaps {
        let mut result = PersonResult::data_gap(person, status, missing.clone());
        warn!(
            person_id = %person.id,
            name = %person.name,
            status = %status,
            missing = %result.missing_summary(),
            "Person not searchable"
        );
        persist(store, codes, &mut result).await?;
        results.push(result);
    }

    if !results.is_empty() {
        let written = results.iter().filter(|r| r.persisted).count();
        info!(total = results.len(), written, "Pre-checked records recorded");
    }

    Ok(results)
}
