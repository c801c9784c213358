use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

use crate::error::ClassificationError;

/// Primary key of a person in the intake tables
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PersonId(pub i64);

impl fmt::Display for PersonId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Master detail joined onto a person. Absent when the person has no row in
/// the master table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MasterRecord {
    pub master_id: i64,
    pub address: Option<String>,
    pub country: Option<String>,
}

/// A person pending an OFAC check
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Person {
    pub id: PersonId,
    pub name: String,
    pub master: Option<MasterRecord>,
}

impl Person {
    /// Country from the master record, if any
    pub fn country(&self) -> Option<&str> {
        self.master.as_ref().and_then(|m| m.country.as_deref())
    }
}

/// Status a person ends a run with. A loaded person has none until it is
/// categorized, so there is no pending variant to leak into storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PersonStatus {
    Incomplete,
    MissingMasterData,
    SearchedNoMatch,
    SearchedMatch,
    SearchError,
}

impl PersonStatus {
    /// Every status, in report order
    pub const FINAL: [PersonStatus; 5] = [
        PersonStatus::SearchedMatch,
        PersonStatus::SearchedNoMatch,
        PersonStatus::SearchError,
        PersonStatus::Incomplete,
        PersonStatus::MissingMasterData,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            PersonStatus::Incomplete => "Incomplete",
            PersonStatus::MissingMasterData => "Missing master data",
            PersonStatus::SearchedNoMatch => "Searched - no match",
            PersonStatus::SearchedMatch => "Searched - match",
            PersonStatus::SearchError => "Search error",
        }
    }

    pub fn is_data_gap(&self) -> bool {
        matches!(self, PersonStatus::Incomplete | PersonStatus::MissingMasterData)
    }
}

impl fmt::Display for PersonStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Field whose absence keeps a person out of the search queue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MissingField {
    MasterRecord,
    Name,
    Address,
    Country,
}

impl MissingField {
    pub fn as_str(&self) -> &'static str {
        match self {
            MissingField::MasterRecord => "master record",
            MissingField::Name => "name",
            MissingField::Address => "address",
            MissingField::Country => "country",
        }
    }
}

impl fmt::Display for MissingField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Validated search form input. Only the categorizer builds these.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchQuery {
    pub person_id: PersonId,
    pub name: String,
    pub address: String,
    pub country: String,
}

impl SearchQuery {
    pub(crate) fn new(person_id: PersonId, name: &str, address: &str, country: &str) -> Self {
        Self {
            person_id,
            name: name.trim().to_string(),
            address: address.trim().to_string(),
            country: country.trim().to_string(),
        }
    }
}

/// Interpretation of one results page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Verdict {
    NoMatch,
    Match { hits: u32 },
    Error { reason: ClassificationError },
}

impl Verdict {
    /// A match must be backed by a screenshot of the results view
    pub fn requires_evidence(&self) -> bool {
        matches!(self, Verdict::Match { .. })
    }

    pub fn status(&self) -> PersonStatus {
        match self {
            Verdict::NoMatch => PersonStatus::SearchedNoMatch,
            Verdict::Match { .. } => PersonStatus::SearchedMatch,
            Verdict::Error { .. } => PersonStatus::SearchError,
        }
    }

    /// Result count column value; none for errors
    pub fn hit_count(&self) -> Option<u32> {
        match self {
            Verdict::NoMatch => Some(0),
            Verdict::Match { hits } => Some(*hits),
            Verdict::Error { .. } => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchOutcome {
    pub verdict: Verdict,
    pub evidence: Option<PathBuf>,
    pub searched_at: DateTime<Utc>,
}

impl SearchOutcome {
    pub fn new(verdict: Verdict) -> Self {
        Self {
            verdict,
            evidence: None,
            searched_at: Utc::now(),
        }
    }
}

/// What happened to one person during a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersonResult {
    pub person_id: PersonId,
    pub name: String,
    pub country: Option<String>,
    pub status: PersonStatus,
    pub missing: Vec<MissingField>,
    pub outcome: Option<SearchOutcome>,
    pub persisted: bool,
}

impl PersonResult {
    pub fn data_gap(person: &Person, status: PersonStatus, missing: Vec<MissingField>) -> Self {
        Self {
            person_id: person.id,
            name: person.name.clone(),
            country: person.country().map(str::to_string),
            status,
            missing,
            outcome: None,
            persisted: false,
        }
    }

    pub fn searched(query: &SearchQuery, outcome: SearchOutcome) -> Self {
        Self {
            person_id: query.person_id,
            name: query.name.clone(),
            country: Some(query.country.clone()),
            status: outcome.verdict.status(),
            missing: Vec::new(),
            outcome: Some(outcome),
            persisted: false,
        }
    }

    pub fn hit_count(&self) -> Option<u32> {
        self.outcome.as_ref().and_then(|o| o.verdict.hit_count())
    }

    pub fn evidence(&self) -> Option<&PathBuf> {
        self.outcome.as_ref().and_then(|o| o.evidence.as_ref())
    }

    pub fn missing_summary(&self) -> String {
        self.missing
            .iter()
            .map(MissingField::as_str)
            .collect::<Vec<_>>()
            .join(", ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verdict_status_mapping() {
        assert_eq!(Verdict::NoMatch.status(), PersonStatus::SearchedNoMatch);
        assert_eq!(Verdict::Match { hits: 2 }.status(), PersonStatus::SearchedMatch);
        assert_eq!(
            Verdict::Error { reason: ClassificationError::EmptyContent }.status(),
            PersonStatus::SearchError
        );
    }

    #[test]
    fn test_only_match_requires_evidence() {
        assert!(Verdict::Match { hits: 1 }.requires_evidence());
        assert!(!Verdict::NoMatch.requires_evidence());
        assert!(!Verdict::Error { reason: ClassificationError::EmptyContent }.requires_evidence());
    }

    #[test]
    fn test_final_covers_every_status() {
        let mut sorted = PersonStatus::FINAL.to_vec();
        sorted.sort();
        sorted.dedup();
        assert_eq!(sorted.len(), 5);
    }

    #[test]
    fn test_search_query_trims_fields() {
        let query = SearchQuery::new(PersonId(7), "  Jane Doe ", " 1 Main St", "United States ");
        assert_eq!(query.name, "Jane Doe");
        assert_eq!(query.address, "1 Main St");
        assert_eq!(query.country, "United States");
    }
}
