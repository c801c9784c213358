use tracing::info;

use crate::types::{MissingField, Person, PersonStatus, SearchQuery};

/// Where a person goes before any search is attempted
#[derive(Debug, Clone, PartialEq)]
pub enum Category {
    Searchable(SearchQuery),
    Incomplete { missing: Vec<MissingField> },
    MissingMasterData { missing: Vec<MissingField> },
}

impl Category {
    /// Status assigned without searching, if any
    pub fn precheck_status(&self) -> Option<PersonStatus> {
        match self {
            Category::Searchable(_) => None,
            Category::Incomplete { .. } => Some(PersonStatus::Incomplete),
            Category::MissingMasterData { .. } => Some(PersonStatus::MissingMasterData),
        }
    }
}

fn is_blank(value: Option<&str>) -> bool {
    value.map_or(true, |v| v.trim().is_empty())
}

/// Classify one person. Missing master data wins over an incomplete address.
pub fn categorize(person: &Person) -> Category {
    let mut master_gaps = Vec::new();
    if person.master.is_none() {
        master_gaps.push(MissingField::MasterRecord);
    }
    if person.name.trim().is_empty() {
        master_gaps.push(MissingField::Name);
    }

    let address = person.master.as_ref().and_then(|m| m.address.as_deref());
    let country = person.master.as_ref().and_then(|m| m.country.as_deref());

    let mut location_gaps = Vec::new();
    if person.master.is_some() {
        if is_blank(address) {
            location_gaps.push(MissingField::Address);
        }
        if is_blank(country) {
            location_gaps.push(MissingField::Country);
        }
    }

    if !master_gaps.is_empty() {
        master_gaps.extend(location_gaps);
        return Category::MissingMasterData { missing: master_gaps };
    }

    match (address, country) {
        (Some(address), Some(country)) if location_gaps.is_empty() => {
            Category::Searchable(SearchQuery::new(person.id, &person.name, address, country))
        }
        _ => Category::Incomplete { missing: location_gaps },
    }
}

/// A batch split into its three queues, input order preserved
#[derive(Debug, Default)]
pub struct Categorized<'a> {
    pub search_queue: Vec<SearchQuery>,
    pub incomplete: Vec<(&'a Person, Vec<MissingField>)>,
    pub missing_master: Vec<(&'a Person, Vec<MissingField>)>,
}

impl Categorized<'_> {
    pub fn total(&self) -> usize {
        self.search_queue.len() + self.incomplete.len() + self.missing_master.len()
    }
}

pub fn categorize_all(persons: &[Person]) -> Categorized<'_> {
    let mut batch = Categorized::default();

    for person in persons {
        match categorize(person) {
            Category::Searchable(query) => batch.search_queue.push(query),
            Category::Incomplete { missing } => batch.incomplete.push((person, missing)),
            Category::MissingMasterData { missing } => batch.missing_master.push((person, missing)),
        }
    }

    info!(
        searchable = batch.search_queue.len(),
        incomplete = batch.incomplete.len(),
        missing_master = batch.missing_master.len(),
        "Categorization complete"
    );

    batch
}
