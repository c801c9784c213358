//! Property-based tests for categorization and classification
//!
//! - Complete records are always searchable
//! - Missing master data wins regardless of address/country
//! - Blank address or country alone yields incomplete
//! - The classifier never turns unstructured content into a no-match
//! - Every input person ends a run with exactly one final status

mod common;

use common::*;
use proptest::prelude::*;
use screening_core::{
    categorize, run_batch, Category, ClassifierSelectors, MasterRecord, Person, PersonId,
    PersonStatus, ResultClassifier, ScreeningSettings, SearchError, StoreError, Verdict,
};

/// Non-blank field values
fn filled() -> impl Strategy<Value = String> {
    "[A-Za-z0-9][A-Za-z0-9 .,#-]{0,30}"
}

/// Absent, empty or whitespace-only values
fn blank() -> impl Strategy<Value = Option<String>> {
    prop_oneof![Just(None), Just(Some(String::new())), " {1,4}".prop_map(Some)]
}

fn any_field() -> impl Strategy<Value = Option<String>> {
    prop_oneof![filled().prop_map(Some), blank()]
}

fn with_master(id: i64, name: String, address: Option<String>, country: Option<String>) -> Person {
    Person {
        id: PersonId(id),
        name,
        master: Some(MasterRecord {
            master_id: id,
            address,
            country,
        }),
    }
}

proptest! {
    #[test]
    fn prop_complete_records_are_searchable(
        id in 1i64..1_000_000,
        name in filled(),
        address in filled(),
        country in filled(),
    ) {
        let person = with_master(id, name, Some(address), Some(country));
        match categorize(&person) {
            Category::Searchable(query) => prop_assert_eq!(query.person_id, PersonId(id)),
            other => prop_assert!(false, "expected searchable, got {:?}", other),
        }
    }

    #[test]
    fn prop_missing_master_takes_precedence(
        name in filled(),
        address in any_field(),
        country in any_field(),
    ) {
        let mut person = with_master(1, name, address, country);
        person.master = None;
        let is_missing_master = matches!(categorize(&person), Category::MissingMasterData { .. });
        prop_assert!(is_missing_master);
    }

    #[test]
    fn prop_blank_location_is_incomplete(
        name in filled(),
        address in any_field(),
        country in any_field(),
    ) {
        let address_blank = address.as_deref().map_or(true, |a| a.trim().is_empty());
        let country_blank = country.as_deref().map_or(true, |c| c.trim().is_empty());
        prop_assume!(address_blank || country_blank);

        let person = with_master(1, name, address, country);
        let is_incomplete = matches!(categorize(&person), Category::Incomplete { .. });
        prop_assert!(is_incomplete);
    }

    #[test]
    fn prop_categorize_is_deterministic(
        name in filled(),
        address in any_field(),
        country in any_field(),
    ) {
        let person = with_master(1, name, address, country);
        prop_assert_eq!(categorize(&person), categorize(&person));
    }

    #[test]
    fn prop_unstructured_content_is_never_no_match(content in "[^<>]{0,300}") {
        let classifier = ResultClassifier::new(&ClassifierSelectors::default()).unwrap();
        let is_error = matches!(classifier.classify(&content), Verdict::Error { .. });
        prop_assert!(is_error);
    }

    #[test]
    fn prop_classifier_is_total(content in ".{0,300}") {
        let classifier = ResultClassifier::new(&ClassifierSelectors::default()).unwrap();
        let verdict = classifier.classify(&content);
        let classified = matches!(
            verdict,
            Verdict::NoMatch | Verdict::Match { .. } | Verdict::Error { .. }
        );
        prop_assert!(classified);
    }
}

#[derive(Debug, Clone)]
enum Planned {
    NoMaster,
    Incomplete,
    Clean,
    Hit,
    Broken,
}

fn planned() -> impl Strategy<Value = Planned> {
    prop_oneof![
        Just(Planned::NoMaster),
        Just(Planned::Incomplete),
        Just(Planned::Clean),
        Just(Planned::Hit),
        Just(Planned::Broken),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn prop_every_person_ends_with_one_final_status(plan in prop::collection::vec(planned(), 0..12)) {
        let dir = tempfile::tempdir().unwrap();
        let persons: Vec<Person> = plan
            .iter()
            .enumerate()
            .map(|(i, p)| {
                let id = i as i64 + 1;
                match p {
                    Planned::NoMaster => person_without_master(id),
                    Planned::Incomplete => person(id, Some(""), Some("US")),
                    _ => person(id, Some("1 Main St"), Some("US")),
                }
            })
            .collect();

        let (store, store_state) = MemoryStore::new(persons);
        let (mut driver, _) = ScriptedDriver::new(Script::Page(NO_MATCH_PAGE));
        for (i, p) in plan.iter().enumerate() {
            let id = i as i64 + 1;
            driver = match p {
                Planned::Hit => driver.with_script(id, Script::Page(ONE_MATCH_PAGE)),
                Planned::Broken => driver.with_script(id, Script::Page("<html><body></body></html>")),
                _ => driver,
            };
        }

        let settings = ScreeningSettings {
            reports_dir: dir.path().join("reports"),
            ..Default::default()
        };
        let outcome = tokio_test::block_on(run_batch(
            &settings,
            async { Ok::<_, StoreError>(store) },
            || async { Ok::<_, SearchError>(driver) },
        ))
        .unwrap();

        let summary = outcome.summary;
        prop_assert_eq!(summary.total(), plan.len());
        prop_assert_eq!(summary.counts().values().sum::<usize>(), plan.len());
        prop_assert!(summary.results.iter().all(|r| PersonStatus::FINAL.contains(&r.status)));
        prop_assert_eq!(store_state.recorded().len(), plan.len());

        for (result, p) in summary.results.iter().zip(plan.iter()) {
            let expected = match p {
                Planned::NoMaster => PersonStatus::MissingMasterData,
                Planned::Incomplete => PersonStatus::Incomplete,
                Planned::Clean => PersonStatus::SearchedNoMatch,
                Planned::Hit => PersonStatus::SearchedMatch,
                Planned::Broken => PersonStatus::SearchError,
            };
            prop_assert_eq!(result.status, expected);
        }
    }
}
