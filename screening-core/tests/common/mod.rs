//! In-memory store and scripted driver shared by the integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use screening_core::{
    MasterRecord, Person, PersonId, PersonResult, PersonStore, SearchDriver, SearchError,
    SearchQuery, StoreError,
};
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const NO_MATCH_PAGE: &str = r#"<html><body>
    <span id="ctl00_MainContent_lblResults">Lookup Results: 0 Found</span>
</body></html>"#;

pub const ONE_MATCH_PAGE: &str = r#"<html><body>
    <span id="ctl00_MainContent_lblResults">Lookup Results: 1 Found</span>
    <table id="gvSearchResults">
        <tr><th>Name</th><th>Address</th><th>Type</th><th>Program(s)</th><th>List</th><th>Score</th></tr>
        <tr><td>DOE, John</td><td>Caracas</td><td>Individual</td><td>VENEZUELA-EO13850</td><td>SDN</td><td>100</td></tr>
    </table>
</body></html>"#;

pub fn person(id: i64, address: Option<&str>, country: Option<&str>) -> Person {
    Person {
        id: PersonId(id),
        name: format!("Person {}", id),
        master: Some(MasterRecord {
            master_id: id,
            address: address.map(str::to_string),
            country: country.map(str::to_string),
        }),
    }
}

pub fn person_without_master(id: i64) -> Person {
    Person {
        id: PersonId(id),
        name: format!("Person {}", id),
        master: None,
    }
}

#[derive(Default)]
pub struct StoreState {
    pub recorded: Mutex<Vec<(PersonResult, String)>>,
    pub closed: AtomicBool,
    pub writes: AtomicUsize,
}

impl StoreState {
    pub fn recorded(&self) -> Vec<(PersonResult, String)> {
        self.recorded.lock().unwrap().clone()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

pub struct MemoryStore {
    pub persons: Vec<Person>,
    pub state: Arc<StoreState>,
    /// Person ids whose write fails with a recoverable error
    pub failing_writes: HashSet<PersonId>,
    /// Connection drops once this many writes succeeded
    pub drop_after_writes: Option<usize>,
}

impl MemoryStore {
    pub fn new(persons: Vec<Person>) -> (Self, Arc<StoreState>) {
        let state = Arc::new(StoreState::default());
        (
            Self {
                persons,
                state: state.clone(),
                failing_writes: HashSet::new(),
                drop_after_writes: None,
            },
            state,
        )
    }
}

#[async_trait]
impl PersonStore for MemoryStore {
    async fn fetch_pending(&mut self) -> Result<Vec<Person>, StoreError> {
        Ok(self.persons.clone())
    }

    async fn record_outcome(&mut self, result: &PersonResult, status_code: &str) -> Result<(), StoreError> {
        if self.failing_writes.contains(&result.person_id) {
            return Err(StoreError::Write("value too long for column".to_string()));
        }
        if let Some(limit) = self.drop_after_writes {
            if self.state.writes.load(Ordering::SeqCst) >= limit {
                return Err(StoreError::Unavailable("connection reset by peer".to_string()));
            }
        }
        self.state.writes.fetch_add(1, Ordering::SeqCst);
        self.state
            .recorded
            .lock()
            .unwrap()
            .push((result.clone(), status_code.to_string()));
        Ok(())
    }

    async fn close(&mut self) {
        self.state.closed.store(true, Ordering::SeqCst);
    }
}

#[derive(Clone)]
pub enum Script {
    Page(&'static str),
    Fail(SearchError),
    Hang,
}

#[derive(Default)]
pub struct DriverState {
    pub submitted: Mutex<Vec<PersonId>>,
    pub captured: Mutex<Vec<PersonId>>,
    pub closed: AtomicBool,
    pub launched: AtomicBool,
}

impl DriverState {
    pub fn submitted(&self) -> Vec<PersonId> {
        self.submitted.lock().unwrap().clone()
    }

    pub fn captured(&self) -> Vec<PersonId> {
        self.captured.lock().unwrap().clone()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    pub fn was_launched(&self) -> bool {
        self.launched.load(Ordering::SeqCst)
    }
}

pub struct ScriptedDriver {
    pub scripts: HashMap<PersonId, Script>,
    pub fallback: Script,
    pub state: Arc<DriverState>,
    pub evidence_fails: bool,
    /// Screenshot never completes
    pub evidence_hangs: bool,
}

impl ScriptedDriver {
    pub fn new(fallback: Script) -> (Self, Arc<DriverState>) {
        let state = Arc::new(DriverState::default());
        state.launched.store(true, Ordering::SeqCst);
        (
            Self {
                scripts: HashMap::new(),
                fallback,
                state: state.clone(),
                evidence_fails: false,
                evidence_hangs: false,
            },
            state,
        )
    }

    pub fn with_script(mut self, id: i64, script: Script) -> Self {
        self.scripts.insert(PersonId(id), script);
        self
    }
}

#[async_trait]
impl SearchDriver for ScriptedDriver {
    async fn submit_query(&mut self, query: &SearchQuery) -> Result<String, SearchError> {
        self.state.submitted.lock().unwrap().push(query.person_id);
        let script = self
            .scripts
            .get(&query.person_id)
            .cloned()
            .unwrap_or_else(|| self.fallback.clone());
        match script {
            Script::Page(html) => Ok(html.to_string()),
            Script::Fail(e) => Err(e),
            Script::Hang => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok(String::new())
            }
        }
    }

    async fn capture_evidence(&mut self, person_id: PersonId) -> Result<PathBuf, SearchError> {
        if self.evidence_hangs {
            tokio::time::sleep(Duration::from_secs(3600)).await;
        }
        if self.evidence_fails {
            return Err(SearchError::Evidence("page crashed".to_string()));
        }
        self.state.captured.lock().unwrap().push(person_id);
        Ok(PathBuf::from(format!("screenshots/20240101_{}.png", person_id)))
    }

    async fn close(&mut self) -> Result<(), SearchError> {
        self.state.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}
