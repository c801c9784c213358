use async_trait::async_trait;
use std::path::PathBuf;

use crate::error::SearchError;
use crate::types::{PersonId, SearchQuery};

/// Narrow view of the sanctions search platform
#[async_trait]
pub trait SearchDriver: Send {
    /// Submit one query and return the rendered results page
    async fn submit_query(&mut self, query: &SearchQuery) -> Result<String, SearchError>;

    /// Capture the current results view as evidence for a match
    async fn capture_evidence(&mut self, person_id: PersonId) -> Result<PathBuf, SearchError>;

    /// Release the browser session
    async fn close(&mut self) -> Result<(), SearchError>;
}
