pub mod config;
pub mod database;
pub mod errors;
pub mod logging;
pub mod scraper;

pub use config::{AgentConfig, BrowserSettings, DatabaseConfig, FormSelectors, LoggingConfig};
pub use database::PgStore;
pub use errors::{AgentError, AgentResult};
pub use scraper::ChromeSearchDriver;
