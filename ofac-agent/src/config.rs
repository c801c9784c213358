use config::{Environment, File};
use screening_core::ScreeningSettings;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

use crate::errors::{AgentError, AgentResult};

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
#[serde(default)]
pub struct AgentConfig {
    pub database: DatabaseConfig,
    pub browser: BrowserSettings,
    pub logging: LoggingConfig,
    pub screening: ScreeningSettings,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub acquire_timeout_secs: u64,
    /// Quoted table identifiers
    pub persons_table: String,
    pub master_table: String,
    pub results_table: String,
    /// Value of "aConsultar" marking a person for checking
    pub process_flag: String,
    /// Also write "rutaEvidencia" and "fechaConsulta". Off for the stock
    /// five-column results table.
    pub evidence_columns: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            max_connections: 1,
            acquire_timeout_secs: 5,
            persons_table: "\"Personas\"".to_string(),
            master_table: "\"MaestraDetallePersonas\"".to_string(),
            results_table: "\"Resultadosuser9886\"".to_string(),
            process_flag: "Si".to_string(),
            evidence_columns: false,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct BrowserSettings {
    pub search_url: String,
    pub headless: bool,
    pub executable: Option<PathBuf>,
    pub screenshots_dir: PathBuf,
    pub request_timeout_secs: u64,
    pub element_wait_secs: u64,
    pub poll_interval_ms: u64,
    pub form: FormSelectors,
}

impl Default for BrowserSettings {
    fn default() -> Self {
        Self {
            search_url: "https://sanctionssearch.ofac.treas.gov/".to_string(),
            headless: true,
            executable: None,
            screenshots_dir: PathBuf::from("screenshots"),
            request_timeout_secs: 30,
            element_wait_secs: 60,
            poll_interval_ms: 250,
            form: FormSelectors::default(),
        }
    }
}

/// Search form element selectors
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct FormSelectors {
    pub name_input: String,
    pub address_input: String,
    pub country_select: String,
    pub search_button: String,
    /// Present once the results view has rendered
    pub results_ready: String,
}

impl Default for FormSelectors {
    fn default() -> Self {
        Self {
            name_input: "#ctl00_MainContent_txtLastName".to_string(),
            address_input: "#ctl00_MainContent_txtAddress".to_string(),
            country_select: "#ctl00_MainContent_ddlCountry".to_string(),
            search_button: "#ctl00_MainContent_btnSearch".to_string(),
            results_ready: "#ctl00_MainContent_lblResults".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct LoggingConfig {
    pub log_dir: PathBuf,
    pub file_name: String,
    /// Used when RUST_LOG is unset
    pub filter: String,
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_dir: PathBuf::from("logs"),
            file_name: "automation.log".to_string(),
            filter: "info,chromiumoxide=warn,sqlx=warn,tungstenite=warn".to_string(),
            json: false,
        }
    }
}

/// Build a Postgres URL from the DB_* variables used by the existing deployment
pub fn database_url_from_parts<F>(lookup: F) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    let host = lookup("DB_HOST")?;
    let name = lookup("DB_NAME")?;
    let port = lookup("DB_PORT").unwrap_or_else(|| "5432".to_string());
    let credentials = match (lookup("DB_USER"), lookup("DB_PASSWORD")) {
        (Some(user), Some(password)) => format!("{}:{}@", user, password),
        (Some(user), None) => format!("{}@", user),
        _ => String::new(),
    };
    Some(format!("postgres://{}{}:{}/{}", credentials, host, port, name))
}

impl AgentConfig {
    pub fn from_env() -> AgentResult<Self> {
        let environment = env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string());

        let mut builder = config::Config::builder()
            // Start with default configuration
            .add_source(config::Config::try_from(&AgentConfig::default())?);

        if let Ok(config_file) = env::var("CONFIG_FILE") {
            builder = builder.add_source(File::with_name(&config_file).required(false));
        } else {
            builder = builder.add_source(
                File::with_name(&format!("config/{}", environment)).required(false),
            );
        }

        builder = builder.add_source(
            Environment::with_prefix("OFAC_AGENT")
                .separator("__")
                .try_parsing(true),
        );

        // Variables shared with the existing deployment
        let lookup = |key: &str| env::var(key).ok().filter(|v| !v.is_empty());
        if let Some(db_url) = lookup("DATABASE_URL").or_else(|| database_url_from_parts(lookup)) {
            builder = builder.set_override("database.url", db_url)?;
        }
        if let Some(ofac_url) = lookup("OFAC_URL") {
            builder = builder.set_override("browser.search_url", ofac_url)?;
        }

        Ok(builder.build()?.try_deserialize()?)
    }

    pub fn validate(&self) -> AgentResult<()> {
        if self.database.url.is_empty() {
            return Err(AgentError::Invalid(
                "Database URL is required (DATABASE_URL or DB_HOST/DB_NAME)".to_string(),
            ));
        }

        if self.browser.search_url.is_empty() {
            return Err(AgentError::Invalid("Search URL is required".to_string()));
        }

        if self.browser.poll_interval_ms == 0 || self.browser.element_wait_secs == 0 {
            return Err(AgentError::Invalid(
                "Browser poll interval and element wait must be positive".to_string(),
            ));
        }

        if self.database.max_connections == 0 {
            return Err(AgentError::Invalid("max_connections cannot be 0".to_string()));
        }

        self.screening.validate()?;
        Ok(())
    }

    /// Create the output directories the run writes into
    pub fn ensure_directories(&self) -> AgentResult<()> {
        for dir in [
            &self.screening.reports_dir,
            &self.browser.screenshots_dir,
            &self.logging.log_dir,
        ] {
            std::fs::create_dir_all(dir)?;
        }
        Ok(())
    }
}
