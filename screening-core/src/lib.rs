pub mod categorizer;
pub mod classifier;
pub mod driver;
pub mod error;
pub mod lifecycle;
pub mod precheck;
pub mod report_generator;
pub mod screening;
pub mod settings;
pub mod store;
pub mod types;

pub use categorizer::{categorize, categorize_all, Category, Categorized};
pub use classifier::ResultClassifier;
pub use driver::SearchDriver;
pub use error::{
    ClassificationError, ReportError, RunError, SearchError, SettingsError, StoreError,
};
pub use lifecycle::{run_batch, RunOutcome};
pub use report_generator::{ReportConfig, ReportGenerator, ReportMetadata, RunSummary};
pub use screening::Screener;
pub use settings::{ClassifierSelectors, ScreeningSettings, StatusCodes};
pub use store::PersonStore;
pub use types::{
    MasterRecord, MissingField, Person, PersonId, PersonResult, PersonStatus, SearchOutcome,
    SearchQuery, Verdict,
};
