//! Run Report Generator
//!
//! Writes one workbook per run:
//! - Summary: count per final status, with the storage code written for it
//! - Data Gaps: persons that were not searched and the fields they lack
//! - Follow-up: sanctions matches and search errors needing manual review

use chrono::{DateTime, Utc};
use rust_xlsxwriter::{Format, Workbook, Worksheet};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::PathBuf;
use tracing::info;

use crate::error::ReportError;
use crate::settings::StatusCodes;
use crate::types::{PersonResult, PersonStatus, Verdict};

pub type Result<T> = std::result::Result<T, ReportError>;

/// Everything a run produced, kept in memory until the report is written
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub results: Vec<PersonResult>,
}

impl RunSummary {
    pub fn new(started_at: DateTime<Utc>, results: Vec<PersonResult>) -> Self {
        Self {
            started_at,
            finished_at: Utc::now(),
            results,
        }
    }

    pub fn total(&self) -> usize {
        self.results.len()
    }

    /// Count per final status; every final status is present, zero or not
    pub fn counts(&self) -> BTreeMap<PersonStatus, usize> {
        let mut counts: BTreeMap<PersonStatus, usize> =
            PersonStatus::FINAL.iter().map(|s| (*s, 0)).collect();
        for result in &self.results {
            *counts.entry(result.status).or_insert(0) += 1;
        }
        counts
    }

    pub fn count(&self, status: PersonStatus) -> usize {
        self.results.iter().filter(|r| r.status == status).count()
    }

    pub fn unpersisted(&self) -> usize {
        self.results.iter().filter(|r| !r.persisted).count()
    }

    /// Persons were processed but not a single result reached the store
    pub fn nothing_recorded(&self) -> bool {
        self.total() > 0 && self.unpersisted() == self.total()
    }

    pub fn data_gaps(&self) -> impl Iterator<Item = &PersonResult> {
        self.results.iter().filter(|r| r.status.is_data_gap())
    }

    pub fn follow_ups(&self) -> impl Iterator<Item = &PersonResult> {
        self.results.iter().filter(|r| {
            matches!(r.status, PersonStatus::SearchedMatch | PersonStatus::SearchError)
        })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ReportMetadata {
    pub file_path: PathBuf,
    pub file_size: u64,
    pub generated_at: DateTime<Utc>,
    pub person_count: usize,
}

#[derive(Debug, Clone)]
pub struct ReportConfig {
    pub output_dir: PathBuf,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("reports"),
        }
    }
}

pub struct ReportGenerator {
    config: ReportConfig,
    codes: StatusCodes,
}

impl ReportGenerator {
    pub fn new(config: ReportConfig, codes: StatusCodes) -> Result<Self> {
        std::fs::create_dir_all(&config.output_dir)?;
        Ok(Self { config, codes })
    }

    pub fn generate(&self, summary: &RunSummary) -> Result<ReportMetadata> {
        let stamp = summary.finished_at.format("%Y%m%d_%H%M%S_%3f").to_string();
        let file_path = self.unused_path(&stamp);

        let mut workbook = Workbook::new();
        let header = Format::new().set_bold();

        self.write_summary(workbook.add_worksheet(), &header, summary)?;
        self.write_data_gaps(workbook.add_worksheet(), &header, summary)?;
        self.write_follow_ups(workbook.add_worksheet(), &header, summary)?;

        workbook.save(&file_path)?;
        let file_size = std::fs::metadata(&file_path)?.len();

        info!(path = %file_path.display(), persons = summary.total(), "Run report generated");

        Ok(ReportMetadata {
            file_path,
            file_size,
            generated_at: Utc::now(),
            person_count: summary.total(),
        })
    }

    /// Never overwrite an earlier run's workbook
    fn unused_path(&self, stamp: &str) -> PathBuf {
        let mut path = self.config.output_dir.join(format!("OFAC_Run_Report_{}.xlsx", stamp));
        let mut attempt = 1;
        while path.exists() {
            attempt += 1;
            path = self
                .config
                .output_dir
                .join(format!("OFAC_Run_Report_{}_{}.xlsx", stamp, attempt));
        }
        path
    }

    fn write_summary(&self, sheet: &mut Worksheet, header: &Format, summary: &RunSummary) -> Result<()> {
        sheet.set_name("Summary")?;
        sheet.write_string_with_format(0, 0, "Status", header)?;
        sheet.write_string_with_format(0, 1, "Status Code", header)?;
        sheet.write_string_with_format(0, 2, "Count", header)?;

        let mut row = 1;
        for (status, count) in summary.counts() {
            sheet.write_string(row, 0, status.label())?;
            sheet.write_string(row, 1, self.codes.code(status))?;
            sheet.write_number(row, 2, count as f64)?;
            row += 1;
        }

        sheet.write_string_with_format(row, 0, "Total", header)?;
        sheet.write_number_with_format(row, 2, summary.total() as f64, header)?;
        row += 2;

        sheet.write_string(row, 0, "Not recorded in database")?;
        sheet.write_number(row, 2, summary.unpersisted() as f64)?;
        row += 1;
        sheet.write_string(row, 0, "Run started (UTC)")?;
        sheet.write_string(row, 1, summary.started_at.format("%Y-%m-%d %H:%M:%S").to_string())?;
        row += 1;
        sheet.write_string(row, 0, "Run finished (UTC)")?;
        sheet.write_string(row, 1, summary.finished_at.format("%Y-%m-%d %H:%M:%S").to_string())?;

        sheet.set_column_width(0, 28)?;
        sheet.set_column_width(1, 25)?;
        Ok(())
    }

    fn write_data_gaps(&self, sheet: &mut Worksheet, header: &Format, summary: &RunSummary) -> Result<()> {
        sheet.set_name("Data Gaps")?;
        for (col, title) in ["Person ID", "Person Name", "Country", "Transaction Status", "Missing Fields"]
            .iter()
            .enumerate()
        {
            sheet.write_string_with_format(0, col as u16, *title, header)?;
        }

        for (index, result) in summary.data_gaps().enumerate() {
            let row = index as u32 + 1;
            sheet.write_number(row, 0, result.person_id.0 as f64)?;
            sheet.write_string(row, 1, &result.name)?;
            sheet.write_string(row, 2, result.country.as_deref().unwrap_or(""))?;
            sheet.write_string(row, 3, self.codes.code(result.status))?;
            sheet.write_string(row, 4, result.missing_summary())?;
        }

        sheet.set_column_width(1, 35)?;
        sheet.set_column_width(2, 15)?;
        sheet.set_column_width(3, 25)?;
        sheet.set_column_width(4, 30)?;
        Ok(())
    }

    fn write_follow_ups(&self, sheet: &mut Worksheet, header: &Format, summary: &RunSummary) -> Result<()> {
        sheet.set_name("Follow-up")?;
        for (col, title) in ["Person ID", "Person Name", "Country", "Outcome", "Hits", "Detail"]
            .iter()
            .enumerate()
        {
            sheet.write_string_with_format(0, col as u16, *title, header)?;
        }

        for (index, result) in summary.follow_ups().enumerate() {
            let row = index as u32 + 1;
            sheet.write_number(row, 0, result.person_id.0 as f64)?;
            sheet.write_string(row, 1, &result.name)?;
            sheet.write_string(row, 2, result.country.as_deref().unwrap_or(""))?;
            sheet.write_string(row, 3, result.status.label())?;
            if let Some(hits) = result.hit_count() {
                sheet.write_number(row, 4, hits)?;
            }
            sheet.write_string(row, 5, follow_up_detail(result))?;
        }

        sheet.set_column_width(1, 35)?;
        sheet.set_column_width(2, 15)?;
        sheet.set_column_width(3, 20)?;
        sheet.set_column_width(5, 60)?;
        Ok(())
    }
}

fn follow_up_detail(result: &PersonResult) -> String {
    match result.outcome.as_ref().map(|o| &o.verdict) {
        Some(Verdict::Error { reason }) => reason.to_string(),
        Some(Verdict::Match { .. }) => match result.evidence() {
            Some(path) => path.display().to_string(),
            None => "Screenshot not captured".to_string(),
        },
        _ => String::new(),
    }
}
