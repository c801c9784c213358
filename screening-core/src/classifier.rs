//! Results page classification
//!
//! Reads the structure of the results view (label, grid rows, empty indicator,
//! error banner) rather than its wording. Anything that does not positively
//! look like a clean result is an error, never a no-match.

use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, warn};

use crate::error::{ClassificationError, SettingsError};
use crate::settings::ClassifierSelectors;
use crate::types::Verdict;

pub struct ResultClassifier {
    results_label: Selector,
    results_table: Selector,
    no_records: Selector,
    error_banner: Selector,
    row: Selector,
    cell: Selector,
    count: Regex,
}

fn parse(field: &'static str, selector: &str) -> Result<Selector, SettingsError> {
    Selector::parse(selector).map_err(|_| SettingsError::InvalidSelector {
        field,
        selector: selector.to_string(),
    })
}

fn text_of(element: ElementRef<'_>) -> String {
    element
        .text()
        .collect::<Vec<_>>()
        .join(" ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

impl ResultClassifier {
    pub fn new(selectors: &ClassifierSelectors) -> Result<Self, SettingsError> {
        Ok(Self {
            results_label: parse("results_label", &selectors.results_label)?,
            results_table: parse("results_table", &selectors.results_table)?,
            no_records: parse("no_records", &selectors.no_records)?,
            error_banner: parse("error_banner", &selectors.error_banner)?,
            row: parse("row", "tr")?,
            cell: parse("cell", "td")?,
            // Grouped counts ("1,204") are read whole
            count: Regex::new(r"(\d{1,3}(?:[,.]\d{3})+|\d+)").expect("static regex"),
        })
    }

    pub fn classify(&self, content: &str) -> Verdict {
        match self.try_classify(content) {
            Ok(verdict) => verdict,
            Err(reason) => {
                warn!(%reason, "Results page classified as error");
                Verdict::Error { reason }
            }
        }
    }

    fn try_classify(&self, content: &str) -> Result<Verdict, ClassificationError> {
        if content.trim().is_empty() {
            return Err(ClassificationError::EmptyContent);
        }

        let document = Html::parse_document(content);

        if let Some(banner) = document
            .select(&self.error_banner)
            .map(text_of)
            .find(|text| !text.is_empty())
        {
            return Err(ClassificationError::PlatformError(banner));
        }

        let table = document.select(&self.results_table).next();
        let rows = table.map(|t| self.data_rows(t)).unwrap_or(0);
        let label_count = match document.select(&self.results_label).next() {
            Some(label) => Some(self.label_count(&text_of(label))?),
            None => None,
        };
        debug!(rows, ?label_count, table = table.is_some(), "Parsed results page");

        if rows > 0 {
            let hits = label_count.map_or(rows, |count| count.max(rows));
            return Ok(Verdict::Match { hits });
        }

        let empty_marker = document.select(&self.no_records).next().is_some();
        match label_count {
            Some(0) => Ok(Verdict::NoMatch),
            Some(count) if empty_marker => Err(ClassificationError::UnexpectedLayout(format!(
                "count of {} next to an empty-results marker",
                count
            ))),
            Some(count) => Ok(Verdict::Match { hits: count }),
            None if empty_marker => Ok(Verdict::NoMatch),
            None if table.is_some() => Err(ClassificationError::UnexpectedLayout(
                "results table without data rows or count".to_string(),
            )),
            None => Err(ClassificationError::UnexpectedLayout(
                "no results view found".to_string(),
            )),
        }
    }

    /// Rows with cells, excluding a grid's own empty-data row
    fn data_rows(&self, table: ElementRef<'_>) -> u32 {
        table
            .select(&self.row)
            .filter(|row| row.select(&self.cell).next().is_some())
            .filter(|row| !self.no_records.matches(row) && row.select(&self.no_records).next().is_none())
            .count() as u32
    }

    fn label_count(&self, text: &str) -> Result<u32, ClassificationError> {
        self.count
            .captures(text)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().chars().filter(char::is_ascii_digit).collect::<String>())
            .and_then(|digits| digits.parse::<u32>().ok())
            .ok_or_else(|| ClassificationError::Unparseable(text.to_string()))
    }
}
