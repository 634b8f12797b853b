//! Incident log model and the "days since" computation.
//!
//! An incident log is re-read from disk for every request: the [`IncidentSource`]
//! locates the file, [`parse_incident_log`] turns its text into an
//! [`IncidentLog`], and [`IncidentLog::latest`] picks the most recent date.
//! [`load_report`] chains the three for the request handlers.

mod parser;
mod source;

pub use parser::parse_incident_log;
pub use source::{IncidentSource, SourceText};

use chrono::NaiveDate;

use crate::error::IncidentError;

/// One entry of the incident log. Fields other than the date are not kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct IncidentRecord {
    pub date: NaiveDate,
}

/// Incident records parsed from one document, in document order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IncidentLog {
    records: Vec<IncidentRecord>,
}

impl IncidentLog {
    pub fn new(records: Vec<IncidentRecord>) -> Self {
        Self { records }
    }

    pub fn records(&self) -> &[IncidentRecord] {
        &self.records
    }

    /// The most recent incident date, or `None` for an empty log.
    pub fn latest(&self) -> Option<NaiveDate> {
        self.records.iter().map(|record| record.date).max()
    }
}

impl FromIterator<NaiveDate> for IncidentLog {
    fn from_iter<I: IntoIterator<Item = NaiveDate>>(iter: I) -> Self {
        Self::new(iter.into_iter().map(|date| IncidentRecord { date }).collect())
    }
}

/// The raw incident file together with its most recent incident date.
#[derive(Debug, Clone)]
pub struct IncidentReport {
    pub source: SourceText,
    pub latest: NaiveDate,
}

impl IncidentReport {
    /// Whole days from the latest incident to `today`. Negative for future dates.
    pub fn days_since(&self, today: NaiveDate) -> i64 {
        days_between(self.latest, today)
    }
}

/// Resolve, read and parse the incident log, failing if it holds no usable date.
///
/// Performs blocking filesystem I/O.
pub fn load_report(source: &IncidentSource) -> Result<IncidentReport, IncidentError> {
    let text = source.read()?;
    let log = parse_incident_log(&text.contents)?;
    let latest = log.latest().ok_or(IncidentError::NoValidDates)?;

    tracing::debug!(
        path = %text.path.display(),
        records = log.records().len(),
        %latest,
        "Loaded incident log"
    );

    Ok(IncidentReport {
        source: text,
        latest,
    })
}

pub fn days_between(latest: NaiveDate, today: NaiveDate) -> i64 {
    today.signed_duration_since(latest).num_days()
}

/// "1 day" for exactly one, "{n} days" for everything else (including 0 and negatives).
pub fn days_label(days: i64) -> String {
    if days == 1 {
        "1 day".to_string()
    } else {
        format!("{days} days")
    }
}

/// First line of the status page.
pub fn status_line(days: i64) -> String {
    format!("status: {} since the last incident\n", days_label(days))
}
