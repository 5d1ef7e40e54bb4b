use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

use crate::domain::DatasetKind;
use crate::error::CovidError;
use crate::table::CanonicalTable;

pub const TIMESTAMP_FORMAT: &str = "%d %b %Y, %I:%M:%S%p";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionOrigin {
    Fetched,
    Snapshot,
    /// Restored from the CSV text form, which carries no capture time.
    Text,
}

/// One run's worth of data: the canonical table plus where and when it came from.
#[derive(Debug, Clone)]
pub struct DatasetSession {
    kind: DatasetKind,
    captured_at: DateTime<Utc>,
    origin: SessionOrigin,
    table: CanonicalTable,
    total_cases: u64,
    date_columns: Vec<NaiveDate>,
}

impl DatasetSession {
    pub fn new(
        kind: DatasetKind,
        captured_at: DateTime<Utc>,
        origin: SessionOrigin,
        table: CanonicalTable,
    ) -> Result<Self, CovidError> {
        let date_columns = table.date_columns()?;
        if date_columns.windows(2).any(|pair| pair[1] <= pair[0]) {
            tracing::warn!(kind = %kind, "date columns are not strictly increasing");
        }
        let violations = table.monotonic_violations();
        if !violations.is_empty() {
            tracing::warn!(
                kind = %kind,
                count = violations.len(),
                "counts decrease between consecutive days"
            );
        }
        let total_cases = table.latest_total();
        Ok(Self {
            kind,
            captured_at,
            origin,
            table,
            total_cases,
            date_columns,
        })
    }

    pub fn kind(&self) -> DatasetKind {
        self.kind
    }

    pub fn captured_at(&self) -> DateTime<Utc> {
        self.captured_at
    }

    pub fn origin(&self) -> SessionOrigin {
        self.origin
    }

    pub fn table(&self) -> &CanonicalTable {
        &self.table
    }

    pub fn total_cases(&self) -> u64 {
        self.total_cases
    }

    pub fn date_columns(&self) -> &[NaiveDate] {
        &self.date_columns
    }

    pub fn captured_at_label(&self) -> String {
        self.captured_at.format(TIMESTAMP_FORMAT).to_string()
    }

    pub fn summary(&self) -> SessionSummary {
        SessionSummary {
            kind: self.kind,
            captured_at: self.captured_at,
            origin: self.origin,
            countries: self.table.len(),
            first_date: self.date_columns.first().copied(),
            last_date: self.date_columns.last().copied(),
            total_cases: self.total_cases,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionSummary {
    pub kind: DatasetKind,
    pub captured_at: DateTime<Utc>,
    pub origin: SessionOrigin,
    pub countries: usize,
    pub first_date: Option<NaiveDate>,
    pub last_date: Option<NaiveDate>,
    pub total_cases: u64,
}
