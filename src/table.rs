use std::io::{Read, Write};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::CovidError;

pub const COUNTRY_HEADER: &str = "Country/Region";
pub const DATE_LABEL_FORMAT: &str = "%d/%m/%Y";

/// Upstream table exactly as downloaded: one row per geographic subdivision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl RawTable {
    pub fn from_csv_reader<R: Read>(reader: R) -> Result<Self, CovidError> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let headers = reader
            .headers()
            .map_err(|err| CovidError::MalformedHeader(err.to_string()))?
            .iter()
            .map(str::to_string)
            .collect::<Vec<_>>();

        let mut rows = Vec::new();
        for result in reader.records() {
            let record = result.map_err(csv_row_error)?;
            rows.push(record.iter().map(str::to_string).collect());
        }

        Ok(Self { headers, rows })
    }

    pub fn from_csv_str(text: &str) -> Result<Self, CovidError> {
        Self::from_csv_reader(text.as_bytes())
    }
}

/// Largest integer a float count can carry without losing precision.
const MAX_EXACT_FLOAT_COUNT: f64 = 9_007_199_254_740_992.0;

/// Per-country, per-date aggregated counts.
///
/// Rows are keyed by unique country names, columns by `DD/MM/YYYY` labels in
/// chronological order. Every row has one value per date and every column
/// total fits in a `u64`; deserialized tables are checked the same way.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "StoredTable")]
pub struct CanonicalTable {
    countries: Vec<String>,
    dates: Vec<String>,
    counts: Vec<Vec<u64>>,
}

#[derive(Deserialize)]
struct StoredTable {
    countries: Vec<String>,
    dates: Vec<String>,
    counts: Vec<Vec<u64>>,
}

impl TryFrom<StoredTable> for CanonicalTable {
    type Error = CovidError;

    fn try_from(stored: StoredTable) -> Result<Self, Self::Error> {
        if stored.countries.len() != stored.counts.len() {
            return Err(CovidError::MalformedRow {
                line: stored.countries.len().min(stored.counts.len()) + 2,
                reason: format!(
                    "{} countries for {} rows of counts",
                    stored.countries.len(),
                    stored.counts.len()
                ),
            });
        }
        let rows = stored.countries.into_iter().zip(stored.counts).collect();
        Self::from_rows(stored.dates, rows)
    }
}

impl CanonicalTable {
    pub fn from_rows(dates: Vec<String>, rows: Vec<(String, Vec<u64>)>) -> Result<Self, CovidError> {
        let mut countries = Vec::with_capacity(rows.len());
        let mut counts = Vec::with_capacity(rows.len());
        for (idx, (country, values)) in rows.into_iter().enumerate() {
            if values.len() != dates.len() {
                return Err(CovidError::MalformedRow {
                    line: idx + 2,
                    reason: format!(
                        "{country} has {} values for {} date columns",
                        values.len(),
                        dates.len()
                    ),
                });
            }
            if countries.contains(&country) {
                return Err(CovidError::MalformedRow {
                    line: idx + 2,
                    reason: format!("duplicate country {country}"),
                });
            }
            countries.push(country);
            counts.push(values);
        }

        for column in 0..dates.len() {
            counts
                .iter()
                .try_fold(0u64, |total, values| total.checked_add(values[column]))
                .ok_or_else(|| CovidError::MalformedRow {
                    line: 1,
                    reason: format!("total for {} overflows", dates[column]),
                })?;
        }

        Ok(Self {
            countries,
            dates,
            counts,
        })
    }

    pub fn countries(&self) -> &[String] {
        &self.countries
    }

    pub fn date_labels(&self) -> &[String] {
        &self.dates
    }

    pub fn len(&self) -> usize {
        self.countries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.countries.is_empty()
    }

    pub fn row(&self, country: &str) -> Option<&[u64]> {
        self.countries
            .iter()
            .position(|name| name == country)
            .map(|idx| self.counts[idx].as_slice())
    }

    pub fn rows(&self) -> impl Iterator<Item = (&str, &[u64])> {
        self.countries
            .iter()
            .zip(self.counts.iter())
            .map(|(country, values)| (country.as_str(), values.as_slice()))
    }

    /// Total of one date column. Cannot overflow: `from_rows` rejects tables
    /// whose column totals exceed `u64`.
    pub fn column_sum(&self, column: usize) -> u64 {
        self.counts
            .iter()
            .filter_map(|values| values.get(column))
            .sum()
    }

    /// Sum of the most recent date column, 0 when there are no dates.
    pub fn latest_total(&self) -> u64 {
        match self.dates.len() {
            0 => 0,
            len => self.column_sum(len - 1),
        }
    }

    pub fn date_columns(&self) -> Result<Vec<NaiveDate>, CovidError> {
        self.dates
            .iter()
            .map(|label| {
                NaiveDate::parse_from_str(label, DATE_LABEL_FORMAT).map_err(|err| {
                    CovidError::MalformedHeader(format!("date column {label}: {err}"))
                })
            })
            .collect()
    }

    /// Countries whose counts drop between two consecutive days, with the
    /// label of the day the drop was observed.
    pub fn monotonic_violations(&self) -> Vec<(String, String)> {
        let mut violations = Vec::new();
        for (country, values) in self.rows() {
            for (idx, pair) in values.windows(2).enumerate() {
                if pair[1] < pair[0] {
                    violations.push((country.to_string(), self.dates[idx + 1].clone()));
                }
            }
        }
        violations
    }

    pub fn write_csv<W: Write>(&self, writer: W) -> Result<(), CovidError> {
        let mut writer = csv::Writer::from_writer(writer);
        let mut header = Vec::with_capacity(self.dates.len() + 1);
        header.push(COUNTRY_HEADER);
        header.extend(self.dates.iter().map(String::as_str));
        writer
            .write_record(&header)
            .map_err(|err| CovidError::Filesystem(err.to_string()))?;

        for (country, values) in self.rows() {
            let mut record = Vec::with_capacity(values.len() + 1);
            record.push(country.to_string());
            record.extend(values.iter().map(u64::to_string));
            writer
                .write_record(&record)
                .map_err(|err| CovidError::Filesystem(err.to_string()))?;
        }
        writer
            .flush()
            .map_err(|err| CovidError::Filesystem(err.to_string()))
    }

    pub fn read_csv<R: Read>(reader: R) -> Result<Self, CovidError> {
        let raw = RawTable::from_csv_reader(reader)?;
        let Some((first, dates)) = raw.headers.split_first() else {
            return Err(CovidError::MalformedHeader("empty header".to_string()));
        };
        if first != COUNTRY_HEADER {
            return Err(CovidError::MalformedHeader(format!(
                "expected first column {COUNTRY_HEADER}, found {first}"
            )));
        }

        let mut rows = Vec::with_capacity(raw.rows.len());
        for (idx, record) in raw.rows.into_iter().enumerate() {
            let line = idx + 2;
            let mut fields = record.into_iter();
            let country = fields.next().unwrap_or_default();
            if country.is_empty() {
                return Err(CovidError::MalformedRow {
                    line,
                    reason: "missing country".to_string(),
                });
            }
            let values = fields
                .map(|field| parse_count(&field, line))
                .collect::<Result<Vec<_>, _>>()?;
            rows.push((country, values));
        }

        Self::from_rows(dates.to_vec(), rows)
    }
}

/// Parses one count cell. Blank cells count as zero.
pub fn parse_count(field: &str, line: usize) -> Result<u64, CovidError> {
    let trimmed = field.trim();
    if trimmed.is_empty() {
        return Ok(0);
    }
    if let Ok(value) = trimmed.parse::<u64>() {
        return Ok(value);
    }
    // Some upstream revisions write integral counts as floats ("12.0").
    match trimmed.parse::<f64>() {
        Ok(value)
            if value >= 0.0 && value.fract() == 0.0 && value <= MAX_EXACT_FLOAT_COUNT =>
        {
            Ok(value as u64)
        }
        _ => Err(CovidError::MalformedRow {
            line,
            reason: format!("invalid count {trimmed:?}"),
        }),
    }
}

fn csv_row_error(err: csv::Error) -> CovidError {
    let line = err
        .position()
        .map(|pos| pos.line() as usize)
        .unwrap_or_default();
    CovidError::MalformedRow {
        line,
        reason: err.to_string(),
    }
}
