use std::collections::BTreeMap;

use regex::Regex;

use crate::error::CovidError;
use crate::table::{CanonicalTable, RawTable, parse_count};

const REGION_HEADERS: &[&str] = &["Province/State", "Province_State"];
const COUNTRY_HEADERS: &[&str] = &["Country/Region", "Country_Region"];
const LATITUDE_HEADERS: &[&str] = &["Lat"];
const LONGITUDE_HEADERS: &[&str] = &["Long", "Long_"];

#[derive(Debug, Clone, Copy)]
struct ColumnLayout {
    country: usize,
    region: Option<usize>,
    latitude: Option<usize>,
    longitude: Option<usize>,
}

impl ColumnLayout {
    fn resolve(headers: &[String]) -> Result<Self, CovidError> {
        let find = |names: &[&str]| headers.iter().position(|h| names.contains(&h.as_str()));
        let country = find(COUNTRY_HEADERS).ok_or_else(|| {
            CovidError::MalformedHeader(format!("missing {} column", COUNTRY_HEADERS[0]))
        })?;
        Ok(Self {
            country,
            region: find(REGION_HEADERS),
            latitude: find(LATITUDE_HEADERS),
            longitude: find(LONGITUDE_HEADERS),
        })
    }

    fn is_descriptive(&self, idx: usize) -> bool {
        idx == self.country
            || Some(idx) == self.region
            || Some(idx) == self.latitude
            || Some(idx) == self.longitude
    }
}

/// Turns the upstream table into the canonical per-country table.
///
/// Coordinates and the region label are projected away, regional rows are
/// summed into their country and every date label is rewritten to
/// `DD/MM/YYYY`.
pub fn normalize(raw: &RawTable) -> Result<CanonicalTable, CovidError> {
    let layout = ColumnLayout::resolve(&raw.headers)?;
    let date_indices = (0..raw.headers.len())
        .filter(|idx| !layout.is_descriptive(*idx))
        .collect::<Vec<_>>();
    if date_indices.is_empty() {
        return Err(CovidError::MalformedHeader(
            "no date columns found".to_string(),
        ));
    }

    let rewriter = DateLabelRewriter::new();
    let dates = date_indices
        .iter()
        .map(|idx| rewriter.rewrite(&raw.headers[*idx]))
        .collect::<Result<Vec<_>, _>>()?;

    let mut rows = Vec::with_capacity(raw.rows.len());
    for (idx, record) in raw.rows.iter().enumerate() {
        let line = idx + 2;
        let country = record
            .get(layout.country)
            .map(|value| value.trim())
            .unwrap_or_default();
        if country.is_empty() {
            return Err(CovidError::MalformedRow {
                line,
                reason: "missing country".to_string(),
            });
        }
        let values = date_indices
            .iter()
            .map(|col| parse_count(record.get(*col).map(String::as_str).unwrap_or(""), line))
            .collect::<Result<Vec<_>, _>>()?;
        rows.push((country.to_string(), values));
    }

    CanonicalTable::from_rows(dates, aggregate(rows)?)
}

/// Sums rows sharing a country name. Output is ordered by country name.
///
/// A sum that does not fit in a `u64` fails with `MalformedRow`, pointing at
/// the CSV line of the row that overflowed.
pub fn aggregate(rows: Vec<(String, Vec<u64>)>) -> Result<Vec<(String, Vec<u64>)>, CovidError> {
    let mut grouped: BTreeMap<String, Vec<u64>> = BTreeMap::new();
    for (idx, (country, values)) in rows.into_iter().enumerate() {
        match grouped.get_mut(&country) {
            Some(totals) => {
                if totals.len() < values.len() {
                    totals.resize(values.len(), 0);
                }
                for (total, value) in totals.iter_mut().zip(values) {
                    *total = total.checked_add(value).ok_or_else(|| CovidError::MalformedRow {
                        line: idx + 2,
                        reason: format!("count overflow for {country}"),
                    })?;
                }
            }
            None => {
                grouped.insert(country, values);
            }
        }
    }
    Ok(grouped.into_iter().collect())
}

/// Rewrites upstream `M/D/YY` column labels into `DD/MM/YYYY`.
///
/// Two-digit years are assumed to be in the 2000s. Labels that already carry
/// a four-digit year keep it.
pub struct DateLabelRewriter {
    pattern: Regex,
}

impl DateLabelRewriter {
    pub fn new() -> Self {
        let pattern = Regex::new(r"^(\d{1,2})/(\d{1,2})/(\d{2}|\d{4})$").unwrap();
        Self { pattern }
    }

    pub fn rewrite(&self, label: &str) -> Result<String, CovidError> {
        let invalid = || CovidError::MalformedHeader(format!("unrecognised date column {label:?}"));
        let captures = self.pattern.captures(label.trim()).ok_or_else(invalid)?;
        let month = &captures[1];
        let day = &captures[2];
        let year = &captures[3];

        let month_value: u32 = month.parse().map_err(|_| invalid())?;
        let day_value: u32 = day.parse().map_err(|_| invalid())?;
        if !(1..=12).contains(&month_value) || !(1..=31).contains(&day_value) {
            return Err(invalid());
        }

        let year = if year.len() == 2 {
            format!("20{year}")
        } else {
            year.to_string()
        };
        Ok(format!("{day:0>2}/{month:0>2}/{year}"))
    }
}

impl Default for DateLabelRewriter {
    fn default() -> Self {
        Self::new()
    }
}

pub fn rewrite_date_label(label: &str) -> Result<String, CovidError> {
    DateLabelRewriter::new().rewrite(label)
}
