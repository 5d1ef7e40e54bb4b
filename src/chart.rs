use chrono::NaiveDate;

use crate::error::CovidError;
use crate::session::DatasetSession;

pub const ALL_COUNTRIES_TITLE: &str = "All Countries";
pub const GRID_COLUMNS: usize = 2;

/// matplotlib's default `C0..C9` cycle.
pub const PALETTE: [[u8; 3]; 10] = [
    [0x1f, 0x77, 0xb4],
    [0xff, 0x7f, 0x0e],
    [0x2c, 0xa0, 0x2c],
    [0xd6, 0x27, 0x28],
    [0x94, 0x67, 0xbd],
    [0x8c, 0x56, 0x4b],
    [0xe3, 0x77, 0xc2],
    [0x7f, 0x7f, 0x7f],
    [0xbc, 0xbd, 0x22],
    [0x17, 0xbe, 0xcf],
];

pub fn series_color(index: usize) -> [u8; 3] {
    PALETTE[index % PALETTE.len()]
}

#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    pub label: String,
    pub color_index: usize,
    pub values: Vec<u64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Panel {
    pub title: String,
    pub series: Vec<Series>,
}

impl Panel {
    pub fn max_value(&self) -> u64 {
        self.series
            .iter()
            .flat_map(|series| series.values.iter().copied())
            .max()
            .unwrap_or(0)
    }
}

/// Everything a renderer needs: titles, the shared date axis and one panel
/// per requested country followed by the aggregate panel.
#[derive(Debug, Clone)]
pub struct ChartPlan {
    pub title: String,
    pub subtitle: String,
    pub dates: Vec<NaiveDate>,
    pub panels: Vec<Panel>,
}

impl ChartPlan {
    pub fn new(session: &DatasetSession, countries: &[String]) -> Result<Self, CovidError> {
        if countries.is_empty() {
            return Err(CovidError::EmptyChart);
        }

        let table = session.table();
        let mut panels = Vec::with_capacity(countries.len() + 1);
        let mut overlay = Vec::with_capacity(countries.len());
        for (idx, country) in countries.iter().enumerate() {
            let values = table
                .row(country)
                .ok_or_else(|| CovidError::UnknownCountry(country.clone()))?
                .to_vec();
            let series = Series {
                label: country.clone(),
                color_index: idx,
                values,
            };
            overlay.push(series.clone());
            panels.push(Panel {
                title: country.clone(),
                series: vec![series],
            });
        }
        panels.push(Panel {
            title: ALL_COUNTRIES_TITLE.to_string(),
            series: overlay,
        });

        Ok(Self {
            title: format!(
                "Cases {} (World total: {})",
                session.kind(),
                session.total_cases()
            ),
            subtitle: format!("Generated at: {} UTC", session.captured_at_label()),
            dates: session.date_columns().to_vec(),
            panels,
        })
    }

    pub fn grid_rows(&self) -> usize {
        grid_rows(self.panels.len() - 1)
    }

    pub fn country_count(&self) -> usize {
        self.panels.len() - 1
    }
}

/// Rows needed for `countries` panels plus the aggregate panel, two per row.
pub fn grid_rows(countries: usize) -> usize {
    (countries + 1).div_ceil(GRID_COLUMNS)
}

/// `(row, column)` of the panel at `index`. The aggregate panel is at index
/// `countries`.
pub fn grid_position(index: usize) -> (usize, usize) {
    (index / GRID_COLUMNS, index % GRID_COLUMNS)
}
