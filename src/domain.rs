use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CovidError;

pub const DEFAULT_BASE_URL: &str = "https://raw.githubusercontent.com/CSSEGISandData/COVID-19/master/csse_covid_19_data/csse_covid_19_time_series";

pub const DEFAULT_COUNTRIES: &[&str] = &["Portugal", "Italy", "Spain", "US"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatasetKind {
    Confirmed,
    Deaths,
    Recovered,
}

impl DatasetKind {
    pub const ALL: [DatasetKind; 3] = [
        DatasetKind::Confirmed,
        DatasetKind::Deaths,
        DatasetKind::Recovered,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            DatasetKind::Confirmed => "confirmed",
            DatasetKind::Deaths => "deaths",
            DatasetKind::Recovered => "recovered",
        }
    }

    /// File name of the upstream series for this kind.
    pub fn remote_file(self) -> &'static str {
        match self {
            DatasetKind::Confirmed => "time_series_19-covid-Confirmed.csv",
            DatasetKind::Deaths => "time_series_19-covid-Deaths.csv",
            DatasetKind::Recovered => "time_series_19-covid-Recovered.csv",
        }
    }

    pub fn url(self, base_url: &str) -> String {
        format!("{}/{}", base_url.trim_end_matches('/'), self.remote_file())
    }

    pub fn title(self) -> &'static str {
        match self {
            DatasetKind::Confirmed => "Confirmed",
            DatasetKind::Deaths => "Deaths",
            DatasetKind::Recovered => "Recovered",
        }
    }
}

impl fmt::Display for DatasetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for DatasetKind {
    type Err = CovidError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "confirmed" => Ok(DatasetKind::Confirmed),
            "deaths" => Ok(DatasetKind::Deaths),
            "recovered" => Ok(DatasetKind::Recovered),
            _ => Err(CovidError::InvalidDatasetKind(value.to_string())),
        }
    }
}
