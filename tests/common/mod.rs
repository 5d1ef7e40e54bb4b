#![allow(dead_code)]

use std::sync::Mutex;

use camino::Utf8PathBuf;
use chrono::{DateTime, TimeZone, Utc};

use covid_series::app::App;
use covid_series::domain::DatasetKind;
use covid_series::error::CovidError;
use covid_series::snapshot::SnapshotStore;
use covid_series::source::{RawFetch, SeriesClient};
use covid_series::table::RawTable;

pub const CONFIRMED: &str = "\
Province/State,Country/Region,Lat,Long,3/1/20,3/2/20,3/3/20
,Italy,43.0,12.0,1694,2036,2502
,Portugal,39.4,-8.2,0,2,4
,Spain,40.0,-4.0,84,120,165
,US,37.1,-95.7,30,53,73
Washington,US,47.4,-121.5,9,18,27
A,France,46.2,2.2,1,2,3
B,France,14.6,-61.0,3,4,5
";

#[derive(Default)]
pub struct MockSeries {
    pub calls: Mutex<usize>,
}

impl MockSeries {
    pub fn calls(&self) -> usize {
        *self.calls.lock().unwrap()
    }
}

pub fn captured_at() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2020, 3, 4, 18, 30, 15).unwrap()
}

impl SeriesClient for MockSeries {
    fn fetch_raw(&self, _kind: DatasetKind) -> Result<RawFetch, CovidError> {
        *self.calls.lock().unwrap() += 1;
        Ok(RawFetch {
            table: RawTable::from_csv_str(CONFIRMED)?,
            captured_at: captured_at(),
        })
    }
}

pub fn app_in(temp: &tempfile::TempDir) -> App<MockSeries> {
    let root = Utf8PathBuf::from_path_buf(temp.path().join("data")).unwrap();
    App::new(SnapshotStore::new(root), MockSeries::default())
}
