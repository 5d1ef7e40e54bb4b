mod common;

use assert_matches::assert_matches;
use chrono::{DateTime, Utc};
use serde::Serialize;

use covid_series::app::RestoreSource;
use covid_series::domain::DatasetKind;
use covid_series::error::CovidError;
use covid_series::session::SessionOrigin;

use common::{app_in, captured_at};

#[test]
fn binary_snapshot_roundtrips_every_kind() {
    let temp = tempfile::tempdir().unwrap();
    let app = app_in(&temp);

    for kind in DatasetKind::ALL {
        let fetched = app.acquire(kind, true).unwrap();
        let restored = app.restore(kind, RestoreSource::Binary).unwrap();
        assert_eq!(restored.kind(), kind);
        assert_eq!(restored.table(), fetched.table());
        assert_eq!(restored.captured_at(), fetched.captured_at());
        assert_eq!(restored.origin(), SessionOrigin::Snapshot);
    }
}

#[test]
fn deaths_total_survives_save_and_load() {
    let temp = tempfile::tempdir().unwrap();
    let app = app_in(&temp);

    let session = app.acquire(DatasetKind::Deaths, false).unwrap();
    app.save(&session).unwrap();
    let restored = app.restore(DatasetKind::Deaths, RestoreSource::Binary).unwrap();
    assert_eq!(restored.total_cases(), session.total_cases());
    assert_eq!(restored.date_columns(), session.date_columns());
}

#[test]
fn text_snapshot_has_load_time() {
    let temp = tempfile::tempdir().unwrap();
    let app = app_in(&temp);

    let session = app.acquire(DatasetKind::Confirmed, true).unwrap();
    let restored = app.restore(DatasetKind::Confirmed, RestoreSource::Text).unwrap();
    assert_eq!(restored.origin(), SessionOrigin::Text);
    assert_eq!(restored.table(), session.table());
    assert_ne!(restored.captured_at(), captured_at());

    let text = std::fs::read_to_string(app.store().text_path(DatasetKind::Confirmed)).unwrap();
    assert!(text.starts_with("Country/Region,01/03/2020,02/03/2020,03/03/2020\n"));
    assert!(text.contains("France,4,6,8\n"));
}

#[test]
fn missing_snapshot_is_reported() {
    let temp = tempfile::tempdir().unwrap();
    let app = app_in(&temp);

    assert_matches!(
        app.restore(DatasetKind::Recovered, RestoreSource::Binary),
        Err(CovidError::SnapshotNotFound(_))
    );
    assert_matches!(
        app.restore(DatasetKind::Recovered, RestoreSource::Text),
        Err(CovidError::SnapshotNotFound(_))
    );
}

#[test]
fn corrupt_snapshot_is_reported() {
    let temp = tempfile::tempdir().unwrap();
    let app = app_in(&temp);
    app.store().ensure_root().unwrap();

    let path = app.store().binary_path(DatasetKind::Confirmed);
    std::fs::write(path.as_std_path(), b"not a snapshot").unwrap();
    assert_matches!(
        app.restore(DatasetKind::Confirmed, RestoreSource::Binary),
        Err(CovidError::SnapshotCorrupt(_))
    );
}

#[derive(Serialize)]
struct RawRecord {
    format_version: u32,
    kind: DatasetKind,
    captured_at: DateTime<Utc>,
    table: RawColumns,
}

#[derive(Serialize)]
struct RawColumns {
    countries: Vec<String>,
    dates: Vec<String>,
    counts: Vec<Vec<u64>>,
}

fn write_record(app: &covid_series::app::App<common::MockSeries>, record: &RawRecord) {
    app.store().ensure_root().unwrap();
    let bytes = bincode::serialize(record).unwrap();
    let path = app.store().binary_path(record.kind);
    std::fs::write(path.as_std_path(), bytes).unwrap();
}

#[test]
fn snapshot_with_ragged_counts_is_corrupt() {
    let temp = tempfile::tempdir().unwrap();
    let app = app_in(&temp);

    write_record(
        &app,
        &RawRecord {
            format_version: covid_series::snapshot::SNAPSHOT_FORMAT_VERSION,
            kind: DatasetKind::Deaths,
            captured_at: captured_at(),
            table: RawColumns {
                countries: vec!["Spain".to_string()],
                dates: vec!["01/03/2020".to_string()],
                counts: vec![vec![5, 1]],
            },
        },
    );
    assert_matches!(
        app.store().load(DatasetKind::Deaths),
        Err(CovidError::SnapshotCorrupt(_))
    );
}

#[test]
fn snapshot_with_missing_rows_is_corrupt() {
    let temp = tempfile::tempdir().unwrap();
    let app = app_in(&temp);

    write_record(
        &app,
        &RawRecord {
            format_version: covid_series::snapshot::SNAPSHOT_FORMAT_VERSION,
            kind: DatasetKind::Deaths,
            captured_at: captured_at(),
            table: RawColumns {
                countries: vec!["Spain".to_string(), "Italy".to_string()],
                dates: vec!["01/03/2020".to_string()],
                counts: vec![vec![5]],
            },
        },
    );
    assert_matches!(
        app.store().load(DatasetKind::Deaths),
        Err(CovidError::SnapshotCorrupt(_))
    );
}

#[test]
fn snapshot_of_other_kind_is_rejected() {
    let temp = tempfile::tempdir().unwrap();
    let app = app_in(&temp);

    app.acquire(DatasetKind::Deaths, true).unwrap();
    let store = app.store();
    std::fs::copy(
        store.binary_path(DatasetKind::Deaths).as_std_path(),
        store.binary_path(DatasetKind::Recovered).as_std_path(),
    )
    .unwrap();
    assert_matches!(
        store.load(DatasetKind::Recovered),
        Err(CovidError::SnapshotCorrupt(_))
    );
}

#[test]
fn save_leaves_no_temp_files() {
    let temp = tempfile::tempdir().unwrap();
    let app = app_in(&temp);

    app.acquire(DatasetKind::Confirmed, true).unwrap();
    let mut names = std::fs::read_dir(app.store().root().as_std_path())
        .unwrap()
        .map(|entry| entry.unwrap().file_name().into_string().unwrap())
        .collect::<Vec<_>>();
    names.sort();
    assert_eq!(names, vec!["confirmed.csv", "confirmed.snapshot"]);
}
