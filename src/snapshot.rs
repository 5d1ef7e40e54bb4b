use std::fs;
use std::io::{self, Write};

use camino::{Utf8Path, Utf8PathBuf};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::DatasetKind;
use crate::error::CovidError;
use crate::session::{DatasetSession, SessionOrigin};
use crate::table::CanonicalTable;

pub const SNAPSHOT_FORMAT_VERSION: u32 = 1;

/// Persisted form of a session. Derived fields are recomputed on load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotRecord {
    pub format_version: u32,
    pub kind: DatasetKind,
    pub captured_at: DateTime<Utc>,
    pub table: CanonicalTable,
}

#[derive(Debug, Clone)]
pub struct SnapshotStore {
    root: Utf8PathBuf,
}

impl SnapshotStore {
    pub fn new(root: Utf8PathBuf) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    pub fn text_path(&self, kind: DatasetKind) -> Utf8PathBuf {
        self.root.join(format!("{kind}.csv"))
    }

    pub fn binary_path(&self, kind: DatasetKind) -> Utf8PathBuf {
        self.root.join(format!("{kind}.snapshot"))
    }

    pub fn figure_path(&self, kind: DatasetKind) -> Utf8PathBuf {
        self.root.join(format!("{kind}.png"))
    }

    pub fn ensure_root(&self) -> Result<(), CovidError> {
        fs::create_dir_all(self.root.as_std_path())
            .map_err(|err| CovidError::Filesystem(err.to_string()))
    }

    /// Writes both the CSV text form and the binary record.
    pub fn save(&self, session: &DatasetSession) -> Result<(), CovidError> {
        self.ensure_root()?;
        let kind = session.kind();

        let mut text = Vec::new();
        session.table().write_csv(&mut text)?;
        write_bytes_atomic(&self.text_path(kind), &text)?;

        let record = SnapshotRecord {
            format_version: SNAPSHOT_FORMAT_VERSION,
            kind,
            captured_at: session.captured_at(),
            table: session.table().clone(),
        };
        let encoded =
            bincode::serialize(&record).map_err(|err| CovidError::Filesystem(err.to_string()))?;
        write_bytes_atomic(&self.binary_path(kind), &encoded)?;

        tracing::info!(
            kind = %kind,
            text = %self.text_path(kind),
            binary = %self.binary_path(kind),
            "saved snapshot"
        );
        Ok(())
    }

    pub fn load_record(&self, kind: DatasetKind) -> Result<SnapshotRecord, CovidError> {
        let path = self.binary_path(kind);
        let data = read_snapshot(&path)?;
        let record: SnapshotRecord = bincode::deserialize(&data)
            .map_err(|err| CovidError::SnapshotCorrupt(format!("{path}: {err}")))?;
        if record.format_version != SNAPSHOT_FORMAT_VERSION {
            return Err(CovidError::SnapshotCorrupt(format!(
                "{path}: format version {} (expected {SNAPSHOT_FORMAT_VERSION})",
                record.format_version
            )));
        }
        if record.kind != kind {
            return Err(CovidError::SnapshotCorrupt(format!(
                "{path}: holds {} data, expected {kind}",
                record.kind
            )));
        }
        Ok(record)
    }

    /// Restores a session from the binary snapshot, keeping its capture time.
    pub fn load(&self, kind: DatasetKind) -> Result<DatasetSession, CovidError> {
        let record = self.load_record(kind)?;
        tracing::info!(kind = %kind, path = %self.binary_path(kind), "loaded snapshot");
        DatasetSession::new(
            record.kind,
            record.captured_at,
            SessionOrigin::Snapshot,
            record.table,
        )
        .map_err(|err| CovidError::SnapshotCorrupt(err.to_string()))
    }

    /// Restores a session from the CSV text form. The text form has no capture
    /// time, so the load time stands in for it.
    pub fn load_text(&self, kind: DatasetKind) -> Result<DatasetSession, CovidError> {
        let path = self.text_path(kind);
        let data = read_snapshot(&path)?;
        let table = CanonicalTable::read_csv(data.as_slice())
            .map_err(|err| CovidError::SnapshotCorrupt(format!("{path}: {err}")))?;
        tracing::warn!(
            path = %path,
            "data loaded from csv has no capture time; load the binary snapshot for that information"
        );
        DatasetSession::new(kind, Utc::now(), SessionOrigin::Text, table)
            .map_err(|err| CovidError::SnapshotCorrupt(err.to_string()))
    }
}

fn read_snapshot(path: &Utf8Path) -> Result<Vec<u8>, CovidError> {
    fs::read(path.as_std_path()).map_err(|err| match err.kind() {
        io::ErrorKind::NotFound => CovidError::SnapshotNotFound(path.to_path_buf()),
        _ => CovidError::Filesystem(format!("read {path}: {err}")),
    })
}

/// Writes `content` to a temp file next to `path` and renames it into place.
pub fn write_bytes_atomic(path: &Utf8Path, content: &[u8]) -> Result<(), CovidError> {
    let parent = path
        .parent()
        .filter(|parent| !parent.as_str().is_empty())
        .unwrap_or_else(|| Utf8Path::new("."));
    fs::create_dir_all(parent.as_std_path())
        .map_err(|err| CovidError::Filesystem(err.to_string()))?;
    let mut temp = tempfile::Builder::new()
        .prefix(".covid-series")
        .tempfile_in(parent.as_std_path())
        .map_err(|err| CovidError::Filesystem(err.to_string()))?;
    temp.write_all(content)
        .map_err(|err| CovidError::Filesystem(err.to_string()))?;
    temp.as_file()
        .sync_all()
        .map_err(|err| CovidError::Filesystem(err.to_string()))?;
    temp.persist(path.as_std_path())
        .map_err(|err| CovidError::Filesystem(format!("persist {path}: {}", err.error)))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_paths() {
        let store = SnapshotStore::new(Utf8PathBuf::from("data"));
        assert!(store.text_path(DatasetKind::Deaths).ends_with("deaths.csv"));
        assert!(
            store
                .binary_path(DatasetKind::Confirmed)
                .ends_with("confirmed.snapshot")
        );
        assert!(
            store
                .figure_path(DatasetKind::Recovered)
                .ends_with("recovered.png")
        );
    }
}
