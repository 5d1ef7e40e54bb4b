use camino::Utf8PathBuf;
use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum CovidError {
    #[error("invalid dataset kind: {0} (expected confirmed, deaths or recovered)")]
    InvalidDatasetKind(String),

    #[error("time series request failed: {0}")]
    Network(String),

    #[error("time series source returned status {status}: {message}")]
    NetworkStatus { status: u16, message: String },

    #[error("malformed header: {0}")]
    MalformedHeader(String),

    #[error("malformed row at line {line}: {reason}")]
    MalformedRow { line: usize, reason: String },

    #[error("snapshot not found: {0}")]
    #[diagnostic(help("run `covid-series fetch --save` first"))]
    SnapshotNotFound(Utf8PathBuf),

    #[error("snapshot is corrupt: {0}")]
    SnapshotCorrupt(String),

    #[error("unknown country: {0}")]
    UnknownCountry(String),

    #[error("no countries requested for the chart")]
    EmptyChart,

    #[error("filesystem error: {0}")]
    Filesystem(String),

    #[error("failed to read config file at {0}")]
    ConfigRead(Utf8PathBuf),

    #[error("failed to parse JSON config: {0}")]
    ConfigParse(String),

    #[error("rendering failed: {0}")]
    Render(String),
}
