use camino::Utf8PathBuf;

use crate::chart::ChartPlan;
use crate::domain::DatasetKind;
use crate::error::CovidError;
use crate::normalize::normalize;
use crate::png::PngChart;
use crate::session::{DatasetSession, SessionOrigin};
use crate::snapshot::SnapshotStore;
use crate::source::SeriesClient;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestoreSource {
    Binary,
    Text,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PlotOptions {
    pub save_figure: bool,
}

#[derive(Debug, Clone)]
pub struct PlotResult {
    pub plan: ChartPlan,
    pub figure_path: Option<Utf8PathBuf>,
}

#[derive(Clone)]
pub struct App<C: SeriesClient> {
    store: SnapshotStore,
    client: C,
}

impl<C: SeriesClient> App<C> {
    pub fn new(store: SnapshotStore, client: C) -> Self {
        Self { store, client }
    }

    pub fn store(&self) -> &SnapshotStore {
        &self.store
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    /// Downloads and normalizes one dataset kind, saving it when `autosave`
    /// is set.
    pub fn acquire(&self, kind: DatasetKind, autosave: bool) -> Result<DatasetSession, CovidError> {
        let raw = self.client.fetch_raw(kind)?;
        let table = normalize(&raw.table)?;
        tracing::info!(
            kind = %kind,
            countries = table.len(),
            dates = table.date_labels().len(),
            "normalized time series"
        );
        let session = DatasetSession::new(kind, raw.captured_at, SessionOrigin::Fetched, table)?;
        if autosave {
            self.store.save(&session)?;
        }
        Ok(session)
    }

    /// Same as [`App::acquire`] for a kind given by name. An unknown name
    /// fails with `InvalidDatasetKind` before the client is touched.
    pub fn acquire_by_name(&self, kind: &str, autosave: bool) -> Result<DatasetSession, CovidError> {
        let kind = kind.parse::<DatasetKind>()?;
        self.acquire(kind, autosave)
    }

    pub fn restore(
        &self,
        kind: DatasetKind,
        source: RestoreSource,
    ) -> Result<DatasetSession, CovidError> {
        match source {
            RestoreSource::Binary => self.store.load(kind),
            RestoreSource::Text => self.store.load_text(kind),
        }
    }

    pub fn save(&self, session: &DatasetSession) -> Result<(), CovidError> {
        self.store.save(session)
    }

    pub fn plot(
        &self,
        session: &DatasetSession,
        countries: &[String],
        options: PlotOptions,
    ) -> Result<PlotResult, CovidError> {
        let plan = ChartPlan::new(session, countries)?;
        let figure_path = if options.save_figure {
            self.store.ensure_root()?;
            let path = self.store.figure_path(session.kind());
            PngChart::save(&plan, &path)?;
            Some(path)
        } else {
            None
        };
        Ok(PlotResult { plan, figure_path })
    }
}
