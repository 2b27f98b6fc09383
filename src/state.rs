use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::NaiveDate;

use crate::color::BaseColorMap;
use crate::data::filter::{filtered_indices, FilterPredicate};
use crate::data::loader::{DatasetLoader, DEFAULT_ROW_LIMIT};
use crate::data::model::PickupTable;
use crate::data::present::{bucketize_by_hour, cluster_points, map_points, ClusterPoint};

// ---------------------------------------------------------------------------
// Session context
// ---------------------------------------------------------------------------

/// Per-session render counter, owned by the state rather than ambient. One
/// increment per pipeline re-evaluation; only "non-decreasing" matters.
#[derive(Debug, Default)]
pub struct SessionContext {
    visits: u64,
}

impl SessionContext {
    pub fn record_render(&mut self) {
        self.visits += 1;
    }

    pub fn visits(&self) -> u64 {
        self.visits
    }
}

// ---------------------------------------------------------------------------
// Application state
// ---------------------------------------------------------------------------

/// The full UI state, independent of rendering.
pub struct AppState {
    /// Memoizing dataset loader (process-wide cache, keyed by row limit).
    pub loader: DatasetLoader,

    /// Loaded table (None until the startup load succeeds).
    pub table: Option<Arc<PickupTable>>,

    /// Row limit for the next load.
    pub row_limit: usize,

    /// Whether the startup load has been attempted at least once.
    pub load_attempted: bool,

    // ---- widget values ----
    pub show_raw: bool,
    pub hour: u8,
    pub date_enabled: bool,
    pub date_buffer: NaiveDate,
    pub selected_column: Option<String>,

    /// Indices of records passing the current predicate (cached view).
    pub filtered: Vec<usize>,

    // ---- full-table chart feeds, rebuilt once per load ----
    pub hour_histogram: [u64; 24],
    pub all_points: Vec<[f64; 2]>,
    /// Shared so the hover formatter can hold a cheap handle.
    pub clusters: Arc<Vec<ClusterPoint>>,
    pub base_colors: BaseColorMap,

    /// Status / error message shown in the top bar.
    pub status_message: Option<String>,

    pub session: SessionContext,
}

impl Default for AppState {
    fn default() -> Self {
        Self::with_loader(DatasetLoader::remote())
    }
}

impl AppState {
    pub fn with_loader(loader: DatasetLoader) -> Self {
        Self {
            loader,
            table: None,
            row_limit: DEFAULT_ROW_LIMIT,
            load_attempted: false,
            show_raw: false,
            hour: 17,
            date_enabled: false,
            // First day covered by the dataset.
            date_buffer: NaiveDate::from_ymd_opt(2014, 9, 1).expect("valid date"),
            selected_column: None,
            filtered: Vec::new(),
            hour_histogram: [0; 24],
            all_points: Vec::new(),
            clusters: Arc::new(Vec::new()),
            base_colors: BaseColorMap::new(&BTreeSet::new()),
            status_message: None,
            session: SessionContext::default(),
        }
    }

    /// The predicate the current widget values describe.
    pub fn predicate(&self) -> FilterPredicate {
        FilterPredicate {
            hour: self.hour,
            date: self.date_enabled.then_some(self.date_buffer),
            column: self.selected_column.clone(),
        }
    }

    /// Run (or re-run) the loader for the current row limit. A repeated
    /// limit is served from the cache; failures land in the status line.
    pub fn load_dataset(&mut self) {
        self.load_attempted = true;
        match self.loader.load(self.row_limit) {
            Ok(table) => self.set_table(table),
            Err(e) => {
                log::error!("dataset load failed: {e}");
                self.status_message = Some(format!("Error: {e}"));
            }
        }
        self.session.record_render();
    }

    /// Ingest a loaded table and rebuild everything derived from it.
    fn set_table(&mut self, table: Arc<PickupTable>) {
        let indices: Vec<usize> = (0..table.len()).collect();
        self.hour_histogram = bucketize_by_hour(table.records.iter());
        self.all_points = map_points(&table, &indices);
        self.clusters = Arc::new(cluster_points(&table));

        let bases: BTreeSet<String> = self
            .clusters
            .iter()
            .map(|p| p.base.clone())
            .collect();
        self.base_colors = BaseColorMap::new(&bases);

        // Drop a selection that no longer names a column.
        if let Some(col) = &self.selected_column {
            if !table.has_column(col) {
                self.selected_column = None;
            }
        }

        self.table = Some(table);
        self.status_message = None;
        self.refilter();
    }

    /// Recompute the filtered view after a widget interaction.
    pub fn on_interaction(&mut self) {
        self.refilter();
        self.session.record_render();
    }

    fn refilter(&mut self) {
        let predicate = self.predicate();
        if let Some(table) = &self.table {
            self.filtered = filtered_indices(table, &predicate);
        } else {
            self.filtered.clear();
        }
    }
}
