use std::collections::BTreeMap;
use std::fmt;

use chrono::NaiveDateTime;

/// Canonical (normalized) name of the timestamp column.
pub const DATE_COLUMN: &str = "date/time";
/// Canonical name of the latitude column.
pub const LAT_COLUMN: &str = "lat";
/// Canonical name of the longitude column.
pub const LON_COLUMN: &str = "lon";
/// Canonical name of the dispatch-base identifier column.
pub const BASE_COLUMN: &str = "base";

/// Timestamp layout used by the dataset, e.g. `9/1/2014 0:01:00`.
pub const TIMESTAMP_FORMAT: &str = "%m/%d/%Y %H:%M:%S";

// ---------------------------------------------------------------------------
// CellValue – a single cell in a passthrough column or a projection
// ---------------------------------------------------------------------------

/// A dynamically-typed cell value for columns whose type is only known at
/// load time. Used as `BTreeMap` keys downstream so it must be `Ord`.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    String(String),
    Integer(i64),
    Float(f64),
    Null,
}

// -- Manual Eq/Ord so CellValue can key frequency maps --

impl Eq for CellValue {}

impl PartialOrd for CellValue {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for CellValue {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        use CellValue::*;
        fn discriminant(v: &CellValue) -> u8 {
            match v {
                Null => 0,
                Integer(_) => 1,
                Float(_) => 2,
                String(_) => 3,
            }
        }
        let da = discriminant(self);
        let db = discriminant(other);
        if da != db {
            return da.cmp(&db);
        }
        match (self, other) {
            (Null, Null) => std::cmp::Ordering::Equal,
            (Integer(a), Integer(b)) => a.cmp(b),
            (Float(a), Float(b)) => a.total_cmp(b),
            (String(a), String(b)) => a.cmp(b),
            _ => std::cmp::Ordering::Equal,
        }
    }
}

impl std::hash::Hash for CellValue {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            CellValue::String(s) => s.hash(state),
            CellValue::Integer(i) => i.hash(state),
            CellValue::Float(f) => f.to_bits().hash(state),
            CellValue::Null => {}
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::String(s) => write!(f, "{s}"),
            CellValue::Integer(i) => write!(f, "{i}"),
            CellValue::Float(v) => write!(f, "{v}"),
            CellValue::Null => write!(f, "<null>"),
        }
    }
}

impl CellValue {
    /// Interpret the value as `f64` where its domain allows it.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            CellValue::Float(v) => Some(*v),
            CellValue::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    /// Whether the value belongs to a numeric domain. Nulls are neutral:
    /// they neither make a column numeric nor disqualify it.
    pub fn is_numeric(&self) -> bool {
        matches!(self, CellValue::Integer(_) | CellValue::Float(_))
    }
}

// ---------------------------------------------------------------------------
// PickupRecord – one row of the dataset
// ---------------------------------------------------------------------------

/// A single observed pickup event (one CSV row). Immutable once loaded.
#[derive(Debug, Clone)]
pub struct PickupRecord {
    /// Pickup time, always parseable at load time or the load fails.
    pub timestamp: NaiveDateTime,
    pub lat: f64,
    pub lon: f64,
    /// Passthrough columns (e.g. dispatch base id): column_name → value.
    pub extra: BTreeMap<String, CellValue>,
}

// ---------------------------------------------------------------------------
// PickupTable – the complete loaded dataset
// ---------------------------------------------------------------------------

/// The canonical table: records in source order plus the normalized header.
///
/// Invariants: column names are unique, lower-cased and trimmed; every
/// record's timestamp and coordinates parsed successfully.
#[derive(Debug, Clone)]
pub struct PickupTable {
    pub records: Vec<PickupRecord>,
    /// Column names in CSV header order.
    pub columns: Vec<String>,
}

impl PickupTable {
    /// Number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the table has no records.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Resolve a cell by row index and normalized column name. The
    /// timestamp and coordinate columns are materialized on the fly so
    /// projections treat every column uniformly.
    pub fn cell(&self, row: usize, column: &str) -> Option<CellValue> {
        let rec = self.records.get(row)?;
        match column {
            DATE_COLUMN => Some(CellValue::String(
                rec.timestamp.format(TIMESTAMP_FORMAT).to_string(),
            )),
            LAT_COLUMN => Some(CellValue::Float(rec.lat)),
            LON_COLUMN => Some(CellValue::Float(rec.lon)),
            other => Some(rec.extra.get(other).cloned().unwrap_or(CellValue::Null)),
        }
    }

    /// Whether the table knows a column of this name.
    pub fn has_column(&self, column: &str) -> bool {
        self.columns.iter().any(|c| c == column)
    }
}
