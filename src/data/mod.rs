/// Data layer: core types, loading, filtering, and chart shaping.
///
/// Architecture:
/// ```text
///  remote .csv.gz / local .csv
///        │
///        ▼
///   ┌──────────┐
///   │  loader   │  fetch + parse → PickupTable, memoized by row limit
///   └──────────┘
///        │
///        ▼
///   ┌─────────────┐
///   │ PickupTable  │  Vec<PickupRecord>, normalized columns
///   └─────────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  filter   │  hour/date predicate → view indices
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  present  │  histogram buckets, map points, projections
///   └──────────┘
/// ```
///
/// Charts never write back: every step is a pure function of the table,
/// except the loader's process-wide cache.

pub mod filter;
pub mod loader;
pub mod model;
pub mod present;
