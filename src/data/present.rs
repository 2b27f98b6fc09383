use std::collections::BTreeMap;

use chrono::{NaiveDateTime, Timelike};

use super::model::{CellValue, PickupRecord, PickupTable, BASE_COLUMN};

// ---------------------------------------------------------------------------
// Map view constants
// ---------------------------------------------------------------------------

/// Initial camera for the filtered pickup map.
#[derive(Debug, Clone, Copy)]
pub struct MapView {
    pub lat: f64,
    pub lon: f64,
    pub zoom: f64,
    pub pitch: f64,
}

/// Fixed NYC overview the filtered map opens on.
pub const NYC_OVERVIEW: MapView = MapView {
    lat: 40.730610,
    lon: -73.935242,
    zoom: 11.0,
    pitch: 50.0,
};

impl MapView {
    /// Half-width of the visible longitude span, derived from the web
    /// mercator zoom level (world = 360° at zoom 0, halved per level).
    pub fn half_span_deg(&self) -> f64 {
        180.0 / 2f64.powf(self.zoom)
    }
}

// ---------------------------------------------------------------------------
// Histogram bucketing
// ---------------------------------------------------------------------------

/// Count records per hour of day, dates ignored. Buckets are the half-open
/// ranges `[h, h+1)` for `h` in `0..24`. An empty input yields 24 zeros.
pub fn bucketize_by_hour<'a>(rows: impl IntoIterator<Item = &'a PickupRecord>) -> [u64; 24] {
    let mut buckets = [0u64; 24];
    for rec in rows {
        buckets[rec.timestamp.hour() as usize] += 1;
    }
    buckets
}

// ---------------------------------------------------------------------------
// Geographic shaping
// ---------------------------------------------------------------------------

/// `[lon, lat]` pairs for a scatter map, in view order.
pub fn map_points(table: &PickupTable, indices: &[usize]) -> Vec<[f64; 2]> {
    indices
        .iter()
        .map(|&i| {
            let rec = &table.records[i];
            [rec.lon, rec.lat]
        })
        .collect()
}

/// One aggregated map cell: center coordinates plus the pickup count. The
/// renderer decides how count becomes size or elevation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridBin {
    pub lon: f64,
    pub lat: f64,
    pub count: u64,
}

/// Aggregate view records into square cells of `cell_deg` degrees,
/// returning bin centers in ascending (lon, lat) order. Stands in for the
/// hexagon aggregation of the original map layer.
pub fn grid_bins(table: &PickupTable, indices: &[usize], cell_deg: f64) -> Vec<GridBin> {
    let mut counts: BTreeMap<(i64, i64), u64> = BTreeMap::new();
    for &i in indices {
        let rec = &table.records[i];
        let cx = (rec.lon / cell_deg).floor() as i64;
        let cy = (rec.lat / cell_deg).floor() as i64;
        *counts.entry((cx, cy)).or_insert(0) += 1;
    }
    counts
        .into_iter()
        .map(|((cx, cy), count)| GridBin {
            lon: (cx as f64 + 0.5) * cell_deg,
            lat: (cy as f64 + 0.5) * cell_deg,
            count,
        })
        .collect()
}

/// One point of the clustered scatter chart, with its hover payload.
#[derive(Debug, Clone, PartialEq)]
pub struct ClusterPoint {
    pub lon: f64,
    pub lat: f64,
    /// Dispatch base id used for grouping and coloring.
    pub base: String,
    pub when: NaiveDateTime,
}

impl ClusterPoint {
    pub fn hour(&self) -> u32 {
        self.when.hour()
    }
}

/// Full-table feed for the clustered scatter chart. Grouping and coloring
/// happen in the renderer; rows without a base fall into an empty group.
pub fn cluster_points(table: &PickupTable) -> Vec<ClusterPoint> {
    table
        .records
        .iter()
        .map(|rec| ClusterPoint {
            lon: rec.lon,
            lat: rec.lat,
            base: match rec.extra.get(BASE_COLUMN) {
                Some(CellValue::Null) | None => String::new(),
                Some(v) => v.to_string(),
            },
            when: rec.timestamp,
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Column projection and value frequencies
// ---------------------------------------------------------------------------

/// The selected column over the whole (unfiltered) table, or `None` for an
/// unknown column name.
pub fn column_projection(table: &PickupTable, column: &str) -> Option<Vec<CellValue>> {
    if !table.has_column(column) {
        return None;
    }
    (0..table.len()).map(|row| table.cell(row, column)).collect()
}

/// Count occurrences per distinct value, ascending by value, for columns
/// with a numeric value domain. Returns `None` for non-numeric columns: the
/// frequency chart is skipped for those, never an error.
pub fn value_frequencies(table: &PickupTable, column: &str) -> Option<Vec<(CellValue, u64)>> {
    let values = column_projection(table, column)?;
    if !values.iter().any(|v| v.is_numeric()) {
        return None;
    }
    if values.iter().any(|v| !v.is_numeric() && *v != CellValue::Null) {
        return None;
    }

    let mut counts: BTreeMap<CellValue, u64> = BTreeMap::new();
    for v in values {
        if v.is_numeric() {
            *counts.entry(v).or_insert(0) += 1;
        }
    }
    // BTreeMap iteration order is CellValue's total order, ascending.
    Some(counts.into_iter().collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::filter::view;
    use crate::data::model::TIMESTAMP_FORMAT;
    use chrono::NaiveDateTime;
    use std::collections::BTreeMap as Map;

    fn rec(ts: &str, lat: f64, lon: f64, extra: &[(&str, CellValue)]) -> PickupRecord {
        PickupRecord {
            timestamp: NaiveDateTime::parse_from_str(ts, TIMESTAMP_FORMAT).unwrap(),
            lat,
            lon,
            extra: extra
                .iter()
                .map(|(k, v)| (k.to_string(), v.clone()))
                .collect::<Map<_, _>>(),
        }
    }

    fn table(records: Vec<PickupRecord>, extra_cols: &[&str]) -> PickupTable {
        let mut columns: Vec<String> =
            vec!["date/time".into(), "lat".into(), "lon".into()];
        columns.extend(extra_cols.iter().map(|c| c.to_string()));
        PickupTable { records, columns }
    }

    #[test]
    fn histogram_counts_only_the_populated_hour() {
        let records: Vec<_> = (0..7)
            .map(|m| rec(&format!("9/1/2014 5:{m:02}:00"), 40.7, -73.9, &[]))
            .collect();
        let t = table(records, &[]);

        let buckets = bucketize_by_hour(t.records.iter());
        let mut expected = [0u64; 24];
        expected[5] = 7;
        assert_eq!(buckets, expected);
    }

    #[test]
    fn histogram_of_empty_view_is_all_zeros() {
        let t = table(
            vec![rec("9/1/2014 5:00:00", 40.7, -73.9, &[])],
            &[],
        );
        let no_rows: Vec<usize> = Vec::new();
        assert_eq!(bucketize_by_hour(view(&t, &no_rows)), [0u64; 24]);
    }

    #[test]
    fn map_points_follow_view_order() {
        let t = table(
            vec![
                rec("9/1/2014 5:00:00", 40.1, -74.1, &[]),
                rec("9/1/2014 6:00:00", 40.2, -74.2, &[]),
                rec("9/1/2014 7:00:00", 40.3, -74.3, &[]),
            ],
            &[],
        );
        assert_eq!(
            map_points(&t, &[2, 0]),
            vec![[-74.3, 40.3], [-74.1, 40.1]]
        );
    }

    #[test]
    fn grid_bins_aggregate_nearby_points() {
        let t = table(
            vec![
                rec("9/1/2014 5:00:00", 40.7001, -73.9001, &[]),
                rec("9/1/2014 5:01:00", 40.7002, -73.9002, &[]),
                rec("9/1/2014 5:02:00", 40.8000, -73.8000, &[]),
            ],
            &[],
        );
        let indices: Vec<usize> = (0..t.len()).collect();
        let bins = grid_bins(&t, &indices, 0.01);
        assert_eq!(bins.len(), 2);
        assert_eq!(bins.iter().map(|b| b.count).sum::<u64>(), 3);
        assert!(bins.iter().any(|b| b.count == 2));
    }

    #[test]
    fn grid_bins_of_empty_view_are_empty() {
        let t = table(vec![rec("9/1/2014 5:00:00", 40.7, -73.9, &[])], &[]);
        assert!(grid_bins(&t, &[], 0.01).is_empty());
    }

    #[test]
    fn cluster_points_carry_hover_fields() {
        let t = table(
            vec![rec(
                "9/1/2014 17:30:00",
                40.7,
                -73.9,
                &[("base", CellValue::String("B02598".into()))],
            )],
            &["base"],
        );
        let pts = cluster_points(&t);
        assert_eq!(pts.len(), 1);
        assert_eq!(pts[0].base, "B02598");
        assert_eq!(pts[0].hour(), 17);
    }

    #[test]
    fn projection_of_non_numeric_column_has_no_frequencies() {
        let t = table(
            vec![
                rec(
                    "9/1/2014 5:00:00",
                    40.7,
                    -73.9,
                    &[("base", CellValue::String("B02512".into()))],
                ),
                rec(
                    "9/1/2014 6:00:00",
                    40.7,
                    -73.9,
                    &[("base", CellValue::String("B02598".into()))],
                ),
            ],
            &["base"],
        );
        let proj = column_projection(&t, "base").unwrap();
        assert_eq!(proj.len(), 2);
        assert_eq!(value_frequencies(&t, "base"), None);
    }

    #[test]
    fn numeric_frequencies_sort_ascending_by_value() {
        let t = table(
            vec![
                rec("9/1/2014 5:00:00", 40.7, -73.9, &[("seats", CellValue::Integer(4))]),
                rec("9/1/2014 6:00:00", 40.7, -73.9, &[("seats", CellValue::Integer(2))]),
                rec("9/1/2014 7:00:00", 40.7, -73.9, &[("seats", CellValue::Integer(4))]),
                rec("9/1/2014 8:00:00", 40.7, -73.9, &[("seats", CellValue::Null)]),
            ],
            &["seats"],
        );
        assert_eq!(
            value_frequencies(&t, "seats"),
            Some(vec![
                (CellValue::Integer(2), 1),
                (CellValue::Integer(4), 2),
            ])
        );
    }

    #[test]
    fn unknown_column_yields_no_projection() {
        let t = table(vec![rec("9/1/2014 5:00:00", 40.7, -73.9, &[])], &[]);
        assert_eq!(column_projection(&t, "nope"), None);
        assert_eq!(value_frequencies(&t, "nope"), None);
    }

    #[test]
    fn lat_column_is_a_numeric_domain() {
        let t = table(
            vec![
                rec("9/1/2014 5:00:00", 40.7, -73.9, &[]),
                rec("9/1/2014 6:00:00", 40.7, -73.9, &[]),
                rec("9/1/2014 7:00:00", 40.8, -73.9, &[]),
            ],
            &[],
        );
        let freqs = value_frequencies(&t, "lat").unwrap();
        assert_eq!(
            freqs,
            vec![
                (CellValue::Float(40.7), 2),
                (CellValue::Float(40.8), 1),
            ]
        );
    }
}
