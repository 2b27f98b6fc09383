use chrono::{NaiveDate, Timelike};

use super::model::{PickupRecord, PickupTable};

// ---------------------------------------------------------------------------
// Filter predicate: widget state distilled to a row condition
// ---------------------------------------------------------------------------

/// Conjunction of the user's filter choices. Rebuilt from widget state on
/// every interaction, never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterPredicate {
    /// Hour-of-day to keep. Always active; the slider has no "off" state.
    pub hour: u8,
    /// Calendar date to keep. `None` means no date restriction.
    pub date: Option<NaiveDate>,
    /// Column chosen for projection. Orthogonal to row filtering.
    pub column: Option<String>,
}

impl Default for FilterPredicate {
    fn default() -> Self {
        Self {
            hour: 17,
            date: None,
            column: None,
        }
    }
}

impl FilterPredicate {
    /// Whether a record passes the hour and (if set) date conditions.
    pub fn matches(&self, record: &PickupRecord) -> bool {
        if record.timestamp.hour() != u32::from(self.hour) {
            return false;
        }
        match self.date {
            Some(d) => record.timestamp.date() == d,
            None => true,
        }
    }
}

/// Return indices of records passing the predicate, in source order.
///
/// The result is a non-owning view: downstream shaping resolves indices
/// against the same table. An empty result is a valid, displayable state.
pub fn filtered_indices(table: &PickupTable, predicate: &FilterPredicate) -> Vec<usize> {
    table
        .records
        .iter()
        .enumerate()
        .filter(|(_, rec)| predicate.matches(rec))
        .map(|(i, _)| i)
        .collect()
}

/// Adapt a set of view indices to a record iterator.
pub fn view<'a>(
    table: &'a PickupTable,
    indices: &'a [usize],
) -> impl Iterator<Item = &'a PickupRecord> + 'a {
    indices.iter().map(|&i| &table.records[i])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::TIMESTAMP_FORMAT;
    use chrono::NaiveDateTime;
    use std::collections::BTreeMap;

    fn table(timestamps: &[&str]) -> PickupTable {
        let records = timestamps
            .iter()
            .map(|ts| PickupRecord {
                timestamp: NaiveDateTime::parse_from_str(ts, TIMESTAMP_FORMAT).unwrap(),
                lat: 40.7,
                lon: -73.9,
                extra: BTreeMap::new(),
            })
            .collect();
        PickupTable {
            records,
            columns: vec!["date/time".into(), "lat".into(), "lon".into()],
        }
    }

    fn hour_only(hour: u8) -> FilterPredicate {
        FilterPredicate {
            hour,
            date: None,
            column: None,
        }
    }

    #[test]
    fn hour_filter_keeps_matching_rows_in_order() {
        let t = table(&[
            "9/1/2014 5:00:00",
            "9/1/2014 17:10:00",
            "9/2/2014 17:59:00",
            "9/2/2014 18:00:00",
        ]);
        assert_eq!(filtered_indices(&t, &hour_only(17)), vec![1, 2]);
    }

    #[test]
    fn hour_filters_partition_the_table() {
        let t = table(&[
            "9/1/2014 0:00:00",
            "9/1/2014 5:30:00",
            "9/1/2014 5:45:00",
            "9/1/2014 12:00:00",
            "9/1/2014 23:59:59",
        ]);
        let mut seen = Vec::new();
        for hour in 0..24 {
            seen.extend(filtered_indices(&t, &hour_only(hour)));
        }
        seen.sort_unstable();
        assert_eq!(seen, (0..t.len()).collect::<Vec<_>>());
    }

    #[test]
    fn absent_date_is_vacuously_true() {
        let t = table(&["9/1/2014 17:00:00", "9/2/2014 17:00:00"]);
        assert_eq!(filtered_indices(&t, &hour_only(17)), vec![0, 1]);
    }

    #[test]
    fn date_and_hour_filter_is_the_intersection() {
        let t = table(&[
            "9/1/2014 17:00:00",
            "9/1/2014 9:00:00",
            "9/2/2014 17:00:00",
            "9/2/2014 17:30:00",
        ]);
        let date = NaiveDate::from_ymd_opt(2014, 9, 2).unwrap();

        let both = FilterPredicate {
            hour: 17,
            date: Some(date),
            column: None,
        };
        let combined = filtered_indices(&t, &both);

        let hour_hits = filtered_indices(&t, &hour_only(17));
        let date_hits: Vec<usize> = t
            .records
            .iter()
            .enumerate()
            .filter(|(_, r)| r.timestamp.date() == date)
            .map(|(i, _)| i)
            .collect();
        let intersection: Vec<usize> = hour_hits
            .into_iter()
            .filter(|i| date_hits.contains(i))
            .collect();

        assert_eq!(combined, intersection);
        assert_eq!(combined, vec![2, 3]);
    }

    #[test]
    fn no_matches_is_an_empty_view_not_an_error() {
        let t = table(&["9/1/2014 5:00:00"]);
        let pred = FilterPredicate {
            hour: 5,
            date: NaiveDate::from_ymd_opt(2014, 10, 1),
            column: None,
        };
        assert!(filtered_indices(&t, &pred).is_empty());
    }

    #[test]
    fn column_selection_never_removes_rows() {
        let t = table(&["9/1/2014 17:00:00", "9/2/2014 17:00:00"]);
        let with_col = FilterPredicate {
            hour: 17,
            date: None,
            column: Some("lat".into()),
        };
        assert_eq!(
            filtered_indices(&t, &with_col),
            filtered_indices(&t, &hour_only(17))
        );
    }
}
