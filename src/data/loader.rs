use std::collections::{BTreeMap, BTreeSet};
use std::io::Read;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::NaiveDateTime;
use flate2::read::GzDecoder;
use thiserror::Error;

use super::model::{
    CellValue, PickupRecord, PickupTable, DATE_COLUMN, LAT_COLUMN, LON_COLUMN, TIMESTAMP_FORMAT,
};

/// Public S3 copy of the September 2014 Uber pickups dataset.
pub const DATA_URL: &str =
    "https://s3-us-west-2.amazonaws.com/streamlit-demo-data/uber-raw-data-sep14.csv.gz";

/// Row limit requested on startup.
pub const DEFAULT_ROW_LIMIT: usize = 30_000;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors raised while loading the dataset. Loader errors are fatal to the
/// current evaluation: there is no partial table and no retry.
#[derive(Debug, Error)]
pub enum LoadError {
    /// The remote resource (or local file) could not be read or decompressed.
    #[error("fetch failed: {0}")]
    Fetch(String),

    /// The CSV header lacks a required column, or repeats one.
    #[error("missing required column '{0}'")]
    MissingColumn(String),

    /// A timestamp or coordinate cell could not be coerced.
    #[error("row {row}: {message}")]
    Parse { row: usize, message: String },
}

// ---------------------------------------------------------------------------
// Sources: where the raw CSV bytes come from
// ---------------------------------------------------------------------------

/// Supplier of raw CSV bytes. The production source is HTTP; a file source
/// covers offline use and the tests substitute in-memory doubles.
pub trait CsvSource {
    fn fetch(&self) -> Result<Vec<u8>, LoadError>;

    /// Short description for log lines.
    fn describe(&self) -> String;
}

/// Blocking HTTP GET of a (possibly gzipped) CSV resource.
pub struct HttpSource {
    url: String,
}

impl HttpSource {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

impl CsvSource for HttpSource {
    fn fetch(&self) -> Result<Vec<u8>, LoadError> {
        let response = reqwest::blocking::get(&self.url)
            .and_then(|r| r.error_for_status())
            .map_err(|e| LoadError::Fetch(e.to_string()))?;
        let body = response
            .bytes()
            .map_err(|e| LoadError::Fetch(e.to_string()))?;
        maybe_gunzip(self.url.ends_with(".gz"), &body)
    }

    fn describe(&self) -> String {
        self.url.clone()
    }
}

/// Local CSV file, e.g. one produced by the `generate_sample` binary.
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl CsvSource for FileSource {
    fn fetch(&self) -> Result<Vec<u8>, LoadError> {
        let bytes = std::fs::read(&self.path)
            .map_err(|e| LoadError::Fetch(format!("{}: {e}", self.path.display())))?;
        let gz = self.path.extension().is_some_and(|e| e == "gz");
        maybe_gunzip(gz, &bytes)
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

fn maybe_gunzip(compressed: bool, bytes: &[u8]) -> Result<Vec<u8>, LoadError> {
    if !compressed {
        return Ok(bytes.to_vec());
    }
    let mut out = Vec::new();
    GzDecoder::new(bytes)
        .read_to_end(&mut out)
        .map_err(|e| LoadError::Fetch(format!("decompressing response: {e}")))?;
    Ok(out)
}

// ---------------------------------------------------------------------------
// DatasetLoader: fetch + parse, memoized by row limit
// ---------------------------------------------------------------------------

/// Loads the pickup table, memoized by `row_limit`: one fetch per distinct
/// limit for the process lifetime. The cache is unbounded and never
/// invalidated — the dataset is assumed static while the process runs.
pub struct DatasetLoader {
    source: Box<dyn CsvSource>,
    cache: BTreeMap<usize, Arc<PickupTable>>,
}

impl DatasetLoader {
    pub fn new(source: Box<dyn CsvSource>) -> Self {
        Self {
            source,
            cache: BTreeMap::new(),
        }
    }

    /// Loader for the canonical remote dataset.
    pub fn remote() -> Self {
        Self::new(Box::new(HttpSource::new(DATA_URL)))
    }

    /// Fetch, parse, and cache the first `row_limit` records. A repeated
    /// `row_limit` returns the cached table without touching the source.
    pub fn load(&mut self, row_limit: usize) -> Result<Arc<PickupTable>, LoadError> {
        if let Some(table) = self.cache.get(&row_limit) {
            log::debug!("cache hit for row_limit={row_limit}");
            return Ok(Arc::clone(table));
        }

        log::info!(
            "loading up to {row_limit} rows from {}",
            self.source.describe()
        );
        let bytes = self.source.fetch()?;
        let table = Arc::new(parse_table(&bytes, row_limit)?);
        log::info!(
            "loaded {} pickups with columns {:?}",
            table.len(),
            table.columns
        );
        self.cache.insert(row_limit, Arc::clone(&table));
        Ok(table)
    }
}

// ---------------------------------------------------------------------------
// CSV parsing
// ---------------------------------------------------------------------------

/// Parse raw CSV bytes into a [`PickupTable`], keeping at most `row_limit`
/// records. Header names are lower-cased and trimmed; nothing else is
/// renamed. Any malformed timestamp or coordinate fails the whole load.
pub fn parse_table(bytes: &[u8], row_limit: usize) -> Result<PickupTable, LoadError> {
    let mut reader = csv::Reader::from_reader(bytes);

    let columns: Vec<String> = reader
        .headers()
        .map_err(|e| LoadError::Fetch(format!("reading CSV header: {e}")))?
        .iter()
        .map(|h| h.trim().to_lowercase())
        .collect();

    let mut seen = BTreeSet::new();
    for col in &columns {
        if !seen.insert(col.as_str()) {
            return Err(LoadError::MissingColumn(format!(
                "{col} (duplicated after normalization)"
            )));
        }
    }

    let col_index = |name: &str| -> Result<usize, LoadError> {
        columns
            .iter()
            .position(|c| c == name)
            .ok_or_else(|| LoadError::MissingColumn(name.to_string()))
    };
    let ts_idx = col_index(DATE_COLUMN)?;
    let lat_idx = col_index(LAT_COLUMN)?;
    let lon_idx = col_index(LON_COLUMN)?;

    let mut records = Vec::new();

    for (row_no, result) in reader.records().enumerate() {
        if row_no >= row_limit {
            break;
        }
        let record = result.map_err(|e| LoadError::Parse {
            row: row_no,
            message: e.to_string(),
        })?;

        let raw_ts = record.get(ts_idx).unwrap_or("");
        let timestamp =
            NaiveDateTime::parse_from_str(raw_ts, TIMESTAMP_FORMAT).map_err(|e| {
                LoadError::Parse {
                    row: row_no,
                    message: format!("'{raw_ts}' is not a {TIMESTAMP_FORMAT} timestamp: {e}"),
                }
            })?;
        let lat = parse_coord(record.get(lat_idx).unwrap_or(""), row_no, LAT_COLUMN)?;
        let lon = parse_coord(record.get(lon_idx).unwrap_or(""), row_no, LON_COLUMN)?;

        let mut extra = BTreeMap::new();
        for (col_idx, value) in record.iter().enumerate() {
            if col_idx == ts_idx || col_idx == lat_idx || col_idx == lon_idx {
                continue;
            }
            if let Some(name) = columns.get(col_idx) {
                extra.insert(name.clone(), guess_cell_type(value));
            }
        }

        records.push(PickupRecord {
            timestamp,
            lat,
            lon,
            extra,
        });
    }

    Ok(PickupTable { records, columns })
}

fn parse_coord(s: &str, row: usize, col: &str) -> Result<f64, LoadError> {
    s.trim().parse::<f64>().map_err(|_| LoadError::Parse {
        row,
        message: format!("{col}: '{s}' is not a number"),
    })
}

fn guess_cell_type(s: &str) -> CellValue {
    let s = s.trim();
    if s.is_empty() {
        return CellValue::Null;
    }
    if let Ok(i) = s.parse::<i64>() {
        return CellValue::Integer(i);
    }
    if let Ok(f) = s.parse::<f64>() {
        return CellValue::Float(f);
    }
    CellValue::String(s.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    const SAMPLE: &str = "\
Date/Time ,Lat,Lon,Base
9/1/2014 0:01:00,40.2201,-74.0021,B02512
9/1/2014 5:21:00,40.7500,-74.0027,B02512
9/2/2014 17:03:00,40.7307,-73.9352,B02598
9/3/2014 5:46:00,40.7600,-73.9800,B02682
";

    struct CountingSource {
        body: Vec<u8>,
        fetches: Rc<Cell<usize>>,
    }

    impl CsvSource for CountingSource {
        fn fetch(&self) -> Result<Vec<u8>, LoadError> {
            self.fetches.set(self.fetches.get() + 1);
            Ok(self.body.clone())
        }

        fn describe(&self) -> String {
            "counting test source".into()
        }
    }

    fn counting_loader(body: &str) -> (DatasetLoader, Rc<Cell<usize>>) {
        let fetches = Rc::new(Cell::new(0));
        let loader = DatasetLoader::new(Box::new(CountingSource {
            body: body.as_bytes().to_vec(),
            fetches: Rc::clone(&fetches),
        }));
        (loader, fetches)
    }

    #[test]
    fn headers_are_lowercased_and_trimmed() {
        let table = parse_table(SAMPLE.as_bytes(), usize::MAX).unwrap();
        assert_eq!(table.columns, vec!["date/time", "lat", "lon", "base"]);
        assert_eq!(table.len(), 4);
    }

    #[test]
    fn row_limit_truncates() {
        let table = parse_table(SAMPLE.as_bytes(), 2).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.records[1].lat, 40.75);
    }

    #[test]
    fn zero_row_limit_is_a_valid_empty_table() {
        let table = parse_table(SAMPLE.as_bytes(), 0).unwrap();
        assert!(table.is_empty());
        assert_eq!(table.columns.len(), 4);
    }

    #[test]
    fn repeated_load_fetches_once_and_shares_the_table() {
        let (mut loader, fetches) = counting_loader(SAMPLE);
        let a = loader.load(3).unwrap();
        let b = loader.load(3).unwrap();
        assert_eq!(fetches.get(), 1);
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(a.len(), 3);
    }

    #[test]
    fn distinct_row_limits_fetch_separately() {
        let (mut loader, fetches) = counting_loader(SAMPLE);
        loader.load(2).unwrap();
        loader.load(4).unwrap();
        loader.load(2).unwrap();
        assert_eq!(fetches.get(), 2);
    }

    #[test]
    fn missing_required_column_fails() {
        let csv = "Date/Time,Lat,Base\n9/1/2014 0:01:00,40.2,B02512\n";
        let err = parse_table(csv.as_bytes(), usize::MAX).unwrap_err();
        assert!(matches!(err, LoadError::MissingColumn(ref c) if c == "lon"));
    }

    #[test]
    fn duplicate_normalized_header_fails() {
        let csv = "Date/Time,Lat,Lon,lat\n9/1/2014 0:01:00,40.2,-74.0,40.3\n";
        let err = parse_table(csv.as_bytes(), usize::MAX).unwrap_err();
        assert!(matches!(err, LoadError::MissingColumn(_)));
    }

    #[test]
    fn bad_timestamp_fails_the_whole_load() {
        let csv = "\
Date/Time,Lat,Lon,Base
9/1/2014 0:01:00,40.2201,-74.0021,B02512
2014-09-01T05:21:00,40.7500,-74.0027,B02512
";
        let err = parse_table(csv.as_bytes(), usize::MAX).unwrap_err();
        assert!(matches!(err, LoadError::Parse { row: 1, .. }));
    }

    #[test]
    fn bad_coordinate_fails_the_whole_load() {
        let csv = "Date/Time,Lat,Lon,Base\n9/1/2014 0:01:00,forty,-74.0,B02512\n";
        let err = parse_table(csv.as_bytes(), usize::MAX).unwrap_err();
        assert!(matches!(err, LoadError::Parse { row: 0, .. }));
    }

    #[test]
    fn passthrough_cells_get_typed() {
        let csv = "Date/Time,Lat,Lon,Base,Fare\n9/1/2014 0:01:00,40.2,-74.0,B02512,12.5\n";
        let table = parse_table(csv.as_bytes(), usize::MAX).unwrap();
        let rec = &table.records[0];
        assert_eq!(
            rec.extra.get("base"),
            Some(&CellValue::String("B02512".into()))
        );
        assert_eq!(rec.extra.get("fare"), Some(&CellValue::Float(12.5)));
    }

    #[test]
    fn file_source_reads_a_local_csv() {
        let path = std::env::temp_dir().join("pickup_scope_file_source_test.csv");
        std::fs::write(&path, SAMPLE).unwrap();

        let mut loader = DatasetLoader::new(Box::new(FileSource::new(&path)));
        let table = loader.load(usize::MAX).unwrap();
        assert_eq!(table.len(), 4);

        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn gzipped_payloads_are_decompressed() {
        use flate2::write::GzEncoder;
        use flate2::Compression;
        use std::io::Write;

        let mut enc = GzEncoder::new(Vec::new(), Compression::default());
        enc.write_all(SAMPLE.as_bytes()).unwrap();
        let gz = enc.finish().unwrap();

        let plain = maybe_gunzip(true, &gz).unwrap();
        assert_eq!(plain, SAMPLE.as_bytes());
    }
}
