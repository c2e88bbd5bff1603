use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use aero_core::{AirlineSet, DataLoadError, Route, SentimentRow};
use anyhow::Result;
use parking_lot::RwLock;
use tracing::{debug, warn};

use crate::tables::{read_csv, read_csv_file};

const REQUIRED_COLUMNS: &[&str] = &["Route", "Airline", "sentiment_score"];

/// Precomputed per-(route, airline) sentiment scores.
#[derive(Debug, Clone, Default)]
pub struct SentimentTable {
    rows: Vec<SentimentRow>,
}

impl SentimentTable {
    pub fn new(rows: Vec<SentimentRow>) -> Self {
        Self { rows }
    }

    pub fn from_csv_path(path: impl AsRef<Path>) -> Result<Self, DataLoadError> {
        read_csv_file(path.as_ref(), REQUIRED_COLUMNS).map(Self::new)
    }

    pub fn from_csv_reader<R: Read>(reader: R, origin: &Path) -> Result<Self, DataLoadError> {
        read_csv(reader, origin, REQUIRED_COLUMNS).map(Self::new)
    }

    pub fn load_or_empty(path: impl AsRef<Path>) -> Self {
        match Self::from_csv_path(path.as_ref()) {
            Ok(table) => table,
            Err(err) => {
                warn!(error = %err, "sentiment table unavailable, continuing with an empty table");
                Self::default()
            }
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Highest-scoring row whose route contains `route` (case-insensitive) and
    /// whose airline is one of `airlines`. The first row wins ties.
    pub fn best_for(&self, route: &Route, airlines: &AirlineSet) -> Option<&SentimentRow> {
        let needle = route.as_str().to_lowercase();
        let mut best: Option<&SentimentRow> = None;
        for row in &self.rows {
            if row.sentiment_score.is_nan()
                || !airlines.contains(&row.airline)
                || !row.route.to_lowercase().contains(&needle)
            {
                continue;
            }
            if best.map_or(true, |current| row.sentiment_score > current.sentiment_score) {
                best = Some(row);
            }
        }
        best
    }
}

/// Where the recommendation step gets its sentiment table from.
pub trait SentimentSource: Send + Sync {
    fn load(&self) -> Result<Arc<SentimentTable>>;
}

/// Fixed in-memory table.
#[derive(Debug, Clone, Default)]
pub struct StaticSentimentSource {
    table: Arc<SentimentTable>,
}

impl StaticSentimentSource {
    pub fn new(table: SentimentTable) -> Self {
        Self {
            table: Arc::new(table),
        }
    }
}

impl SentimentSource for StaticSentimentSource {
    fn load(&self) -> Result<Arc<SentimentTable>> {
        Ok(self.table.clone())
    }
}

/// CSV-backed table, either re-read on every request or cached until [`CsvSentimentSource::reload`].
#[derive(Debug)]
pub struct CsvSentimentSource {
    path: PathBuf,
    cache: Option<RwLock<Option<Arc<SentimentTable>>>>,
}

impl CsvSentimentSource {
    pub fn reloading(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            cache: None,
        }
    }

    pub fn cached(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            cache: Some(RwLock::new(None)),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Re-reads the file and, when caching, replaces the cached table.
    pub fn reload(&self) -> Arc<SentimentTable> {
        let table = Arc::new(SentimentTable::load_or_empty(&self.path));
        debug!(path = %self.path.display(), rows = table.len(), "sentiment table loaded");
        if let Some(cache) = &self.cache {
            *cache.write() = Some(table.clone());
        }
        table
    }
}

impl SentimentSource for CsvSentimentSource {
    fn load(&self) -> Result<Arc<SentimentTable>> {
        let Some(cache) = &self.cache else {
            return Ok(self.reload());
        };
        if let Some(table) = cache.read().as_ref() {
            return Ok(table.clone());
        }
        Ok(self.reload())
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    fn airlines(names: &[&str]) -> AirlineSet {
        names.iter().copied().collect()
    }

    fn table() -> SentimentTable {
        let raw = "Airline,Route,sentiment_score\n\
                   Qantas,Sydney SYD to LAX Los Angeles,0.30\n\
                   Delta,SYD to LAX,0.12\n\
                   United,SYD to LAX,0.90\n\
                   Qantas,SYD to MEL,0.05\n\
                   Jetstar,syd to mel,0.41\n\
                   Qantas,SYD to MEL,0.41\n";
        SentimentTable::from_csv_reader(raw.as_bytes(), Path::new("inline.csv")).unwrap()
    }

    #[test]
    fn picks_highest_score_among_known_airlines() {
        let best = table()
            .best_for(&Route::from("SYD to LAX"), &airlines(&["Qantas", "Delta"]))
            .map(|row| row.airline.clone());
        assert_eq!(best.as_deref(), Some("Qantas"));
    }

    #[test]
    fn first_row_wins_ties_and_route_case_is_ignored() {
        let best = table()
            .best_for(&Route::from("SYD TO MEL"), &airlines(&["Qantas", "Jetstar"]))
            .map(|row| row.airline.clone());
        assert_eq!(best.as_deref(), Some("Jetstar"));
    }

    #[test]
    fn no_matching_rows_gives_none() {
        assert!(table()
            .best_for(&Route::from("PER to DRW"), &airlines(&["Qantas"]))
            .is_none());
        assert!(table()
            .best_for(&Route::from("SYD to LAX"), &airlines(&["Emirates"]))
            .is_none());
    }

    #[test]
    fn cached_source_keeps_table_until_reload() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "Route,Airline,sentiment_score\nSYD to MEL,Qantas,0.5").unwrap();
        file.flush().unwrap();

        let cached = CsvSentimentSource::cached(file.path());
        let reloading = CsvSentimentSource::reloading(file.path());
        assert_eq!(cached.load().unwrap().len(), 1);

        writeln!(file, "SYD to MEL,Jetstar,0.7").unwrap();
        file.flush().unwrap();

        assert_eq!(cached.load().unwrap().len(), 1);
        assert_eq!(reloading.load().unwrap().len(), 2);
        assert_eq!(cached.reload().len(), 2);
        assert_eq!(cached.load().unwrap().len(), 2);
    }

    #[test]
    fn missing_file_yields_empty_table() {
        let source = CsvSentimentSource::reloading("no/such/sentiment.csv");
        assert!(source.load().unwrap().is_empty());
    }
}
