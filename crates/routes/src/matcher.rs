use std::io::Read;
use std::path::Path;

use aero_core::{AirlineRow, AirlineSet, DataLoadError, Route};
use tracing::warn;

use crate::tables::{read_csv, read_csv_file};

const REQUIRED_COLUMNS: &[&str] = &["Route", "Airline"];

/// Airline reference rows, loaded once and shared read-only.
#[derive(Debug, Clone, Default)]
pub struct ReferenceTable {
    rows: Vec<AirlineRow>,
}

impl ReferenceTable {
    pub fn new(rows: Vec<AirlineRow>) -> Self {
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
                warn!(error = %err, "airline reference table unavailable, continuing with an empty table");
                Self::default()
            }
        }
    }

    pub fn rows(&self) -> &[AirlineRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Every airline named in the table, first-seen order.
    pub fn airline_names(&self) -> AirlineSet {
        self.rows
            .iter()
            .map(|row| row.airline.trim())
            .filter(|airline| !airline.is_empty())
            .collect()
    }

    /// Airlines whose route contains every word of `route`, case-insensitively.
    ///
    /// Linear scan over all rows; results keep first-seen order.
    pub fn airlines_for(&self, route: &Route) -> AirlineSet {
        let mut airlines = AirlineSet::new();
        if route.is_empty() {
            return airlines;
        }

        let tokens = route.tokens().map(str::to_lowercase).collect::<Vec<_>>();
        for row in &self.rows {
            if row.airline.is_empty() {
                continue;
            }
            let haystack = row.route.to_lowercase();
            if tokens.iter().all(|token| haystack.contains(token.as_str())) {
                airlines.insert(row.airline.clone());
            }
        }
        airlines
    }
}

pub fn match_airlines(route: Route, table: &ReferenceTable) -> (Route, AirlineSet) {
    let airlines = table.airlines_for(&route);
    (route, airlines)
}
