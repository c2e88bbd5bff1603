use std::fs::File;
use std::io::Read;
use std::path::Path;

use aero_core::DataLoadError;
use serde::de::DeserializeOwned;
use tracing::warn;

pub(crate) fn read_csv_file<T: DeserializeOwned>(
    path: &Path,
    required: &[&'static str],
) -> Result<Vec<T>, DataLoadError> {
    let file = File::open(path).map_err(|source| DataLoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    read_csv(file, path, required)
}

/// Deserialises every well-formed row; malformed rows are logged and skipped.
pub(crate) fn read_csv<T: DeserializeOwned, R: Read>(
    reader: R,
    origin: &Path,
    required: &[&'static str],
) -> Result<Vec<T>, DataLoadError> {
    let mut rdr = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = rdr.headers().map_err(|err| DataLoadError::Csv {
        path: origin.to_path_buf(),
        message: err.to_string(),
    })?;
    for column in required {
        if !headers.iter().any(|header| header == *column) {
            return Err(DataLoadError::MissingColumn {
                path: origin.to_path_buf(),
                column: *column,
            });
        }
    }

    let mut rows = Vec::new();
    let mut skipped = 0usize;
    for result in rdr.deserialize::<T>() {
        match result {
            Ok(row) => rows.push(row),
            Err(err) => {
                skipped += 1;
                if skipped <= 5 {
                    warn!(path = %origin.display(), error = %err, "skipping malformed csv row");
                }
            }
        }
    }
    if skipped > 5 {
        warn!(path = %origin.display(), skipped, "skipped malformed csv rows");
    }

    Ok(rows)
}

#[cfg(test)]
mod tests {
    use aero_core::{AirlineRow, SentimentRow};

    use super::*;

    #[test]
    fn ignores_extra_columns_and_bad_rows() {
        let raw = "Name,Route,Airline,Reviews,sentiment_score\n\
                   a,SYD to MEL,Qantas,great,0.8\n\
                   b,SYD to MEL,Jetstar,meh,not-a-number\n";
        let rows: Vec<SentimentRow> =
            read_csv(raw.as_bytes(), Path::new("inline.csv"), &["Route", "Airline"]).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].airline, "Qantas");

        let rows: Vec<AirlineRow> =
            read_csv(raw.as_bytes(), Path::new("inline.csv"), &["Route", "Airline"]).unwrap();
        assert_eq!(rows.len(), 2);
    }

    #[test]
    fn reports_missing_columns() {
        let raw = "Airline,Rating\nQantas,5\n";
        let err = read_csv::<AirlineRow, _>(raw.as_bytes(), Path::new("x.csv"), &["Route", "Airline"])
            .unwrap_err();
        assert!(matches!(err, DataLoadError::MissingColumn { column: "Route", .. }));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = read_csv_file::<AirlineRow>(Path::new("no/such/file.csv"), &["Route"]).unwrap_err();
        assert!(matches!(err, DataLoadError::Io { .. }));
    }
}
