use std::path::PathBuf;

use thiserror::Error;

/// A data source (intent corpus, reference table, sentiment table) could not be read.
///
/// Callers usually recover by logging the error and continuing with an empty
/// corpus or table.
#[derive(Debug, Error)]
pub enum DataLoadError {
    #[error("failed reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid json in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid csv in {path}: {message}")]
    Csv { path: PathBuf, message: String },
    #[error("{path} is missing required column `{column}`")]
    MissingColumn { path: PathBuf, column: &'static str },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TrainingDataError {
    #[error("intent corpus contains no training examples")]
    EmptyCorpus,
    #[error("intent corpus needs at least two distinct tags, found {found}")]
    TooFewTags { found: usize },
}

/// Errors a single conversation turn reports to its caller.
///
/// Everything else that goes wrong inside a turn is absorbed at the turn
/// boundary and turned into a user-visible apology.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TurnError {
    #[error("message is empty")]
    EmptyInput,
}
