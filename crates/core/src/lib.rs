pub mod error;
pub mod intent;
pub mod models;
pub mod replies;

pub use error::{DataLoadError, TrainingDataError, TurnError};
pub use intent::{normalize_text, CannedReply, IntentBank, IntentCorpus, IntentRecord};
pub use models::*;
