use std::env;
use std::path::PathBuf;
use std::sync::Arc;

use aero_core::{IntentBank, IntentCorpus};
use aero_ml::{IntentModelTrainer, TrainerConfig, TrainingReport};
use aero_observability::AppMetrics;
use aero_routes::{CsvSentimentSource, ReferenceTable, RouteExtractor, SentimentSource};
use anyhow::{Context, Result};
use tracing::info;

use crate::controller::DialogueController;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub intents_path: PathBuf,
    pub airlines_path: PathBuf,
    pub sentiment_path: PathBuf,
    /// Keep the sentiment table in memory instead of re-reading it per recommendation.
    pub cache_sentiment: bool,
    /// Seeds reply-template selection; entropy when unset.
    pub template_seed: Option<u64>,
    pub extra_places: Vec<String>,
    pub database_url: Option<String>,
    pub session_ttl_hours: i64,
    pub trainer: TrainerConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            intents_path: PathBuf::from("data/intents.json"),
            airlines_path: PathBuf::from("data/airlines_reviews.csv"),
            sentiment_path: PathBuf::from("data/analyzed_sentiment_result.csv"),
            cache_sentiment: true,
            template_seed: None,
            extra_places: Vec::new(),
            database_url: None,
            session_ttl_hours: 24,
            trainer: TrainerConfig::default(),
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            intents_path: env::var("AERO_INTENTS_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.intents_path),
            airlines_path: env::var("AERO_AIRLINES_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.airlines_path),
            sentiment_path: env::var("AERO_SENTIMENT_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.sentiment_path),
            cache_sentiment: env::var("AERO_SENTIMENT_CACHE")
                .ok()
                .and_then(|value| parse_flag(&value))
                .unwrap_or(defaults.cache_sentiment),
            template_seed: env::var("AERO_SEED")
                .ok()
                .and_then(|value| value.parse().ok()),
            extra_places: env::var("AERO_GAZETTEER")
                .map(|value| split_places(&value))
                .unwrap_or_default(),
            database_url: env::var("AERO_DATABASE_URL")
                .ok()
                .filter(|value| !value.trim().is_empty()),
            session_ttl_hours: env::var("AERO_SESSION_TTL_HOURS")
                .ok()
                .and_then(|value| value.parse().ok())
                .filter(|hours| *hours > 0)
                .unwrap_or(defaults.session_ttl_hours),
            trainer: TrainerConfig::from_env(),
        }
    }

    /// Same file names as the defaults, resolved under `dir`.
    pub fn with_data_dir(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        Self {
            intents_path: dir.join("intents.json"),
            airlines_path: dir.join("airlines_reviews.csv"),
            sentiment_path: dir.join("analyzed_sentiment_result.csv"),
            ..Self::default()
        }
    }

    pub fn session_ttl(&self) -> chrono::Duration {
        chrono::Duration::hours(self.session_ttl_hours.max(1))
    }

    /// Route extractor that knows the configured extra places and treats every
    /// airline in `reference` as a carrier rather than a place.
    pub fn route_extractor(&self, reference: &ReferenceTable) -> RouteExtractor {
        RouteExtractor::with_known_names(
            self.extra_places.iter().cloned(),
            reference.airline_names().iter().cloned(),
        )
    }

    pub fn sentiment_source(&self) -> Arc<dyn SentimentSource> {
        if self.cache_sentiment {
            Arc::new(CsvSentimentSource::cached(&self.sentiment_path))
        } else {
            Arc::new(CsvSentimentSource::reloading(&self.sentiment_path))
        }
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn split_places(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|place| !place.is_empty())
        .map(str::to_string)
        .collect()
}

/// Loads every data source and trains the intent model.
///
/// Missing or malformed tables degrade to empty ones; a corpus that cannot
/// train a model is fatal.
pub fn build_controller(
    config: &AppConfig,
    metrics: Arc<AppMetrics>,
) -> Result<(DialogueController, TrainingReport)> {
    let corpus = IntentCorpus::load_or_empty(&config.intents_path);
    let (scorer, report) = IntentModelTrainer::new(config.trainer.clone())
        .train(&corpus.examples())
        .with_context(|| {
            format!(
                "failed training intent model from {}",
                config.intents_path.display()
            )
        })?;

    let bank = IntentBank::from_corpus(&corpus);
    let reference = ReferenceTable::load_or_empty(&config.airlines_path);
    let extractor = config.route_extractor(&reference);

    info!(
        intents = %config.intents_path.display(),
        tags = report.tags.len(),
        reference_rows = reference.len(),
        canned_tags = bank.len(),
        cache_sentiment = config.cache_sentiment,
        "assistant data loaded"
    );

    let controller = DialogueController::new(
        Arc::new(scorer),
        Arc::new(extractor),
        Arc::new(reference),
        config.sentiment_source(),
        Arc::new(bank),
        metrics,
    );
    let controller = match config.template_seed {
        Some(seed) => controller.with_seed(seed),
        None => controller,
    };

    Ok((controller, report))
}
