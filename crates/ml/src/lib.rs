mod logistic;
mod search;
mod tfidf;

use std::collections::{BTreeSet, HashMap};
use std::env;

use aero_core::{IntentExample, IntentTag, TrainingDataError};
use serde::Serialize;
use tracing::info;

pub use search::{CandidateScore, Hyperparams, ParamGrid};
pub use tfidf::{tokenize, NgramRange};

use search::{effective_folds, grid_search, stratified_folds, Pipeline};

/// Maps an utterance to exactly one intent tag.
///
/// Implementations are immutable once built and shared across sessions.
pub trait Scorer: Send + Sync {
    fn predict(&self, text: &str) -> IntentTag;

    fn model_name(&self) -> &str {
        "scorer"
    }
}

#[derive(Debug, Clone)]
pub struct TrainerConfig {
    pub grid: ParamGrid,
    /// Requested cross-validation folds, capped by the smallest tag.
    pub folds: usize,
    pub seed: u64,
    pub max_iter: usize,
}

impl Default for TrainerConfig {
    fn default() -> Self {
        Self {
            grid: ParamGrid::default(),
            folds: 6,
            seed: 42,
            max_iter: 300,
        }
    }
}

impl TrainerConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            folds: env::var("AERO_CV_FOLDS")
                .ok()
                .and_then(|value| value.parse::<usize>().ok())
                .unwrap_or(defaults.folds),
            seed: env::var("AERO_SEED")
                .ok()
                .and_then(|value| value.parse::<u64>().ok())
                .unwrap_or(defaults.seed),
            ..defaults
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TrainingReport {
    pub examples: usize,
    pub tags: Vec<IntentTag>,
    pub best: Hyperparams,
    /// `None` when the corpus was too small for cross-validation.
    pub folds: Option<usize>,
    pub cv_accuracy: Option<f64>,
    pub candidates: Vec<CandidateScore>,
}

#[derive(Debug, Clone, Default)]
pub struct IntentModelTrainer {
    config: TrainerConfig,
}

impl IntentModelTrainer {
    pub fn new(config: TrainerConfig) -> Self {
        Self { config }
    }

    pub fn build(&self, examples: &[IntentExample]) -> Result<TrainedScorer, TrainingDataError> {
        self.train(examples).map(|(scorer, _)| scorer)
    }

    pub fn train(
        &self,
        examples: &[IntentExample],
    ) -> Result<(TrainedScorer, TrainingReport), TrainingDataError> {
        if examples.is_empty() {
            return Err(TrainingDataError::EmptyCorpus);
        }

        let classes = examples
            .iter()
            .map(|example| example.tag.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect::<Vec<_>>();
        if classes.len() < 2 {
            return Err(TrainingDataError::TooFewTags {
                found: classes.len(),
            });
        }

        let class_index = classes
            .iter()
            .enumerate()
            .map(|(index, tag)| (tag.clone(), index))
            .collect::<HashMap<_, _>>();
        let documents = examples
            .iter()
            .map(|example| example.utterance.clone())
            .collect::<Vec<_>>();
        let labels = examples
            .iter()
            .map(|example| class_index[&example.tag])
            .collect::<Vec<_>>();

        let smallest_class = (0..classes.len())
            .map(|class| labels.iter().filter(|label| **label == class).count())
            .min()
            .unwrap_or(0);

        let (best, folds, cv_accuracy, candidates) =
            match effective_folds(self.config.folds, smallest_class) {
                Some(k) => {
                    let folds = stratified_folds(&labels, classes.len(), k, self.config.seed);
                    let (best, score, candidates) = grid_search(
                        &documents,
                        &labels,
                        classes.len(),
                        &self.config.grid,
                        &folds,
                        self.config.max_iter,
                    );
                    (best, Some(k), Some(score), candidates)
                }
                None => (Hyperparams::default(), None, None, Vec::new()),
            };

        let pipeline = Pipeline::fit(&documents, &labels, classes.len(), best, self.config.max_iter);

        info!(
            examples = examples.len(),
            tags = classes.len(),
            folds = ?folds,
            cv_accuracy = ?cv_accuracy,
            c = best.c,
            ngram_max = best.ngram_range.max,
            max_features = ?best.max_features,
            "intent model trained"
        );

        let report = TrainingReport {
            examples: examples.len(),
            tags: classes.clone(),
            best,
            folds,
            cv_accuracy,
            candidates,
        };

        Ok((
            TrainedScorer {
                classes,
                params: best,
                pipeline,
            },
            report,
        ))
    }
}

/// Fits a scorer with the default trainer configuration.
pub fn build(examples: &[IntentExample]) -> Result<TrainedScorer, TrainingDataError> {
    IntentModelTrainer::default().build(examples)
}

#[derive(Debug, Clone)]
pub struct TrainedScorer {
    classes: Vec<IntentTag>,
    params: Hyperparams,
    pipeline: Pipeline,
}

impl TrainedScorer {
    pub fn classes(&self) -> &[IntentTag] {
        &self.classes
    }

    pub fn params(&self) -> Hyperparams {
        self.params
    }
}

impl Scorer for TrainedScorer {
    fn predict(&self, text: &str) -> IntentTag {
        self.classes[self.pipeline.predict(text)].clone()
    }

    fn model_name(&self) -> &str {
        "tfidf-logistic"
    }
}
