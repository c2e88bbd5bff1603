use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rayon::prelude::*;
use serde::Serialize;

use crate::logistic::{LogisticConfig, LogisticRegression};
use crate::tfidf::{NgramRange, TfidfVectorizer};

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Hyperparams {
    pub ngram_range: NgramRange,
    pub max_features: Option<usize>,
    pub c: f64,
}

impl Default for Hyperparams {
    fn default() -> Self {
        Self {
            ngram_range: NgramRange::UNIGRAMS,
            max_features: None,
            c: 1.0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ParamGrid {
    pub ngram_ranges: Vec<NgramRange>,
    pub max_features: Vec<Option<usize>>,
    pub c_values: Vec<f64>,
}

impl Default for ParamGrid {
    fn default() -> Self {
        Self {
            ngram_ranges: vec![NgramRange::UNIGRAMS, NgramRange::UNI_AND_BIGRAMS],
            max_features: vec![None, Some(500), Some(1000)],
            c_values: vec![0.1, 1.0, 10.0, 100.0],
        }
    }
}

impl ParamGrid {
    pub fn candidates(&self) -> Vec<Hyperparams> {
        let mut candidates = Vec::new();
        for &c in &self.c_values {
            for &max_features in &self.max_features {
                for &ngram_range in &self.ngram_ranges {
                    candidates.push(Hyperparams {
                        ngram_range,
                        max_features,
                        c,
                    });
                }
            }
        }
        candidates
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CandidateScore {
    pub params: Hyperparams,
    pub mean_accuracy: f64,
}

/// Vectorizer plus classifier fitted together on one set of documents.
#[derive(Debug, Clone)]
pub(crate) struct Pipeline {
    vectorizer: TfidfVectorizer,
    model: LogisticRegression,
}

impl Pipeline {
    pub(crate) fn fit<S: AsRef<str> + Sync>(
        documents: &[S],
        labels: &[usize],
        n_classes: usize,
        params: Hyperparams,
        max_iter: usize,
    ) -> Self {
        let vectorizer = TfidfVectorizer::fit(documents, params.ngram_range, params.max_features);
        let rows = documents
            .iter()
            .map(|document| vectorizer.transform(document.as_ref()))
            .collect::<Vec<_>>();
        let model = LogisticRegression::fit(
            &rows,
            labels,
            n_classes,
            vectorizer.vocabulary_len(),
            LogisticConfig {
                c: params.c,
                max_iter,
                tolerance: 1e-5,
            },
        );
        Self { vectorizer, model }
    }

    pub(crate) fn predict(&self, text: &str) -> usize {
        self.model.predict(&self.vectorizer.transform(text))
    }
}

/// Number of folds to use, or `None` when some class is too small to appear in two folds.
pub(crate) fn effective_folds(requested: usize, smallest_class: usize) -> Option<usize> {
    let folds = requested.min(smallest_class);
    (folds >= 2).then_some(folds)
}

/// Test-set indices for each fold; every class is spread across all folds.
pub(crate) fn stratified_folds(labels: &[usize], n_classes: usize, k: usize, seed: u64) -> Vec<Vec<usize>> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut folds = vec![Vec::new(); k];
    let mut next_fold = 0;

    for class in 0..n_classes {
        let mut members = labels
            .iter()
            .enumerate()
            .filter(|(_, label)| **label == class)
            .map(|(index, _)| index)
            .collect::<Vec<_>>();
        members.shuffle(&mut rng);

        for index in members {
            folds[next_fold].push(index);
            next_fold = (next_fold + 1) % k;
        }
    }

    for fold in folds.iter_mut() {
        fold.sort_unstable();
    }
    folds
}

pub(crate) fn cross_validate(
    documents: &[String],
    labels: &[usize],
    n_classes: usize,
    folds: &[Vec<usize>],
    params: Hyperparams,
    max_iter: usize,
) -> f64 {
    let mut total = 0.0;
    for test in folds {
        let mut in_test = vec![false; documents.len()];
        for &index in test {
            in_test[index] = true;
        }

        let (train_docs, train_labels): (Vec<&str>, Vec<usize>) = documents
            .iter()
            .zip(labels)
            .enumerate()
            .filter(|(index, _)| !in_test[*index])
            .map(|(_, (document, label))| (document.as_str(), *label))
            .unzip();

        let pipeline = Pipeline::fit(&train_docs, &train_labels, n_classes, params, max_iter);
        let correct = test
            .iter()
            .filter(|&&index| pipeline.predict(&documents[index]) == labels[index])
            .count();
        total += correct as f64 / test.len().max(1) as f64;
    }
    total / folds.len().max(1) as f64
}

/// Scores every grid candidate in parallel and returns the best one.
///
/// Highest mean accuracy wins; ties go to the earlier candidate.
pub(crate) fn grid_search(
    documents: &[String],
    labels: &[usize],
    n_classes: usize,
    grid: &ParamGrid,
    folds: &[Vec<usize>],
    max_iter: usize,
) -> (Hyperparams, f64, Vec<CandidateScore>) {
    let scores = grid
        .candidates()
        .into_par_iter()
        .map(|params| CandidateScore {
            params,
            mean_accuracy: cross_validate(documents, labels, n_classes, folds, params, max_iter),
        })
        .collect::<Vec<_>>();

    let mut best = Hyperparams::default();
    let mut best_score = f64::NEG_INFINITY;
    for candidate in &scores {
        if candidate.mean_accuracy > best_score {
            best = candidate.params;
            best_score = candidate.mean_accuracy;
        }
    }
    (best, best_score, scores)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_grid_has_twenty_four_candidates() {
        let candidates = ParamGrid::default().candidates();
        assert_eq!(candidates.len(), 24);
        assert_eq!(candidates[0].c, 0.1);
        assert_eq!(candidates[0].ngram_range, NgramRange::UNIGRAMS);
    }

    #[test]
    fn folds_are_capped_by_smallest_class() {
        assert_eq!(effective_folds(6, 10), Some(6));
        assert_eq!(effective_folds(6, 3), Some(3));
        assert_eq!(effective_folds(6, 1), None);
    }

    #[test]
    fn stratified_folds_cover_every_example_once() {
        let labels = vec![0, 0, 0, 1, 1, 1, 2, 2, 2];
        let folds = stratified_folds(&labels, 3, 3, 42);

        let mut all = folds.iter().flatten().copied().collect::<Vec<_>>();
        all.sort_unstable();
        assert_eq!(all, (0..9).collect::<Vec<_>>());

        for fold in &folds {
            let mut classes = fold.iter().map(|&i| labels[i]).collect::<Vec<_>>();
            classes.sort_unstable();
            assert_eq!(classes, vec![0, 1, 2]);
        }
    }

    #[test]
    fn folds_depend_only_on_seed() {
        let labels = vec![0, 1, 0, 1, 0, 1, 0, 1];
        assert_eq!(
            stratified_folds(&labels, 2, 2, 7),
            stratified_folds(&labels, 2, 2, 7)
        );
    }

    #[test]
    fn grid_search_prefers_earliest_of_equal_candidates() {
        let documents = ["book a flight", "find me a flight", "hello there", "hello friend"]
            .iter()
            .map(|doc| doc.to_string())
            .collect::<Vec<_>>();
        let labels = vec![0, 0, 1, 1];
        let folds = stratified_folds(&labels, 2, 2, 42);
        let grid = ParamGrid {
            ngram_ranges: vec![NgramRange::UNIGRAMS],
            max_features: vec![None, None],
            c_values: vec![10.0],
        };

        let (best, score, scores) = grid_search(&documents, &labels, 2, &grid, &folds, 200);
        assert_eq!(scores.len(), 2);
        assert_eq!(best, grid.candidates()[0]);
        assert!((0.0..=1.0).contains(&score));
    }
}
