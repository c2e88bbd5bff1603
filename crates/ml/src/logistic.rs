use crate::tfidf::SparseVector;

#[derive(Debug, Clone, Copy)]
pub struct LogisticConfig {
    /// Inverse regularisation strength.
    pub c: f64,
    pub max_iter: usize,
    pub tolerance: f64,
}

/// Multinomial logistic regression with an L2 penalty on the weights,
/// fitted by full-batch gradient descent from zero weights.
#[derive(Debug, Clone)]
pub struct LogisticRegression {
    weights: Vec<Vec<f64>>,
    bias: Vec<f64>,
}

impl LogisticRegression {
    pub fn fit(
        rows: &[SparseVector],
        labels: &[usize],
        n_classes: usize,
        n_features: usize,
        config: LogisticConfig,
    ) -> Self {
        let mut model = Self {
            weights: vec![vec![0.0; n_features]; n_classes],
            bias: vec![0.0; n_classes],
        };
        if rows.is_empty() || n_classes == 0 {
            return model;
        }

        let n = rows.len() as f64;
        let penalty = 1.0 / (config.c.max(f64::EPSILON) * n);
        // rows are unit length, so the averaged loss is 1-smooth plus the penalty
        let step = 1.0 / (1.0 + penalty);

        let mut grad_w = vec![vec![0.0; n_features]; n_classes];
        let mut grad_b = vec![0.0; n_classes];

        for _ in 0..config.max_iter {
            for row in grad_w.iter_mut() {
                row.iter_mut().for_each(|value| *value = 0.0);
            }
            grad_b.iter_mut().for_each(|value| *value = 0.0);

            for (row, &label) in rows.iter().zip(labels) {
                let probabilities = softmax(&model.decision(row));
                for (class, probability) in probabilities.into_iter().enumerate() {
                    let diff = probability - if class == label { 1.0 } else { 0.0 };
                    grad_b[class] += diff;
                    for &(feature, value) in row {
                        grad_w[class][feature] += diff * value;
                    }
                }
            }

            let mut largest = 0.0_f64;
            for class in 0..n_classes {
                grad_b[class] /= n;
                largest = largest.max(grad_b[class].abs());
                model.bias[class] -= step * grad_b[class];

                for feature in 0..n_features {
                    let gradient = grad_w[class][feature] / n + penalty * model.weights[class][feature];
                    largest = largest.max(gradient.abs());
                    model.weights[class][feature] -= step * gradient;
                }
            }

            if largest < config.tolerance {
                break;
            }
        }

        model
    }

    pub fn decision(&self, row: &SparseVector) -> Vec<f64> {
        self.weights
            .iter()
            .zip(&self.bias)
            .map(|(weights, bias)| {
                bias + row
                    .iter()
                    .map(|&(feature, value)| weights[feature] * value)
                    .sum::<f64>()
            })
            .collect()
    }

    /// Index of the highest-scoring class; the lowest index wins ties.
    pub fn predict(&self, row: &SparseVector) -> usize {
        let mut best = 0;
        let mut best_score = f64::NEG_INFINITY;
        for (class, score) in self.decision(row).into_iter().enumerate() {
            if score > best_score {
                best = class;
                best_score = score;
            }
        }
        best
    }
}

fn softmax(logits: &[f64]) -> Vec<f64> {
    let max = logits.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let exps = logits.iter().map(|logit| (logit - max).exp()).collect::<Vec<_>>();
    let sum = exps.iter().sum::<f64>();
    exps.into_iter().map(|value| value / sum).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(c: f64) -> LogisticConfig {
        LogisticConfig {
            c,
            max_iter: 300,
            tolerance: 1e-6,
        }
    }

    #[test]
    fn separates_disjoint_features() {
        let rows = vec![
            vec![(0, 1.0)],
            vec![(1, 1.0)],
            vec![(2, 1.0)],
            vec![(0, 0.6), (3, 0.8)],
        ];
        let labels = vec![0, 1, 2, 0];
        let model = LogisticRegression::fit(&rows, &labels, 3, 4, config(10.0));

        assert_eq!(model.predict(&vec![(0, 1.0)]), 0);
        assert_eq!(model.predict(&vec![(1, 1.0)]), 1);
        assert_eq!(model.predict(&vec![(2, 1.0)]), 2);
    }

    #[test]
    fn empty_row_falls_back_to_class_prior() {
        let rows = vec![vec![(0, 1.0)], vec![(0, 1.0)], vec![(1, 1.0)]];
        let labels = vec![0, 0, 1];
        let model = LogisticRegression::fit(&rows, &labels, 2, 2, config(1.0));
        assert_eq!(model.predict(&Vec::new()), 0);
    }

    #[test]
    fn untrained_model_prefers_first_class() {
        let model = LogisticRegression::fit(&[], &[], 3, 2, config(1.0));
        assert_eq!(model.predict(&vec![(1, 1.0)]), 0);
    }

    #[test]
    fn softmax_sums_to_one() {
        let probabilities = softmax(&[1.0, 2.0, 3.0]);
        assert!((probabilities.iter().sum::<f64>() - 1.0).abs() < 1e-12);
        assert!(probabilities[2] > probabilities[0]);
    }
}
