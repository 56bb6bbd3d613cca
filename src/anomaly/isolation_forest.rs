//! Isolation forest outlier detector
//!
//! An ensemble of random partitioning trees (Liu et al. 2008). Anomalous rows
//! are isolated in fewer splits, so their average path length is shorter and
//! their anomaly score `2^(-E[h(x)] / c(n))` is higher. The decision offset is
//! chosen so that roughly `contamination` of the training rows fall below it.

use crate::anomaly::{OutlierDetector, RowLabel};
use crate::config::AnalyzerConfig;
use crate::error::AnalysisError;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::debug;

const EULER_GAMMA: f64 = 0.577_215_664_901_532_9;

/// Hyperparameters of the forest
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IsolationForestParams {
    pub n_estimators: usize,
    pub max_samples: usize,
    pub contamination: f64,
    pub seed: u64,
}

impl From<&AnalyzerConfig> for IsolationForestParams {
    fn from(config: &AnalyzerConfig) -> Self {
        Self {
            n_estimators: config.n_estimators,
            max_samples: config.max_samples,
            contamination: config.contamination,
            seed: config.seed,
        }
    }
}

#[derive(Debug, Clone)]
enum Node {
    Leaf {
        size: usize,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: Box<Node>,
        right: Box<Node>,
    },
}

/// A fitted (or unfitted) isolation forest
#[derive(Debug, Clone)]
pub struct IsolationForest {
    params: IsolationForestParams,
    trees: Vec<Node>,
    sample_size: usize,
    offset: f64,
}

impl IsolationForest {
    pub fn new(params: IsolationForestParams) -> Self {
        Self {
            params,
            trees: Vec::new(),
            sample_size: 0,
            offset: 0.0,
        }
    }

    /// Build the ensemble and set the decision offset from the training scores
    pub fn fit(&mut self, matrix: &[Vec<f64>]) -> Result<(), AnalysisError> {
        let n_rows = matrix.len();
        if n_rows < 2 {
            return Err(AnalysisError::DegenerateInput(format!(
                "anomaly scoring needs at least 2 rows, got {n_rows}"
            )));
        }
        let n_features = matrix[0].len();
        if n_features == 0 || matrix.iter().any(|row| row.len() != n_features) {
            return Err(AnalysisError::InvalidInput(
                "feature matrix must be rectangular with at least one column".to_string(),
            ));
        }
        if self.params.n_estimators == 0 || self.params.max_samples == 0 {
            return Err(AnalysisError::Config(
                "n_estimators and max_samples must be at least 1".to_string(),
            ));
        }

        let mut rng = StdRng::seed_from_u64(self.params.seed);
        let sample_size = self.params.max_samples.min(n_rows);
        let max_depth = (sample_size.max(2) as f64).log2().ceil() as usize;

        self.sample_size = sample_size;
        self.trees = (0..self.params.n_estimators)
            .map(|_| {
                let indices = rand::seq::index::sample(&mut rng, n_rows, sample_size).into_vec();
                build_tree(matrix, indices, 0, max_depth, &mut rng)
            })
            .collect();

        let scores = self.score_samples(matrix);
        self.offset = percentile(&scores, 100.0 * self.params.contamination);

        debug!(
            rows = n_rows,
            features = n_features,
            trees = self.trees.len(),
            sample_size = self.sample_size,
            offset = self.offset,
            "isolation forest fitted"
        );
        Ok(())
    }

    /// Negated anomaly score per row; lower means more abnormal
    pub fn score_samples(&self, matrix: &[Vec<f64>]) -> Vec<f64> {
        let norm = average_path_length(self.sample_size);
        matrix
            .iter()
            .map(|row| {
                let total: f64 = self.trees.iter().map(|t| path_length(row, t, 0)).sum();
                let mean_depth = total / self.trees.len().max(1) as f64;
                let score = if norm > 0.0 {
                    2f64.powf(-mean_depth / norm)
                } else {
                    0.5
                };
                -score
            })
            .collect()
    }

    pub fn predict(&self, matrix: &[Vec<f64>]) -> Vec<RowLabel> {
        self.score_samples(matrix)
            .into_iter()
            .map(|s| {
                if s < self.offset {
                    RowLabel::Outlier
                } else {
                    RowLabel::Normal
                }
            })
            .collect()
    }
}

impl OutlierDetector for IsolationForest {
    fn fit_predict(&mut self, matrix: &[Vec<f64>]) -> Result<Vec<RowLabel>, AnalysisError> {
        self.fit(matrix)?;
        Ok(self.predict(matrix))
    }
}

fn build_tree(
    matrix: &[Vec<f64>],
    indices: Vec<usize>,
    depth: usize,
    max_depth: usize,
    rng: &mut StdRng,
) -> Node {
    if depth >= max_depth || indices.len() <= 1 {
        return Node::Leaf {
            size: indices.len(),
        };
    }

    // Only features that still vary inside this node can split it
    let n_features = matrix[indices[0]].len();
    let candidates: Vec<(usize, f64, f64)> = (0..n_features)
        .filter_map(|j| {
            let (lo, hi) = indices.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &i| {
                (lo.min(matrix[i][j]), hi.max(matrix[i][j]))
            });
            (lo < hi).then_some((j, lo, hi))
        })
        .collect();

    if candidates.is_empty() {
        return Node::Leaf {
            size: indices.len(),
        };
    }

    let (feature, lo, hi) = candidates[rng.gen_range(0..candidates.len())];
    let threshold = rng.gen_range(lo..hi);

    let (left, right): (Vec<usize>, Vec<usize>) =
        indices.into_iter().partition(|&i| matrix[i][feature] <= threshold);

    Node::Split {
        feature,
        threshold,
        left: Box::new(build_tree(matrix, left, depth + 1, max_depth, rng)),
        right: Box::new(build_tree(matrix, right, depth + 1, max_depth, rng)),
    }
}

fn path_length(row: &[f64], node: &Node, depth: usize) -> f64 {
    match node {
        Node::Leaf { size } => depth as f64 + average_path_length(*size),
        Node::Split {
            feature,
            threshold,
            left,
            right,
        } => {
            if row[*feature] <= *threshold {
                path_length(row, left, depth + 1)
            } else {
                path_length(row, right, depth + 1)
            }
        }
    }
}

/// Average path length of an unsuccessful BST search over `n` points
fn average_path_length(n: usize) -> f64 {
    match n {
        0 | 1 => 0.0,
        2 => 1.0,
        _ => {
            let n = n as f64;
            2.0 * ((n - 1.0).ln() + EULER_GAMMA) - 2.0 * (n - 1.0) / n
        }
    }
}

/// Percentile with linear interpolation between closest ranks
fn percentile(values: &[f64], pct: f64) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let pos = (pct / 100.0).clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f64)
}
