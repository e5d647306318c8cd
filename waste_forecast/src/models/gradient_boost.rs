//! Gradient boosted regression trees
//!
//! Depth-limited regression trees fitted to squared-error residuals, grown
//! greedily on variance-reduction splits, with row and feature subsampling
//! per boosting round. Validation-monitored fitting keeps the forest at
//! the round with the best held-out error.

use std::cmp::Ordering;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, Result};
use crate::models::{Regressor, TrainedRegressor};

/// Hyperparameters for gradient boosting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradientBoostParams {
    /// Maximum number of boosting rounds
    pub n_estimators: usize,
    /// Maximum tree depth
    pub max_depth: usize,
    /// Shrinkage applied to each tree's contribution
    pub learning_rate: f64,
    /// Fraction of rows sampled per round
    pub subsample: f64,
    /// Fraction of features sampled per round
    pub colsample: f64,
    /// Minimum rows required in each leaf
    pub min_samples_leaf: usize,
    /// RNG seed for row and feature sampling
    pub seed: u64,
}

impl Default for GradientBoostParams {
    fn default() -> Self {
        Self {
            n_estimators: 200,
            max_depth: 5,
            learning_rate: 0.1,
            subsample: 0.9,
            colsample: 0.9,
            min_samples_leaf: 3,
            seed: 42,
        }
    }
}

/// Gradient boosting regressor configuration.
#[derive(Debug, Clone)]
pub struct GradientBoost {
    name: String,
    params: GradientBoostParams,
}

impl GradientBoost {
    /// Create a new gradient boosting regressor.
    pub fn new(params: GradientBoostParams) -> Result<Self> {
        if params.n_estimators == 0 {
            return Err(PipelineError::ValidationError(
                "n_estimators must be positive".to_string(),
            ));
        }
        if params.max_depth == 0 {
            return Err(PipelineError::ValidationError(
                "max_depth must be positive".to_string(),
            ));
        }
        if params.learning_rate <= 0.0 || params.learning_rate > 1.0 {
            return Err(PipelineError::ValidationError(
                "learning_rate must be in (0, 1]".to_string(),
            ));
        }
        for (name, value) in [("subsample", params.subsample), ("colsample", params.colsample)] {
            if value <= 0.0 || value > 1.0 {
                return Err(PipelineError::ValidationError(format!(
                    "{} must be in (0, 1]",
                    name
                )));
            }
        }
        if params.min_samples_leaf == 0 {
            return Err(PipelineError::ValidationError(
                "min_samples_leaf must be positive".to_string(),
            ));
        }

        Ok(Self {
            name: format!(
                "Gradient Boost (rounds={}, depth={})",
                params.n_estimators, params.max_depth
            ),
            params,
        })
    }

    /// The configured hyperparameters.
    pub fn params(&self) -> &GradientBoostParams {
        &self.params
    }

    fn boost(
        &self,
        rows: &[Vec<f64>],
        target: &[f64],
        validation: Option<(&[Vec<f64>], &[f64], usize)>,
    ) -> Result<TrainedGradientBoost> {
        check_matrix(rows, target)?;
        let n_features = rows[0].len();
        if let Some((validation_rows, validation_target, _)) = validation {
            check_matrix(validation_rows, validation_target)?;
            if validation_rows[0].len() != n_features {
                return Err(PipelineError::TrainingError(format!(
                    "Validation rows have {} features, training rows have {}",
                    validation_rows[0].len(),
                    n_features
                )));
            }
        }

        let base_score = mean(target);
        let mut rng = StdRng::seed_from_u64(self.params.seed);
        let mut score = vec![base_score; rows.len()];
        let mut validation_score = validation
            .map(|(validation_rows, _, _)| vec![base_score; validation_rows.len()])
            .unwrap_or_default();
        let mut trees: Vec<RegressionTree> = Vec::new();

        let mut best_error = f64::INFINITY;
        let mut best_rounds = 0;
        let mut rounds_since_best = 0;

        for _ in 0..self.params.n_estimators {
            let residuals: Vec<f64> = target
                .iter()
                .zip(score.iter())
                .map(|(t, s)| t - s)
                .collect();

            let row_sample = sample_fraction(rows.len(), self.params.subsample, &mut rng);
            let feature_sample = sample_fraction(n_features, self.params.colsample, &mut rng);
            let tree = RegressionTree::grow(
                rows,
                &residuals,
                &row_sample,
                &feature_sample,
                self.params.max_depth,
                self.params.min_samples_leaf,
            );

            for (current, row) in score.iter_mut().zip(rows.iter()) {
                *current += self.params.learning_rate * tree.predict(row);
            }

            if let Some((validation_rows, validation_target, patience)) = validation {
                for (current, row) in validation_score.iter_mut().zip(validation_rows.iter()) {
                    *current += self.params.learning_rate * tree.predict(row);
                }
                trees.push(tree);

                let error = validation_score
                    .iter()
                    .zip(validation_target.iter())
                    .map(|(p, t)| (p - t).powi(2))
                    .sum::<f64>()
                    / validation_target.len() as f64;
                if error + 1e-12 < best_error {
                    best_error = error;
                    best_rounds = trees.len();
                    rounds_since_best = 0;
                } else {
                    rounds_since_best += 1;
                    if rounds_since_best >= patience {
                        break;
                    }
                }
            } else {
                trees.push(tree);
            }
        }

        if validation.is_some() && best_rounds > 0 {
            trees.truncate(best_rounds);
        }

        Ok(TrainedGradientBoost {
            name: self.name.clone(),
            base_score,
            learning_rate: self.params.learning_rate,
            n_features,
            trees,
        })
    }
}

impl Regressor for GradientBoost {
    type Trained = TrainedGradientBoost;

    fn fit(&self, rows: &[Vec<f64>], target: &[f64]) -> Result<Self::Trained> {
        self.boost(rows, target, None)
    }

    fn supports_early_stopping(&self) -> bool {
        true
    }

    fn fit_with_validation(
        &self,
        rows: &[Vec<f64>],
        target: &[f64],
        validation_rows: &[Vec<f64>],
        validation_target: &[f64],
        patience: usize,
    ) -> Result<Self::Trained> {
        self.boost(
            rows,
            target,
            Some((validation_rows, validation_target, patience.max(1))),
        )
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// A fitted gradient boosted forest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainedGradientBoost {
    name: String,
    base_score: f64,
    learning_rate: f64,
    n_features: usize,
    trees: Vec<RegressionTree>,
}

impl TrainedGradientBoost {
    /// Number of features the forest was fit on.
    pub fn n_features(&self) -> usize {
        self.n_features
    }

    /// Number of boosting rounds kept after fitting.
    pub fn rounds(&self) -> usize {
        self.trees.len()
    }
}

impl TrainedRegressor for TrainedGradientBoost {
    fn predict(&self, features: &[f64]) -> Result<f64> {
        if features.len() != self.n_features {
            return Err(PipelineError::ValidationError(format!(
                "Expected {} features, got {}",
                self.n_features,
                features.len()
            )));
        }

        let boosted: f64 = self
            .trees
            .iter()
            .map(|tree| self.learning_rate * tree.predict(features))
            .sum();
        Ok(self.base_score + boosted)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct TreeNode {
    feature: usize,
    threshold: f64,
    left: usize,
    right: usize,
    value: f64,
    is_leaf: bool,
}

/// A single regression tree stored as a flat node arena; node 0 is the
/// root.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct RegressionTree {
    nodes: Vec<TreeNode>,
}

impl RegressionTree {
    fn grow(
        rows: &[Vec<f64>],
        target: &[f64],
        indices: &[usize],
        features: &[usize],
        max_depth: usize,
        min_samples_leaf: usize,
    ) -> Self {
        let mut tree = Self { nodes: Vec::new() };
        tree.grow_node(rows, target, indices, features, max_depth, min_samples_leaf);
        tree
    }

    fn grow_node(
        &mut self,
        rows: &[Vec<f64>],
        target: &[f64],
        indices: &[usize],
        features: &[usize],
        depth_left: usize,
        min_samples_leaf: usize,
    ) -> usize {
        let value = mean_of(target, indices);

        let split = if depth_left == 0 || indices.len() < 2 * min_samples_leaf {
            None
        } else {
            best_split(rows, target, indices, features, min_samples_leaf)
        };

        match split {
            None => {
                let index = self.nodes.len();
                self.nodes.push(TreeNode {
                    feature: 0,
                    threshold: 0.0,
                    left: 0,
                    right: 0,
                    value,
                    is_leaf: true,
                });
                index
            }
            Some(split) => {
                let (left_indices, right_indices): (Vec<usize>, Vec<usize>) = indices
                    .iter()
                    .copied()
                    .partition(|&row| rows[row][split.feature] <= split.threshold);

                // reserve the slot so children land after their parent
                let index = self.nodes.len();
                self.nodes.push(TreeNode {
                    feature: split.feature,
                    threshold: split.threshold,
                    left: 0,
                    right: 0,
                    value,
                    is_leaf: true,
                });

                let left = self.grow_node(
                    rows,
                    target,
                    &left_indices,
                    features,
                    depth_left - 1,
                    min_samples_leaf,
                );
                let right = self.grow_node(
                    rows,
                    target,
                    &right_indices,
                    features,
                    depth_left - 1,
                    min_samples_leaf,
                );

                let node = &mut self.nodes[index];
                node.left = left;
                node.right = right;
                node.is_leaf = false;
                index
            }
        }
    }

    fn predict(&self, features: &[f64]) -> f64 {
        let mut index = 0;
        loop {
            let node = &self.nodes[index];
            if node.is_leaf {
                return node.value;
            }
            index = if features[node.feature] <= node.threshold {
                node.left
            } else {
                node.right
            };
        }
    }
}

struct SplitCandidate {
    feature: usize,
    threshold: f64,
    gain: f64,
}

/// Greedy variance-reduction split over the sampled features. Returns
/// `None` when no boundary improves on the parent's squared error.
fn best_split(
    rows: &[Vec<f64>],
    target: &[f64],
    indices: &[usize],
    features: &[usize],
    min_samples_leaf: usize,
) -> Option<SplitCandidate> {
    let total: f64 = indices.iter().map(|&row| target[row]).sum();
    let total_sq: f64 = indices.iter().map(|&row| target[row].powi(2)).sum();
    let count = indices.len() as f64;
    let parent_sse = total_sq - total.powi(2) / count;

    let mut best: Option<SplitCandidate> = None;

    for &feature in features {
        let mut order = indices.to_vec();
        order.sort_by(|&a, &b| {
            rows[a][feature]
                .partial_cmp(&rows[b][feature])
                .unwrap_or(Ordering::Equal)
        });

        let mut left_sum = 0.0;
        let mut left_sq = 0.0;
        for position in 0..order.len() - 1 {
            let row = order[position];
            left_sum += target[row];
            left_sq += target[row].powi(2);

            let left_count = position + 1;
            let right_count = order.len() - left_count;
            if left_count < min_samples_leaf || right_count < min_samples_leaf {
                continue;
            }

            let current = rows[row][feature];
            let next = rows[order[position + 1]][feature];
            if next <= current {
                continue;
            }

            let right_sum = total - left_sum;
            let right_sq = total_sq - left_sq;
            let left_sse = left_sq - left_sum.powi(2) / left_count as f64;
            let right_sse = right_sq - right_sum.powi(2) / right_count as f64;
            let gain = parent_sse - left_sse - right_sse;

            if gain > 1e-12 && best.as_ref().map_or(true, |b| gain > b.gain) {
                best = Some(SplitCandidate {
                    feature,
                    threshold: (current + next) / 2.0,
                    gain,
                });
            }
        }
    }

    best
}

fn sample_fraction(n: usize, fraction: f64, rng: &mut StdRng) -> Vec<usize> {
    let take = ((n as f64 * fraction).round() as usize).clamp(1, n);
    let mut indices: Vec<usize> = (0..n).collect();
    if take < n {
        indices.shuffle(rng);
        indices.truncate(take);
        indices.sort_unstable();
    }
    indices
}

fn check_matrix(rows: &[Vec<f64>], target: &[f64]) -> Result<()> {
    if rows.is_empty() {
        return Err(PipelineError::TrainingError(
            "Cannot fit on an empty feature matrix".to_string(),
        ));
    }
    if rows.len() != target.len() {
        return Err(PipelineError::TrainingError(format!(
            "Feature matrix has {} rows, target has {}",
            rows.len(),
            target.len()
        )));
    }
    let width = rows[0].len();
    if width == 0 || rows.iter().any(|row| row.len() != width) {
        return Err(PipelineError::TrainingError(
            "Feature matrix rows must share one non-zero width".to_string(),
        ));
    }
    Ok(())
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

fn mean_of(values: &[f64], indices: &[usize]) -> f64 {
    if indices.is_empty() {
        return 0.0;
    }
    indices.iter().map(|&i| values[i]).sum::<f64>() / indices.len() as f64
}
