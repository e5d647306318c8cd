//! Training orchestration: held-out split, randomized hyperparameter
//! search under cross-validation, early-stopped refit, evaluation, and
//! artifact persistence

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::artifacts::{ArtifactPaths, ArtifactSet, ModelArtifactBundle};
use crate::error::{PipelineError, Result};
use crate::features::FeatureMatrix;
use crate::metrics::{mean_squared_error, r2_score, RegressionMetrics};
use crate::models::gradient_boost::{GradientBoost, GradientBoostParams};
use crate::models::{Regressor, TrainedRegressor};
use crate::preprocess::PreprocessOutput;

/// Declared hyperparameter search space.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamGrid {
    /// Candidate boosting-round counts
    pub n_estimators: Vec<usize>,
    /// Candidate tree depths
    pub max_depth: Vec<usize>,
    /// Candidate shrinkage factors
    pub learning_rate: Vec<f64>,
    /// Candidate row-sampling fractions
    pub subsample: Vec<f64>,
    /// Candidate feature-sampling fractions
    pub colsample: Vec<f64>,
}

impl Default for ParamGrid {
    fn default() -> Self {
        Self {
            n_estimators: vec![100, 200, 300],
            max_depth: vec![3, 5, 7],
            learning_rate: vec![0.05, 0.1, 0.2],
            subsample: vec![0.7, 0.9],
            colsample: vec![0.7, 0.9],
        }
    }
}

impl ParamGrid {
    fn sample(&self, rng: &mut StdRng, seed: u64) -> Result<GradientBoostParams> {
        Ok(GradientBoostParams {
            n_estimators: *choose(&self.n_estimators, "n_estimators", rng)?,
            max_depth: *choose(&self.max_depth, "max_depth", rng)?,
            learning_rate: *choose(&self.learning_rate, "learning_rate", rng)?,
            subsample: *choose(&self.subsample, "subsample", rng)?,
            colsample: *choose(&self.colsample, "colsample", rng)?,
            seed,
            ..GradientBoostParams::default()
        })
    }
}

fn choose<'a, T>(values: &'a [T], name: &str, rng: &mut StdRng) -> Result<&'a T> {
    values.choose(rng).ok_or_else(|| {
        PipelineError::ValidationError(format!("Parameter grid for {} is empty", name))
    })
}

/// Configuration for one training run.
#[derive(Debug, Clone)]
pub struct TrainingConfig {
    /// Fraction of rows held out for evaluation
    pub test_ratio: f64,
    /// Cross-validation folds used to score search candidates
    pub cv_folds: usize,
    /// Number of randomized search draws
    pub search_iterations: usize,
    /// Early-stopping patience for the final refit, in boosting rounds
    pub early_stopping_rounds: usize,
    /// Seed for the split, the fold assignment, and the search
    pub seed: u64,
    /// The declared search space
    pub grid: ParamGrid,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            test_ratio: 0.2,
            cv_folds: 3,
            search_iterations: 10,
            early_stopping_rounds: 20,
            seed: 42,
            grid: ParamGrid::default(),
        }
    }
}

/// The configuration chosen by the search and its cross-validated score.
#[derive(Debug, Clone)]
pub struct SearchResult {
    /// Best hyperparameters found
    pub params: GradientBoostParams,
    /// Mean cross-validated R² of that configuration
    pub cv_score: f64,
}

/// Outcome of a completed training run.
#[derive(Debug)]
pub struct TrainingOutcome {
    /// The persisted artifact set
    pub artifacts: ArtifactSet,
    /// Mean cross-validated R² of the chosen configuration
    pub cv_score: f64,
}

/// Shuffle and split `n` row indices into train and held-out index sets.
pub fn train_test_split(n: usize, test_ratio: f64, seed: u64) -> Result<(Vec<usize>, Vec<usize>)> {
    if test_ratio <= 0.0 || test_ratio >= 1.0 {
        return Err(PipelineError::ValidationError(
            "test_ratio must be between 0 and 1".to_string(),
        ));
    }
    if n < 2 {
        return Err(PipelineError::DataError(
            "Need at least two rows to split".to_string(),
        ));
    }

    let mut indices: Vec<usize> = (0..n).collect();
    indices.shuffle(&mut StdRng::seed_from_u64(seed));

    let test_size = ((n as f64 * test_ratio).round() as usize).clamp(1, n - 1);
    let (test, train) = indices.split_at(test_size);
    Ok((train.to_vec(), test.to_vec()))
}

/// Refit a regressor on the training split, monitoring the held-out split
/// for early stopping when the regressor supports it. Regressors without
/// that capability degrade to a plain refit, logged as a warning.
pub fn refit_with_holdout<R: Regressor>(
    regressor: &R,
    train_rows: &[Vec<f64>],
    train_target: &[f64],
    holdout_rows: &[Vec<f64>],
    holdout_target: &[f64],
    patience: usize,
) -> Result<R::Trained> {
    if regressor.supports_early_stopping() {
        regressor.fit_with_validation(
            train_rows,
            train_target,
            holdout_rows,
            holdout_target,
            patience,
        )
    } else {
        warn!(
            regressor = regressor.name(),
            "early stopping not supported, falling back to a plain refit"
        );
        regressor.fit(train_rows, train_target)
    }
}

/// Run the full search-and-refit procedure and persist the artifact set.
pub fn train_and_persist(
    prepared: &PreprocessOutput,
    config: &TrainingConfig,
    paths: &ArtifactPaths,
) -> Result<TrainingOutcome> {
    let matrix = &prepared.matrix;
    if matrix.is_empty() {
        return Err(PipelineError::DataError(
            "Cannot train on an empty feature matrix".to_string(),
        ));
    }

    let (train_idx, test_idx) = train_test_split(matrix.len(), config.test_ratio, config.seed)?;
    let (train_rows, train_target) = gather(matrix, &train_idx);
    let (test_rows, test_target) = gather(matrix, &test_idx);

    info!(
        rows = matrix.len(),
        features = matrix.schema.len(),
        iterations = config.search_iterations,
        "starting hyperparameter search"
    );
    let search = random_search(&train_rows, &train_target, config)?;
    info!(cv_r2 = search.cv_score, params = ?search.params, "search complete");

    let regressor = GradientBoost::new(search.params.clone())?;
    let model = refit_with_holdout(
        &regressor,
        &train_rows,
        &train_target,
        &test_rows,
        &test_target,
        config.early_stopping_rounds,
    )?;

    let train_pred = model.predict_batch(&train_rows)?;
    let test_pred = model.predict_batch(&test_rows)?;
    let metrics = RegressionMetrics {
        train_mse: mean_squared_error(&train_pred, &train_target)?,
        train_r2: r2_score(&train_pred, &train_target)?,
        test_mse: mean_squared_error(&test_pred, &test_target)?,
        test_r2: r2_score(&test_pred, &test_target)?,
    };
    info!(
        train_r2 = metrics.train_r2,
        test_r2 = metrics.test_r2,
        "evaluation complete"
    );

    let artifacts = ArtifactSet {
        bundle: ModelArtifactBundle {
            model,
            schema: matrix.schema.clone(),
            scaling: prepared.scaling.clone(),
            chosen_params: search.params,
            metrics,
        },
        snapshot: prepared.snapshot,
    };
    artifacts.save(paths)?;

    Ok(TrainingOutcome {
        artifacts,
        cv_score: search.cv_score,
    })
}

fn random_search(
    rows: &[Vec<f64>],
    target: &[f64],
    config: &TrainingConfig,
) -> Result<SearchResult> {
    if config.search_iterations == 0 {
        return Err(PipelineError::ValidationError(
            "search_iterations must be positive".to_string(),
        ));
    }

    let mut rng = StdRng::seed_from_u64(config.seed);
    let mut best: Option<SearchResult> = None;

    for iteration in 0..config.search_iterations {
        let params = config.grid.sample(&mut rng, config.seed)?;
        let cv_score = cross_validate(&params, rows, target, config.cv_folds, config.seed)?;
        debug!(iteration, cv_r2 = cv_score, ?params, "search candidate scored");

        if best.as_ref().map_or(true, |b| cv_score > b.cv_score) {
            best = Some(SearchResult { params, cv_score });
        }
    }

    best.ok_or_else(|| PipelineError::TrainingError("Search produced no candidate".to_string()))
}

fn cross_validate(
    params: &GradientBoostParams,
    rows: &[Vec<f64>],
    target: &[f64],
    folds: usize,
    seed: u64,
) -> Result<f64> {
    if folds < 2 {
        return Err(PipelineError::ValidationError(
            "Cross-validation needs at least two folds".to_string(),
        ));
    }
    if rows.len() < folds {
        return Err(PipelineError::DataError(format!(
            "Cannot cross-validate {} rows over {} folds",
            rows.len(),
            folds
        )));
    }

    let mut indices: Vec<usize> = (0..rows.len()).collect();
    indices.shuffle(&mut StdRng::seed_from_u64(seed));

    let regressor = GradientBoost::new(params.clone())?;
    let mut total = 0.0;

    for fold in 0..folds {
        let start = fold * indices.len() / folds;
        let end = (fold + 1) * indices.len() / folds;
        let validation_idx = &indices[start..end];
        let train_idx: Vec<usize> = indices[..start]
            .iter()
            .chain(indices[end..].iter())
            .copied()
            .collect();

        let (train_rows, train_target) = gather_from(rows, target, &train_idx);
        let (validation_rows, validation_target) = gather_from(rows, target, validation_idx);

        let model = regressor.fit(&train_rows, &train_target)?;
        let predictions = model.predict_batch(&validation_rows)?;
        total += r2_score(&predictions, &validation_target)?;
    }

    Ok(total / folds as f64)
}

fn gather(matrix: &FeatureMatrix, indices: &[usize]) -> (Vec<Vec<f64>>, Vec<f64>) {
    gather_from(&matrix.rows, &matrix.target, indices)
}

fn gather_from(
    rows: &[Vec<f64>],
    target: &[f64],
    indices: &[usize],
) -> (Vec<Vec<f64>>, Vec<f64>) {
    let gathered_rows = indices.iter().map(|&i| rows[i].clone()).collect();
    let gathered_target = indices.iter().map(|&i| target[i]).collect();
    (gathered_rows, gathered_target)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_is_deterministic_and_disjoint() {
        let (train_a, test_a) = train_test_split(50, 0.2, 42).unwrap();
        let (train_b, test_b) = train_test_split(50, 0.2, 42).unwrap();
        assert_eq!(train_a, train_b);
        assert_eq!(test_a, test_b);

        assert_eq!(test_a.len(), 10);
        assert_eq!(train_a.len(), 40);
        for index in &test_a {
            assert!(!train_a.contains(index));
        }
    }

    #[test]
    fn split_rejects_bad_ratios() {
        assert!(train_test_split(10, 0.0, 42).is_err());
        assert!(train_test_split(10, 1.0, 42).is_err());
        assert!(train_test_split(1, 0.2, 42).is_err());
    }
}
