use tempfile::tempdir;

use waste_forecast::artifacts::{ArtifactPaths, ArtifactSet};
use waste_forecast::error::{PipelineError, Result};
use waste_forecast::features::{ColumnScaling, FeatureMatrix, FeatureSchema, ScalingProfile};
use waste_forecast::models::{Regressor, TrainedRegressor};
use waste_forecast::preprocess::PreprocessOutput;
use waste_forecast::temporal::TemporalSnapshot;
use waste_forecast::training::{
    refit_with_holdout, train_and_persist, ParamGrid, TrainingConfig,
};

fn synthetic_output() -> PreprocessOutput {
    // a deterministic piecewise target a small boosted forest can fit
    let rows: Vec<Vec<f64>> = (0..60)
        .map(|i| vec![(i % 10) as f64, (i % 7) as f64])
        .collect();
    let target: Vec<f64> = rows.iter().map(|row| 3.0 * row[0] + row[1]).collect();
    let snapshot = TemporalSnapshot::capture(&target).unwrap();

    PreprocessOutput {
        matrix: FeatureMatrix {
            schema: FeatureSchema::new(vec!["x0".to_string(), "x1".to_string()]).unwrap(),
            rows,
            target,
        },
        scaling: ScalingProfile::from_pairs([(
            "x0".to_string(),
            ColumnScaling {
                mean: 4.5,
                std_dev: 2.87,
            },
        )]),
        snapshot,
    }
}

fn quick_config() -> TrainingConfig {
    TrainingConfig {
        search_iterations: 2,
        grid: ParamGrid {
            n_estimators: vec![60],
            max_depth: vec![3],
            learning_rate: vec![0.3],
            subsample: vec![1.0],
            colsample: vec![1.0],
        },
        ..TrainingConfig::default()
    }
}

#[test]
fn training_persists_a_consistent_artifact_set() {
    let dir = tempdir().unwrap();
    let paths = ArtifactPaths::new(dir.path());

    let outcome = train_and_persist(&synthetic_output(), &quick_config(), &paths).unwrap();
    assert!(outcome.artifacts.bundle.metrics.test_r2 > 0.8);
    assert!(outcome.cv_score > 0.5);
    assert!(paths.bundle().exists());
    assert!(paths.scaler().exists());
    assert!(paths.snapshot().exists());
}

#[test]
fn reloading_reproduces_schema_order_and_scaling_exactly() {
    let dir = tempdir().unwrap();
    let paths = ArtifactPaths::new(dir.path());
    let outcome = train_and_persist(&synthetic_output(), &quick_config(), &paths).unwrap();

    let loaded = ArtifactSet::load(&paths).unwrap();
    assert_eq!(loaded.bundle.schema, outcome.artifacts.bundle.schema);
    assert_eq!(loaded.bundle.scaling, outcome.artifacts.bundle.scaling);
    assert_eq!(loaded.bundle.chosen_params, outcome.artifacts.bundle.chosen_params);
    assert_eq!(loaded.snapshot, outcome.artifacts.snapshot);

    // loaded and in-memory models agree on predictions
    let probe = vec![0.5, 2.0];
    assert_eq!(
        loaded.bundle.model.predict(&probe).unwrap(),
        outcome.artifacts.bundle.model.predict(&probe).unwrap()
    );
}

#[test]
fn mixed_artifact_generations_are_refused() {
    let dir = tempdir().unwrap();
    let paths = ArtifactPaths::new(dir.path());
    train_and_persist(&synthetic_output(), &quick_config(), &paths).unwrap();

    // a scaler from some other training run
    let foreign = ScalingProfile::from_pairs([(
        "x1".to_string(),
        ColumnScaling {
            mean: 9.0,
            std_dev: 2.0,
        },
    )]);
    std::fs::write(paths.scaler(), serde_json::to_vec(&foreign).unwrap()).unwrap();

    let result = ArtifactSet::load(&paths);
    assert!(matches!(result, Err(PipelineError::DataError(_))));
}

#[derive(Debug, Clone)]
struct MeanRegressor;

#[derive(Debug)]
struct TrainedMean {
    mean: f64,
}

impl TrainedRegressor for TrainedMean {
    fn predict(&self, _features: &[f64]) -> Result<f64> {
        Ok(self.mean)
    }

    fn name(&self) -> &str {
        "Mean"
    }
}

impl Regressor for MeanRegressor {
    type Trained = TrainedMean;

    fn fit(&self, _rows: &[Vec<f64>], target: &[f64]) -> Result<Self::Trained> {
        Ok(TrainedMean {
            mean: target.iter().sum::<f64>() / target.len() as f64,
        })
    }

    fn name(&self) -> &str {
        "Mean"
    }
}

#[test]
fn regressors_without_early_stopping_degrade_to_a_plain_refit() {
    let output = synthetic_output();
    let model = refit_with_holdout(
        &MeanRegressor,
        &output.matrix.rows,
        &output.matrix.target,
        &output.matrix.rows,
        &output.matrix.target,
        5,
    )
    .unwrap();

    let expected =
        output.matrix.target.iter().sum::<f64>() / output.matrix.target.len() as f64;
    assert_eq!(model.predict(&[0.0, 0.0]).unwrap(), expected);
}

#[test]
fn direct_validation_fit_on_an_unsupporting_regressor_errors() {
    let output = synthetic_output();
    let result = MeanRegressor.fit_with_validation(
        &output.matrix.rows,
        &output.matrix.target,
        &output.matrix.rows,
        &output.matrix.target,
        5,
    );
    assert!(matches!(result, Err(PipelineError::TrainingError(_))));
}
