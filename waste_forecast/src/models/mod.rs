//! Trainable regressors behind a fit/predict contract
//!
//! The training orchestrator treats the regression algorithm as a black
//! box: anything that can be fitted to a feature matrix and predict a
//! scalar satisfies it. The traits mirror the two lifecycle stages: an
//! unfitted configuration and the trained model it produces.

use std::fmt::Debug;

use crate::error::{PipelineError, Result};

/// A trained regressor ready for prediction.
pub trait TrainedRegressor: Debug {
    /// Predict a single feature vector.
    fn predict(&self, features: &[f64]) -> Result<f64>;

    /// Predict a batch of feature vectors.
    fn predict_batch(&self, rows: &[Vec<f64>]) -> Result<Vec<f64>> {
        rows.iter().map(|row| self.predict(row)).collect()
    }

    /// Name of the model
    fn name(&self) -> &str;
}

/// A regressor configuration that can be fitted to a feature matrix.
pub trait Regressor: Debug + Clone {
    /// The type of trained model produced
    type Trained: TrainedRegressor;

    /// Fit the regressor on a feature matrix and target vector.
    fn fit(&self, rows: &[Vec<f64>], target: &[f64]) -> Result<Self::Trained>;

    /// Whether [`Regressor::fit_with_validation`] is implemented. Callers
    /// use this to fall back to a plain [`Regressor::fit`].
    fn supports_early_stopping(&self) -> bool {
        false
    }

    /// Fit while monitoring a validation set, stopping once the validation
    /// error has not improved for `patience` rounds.
    fn fit_with_validation(
        &self,
        rows: &[Vec<f64>],
        target: &[f64],
        validation_rows: &[Vec<f64>],
        validation_target: &[f64],
        patience: usize,
    ) -> Result<Self::Trained> {
        let _ = (rows, target, validation_rows, validation_target, patience);
        Err(PipelineError::TrainingError(format!(
            "{} does not support early stopping",
            self.name()
        )))
    }

    /// Name of the regressor
    fn name(&self) -> &str;
}

pub mod gradient_boost;
