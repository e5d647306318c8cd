//! Metrics for evaluating regression performance

use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, Result};

/// Mean squared error between predictions and actual values.
pub fn mean_squared_error(predicted: &[f64], actual: &[f64]) -> Result<f64> {
    check_lengths(predicted, actual)?;

    let sum: f64 = predicted
        .iter()
        .zip(actual.iter())
        .map(|(p, a)| (p - a).powi(2))
        .sum();

    Ok(sum / predicted.len() as f64)
}

/// Coefficient of determination between predictions and actual values.
///
/// A constant actual series has no variance to explain and scores 0.0.
pub fn r2_score(predicted: &[f64], actual: &[f64]) -> Result<f64> {
    check_lengths(predicted, actual)?;

    let mean = actual.iter().sum::<f64>() / actual.len() as f64;
    let ss_tot: f64 = actual.iter().map(|a| (a - mean).powi(2)).sum();
    let ss_res: f64 = predicted
        .iter()
        .zip(actual.iter())
        .map(|(p, a)| (a - p).powi(2))
        .sum();

    if ss_tot == 0.0 {
        return Ok(0.0);
    }
    Ok(1.0 - ss_res / ss_tot)
}

fn check_lengths(predicted: &[f64], actual: &[f64]) -> Result<()> {
    if predicted.len() != actual.len() || predicted.is_empty() {
        return Err(PipelineError::ValidationError(
            "Predictions and actuals must have the same non-zero length".to_string(),
        ));
    }
    Ok(())
}

/// Train/test evaluation summary persisted with the model artifact.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RegressionMetrics {
    /// Mean squared error on the training split
    pub train_mse: f64,
    /// Coefficient of determination on the training split
    pub train_r2: f64,
    /// Mean squared error on the held-out split
    pub test_mse: f64,
    /// Coefficient of determination on the held-out split
    pub test_r2: f64,
}

impl std::fmt::Display for RegressionMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Regression Metrics:")?;
        writeln!(f, "  Train MSE: {:.4}", self.train_mse)?;
        writeln!(f, "  Train R2:  {:.4}", self.train_r2)?;
        writeln!(f, "  Test MSE:  {:.4}", self.test_mse)?;
        writeln!(f, "  Test R2:   {:.4}", self.test_r2)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn perfect_predictions_score_one() {
        let actual = vec![1.0, 2.0, 3.0];
        assert_approx_eq!(mean_squared_error(&actual, &actual).unwrap(), 0.0);
        assert_approx_eq!(r2_score(&actual, &actual).unwrap(), 1.0);
    }

    #[test]
    fn mean_predictions_score_zero() {
        let actual = vec![1.0, 2.0, 3.0];
        let predicted = vec![2.0, 2.0, 2.0];
        assert_approx_eq!(r2_score(&predicted, &actual).unwrap(), 0.0);
    }

    #[test]
    fn constant_actuals_score_zero() {
        let actual = vec![5.0, 5.0, 5.0];
        let predicted = vec![4.0, 5.0, 6.0];
        assert_approx_eq!(r2_score(&predicted, &actual).unwrap(), 0.0);
    }

    #[test]
    fn mismatched_lengths_are_rejected() {
        assert!(mean_squared_error(&[1.0], &[1.0, 2.0]).is_err());
        assert!(r2_score(&[], &[]).is_err());
    }
}
